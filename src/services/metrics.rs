use lazy_static::lazy_static;
use prometheus::{register_counter, register_counter_vec, Counter, CounterVec};

lazy_static! {
    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Login attempts by status",
        &["status"]
    ).unwrap();

    pub static ref CHECKOUTS_STARTED_COUNTER: CounterVec = register_counter_vec!(
        "api_checkouts_started_total",
        "Payment sessions created by purchase kind",
        &["kind"]
    ).unwrap();

    pub static ref PURCHASES_RECORDED_COUNTER: CounterVec = register_counter_vec!(
        "api_purchases_recorded_total",
        "Purchases written after confirmed payment, by purchase kind",
        &["kind"]
    ).unwrap();

    pub static ref PAYMENT_ERRORS_COUNTER: CounterVec = register_counter_vec!(
        "api_payment_errors_total",
        "Payment provider failures by operation",
        &["operation"]
    ).unwrap();

    pub static ref VALIDATIONS_COUNTER: Counter = register_counter!(
        "api_lesson_validations_total",
        "Lessons validated"
    ).unwrap();

    pub static ref CERTIFICATIONS_COUNTER: Counter = register_counter!(
        "api_certifications_issued_total",
        "Theme certifications issued"
    ).unwrap();
}
