pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod entitlement;
pub mod metrics;
pub mod payments;
pub mod progress;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;
