pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod lessons;
pub mod metrics;
pub mod progress;
