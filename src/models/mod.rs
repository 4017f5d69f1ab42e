pub mod auth;
pub mod catalog;
pub mod progress;
pub mod purchase;
pub mod user;
