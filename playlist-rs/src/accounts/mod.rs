//! User accounts

pub mod manager;
pub mod types;

pub use manager::AccountManager;
pub use types::{LoginRequest, RegisterRequest, User};
