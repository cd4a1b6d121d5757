pub mod user_service;

pub use user_service::{authenticate, register_user, AccountError, NewAccount};
