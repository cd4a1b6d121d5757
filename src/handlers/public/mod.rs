// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Service info, health and token acquisition.

pub mod health;
pub mod session;

pub use health::{health, root};
pub use session::login;
