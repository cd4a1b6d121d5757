pub mod migrate;
pub mod role;
pub mod user;
