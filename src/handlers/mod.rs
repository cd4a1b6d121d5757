// handlers/mod.rs - Handlers by security tier
//
// Public (no auth) → Protected (JWT auth + current user). Role gates
// (admin, project manager, note author) are checked inside protected handlers.

pub mod protected;
pub mod public;
