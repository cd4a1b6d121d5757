// handlers/protected/mod.rs - Handlers behind JWT auth
//
// Every handler here receives `Extension<CurrentUser>` from
// `validate_user_middleware`.

pub mod notes;
pub mod projects;
pub mod roles;
pub mod users;
