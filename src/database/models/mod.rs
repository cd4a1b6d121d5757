pub mod note;
pub mod project;
pub mod role;
pub mod user;

pub use note::{NewNote, Note};
pub use project::{NewProject, Project, ProjectChanges};
pub use role::{Role, ROLE_ADMIN, ROLE_MANAGER, ROLE_USER};
pub use user::{NewUser, User, UserChanges};
