//! Data-access trait
//!
//! One group of functions per table. Handlers and services depend on
//! `dyn Store` only; `PgStore` is the production implementation.

use async_trait::async_trait;

use super::manager::DatabaseError;
use super::models::{NewNote, NewProject, NewUser, Note, Project, ProjectChanges, Role, User, UserChanges};

pub type StoreResult<T> = Result<T, DatabaseError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Round-trip to the backing database.
    async fn ping(&self) -> StoreResult<()>;

    // user

    async fn find_user(&self, id: i32) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    /// Inserts the user and its role links atomically. A taken username is `Conflict`.
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User>;
    /// Returns `None` when the user does not exist. Renaming also rewrites the
    /// display author of the user's notes. A missing role id is `NotFound`.
    async fn update_user(&self, id: i32, changes: UserChanges) -> StoreResult<Option<User>>;
    async fn delete_user(&self, id: i32) -> StoreResult<bool>;
    /// Links a role to a user. Linking twice is a no-op.
    async fn assign_role(&self, user_id: i32, role_id: i32) -> StoreResult<()>;

    // role

    async fn find_role(&self, id: i32) -> StoreResult<Option<Role>>;
    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>>;
    async fn list_roles(&self) -> StoreResult<Vec<Role>>;
    async fn create_role(&self, name: &str) -> StoreResult<Role>;
    async fn delete_role(&self, id: i32) -> StoreResult<bool>;

    // project

    async fn list_projects(&self) -> StoreResult<Vec<Project>>;
    async fn find_project(&self, id: i32) -> StoreResult<Option<Project>>;
    async fn find_project_by_name(&self, name: &str) -> StoreResult<Option<Project>>;
    async fn create_project(&self, new_project: NewProject) -> StoreResult<Project>;
    async fn update_project(&self, id: i32, changes: ProjectChanges) -> StoreResult<Option<Project>>;
    /// Deletes the project; its notes keep existing with a null project.
    async fn delete_project(&self, id: i32) -> StoreResult<bool>;
    /// Usernames of project members, ascending.
    async fn project_members(&self, project_id: i32) -> StoreResult<Vec<String>>;
    /// Returns false when the user was already a member.
    async fn add_project_member(&self, project_id: i32, user_id: i32) -> StoreResult<bool>;
    /// Returns false when the user was not a member.
    async fn remove_project_member(&self, project_id: i32, user_id: i32) -> StoreResult<bool>;

    // note

    async fn create_note(&self, new_note: NewNote) -> StoreResult<Note>;
    async fn find_note(&self, id: i32) -> StoreResult<Option<Note>>;
    async fn delete_note(&self, id: i32) -> StoreResult<bool>;
    async fn notes_for_project(&self, project_id: i32) -> StoreResult<Vec<Note>>;
    /// Notes owned by the user id, oldest first.
    async fn notes_by_author(&self, author_id: i32) -> StoreResult<Vec<Note>>;
}
