use serde::Serialize;

use crate::database::models::{Note, Project, User};
use crate::database::{Store, StoreResult};

/// Public projection of a user; never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i32,
    pub username: String,
    pub roles: Vec<String>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            roles: user.roles.clone(),
        }
    }
}

/// A project with member usernames and its notes
#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
    pub id: i32,
    pub project: String,
    pub description: String,
    pub users: Vec<String>,
    pub notes: Vec<Note>,
}

impl ProjectView {
    pub async fn load(store: &dyn Store, project: Project) -> StoreResult<Self> {
        let users = store.project_members(project.id).await?;
        let notes = store.notes_for_project(project.id).await?;

        Ok(Self {
            id: project.id,
            project: project.name,
            description: project.description,
            users,
            notes,
        })
    }
}
