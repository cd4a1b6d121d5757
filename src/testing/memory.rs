use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::database::models::role::aggregate_roles;
use crate::database::models::{NewNote, NewProject, NewUser, Note, Project, ProjectChanges, Role, User, UserChanges};
use crate::database::{DatabaseError, Store, StoreResult};

#[derive(Default)]
struct Tables {
    next_id: i32,
    users: BTreeMap<i32, (String, String)>,
    roles: BTreeMap<i32, String>,
    /// (user_id, role_id)
    user_roles: BTreeSet<(i32, i32)>,
    projects: BTreeMap<i32, Project>,
    /// (project_id, user_id)
    members: BTreeSet<(i32, i32)>,
    notes: BTreeMap<i32, Note>,
}

impl Tables {
    fn id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, id: i32) -> Option<User> {
        let (username, password_hash) = self.users.get(&id)?;
        let roles = self
            .user_roles
            .iter()
            .filter(|(u, _)| *u == id)
            .filter_map(|(_, r)| self.roles.get(r).cloned());
        Some(User {
            id,
            username: username.clone(),
            password_hash: password_hash.clone(),
            roles: aggregate_roles(roles),
        })
    }

    fn username_taken(&self, username: &str, except: Option<i32>) -> bool {
        self.users
            .iter()
            .any(|(id, (name, _))| name == username && Some(*id) != except)
    }
}

/// Store kept in process memory with the same constraints as the schema:
/// unique names, cascading link rows, notes detached on project delete.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut tables = Tables::default();
        for name in ["ROLE_USER", "ROLE_ADMIN", "ROLE_MANAGER", "ROLE_DEV"] {
            let id = tables.id();
            tables.roles.insert(id, name.to_string());
        }
        Self {
            tables: Mutex::new(tables),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make `ping` fail as if the pool timed out.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    async fn find_user(&self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.tables().user(id))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let t = self.tables();
        let id = t.users.iter().find(|(_, (name, _))| name == username).map(|(id, _)| *id);
        Ok(id.and_then(|id| t.user(id)))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let t = self.tables();
        Ok(t.users.keys().filter_map(|id| t.user(*id)).collect())
    }

    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let mut t = self.tables();
        if t.username_taken(&new_user.username, None) {
            return Err(DatabaseError::Conflict(format!(
                "Username '{}' is already taken",
                new_user.username
            )));
        }
        if let Some(role_id) = new_user.role_ids.iter().find(|r| !t.roles.contains_key(*r)) {
            return Err(DatabaseError::NotFound(format!("Role {} not found", role_id)));
        }
        let id = t.id();
        t.users.insert(id, (new_user.username, new_user.password_hash));
        for role_id in new_user.role_ids {
            t.user_roles.insert((id, role_id));
        }
        t.user(id)
            .ok_or_else(|| DatabaseError::NotFound(format!("User {}", id)))
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> StoreResult<Option<User>> {
        let mut t = self.tables();
        if !t.users.contains_key(&id) {
            return Ok(None);
        }
        if let Some(username) = &changes.username {
            if t.username_taken(username, Some(id)) {
                return Err(DatabaseError::Conflict(format!("Username '{}' is already taken", username)));
            }
        }
        if let Some(role_id) = changes
            .role_ids
            .iter()
            .flatten()
            .find(|r| !t.roles.contains_key(*r))
        {
            return Err(DatabaseError::NotFound(format!("Role {} not found", role_id)));
        }
        if let Some(username) = changes.username {
            for note in t.notes.values_mut() {
                if note.author_id == Some(id) {
                    note.author = username.clone();
                }
            }
            if let Some(entry) = t.users.get_mut(&id) {
                entry.0 = username;
            }
        }
        if let Some(role_ids) = changes.role_ids {
            t.user_roles.retain(|(u, _)| *u != id);
            for role_id in role_ids {
                t.user_roles.insert((id, role_id));
            }
        }
        Ok(t.user(id))
    }

    async fn delete_user(&self, id: i32) -> StoreResult<bool> {
        let mut t = self.tables();
        if t.users.remove(&id).is_none() {
            return Ok(false);
        }
        t.user_roles.retain(|(u, _)| *u != id);
        t.members.retain(|(_, u)| *u != id);
        for note in t.notes.values_mut() {
            if note.author_id == Some(id) {
                note.author_id = None;
            }
        }
        Ok(true)
    }

    async fn assign_role(&self, user_id: i32, role_id: i32) -> StoreResult<()> {
        let mut t = self.tables();
        if !t.users.contains_key(&user_id) || !t.roles.contains_key(&role_id) {
            return Err(DatabaseError::NotFound(format!(
                "User {} or role {} not found",
                user_id, role_id
            )));
        }
        t.user_roles.insert((user_id, role_id));
        Ok(())
    }

    async fn find_role(&self, id: i32) -> StoreResult<Option<Role>> {
        let t = self.tables();
        Ok(t.roles.get(&id).map(|name| Role { id, name: name.clone() }))
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let t = self.tables();
        Ok(t.roles
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, n)| Role { id: *id, name: n.clone() }))
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let t = self.tables();
        let mut roles: Vec<Role> = t
            .roles
            .iter()
            .map(|(id, name)| Role { id: *id, name: name.clone() })
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn create_role(&self, name: &str) -> StoreResult<Role> {
        let mut t = self.tables();
        if t.roles.values().any(|n| n == name) {
            return Err(DatabaseError::Conflict(format!("Role '{}' already exists", name)));
        }
        let id = t.id();
        t.roles.insert(id, name.to_string());
        Ok(Role { id, name: name.to_string() })
    }

    async fn delete_role(&self, id: i32) -> StoreResult<bool> {
        let mut t = self.tables();
        if t.roles.remove(&id).is_none() {
            return Ok(false);
        }
        t.user_roles.retain(|(_, r)| *r != id);
        Ok(true)
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        Ok(self.tables().projects.values().cloned().collect())
    }

    async fn find_project(&self, id: i32) -> StoreResult<Option<Project>> {
        Ok(self.tables().projects.get(&id).cloned())
    }

    async fn find_project_by_name(&self, name: &str) -> StoreResult<Option<Project>> {
        Ok(self.tables().projects.values().find(|p| p.name == name).cloned())
    }

    async fn create_project(&self, new_project: NewProject) -> StoreResult<Project> {
        let mut t = self.tables();
        if t.projects.values().any(|p| p.name == new_project.name) {
            return Err(DatabaseError::Conflict(format!("Project '{}' already exists", new_project.name)));
        }
        let id = t.id();
        let project = Project {
            id,
            name: new_project.name,
            description: new_project.description,
        };
        t.projects.insert(id, project.clone());
        Ok(project)
    }

    async fn update_project(&self, id: i32, changes: ProjectChanges) -> StoreResult<Option<Project>> {
        let mut t = self.tables();
        if let Some(name) = &changes.name {
            if t.projects.values().any(|p| &p.name == name && p.id != id) {
                return Err(DatabaseError::Conflict(format!("Project '{}' already exists", name)));
            }
        }
        let Some(project) = t.projects.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            project.name = name;
        }
        if let Some(description) = changes.description {
            project.description = description;
        }
        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: i32) -> StoreResult<bool> {
        let mut t = self.tables();
        if t.projects.remove(&id).is_none() {
            return Ok(false);
        }
        t.members.retain(|(p, _)| *p != id);
        for note in t.notes.values_mut() {
            if note.project_id == Some(id) {
                note.project_id = None;
            }
        }
        Ok(true)
    }

    async fn project_members(&self, project_id: i32) -> StoreResult<Vec<String>> {
        let t = self.tables();
        let mut names: Vec<String> = t
            .members
            .iter()
            .filter(|(p, _)| *p == project_id)
            .filter_map(|(_, u)| t.users.get(u).map(|(name, _)| name.clone()))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn add_project_member(&self, project_id: i32, user_id: i32) -> StoreResult<bool> {
        let mut t = self.tables();
        if !t.projects.contains_key(&project_id) || !t.users.contains_key(&user_id) {
            return Err(DatabaseError::NotFound(format!(
                "Project {} or user {} not found",
                project_id, user_id
            )));
        }
        Ok(t.members.insert((project_id, user_id)))
    }

    async fn remove_project_member(&self, project_id: i32, user_id: i32) -> StoreResult<bool> {
        Ok(self.tables().members.remove(&(project_id, user_id)))
    }

    async fn create_note(&self, new_note: NewNote) -> StoreResult<Note> {
        let mut t = self.tables();
        let id = t.id();
        let note = Note {
            id,
            project_id: new_note.project_id,
            content: new_note.content,
            author: new_note.author,
            author_id: new_note.author_id,
            created_at: Utc::now(),
        };
        t.notes.insert(id, note.clone());
        Ok(note)
    }

    async fn find_note(&self, id: i32) -> StoreResult<Option<Note>> {
        Ok(self.tables().notes.get(&id).cloned())
    }

    async fn delete_note(&self, id: i32) -> StoreResult<bool> {
        Ok(self.tables().notes.remove(&id).is_some())
    }

    async fn notes_for_project(&self, project_id: i32) -> StoreResult<Vec<Note>> {
        let t = self.tables();
        Ok(t.notes.values().filter(|n| n.project_id == Some(project_id)).cloned().collect())
    }

    async fn notes_by_author(&self, author_id: i32) -> StoreResult<Vec<Note>> {
        let t = self.tables();
        Ok(t.notes.values().filter(|n| n.author_id == Some(author_id)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn role_links_to_missing_roles_are_not_found() {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                username: "dave".into(),
                password_hash: "hash".into(),
                role_ids: vec![1],
            })
            .await
            .unwrap();

        let err = store
            .update_user(user.id, UserChanges { username: None, role_ids: Some(vec![2, 404]) })
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
        assert_eq!(store.find_user(user.id).await.unwrap().unwrap().roles, vec!["ROLE_USER"]);

        let err = store.assign_role(user.id, 404).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }
}
