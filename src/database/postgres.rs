use async_trait::async_trait;
use sqlx::PgPool;

use super::manager::DatabaseError;
use super::models::{NewNote, NewProject, NewUser, Note, Project, ProjectChanges, Role, User, UserChanges};
use super::store::{Store, StoreResult};

/// User columns plus the aggregated, ordered role names.
const USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.password,
           COALESCE(
               array_agg(r.name::text ORDER BY r.name) FILTER (WHERE r.id IS NOT NULL),
               ARRAY[]::text[]
           ) AS roles
    FROM "user" u
    LEFT JOIN user_role ur ON ur.user_id = u.id
    LEFT JOIN role r ON r.id = ur.role_id
"#;

const NOTE_COLUMNS: &str = "id, project_id, content, author, author_id, created_at";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user(&self, id: i32) -> StoreResult<Option<User>> {
        let sql = format!("{} WHERE u.id = $1 GROUP BY u.id", USER_SELECT);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("{} WHERE u.username = $1 GROUP BY u.id", USER_SELECT);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("{} GROUP BY u.id ORDER BY u.id", USER_SELECT);
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?;
        Ok(users)
    }

    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(r#"INSERT INTO "user" (username, password) VALUES ($1, $2) RETURNING id"#)
            .bind(&new_user.username)
            .bind(&new_user.password_hash)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DatabaseError::conflict_or(e, format!("Username '{}' is already taken", new_user.username)))?;

        for role_id in &new_user.role_ids {
            sqlx::query("INSERT INTO user_role (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(id)
                .bind(role_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::missing_or(e, format!("Role {} not found", role_id)))?;
        }

        tx.commit().await?;

        self.find_user(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {} vanished after insert", id)))
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> StoreResult<Option<User>> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> = sqlx::query_scalar(r#"SELECT id FROM "user" WHERE id = $1 FOR UPDATE"#)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        if let Some(username) = &changes.username {
            sqlx::query(r#"UPDATE "user" SET username = $2 WHERE id = $1"#)
                .bind(id)
                .bind(username)
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::conflict_or(e, format!("Username '{}' is already taken", username)))?;

            sqlx::query("UPDATE note SET author = $2 WHERE author_id = $1")
                .bind(id)
                .bind(username)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(role_ids) = &changes.role_ids {
            sqlx::query("DELETE FROM user_role WHERE user_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for role_id in role_ids {
                sqlx::query("INSERT INTO user_role (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                    .bind(id)
                    .bind(role_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| DatabaseError::missing_or(e, format!("Role {} not found", role_id)))?;
            }
        }

        tx.commit().await?;
        self.find_user(id).await
    }

    async fn delete_user(&self, id: i32) -> StoreResult<bool> {
        let result = sqlx::query(r#"DELETE FROM "user" WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn assign_role(&self, user_id: i32, role_id: i32) -> StoreResult<()> {
        sqlx::query("INSERT INTO user_role (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::missing_or(e, format!("User {} or role {} not found", user_id, role_id)))?;
        Ok(())
    }

    async fn find_role(&self, id: i32) -> StoreResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>("SELECT id, name FROM role WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>("SELECT id, name FROM role WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>("SELECT id, name FROM role ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    async fn create_role(&self, name: &str) -> StoreResult<Role> {
        sqlx::query_as::<_, Role>("INSERT INTO role (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::conflict_or(e, format!("Role '{}' already exists", name)))
    }

    async fn delete_role(&self, id: i32) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM role WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>("SELECT id, name, description FROM project ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(projects)
    }

    async fn find_project(&self, id: i32) -> StoreResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>("SELECT id, name, description FROM project WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    async fn find_project_by_name(&self, name: &str) -> StoreResult<Option<Project>> {
        let project = sqlx::query_as::<_, Project>("SELECT id, name, description FROM project WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    async fn create_project(&self, new_project: NewProject) -> StoreResult<Project> {
        sqlx::query_as::<_, Project>(
            "INSERT INTO project (name, description) VALUES ($1, $2) RETURNING id, name, description",
        )
        .bind(&new_project.name)
        .bind(&new_project.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::conflict_or(e, format!("Project '{}' already exists", new_project.name)))
    }

    async fn update_project(&self, id: i32, changes: ProjectChanges) -> StoreResult<Option<Project>> {
        let name = changes.name.clone().unwrap_or_default();
        sqlx::query_as::<_, Project>(
            r#"
            UPDATE project
            SET name = COALESCE($2, name),
                description = COALESCE($3, description)
            WHERE id = $1
            RETURNING id, name, description
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::conflict_or(e, format!("Project '{}' already exists", name)))
    }

    async fn delete_project(&self, id: i32) -> StoreResult<bool> {
        // note.project_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM project WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn project_members(&self, project_id: i32) -> StoreResult<Vec<String>> {
        let usernames = sqlx::query_scalar::<_, String>(
            r#"
            SELECT u.username
            FROM project_user pu
            JOIN "user" u ON u.id = pu.user_id
            WHERE pu.project_id = $1
            ORDER BY u.username
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(usernames)
    }

    async fn add_project_member(&self, project_id: i32, user_id: i32) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO project_user (project_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(project_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DatabaseError::missing_or(e, format!("Project {} or user {} not found", project_id, user_id)))?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_project_member(&self, project_id: i32, user_id: i32) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM project_user WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_note(&self, new_note: NewNote) -> StoreResult<Note> {
        let sql = format!(
            "INSERT INTO note (project_id, content, author, author_id) VALUES ($1, $2, $3, $4) RETURNING {}",
            NOTE_COLUMNS
        );
        let note = sqlx::query_as::<_, Note>(&sql)
            .bind(new_note.project_id)
            .bind(&new_note.content)
            .bind(&new_note.author)
            .bind(new_note.author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::missing_or(e, "Project or author not found"))?;
        Ok(note)
    }

    async fn find_note(&self, id: i32) -> StoreResult<Option<Note>> {
        let sql = format!("SELECT {} FROM note WHERE id = $1", NOTE_COLUMNS);
        let note = sqlx::query_as::<_, Note>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(note)
    }

    async fn delete_note(&self, id: i32) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM note WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn notes_for_project(&self, project_id: i32) -> StoreResult<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM note WHERE project_id = $1 ORDER BY created_at, id",
            NOTE_COLUMNS
        );
        let notes = sqlx::query_as::<_, Note>(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(notes)
    }

    async fn notes_by_author(&self, author_id: i32) -> StoreResult<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM note WHERE author_id = $1 ORDER BY created_at, id",
            NOTE_COLUMNS
        );
        let notes = sqlx::query_as::<_, Note>(&sql)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(notes)
    }
}
