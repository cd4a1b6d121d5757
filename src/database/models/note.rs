use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Note {
    pub id: i32,
    pub project_id: Option<i32>,
    pub content: String,
    /// Username of the author at write time, kept for display.
    pub author: String,
    /// Owning user; null once that user is deleted.
    pub author_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub project_id: Option<i32>,
    pub content: String,
    pub author: String,
    pub author_id: Option<i32>,
}
