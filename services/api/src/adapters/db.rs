//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use study_notes_core::domain::{NewNote, Note, NoteUpdate};
use study_notes_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const NOTE_COLUMNS: &str = "id, user_id, title, input_text, input_type, file_name, \
                            output_type, output_text, status, created_at, updated_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn ensure_user(&self, user_id: Uuid) -> PortResult<()> {
        sqlx::query("INSERT INTO users (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct NoteRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    input_text: String,
    input_type: String,
    file_name: Option<String>,
    output_type: Option<String>,
    output_text: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl NoteRecord {
    fn to_domain(self) -> PortResult<Note> {
        Ok(Note {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            input_text: self.input_text,
            input_type: self.input_type.parse().map_err(PortError::Unexpected)?,
            file_name: self.file_name,
            output_type: self.output_type,
            output_text: self.output_text,
            status: self.status.parse().map_err(PortError::Unexpected)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn note_not_found(note_id: Uuid) -> PortError {
    PortError::NotFound(format!("Note {} not found", note_id))
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_note(&self, note: NewNote) -> PortResult<Note> {
        self.ensure_user(note.user_id).await?;

        let sql = format!(
            "INSERT INTO notes (id, user_id, title, input_text, input_type, file_name, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            NOTE_COLUMNS
        );
        let record = sqlx::query_as::<_, NoteRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(note.user_id)
            .bind(&note.title)
            .bind(&note.input_text)
            .bind(note.input_type.as_str())
            .bind(&note.file_name)
            .bind(note.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        record.to_domain()
    }

    async fn update_note(
        &self,
        note_id: Uuid,
        user_id: Uuid,
        update: NoteUpdate,
    ) -> PortResult<Note> {
        let sql = format!(
            "UPDATE notes SET \
                input_text = COALESCE($3, input_text), \
                output_type = COALESCE($4, output_type), \
                output_text = COALESCE($5, output_text), \
                status = COALESCE($6, status), \
                updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            NOTE_COLUMNS
        );
        let record = sqlx::query_as::<_, NoteRecord>(&sql)
            .bind(note_id)
            .bind(user_id)
            .bind(update.input_text)
            .bind(update.output_type)
            .bind(update.output_text)
            .bind(update.status.map(|s| s.as_str()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .ok_or_else(|| note_not_found(note_id))?;
        record.to_domain()
    }

    async fn get_note(&self, note_id: Uuid, user_id: Uuid) -> PortResult<Note> {
        let sql = format!(
            "SELECT {} FROM notes WHERE id = $1 AND user_id = $2",
            NOTE_COLUMNS
        );
        let record = sqlx::query_as::<_, NoteRecord>(&sql)
            .bind(note_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .ok_or_else(|| note_not_found(note_id))?;
        record.to_domain()
    }

    async fn list_notes(&self, user_id: Uuid) -> PortResult<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM notes WHERE user_id = $1 ORDER BY created_at DESC",
            NOTE_COLUMNS
        );
        let records = sqlx::query_as::<_, NoteRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        records.into_iter().map(NoteRecord::to_domain).collect()
    }
}
