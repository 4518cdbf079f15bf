//! services/api/src/adapters/memory.rs
//!
//! An in-process `DatabaseService` used when no `DATABASE_URL` is configured and in
//! tests. Notes live only as long as the process.

use async_trait::async_trait;
use chrono::Utc;
use study_notes_core::domain::{NewNote, Note, NoteUpdate};
use study_notes_core::ports::{DatabaseService, PortError, PortResult};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryNoteStore {
    /// Insertion order, oldest first.
    notes: RwLock<Vec<Note>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(note_id: Uuid) -> PortError {
    PortError::NotFound(format!("Note {} not found", note_id))
}

#[async_trait]
impl DatabaseService for MemoryNoteStore {
    async fn create_note(&self, note: NewNote) -> PortResult<Note> {
        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            user_id: note.user_id,
            title: note.title,
            input_text: note.input_text,
            input_type: note.input_type,
            file_name: note.file_name,
            output_type: None,
            output_text: None,
            status: note.status,
            created_at: now,
            updated_at: now,
        };
        self.notes.write().await.push(note.clone());
        Ok(note)
    }

    async fn update_note(
        &self,
        note_id: Uuid,
        user_id: Uuid,
        update: NoteUpdate,
    ) -> PortResult<Note> {
        let mut notes = self.notes.write().await;
        let note = notes
            .iter_mut()
            .find(|n| n.id == note_id && n.user_id == user_id)
            .ok_or_else(|| not_found(note_id))?;

        if let Some(input_text) = update.input_text {
            note.input_text = input_text;
        }
        if let Some(output_type) = update.output_type {
            note.output_type = Some(output_type);
        }
        if let Some(output_text) = update.output_text {
            note.output_text = Some(output_text);
        }
        if let Some(status) = update.status {
            note.status = status;
        }
        note.updated_at = Utc::now();
        Ok(note.clone())
    }

    async fn get_note(&self, note_id: Uuid, user_id: Uuid) -> PortResult<Note> {
        self.notes
            .read()
            .await
            .iter()
            .find(|n| n.id == note_id && n.user_id == user_id)
            .cloned()
            .ok_or_else(|| not_found(note_id))
    }

    async fn list_notes(&self, user_id: Uuid) -> PortResult<Vec<Note>> {
        let mut notes: Vec<Note> = self
            .notes
            .read()
            .await
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        // Stable, so notes created in the same instant stay newest-inserted first.
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }
}
