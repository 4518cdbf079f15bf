//! services/api/src/web/protocol.rs
//!
//! Defines the progress events streamed to the browser while study material is being
//! generated. Each event carries the epoch of the session it belongs to so clients can
//! ignore events from a session they have already reset.

use serde::Serialize;
use study_notes_core::domain::{ContentKind, NoteStatus};
use uuid::Uuid;

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A new generation session took over the board.
    SessionStarted { epoch: u64, note_id: Uuid },

    /// One kind moved to `generating`.
    KindStarted { epoch: u64, kind: ContentKind },

    /// One kind finished successfully.
    KindReady {
        epoch: u64,
        kind: ContentKind,
        text: String,
    },

    /// One kind failed. `message` is what the board shows, `reason` is the cause
    /// (for example the rate-limit notice).
    KindFailed {
        epoch: u64,
        kind: ContentKind,
        message: String,
        reason: String,
    },

    /// The summary is in; the UI can switch to the results view.
    ResultsAvailable { epoch: u64, note_id: Uuid },

    /// The background phase finished and the note was persisted with `status`.
    SessionCompleted {
        epoch: u64,
        note_id: Uuid,
        status: NoteStatus,
    },

    /// The board was cleared by the user.
    SessionReset { epoch: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_in_snake_case() {
        let event = ProgressEvent::KindReady {
            epoch: 3,
            kind: ContentKind::Flashcards,
            text: "### Flashcard 1".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "kind_ready");
        assert_eq!(json["kind"], "flashcards");
        assert_eq!(json["epoch"], 3);
    }
}
