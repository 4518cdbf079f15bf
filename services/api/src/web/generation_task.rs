//! services/api/src/web/generation_task.rs
//!
//! Drives one note through study-material generation.
//!
//! The summary is generated while the caller waits; bullets, flashcards and the quiz
//! follow in a tracked background task, one at a time with a pacing delay between
//! them to stay under provider rate limits. Every board update carries the session
//! epoch, so a session orphaned by a reset keeps running and persisting its own note
//! but can no longer touch the board.

use crate::web::{
    protocol::ProgressEvent,
    state::{AppState, GenerationTracker},
};
use std::sync::Arc;
use study_notes_core::board::{Applied, GenerationBoard};
use study_notes_core::domain::{ContentKind, NoteOutputs, NoteStatus, NoteUpdate, OUTPUT_TYPE_ALL};
use study_notes_core::ports::PortError;
use study_notes_core::validation::{validate_input_length, ValidationError};
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Generated after the summary, in this order.
const BACKGROUND_KINDS: [ContentKind; 3] = [
    ContentKind::Bullets,
    ContentKind::Flashcards,
    ContentKind::Quiz,
];

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("A generation is already in progress")]
    AlreadyRunning,
    #[error(transparent)]
    Port(#[from] PortError),
}

/// Starts a generation session for `note_id` and returns the board once the summary
/// has resolved.
///
/// Input is validated before any provider call. The session itself runs as a tracked
/// task, so it settles the board and the note even if the caller goes away. A second
/// start is refused while this user's summary is in flight or while any session for
/// the same note is still running. If the note cannot be moved to `generating`, it is
/// marked `failed` and the error is returned.
pub async fn start_generation(
    app_state: Arc<AppState>,
    user_id: Uuid,
    note_id: Uuid,
    text: String,
) -> Result<GenerationBoard, GenerationError> {
    validate_input_length(&text, app_state.config.max_input_chars)?;

    let tracker = app_state.sessions.tracker(user_id).await;
    let (claim, epoch) = {
        let mut board = tracker.board.lock().await;
        if board.is_generating() {
            return Err(GenerationError::AlreadyRunning);
        }
        let claim = tracker
            .claim_note(note_id)
            .ok_or(GenerationError::AlreadyRunning)?;
        (claim, board.start_session())
    };
    tracker.publish(ProgressEvent::SessionStarted { epoch, note_id });
    info!(%note_id, epoch, chars = text.chars().count(), "Generation session started.");

    let (summary_tx, summary_rx) = oneshot::channel();
    let session = Session {
        app_state: app_state.clone(),
        tracker,
        user_id,
        note_id,
        epoch,
        text,
    };
    app_state.tasks.spawn(async move {
        session.run(summary_tx).await;
        drop(claim);
    });

    summary_rx.await.map_err(|_| {
        GenerationError::Port(PortError::Unexpected(
            "Generation session ended before the summary resolved".to_string(),
        ))
    })?
}

/// One note's pass through all four kinds.
struct Session {
    app_state: Arc<AppState>,
    tracker: Arc<GenerationTracker>,
    user_id: Uuid,
    note_id: Uuid,
    epoch: u64,
    text: String,
}

impl Session {
    async fn run(self, summary_tx: oneshot::Sender<Result<GenerationBoard, GenerationError>>) {
        let Self {
            app_state,
            tracker,
            user_id,
            note_id,
            epoch,
            text,
        } = self;

        let marked = app_state
            .db
            .update_note(
                note_id,
                user_id,
                NoteUpdate {
                    input_text: Some(text.clone()),
                    ..NoteUpdate::status(NoteStatus::Generating)
                },
            )
            .await;
        if let Err(e) = marked {
            error!(%note_id, "Failed to mark note as generating: {:?}", e);
            mark_failed(&app_state, note_id, user_id).await;
            tracker.board.lock().await.summary_resolved(epoch);
            let _ = summary_tx.send(Err(e.into()));
            return;
        }

        let mut outputs = NoteOutputs::default();
        generate_kind(&app_state, &tracker, epoch, ContentKind::Summary, &text, &mut outputs).await;

        let board = {
            let mut board = tracker.board.lock().await;
            board.summary_resolved(epoch);
            board.clone()
        };
        tracker.publish(ProgressEvent::ResultsAvailable { epoch, note_id });
        if summary_tx.send(Ok(board)).is_err() {
            info!(%note_id, epoch, "Caller left before the summary resolved; continuing.");
        }

        background_phase(app_state, tracker, user_id, note_id, epoch, text, outputs).await;
    }
}

/// Generates one kind, records it on the board (if the session is still current) and
/// in the session's own `outputs`.
async fn generate_kind(
    app_state: &AppState,
    tracker: &GenerationTracker,
    epoch: u64,
    kind: ContentKind,
    text: &str,
    outputs: &mut NoteOutputs,
) {
    if tracker.board.lock().await.begin(kind, epoch) == Applied::Yes {
        tracker.publish(ProgressEvent::KindStarted { epoch, kind });
    }

    let outcome = app_state.generator.generate(kind, text).await;
    let applied = tracker
        .board
        .lock()
        .await
        .finish(kind, epoch, outcome.as_deref());
    if applied == Applied::Stale {
        info!(%kind, epoch, "Discarding result for a superseded session.");
    }

    match outcome {
        Ok(generated) => {
            info!(%kind, epoch, "Generated content.");
            if applied == Applied::Yes {
                tracker.publish(ProgressEvent::KindReady {
                    epoch,
                    kind,
                    text: generated.clone(),
                });
            }
            outputs.insert(kind, generated);
        }
        Err(e) => {
            error!(%kind, epoch, "Error generating content: {:?}", e);
            let message = kind.error_message();
            if applied == Applied::Yes {
                tracker.publish(ProgressEvent::KindFailed {
                    epoch,
                    kind,
                    message: message.clone(),
                    reason: e.to_string(),
                });
            }
            outputs.insert(kind, message);
        }
    }
}

async fn background_phase(
    app_state: Arc<AppState>,
    tracker: Arc<GenerationTracker>,
    user_id: Uuid,
    note_id: Uuid,
    epoch: u64,
    text: String,
    mut outputs: NoteOutputs,
) {
    for kind in BACKGROUND_KINDS {
        tokio::select! {
            _ = app_state.shutdown.cancelled() => {
                warn!(%note_id, %kind, "Shutdown requested, abandoning generation.");
                mark_failed(&app_state, note_id, user_id).await;
                tracker.publish(ProgressEvent::SessionCompleted {
                    epoch,
                    note_id,
                    status: NoteStatus::Failed,
                });
                return;
            }
            _ = tokio::time::sleep(app_state.config.pacing_delay) => {}
        }
        generate_kind(&app_state, &tracker, epoch, kind, &text, &mut outputs).await;
    }

    let status = persist_outputs(&app_state, note_id, user_id, &outputs).await;
    info!(%note_id, epoch, status = status.as_str(), "Generation session finished.");
    tracker.publish(ProgressEvent::SessionCompleted {
        epoch,
        note_id,
        status,
    });
}

/// Writes the combined outputs and `completed`, or `failed` if that write fails.
async fn persist_outputs(
    app_state: &AppState,
    note_id: Uuid,
    user_id: Uuid,
    outputs: &NoteOutputs,
) -> NoteStatus {
    let output_text = match outputs.to_json() {
        Ok(json) => json,
        Err(e) => {
            error!(%note_id, "Failed to serialize outputs: {}", e);
            mark_failed(app_state, note_id, user_id).await;
            return NoteStatus::Failed;
        }
    };

    let update = NoteUpdate {
        output_type: Some(OUTPUT_TYPE_ALL.to_string()),
        output_text: Some(output_text),
        ..NoteUpdate::status(NoteStatus::Completed)
    };
    match app_state.db.update_note(note_id, user_id, update).await {
        Ok(_) => NoteStatus::Completed,
        Err(e) => {
            error!(%note_id, "Failed to save generated outputs: {:?}", e);
            mark_failed(app_state, note_id, user_id).await;
            NoteStatus::Failed
        }
    }
}

async fn mark_failed(app_state: &AppState, note_id: Uuid, user_id: Uuid) {
    if let Err(e) = app_state
        .db
        .update_note(note_id, user_id, NoteUpdate::status(NoteStatus::Failed))
        .await
    {
        error!(%note_id, "Failed to mark note as failed: {:?}", e);
    }
}
