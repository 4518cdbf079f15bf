//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-user generation trackers.

use crate::config::Config;
use crate::web::protocol::ProgressEvent;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use study_notes_core::board::GenerationBoard;
use study_notes_core::ports::{DatabaseService, ContentGenerationService, TextExtractionService};
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

/// Buffered progress events per user before slow subscribers start lagging.
const EVENT_CAPACITY: usize = 64;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub generator: Arc<dyn ContentGenerationService>,
    pub extractor: Arc<dyn TextExtractionService>,
    pub sessions: Arc<GenerationRegistry>,
    /// Background generation phases, awaited on shutdown.
    pub tasks: TaskTracker,
    /// Cancelled when the server begins shutting down.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<dyn DatabaseService>,
        generator: Arc<dyn ContentGenerationService>,
        extractor: Arc<dyn TextExtractionService>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            generator,
            extractor,
            sessions: Arc::new(GenerationRegistry::default()),
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }
}

//=========================================================================================
// Generation Tracking (One Board Per User)
//=========================================================================================

/// The live board of one user plus the channel its progress is announced on.
pub struct GenerationTracker {
    pub board: Mutex<GenerationBoard>,
    events: broadcast::Sender<ProgressEvent>,
    /// Notes with a session still in flight, summary or background phase.
    running_notes: StdMutex<HashSet<Uuid>>,
}

impl GenerationTracker {
    fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            board: Mutex::new(GenerationBoard::new()),
            events,
            running_notes: StdMutex::new(HashSet::new()),
        }
    }

    /// Reserves `note_id` for one session. Returns `None` while another session for
    /// the same note is still running; the reservation ends when the claim is dropped.
    pub fn claim_note(self: &Arc<Self>, note_id: Uuid) -> Option<NoteClaim> {
        let mut running = self.running_notes.lock().unwrap_or_else(PoisonError::into_inner);
        running.insert(note_id).then(|| NoteClaim {
            tracker: self.clone(),
            note_id,
        })
    }

    pub async fn snapshot(&self) -> GenerationBoard {
        self.board.lock().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    /// Announces `event` to current subscribers. Having none is not an error.
    pub fn publish(&self, event: ProgressEvent) {
        let _ = self.events.send(event);
    }
}

/// Held by a running session for as long as it may touch its note.
pub struct NoteClaim {
    tracker: Arc<GenerationTracker>,
    note_id: Uuid,
}

impl Drop for NoteClaim {
    fn drop(&mut self) {
        self.tracker
            .running_notes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.note_id);
    }
}

#[derive(Default)]
pub struct GenerationRegistry {
    trackers: Mutex<HashMap<Uuid, Arc<GenerationTracker>>>,
}

impl GenerationRegistry {
    /// Returns the user's tracker, creating an idle one on first use.
    pub async fn tracker(&self, user_id: Uuid) -> Arc<GenerationTracker> {
        self.trackers
            .lock()
            .await
            .entry(user_id)
            .or_insert_with(|| Arc::new(GenerationTracker::new()))
            .clone()
    }
}
