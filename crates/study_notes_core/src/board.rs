//! crates/study_notes_core/src/board.rs
//!
//! The observable state of one document's generation session: four independent
//! pending/generating/ready/error state machines, one per content kind.
//!
//! Every session is tagged with an epoch. Starting a new session or resetting bumps
//! the epoch, and updates carrying an older epoch are discarded, so a slow response
//! from an abandoned session can never populate the results of a newer one.

use crate::domain::{ContentKind, GenerationResult, GenerationStatus};
use serde::Serialize;

/// Whether an update was applied to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Yes,
    /// The update belonged to an older session and was dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationBoard {
    epoch: u64,
    is_generating: bool,
    results: [GenerationResult; 4],
}

impl Default for GenerationBoard {
    fn default() -> Self {
        Self {
            epoch: 0,
            is_generating: false,
            results: ContentKind::ALL.map(GenerationResult::pending),
        }
    }
}

impl GenerationBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True while the summary phase of the current session is in flight.
    pub fn is_generating(&self) -> bool {
        self.is_generating
    }

    pub fn result(&self, kind: ContentKind) -> &GenerationResult {
        &self.results[slot(kind)]
    }

    pub fn results(&self) -> &[GenerationResult; 4] {
        &self.results
    }

    /// Opens a new session with every kind pending. Returns the session's epoch.
    pub fn start_session(&mut self) -> u64 {
        self.clear();
        self.is_generating = true;
        self.epoch
    }

    /// The "start new" action: discards in-memory results and orphans any session
    /// still running in the background.
    pub fn reset(&mut self) -> u64 {
        self.clear();
        self.epoch
    }

    fn clear(&mut self) {
        self.epoch += 1;
        self.is_generating = false;
        self.results = ContentKind::ALL.map(GenerationResult::pending);
    }

    /// Marks the summary phase as resolved so the results view may render.
    pub fn summary_resolved(&mut self, epoch: u64) -> Applied {
        if epoch != self.epoch {
            return Applied::Stale;
        }
        self.is_generating = false;
        Applied::Yes
    }

    /// pending -> generating.
    pub fn begin(&mut self, kind: ContentKind, epoch: u64) -> Applied {
        if epoch != self.epoch {
            return Applied::Stale;
        }
        let result = &mut self.results[slot(kind)];
        result.status = GenerationStatus::Generating;
        Applied::Yes
    }

    /// generating -> ready, or generating -> error with the fixed per-kind message.
    pub fn finish<E>(
        &mut self,
        kind: ContentKind,
        epoch: u64,
        outcome: Result<&str, E>,
    ) -> Applied {
        if epoch != self.epoch {
            return Applied::Stale;
        }
        let result = &mut self.results[slot(kind)];
        match outcome {
            Ok(text) => {
                result.text = text.to_string();
                result.status = GenerationStatus::Ready;
            }
            Err(_) => {
                result.text = kind.error_message();
                result.status = GenerationStatus::Error;
            }
        }
        Applied::Yes
    }

    /// True once every kind has resolved to ready or error.
    pub fn is_settled(&self) -> bool {
        self.results.iter().all(|r| {
            matches!(r.status, GenerationStatus::Ready | GenerationStatus::Error)
        })
    }
}

fn slot(kind: ContentKind) -> usize {
    match kind {
        ContentKind::Summary => 0,
        ContentKind::Bullets => 1,
        ContentKind::Flashcards => 2,
        ContentKind::Quiz => 3,
    }
}
