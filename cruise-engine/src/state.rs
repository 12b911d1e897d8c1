//! Per-run session state, owned by the engine and injected into handlers.
//!
//! There is deliberately no global mutable state anywhere in this workspace;
//! every handler receives `&mut SessionState` for exactly one tick at a
//! time, which is what makes the pipeline safe to re-run indefinitely.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use cruise_dom::ElementHandle;
use serde::Serialize;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use crate::fingerprint::Fingerprint;

/// Minimum elapsed time after a drag-drop completion before another
/// drag-drop question may be processed.
pub const QUIZ_COOLDOWN: Duration = Duration::from_millis(10_000);

/// Mutable record of progress across ticks.
#[derive(Debug)]
pub struct SessionState {
    pub session: Uuid,
    pub started_at: DateTime<Utc>,
    /// Monotonic count of questions acted on.
    pub questions_answered: u64,
    /// Last question text the choice handler acted on; suppresses immediate
    /// re-entry on the same question.
    pub last_question_text: String,
    pub media_playing: bool,
    pub media_completed: bool,
    pub quiz_completed: bool,
    pub last_quiz_completion: Option<Instant>,
    /// Last control navigation activated; suppresses re-clicking the same
    /// control until the stuck detector clears it.
    pub last_clicked: Option<ElementHandle>,
    pub stuck_count: u32,
    pub last_page_text: String,
    /// Permanent dedup ledger. Questions may recur by text but must never be
    /// reprocessed, so this only grows.
    pub processed_questions: HashSet<Fingerprint>,
    /// Media elements whose advisory completion notification has been
    /// subscribed to, keyed by element slot.
    pub watched_media: HashSet<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            session: Uuid::new_v4(),
            started_at: Utc::now(),
            questions_answered: 0,
            last_question_text: String::new(),
            media_playing: false,
            media_completed: false,
            quiz_completed: false,
            last_quiz_completion: None,
            last_clicked: None,
            stuck_count: 0,
            last_page_text: String::new(),
            processed_questions: HashSet::new(),
            watched_media: HashSet::new(),
        }
    }

    /// The sole reset point for moving from one section to the next,
    /// invoked when navigation succeeds. The dedup ledger is untouched.
    pub fn reset_section(&mut self) {
        self.media_playing = false;
        self.media_completed = false;
        self.quiz_completed = false;
        self.last_question_text.clear();
        self.last_quiz_completion = None;
    }

    /// Whether the drag-drop cool-down window is still open at `now`.
    pub fn cooldown_active(&self, now: Instant) -> bool {
        self.last_quiz_completion
            .map(|at| now.duration_since(at) < QUIZ_COOLDOWN)
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            session: self.session,
            started_at: self.started_at,
            questions_answered: self.questions_answered,
            media_playing: self.media_playing,
            media_completed: self.media_completed,
            quiz_completed: self.quiz_completed,
            cooldown_active: self.cooldown_active(Instant::now()),
            stuck_count: self.stuck_count,
            processed_questions: self.processed_questions.len(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of [`SessionState`] for the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub session: Uuid,
    pub started_at: DateTime<Utc>,
    pub questions_answered: u64,
    pub media_playing: bool,
    pub media_completed: bool,
    pub quiz_completed: bool,
    pub cooldown_active: bool,
    pub stuck_count: u32,
    pub processed_questions: usize,
}
