//! Single shared speech channel.
//!
//! The app builds one `NarrationService` at startup and hands clones to
//! whoever needs to speak. Requests go through a priority queue drained by
//! one worker task, so narration never overlaps. Callers never wait for
//! playback, and playback failures never reach them.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

/// Voice presets for the speech backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum VoiceStyle {
    /// Slow and low; default for scenarios and questions.
    #[default]
    Calm,
    /// Brighter voice for praise.
    Cheerful,
    Neutral,
}

impl VoiceStyle {
    /// Speaking rate relative to the platform default.
    #[must_use]
    pub fn rate(self) -> f32 {
        match self {
            VoiceStyle::Calm => 0.85,
            VoiceStyle::Cheerful => 1.0,
            VoiceStyle::Neutral => 0.95,
        }
    }

    #[must_use]
    pub fn pitch(self) -> f32 {
        match self {
            VoiceStyle::Calm => 0.9,
            VoiceStyle::Cheerful => 1.2,
            VoiceStyle::Neutral => 1.0,
        }
    }
}

/// Queue priority. `High` replaces anything still waiting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: VoiceStyle,
    pub priority: Priority,
}

//
// ─── QUEUE ─────────────────────────────────────────────────────────────────────
//

struct Queued {
    seq: u64,
    utterance: Utterance,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    // Max-heap: higher priority first, then lower sequence number (FIFO).
    fn cmp(&self, other: &Self) -> Ordering {
        self.utterance
            .priority
            .cmp(&other.utterance.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of pending utterances, FIFO within a priority.
#[derive(Default)]
pub struct SpeechQueue {
    heap: BinaryHeap<Queued>,
    next_seq: u64,
}

impl SpeechQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, utterance: Utterance) {
        if utterance.priority == Priority::High {
            self.heap.clear();
        }
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.heap.push(Queued { seq, utterance });
    }

    pub fn pop(&mut self) -> Option<Utterance> {
        self.heap.pop().map(|q| q.utterance)
    }

    pub fn clear(&mut self) -> usize {
        let dropped = self.heap.len();
        self.heap.clear();
        dropped
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

//
// ─── BACKENDS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SpeechError {
    #[error("speech output unavailable: {0}")]
    Unavailable(String),
    #[error("speech playback failed: {0}")]
    Failed(String),
}

/// Audio output used by the narration worker.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Speak one utterance, returning when playback ends.
    ///
    /// # Errors
    ///
    /// Returns `SpeechError` if the text cannot be spoken.
    async fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError>;
}

/// Writes narration to the log instead of a speaker.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSpeechBackend;

#[async_trait]
impl SpeechBackend for TracingSpeechBackend {
    async fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
        info!(
            target: "narration",
            voice = ?utterance.voice,
            rate = utterance.voice.rate(),
            pitch = utterance.voice.pitch(),
            "{}",
            utterance.text
        );
        Ok(())
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

struct Shared {
    queue: Mutex<SpeechQueue>,
    wake: Notify,
    closed: AtomicBool,
}

impl Shared {
    fn next(&self) -> Option<Utterance> {
        match self.queue.lock() {
            Ok(mut queue) => queue.pop(),
            Err(poisoned) => poisoned.into_inner().pop(),
        }
    }
}

/// Cloneable handle to the narration channel.
#[derive(Clone)]
pub struct NarrationService {
    shared: Option<Arc<Shared>>,
}

impl NarrationService {
    /// Start the worker on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn(backend: Arc<dyn SpeechBackend>) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(SpeechQueue::new()),
            wake: Notify::new(),
            closed: AtomicBool::new(false),
        });
        tokio::spawn(run_worker(Arc::clone(&shared), backend));
        Self {
            shared: Some(shared),
        }
    }

    /// A handle that silently drops every request.
    #[must_use]
    pub fn disabled() -> Self {
        Self { shared: None }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.shared.is_some()
    }

    /// Queue text at normal priority.
    pub fn speak(&self, text: impl Into<String>, voice: VoiceStyle) {
        self.speak_with_priority(text, voice, Priority::Normal);
    }

    pub fn speak_with_priority(&self, text: impl Into<String>, voice: VoiceStyle, priority: Priority) {
        let Some(shared) = &self.shared else {
            return;
        };
        let text = text.into();
        if text.trim().is_empty() || shared.closed.load(AtomicOrdering::Acquire) {
            return;
        }
        let utterance = Utterance {
            text,
            voice,
            priority,
        };
        match shared.queue.lock() {
            Ok(mut queue) => queue.push(utterance),
            Err(poisoned) => poisoned.into_inner().push(utterance),
        }
        shared.wake.notify_one();
    }

    /// Drop everything still waiting; the utterance being spoken finishes.
    pub fn interrupt(&self) {
        let Some(shared) = &self.shared else {
            return;
        };
        let dropped = match shared.queue.lock() {
            Ok(mut queue) => queue.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        };
        if dropped > 0 {
            debug!(dropped, "narration interrupted");
        }
    }

    /// Stop the worker after the current utterance. Later requests are ignored.
    pub fn shutdown(&self) {
        if let Some(shared) = &self.shared {
            shared.closed.store(true, AtomicOrdering::Release);
            shared.wake.notify_one();
        }
    }
}

impl fmt::Debug for NarrationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrationService")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

async fn run_worker(shared: Arc<Shared>, backend: Arc<dyn SpeechBackend>) {
    loop {
        if shared.closed.load(AtomicOrdering::Acquire) {
            break;
        }
        match shared.next() {
            Some(utterance) => {
                if let Err(err) = backend.speak(&utterance).await {
                    warn!(error = %err, "narration failed; continuing");
                }
            }
            None => shared.wake.notified().await,
        }
    }
    debug!("narration worker stopped");
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
