//! Fire-and-forget notification surface for the presentation layer.
//!
//! The engine reports through exactly three event kinds: a human-readable
//! log line, a download progress percentage, and a terminal outcome. The
//! [`EventBus`] wraps a broadcast channel so emission never blocks engine
//! forward progress: with no subscribers the event is dropped, and a slow
//! subscriber lags and loses the oldest events instead of back-pressuring
//! the network loop.

use tokio::sync::broadcast;

/// Default event buffer depth per subscriber before lagging sets in.
const EVENT_BUFFER: usize = 256;

/// A notification emitted by the resolution engine or transfer executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Human-readable log line explaining progress or a soft failure.
    Log(String),
    /// Download progress percentage, 0..=100.
    Progress(u8),
    /// Terminal transfer outcome. `path` is empty on failure.
    Done {
        /// Final artifact path, or empty when the transfer failed.
        path: String,
        /// Whether the transfer completed and was published.
        success: bool,
    },
}

/// Non-blocking event dispatch shared by providers, engine, and transfers.
///
/// Cloning is cheap; all clones feed the same subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a bus with the default buffer depth.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(EVENT_BUFFER)
    }

    /// Creates a bus with an explicit per-subscriber buffer depth.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribes to all events emitted after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Emits an event. Never blocks; dropped when nobody is listening.
    pub fn emit(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Emits a log line event.
    pub fn log(&self, message: impl Into<String>) {
        self.emit(Event::Log(message.into()));
    }

    /// Emits a progress event, capped at 100.
    pub fn progress(&self, percent: u8) {
        self.emit(Event::Progress(percent.min(100)));
    }

    /// Emits the terminal transfer outcome.
    pub fn done(&self, path: impl Into<String>, success: bool) {
        self.emit(Event::Done {
            path: path.into(),
            success,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
