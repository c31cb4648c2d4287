//! Invocation lifecycle events.
//!
//! The process runner emits events via [`EventBus::emit`]; observers
//! subscribe via [`EventBus::subscribe`]. Built on
//! [`tokio::sync::broadcast`] so multiple listeners can react
//! independently. Nothing in the bridge depends on anyone listening.

use tokio::sync::broadcast;

/// How an invocation settled, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The process closed; a raw result was produced.
    Completed { exit_code: i32 },
    /// The timeout fired; the process may still be shutting down.
    TimedOut,
    /// The process could not be spawned or waited on.
    LaunchFailed,
}

/// Events that flow out of the process runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The child process started.
    Spawned { pid: Option<u32>, command: String },
    /// The invocation settled. Emitted once per invocation, after the
    /// output streams have been detached.
    Settled {
        pid: Option<u32>,
        settlement: Settlement,
    },
    /// Graceful termination was requested after a timeout.
    TerminateSent { pid: Option<u32> },
    /// The grace period elapsed and the child was force-killed.
    KillSent { pid: Option<u32> },
    /// A timed-out child has been reaped.
    Reaped { pid: Option<u32>, forced: bool },
}

/// A broadcast channel that any component can emit to or subscribe from.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all current subscribers.
    /// Returns the number of receivers that will see it.
    pub fn emit(&self, event: Event) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to events. Returns a receiver that yields all
    /// future events (does not replay past ones).
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
