//! The single global error stream.
//!
//! Raising an error does three things: logs it at warn level, remembers it
//! as the "last error" for diagnostics, and broadcasts it to every
//! subscriber once. Subscribers that lag behind lose old notices rather
//! than blocking the raiser.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::{ErrorCategory, ErrorEvent, NetworkProbe};

/// Default broadcast buffer for error notices.
const DEFAULT_NOTICE_CAPACITY: usize = 32;

/// What subscribers receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorNotice {
    /// An error was raised.
    Raised(ErrorEvent),
    /// The error state was cleared (e.g. after a successful join).
    Cleared,
}

/// Publishes [`ErrorEvent`]s. Cheap to clone; clones share one stream.
#[derive(Clone)]
pub struct ErrorNotifier {
    notices: broadcast::Sender<ErrorNotice>,
    last: Arc<watch::Sender<Option<ErrorEvent>>>,
    probe: Arc<dyn NetworkProbe>,
}

impl ErrorNotifier {
    /// Creates a notifier that answers reachability questions with `probe`.
    pub fn new(probe: impl NetworkProbe) -> Self {
        let (notices, _) = broadcast::channel(DEFAULT_NOTICE_CAPACITY);
        let (last, _) = watch::channel(None);
        Self {
            notices,
            last: Arc::new(last),
            probe: Arc::new(probe),
        }
    }

    /// Builds the event for `category`, records it as the last error, and
    /// broadcasts it.
    pub fn raise(&self, category: ErrorCategory, debug_detail: Option<&str>) -> ErrorEvent {
        let event = ErrorEvent::new(category, debug_detail);
        tracing::warn!(
            code = category.code(),
            can_retry = event.can_retry,
            auto_return = event.auto_return,
            debug = %event.debug_message,
            "error raised"
        );
        self.last.send_replace(Some(event.clone()));
        // No subscribers is fine; the event is still recorded above.
        let _ = self.notices.send(ErrorNotice::Raised(event.clone()));
        event
    }

    /// Clears the last error and tells subscribers.
    pub fn clear(&self) {
        self.last.send_replace(None);
        let _ = self.notices.send(ErrorNotice::Cleared);
    }

    /// The most recently raised error, if it has not been cleared.
    pub fn last_error(&self) -> Option<ErrorEvent> {
        self.last.borrow().clone()
    }

    /// Subscribes to future notices.
    pub fn subscribe(&self) -> broadcast::Receiver<ErrorNotice> {
        self.notices.subscribe()
    }

    /// Pre-flight connectivity check. Synchronous.
    pub fn is_network_reachable(&self) -> bool {
        self.probe.is_reachable()
    }
}

impl std::fmt::Debug for ErrorNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorNotifier")
            .field("last", &*self.last.borrow())
            .field("subscribers", &self.notices.receiver_count())
            .finish()
    }
}
