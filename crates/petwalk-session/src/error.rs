//! Error types for the session layer.

/// Errors that can occur when talking to the session coordinator.
///
/// User-facing connection failures are not errors here: they are reported
/// as `ErrorEvent`s on the notifier and surface as `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The coordinator task has stopped, so its command channel is closed.
    #[error("session coordinator is unavailable")]
    Unavailable,
}
