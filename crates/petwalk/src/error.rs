//! Unified error type for petwalk.

use petwalk_session::SessionError;
use petwalk_transport::TransportError;

/// Top-level error that wraps the crate-specific errors.
///
/// Connection failures a player should see are not here; they arrive as
/// `ErrorEvent`s on the notifier. This type covers plumbing problems only.
#[derive(Debug, thiserror::Error)]
pub enum PetwalkError {
    /// A transport-level error, for host code that calls a
    /// [`Transport`](petwalk_transport::Transport) directly (a lobby check,
    /// a diagnostics screen) and wants `?` into this type. `WalkClient`
    /// itself never returns it; failed joins come back as `Ok(false)`.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The session coordinator is gone.
    #[error(transparent)]
    Session(#[from] SessionError),
}
