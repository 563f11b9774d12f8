use crate::ShutdownReason;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The relay refused to start the session.
    ///
    /// `reason` is the transport's own shutdown code; the session layer
    /// classifies it into a user-facing category.
    #[error("session {session} rejected: {reason}")]
    StartRejected {
        /// Name of the session that was requested.
        session: String,
        /// Why the relay refused.
        reason: ShutdownReason,
    },

    /// The transport backend could not be reached at all.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The transport was shut down while the operation was pending.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// Returns the transport shutdown code behind this error, if any.
    pub fn shutdown_reason(&self) -> Option<ShutdownReason> {
        match self {
            Self::StartRejected { reason, .. } => Some(*reason),
            Self::Unavailable(_) => Some(ShutdownReason::ConnectionRefused),
            Self::Shutdown => Some(ShutdownReason::OperationCanceled),
        }
    }

    /// Returns `true` if the relay refused because the room had no free slot.
    pub fn is_room_full(&self) -> bool {
        matches!(
            self.shutdown_reason(),
            Some(ShutdownReason::GameIsFull | ShutdownReason::MaxCcuReached)
        )
    }
}
