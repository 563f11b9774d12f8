//! Mapping from transport reason codes to user-facing categories.

use petwalk_transport::{ConnectFailedReason, DisconnectReason, ShutdownReason};

use crate::ErrorCategory;

/// Any failure code a transport can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCode {
    Shutdown(ShutdownReason),
    ConnectFailed(ConnectFailedReason),
    Disconnect(DisconnectReason),
}

impl From<ShutdownReason> for FailureCode {
    fn from(reason: ShutdownReason) -> Self {
        Self::Shutdown(reason)
    }
}

impl From<ConnectFailedReason> for FailureCode {
    fn from(reason: ConnectFailedReason) -> Self {
        Self::ConnectFailed(reason)
    }
}

impl From<DisconnectReason> for FailureCode {
    fn from(reason: DisconnectReason) -> Self {
        Self::Disconnect(reason)
    }
}

/// Classifies a transport failure. Pure and total.
///
/// Clean shutdown codes are not failures; callers check
/// [`ShutdownReason::is_error`] first. Passed here anyway they land in
/// [`ErrorCategory::Unknown`].
pub fn classify(code: impl Into<FailureCode>) -> ErrorCategory {
    match code.into() {
        FailureCode::Shutdown(reason) => match reason {
            ShutdownReason::ServerInRoom => ErrorCategory::ServerError,
            ShutdownReason::GameNotFound
            | ShutdownReason::GameIdAlreadyExists
            | ShutdownReason::OperationTimeout => ErrorCategory::RoomSearchTimeout,
            ShutdownReason::GameIsFull | ShutdownReason::MaxCcuReached => ErrorCategory::RoomFull,
            ShutdownReason::ConnectionRefused
            | ShutdownReason::ConnectionTimeout
            | ShutdownReason::DisconnectedByPluginLogic
            | ShutdownReason::Error => ErrorCategory::MidSessionDisconnect,
            ShutdownReason::Ok
            | ShutdownReason::GameClosed
            | ShutdownReason::OperationCanceled
            | ShutdownReason::Other(_) => ErrorCategory::Unknown,
        },
        FailureCode::ConnectFailed(reason) => match reason {
            ConnectFailedReason::Timeout => ErrorCategory::RoomSearchTimeout,
            ConnectFailedReason::ServerFull => ErrorCategory::RoomFull,
            ConnectFailedReason::ServerRefused => ErrorCategory::ServerError,
            ConnectFailedReason::Other(_) => ErrorCategory::Unknown,
        },
        FailureCode::Disconnect(reason) => match reason {
            DisconnectReason::Timeout | DisconnectReason::ByServer | DisconnectReason::ByClient => {
                ErrorCategory::MidSessionDisconnect
            }
            DisconnectReason::Other(_) => ErrorCategory::Unknown,
        },
    }
}
