//! Error categories and the policy table behind them.
//!
//! [`ErrorCategory::policy`] is the only place user-facing copy lives.
//! Everything else (the notifier, the coordinator, the UI bridge) reads
//! messages and flags from here.

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// The fixed set of failures a player can be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The device has no connectivity.
    NoNetwork,
    /// No matchmaking candidate could be joined.
    RoomSearchTimeout,
    /// Every room tried was at capacity.
    RoomFull,
    /// An established session dropped. Informational: automatic
    /// reconnection owns recovery.
    MidSessionDisconnect,
    /// Voice features need a microphone the player has not granted.
    MicrophonePermissionDenied,
    /// The relay reported a failure on its side.
    ServerError,
    /// The app stayed in the background past the rejoin threshold.
    BackgroundTimeout,
    /// Automatic reconnection ran out of attempts.
    ReconnectExhausted,
    /// Anything we could not classify.
    Unknown,
}

impl ErrorCategory {
    /// Every category, in code order.
    pub const ALL: [ErrorCategory; 9] = [
        Self::NoNetwork,
        Self::RoomSearchTimeout,
        Self::RoomFull,
        Self::MidSessionDisconnect,
        Self::MicrophonePermissionDenied,
        Self::ServerError,
        Self::BackgroundTimeout,
        Self::ReconnectExhausted,
        Self::Unknown,
    ];

    /// Stable short code, suitable for logs and support tickets.
    pub fn code(self) -> &'static str {
        match self {
            Self::NoNetwork => "E001",
            Self::RoomSearchTimeout => "E002",
            Self::RoomFull => "E003",
            Self::MidSessionDisconnect => "E004",
            Self::MicrophonePermissionDenied => "E005",
            Self::ServerError => "E006",
            Self::BackgroundTimeout => "E007",
            Self::ReconnectExhausted => "E008",
            Self::Unknown => "E099",
        }
    }

    /// Returns the category's entry in the policy table.
    pub fn policy(self) -> ErrorPolicy {
        match self {
            Self::NoNetwork => ErrorPolicy {
                user_message: "Please connect to the internet.",
                default_debug: "Network unreachable",
                can_retry: true,
                auto_return: false,
            },
            Self::RoomSearchTimeout => ErrorPolicy {
                user_message: "We couldn't get you in.\nPlease try again.",
                default_debug: "Room search timeout",
                can_retry: true,
                auto_return: false,
            },
            Self::RoomFull => ErrorPolicy {
                user_message: "It's busy right now.\nPlease wait a little while.",
                default_debug: "All rooms full",
                can_retry: true,
                auto_return: false,
            },
            Self::MidSessionDisconnect => ErrorPolicy {
                user_message: "You got disconnected.\nReconnecting now...",
                default_debug: "Connection lost",
                can_retry: false,
                auto_return: false,
            },
            Self::MicrophonePermissionDenied => ErrorPolicy {
                user_message: "The microphone can't be used.\nPlease allow it in Settings.",
                default_debug: "Microphone permission denied",
                can_retry: false,
                auto_return: false,
            },
            Self::ServerError => ErrorPolicy {
                user_message: "The walk is taking a break.\nPlease come back later.",
                default_debug: "Relay server error",
                can_retry: false,
                auto_return: true,
            },
            Self::BackgroundTimeout => ErrorPolicy {
                user_message: "You were away for a while,\nso the walk has ended.",
                default_debug: "Background timeout",
                can_retry: false,
                auto_return: true,
            },
            Self::ReconnectExhausted => ErrorPolicy {
                user_message: "We couldn't reconnect.\nHeading back home.",
                default_debug: "Reconnect attempts exhausted",
                can_retry: false,
                auto_return: true,
            },
            Self::Unknown => ErrorPolicy {
                user_message: "Something went wrong.",
                default_debug: "Unknown error",
                can_retry: true,
                auto_return: false,
            },
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One row of the policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPolicy {
    /// Plain-language text shown to the player.
    pub user_message: &'static str,
    /// Debug text used when the raiser supplies no detail.
    pub default_debug: &'static str,
    /// Whether the UI should offer a retry button.
    pub can_retry: bool,
    /// Whether the UI should leave the session screen on its own.
    pub auto_return: bool,
}

// ---------------------------------------------------------------------------
// ErrorEvent
// ---------------------------------------------------------------------------

/// An immutable, broadcastable description of one failure.
///
/// `debug_message` is for logs only; UIs must show `user_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEvent {
    pub category: ErrorCategory,
    pub user_message: &'static str,
    pub debug_message: String,
    pub can_retry: bool,
    pub auto_return: bool,
}

impl ErrorEvent {
    /// Builds the event for `category` from the policy table.
    pub fn new(category: ErrorCategory, debug_detail: Option<&str>) -> Self {
        let policy = category.policy();
        Self {
            category,
            user_message: policy.user_message,
            debug_message: debug_detail.unwrap_or(policy.default_debug).to_string(),
            can_retry: policy.can_retry,
            auto_return: policy.auto_return,
        }
    }
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (debug: {})",
            self.category.code(),
            self.user_message.replace('\n', " "),
            self.debug_message
        )
    }
}
