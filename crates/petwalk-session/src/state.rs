//! Observable coordinator state.

use std::fmt;

/// Status text published when a round of joining begins.
pub const STATUS_CONNECTING: &str = "Connecting...";
/// Status text published once a session is joined.
pub const STATUS_CONNECTED: &str = "Connected";
/// Status text published when recovery starts after a drop or resume.
pub const STATUS_RECONNECTING: &str = "Reconnecting...";
/// Status text published when the session is lost.
pub const STATUS_DISCONNECTED: &str = "Disconnected";

/// Status text for retry `attempt` of `max`.
pub fn reconnecting_status(attempt: u32, max: u32) -> String {
    format!("Reconnecting... ({attempt}/{max})")
}

/// Where the coordinator is in its lifecycle.
///
/// ```text
/// Disconnected ──→ Connecting ──→ Connected
///       ↑              │             │ (drop)
///       │              ↓             ↓
///       └──────── Reconnecting ←─────┘
/// ```
///
/// At most one of `Connecting` and `Reconnecting` holds at a time, since
/// only one join job runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    /// Returns `true` while a join job is in flight.
    pub fn is_attempting(self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Reconnecting => write!(f, "Reconnecting"),
        }
    }
}

/// Point-in-time view of the coordinator, readable without a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    /// The joined session, if connected.
    pub session_name: Option<String>,
    /// The most recently joined session, kept after it is lost.
    pub last_session_name: Option<String>,
    /// Participants in the joined session, including the local one.
    pub player_count: usize,
    /// Whether any join has succeeded since the coordinator started.
    pub ever_connected: bool,
    /// Current retry number of the running retry loop, 0 otherwise.
    pub reconnect_attempt: u32,
}

/// Notifications for the host UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    /// The participant counter changed.
    PlayerCountChanged(usize),
    /// The status banner changed.
    ConnectionStatusChanged { connected: bool, status: String },
}
