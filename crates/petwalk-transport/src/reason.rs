//! Reason codes reported by the transport backend.
//!
//! The relay SDK reports failures as small integer codes. These enums give
//! each known code a name; any code we don't recognise is preserved as
//! `Other(code)` so parsing never fails. Turning a reason into something a
//! player can read is the job of the error taxonomy, not this crate.

use std::fmt;

// ---------------------------------------------------------------------------
// ShutdownReason
// ---------------------------------------------------------------------------

/// Why a session stopped (or never started).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutdownReason {
    /// Normal, requested shutdown.
    Ok,
    /// Generic failure inside the backend.
    Error,
    /// The backend is already hosting this client in another room.
    ServerInRoom,
    /// The requested room does not exist.
    GameNotFound,
    /// A room with the requested name already exists and cannot be created.
    GameIdAlreadyExists,
    /// The room has no free player slot.
    GameIsFull,
    /// The application's concurrent-user quota is exhausted.
    MaxCcuReached,
    /// A backend operation did not answer in time.
    OperationTimeout,
    /// The operation was cancelled locally.
    OperationCanceled,
    /// The room was closed by its owner.
    GameClosed,
    /// The backend refused the connection.
    ConnectionRefused,
    /// The connection stopped answering.
    ConnectionTimeout,
    /// Server-side plugin logic removed this client.
    DisconnectedByPluginLogic,
    /// A code this build does not know about.
    Other(u16),
}

impl ShutdownReason {
    /// Parses a raw backend code. Total: unknown codes become `Other`.
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::Error,
            2 => Self::ServerInRoom,
            3 => Self::GameNotFound,
            4 => Self::GameIdAlreadyExists,
            5 => Self::GameIsFull,
            6 => Self::MaxCcuReached,
            7 => Self::OperationTimeout,
            8 => Self::OperationCanceled,
            9 => Self::GameClosed,
            10 => Self::ConnectionRefused,
            11 => Self::ConnectionTimeout,
            12 => Self::DisconnectedByPluginLogic,
            other => Self::Other(other),
        }
    }

    /// Returns the raw backend code.
    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 0,
            Self::Error => 1,
            Self::ServerInRoom => 2,
            Self::GameNotFound => 3,
            Self::GameIdAlreadyExists => 4,
            Self::GameIsFull => 5,
            Self::MaxCcuReached => 6,
            Self::OperationTimeout => 7,
            Self::OperationCanceled => 8,
            Self::GameClosed => 9,
            Self::ConnectionRefused => 10,
            Self::ConnectionTimeout => 11,
            Self::DisconnectedByPluginLogic => 12,
            Self::Other(code) => code,
        }
    }

    /// Returns `false` for the expected ways a session ends: a requested
    /// shutdown, the room closing, or a local cancel.
    pub fn is_error(self) -> bool {
        !matches!(self, Self::Ok | Self::GameClosed | Self::OperationCanceled)
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "Other({code})"),
            named => write!(f, "{named:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectFailedReason
// ---------------------------------------------------------------------------

/// Why the low-level connection to the relay could not be established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectFailedReason {
    /// The relay did not answer in time.
    Timeout,
    /// The relay is at capacity.
    ServerFull,
    /// The relay rejected the client.
    ServerRefused,
    /// A code this build does not know about.
    Other(u16),
}

impl ConnectFailedReason {
    /// Parses a raw backend code. Total: unknown codes become `Other`.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::Timeout,
            2 => Self::ServerFull,
            3 => Self::ServerRefused,
            other => Self::Other(other),
        }
    }

    /// Returns the raw backend code.
    pub fn code(self) -> u16 {
        match self {
            Self::Timeout => 1,
            Self::ServerFull => 2,
            Self::ServerRefused => 3,
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for ConnectFailedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "Other({code})"),
            named => write!(f, "{named:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// DisconnectReason
// ---------------------------------------------------------------------------

/// Why an established session lost its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    /// The connection stopped answering.
    Timeout,
    /// The relay closed the connection.
    ByServer,
    /// This client closed the connection.
    ByClient,
    /// A code this build does not know about.
    Other(u16),
}

impl DisconnectReason {
    /// Parses a raw backend code. Total: unknown codes become `Other`.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::Timeout,
            2 => Self::ByServer,
            3 => Self::ByClient,
            other => Self::Other(other),
        }
    }

    /// Returns the raw backend code.
    pub fn code(self) -> u16 {
        match self {
            Self::Timeout => 1,
            Self::ByServer => 2,
            Self::ByClient => 3,
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "Other({code})"),
            named => write!(f, "{named:?}"),
        }
    }
}
