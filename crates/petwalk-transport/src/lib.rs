//! Transport abstraction layer for petwalk.
//!
//! Provides the [`Transport`] and [`TransportSession`] traits that decouple
//! the session coordinator from any specific relay SDK, plus the typed
//! callback surface ([`TransportCallbacks`]) a transport uses to report
//! lifecycle events.
//!
//! # Feature Flags
//!
//! - `loopback` (default): in-process relay ([`LoopbackHub`]) used by the
//!   demo and integration tests

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "loopback")]
mod loopback;
mod reason;

pub use error::TransportError;
#[cfg(feature = "loopback")]
pub use loopback::{LoopbackConfig, LoopbackHub, LoopbackSession, LoopbackTransport};
pub use reason::{ConnectFailedReason, DisconnectReason, ShutdownReason};

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Stable reference to a participant in a session.
///
/// The relay assigns these per room, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(u32);

impl PeerId {
    /// Creates a new `PeerId` from a raw `u32`.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the peer's ordinal, used to pick a deterministic spawn slot.
    pub fn ordinal(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Identifies one join attempt.
///
/// Every callback a transport emits carries the attempt that produced it,
/// so the coordinator can drop callbacks from a session it already tore down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(u64);

impl AttemptId {
    /// Creates a new `AttemptId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Start parameters and session info
// ---------------------------------------------------------------------------

/// Everything a transport needs to construct and start a session.
#[derive(Debug, Clone, PartialEq)]
pub struct StartArgs {
    /// Room name to join (created on first join).
    pub session_name: String,
    /// Maximum participants in the room.
    pub max_players: u32,
    /// Simulation tick rate in Hz.
    pub tick_rate: u32,
    /// Fixed relay region code.
    pub region: String,
    /// How long the relay keeps an empty room alive.
    pub empty_room_ttl: Duration,
    /// How long the relay keeps a dropped player's slot reserved.
    pub player_ttl: Duration,
}

/// Read-only view of a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Room name.
    pub name: String,
    /// Relay region code.
    pub region: String,
    /// Room capacity.
    pub max_players: u32,
    /// Participants currently in the room, including the local one.
    pub player_count: u32,
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

/// A lifecycle notification from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    /// The join attempt whose session produced this event.
    pub attempt: AttemptId,
    /// What happened.
    pub kind: TransportEventKind,
}

/// The kinds of lifecycle notification a transport can emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// The low-level connection to the relay is up.
    ConnectedToServer,
    /// A participant joined. `local` is `true` for this client's own peer.
    PeerJoined { peer: PeerId, local: bool },
    /// A participant left.
    PeerLeft { peer: PeerId },
    /// The session stopped.
    Shutdown { reason: ShutdownReason },
    /// The session lost its connection mid-flight.
    Disconnected { reason: DisconnectReason },
    /// The low-level connection could not be established.
    ConnectFailed { reason: ConnectFailedReason },
}

/// The callback surface every transport reports through.
///
/// Transports never call into the coordinator directly; they hold a
/// [`EventSink`] (which implements this trait) and invoke these methods.
/// Implementations must not block.
pub trait TransportCallbacks {
    /// The low-level connection to the relay is up.
    fn on_connected_to_server(&self);
    /// A participant joined the session.
    fn on_peer_joined(&self, peer: PeerId, local: bool);
    /// A participant left the session.
    fn on_peer_left(&self, peer: PeerId);
    /// The session stopped.
    fn on_shutdown(&self, reason: ShutdownReason);
    /// The session lost its connection mid-flight.
    fn on_disconnected(&self, reason: DisconnectReason);
    /// The low-level connection could not be established.
    fn on_connect_failed(&self, reason: ConnectFailedReason);
}

/// Forwards transport callbacks into the coordinator's event channel,
/// tagged with the attempt that created it.
#[derive(Debug, Clone)]
pub struct EventSink {
    attempt: AttemptId,
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl EventSink {
    /// Creates a sink that tags every event with `attempt`.
    pub fn new(attempt: AttemptId, tx: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { attempt, tx }
    }

    /// The attempt this sink reports for.
    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    fn emit(&self, kind: TransportEventKind) {
        // The receiver is gone only when the coordinator has stopped, at
        // which point nobody cares about the event.
        if self
            .tx
            .send(TransportEvent {
                attempt: self.attempt,
                kind,
            })
            .is_err()
        {
            tracing::trace!(attempt = %self.attempt, "event dropped, coordinator gone");
        }
    }
}

impl TransportCallbacks for EventSink {
    fn on_connected_to_server(&self) {
        self.emit(TransportEventKind::ConnectedToServer);
    }

    fn on_peer_joined(&self, peer: PeerId, local: bool) {
        self.emit(TransportEventKind::PeerJoined { peer, local });
    }

    fn on_peer_left(&self, peer: PeerId) {
        self.emit(TransportEventKind::PeerLeft { peer });
    }

    fn on_shutdown(&self, reason: ShutdownReason) {
        self.emit(TransportEventKind::Shutdown { reason });
    }

    fn on_disconnected(&self, reason: DisconnectReason) {
        self.emit(TransportEventKind::Disconnected { reason });
    }

    fn on_connect_failed(&self, reason: ConnectFailedReason) {
        self.emit(TransportEventKind::ConnectFailed { reason });
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Constructs and starts sessions against a relay backend.
pub trait Transport: Send + Sync + 'static {
    /// The session object produced by a successful start.
    type Session: TransportSession;

    /// Constructs a new transport object and starts it in the room named by
    /// `args`. Lifecycle callbacks for this session go to `events`.
    ///
    /// Dropping the returned future before it resolves abandons the start;
    /// dropping the returned session tears it down.
    fn start(
        &self,
        args: StartArgs,
        events: EventSink,
    ) -> impl Future<Output = Result<Self::Session, TransportError>> + Send;
}

/// A started session.
pub trait TransportSession: Send + 'static {
    /// Returns the session's current info.
    fn info(&self) -> SessionInfo;

    /// Returns this client's own peer.
    fn local_peer(&self) -> PeerId;

    /// Returns `true` while the session is running.
    fn is_running(&self) -> bool;

    /// Requests a graceful shutdown. Completion is reported later through
    /// [`TransportCallbacks::on_shutdown`].
    fn request_shutdown(&mut self);
}
