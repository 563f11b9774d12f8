//! In-process relay: rooms live in a shared map instead of on a server.
//!
//! Every [`LoopbackTransport`] created from the same [`LoopbackHub`] sees
//! the same rooms, so several clients in one process converge on the same
//! session names exactly as they would against the real relay. Used by the
//! demo and by integration tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::{
    DisconnectReason, EventSink, PeerId, SessionInfo, ShutdownReason, StartArgs, Transport,
    TransportCallbacks, TransportError, TransportSession,
};

/// Tunables for the loopback relay.
#[derive(Debug, Clone, Default)]
pub struct LoopbackConfig {
    /// Artificial delay before every start resolves.
    pub join_latency: Duration,
}

struct Member {
    sink: EventSink,
    running: Arc<AtomicBool>,
}

struct Room {
    region: String,
    max_players: u32,
    next_peer: u32,
    members: BTreeMap<PeerId, Member>,
}

struct HubState {
    online: bool,
    rooms: HashMap<String, Room>,
}

/// The shared relay. Cheap to clone.
#[derive(Clone)]
pub struct LoopbackHub {
    state: Arc<Mutex<HubState>>,
    config: LoopbackConfig,
}

impl LoopbackHub {
    /// Creates an empty, online relay.
    pub fn new(config: LoopbackConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState {
                online: true,
                rooms: HashMap::new(),
            })),
            config,
        }
    }

    /// Returns a transport that starts sessions on this relay.
    pub fn transport(&self) -> LoopbackTransport {
        LoopbackTransport { hub: self.clone() }
    }

    /// Takes the relay offline (starts fail with `ConnectionRefused`) or
    /// back online. Running sessions are unaffected.
    pub fn set_online(&self, online: bool) {
        self.lock().online = online;
        tracing::info!(online, "loopback relay availability changed");
    }

    /// Simulates a network drop for one peer: it receives
    /// `on_disconnected(Timeout)` then `on_shutdown(ConnectionTimeout)`,
    /// everyone else receives `on_peer_left`.
    ///
    /// Returns `false` if the peer was not in the room.
    pub fn drop_peer(&self, room: &str, peer: PeerId) -> bool {
        let mut state = self.lock();
        let Some(member) = remove_member(&mut state, room, peer) else {
            return false;
        };
        member.running.store(false, Ordering::SeqCst);
        member.sink.on_disconnected(DisconnectReason::Timeout);
        member.sink.on_shutdown(ShutdownReason::ConnectionTimeout);
        tracing::info!(room, %peer, "loopback relay dropped peer");
        true
    }

    /// Number of peers currently in `room`.
    pub fn room_population(&self, room: &str) -> usize {
        self.lock().rooms.get(room).map_or(0, |r| r.members.len())
    }

    /// Names of all rooms that currently have at least one peer, sorted.
    pub fn room_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().rooms.keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        // A panic while holding the lock leaves the map consistent (every
        // mutation is a single insert/remove), so keep going.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn join(&self, args: &StartArgs, sink: EventSink) -> Result<LoopbackSession, TransportError> {
        let mut state = self.lock();
        if !state.online {
            return Err(TransportError::Unavailable("loopback relay offline".into()));
        }

        let room = state
            .rooms
            .entry(args.session_name.clone())
            .or_insert_with(|| Room {
                region: args.region.clone(),
                max_players: args.max_players,
                next_peer: 1,
                members: BTreeMap::new(),
            });

        if room.members.len() as u32 >= room.max_players {
            return Err(TransportError::StartRejected {
                session: args.session_name.clone(),
                reason: ShutdownReason::GameIsFull,
            });
        }

        let peer = PeerId::new(room.next_peer);
        room.next_peer += 1;

        sink.on_connected_to_server();
        for (existing, member) in &room.members {
            member.sink.on_peer_joined(peer, false);
            sink.on_peer_joined(*existing, false);
        }
        sink.on_peer_joined(peer, true);

        let running = Arc::new(AtomicBool::new(true));
        room.members.insert(
            peer,
            Member {
                sink: sink.clone(),
                running: Arc::clone(&running),
            },
        );

        tracing::debug!(
            room = %args.session_name,
            %peer,
            population = room.members.len(),
            "loopback peer joined"
        );

        Ok(LoopbackSession {
            hub: self.clone(),
            name: args.session_name.clone(),
            region: room.region.clone(),
            max_players: room.max_players,
            peer,
            running,
            sink,
        })
    }
}

/// Removes `peer` from `room`, tells the remaining members, and deletes the
/// room once it is empty.
fn remove_member(state: &mut HubState, room_name: &str, peer: PeerId) -> Option<Member> {
    let room = state.rooms.get_mut(room_name)?;
    let member = room.members.remove(&peer)?;
    for other in room.members.values() {
        other.sink.on_peer_left(peer);
    }
    if room.members.is_empty() {
        state.rooms.remove(room_name);
    }
    Some(member)
}

/// A [`Transport`] backed by a [`LoopbackHub`].
#[derive(Clone)]
pub struct LoopbackTransport {
    hub: LoopbackHub,
}

impl Transport for LoopbackTransport {
    type Session = LoopbackSession;

    async fn start(
        &self,
        args: StartArgs,
        events: EventSink,
    ) -> Result<Self::Session, TransportError> {
        if !self.hub.config.join_latency.is_zero() {
            tokio::time::sleep(self.hub.config.join_latency).await;
        }
        self.hub.join(&args, events)
    }
}

/// A session on the loopback relay.
pub struct LoopbackSession {
    hub: LoopbackHub,
    name: String,
    region: String,
    max_players: u32,
    peer: PeerId,
    running: Arc<AtomicBool>,
    sink: EventSink,
}

impl LoopbackSession {
    fn leave(&self) -> bool {
        if !self.running.swap(false, Ordering::SeqCst) {
            return false;
        }
        let mut state = self.hub.lock();
        remove_member(&mut state, &self.name, self.peer);
        true
    }
}

impl TransportSession for LoopbackSession {
    fn info(&self) -> SessionInfo {
        SessionInfo {
            name: self.name.clone(),
            region: self.region.clone(),
            max_players: self.max_players,
            player_count: self.hub.room_population(&self.name) as u32,
        }
    }

    fn local_peer(&self) -> PeerId {
        self.peer
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn request_shutdown(&mut self) {
        if self.leave() {
            self.sink.on_shutdown(ShutdownReason::Ok);
        }
    }
}

impl Drop for LoopbackSession {
    fn drop(&mut self) {
        // Tearing down without a shutdown request: leave quietly.
        self.leave();
    }
}
