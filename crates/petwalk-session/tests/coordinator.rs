//! Integration tests for the session coordinator using a scripted transport.
//!
//! The scripted transport answers each start from a queue (join, reject,
//! or hang forever) and records what it was asked, so the tests can check
//! exactly which rooms were tried, when, and how many sessions were alive.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};

use petwalk_errors::{AlwaysReachable, ErrorCategory, ErrorNotice, ErrorNotifier, FlagProbe};
use petwalk_session::matchmaking::candidates;
use petwalk_session::{
    ConnectionState, CoordinatorEvent, FixedClock, SessionCoordinator, SessionPolicy,
    SessionSnapshot,
};
use petwalk_spawn::{
    EntityHandle, EntityKind, EntitySpawner, LocalEntityWiring, SpawnCoordinator, SpawnLayout,
    SpawnRequest,
};
use petwalk_transport::{
    ConnectFailedReason, DisconnectReason, EventSink, PeerId, SessionInfo, ShutdownReason,
    StartArgs, Transport, TransportCallbacks, TransportError, TransportSession,
};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

// =========================================================================
// Scripted transport
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Script {
    Join,
    /// Joins, but the session times out before the start call returns.
    /// With `yield_first` the call yields once after the callbacks fire.
    JoinThenDrop { yield_first: bool },
    /// Returns a session that is already stopped, with no callbacks.
    JoinStopped,
    Reject(ShutdownReason),
    Hang,
}

struct Ledger {
    fallback: Script,
    script: VecDeque<Script>,
    starts: Vec<(String, Instant)>,
    sinks: Vec<EventSink>,
    live: usize,
    max_live: usize,
    shutdown_requests: usize,
}

#[derive(Clone)]
struct ScriptedTransport {
    ledger: Arc<Mutex<Ledger>>,
}

impl ScriptedTransport {
    fn new(fallback: Script) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(Ledger {
                fallback,
                script: VecDeque::new(),
                starts: Vec::new(),
                sinks: Vec::new(),
                live: 0,
                max_live: 0,
                shutdown_requests: 0,
            })),
        }
    }

    fn push(&self, step: Script) {
        self.ledger.lock().unwrap().script.push_back(step);
    }

    fn starts(&self) -> Vec<String> {
        self.ledger
            .lock()
            .unwrap()
            .starts
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn start_times(&self) -> Vec<Instant> {
        self.ledger
            .lock()
            .unwrap()
            .starts
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }

    fn last_sink(&self) -> EventSink {
        self.ledger
            .lock()
            .unwrap()
            .sinks
            .last()
            .cloned()
            .expect("at least one start")
    }

    fn live(&self) -> usize {
        self.ledger.lock().unwrap().live
    }

    fn max_live(&self) -> usize {
        self.ledger.lock().unwrap().max_live
    }

    fn shutdown_requests(&self) -> usize {
        self.ledger.lock().unwrap().shutdown_requests
    }
}

impl ScriptedTransport {
    fn open(&self, args: StartArgs, events: EventSink, running: bool) -> ScriptedSession {
        events.on_connected_to_server();
        events.on_peer_joined(PeerId::new(1), true);
        self.session(args, events, running)
    }

    fn session(&self, args: StartArgs, events: EventSink, running: bool) -> ScriptedSession {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.live += 1;
        ledger.max_live = ledger.max_live.max(ledger.live);
        ScriptedSession {
            ledger: Arc::clone(&self.ledger),
            name: args.session_name,
            sink: events,
            running,
        }
    }
}

impl Transport for ScriptedTransport {
    type Session = ScriptedSession;

    async fn start(
        &self,
        args: StartArgs,
        events: EventSink,
    ) -> Result<ScriptedSession, TransportError> {
        let step = {
            let mut ledger = self.ledger.lock().unwrap();
            ledger
                .starts
                .push((args.session_name.clone(), Instant::now()));
            ledger.sinks.push(events.clone());
            let fallback = ledger.fallback;
            ledger.script.pop_front().unwrap_or(fallback)
        };

        match step {
            Script::Hang => std::future::pending().await,
            Script::Reject(reason) => Err(TransportError::StartRejected {
                session: args.session_name,
                reason,
            }),
            Script::Join => Ok(self.open(args, events, true)),
            Script::JoinThenDrop { yield_first } => {
                events.on_connected_to_server();
                events.on_peer_joined(PeerId::new(1), true);
                events.on_disconnected(DisconnectReason::Timeout);
                events.on_shutdown(ShutdownReason::ConnectionTimeout);
                if yield_first {
                    tokio::task::yield_now().await;
                }
                Ok(self.session(args, events, false))
            }
            Script::JoinStopped => Ok(self.session(args, events, false)),
        }
    }
}

struct ScriptedSession {
    ledger: Arc<Mutex<Ledger>>,
    name: String,
    sink: EventSink,
    running: bool,
}

impl TransportSession for ScriptedSession {
    fn info(&self) -> SessionInfo {
        SessionInfo {
            name: self.name.clone(),
            region: "jp".into(),
            max_players: 10,
            player_count: 1,
        }
    }

    fn local_peer(&self) -> PeerId {
        PeerId::new(1)
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn request_shutdown(&mut self) {
        self.ledger.lock().unwrap().shutdown_requests += 1;
        self.running = false;
        self.sink.on_shutdown(ShutdownReason::Ok);
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.ledger.lock().unwrap().live -= 1;
    }
}

// =========================================================================
// Recording spawner
// =========================================================================

#[derive(Default)]
struct SpawnRecord {
    next: u64,
    spawned: Vec<(EntityKind, PeerId)>,
    despawned: Vec<EntityHandle>,
    wired: usize,
}

#[derive(Clone, Default)]
struct SpawnLog(Arc<Mutex<SpawnRecord>>);

impl SpawnLog {
    fn spawned(&self) -> Vec<(EntityKind, PeerId)> {
        self.0.lock().unwrap().spawned.clone()
    }

    fn despawned(&self) -> Vec<EntityHandle> {
        self.0.lock().unwrap().despawned.clone()
    }

    fn wired(&self) -> usize {
        self.0.lock().unwrap().wired
    }
}

impl EntitySpawner for SpawnLog {
    fn spawn(&mut self, request: SpawnRequest) -> Option<EntityHandle> {
        let mut record = self.0.lock().unwrap();
        record.spawned.push((request.kind, request.owner));
        record.next += 1;
        Some(EntityHandle::new(record.next))
    }

    fn despawn(&mut self, entity: EntityHandle) {
        self.0.lock().unwrap().despawned.push(entity);
    }
}

#[derive(Clone)]
struct WiringLog(SpawnLog);

impl LocalEntityWiring for WiringLog {
    fn link_companion_follow(&mut self, _companion: EntityHandle, _player: EntityHandle) {}

    fn set_camera_targets(&mut self, _companion: EntityHandle, _player: EntityHandle) {}

    fn bind_movement_input(&mut self, _player: EntityHandle) {
        (self.0).0.lock().unwrap().wired += 1;
    }
}

// =========================================================================
// Harness
// =========================================================================

/// 2024-03-15 10:47:00 UTC, inside the 10:30 bucket.
const FIXED_NOW_SECS: u64 = 1_710_499_620;
const FIXED_BUCKET: &str = "20240315_1030";

struct Harness {
    coordinator: SessionCoordinator,
    transport: ScriptedTransport,
    spawns: SpawnLog,
    errors: broadcast::Receiver<ErrorNotice>,
    events: broadcast::Receiver<CoordinatorEvent>,
}

fn harness(fallback: Script) -> Harness {
    harness_with(fallback, SessionPolicy::default(), ErrorNotifier::new(AlwaysReachable))
}

fn harness_with(fallback: Script, policy: SessionPolicy, notifier: ErrorNotifier) -> Harness {
    let transport = ScriptedTransport::new(fallback);
    let spawns = SpawnLog::default();
    let spawn = SpawnCoordinator::new(
        SpawnLayout::default(),
        spawns.clone(),
        WiringLog(spawns.clone()),
    );
    let errors = notifier.subscribe();
    let coordinator = SessionCoordinator::builder(transport.clone(), spawn)
        .policy(policy)
        .notifier(notifier)
        .clock(FixedClock(UNIX_EPOCH + Duration::from_secs(FIXED_NOW_SECS)))
        .build();
    let events = coordinator.subscribe();
    Harness {
        coordinator,
        transport,
        spawns,
        errors,
        events,
    }
}

/// Every error category raised since the last call.
fn raised(rx: &mut broadcast::Receiver<ErrorNotice>) -> Vec<ErrorCategory> {
    let mut categories = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        if let ErrorNotice::Raised(event) = notice {
            categories.push(event.category);
        }
    }
    categories
}

/// Every status text published since the last call.
fn statuses(rx: &mut broadcast::Receiver<CoordinatorEvent>) -> Vec<(bool, String)> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let CoordinatorEvent::ConnectionStatusChanged { connected, status } = event {
            out.push((connected, status));
        }
    }
    out
}

async fn wait_until(
    coordinator: &SessionCoordinator,
    condition: impl FnMut(&SessionSnapshot) -> bool,
) {
    let mut rx = coordinator.watch();
    tokio::time::timeout(Duration::from_secs(600), rx.wait_for(condition))
        .await
        .expect("condition reached in time")
        .expect("coordinator alive");
}

/// Lets the coordinator task drain whatever is queued.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

async fn next_error(rx: &mut broadcast::Receiver<ErrorNotice>) -> ErrorCategory {
    loop {
        let notice = tokio::time::timeout(Duration::from_secs(600), rx.recv())
            .await
            .expect("error raised in time")
            .expect("notifier alive");
        if let ErrorNotice::Raised(event) = notice {
            return event.category;
        }
    }
}

// =========================================================================
// connect_to_session()
// =========================================================================

#[tokio::test]
async fn test_connect_named_joins_and_spawns_local_entities() {
    let h = harness(Script::Join);

    assert!(h.coordinator.connect_to_session(Some("Park")).await.unwrap());
    wait_until(&h.coordinator, |s| s.player_count == 1).await;

    let snapshot = h.coordinator.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Connected);
    assert_eq!(snapshot.session_name.as_deref(), Some("Park"));
    assert_eq!(snapshot.last_session_name.as_deref(), Some("Park"));
    assert!(snapshot.ever_connected);
    assert_eq!(h.transport.starts(), vec!["Park"]);
    assert_eq!(
        h.spawns.spawned(),
        vec![
            (EntityKind::Player, PeerId::new(1)),
            (EntityKind::Companion, PeerId::new(1))
        ]
    );
    assert_eq!(h.spawns.wired(), 1);
}

#[tokio::test]
async fn test_connect_publishes_connecting_then_connected() {
    let mut h = harness(Script::Join);

    assert!(h.coordinator.connect_to_session(Some("Park")).await.unwrap());
    settle().await;

    let seen = statuses(&mut h.events);
    assert_eq!(seen.first(), Some(&(false, "Connecting...".to_string())));
    assert!(seen.contains(&(true, "Connected".to_string())));
}

#[tokio::test]
async fn test_connect_when_connected_returns_true_without_new_attempt() {
    let h = harness(Script::Join);
    assert!(h.coordinator.connect_to_session(Some("Park")).await.unwrap());

    assert!(h.coordinator.connect_to_session(Some("Elsewhere")).await.unwrap());

    assert_eq!(h.transport.starts(), vec!["Park"]);
}

#[tokio::test(start_paused = true)]
async fn test_connect_while_attempt_in_flight_returns_false() {
    let h = harness(Script::Hang);
    let first = {
        let coordinator = h.coordinator.clone();
        tokio::spawn(async move { coordinator.connect_to_session(Some("Park")).await })
    };
    wait_until(&h.coordinator, |s| s.state == ConnectionState::Connecting).await;

    let second = h.coordinator.connect_to_session(Some("Park")).await.unwrap();

    assert!(!second);
    assert_eq!(h.transport.starts().len(), 1);

    // Leaving aborts the hanging attempt.
    h.coordinator.disconnect().await.unwrap();
    assert!(!first.await.unwrap().unwrap());
    assert_eq!(h.coordinator.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_connect_without_network_never_touches_transport() {
    let probe = FlagProbe::new(false);
    let mut h = harness_with(
        Script::Join,
        SessionPolicy::default(),
        ErrorNotifier::new(probe.clone()),
    );

    assert!(!h.coordinator.connect_to_session(Some("Park")).await.unwrap());

    assert!(h.transport.starts().is_empty());
    assert_eq!(raised(&mut h.errors), vec![ErrorCategory::NoNetwork]);
}

#[tokio::test(start_paused = true)]
async fn test_connect_timeout_returns_false_after_connection_timeout() {
    let mut h = harness(Script::Hang);
    let started = Instant::now();

    assert!(!h.coordinator.connect_to_session(Some("Park")).await.unwrap());

    assert!(started.elapsed() >= Duration::from_secs(30));
    assert_eq!(h.transport.live(), 0);
    assert_eq!(h.coordinator.state(), ConnectionState::Disconnected);
    // A failed named attempt is left to the caller; nothing is raised.
    assert!(raised(&mut h.errors).is_empty());
}

// =========================================================================
// Matchmaking
// =========================================================================

#[tokio::test]
async fn test_matchmaking_all_fail_tries_each_candidate_then_search_timeout() {
    let mut h = harness(Script::Reject(ShutdownReason::GameNotFound));

    assert!(!h.coordinator.connect_to_session(None).await.unwrap());

    let expected: Vec<String> = candidates("WalkRoom_", FIXED_BUCKET, 5).collect();
    assert_eq!(h.transport.starts(), expected);
    assert_eq!(raised(&mut h.errors), vec![ErrorCategory::RoomSearchTimeout]);
    assert_eq!(h.transport.max_live(), 0);
}

#[tokio::test]
async fn test_matchmaking_every_room_full_raises_room_full() {
    let mut h = harness(Script::Reject(ShutdownReason::GameIsFull));

    assert!(!h.coordinator.connect_to_session(None).await.unwrap());

    assert_eq!(h.transport.starts().len(), 5);
    assert_eq!(raised(&mut h.errors), vec![ErrorCategory::RoomFull]);
}

#[tokio::test]
async fn test_matchmaking_full_primary_overflows_to_next_index() {
    let h = harness(Script::Join);
    h.transport.push(Script::Reject(ShutdownReason::GameIsFull));

    assert!(h.coordinator.connect_to_session(None).await.unwrap());

    assert_eq!(
        h.coordinator.session_name().as_deref(),
        Some("WalkRoom_20240315_1030_1")
    );
}

// =========================================================================
// connect_with_retry()
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_connect_with_retry_backs_off_exponentially_then_exhausts() {
    let mut h = harness(Script::Reject(ShutdownReason::GameNotFound));

    assert!(!h.coordinator.connect_with_retry(Some("Park")).await.unwrap());

    let times = h.transport.start_times();
    assert_eq!(times.len(), 4);
    let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
    assert_eq!(
        gaps,
        vec![
            Duration::from_millis(2000),
            Duration::from_millis(4000),
            Duration::from_millis(8000)
        ]
    );
    assert_eq!(raised(&mut h.errors), vec![ErrorCategory::ReconnectExhausted]);

    let seen = statuses(&mut h.events);
    for i in 1..=3 {
        assert!(seen.contains(&(false, format!("Reconnecting... ({i}/3)"))));
    }
}

#[tokio::test(start_paused = true)]
async fn test_connect_with_retry_succeeds_on_later_attempt() {
    let h = harness(Script::Join);
    h.transport.push(Script::Reject(ShutdownReason::GameNotFound));

    assert!(h.coordinator.connect_with_retry(Some("Park")).await.unwrap());

    assert_eq!(h.transport.starts().len(), 2);
    let snapshot = h.coordinator.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Connected);
    assert_eq!(snapshot.reconnect_attempt, 0);
    assert!(h.coordinator.notifier().last_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_aborts_in_flight_attempt_without_waiting_for_timeout() {
    let mut h = harness(Script::Hang);
    let cancel = CancellationToken::new();
    let started = Instant::now();
    let join = {
        let coordinator = h.coordinator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { coordinator.connect_with_retry_with(None, cancel).await })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();

    assert!(!join.await.unwrap().unwrap());
    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(h.transport.starts().len(), 1);
    assert!(raised(&mut h.errors).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff_stops_retrying() {
    let mut h = harness(Script::Reject(ShutdownReason::GameNotFound));
    let cancel = CancellationToken::new();
    let join = {
        let coordinator = h.coordinator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            coordinator
                .connect_with_retry_with(Some("Park"), cancel)
                .await
        })
    };

    // First attempt fails at once; the 2 s backoff is running.
    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();

    assert!(!join.await.unwrap().unwrap());
    assert_eq!(h.transport.starts().len(), 1);
    assert!(!raised(&mut h.errors).contains(&ErrorCategory::ReconnectExhausted));
}

// =========================================================================
// Lifecycle callbacks
// =========================================================================

#[tokio::test]
async fn test_peer_left_without_entities_is_noop() {
    let h = harness(Script::Join);
    assert!(h.coordinator.connect_to_session(Some("Park")).await.unwrap());
    wait_until(&h.coordinator, |s| s.player_count == 1).await;
    let sink = h.transport.last_sink();

    sink.on_peer_left(PeerId::new(7));
    sink.on_peer_joined(PeerId::new(2), false);
    wait_until(&h.coordinator, |s| s.player_count == 2).await;
    sink.on_peer_left(PeerId::new(2));
    wait_until(&h.coordinator, |s| s.player_count == 1).await;

    assert!(h.spawns.despawned().is_empty());
    assert_eq!(h.spawns.spawned().len(), 2);
}

#[tokio::test]
async fn test_shutdown_clears_registrations_and_raises_classified_error() {
    let mut h = harness(Script::Join);
    assert!(h.coordinator.connect_to_session(Some("Park")).await.unwrap());
    wait_until(&h.coordinator, |s| s.player_count == 1).await;

    h.transport
        .last_sink()
        .on_shutdown(ShutdownReason::ServerInRoom);
    assert_eq!(next_error(&mut h.errors).await, ErrorCategory::ServerError);
    wait_until(&h.coordinator, |s| s.state == ConnectionState::Disconnected).await;

    assert_eq!(h.coordinator.snapshot().player_count, 0);
    assert_eq!(h.transport.live(), 0);

    // Rejoining spawns a fresh pair without despawning a stale one.
    assert!(h.coordinator.connect_to_session(Some("Park")).await.unwrap());
    wait_until(&h.coordinator, |s| s.player_count == 1).await;
    assert_eq!(h.spawns.spawned().len(), 4);
    assert!(h.spawns.despawned().is_empty());
    assert_eq!(h.transport.max_live(), 1);
}

#[tokio::test]
async fn test_game_closed_shutdown_publishes_status_without_error() {
    let mut h = harness(Script::Join);
    assert!(h.coordinator.connect_to_session(Some("Park")).await.unwrap());
    settle().await;
    statuses(&mut h.events);

    h.transport
        .last_sink()
        .on_shutdown(ShutdownReason::GameClosed);
    wait_until(&h.coordinator, |s| s.state == ConnectionState::Disconnected).await;
    settle().await;

    assert!(raised(&mut h.errors).is_empty());
    assert_eq!(
        statuses(&mut h.events),
        vec![(false, "Disconnected".to_string())]
    );
}

#[tokio::test]
async fn test_connect_failed_callback_raises_classified_error() {
    let mut h = harness(Script::Join);
    assert!(h.coordinator.connect_to_session(Some("Park")).await.unwrap());

    h.transport
        .last_sink()
        .on_connect_failed(ConnectFailedReason::ServerFull);

    assert_eq!(next_error(&mut h.errors).await, ErrorCategory::RoomFull);
}

#[tokio::test]
async fn test_stale_callbacks_from_torn_down_session_are_ignored() {
    let mut h = harness(Script::Join);
    assert!(h.coordinator.connect_to_session(Some("Park")).await.unwrap());
    let old = h.transport.last_sink();
    h.coordinator.disconnect().await.unwrap();
    wait_until(&h.coordinator, |s| s.state == ConnectionState::Disconnected).await;

    old.on_peer_joined(PeerId::new(5), false);
    old.on_shutdown(ShutdownReason::ServerInRoom);
    settle().await;

    assert!(raised(&mut h.errors).is_empty());
    assert_eq!(h.coordinator.snapshot().player_count, 0);
}

async fn assert_drop_during_start_is_reported(yield_first: bool) {
    let policy = SessionPolicy {
        auto_reconnect: false,
        ..Default::default()
    };
    let mut h = harness_with(
        Script::JoinThenDrop { yield_first },
        policy,
        ErrorNotifier::new(AlwaysReachable),
    );

    h.coordinator.connect_to_session(Some("Park")).await.unwrap();
    wait_until(&h.coordinator, |s| s.state == ConnectionState::Disconnected).await;
    settle().await;

    assert_eq!(
        raised(&mut h.errors),
        vec![ErrorCategory::MidSessionDisconnect]
    );
    assert_eq!(h.coordinator.state(), ConnectionState::Disconnected);
    assert_eq!(h.coordinator.snapshot().player_count, 0);
    assert_eq!(h.transport.live(), 0);
    assert_eq!(
        statuses(&mut h.events).last(),
        Some(&(false, "Disconnected".to_string()))
    );
}

#[tokio::test]
async fn test_drop_callbacks_queued_behind_finished_start_are_reported() {
    for _ in 0..20 {
        assert_drop_during_start_is_reported(false).await;
    }
}

#[tokio::test]
async fn test_drop_callbacks_before_start_returns_are_held_and_reported() {
    for _ in 0..20 {
        assert_drop_during_start_is_reported(true).await;
    }
}

#[tokio::test]
async fn test_drop_during_start_recovers_to_same_room() {
    let mut h = harness(Script::Join);
    h.transport.push(Script::JoinThenDrop { yield_first: true });

    h.coordinator.connect_to_session(Some("Park")).await.unwrap();

    assert_eq!(
        next_error(&mut h.errors).await,
        ErrorCategory::MidSessionDisconnect
    );
    wait_until(&h.coordinator, |s| s.state == ConnectionState::Connected).await;
    settle().await;
    assert_eq!(h.transport.starts(), vec!["Park", "Park"]);
    assert!(raised(&mut h.errors).is_empty(), "drop reported once");
    assert_eq!(h.transport.max_live(), 1);
}

#[tokio::test]
async fn test_connect_returning_stopped_session_counts_as_failed_attempt() {
    let h = harness(Script::JoinStopped);

    assert!(!h.coordinator.connect_to_session(Some("Park")).await.unwrap());

    assert_eq!(h.coordinator.state(), ConnectionState::Disconnected);
    assert_eq!(h.transport.live(), 0);
    assert!(!h.coordinator.snapshot().ever_connected);
}

// =========================================================================
// disconnect()
// =========================================================================

#[tokio::test]
async fn test_disconnect_twice_requests_one_shutdown() {
    let h = harness(Script::Join);
    assert!(h.coordinator.connect_to_session(Some("Park")).await.unwrap());

    h.coordinator.disconnect().await.unwrap();
    h.coordinator.disconnect().await.unwrap();
    wait_until(&h.coordinator, |s| s.state == ConnectionState::Disconnected).await;

    assert_eq!(h.transport.shutdown_requests(), 1);
    assert_eq!(h.transport.live(), 0);
}

#[tokio::test]
async fn test_disconnect_without_session_does_not_block_next_join() {
    let h = harness(Script::Join);

    h.coordinator.disconnect().await.unwrap();

    assert!(h.coordinator.connect_to_session(Some("Park")).await.unwrap());
}

// =========================================================================
// Automatic recovery
// =========================================================================

#[tokio::test]
async fn test_mid_session_drop_reconnects_to_same_room() {
    let mut h = harness(Script::Join);
    assert!(h.coordinator.connect_to_session(Some("Park")).await.unwrap());

    h.transport
        .last_sink()
        .on_disconnected(DisconnectReason::Timeout);

    assert_eq!(
        next_error(&mut h.errors).await,
        ErrorCategory::MidSessionDisconnect
    );
    wait_until(&h.coordinator, |s| s.state == ConnectionState::Connected).await;
    settle().await;

    assert_eq!(h.transport.starts(), vec!["Park", "Park"]);
    assert_eq!(h.transport.max_live(), 1);
    assert!(raised(&mut h.errors).is_empty(), "drop reported once");
    assert!(h.coordinator.notifier().last_error().is_none());
}

#[tokio::test]
async fn test_mid_session_drop_while_suspended_waits_for_resume() {
    let mut h = harness(Script::Join);
    assert!(h.coordinator.connect_to_session(Some("Park")).await.unwrap());
    h.coordinator.set_suspended(true);

    h.transport
        .last_sink()
        .on_disconnected(DisconnectReason::Timeout);

    assert_eq!(
        next_error(&mut h.errors).await,
        ErrorCategory::MidSessionDisconnect
    );
    wait_until(&h.coordinator, |s| s.state == ConnectionState::Disconnected).await;
    settle().await;
    assert_eq!(h.transport.starts().len(), 1);
    assert_eq!(
        h.coordinator.snapshot().last_session_name.as_deref(),
        Some("Park")
    );
}

#[tokio::test]
async fn test_mid_session_drop_with_auto_reconnect_off_stays_down() {
    let policy = SessionPolicy {
        auto_reconnect: false,
        ..Default::default()
    };
    let h = harness_with(Script::Join, policy, ErrorNotifier::new(AlwaysReachable));
    assert!(h.coordinator.connect_to_session(Some("Park")).await.unwrap());

    h.transport
        .last_sink()
        .on_shutdown(ShutdownReason::ConnectionTimeout);
    wait_until(&h.coordinator, |s| s.state == ConnectionState::Disconnected).await;
    settle().await;

    assert_eq!(h.transport.starts().len(), 1);
}

// =========================================================================
// shutdown()
// =========================================================================

#[tokio::test]
async fn test_shutdown_drops_session_and_rejects_later_calls() {
    let h = harness(Script::Join);
    assert!(h.coordinator.connect_to_session(Some("Park")).await.unwrap());

    h.coordinator.shutdown().await.unwrap();
    settle().await;

    assert_eq!(h.transport.live(), 0);
    assert!(h.coordinator.connect_to_session(None).await.is_err());
}

#[tokio::test]
async fn test_snapshot_before_any_join_is_default() {
    let h = harness(Script::Join);
    assert_eq!(h.coordinator.snapshot(), SessionSnapshot::default());
}
