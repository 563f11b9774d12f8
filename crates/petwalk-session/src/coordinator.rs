//! Connection lifecycle coordinator: an actor task that owns the session.
//!
//! Everything mutable about the connection (the transport session, the
//! join job in flight, the participant registry, the disconnect guard)
//! lives inside one Tokio task. The outside world holds a cloneable
//! [`SessionCoordinator`] and talks to the task through a command channel.
//! Because only that task ever touches the state, the "is a join already
//! running?" checks need no locks.
//!
//! The task waits on three things at once:
//!
//! ```text
//!                ┌──────────────────────────────┐
//!  commands ────→│                              │
//!  transport ───→│  CoordinatorActor::run loop  │──→ CoordinatorEvent (broadcast)
//!  job step ────→│                              │──→ SessionSnapshot (watch)
//!                └──────────────────────────────┘
//! ```
//!
//! A *job* is one `connect_to_session` or `connect_with_retry` call. It
//! advances one *step* at a time: a timeout-bounded join attempt or a
//! backoff sleep. Each step races the job's cancellation token, so a
//! cancelled caller never waits out a 30 second timeout.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::BoxFuture;
use petwalk_errors::{AlwaysReachable, ErrorCategory, ErrorNotifier, classify};
use petwalk_spawn::{EntitySpawner, LocalEntityWiring, SpawnCoordinator};
use petwalk_transport::{
    AttemptId, DisconnectReason, EventSink, PeerId, ShutdownReason, StartArgs, Transport,
    TransportError, TransportEvent, TransportEventKind, TransportSession,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::matchmaking::{SystemClock, WallClock, candidate_name, time_bucket};
use crate::state::{
    ConnectionState, CoordinatorEvent, STATUS_CONNECTED, STATUS_CONNECTING, STATUS_DISCONNECTED,
    STATUS_RECONNECTING, SessionSnapshot, reconnecting_status,
};
use crate::{SessionError, SessionPolicy};

/// Default capacity of the command channel.
const DEFAULT_COMMAND_CAPACITY: usize = 32;

/// Default capacity of the outbound event broadcast.
const DEFAULT_EVENT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobMode {
    /// One round: one named attempt, or one pass over the candidates.
    Single,
    /// Rounds repeated with exponential backoff until one succeeds.
    Retry,
}

struct ConnectRequest {
    target: Option<String>,
    mode: JobMode,
    /// Started to recover a lost session rather than by a fresh join.
    recovering: bool,
    cancel: CancellationToken,
    reply: oneshot::Sender<bool>,
}

enum Command {
    Connect(ConnectRequest),
    Disconnect { reply: oneshot::Sender<()> },
    Shutdown,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running coordinator. Cheap to clone.
///
/// The async operations return `Err(SessionError::Unavailable)` only when
/// the coordinator task has stopped. A join that fails for any network
/// reason returns `Ok(false)`; the reason is on the [`ErrorNotifier`].
#[derive(Clone)]
pub struct SessionCoordinator {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
    events: broadcast::Sender<CoordinatorEvent>,
    notifier: ErrorNotifier,
    suspended: Arc<AtomicBool>,
}

impl SessionCoordinator {
    /// Starts configuring a coordinator for `transport`.
    pub fn builder<T, S, W>(
        transport: T,
        spawn: SpawnCoordinator<S, W>,
    ) -> CoordinatorBuilder<T, S, W>
    where
        T: Transport,
        S: EntitySpawner,
        W: LocalEntityWiring,
    {
        CoordinatorBuilder::new(transport, spawn)
    }

    /// Joins `name`, or runs matchmaking when `name` is `None`.
    ///
    /// Returns `true` immediately if already connected and `false`
    /// immediately if another join is in flight.
    pub async fn connect_to_session(&self, name: Option<&str>) -> Result<bool, SessionError> {
        self.connect_to_session_with(name, CancellationToken::new())
            .await
    }

    /// Like [`connect_to_session`](Self::connect_to_session), abortable
    /// through `cancel`.
    pub async fn connect_to_session_with(
        &self,
        name: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<bool, SessionError> {
        self.request(name.map(str::to_owned), JobMode::Single, false, cancel)
            .await
    }

    /// Repeats [`connect_to_session`](Self::connect_to_session) with
    /// exponential backoff. Raises `reconnect_exhausted` if every attempt
    /// fails.
    pub async fn connect_with_retry(&self, name: Option<&str>) -> Result<bool, SessionError> {
        self.connect_with_retry_with(name, CancellationToken::new())
            .await
    }

    /// Like [`connect_with_retry`](Self::connect_with_retry), abortable
    /// through `cancel`, including during a backoff wait.
    pub async fn connect_with_retry_with(
        &self,
        name: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<bool, SessionError> {
        self.request(name.map(str::to_owned), JobMode::Retry, false, cancel)
            .await
    }

    /// Retry loop that reports itself as `Reconnecting` from the first
    /// attempt. Used to rejoin after a drop or a background pause.
    pub async fn recover(&self, name: Option<String>) -> Result<bool, SessionError> {
        self.request(name, JobMode::Retry, true, CancellationToken::new())
            .await
    }

    /// Requests a graceful leave. Also aborts a join in flight.
    ///
    /// Returns once the request is issued; the session is torn down when
    /// the transport confirms the shutdown.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Disconnect { reply: reply_tx })
            .await
            .map_err(|_| SessionError::Unavailable)?;
        reply_rx.await.map_err(|_| SessionError::Unavailable)
    }

    /// Stops the coordinator task, dropping any session without a graceful
    /// leave.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| SessionError::Unavailable)
    }

    /// Current state, without a round trip to the task.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.snapshot.borrow().state
    }

    pub fn session_name(&self) -> Option<String> {
        self.snapshot.borrow().session_name.clone()
    }

    /// A receiver that is notified whenever the snapshot changes.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Subscribes to player-count and status notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    pub fn notifier(&self) -> &ErrorNotifier {
        &self.notifier
    }

    /// Tells the coordinator the host process is backgrounded. While set,
    /// a dropped session is not recovered automatically; recovery is left
    /// to the resume path.
    pub fn set_suspended(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::SeqCst);
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    async fn request(
        &self,
        target: Option<String>,
        mode: JobMode,
        recovering: bool,
        cancel: CancellationToken,
    ) -> Result<bool, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Connect(ConnectRequest {
                target,
                mode,
                recovering,
                cancel,
                reply: reply_tx,
            }))
            .await
            .map_err(|_| SessionError::Unavailable)?;
        reply_rx.await.map_err(|_| SessionError::Unavailable)
    }
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("snapshot", &*self.snapshot.borrow())
            .field("suspended", &self.is_suspended())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and spawns a coordinator.
pub struct CoordinatorBuilder<T, S, W> {
    transport: T,
    spawn: SpawnCoordinator<S, W>,
    policy: SessionPolicy,
    notifier: Option<ErrorNotifier>,
    clock: Arc<dyn WallClock>,
    channel_size: usize,
}

impl<T, S, W> CoordinatorBuilder<T, S, W>
where
    T: Transport,
    S: EntitySpawner,
    W: LocalEntityWiring,
{
    pub fn new(transport: T, spawn: SpawnCoordinator<S, W>) -> Self {
        Self {
            transport,
            spawn,
            policy: SessionPolicy::default(),
            notifier: None,
            clock: Arc::new(SystemClock),
            channel_size: DEFAULT_COMMAND_CAPACITY,
        }
    }

    /// Overrides the session policy. Out-of-range values are clamped.
    pub fn policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Shares an existing notifier. Defaults to a fresh one whose network
    /// probe always reports reachable.
    pub fn notifier(mut self, notifier: ErrorNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Overrides the clock used for matchmaking buckets.
    pub fn clock(mut self, clock: impl WallClock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Sets the command channel capacity.
    pub fn channel_size(mut self, size: usize) -> Self {
        self.channel_size = size.max(1);
        self
    }

    /// Spawns the coordinator task. Must be called within a Tokio runtime.
    pub fn build(self) -> SessionCoordinator {
        let (cmd_tx, cmd_rx) = mpsc::channel(self.channel_size);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());
        let (outbound, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        let notifier = self
            .notifier
            .unwrap_or_else(|| ErrorNotifier::new(AlwaysReachable));
        let suspended = Arc::new(AtomicBool::new(false));

        let actor = CoordinatorActor {
            transport: Arc::new(self.transport),
            spawn: self.spawn,
            policy: self.policy.validated(),
            notifier: notifier.clone(),
            clock: self.clock,
            suspended: Arc::clone(&suspended),
            commands: cmd_rx,
            transport_tx: event_tx,
            transport_rx: event_rx,
            snapshot: snapshot_tx,
            outbound: outbound.clone(),
            session: None,
            session_name: None,
            last_session_name: None,
            ever_connected: false,
            peers: BTreeSet::new(),
            current_attempt: None,
            next_attempt: 0,
            held: Vec::new(),
            job: None,
            disconnecting: false,
        };

        tokio::spawn(actor.run());

        SessionCoordinator {
            commands: cmd_tx,
            snapshot: snapshot_rx,
            events: outbound,
            notifier,
            suspended,
        }
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// What a job step resolved to.
enum Step<Sess> {
    Attempt {
        attempt: AttemptId,
        outcome: AttemptOutcome<Sess>,
    },
    BackoffElapsed,
    Cancelled,
}

enum AttemptOutcome<Sess> {
    Joined(Sess),
    Failed(TransportError),
    TimedOut,
}

/// Matchmaking progress within one round.
struct Search {
    bucket: String,
    next_index: u32,
    /// Every candidate tried so far was refused for being full.
    all_full: bool,
}

struct ConnectJob<Sess> {
    target: Option<String>,
    mode: JobMode,
    recovering: bool,
    /// 0 for the immediate first try, then 1..=max_reconnect_attempts.
    round: u32,
    cancel: CancellationToken,
    /// `None` for automatic recovery, which has no caller.
    reply: Option<oneshot::Sender<bool>>,
    search: Option<Search>,
    step: Option<BoxFuture<'static, Step<Sess>>>,
}

/// Why the run loop woke up.
enum Wake<Sess> {
    Command(Option<Command>),
    Transport(TransportEvent),
    Step(Step<Sess>),
}

struct CoordinatorActor<T: Transport, S, W> {
    transport: Arc<T>,
    spawn: SpawnCoordinator<S, W>,
    policy: SessionPolicy,
    notifier: ErrorNotifier,
    clock: Arc<dyn WallClock>,
    suspended: Arc<AtomicBool>,

    commands: mpsc::Receiver<Command>,
    transport_tx: mpsc::UnboundedSender<TransportEvent>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    snapshot: watch::Sender<SessionSnapshot>,
    outbound: broadcast::Sender<CoordinatorEvent>,

    /// The single live transport session.
    session: Option<T::Session>,
    session_name: Option<String>,
    last_session_name: Option<String>,
    ever_connected: bool,
    peers: BTreeSet<PeerId>,

    /// Callbacks tagged with any other attempt are stale.
    current_attempt: Option<AttemptId>,
    next_attempt: u64,
    /// Shutdown/disconnect callbacks that arrived before the start call
    /// returned. Replayed once the attempt resolves to a session.
    held: Vec<TransportEvent>,
    job: Option<ConnectJob<T::Session>>,
    disconnecting: bool,
}

impl<T, S, W> CoordinatorActor<T, S, W>
where
    T: Transport,
    S: EntitySpawner,
    W: LocalEntityWiring,
{
    async fn run(mut self) {
        info!("session coordinator started");

        loop {
            let wake = {
                let step = self.job.as_mut().and_then(|job| job.step.as_mut());
                // A finished start is handled before callbacks queued behind it.
                tokio::select! {
                    biased;
                    step = next_step(step) => Wake::Step(step),
                    Some(event) = self.transport_rx.recv() => Wake::Transport(event),
                    cmd = self.commands.recv() => Wake::Command(cmd),
                }
            };

            match wake {
                Wake::Command(None) | Wake::Command(Some(Command::Shutdown)) => break,
                Wake::Command(Some(Command::Connect(request))) => self.handle_connect(request),
                Wake::Command(Some(Command::Disconnect { reply })) => {
                    self.handle_disconnect();
                    let _ = reply.send(());
                }
                Wake::Transport(event) => self.handle_transport_event(event),
                Wake::Step(step) => self.handle_step(step),
            }

            self.sync_snapshot();
        }

        self.stop();
        info!("session coordinator stopped");
    }

    // -- commands -----------------------------------------------------------

    fn handle_connect(&mut self, request: ConnectRequest) {
        if self.is_connected() {
            debug!("already connected");
            let _ = request.reply.send(true);
            return;
        }
        if self.job.is_some() {
            debug!("connection already in progress, skipping");
            let _ = request.reply.send(false);
            return;
        }

        self.job = Some(ConnectJob {
            target: request.target,
            mode: request.mode,
            recovering: request.recovering,
            round: 0,
            // A child token: `disconnect()` can abort the job without
            // cancelling the caller's own token.
            cancel: request.cancel.child_token(),
            reply: Some(request.reply),
            search: None,
            step: None,
        });
        self.begin_round();
    }

    fn handle_disconnect(&mut self) {
        if self.disconnecting {
            debug!("disconnect already in progress");
            return;
        }
        if let Some(job) = &self.job {
            info!("aborting join in progress");
            job.cancel.cancel();
        }
        match self.session.as_mut() {
            Some(session) => {
                info!(session = ?self.session_name, "disconnecting");
                self.disconnecting = true;
                session.request_shutdown();
            }
            // Nothing will ever confirm a shutdown, so the guard stays clear.
            None => debug!("disconnect requested with no session"),
        }
    }

    fn stop(&mut self) {
        if let Some(mut job) = self.job.take() {
            job.cancel.cancel();
            if let Some(reply) = job.reply.take() {
                let _ = reply.send(false);
            }
        }
        self.teardown_session();
        self.sync_snapshot();
    }

    // -- job steps ----------------------------------------------------------

    /// Starts the current round of the job: pre-flight, then either the
    /// named attempt or the first matchmaking candidate.
    fn begin_round(&mut self) {
        let Some(job) = self.job.as_ref() else {
            return;
        };
        if job.cancel.is_cancelled() {
            info!("join cancelled");
            self.finish_job(false);
            return;
        }
        let round = job.round;
        let recovering = job.recovering;
        let target = job.target.clone();

        if !self.notifier.is_network_reachable() {
            self.notifier.raise(ErrorCategory::NoNetwork, None);
            self.round_failed();
            return;
        }

        if round == 0 {
            let status = if recovering {
                STATUS_RECONNECTING
            } else {
                STATUS_CONNECTING
            };
            self.publish_status(false, status);
        }

        match target {
            Some(name) => self.start_attempt(name),
            None => {
                let bucket = time_bucket(self.clock.now(), self.policy.time_bucket_minutes);
                debug!(%bucket, round, "matchmaking");
                if let Some(job) = self.job.as_mut() {
                    job.search = Some(Search {
                        bucket,
                        next_index: 0,
                        all_full: true,
                    });
                }
                self.try_next_candidate();
            }
        }
    }

    fn try_next_candidate(&mut self) {
        let max = self.policy.max_room_join_attempts;
        let Some(search) = self.job.as_mut().and_then(|job| job.search.as_mut()) else {
            return;
        };

        if search.next_index < max {
            let index = search.next_index;
            search.next_index += 1;
            let name = candidate_name(&self.policy.room_name_prefix, &search.bucket, index);
            debug!(candidate = %name, attempt = index + 1, of = max, "trying matchmaking candidate");
            self.start_attempt(name);
            return;
        }

        let category = if search.all_full {
            ErrorCategory::RoomFull
        } else {
            ErrorCategory::RoomSearchTimeout
        };
        let detail = format!(
            "no joinable room in bucket {} after {max} candidates",
            search.bucket
        );
        self.notifier.raise(category, Some(&detail));
        self.round_failed();
    }

    /// Tears down whatever session exists and starts a fresh one in
    /// `session_name`, bounded by the connection timeout.
    fn start_attempt(&mut self, session_name: String) {
        self.teardown_session();

        self.next_attempt += 1;
        let attempt = AttemptId::new(self.next_attempt);
        self.current_attempt = Some(attempt);

        let args = StartArgs {
            session_name,
            max_players: self.policy.max_players,
            tick_rate: self.policy.tick_rate,
            region: self.policy.region.clone(),
            empty_room_ttl: self.policy.empty_room_ttl,
            player_ttl: self.policy.player_ttl,
        };
        debug!(%attempt, session = %args.session_name, "starting join attempt");

        let events = EventSink::new(attempt, self.transport_tx.clone());
        let transport = Arc::clone(&self.transport);
        let timeout = self.policy.connection_timeout;
        let Some(job) = self.job.as_mut() else {
            return;
        };
        let cancel = job.cancel.clone();

        job.step = Some(Box::pin(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                result = tokio::time::timeout(timeout, transport.start(args, events)) => {
                    let outcome = match result {
                        Ok(Ok(session)) => AttemptOutcome::Joined(session),
                        Ok(Err(err)) => AttemptOutcome::Failed(err),
                        Err(_) => AttemptOutcome::TimedOut,
                    };
                    Step::Attempt { attempt, outcome }
                }
            }
        }));
    }

    fn handle_step(&mut self, step: Step<T::Session>) {
        // The step future has completed and must not be polled again.
        if let Some(job) = self.job.as_mut() {
            job.step = None;
        }

        match step {
            Step::Cancelled => {
                info!("join cancelled");
                self.teardown_session();
                self.finish_job(false);
            }
            Step::BackoffElapsed => self.begin_round(),
            Step::Attempt { attempt, outcome } => {
                if self.current_attempt != Some(attempt) {
                    debug!(%attempt, "outcome of superseded attempt");
                    self.attempt_failed(false);
                    return;
                }
                match outcome {
                    AttemptOutcome::Joined(session) => {
                        // Callbacks sent before the start call returned are
                        // already queued.
                        while let Ok(event) = self.transport_rx.try_recv() {
                            self.handle_transport_event(event);
                        }
                        let held = std::mem::take(&mut self.held);
                        if held.is_empty() && !session.is_running() {
                            debug!(%attempt, "session stopped before the join completed");
                            drop(session);
                            self.attempt_failed(false);
                            return;
                        }
                        self.on_joined(session);
                        for event in held {
                            self.handle_transport_event(event);
                        }
                    }
                    AttemptOutcome::Failed(err) => {
                        debug!(%attempt, error = %err, "join attempt failed");
                        self.attempt_failed(err.is_room_full());
                    }
                    AttemptOutcome::TimedOut => {
                        warn!(
                            %attempt,
                            timeout_ms = self.policy.connection_timeout.as_millis() as u64,
                            "join attempt timed out"
                        );
                        self.attempt_failed(false);
                    }
                }
            }
        }
    }

    fn on_joined(&mut self, session: T::Session) {
        let info = session.info();
        info!(
            session = %info.name,
            peer = %session.local_peer(),
            players = info.player_count,
            "joined session"
        );
        self.session = Some(session);
        self.session_name = Some(info.name.clone());
        self.last_session_name = Some(info.name);
        self.ever_connected = true;
        self.notifier.clear();
        self.publish_status(true, STATUS_CONNECTED);
        self.finish_job(true);
    }

    /// One attempt failed: try the next candidate, or end the round.
    fn attempt_failed(&mut self, room_full: bool) {
        self.teardown_session();
        let Some(job) = self.job.as_mut() else {
            return;
        };
        let searching = match job.search.as_mut() {
            Some(search) => {
                search.all_full &= room_full;
                true
            }
            None => false,
        };
        if searching {
            self.try_next_candidate();
        } else {
            self.round_failed();
        }
    }

    /// The round failed: back off and go again, or give up.
    fn round_failed(&mut self) {
        let max = self.policy.max_reconnect_attempts;
        let Some(job) = self.job.as_mut() else {
            return;
        };
        job.search = None;

        if job.mode == JobMode::Single {
            self.finish_job(false);
            return;
        }
        if job.round >= max {
            let detail = format!("{} connection attempts failed", max + 1);
            self.notifier
                .raise(ErrorCategory::ReconnectExhausted, Some(&detail));
            self.finish_job(false);
            return;
        }

        job.round += 1;
        let round = job.round;
        let delay = self.policy.backoff_delay(round);
        let cancel = job.cancel.clone();
        job.step = Some(Box::pin(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                _ = tokio::time::sleep(delay) => Step::BackoffElapsed,
            }
        }));

        info!(
            attempt = round,
            max,
            delay_ms = delay.as_millis() as u64,
            "reconnect attempt scheduled"
        );
        self.publish_status(false, &reconnecting_status(round, max));
    }

    fn finish_job(&mut self, success: bool) {
        let Some(mut job) = self.job.take() else {
            return;
        };
        debug!(success, rounds = job.round + 1, "join job finished");
        if !success {
            self.publish_status(false, STATUS_DISCONNECTED);
        }
        // Callers read the snapshot right after the reply; it must be current.
        self.sync_snapshot();
        if let Some(reply) = job.reply.take() {
            let _ = reply.send(success);
        }
    }

    /// Starts a recovery retry loop towards the last joined session.
    fn schedule_recovery(&mut self) {
        if !self.policy.auto_reconnect || self.job.is_some() {
            return;
        }
        if self.suspended.load(Ordering::SeqCst) {
            info!("suspended, recovery deferred to resume");
            return;
        }
        let Some(target) = self.last_session_name.clone() else {
            return;
        };

        info!(session = %target, "starting automatic reconnect");
        self.job = Some(ConnectJob {
            target: Some(target),
            mode: JobMode::Retry,
            recovering: true,
            round: 0,
            cancel: CancellationToken::new(),
            reply: None,
            search: None,
            step: None,
        });
        self.begin_round();
    }

    // -- transport callbacks ------------------------------------------------

    fn handle_transport_event(&mut self, event: TransportEvent) {
        if self.current_attempt != Some(event.attempt) {
            trace!(attempt = %event.attempt, kind = ?event.kind, "ignoring stale transport event");
            return;
        }
        // A drop reported before the start call returns waits for its outcome.
        if self.session.is_none()
            && matches!(
                event.kind,
                TransportEventKind::Shutdown { .. } | TransportEventKind::Disconnected { .. }
            )
        {
            debug!(attempt = %event.attempt, kind = ?event.kind, "held until the join resolves");
            self.held.push(event);
            return;
        }

        match event.kind {
            TransportEventKind::ConnectedToServer => {
                info!(attempt = %event.attempt, "connected to server");
                self.publish_status(true, STATUS_CONNECTED);
            }
            TransportEventKind::PeerJoined { peer, local } => self.on_peer_joined(peer, local),
            TransportEventKind::PeerLeft { peer } => self.on_peer_left(peer),
            TransportEventKind::Shutdown { reason } => self.on_shutdown(reason),
            TransportEventKind::Disconnected { reason } => self.on_disconnected(reason),
            TransportEventKind::ConnectFailed { reason } => {
                let category = classify(reason);
                self.notifier
                    .raise(category, Some(&format!("connect failed: {reason}")));
            }
        }
    }

    fn on_peer_joined(&mut self, peer: PeerId, local: bool) {
        info!(%peer, local, "player joined");
        self.peers.insert(peer);
        if local {
            let pair = self.spawn.spawn_for(peer);
            self.spawn.wire_local_entities(&pair);
        }
        self.publish(CoordinatorEvent::PlayerCountChanged(self.peers.len()));
    }

    fn on_peer_left(&mut self, peer: PeerId) {
        info!(%peer, "player left");
        self.peers.remove(&peer);
        self.spawn.despawn_peer(peer);
        self.publish(CoordinatorEvent::PlayerCountChanged(self.peers.len()));
    }

    fn on_shutdown(&mut self, reason: ShutdownReason) {
        info!(%reason, session = ?self.session_name, "session shut down");
        let intentional = self.disconnecting;
        self.teardown_session();

        if reason == ShutdownReason::Ok {
            return;
        }
        if !reason.is_error() {
            self.publish_status(false, STATUS_DISCONNECTED);
            return;
        }

        let category = classify(reason);
        self.notifier
            .raise(category, Some(&format!("shutdown: {reason}")));
        self.publish_status(false, STATUS_DISCONNECTED);
        if category == ErrorCategory::MidSessionDisconnect && !intentional {
            self.schedule_recovery();
        }
    }

    fn on_disconnected(&mut self, reason: DisconnectReason) {
        warn!(%reason, session = ?self.session_name, "disconnected mid-session");
        let intentional = self.disconnecting;
        self.teardown_session();
        self.publish_status(false, STATUS_DISCONNECTED);

        if intentional || self.job.is_some() {
            return;
        }
        self.notifier.raise(
            ErrorCategory::MidSessionDisconnect,
            Some(&format!("disconnected: {reason}")),
        );
        self.schedule_recovery();
    }

    // -- helpers ------------------------------------------------------------

    fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_running())
    }

    /// Drops the session (if any) and everything registered against it.
    /// After this, no callback from an earlier attempt is accepted.
    fn teardown_session(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(session = ?self.session_name, "tearing down session");
            drop(session);
        }
        self.session_name = None;
        self.current_attempt = None;
        self.held.clear();
        self.disconnecting = false;
        self.spawn.clear_registrations();
        if !self.peers.is_empty() {
            self.peers.clear();
            self.publish(CoordinatorEvent::PlayerCountChanged(0));
        }
    }

    fn state(&self) -> ConnectionState {
        match &self.job {
            Some(job) if job.recovering || job.round > 0 => ConnectionState::Reconnecting,
            Some(_) => ConnectionState::Connecting,
            None if self.session.is_some() => ConnectionState::Connected,
            None => ConnectionState::Disconnected,
        }
    }

    fn sync_snapshot(&self) {
        let next = SessionSnapshot {
            state: self.state(),
            session_name: self.session_name.clone(),
            last_session_name: self.last_session_name.clone(),
            player_count: self.peers.len(),
            ever_connected: self.ever_connected,
            reconnect_attempt: self.job.as_ref().map_or(0, |job| job.round),
        };
        self.snapshot.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn publish(&self, event: CoordinatorEvent) {
        // No subscribers is fine.
        let _ = self.outbound.send(event);
    }

    fn publish_status(&self, connected: bool, status: &str) {
        debug!(connected, status, "connection status changed");
        self.publish(CoordinatorEvent::ConnectionStatusChanged {
            connected,
            status: status.to_string(),
        });
    }
}

/// Polls the job's pending step, or pends forever when there is none.
async fn next_step<Sess>(step: Option<&mut BoxFuture<'static, Step<Sess>>>) -> Step<Sess> {
    match step {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}
