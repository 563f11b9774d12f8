//! `WalkClient`: the one object a host needs.
//!
//! It owns the session coordinator and the suspension monitor and exposes
//! the handful of calls a title screen and a lifecycle hook make.

use std::time::Duration;

use petwalk_errors::{ErrorNotice, ErrorNotifier};
use petwalk_session::policy::BACKGROUND_REJOIN_THRESHOLD;
use petwalk_session::{
    CoordinatorBuilder, CoordinatorEvent, ResumeOutcome, SessionCoordinator, SessionPolicy,
    SessionSnapshot, SuspensionMonitor, WallClock,
};
use petwalk_spawn::{EntitySpawner, LocalEntityWiring, SpawnCoordinator};
use petwalk_transport::Transport;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::PetwalkError;

/// Builder for a [`WalkClient`]. Forwards to the coordinator builder.
pub struct WalkClientBuilder<T, S, W> {
    inner: CoordinatorBuilder<T, S, W>,
    background_threshold: Duration,
}

impl<T, S, W> WalkClientBuilder<T, S, W>
where
    T: Transport,
    S: EntitySpawner,
    W: LocalEntityWiring,
{
    /// Sets the session policy. The background threshold comes from here.
    pub fn policy(mut self, policy: SessionPolicy) -> Self {
        self.background_threshold = policy.background_rejoin_threshold;
        self.inner = self.inner.policy(policy);
        self
    }

    /// Shares a notifier, typically one built with the host's network probe.
    pub fn notifier(mut self, notifier: ErrorNotifier) -> Self {
        self.inner = self.inner.notifier(notifier);
        self
    }

    /// Overrides the matchmaking clock.
    pub fn clock(mut self, clock: impl WallClock) -> Self {
        self.inner = self.inner.clock(clock);
        self
    }

    /// Spawns the coordinator and wires the monitor to it. Must be called
    /// within a Tokio runtime.
    pub fn build(self) -> WalkClient {
        WalkClient::new(self.inner.build(), self.background_threshold)
    }
}

/// Host-facing façade over the session layer.
#[derive(Debug)]
pub struct WalkClient {
    coordinator: SessionCoordinator,
    monitor: SuspensionMonitor<SessionCoordinator>,
}

impl WalkClient {
    /// Starts configuring a client over `transport`.
    pub fn builder<T, S, W>(
        transport: T,
        spawn: SpawnCoordinator<S, W>,
    ) -> WalkClientBuilder<T, S, W>
    where
        T: Transport,
        S: EntitySpawner,
        W: LocalEntityWiring,
    {
        WalkClientBuilder {
            inner: CoordinatorBuilder::new(transport, spawn),
            background_threshold: BACKGROUND_REJOIN_THRESHOLD,
        }
    }

    /// Wraps an existing coordinator. A pause longer than
    /// `background_threshold` ends the session on resume.
    pub fn new(coordinator: SessionCoordinator, background_threshold: Duration) -> Self {
        let monitor = SuspensionMonitor::new(coordinator.clone(), background_threshold);
        Self {
            coordinator,
            monitor,
        }
    }

    /// Joins `room`, or matchmakes when `None`, retrying with backoff.
    ///
    /// `Ok(false)` means every attempt failed; the reason is on the error
    /// stream.
    pub async fn join(&self, room: Option<&str>) -> Result<bool, PetwalkError> {
        info!(room = ?room, "join requested");
        Ok(self.coordinator.connect_with_retry(room).await?)
    }

    /// Like [`join`](Self::join), abortable through `cancel` (a "Cancel"
    /// button on the connecting screen).
    pub async fn join_with(
        &self,
        room: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<bool, PetwalkError> {
        Ok(self.coordinator.connect_with_retry_with(room, cancel).await?)
    }

    /// Leaves the current session, or aborts a join in flight.
    pub async fn leave(&self) -> Result<(), PetwalkError> {
        info!("leave requested");
        Ok(self.coordinator.disconnect().await?)
    }

    /// Routes the host's pause signal. On resume, the outcome says whether
    /// a rejoin was started.
    pub fn app_paused(&mut self, paused: bool) -> ResumeOutcome {
        self.monitor.on_pause_changed(paused)
    }

    /// Status banner and player-count notifications.
    pub fn subscribe_status(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.coordinator.subscribe()
    }

    /// User-facing error notifications.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<ErrorNotice> {
        self.coordinator.notifier().subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.coordinator.snapshot()
    }

    /// How long the last completed pause lasted.
    pub fn last_pause_duration(&self) -> Option<Duration> {
        self.monitor.last_pause_duration()
    }

    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }

    /// Stops the coordinator task.
    pub async fn shutdown(self) -> Result<(), PetwalkError> {
        Ok(self.coordinator.shutdown().await?)
    }
}
