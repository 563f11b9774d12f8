//! Background-suspension handling.
//!
//! Mobile hosts suspend sockets while the app is in the background. A short
//! absence (a phone-call popup) should end in a silent rejoin; a long one is
//! treated as the player walking away, and the session UI should close.
//!
//! [`SuspensionMonitor`] gets the host's two signals, "paused" and
//! "resumed", and decides which of the two it was.

use std::future::Future;
use std::time::Duration;

use petwalk_errors::{ErrorCategory, ErrorNotifier};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{ConnectionState, SessionCoordinator};

/// What the monitor needs from the coordinator.
pub trait SessionControl: Clone + Send + Sync + 'static {
    fn state(&self) -> ConnectionState;

    /// The session currently joined, if any.
    fn session_name(&self) -> Option<String>;

    /// Whether any join has succeeded in this process.
    fn ever_connected(&self) -> bool;

    fn set_suspended(&self, suspended: bool);

    fn notifier(&self) -> &ErrorNotifier;

    /// Runs a retry loop towards `target`. Resolves to `true` on success.
    fn rejoin(&self, target: Option<String>) -> impl Future<Output = bool> + Send;
}

impl SessionControl for SessionCoordinator {
    fn state(&self) -> ConnectionState {
        SessionCoordinator::state(self)
    }

    fn session_name(&self) -> Option<String> {
        SessionCoordinator::session_name(self)
    }

    fn ever_connected(&self) -> bool {
        self.snapshot().ever_connected
    }

    fn set_suspended(&self, suspended: bool) {
        SessionCoordinator::set_suspended(self, suspended)
    }

    fn notifier(&self) -> &ErrorNotifier {
        SessionCoordinator::notifier(self)
    }

    async fn rejoin(&self, target: Option<String>) -> bool {
        match self.recover(target).await {
            Ok(joined) => joined,
            Err(err) => {
                debug!(error = %err, "rejoin skipped");
                false
            }
        }
    }
}

/// Captured when the host pauses. Consumed by the next resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspensionRecord {
    pub paused_at: Instant,
    /// The session joined at pause time, if any.
    pub session_name: Option<String>,
}

/// What a resume led to.
#[derive(Debug)]
pub enum ResumeOutcome {
    /// No pause on record, or never connected: a startup artifact.
    Ignored,
    /// Gone too long. `background_timeout` was raised.
    TimedOut,
    /// The session survived the pause.
    StillConnected,
    /// A join or recovery was already running.
    AlreadyRecovering,
    /// A rejoin is running in the background. Resolves to its success.
    Rejoining(JoinHandle<bool>),
}

/// Decides what to do when the host comes back from the background.
#[derive(Debug)]
pub struct SuspensionMonitor<C> {
    control: C,
    threshold: Duration,
    record: Option<SuspensionRecord>,
    last_pause_duration: Option<Duration>,
}

impl<C: SessionControl> SuspensionMonitor<C> {
    /// A pause longer than `threshold` ends the session.
    pub fn new(control: C, threshold: Duration) -> Self {
        Self {
            control,
            threshold,
            record: None,
            last_pause_duration: None,
        }
    }

    /// Records the pause time and the joined session. No network activity.
    pub fn on_pause(&mut self) {
        let session_name = self.control.session_name();
        info!(session = ?session_name, "app paused");
        self.record = Some(SuspensionRecord {
            paused_at: Instant::now(),
            session_name,
        });
        self.control.set_suspended(true);
    }

    /// Consumes the pause record and either ends the session, rejoins it,
    /// or does nothing.
    ///
    /// A rejoin runs as a detached task so the host's resume callback
    /// returns at once. It logs its own failure; the retry loop has
    /// already raised `reconnect_exhausted` by then. Must be called from
    /// within a Tokio runtime.
    pub fn on_resume(&mut self) -> ResumeOutcome {
        self.control.set_suspended(false);

        let Some(record) = self.record.take() else {
            debug!("resume without a recorded pause, ignoring");
            return ResumeOutcome::Ignored;
        };
        if !self.control.ever_connected() {
            debug!("resume before any successful join, ignoring");
            return ResumeOutcome::Ignored;
        }

        let elapsed = record.paused_at.elapsed();
        self.last_pause_duration = Some(elapsed);
        info!(paused_secs = elapsed.as_secs_f64(), "app resumed");

        if elapsed > self.threshold {
            info!(
                paused_secs = elapsed.as_secs_f64(),
                threshold_secs = self.threshold.as_secs_f64(),
                "background timeout"
            );
            self.control.notifier().raise(
                ErrorCategory::BackgroundTimeout,
                Some(&format!("paused for {:.1}s", elapsed.as_secs_f64())),
            );
            return ResumeOutcome::TimedOut;
        }

        match self.control.state() {
            ConnectionState::Connected => {
                debug!("still connected after background return");
                ResumeOutcome::StillConnected
            }
            ConnectionState::Connecting | ConnectionState::Reconnecting => {
                debug!("join already running after background return");
                ResumeOutcome::AlreadyRecovering
            }
            ConnectionState::Disconnected => {
                // No recorded room means the rejoin matchmakes.
                let target = record.session_name;
                info!(session = ?target, "connection lost in background, rejoining");
                let control = self.control.clone();
                ResumeOutcome::Rejoining(tokio::spawn(async move {
                    let joined = control.rejoin(target).await;
                    if !joined {
                        info!("rejoin after background return failed");
                    }
                    joined
                }))
            }
        }
    }

    /// Routes the host's boolean pause signal.
    pub fn on_pause_changed(&mut self, paused: bool) -> ResumeOutcome {
        if paused {
            self.on_pause();
            ResumeOutcome::Ignored
        } else {
            self.on_resume()
        }
    }

    /// How long the last pause lasted, for diagnostics.
    pub fn last_pause_duration(&self) -> Option<Duration> {
        self.last_pause_duration
    }

    /// The pending pause record, if the host is currently paused.
    pub fn record(&self) -> Option<&SuspensionRecord> {
        self.record.as_ref()
    }

    pub fn control(&self) -> &C {
        &self.control
    }
}
