//! Session timing and sizing policy.
//!
//! The `pub const` items are the shipped values. [`SessionPolicy`] carries
//! the same values at runtime so tests and hosts can shrink them, and
//! [`SessionPolicy::validated`] keeps them inside workable ranges.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Room capacity.
pub const MAX_PLAYERS_PER_ROOM: u32 = 10;

/// Simulation tick rate requested from the relay, in Hz.
pub const TICK_RATE: u32 = 30;

/// Every client uses the same relay region so they can meet.
pub const FIXED_REGION: &str = "jp";

/// Prefix of every matchmaking room name.
pub const ROOM_NAME_PREFIX: &str = "WalkRoom_";

/// Matchmaking candidates tried per time bucket.
pub const MAX_ROOM_JOIN_ATTEMPTS: u32 = 5;

/// Width of a matchmaking time bucket.
pub const ROOM_TIME_BUCKET_MINUTES: u32 = 30;

/// How long the relay keeps an empty room.
pub const ROOM_TTL: Duration = Duration::from_secs(300);

/// How long the relay keeps a dropped player's slot.
pub const PLAYER_TTL: Duration = Duration::from_secs(60);

/// Retries after the first attempt in a retry loop.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// First backoff delay. Doubles on every retry.
pub const RECONNECT_BASE_INTERVAL: Duration = Duration::from_millis(2000);

/// Upper bound on a single join attempt.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// A background pause longer than this ends the session.
pub const BACKGROUND_REJOIN_THRESHOLD: Duration = Duration::from_secs(30);

/// Longest display name, in characters.
pub const MAX_PLAYER_NAME_LENGTH: usize = petwalk_spawn::MAX_DISPLAY_NAME_CHARS;

// ---------------------------------------------------------------------------
// Runtime policy
// ---------------------------------------------------------------------------

/// Runtime copy of the session constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPolicy {
    pub max_players: u32,
    pub tick_rate: u32,
    pub region: String,
    pub room_name_prefix: String,
    /// Matchmaking candidates per bucket.
    pub max_room_join_attempts: u32,
    /// Bucket width in minutes. Must divide a day to keep buckets aligned.
    pub time_bucket_minutes: u32,
    pub empty_room_ttl: Duration,
    pub player_ttl: Duration,
    /// Retries after the first attempt. 3 means 4 attempts in total.
    pub max_reconnect_attempts: u32,
    pub reconnect_base_interval: Duration,
    /// Extra random delay as a fraction of each backoff (0.0 to 1.0).
    /// Zero keeps the schedule exact.
    pub reconnect_jitter: f64,
    pub connection_timeout: Duration,
    pub background_rejoin_threshold: Duration,
    /// Start a recovery loop by itself after an unexpected drop.
    pub auto_reconnect: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            max_players: MAX_PLAYERS_PER_ROOM,
            tick_rate: TICK_RATE,
            region: FIXED_REGION.to_string(),
            room_name_prefix: ROOM_NAME_PREFIX.to_string(),
            max_room_join_attempts: MAX_ROOM_JOIN_ATTEMPTS,
            time_bucket_minutes: ROOM_TIME_BUCKET_MINUTES,
            empty_room_ttl: ROOM_TTL,
            player_ttl: PLAYER_TTL,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            reconnect_base_interval: RECONNECT_BASE_INTERVAL,
            reconnect_jitter: 0.0,
            connection_timeout: CONNECTION_TIMEOUT,
            background_rejoin_threshold: BACKGROUND_REJOIN_THRESHOLD,
            auto_reconnect: true,
        }
    }
}

impl SessionPolicy {
    /// Highest tick rate the relay accepts.
    pub const MAX_TICK_RATE: u32 = 128;

    /// Minutes in a day; the widest possible bucket.
    pub const MAX_BUCKET_MINUTES: u32 = 24 * 60;

    /// Most retries a retry loop may be configured for.
    pub const MAX_RETRY_ROUNDS: u32 = 16;

    /// Longest first backoff delay.
    pub const MAX_BASE_INTERVAL: Duration = Duration::from_secs(3600);

    /// Clamp and fix any out-of-range values so the policy is safe to use.
    ///
    /// Called by the coordinator builder. Rules:
    /// - `max_players`, `max_room_join_attempts` at least 1.
    /// - `tick_rate` in `1..=MAX_TICK_RATE`.
    /// - `time_bucket_minutes` in `1..=MAX_BUCKET_MINUTES`.
    /// - `reconnect_jitter` in `0.0..=1.0`.
    /// - `max_reconnect_attempts` at most `MAX_RETRY_ROUNDS`.
    /// - `reconnect_base_interval` at most `MAX_BASE_INTERVAL`.
    /// - A zero `connection_timeout` falls back to [`CONNECTION_TIMEOUT`].
    pub fn validated(mut self) -> Self {
        if self.max_players == 0 {
            warn!("max_players is 0, using 1");
            self.max_players = 1;
        }
        if self.tick_rate == 0 || self.tick_rate > Self::MAX_TICK_RATE {
            let clamped = self.tick_rate.clamp(1, Self::MAX_TICK_RATE);
            warn!(rate = self.tick_rate, clamped, "tick_rate out of range, clamping");
            self.tick_rate = clamped;
        }
        if self.max_room_join_attempts == 0 {
            warn!("max_room_join_attempts is 0, using 1");
            self.max_room_join_attempts = 1;
        }
        if self.time_bucket_minutes == 0 || self.time_bucket_minutes > Self::MAX_BUCKET_MINUTES {
            let clamped = self.time_bucket_minutes.clamp(1, Self::MAX_BUCKET_MINUTES);
            warn!(
                minutes = self.time_bucket_minutes,
                clamped, "time_bucket_minutes out of range, clamping"
            );
            self.time_bucket_minutes = clamped;
        }
        if !(0.0..=1.0).contains(&self.reconnect_jitter) {
            // NaN lands here too.
            let clamped = if self.reconnect_jitter > 1.0 { 1.0 } else { 0.0 };
            warn!(jitter = self.reconnect_jitter, clamped, "reconnect_jitter out of range, clamping");
            self.reconnect_jitter = clamped;
        }
        if self.max_reconnect_attempts > Self::MAX_RETRY_ROUNDS {
            warn!(
                attempts = self.max_reconnect_attempts,
                clamped = Self::MAX_RETRY_ROUNDS,
                "max_reconnect_attempts too large, clamping"
            );
            self.max_reconnect_attempts = Self::MAX_RETRY_ROUNDS;
        }
        if self.reconnect_base_interval > Self::MAX_BASE_INTERVAL {
            warn!(
                interval_ms = self.reconnect_base_interval.as_millis() as u64,
                "reconnect_base_interval too large, clamping to one hour"
            );
            self.reconnect_base_interval = Self::MAX_BASE_INTERVAL;
        }
        if self.connection_timeout.is_zero() {
            warn!("connection_timeout is zero, using default");
            self.connection_timeout = CONNECTION_TIMEOUT;
        }
        self
    }

    /// Backoff before retry number `attempt`, without jitter:
    /// `base * 2^(attempt - 1)`. Attempt 0 is the immediate first try.
    pub fn backoff_base_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.reconnect_base_interval.saturating_mul(factor)
    }

    /// [`backoff_base_delay`](Self::backoff_base_delay) plus up to
    /// `reconnect_jitter` of itself at random. A jittered delay too large
    /// to represent stays at the base delay.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.backoff_base_delay(attempt);
        if self.reconnect_jitter <= 0.0 || base.is_zero() {
            return base;
        }
        let extra = rand::rng().random_range(0.0..=self.reconnect_jitter);
        Duration::try_from_secs_f64(base.as_secs_f64() * (1.0 + extra)).unwrap_or(base)
    }
}
