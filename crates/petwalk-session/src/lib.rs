//! Session lifecycle for petwalk.
//!
//! - [`policy`]: the timing and sizing table every other part reads.
//! - [`SessionCoordinator`]: owns the one transport session; runs
//!   matchmaking, timeout-bounded joins, and the exponential-backoff retry
//!   loop; reacts to transport callbacks.
//! - [`SuspensionMonitor`]: turns host pause/resume signals into either a
//!   silent rejoin or a background-timeout error.
//!
//! ```text
//! UI ──connect──→ SessionCoordinator ──start──→ Transport
//!                   │    ↑ callbacks ─────────────┘
//!                   │    └──── rejoin ──── SuspensionMonitor ←── host pause/resume
//!                   ├──→ SpawnCoordinator (local peer joined)
//!                   └──→ ErrorNotifier (every user-facing failure)
//! ```

mod coordinator;
mod error;
pub mod matchmaking;
pub mod policy;
mod state;
mod suspension;

pub use coordinator::{CoordinatorBuilder, SessionCoordinator};
pub use error::SessionError;
pub use matchmaking::{FixedClock, SystemClock, WallClock};
pub use policy::SessionPolicy;
pub use state::{
    ConnectionState, CoordinatorEvent, STATUS_CONNECTED, STATUS_CONNECTING, STATUS_DISCONNECTED,
    STATUS_RECONNECTING, SessionSnapshot, reconnecting_status,
};
pub use suspension::{ResumeOutcome, SessionControl, SuspensionMonitor, SuspensionRecord};
