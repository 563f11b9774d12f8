//! # Petwalk
//!
//! Session-resilience layer for a small-room multiplayer pet-walking client.
//!
//! A host supplies a [`Transport`](petwalk_transport::Transport) (the
//! relay SDK), an [`EntitySpawner`](petwalk_spawn::EntitySpawner) and a
//! [`LocalEntityWiring`](petwalk_spawn::LocalEntityWiring) (the engine),
//! and gets back a [`WalkClient`] that joins rooms, retries with backoff,
//! recovers dropped sessions, and reports every failure as a
//! player-readable error event.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use petwalk::prelude::*;
//!
//! // let client = WalkClient::builder(transport, SpawnCoordinator::new(
//! //     SpawnLayout::default(), spawner, wiring,
//! // ))
//! // .build();
//! // client.join(None).await?;
//! ```

mod client;
mod error;
mod logging;

pub use client::{WalkClient, WalkClientBuilder};
pub use error::PetwalkError;
pub use logging::{DEFAULT_FILTER, default_env_filter, init_tracing};

pub use petwalk_errors as errors;
pub use petwalk_session as session;
pub use petwalk_spawn as spawn;
pub use petwalk_transport as transport;

/// The types a host needs in one import.
pub mod prelude {
    pub use crate::{PetwalkError, WalkClient, init_tracing};
    pub use petwalk_errors::{
        AlwaysReachable, ErrorCategory, ErrorEvent, ErrorNotice, ErrorNotifier, FlagProbe,
        NetworkProbe,
    };
    pub use petwalk_session::{
        ConnectionState, CoordinatorEvent, ResumeOutcome, SessionCoordinator, SessionPolicy,
        SessionSnapshot,
    };
    pub use petwalk_spawn::{
        EntityHandle, EntityKind, EntitySpawner, LocalEntityWiring, Pose, SpawnCoordinator,
        SpawnLayout, SpawnRequest,
    };
    pub use petwalk_transport::{PeerId, Transport, TransportSession};
}
