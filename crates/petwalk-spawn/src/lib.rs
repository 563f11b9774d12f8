//! Entity spawning for petwalk sessions.
//!
//! When the local peer joins a session, it owns two replicated entities:
//! its walking avatar and its pet companion. [`SpawnCoordinator`] picks a
//! deterministic slot for them, asks the engine ([`EntitySpawner`]) to
//! create them, registers them under the peer, and wires them up to the
//! camera, input, and follower logic ([`LocalEntityWiring`]).

mod coordinator;
mod entity;
mod layout;

pub use coordinator::{
    DEFAULT_DISPLAY_NAME, MAX_DISPLAY_NAME_CHARS, SpawnCoordinator, SpawnedPair,
    validate_display_name,
};
pub use entity::{EntityHandle, EntityKind, EntitySpawner, LocalEntityWiring, SpawnRequest};
pub use layout::{DEFAULT_COMPANION_FORWARD_OFFSET, Pose, SpawnLayout};
