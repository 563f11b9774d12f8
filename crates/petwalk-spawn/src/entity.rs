//! The engine-facing side of spawning.
//!
//! Replicating entities, cameras, and input widgets all belong to the host
//! engine. This module only names the narrow operations the session core
//! needs from them.

use std::fmt;

use petwalk_transport::PeerId;

use crate::Pose;

/// Which prefab to spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// The walking avatar the player controls.
    Player,
    /// The pet that follows the player around.
    Companion,
}

/// Opaque handle to a network-replicated entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(u64);

impl EntityHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity-{}", self.0)
    }
}

/// Everything the engine needs to create one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub kind: EntityKind,
    pub pose: Pose,
    /// The peer with authority over the entity.
    pub owner: PeerId,
    /// Name tag text. Only set for [`EntityKind::Player`].
    pub display_name: Option<String>,
}

/// Creates and destroys replicated entities.
///
/// `spawn` returns `None` when the engine cannot build the entity (for
/// example a prefab reference is missing).
pub trait EntitySpawner: Send + 'static {
    fn spawn(&mut self, request: SpawnRequest) -> Option<EntityHandle>;

    fn despawn(&mut self, entity: EntityHandle);
}

/// Hooks the local player's freshly spawned entities up to the rest of the
/// scene.
pub trait LocalEntityWiring: Send + 'static {
    /// Make the companion follow the player.
    fn link_companion_follow(&mut self, companion: EntityHandle, player: EntityHandle);

    /// Point the camera at the pair.
    fn set_camera_targets(&mut self, companion: EntityHandle, player: EntityHandle);

    /// Route the on-screen movement buttons to the player.
    fn bind_movement_input(&mut self, player: EntityHandle);

    /// Runs all three hookups.
    fn wire_local_entities(&mut self, player: EntityHandle, companion: EntityHandle) {
        self.link_companion_follow(companion, player);
        self.set_camera_targets(companion, player);
        self.bind_movement_input(player);
    }
}
