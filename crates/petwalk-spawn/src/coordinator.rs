//! Spawns the local peer's player and companion and keeps track of them.

use std::collections::HashMap;

use petwalk_transport::PeerId;
use tracing::{debug, error, info};

use crate::{
    EntityHandle, EntityKind, EntitySpawner, LocalEntityWiring, Pose, SpawnLayout, SpawnRequest,
};

/// Longest display name shown on a name tag, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 10;

/// Name used when the player never set one.
pub const DEFAULT_DISPLAY_NAME: &str = "Guest";

/// Normalises a player-chosen display name: empty becomes
/// [`DEFAULT_DISPLAY_NAME`], anything longer than
/// [`MAX_DISPLAY_NAME_CHARS`] characters is cut.
pub fn validate_display_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return DEFAULT_DISPLAY_NAME.to_string();
    }
    trimmed.chars().take(MAX_DISPLAY_NAME_CHARS).collect()
}

/// The two entities spawned for one peer. Either may be missing if the
/// engine failed to build it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpawnedPair {
    pub player: Option<EntityHandle>,
    pub companion: Option<EntityHandle>,
}

/// Spawns entities at deterministic slots and remembers which peer owns
/// which pair.
pub struct SpawnCoordinator<S, W> {
    layout: SpawnLayout,
    spawner: S,
    wiring: W,
    display_name: String,
    registered: HashMap<PeerId, SpawnedPair>,
}

impl<S: EntitySpawner, W: LocalEntityWiring> SpawnCoordinator<S, W> {
    pub fn new(layout: SpawnLayout, spawner: S, wiring: W) -> Self {
        Self {
            layout,
            spawner,
            wiring,
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            registered: HashMap::new(),
        }
    }

    /// Sets the name shown above the local player.
    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = validate_display_name(name);
        self
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Player pose for `peer`.
    pub fn slot_for(&self, peer: PeerId) -> Pose {
        self.layout.slot_for(peer)
    }

    /// Creates the player at `peer`'s slot and the companion just in front
    /// of it, then registers both under `peer`.
    ///
    /// A peer that already has a pair gets it despawned first, so there is
    /// never more than one pair per peer.
    pub fn spawn_for(&mut self, peer: PeerId) -> SpawnedPair {
        if let Some(stale) = self.registered.remove(&peer) {
            debug!(%peer, "replacing previously spawned entities");
            self.despawn(stale);
        }

        let slot = self.slot_for(peer);
        let player = self.spawner.spawn(SpawnRequest {
            kind: EntityKind::Player,
            pose: slot,
            owner: peer,
            display_name: Some(self.display_name.clone()),
        });
        let companion = self.spawner.spawn(SpawnRequest {
            kind: EntityKind::Companion,
            pose: slot.forward(self.layout.companion_forward_offset),
            owner: peer,
            display_name: None,
        });

        let pair = SpawnedPair { player, companion };
        self.registered.insert(peer, pair);
        info!(%peer, position = ?slot.position, "spawned local entities");
        pair
    }

    /// Hands the local pair to the camera, input, and follower hookups.
    ///
    /// Returns `false` (and wires nothing) if either entity is missing.
    /// That is a scene configuration problem, not a network fault.
    pub fn wire_local_entities(&mut self, pair: &SpawnedPair) -> bool {
        match (pair.player, pair.companion) {
            (Some(player), Some(companion)) => {
                self.wiring.wire_local_entities(player, companion);
                debug!(%player, %companion, "local entities wired");
                true
            }
            _ => {
                error!(
                    player = ?pair.player,
                    companion = ?pair.companion,
                    "spawned entity missing, skipping local wiring"
                );
                false
            }
        }
    }

    /// Despawns and forgets `peer`'s pair. No-op if `peer` has none.
    pub fn despawn_peer(&mut self, peer: PeerId) -> bool {
        match self.registered.remove(&peer) {
            Some(pair) => {
                self.despawn(pair);
                true
            }
            None => false,
        }
    }

    /// Forgets every registration without despawning. Used when the session
    /// itself is gone and took its replicated entities with it.
    pub fn clear_registrations(&mut self) {
        self.registered.clear();
    }

    /// The pair registered for `peer`, if any.
    pub fn registered(&self, peer: PeerId) -> Option<SpawnedPair> {
        self.registered.get(&peer).copied()
    }

    /// Number of peers with a registered pair.
    pub fn registered_count(&self) -> usize {
        self.registered.len()
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    pub fn wiring(&self) -> &W {
        &self.wiring
    }

    /// Despawns both entities of `pair`, companion first. Does not touch
    /// the registry.
    pub fn despawn(&mut self, pair: SpawnedPair) {
        if let Some(companion) = pair.companion {
            self.spawner.despawn(companion);
        }
        if let Some(player) = pair.player {
            self.spawner.despawn(player);
        }
    }
}
