//! Spawn slot layout.

use glam::{Quat, Vec3};
use petwalk_transport::PeerId;
use serde::{Deserialize, Serialize};

/// How far in front of the player the companion appears, in metres.
pub const DEFAULT_COMPANION_FORWARD_OFFSET: f32 = 1.5;

/// A position plus orientation in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    /// World origin, facing +Z.
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// This pose moved `distance` metres along its own forward (+Z) axis.
    pub fn forward(&self, distance: f32) -> Pose {
        Pose {
            position: self.position + self.rotation * Vec3::Z * distance,
            rotation: self.rotation,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Where peers appear when they join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnLayout {
    /// Candidate player poses. Peers are assigned `ordinal % slots.len()`.
    /// Empty means everybody spawns at the origin.
    pub slots: Vec<Pose>,

    /// Distance from the player to its companion along the slot's forward axis.
    pub companion_forward_offset: f32,
}

impl Default for SpawnLayout {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            companion_forward_offset: DEFAULT_COMPANION_FORWARD_OFFSET,
        }
    }
}

impl SpawnLayout {
    /// Creates a layout with the given slots and the default companion offset.
    pub fn with_slots(slots: Vec<Pose>) -> Self {
        Self {
            slots,
            ..Default::default()
        }
    }

    /// Deterministic player pose for `peer`.
    pub fn slot_for(&self, peer: PeerId) -> Pose {
        if self.slots.is_empty() {
            return Pose::IDENTITY;
        }
        let index = peer.ordinal() as usize % self.slots.len();
        self.slots[index]
    }
}
