//! Wire types carried over the room channel
//! Presence payloads and broadcast events for peer sync

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::catalog::WeaponKind;
use crate::game::health::MAX_HEALTH;
use crate::util::time::unix_millis;

/// Player identity, stable for the lifetime of a session
pub type PlayerId = Uuid;

/// Broadcast event name for shots
pub const SHOOT_EVENT: &str = "shoot";

/// World-space vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit-length copy, or zero if the vector has no direction
    pub fn normalized(&self) -> Vec3 {
        let len = self.length();
        if len <= f32::EPSILON {
            return Vec3::ZERO;
        }
        Vec3::new(self.x / len, self.y / len, self.z / len)
    }
}

/// Presence payload published per player and mirrored to every peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub position: Vec3,
    pub rotation: Vec3,
    /// Display health carried on presence. Re-publishes always carry
    /// the full-health placeholder; authoritative health lives with
    /// each local simulation.
    pub health: f32,
    /// Publisher wall clock, unix millis
    pub timestamp: u64,
}

impl PlayerSnapshot {
    /// Payload for the initial presence track after joining a room
    pub fn spawn(id: PlayerId) -> Self {
        Self {
            id,
            position: Vec3::new(0.0, 1.0, 0.0),
            rotation: Vec3::ZERO,
            health: MAX_HEALTH,
            timestamp: unix_millis(),
        }
    }

    /// Payload for a transform re-publish
    pub fn transform(id: PlayerId, position: Vec3, rotation: Vec3) -> Self {
        Self {
            id,
            position,
            rotation,
            health: MAX_HEALTH,
            timestamp: unix_millis(),
        }
    }
}

/// Broadcast payload describing one fired shot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShootEvent {
    pub player_id: PlayerId,
    pub origin: Vec3,
    pub direction: Vec3,
    pub weapon: WeaponKind,
    /// Shooter wall clock, unix millis
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_snapshot_starts_at_spawn_height_with_full_health() {
        let id = Uuid::new_v4();
        let snap = PlayerSnapshot::spawn(id);
        assert_eq!(snap.id, id);
        assert_eq!(snap.position, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(snap.health, MAX_HEALTH);
    }

    #[test]
    fn shoot_event_round_trips_through_json() {
        let event = ShootEvent {
            player_id: Uuid::new_v4(),
            origin: Vec3::new(1.0, 1.5, -2.0),
            direction: Vec3::new(0.0, 0.0, 1.0),
            weapon: WeaponKind::Smg,
            timestamp: unix_millis(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["weapon"], "smg");
        let back: ShootEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn normalized_handles_zero_vectors() {
        assert_eq!(Vec3::ZERO.normalized(), Vec3::ZERO);
        let unit = Vec3::new(3.0, 0.0, 4.0).normalized();
        assert!((unit.length() - 1.0).abs() < 1e-6);
    }
}
