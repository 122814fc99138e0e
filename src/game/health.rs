//! Player health - damage, death, and the respawn cycle

use std::time::Duration;

use tokio::time::Instant;

/// Maximum (and spawn) health for every player
pub const MAX_HEALTH: f32 = 100.0;

/// Fixed delay between a respawn starting and the state reset landing
const RESPAWN_RESET: Duration = Duration::from_millis(500);

/// Health and respawn state machine for one player.
///
/// Death schedules an automatic respawn after the mode's respawn
/// delay. The respawn itself is two-phase: a respawning window of
/// `RESPAWN_RESET`, then the full reset back to spawn health. Both
/// deadlines settle through `update`, driven by the owning loop.
#[derive(Debug, Clone)]
pub struct HealthSystem {
    health: f32,
    is_dead: bool,
    is_respawning: bool,
    respawn_delay: Duration,
    auto_respawn_at: Option<Instant>,
    reset_at: Option<Instant>,
}

impl HealthSystem {
    pub fn new(respawn_delay: Duration) -> Self {
        Self {
            health: MAX_HEALTH,
            is_dead: false,
            is_respawning: false,
            respawn_delay,
            auto_respawn_at: None,
            reset_at: None,
        }
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn is_dead(&self) -> bool {
        self.is_dead
    }

    pub fn is_respawning(&self) -> bool {
        self.is_respawning
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead
    }

    pub fn health_percentage(&self) -> f32 {
        (self.health / MAX_HEALTH) * 100.0
    }

    /// Apply incoming damage, clamped at zero. Returns true when this
    /// call is the one that killed the player. Damage against an
    /// already dead player is ignored, so the pending respawn schedule
    /// never re-arms.
    pub fn take_damage(&mut self, amount: f32, now: Instant) -> bool {
        if self.is_dead {
            return false;
        }
        self.health = (self.health - amount).max(0.0);
        if self.health <= 0.0 {
            self.is_dead = true;
            self.auto_respawn_at = Some(now + self.respawn_delay);
            return true;
        }
        false
    }

    /// Restore health, clamped at the maximum. No-op while dead.
    pub fn heal(&mut self, amount: f32) {
        if self.is_dead {
            return;
        }
        self.health = (self.health + amount).min(MAX_HEALTH);
    }

    /// Begin the respawn reset window. Only valid for a dead player
    /// with no reset already pending. Returns whether it started.
    pub fn respawn(&mut self, now: Instant) -> bool {
        if !self.is_dead || self.is_respawning {
            return false;
        }
        self.is_respawning = true;
        self.auto_respawn_at = None;
        self.reset_at = Some(now + RESPAWN_RESET);
        true
    }

    /// Settle pending respawn deadlines.
    pub fn update(&mut self, now: Instant) {
        if let Some(at) = self.auto_respawn_at {
            if now >= at {
                self.auto_respawn_at = None;
                self.respawn(now);
            }
        }
        if let Some(at) = self.reset_at {
            if now >= at {
                self.reset_at = None;
                self.health = MAX_HEALTH;
                self.is_dead = false;
                self.is_respawning = false;
            }
        }
    }
}

impl Default for HealthSystem {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}
