//! Weapon handling - ammo accounting, fire-rate gating, reloads

use tokio::time::Instant;

use crate::game::catalog::{WeaponKind, WeaponProfile};

/// Per-player weapon state machine.
///
/// Timing is deadline-based: `reload` arms a completion deadline and
/// `update` settles it once the caller's clock passes it. The owning
/// loop is expected to call `update` every simulation frame.
#[derive(Debug, Clone)]
pub struct WeaponSystem {
    weapon: WeaponKind,
    current_ammo: u32,
    reserve_ammo: u32,
    last_shot: Option<Instant>,
    reload_done_at: Option<Instant>,
}

impl WeaponSystem {
    /// Fresh loadout: full magazine and three magazines in reserve
    pub fn new(weapon: WeaponKind) -> Self {
        let profile = WeaponProfile::for_kind(weapon);
        Self {
            weapon,
            current_ammo: profile.magazine_size,
            reserve_ammo: profile.full_reserve(),
            last_shot: None,
            reload_done_at: None,
        }
    }

    pub fn weapon(&self) -> WeaponKind {
        self.weapon
    }

    /// Stats for the currently equipped weapon
    pub fn profile(&self) -> WeaponProfile {
        WeaponProfile::for_kind(self.weapon)
    }

    pub fn current_ammo(&self) -> u32 {
        self.current_ammo
    }

    pub fn reserve_ammo(&self) -> u32 {
        self.reserve_ammo
    }

    /// True only while a reload deadline is pending
    pub fn is_reloading(&self) -> bool {
        self.reload_done_at.is_some()
    }

    /// Whether a shot is allowed at `now`: needs a loaded round, no
    /// reload in progress, and the weapon's fire interval elapsed
    /// since the previous shot.
    pub fn can_shoot(&self, now: Instant) -> bool {
        if self.current_ammo == 0 || self.is_reloading() {
            return false;
        }
        match self.last_shot {
            Some(last) => now.duration_since(last) >= self.profile().shot_interval(),
            None => true,
        }
    }

    /// Fire one round. Returns false without side effects when the
    /// shot is gated by ammo, reload, or fire rate.
    pub fn shoot(&mut self, now: Instant) -> bool {
        if !self.can_shoot(now) {
            return false;
        }
        self.current_ammo -= 1;
        self.last_shot = Some(now);
        true
    }

    /// Begin a reload. No-op when one is already in progress, the
    /// reserve is empty, or the magazine is already full. Returns
    /// whether a reload was started.
    pub fn reload(&mut self, now: Instant) -> bool {
        if self.is_reloading() || self.reserve_ammo == 0 {
            return false;
        }
        if self.current_ammo >= self.profile().magazine_size {
            return false;
        }
        self.reload_done_at = Some(now + self.profile().reload_duration());
        true
    }

    /// Settle any pending reload deadline. The transfer moves
    /// `min(magazine deficit, reserve)` rounds out of reserve.
    pub fn update(&mut self, now: Instant) {
        if let Some(done_at) = self.reload_done_at {
            if now >= done_at {
                let profile = self.profile();
                let needed = profile.magazine_size - self.current_ammo;
                let transfer = needed.min(self.reserve_ammo);
                self.current_ammo += transfer;
                self.reserve_ammo -= transfer;
                self.reload_done_at = None;
            }
        }
    }

    /// Swap to another weapon, discarding the old ammo state. The new
    /// weapon arrives with a full magazine, fresh reserve, and reset
    /// fire timing. Rejected while a reload is in progress.
    pub fn switch_weapon(&mut self, weapon: WeaponKind) -> bool {
        if self.is_reloading() {
            return false;
        }
        let profile = WeaponProfile::for_kind(weapon);
        self.weapon = weapon;
        self.current_ammo = profile.magazine_size;
        self.reserve_ammo = profile.full_reserve();
        self.last_shot = None;
        true
    }

    /// Pick up reserve ammo, clamped to the full-reserve capacity of
    /// the current weapon.
    pub fn add_ammo(&mut self, amount: u32) {
        let cap = self.profile().full_reserve();
        self.reserve_ammo = (self.reserve_ammo + amount).min(cap);
    }

    #[cfg(test)]
    pub(crate) fn with_loadout(weapon: WeaponKind, current_ammo: u32, reserve_ammo: u32) -> Self {
        Self {
            weapon,
            current_ammo,
            reserve_ammo,
            last_shot: None,
            reload_done_at: None,
        }
    }
}

impl Default for WeaponSystem {
    fn default() -> Self {
        Self::new(WeaponKind::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fresh_loadout_is_full() {
        let ws = WeaponSystem::new(WeaponKind::AssaultRifle);
        assert_eq!(ws.current_ammo(), 30);
        assert_eq!(ws.reserve_ammo(), 90);
        assert!(!ws.is_reloading());
        assert!(ws.can_shoot(Instant::now()));
    }

    #[test]
    fn fire_rate_gates_consecutive_shots() {
        let mut ws = WeaponSystem::new(WeaponKind::AssaultRifle);
        let gap = ws.profile().shot_interval();
        let t0 = Instant::now();

        assert!(ws.shoot(t0));
        assert!(!ws.can_shoot(t0 + gap / 2));
        assert!(!ws.shoot(t0 + gap / 2));
        assert!(ws.shoot(t0 + gap));
        assert_eq!(ws.current_ammo(), 28);
    }

    #[test]
    fn shot_at_exactly_the_minimum_interval_is_allowed() {
        let mut ws = WeaponSystem::new(WeaponKind::AssaultRifle);
        let t0 = Instant::now();

        assert!(ws.shoot(t0));
        // 600 rpm allows the next shot exactly 100ms later
        assert!(ws.can_shoot(t0 + Duration::from_millis(100)));
        assert!(ws.shoot(t0 + Duration::from_millis(100)));
        assert_eq!(ws.current_ammo(), 28);
    }

    #[test]
    fn empty_magazine_blocks_shots() {
        let mut ws = WeaponSystem::with_loadout(WeaponKind::Pistol, 1, 0);
        let t0 = Instant::now();
        assert!(ws.shoot(t0));
        assert!(!ws.can_shoot(t0 + Duration::from_secs(5)));
        assert!(!ws.shoot(t0 + Duration::from_secs(5)));
        assert_eq!(ws.current_ammo(), 0);
    }

    #[test]
    fn reload_transfers_magazine_deficit_from_reserve() {
        let mut ws = WeaponSystem::with_loadout(WeaponKind::AssaultRifle, 10, 45);
        let t0 = Instant::now();

        assert!(ws.reload(t0));
        assert!(ws.is_reloading());
        assert!(!ws.can_shoot(t0 + Duration::from_millis(500)));

        // Deadline not yet reached: nothing transfers
        ws.update(t0 + Duration::from_millis(2400));
        assert!(ws.is_reloading());
        assert_eq!(ws.current_ammo(), 10);

        ws.update(t0 + Duration::from_millis(2500));
        assert!(!ws.is_reloading());
        assert_eq!(ws.current_ammo(), 30);
        assert_eq!(ws.reserve_ammo(), 25);
    }

    #[test]
    fn reload_is_capped_by_remaining_reserve() {
        let mut ws = WeaponSystem::with_loadout(WeaponKind::AssaultRifle, 10, 5);
        let t0 = Instant::now();
        assert!(ws.reload(t0));
        ws.update(t0 + Duration::from_secs(3));
        assert_eq!(ws.current_ammo(), 15);
        assert_eq!(ws.reserve_ammo(), 0);
    }

    #[test]
    fn reload_noops_on_full_magazine_or_empty_reserve() {
        let mut full = WeaponSystem::new(WeaponKind::Shotgun);
        assert!(!full.reload(Instant::now()));
        assert!(!full.is_reloading());

        let mut dry = WeaponSystem::with_loadout(WeaponKind::Shotgun, 2, 0);
        assert!(!dry.reload(Instant::now()));
        assert!(!dry.is_reloading());
    }

    #[test]
    fn second_reload_while_pending_is_rejected() {
        let mut ws = WeaponSystem::with_loadout(WeaponKind::Pistol, 2, 14);
        let t0 = Instant::now();
        assert!(ws.reload(t0));
        assert!(!ws.reload(t0 + Duration::from_millis(500)));

        ws.update(t0 + Duration::from_secs(2));
        assert_eq!(ws.current_ammo(), 7);
        assert_eq!(ws.reserve_ammo(), 9);
    }

    #[test]
    fn switch_is_rejected_mid_reload() {
        let mut ws = WeaponSystem::with_loadout(WeaponKind::AssaultRifle, 10, 45);
        assert!(ws.reload(Instant::now()));
        assert!(!ws.switch_weapon(WeaponKind::Sniper));
        assert_eq!(ws.weapon(), WeaponKind::AssaultRifle);
        assert!(ws.is_reloading());
    }

    #[test]
    fn switch_discards_old_state_and_resets_fire_timing() {
        let mut ws = WeaponSystem::with_loadout(WeaponKind::AssaultRifle, 3, 7);
        let t0 = Instant::now();
        assert!(ws.shoot(t0));

        assert!(ws.switch_weapon(WeaponKind::Sniper));
        assert_eq!(ws.weapon(), WeaponKind::Sniper);
        assert_eq!(ws.current_ammo(), 5);
        assert_eq!(ws.reserve_ammo(), 15);
        // Fire timing resets with the new weapon
        assert!(ws.can_shoot(t0));
    }

    #[test]
    fn ammo_stays_bounded_under_mixed_call_sequences() {
        let mut ws = WeaponSystem::new(WeaponKind::Smg);
        let magazine = ws.profile().magazine_size;
        let gap = ws.profile().shot_interval();
        let mut now = Instant::now();

        for step in 0..500u32 {
            match step % 7 {
                0 | 1 | 2 => {
                    ws.shoot(now);
                }
                3 => {
                    ws.reload(now);
                }
                4 => {
                    ws.add_ammo(step % 11);
                }
                _ => {}
            }
            ws.update(now);
            assert!(ws.current_ammo() <= magazine);
            assert!(ws.reserve_ammo() <= ws.profile().full_reserve());
            now += gap;
        }
    }

    #[test]
    fn add_ammo_clamps_to_full_reserve() {
        let mut ws = WeaponSystem::with_loadout(WeaponKind::Pistol, 7, 10);
        ws.add_ammo(100);
        assert_eq!(ws.reserve_ammo(), 21);

        let mut partial = WeaponSystem::with_loadout(WeaponKind::Pistol, 7, 10);
        partial.add_ammo(5);
        assert_eq!(partial.reserve_ammo(), 15);
    }
}
