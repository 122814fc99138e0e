//! Static gameplay catalog - weapon profiles, game modes, teams

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Weapon identifier carried in loadouts and shoot events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    AssaultRifle,
    Sniper,
    Shotgun,
    Pistol,
    Smg,
}

impl WeaponKind {
    /// All weapons in loadout order
    pub const ALL: [WeaponKind; 5] = [
        WeaponKind::AssaultRifle,
        WeaponKind::Sniper,
        WeaponKind::Shotgun,
        WeaponKind::Pistol,
        WeaponKind::Smg,
    ];
}

impl Default for WeaponKind {
    fn default() -> Self {
        WeaponKind::AssaultRifle
    }
}

/// Ballistic and handling stats per weapon
#[derive(Debug, Clone, Copy)]
pub struct WeaponProfile {
    /// Display name
    pub name: &'static str,
    /// Damage per hit
    pub damage: f32,
    /// Rounds per minute
    pub fire_rate: f32,
    /// Rounds per magazine
    pub magazine_size: u32,
    /// Reserve capacity as a multiple of the magazine
    pub reserve_multiplier: u32,
    /// Reload duration (seconds)
    pub reload_secs: f32,
    /// Accuracy 0-1, inverse of spread
    pub accuracy: f32,
    /// Effective range in world units
    pub range: f32,
    /// Whether holding the trigger keeps firing
    pub automatic: bool,
}

impl WeaponProfile {
    pub fn for_kind(kind: WeaponKind) -> Self {
        match kind {
            WeaponKind::AssaultRifle => Self {
                name: "M4A1 Assault Rifle",
                damage: 25.0,
                fire_rate: 600.0,
                magazine_size: 30,
                reserve_multiplier: 3,
                reload_secs: 2.5,
                accuracy: 0.85,
                range: 100.0,
                automatic: true,
            },
            WeaponKind::Sniper => Self {
                name: "AWP Sniper",
                damage: 90.0,
                fire_rate: 40.0,
                magazine_size: 5,
                reserve_multiplier: 3,
                reload_secs: 3.5,
                accuracy: 0.98,
                range: 300.0,
                automatic: false,
            },
            WeaponKind::Shotgun => Self {
                name: "M870 Shotgun",
                damage: 80.0,
                fire_rate: 60.0,
                magazine_size: 8,
                reserve_multiplier: 3,
                reload_secs: 4.0,
                accuracy: 0.6,
                range: 30.0,
                automatic: false,
            },
            WeaponKind::Pistol => Self {
                name: "Desert Eagle",
                damage: 35.0,
                fire_rate: 180.0,
                magazine_size: 7,
                reserve_multiplier: 3,
                reload_secs: 1.8,
                accuracy: 0.75,
                range: 50.0,
                automatic: false,
            },
            WeaponKind::Smg => Self {
                name: "MP5 SMG",
                damage: 20.0,
                fire_rate: 800.0,
                magazine_size: 25,
                reserve_multiplier: 3,
                reload_secs: 2.0,
                accuracy: 0.7,
                range: 60.0,
                automatic: true,
            },
        }
    }

    /// Minimum interval between consecutive shots. Computed in f64 so
    /// round rates like 600 rpm land on an exact 100 ms boundary.
    pub fn shot_interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / f64::from(self.fire_rate))
    }

    /// Time a reload takes to complete
    pub fn reload_duration(&self) -> Duration {
        Duration::from_secs_f64(f64::from(self.reload_secs))
    }

    /// Reserve ammo granted with a fresh loadout
    pub fn full_reserve(&self) -> u32 {
        self.magazine_size * self.reserve_multiplier
    }
}

/// Team identifier for team-based modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Blue,
    Red,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::Blue => Team::Red,
            Team::Red => Team::Blue,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Team::Blue => "blue",
            Team::Red => "red",
        }
    }
}

/// Match format identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Deathmatch,
    TeamDeathmatch,
    CaptureFlag,
}

impl GameMode {
    /// Parse a mode from its wire/config name
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "deathmatch" => Some(GameMode::Deathmatch),
            "team_deathmatch" => Some(GameMode::TeamDeathmatch),
            "capture_flag" => Some(GameMode::CaptureFlag),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Deathmatch => "deathmatch",
            GameMode::TeamDeathmatch => "team_deathmatch",
            GameMode::CaptureFlag => "capture_flag",
        }
    }
}

impl Default for GameMode {
    fn default() -> Self {
        GameMode::Deathmatch
    }
}

/// Rules configuration per game mode
#[derive(Debug, Clone, Copy)]
pub struct ModeConfig {
    /// Display name
    pub name: &'static str,
    /// Lobby description
    pub description: &'static str,
    /// Whether players are split into blue/red teams
    pub team_based: bool,
    /// Room capacity
    pub max_players: usize,
    /// Score that ends the match early, if any
    pub score_limit: Option<u32>,
    /// Match length in seconds
    pub time_limit_secs: u32,
    /// Delay before an automatic respawn (seconds)
    pub respawn_delay_secs: u32,
}

impl ModeConfig {
    pub fn for_mode(mode: GameMode) -> Self {
        match mode {
            GameMode::Deathmatch => Self {
                name: "Free For All",
                description: "Every player for themselves. First to reach score limit wins.",
                team_based: false,
                max_players: 10,
                score_limit: Some(30),
                time_limit_secs: 600,
                respawn_delay_secs: 3,
            },
            GameMode::TeamDeathmatch => Self {
                name: "Team Deathmatch",
                description: "5v5 team battle. First team to reach score limit wins.",
                team_based: true,
                max_players: 10,
                score_limit: Some(50),
                time_limit_secs: 600,
                respawn_delay_secs: 5,
            },
            GameMode::CaptureFlag => Self {
                name: "Capture The Flag",
                description: "Capture the enemy flag and return it to your base. First to 3 captures wins.",
                team_based: true,
                max_players: 10,
                score_limit: Some(3),
                time_limit_secs: 900,
                respawn_delay_secs: 5,
            },
        }
    }

    /// Delay before a dead player is automatically respawned
    pub fn respawn_delay(&self) -> Duration {
        Duration::from_secs(self.respawn_delay_secs as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_weapon_has_a_full_reserve_of_three_magazines() {
        for kind in WeaponKind::ALL {
            let profile = WeaponProfile::for_kind(kind);
            assert_eq!(profile.full_reserve(), profile.magazine_size * 3);
        }
    }

    #[test]
    fn shot_intervals_land_on_exact_boundaries() {
        let rifle = WeaponProfile::for_kind(WeaponKind::AssaultRifle);
        assert_eq!(rifle.shot_interval(), Duration::from_millis(100));
        assert_eq!(rifle.reload_duration(), Duration::from_millis(2500));

        let pistol = WeaponProfile::for_kind(WeaponKind::Pistol);
        assert_eq!(pistol.reload_duration(), Duration::from_millis(1800));
        let sniper = WeaponProfile::for_kind(WeaponKind::Sniper);
        assert_eq!(sniper.shot_interval(), Duration::from_millis(1500));
    }

    #[test]
    fn mode_names_round_trip_through_parse() {
        for mode in [
            GameMode::Deathmatch,
            GameMode::TeamDeathmatch,
            GameMode::CaptureFlag,
        ] {
            assert_eq!(GameMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(GameMode::parse("battle_royale"), None);
    }

    #[test]
    fn team_modes_carry_team_flags() {
        assert!(!ModeConfig::for_mode(GameMode::Deathmatch).team_based);
        assert!(ModeConfig::for_mode(GameMode::TeamDeathmatch).team_based);
        let ctf = ModeConfig::for_mode(GameMode::CaptureFlag);
        assert!(ctf.team_based);
        assert_eq!(ctf.score_limit, Some(3));
        assert_eq!(ctf.respawn_delay(), Duration::from_secs(5));
    }

    #[test]
    fn opponent_is_symmetric() {
        assert_eq!(Team::Blue.opponent(), Team::Red);
        assert_eq!(Team::Red.opponent().opponent(), Team::Red);
    }
}
