//! Local match simulation modules

pub mod catalog;
pub mod health;
pub mod match_state;
pub mod session;
pub mod weapon;

pub use catalog::{GameMode, ModeConfig, Team, WeaponKind, WeaponProfile};
pub use health::{HealthSystem, MAX_HEALTH};
pub use match_state::{
    EndReason, FlagState, MatchReport, MatchStateMachine, MatchStatus, PlayerScore, TeamScores,
    Winner,
};
pub use session::{HudSnapshot, MatchSession, SessionCommand, SessionConfig, SessionHandle};
pub use weapon::WeaponSystem;
