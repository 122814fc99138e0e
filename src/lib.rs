//! Client-side match core for a browser arena shooter
//!
//! Everything a match client simulates locally lives here: weapon
//! handling, health and respawns, match scoring, and the presence
//! channel mirror that keeps peers in sync. There is no authoritative
//! server; every participant runs the same state machines and folds
//! in the signals it observes.

pub mod config;
pub mod game;
pub mod net;
pub mod util;

pub use config::{Config, ConfigError};
pub use game::{
    EndReason, GameMode, HealthSystem, HudSnapshot, MatchReport, MatchSession,
    MatchStateMachine, MatchStatus, ModeConfig, SessionCommand, SessionConfig, SessionHandle,
    Team, WeaponKind, WeaponProfile, WeaponSystem, Winner,
};
pub use net::{
    ChannelEvent, ChannelHandle, NetworkSync, PlayerId, PlayerSnapshot, RelayHub, ShootEvent,
    Vec3,
};
