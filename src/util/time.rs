//! Time utilities for the local simulation loop

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Tick rate configuration
pub const SIMULATION_TPS: u32 = 30; // 30 local simulation frames per second
pub const FRAME_DURATION_MICROS: u64 = 1_000_000 / SIMULATION_TPS as u64;

/// Duration of one local simulation frame
pub const FRAME_DURATION: Duration = Duration::from_micros(FRAME_DURATION_MICROS);

/// Resolution of the match countdown clock
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);
