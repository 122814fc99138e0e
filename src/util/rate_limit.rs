//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified permits per second
pub fn create_limiter(permits_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(permits_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Presence publish rate limit (per local player)
pub const PRESENCE_RATE_LIMIT: u32 = 20; // Max 20 transform publishes per second

/// Caps how often the local player re-publishes its presence payload.
///
/// The simulation loop runs faster than the wire needs to see, so
/// transform updates that arrive over quota are silently skipped and
/// the next allowed frame carries the latest state instead.
#[derive(Clone)]
pub struct PresenceLimiter {
    limiter: Arc<Limiter>,
}

impl PresenceLimiter {
    pub fn new() -> Self {
        Self {
            limiter: create_limiter(PRESENCE_RATE_LIMIT),
        }
    }

    /// Check if a presence publish is allowed (returns true if allowed)
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for PresenceLimiter {
    fn default() -> Self {
        Self::new()
    }
}
