//! Server configuration from the environment.

use sketchroom_core::room::DEFAULT_CAPACITY;
use std::net::SocketAddr;

pub const DEFAULT_MAX_CAPACITY: u32 = 50;

/// Parse `key` from the environment, falling back to `default` when unset or invalid.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Capacity for rooms whose creator did not ask for one.
    pub default_capacity: u32,
    /// Upper bound on any requested capacity.
    pub max_capacity: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3030)),
            default_capacity: DEFAULT_CAPACITY,
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Read `SKETCHROOM_ADDR`, `SKETCHROOM_DEFAULT_CAPACITY` and `SKETCHROOM_MAX_CAPACITY`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_capacity = env_parse("SKETCHROOM_MAX_CAPACITY", defaults.max_capacity).max(1);
        Self {
            addr: env_parse("SKETCHROOM_ADDR", defaults.addr),
            default_capacity: env_parse("SKETCHROOM_DEFAULT_CAPACITY", defaults.default_capacity)
                .clamp(1, max_capacity),
            max_capacity,
        }
    }

    /// Capacity for a new room given the creator's request (0 means unspecified).
    pub fn capacity_for(&self, requested: u32) -> u32 {
        match requested {
            0 => self.default_capacity,
            n => n.min(self.max_capacity),
        }
    }
}
