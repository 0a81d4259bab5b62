//! Configuration for the scheduler core.
//!
//! This module provides:
//! - The fixed priority contract (`PRIORITY_MIN`, `PRIORITY_MAX`,
//!   `PRIORITY_DEFAULT`) that callers schedule against
//! - A small construction-time config (`SchedConfig`) with validation
//!
//! The priority constants are part of the scheduling contract tested by
//! callers and are not configurable.

use core::fmt;

/// A scheduling priority value.
///
/// Base priorities are confined to `[PRIORITY_MIN, PRIORITY_MAX]`; effective
/// priorities can exceed `PRIORITY_MAX` under lottery-mode donation, where
/// donated tickets add instead of taking the maximum.
pub type Priority = u32;

/// The minimum priority that a thread can have.
pub const PRIORITY_MIN: Priority = 0;

/// The maximum priority that a thread can have.
pub const PRIORITY_MAX: Priority = 7;

/// The default priority for a new thread.
pub const PRIORITY_DEFAULT: Priority = 1;

/// Construction-time configuration for a [`Scheduler`](crate::runtime::Scheduler).
///
/// The seed drives lottery-mode draws; two schedulers built from the same
/// config replay identical selections on identical operation sequences.
#[derive(Debug, Clone)]
pub struct SchedConfig {
    /// Seed for the deterministic RNG used by lottery-mode queues.
    pub seed: u64,
    /// Pre-allocated capacity for the thread-state arena.
    pub thread_capacity: usize,
    /// Pre-allocated capacity for the wait-queue arena.
    pub queue_capacity: usize,
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_C0DE,
            thread_capacity: 64,
            queue_capacity: 64,
        }
    }
}

impl SchedConfig {
    /// Creates a config with the given RNG seed and default capacities.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Sets the RNG seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the thread-state arena capacity hint.
    #[must_use]
    pub fn thread_capacity(mut self, capacity: usize) -> Self {
        self.thread_capacity = capacity;
        self
    }

    /// Sets the wait-queue arena capacity hint.
    #[must_use]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Validates the configuration for basic sanity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_capacity == 0 {
            return Err(ConfigError::ZeroThreadCapacity);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        Ok(())
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The thread-state arena capacity must be non-zero.
    ZeroThreadCapacity,
    /// The wait-queue arena capacity must be non-zero.
    ZeroQueueCapacity,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroThreadCapacity => write!(f, "thread capacity must be non-zero"),
            Self::ZeroQueueCapacity => write!(f, "queue capacity must be non-zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SchedConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_capacities_rejected() {
        let config = SchedConfig::default().thread_capacity(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroThreadCapacity));

        let config = SchedConfig::default().queue_capacity(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroQueueCapacity));
    }

    #[test]
    fn builder_sets_fields() {
        let config = SchedConfig::new(99).thread_capacity(8).queue_capacity(4);
        assert_eq!(config.seed, 99);
        assert_eq!(config.thread_capacity, 8);
        assert_eq!(config.queue_capacity, 4);
    }

    #[test]
    fn priority_contract_constants() {
        assert_eq!(PRIORITY_MIN, 0);
        assert_eq!(PRIORITY_MAX, 7);
        assert_eq!(PRIORITY_DEFAULT, 1);
        assert!(PRIORITY_MIN <= PRIORITY_DEFAULT && PRIORITY_DEFAULT <= PRIORITY_MAX);
    }
}
