//! Discard layer configuration
//!
//! [`DiscardConfig`] is the serializable form used to create a layer.
//! [`Settings`] is the live copy owned by the layer, readable and writable
//! from any thread while traffic is flowing.

use crate::discard::error::{DiscardError, DiscardResult};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Configuration for a discard layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscardConfig {
    /// Probability of dropping a message travelling up (0.0 - 1.0)
    pub up_rate: f64,
    /// Probability of dropping a message travelling down (0.0 - 1.0)
    pub down_rate: f64,
    /// Never drop traffic sent to or received from this stack by probability
    pub exclude_self: bool,
    /// Drop everything except self-addressed traffic, which is looped back
    pub discard_all: bool,
    /// Number of subsequent unicasts to drop in the down direction
    pub drop_down_unicasts: u32,
    /// Number of subsequent multicasts to drop in the down direction
    pub drop_down_multicasts: u32,
    /// Seed for the drop decisions; entropy when unset
    pub seed: Option<u64>,
}

impl Default for DiscardConfig {
    fn default() -> Self {
        Self {
            up_rate: 0.0,
            down_rate: 0.0,
            exclude_self: true,
            discard_all: false,
            drop_down_unicasts: 0,
            drop_down_multicasts: 0,
            seed: None,
        }
    }
}

impl DiscardConfig {
    /// No faults at all
    pub fn none() -> Self {
        Self::default()
    }

    /// Drop the given share of traffic in both directions
    pub fn lossy(rate: f64) -> Self {
        Self {
            up_rate: rate,
            down_rate: rate,
            ..Default::default()
        }
    }

    /// Cut this member off from the rest of the group
    pub fn partitioned() -> Self {
        Self::default().with_discard_all(true)
    }

    pub fn with_up_rate(mut self, rate: f64) -> Self {
        self.up_rate = rate;
        self
    }

    pub fn with_down_rate(mut self, rate: f64) -> Self {
        self.down_rate = rate;
        self
    }

    pub fn with_exclude_self(mut self, exclude: bool) -> Self {
        self.exclude_self = exclude;
        self
    }

    pub fn with_discard_all(mut self, discard_all: bool) -> Self {
        self.discard_all = discard_all;
        self
    }

    pub fn with_drop_down_unicasts(mut self, count: u32) -> Self {
        self.drop_down_unicasts = count;
        self
    }

    pub fn with_drop_down_multicasts(mut self, count: u32) -> Self {
        self.drop_down_multicasts = count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check that both rates are probabilities
    pub fn validate(&self) -> DiscardResult<()> {
        for (name, rate) in [("up_rate", self.up_rate), ("down_rate", self.down_rate)] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(DiscardError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, rate
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> DiscardResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> DiscardResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Clamp a rate into [0, 1]; NaN counts as 0
pub(crate) fn sanitize_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

/// An `f64` stored in an `AtomicU64`
#[derive(Debug)]
struct AtomicRate(AtomicU64);

impl AtomicRate {
    fn new(rate: f64) -> Self {
        Self(AtomicU64::new(sanitize_rate(rate).to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    fn store(&self, rate: f64) {
        self.0.store(sanitize_rate(rate).to_bits(), Ordering::Release);
    }
}

/// Live settings of a discard layer
#[derive(Debug)]
pub struct Settings {
    up_rate: AtomicRate,
    down_rate: AtomicRate,
    exclude_self: AtomicBool,
    discard_all: AtomicBool,
    drop_down_unicasts: AtomicU32,
    drop_down_multicasts: AtomicU32,
}

impl Settings {
    pub fn from_config(config: &DiscardConfig) -> Self {
        Self {
            up_rate: AtomicRate::new(config.up_rate),
            down_rate: AtomicRate::new(config.down_rate),
            exclude_self: AtomicBool::new(config.exclude_self),
            discard_all: AtomicBool::new(config.discard_all),
            drop_down_unicasts: AtomicU32::new(config.drop_down_unicasts),
            drop_down_multicasts: AtomicU32::new(config.drop_down_multicasts),
        }
    }

    pub fn up_rate(&self) -> f64 {
        self.up_rate.load()
    }

    pub fn set_up_rate(&self, rate: f64) {
        self.up_rate.store(rate);
    }

    pub fn down_rate(&self) -> f64 {
        self.down_rate.load()
    }

    pub fn set_down_rate(&self, rate: f64) {
        self.down_rate.store(rate);
    }

    pub fn exclude_self(&self) -> bool {
        self.exclude_self.load(Ordering::Acquire)
    }

    pub fn set_exclude_self(&self, exclude: bool) {
        self.exclude_self.store(exclude, Ordering::Release);
    }

    pub fn discard_all(&self) -> bool {
        self.discard_all.load(Ordering::Acquire)
    }

    pub fn set_discard_all(&self, discard_all: bool) {
        self.discard_all.store(discard_all, Ordering::Release);
    }

    pub fn drop_down_unicasts(&self) -> u32 {
        self.drop_down_unicasts.load(Ordering::Acquire)
    }

    pub fn set_drop_down_unicasts(&self, count: u32) {
        self.drop_down_unicasts.store(count, Ordering::Release);
    }

    pub fn drop_down_multicasts(&self) -> u32 {
        self.drop_down_multicasts.load(Ordering::Acquire)
    }

    pub fn set_drop_down_multicasts(&self, count: u32) {
        self.drop_down_multicasts.store(count, Ordering::Release);
    }

    /// Consume one unicast drop; false once the budget is exhausted
    pub fn take_unicast(&self) -> bool {
        take_one(&self.drop_down_unicasts)
    }

    /// Consume one multicast drop; false once the budget is exhausted
    pub fn take_multicast(&self) -> bool {
        take_one(&self.drop_down_multicasts)
    }

    /// Current values as a configuration
    pub fn snapshot(&self, seed: Option<u64>) -> DiscardConfig {
        DiscardConfig {
            up_rate: self.up_rate(),
            down_rate: self.down_rate(),
            exclude_self: self.exclude_self(),
            discard_all: self.discard_all(),
            drop_down_unicasts: self.drop_down_unicasts(),
            drop_down_multicasts: self.drop_down_multicasts(),
            seed,
        }
    }
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiscardConfig::default();
        assert_eq!(config.up_rate, 0.0);
        assert_eq!(config.down_rate, 0.0);
        assert!(config.exclude_self);
        assert!(!config.discard_all);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let lossy = DiscardConfig::lossy(0.1);
        assert_eq!(lossy.up_rate, 0.1);
        assert_eq!(lossy.down_rate, 0.1);

        assert!(DiscardConfig::partitioned().discard_all);
        assert_eq!(DiscardConfig::none(), DiscardConfig::default());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(DiscardConfig::default().with_up_rate(1.5).validate().is_err());
        assert!(DiscardConfig::default()
            .with_down_rate(-0.1)
            .validate()
            .is_err());
        assert!(DiscardConfig::default()
            .with_down_rate(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let config = DiscardConfig::from_json(r#"{ "up_rate": 0.25, "drop_down_unicasts": 3 }"#)
            .unwrap();

        assert_eq!(config.up_rate, 0.25);
        assert_eq!(config.drop_down_unicasts, 3);
        assert!(config.exclude_self);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            DiscardConfig::from_json("{ not json"),
            Err(DiscardError::Json(_))
        ));
        assert!(matches!(
            DiscardConfig::from_json(r#"{ "down_rate": 2.0 }"#),
            Err(DiscardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_json_roundtrip_keeps_seed() {
        let config = DiscardConfig::lossy(0.5).with_seed(42);
        let parsed = DiscardConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rates_are_clamped() {
        let settings = Settings::from_config(&DiscardConfig::default());

        settings.set_up_rate(3.0);
        assert_eq!(settings.up_rate(), 1.0);

        settings.set_down_rate(-1.0);
        assert_eq!(settings.down_rate(), 0.0);

        settings.set_down_rate(f64::NAN);
        assert_eq!(settings.down_rate(), 0.0);
    }

    #[test]
    fn test_take_floors_at_zero() {
        let settings = Settings::from_config(&DiscardConfig::default().with_drop_down_unicasts(2));

        assert!(settings.take_unicast());
        assert!(settings.take_unicast());
        assert!(!settings.take_unicast());
        assert_eq!(settings.drop_down_unicasts(), 0);

        // multicast budget untouched
        assert!(!settings.take_multicast());
        assert_eq!(settings.drop_down_multicasts(), 0);
    }

    #[test]
    fn test_snapshot() {
        let config = DiscardConfig::lossy(0.3)
            .with_drop_down_multicasts(4)
            .with_exclude_self(false);
        let settings = Settings::from_config(&config);

        assert_eq!(settings.snapshot(None), config);
    }
}
