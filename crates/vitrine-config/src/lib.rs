//! Vitrine configuration system
//!
//! This crate provides centralized configuration for the page runtime,
//! loading timings and thresholds from `vitrine.toml` with environment
//! variable overrides on top.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or checking configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is outside its allowed range.
    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Main configuration structure for Vitrine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VitrineConfig {
    /// Dashboard rotator timings
    pub rotator: RotatorConfig,
    /// Scroll reveal settings
    pub reveal: RevealConfig,
    /// Pricing toggle timings
    pub pricing: PricingConfig,
    /// Feature card hover effect
    pub hover: HoverConfig,
    /// Metrics sampling
    pub metrics: MetricsConfig,
}

/// Rotator (dashboard preview) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotatorConfig {
    /// Auto-advance interval
    pub interval_ms: u64,
    /// Auto-advance is suppressed for this long after a user interaction
    pub suppress_window_ms: u64,
    /// Quiet period required before auto-play may be re-armed
    pub resume_quiet_ms: u64,
    /// Delay before the outgoing slide loses its active state
    pub exit_delay_ms: u64,
    /// One render opportunity
    pub frame_ms: u64,
    /// Start auto-playing as soon as the rotator is registered
    pub auto_start: bool,
}

/// Scroll reveal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Visible fraction in [0, 1] that triggers the reveal
    pub threshold: f64,
    /// Delay between consecutive `.reveal-item` children
    pub stagger_ms: u64,
    /// Initial downward offset of hidden content, in pixels
    pub offset_px: u32,
}

/// Pricing toggle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Time the old price takes to fade out before the text is swapped
    pub swap_delay_ms: u64,
    /// One render opportunity
    pub frame_ms: u64,
}

/// Feature card hover configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HoverConfig {
    /// How far a hovered card lifts, in pixels
    pub lift_px: u32,
    /// Scale applied to a hovered card
    pub scale: f64,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Interval between memory samples
    pub memory_sample_interval_ms: u64,
}

impl Default for RotatorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 4000,
            suppress_window_ms: 10_000,
            resume_quiet_ms: 5000,
            exit_delay_ms: 150,
            frame_ms: 16,
            auto_start: true,
        }
    }
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            stagger_ms: 100,
            offset_px: 30,
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            swap_delay_ms: 150,
            frame_ms: 16,
        }
    }
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            lift_px: 8,
            scale: 1.02,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            memory_sample_interval_ms: 30_000,
        }
    }
}

fn env_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse::<T>().ok())
}

impl VitrineConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from `vitrine.toml` in the current directory,
    /// or return the defaults if the file doesn't exist or doesn't parse
    pub fn load_or_default() -> Self {
        Self::load_from_file("vitrine.toml").unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    /// Unparseable values are ignored.
    pub fn merge_with_env(&mut self) {
        // Rotator settings
        if let Some(ms) = env_parse("VITRINE_ROTATOR_INTERVAL_MS") {
            self.rotator.interval_ms = ms;
        }
        if let Some(ms) = env_parse("VITRINE_ROTATOR_SUPPRESS_MS") {
            self.rotator.suppress_window_ms = ms;
        }
        if let Some(ms) = env_parse("VITRINE_ROTATOR_RESUME_QUIET_MS") {
            self.rotator.resume_quiet_ms = ms;
        }
        if let Ok(val) = std::env::var("VITRINE_ROTATOR_AUTO_START") {
            self.rotator.auto_start = env_flag(&val);
        }

        // Reveal settings
        if let Some(threshold) = env_parse("VITRINE_REVEAL_THRESHOLD") {
            self.reveal.threshold = threshold;
        }
        if let Some(ms) = env_parse("VITRINE_REVEAL_STAGGER_MS") {
            self.reveal.stagger_ms = ms;
        }

        // Pricing settings
        if let Some(ms) = env_parse("VITRINE_PRICING_SWAP_MS") {
            self.pricing.swap_delay_ms = ms;
        }

        // Metrics settings
        if let Some(ms) = env_parse("VITRINE_MEMORY_SAMPLE_MS") {
            self.metrics.memory_sample_interval_ms = ms;
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// This is the recommended way to load configuration:
    /// 1. Load from vitrine.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.reveal.threshold) {
            return Err(ConfigError::Invalid {
                key: "reveal.threshold",
                reason: format!("{} is outside [0, 1]", self.reveal.threshold),
            });
        }
        if self.rotator.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "rotator.interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.metrics.memory_sample_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "metrics.memory_sample_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.hover.scale <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "hover.scale",
                reason: format!("{} is not a positive scale", self.hover.scale),
            });
        }
        Ok(())
    }
}
