//! Mascot Configuration
//!
//! All tuning comes from environment variables, read once at startup. There
//! is no configuration file and nothing is persisted between runs.
//!
//! # Environment Variables
//!
//! - `MASCOT_TICK_MS`: walk/jump tick interval (default: 50)
//! - `MASCOT_PAUSE_MS`: how long a message stays on screen (default: 5000)
//! - `MASCOT_JUMP_ODDS`: spontaneous jump chance is 1 in N per tick (default: 40)
//! - `MASCOT_WALK_SPEED`: horizontal pixels per tick (default: 10)
//! - `MASCOT_JUMP_VELOCITY`: initial upward speed of a jump (default: 20)
//! - `MASCOT_GRAVITY`: downward acceleration per tick (default: 2)
//! - `MASCOT_NOTIFY_PROPERTY`: window property carrying notifications
//! - `MASCOT_FONT`: core font used for message captions

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

/// Default window property external processes write notifications into
///
/// xgopher used `GopherNotify`; set `MASCOT_NOTIFY_PROPERTY` to accept it.
pub const DEFAULT_NOTIFY_PROPERTY: &str = "MascotNotify";

/// Default caption font (ISO 10646 so UTF-8 text renders)
pub const DEFAULT_FONT: &str = "-misc-fixed-medium-r-normal--14-*-*-*-*-*-iso10646-1";

/// Largest walk speed, jump velocity or gravity accepted, in pixels per tick
pub const MAX_MOTION_STEP: i32 = 1000;

/// Errors that can occur when validating configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A value is out of its allowed range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Motion constants for the animation state machine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MotionConfig {
    /// Delay between walk/jump ticks
    pub tick: Duration,
    /// How long the waiting pose is held while a message is shown
    pub pause: Duration,
    /// Spontaneous jump probability is `1 / jump_odds` per walking tick
    pub jump_odds: u32,
    /// Magnitude of the horizontal step (`|dx|`)
    pub walk_speed: i32,
    /// Magnitude of the initial upward velocity when a jump starts
    pub jump_velocity: i32,
    /// Added to the vertical velocity on every jump tick
    pub gravity: i32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(50),
            pause: Duration::from_secs(5),
            jump_odds: 40,
            walk_speed: 10,
            jump_velocity: 20,
            gravity: 2,
        }
    }
}

impl MotionConfig {
    /// Load motion constants from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load motion constants through `lookup`, defaulting what it lacks
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            tick: Duration::from_millis(lookup_or(&lookup, "MASCOT_TICK_MS", 50)),
            pause: Duration::from_millis(lookup_or(&lookup, "MASCOT_PAUSE_MS", 5000)),
            jump_odds: lookup_or(&lookup, "MASCOT_JUMP_ODDS", defaults.jump_odds),
            walk_speed: lookup_or(&lookup, "MASCOT_WALK_SPEED", defaults.walk_speed),
            jump_velocity: lookup_or(&lookup, "MASCOT_JUMP_VELOCITY", defaults.jump_velocity),
            gravity: lookup_or(&lookup, "MASCOT_GRAVITY", defaults.gravity),
        }
    }

    /// Reject values that would stall or break the state machine
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for a zero tick or pause, zero jump
    /// odds, a walk speed outside `1..=MAX_MOTION_STEP`, a jump that could
    /// never land, or a jump velocity or gravity above `MAX_MOTION_STEP`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick.is_zero() {
            return Err(ConfigError::Invalid("tick interval must be non-zero".into()));
        }
        if self.pause.is_zero() {
            return Err(ConfigError::Invalid("pause duration must be non-zero".into()));
        }
        if self.jump_odds == 0 {
            return Err(ConfigError::Invalid("jump odds must be at least 1".into()));
        }
        if self.walk_speed <= 0 {
            return Err(ConfigError::Invalid(format!(
                "walk speed must be positive, got {}",
                self.walk_speed
            )));
        }
        if self.jump_velocity < 0 || self.gravity <= 0 {
            return Err(ConfigError::Invalid(format!(
                "jump velocity {} with gravity {} never lands",
                self.jump_velocity, self.gravity
            )));
        }
        for (name, value) in [
            ("walk speed", self.walk_speed),
            ("jump velocity", self.jump_velocity),
            ("gravity", self.gravity),
        ] {
            if value > MAX_MOTION_STEP {
                return Err(ConfigError::Invalid(format!(
                    "{name} {value} exceeds {MAX_MOTION_STEP} pixels per tick"
                )));
            }
        }
        Ok(())
    }
}

/// Complete mascot configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MascotConfig {
    /// Motion constants
    pub motion: MotionConfig,
    /// Name of the window property carrying JSON notifications
    pub notify_property: String,
    /// Core font name for the caption
    pub font: String,
}

impl Default for MascotConfig {
    fn default() -> Self {
        Self {
            motion: MotionConfig::default(),
            notify_property: DEFAULT_NOTIFY_PROPERTY.to_string(),
            font: DEFAULT_FONT.to_string(),
        }
    }
}

impl MascotConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, defaulting what it lacks
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            motion: MotionConfig::from_lookup(&lookup),
            notify_property: lookup("MASCOT_NOTIFY_PROPERTY")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_NOTIFY_PROPERTY.to_string()),
            font: lookup("MASCOT_FONT").unwrap_or_else(|| DEFAULT_FONT.to_string()),
        }
    }

    /// Validate the whole configuration
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.motion.validate()?;
        if self.notify_property.is_empty() {
            return Err(ConfigError::Invalid("notify property name is empty".into()));
        }
        Ok(())
    }
}

/// Look up and parse a setting, falling back to `default`
fn lookup_or<T: FromStr + Copy + std::fmt::Display>(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => parse_or(key, &raw, default),
        None => default,
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, raw: &str, default: T) -> T {
    raw.trim().parse().unwrap_or_else(|_| {
        warn!(key, value = raw, default = %default, "Unparseable setting, using default");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_classic_motion() {
        let motion = MotionConfig::default();
        assert_eq!(motion.tick, Duration::from_millis(50));
        assert_eq!(motion.pause, Duration::from_secs(5));
        assert_eq!(motion.jump_odds, 40);
        assert_eq!(motion.walk_speed, 10);
        assert_eq!(motion.jump_velocity, 20);
        assert_eq!(motion.gravity, 2);
        assert!(motion.validate().is_ok());
    }

    #[test]
    fn test_parse_or_falls_back() {
        assert_eq!(parse_or("K", "75", 50u64), 75);
        assert_eq!(parse_or("K", " 75 ", 50u64), 75);
        assert_eq!(parse_or("K", "fast", 50u64), 50);
        assert_eq!(parse_or("K", "-3", 40u32), 40);
    }

    #[test]
    fn test_validate_rejects_zero_tick() {
        let motion = MotionConfig {
            tick: Duration::ZERO,
            ..MotionConfig::default()
        };
        assert!(matches!(motion.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_odds_and_speed() {
        let odds = MotionConfig {
            jump_odds: 0,
            ..MotionConfig::default()
        };
        assert!(odds.validate().is_err());

        let speed = MotionConfig {
            walk_speed: 0,
            ..MotionConfig::default()
        };
        assert!(speed.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_jump_that_never_lands() {
        let motion = MotionConfig {
            gravity: 0,
            ..MotionConfig::default()
        };
        assert!(motion.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_huge_jump_velocity() {
        let motion = MotionConfig {
            jump_velocity: i32::MAX,
            ..MotionConfig::default()
        };
        assert!(matches!(motion.validate(), Err(ConfigError::Invalid(_))));

        let at_limit = MotionConfig {
            jump_velocity: MAX_MOTION_STEP,
            ..MotionConfig::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_huge_walk_speed() {
        let motion = MotionConfig {
            walk_speed: MAX_MOTION_STEP + 1,
            ..MotionConfig::default()
        };
        assert!(matches!(motion.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_huge_gravity() {
        let motion = MotionConfig {
            gravity: i32::MAX,
            ..MotionConfig::default()
        };
        assert!(matches!(motion.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_huge_jump_velocity_from_env_fails_validation() {
        let config = MascotConfig::from_lookup(|key| {
            (key == "MASCOT_JUMP_VELOCITY").then(|| "2147483647".to_string())
        });
        assert_eq!(config.motion.jump_velocity, i32::MAX);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lookup_overrides_notify_property() {
        let config = MascotConfig::from_lookup(|key| match key {
            "MASCOT_NOTIFY_PROPERTY" => Some("GopherNotify".to_string()),
            "MASCOT_TICK_MS" => Some("80".to_string()),
            _ => None,
        });
        assert_eq!(config.notify_property, "GopherNotify");
        assert_eq!(config.motion.tick, Duration::from_millis(80));
        assert_eq!(config.font, DEFAULT_FONT);
    }

    #[test]
    fn test_lookup_defaults_when_unset() {
        let config = MascotConfig::from_lookup(|_| None);
        assert_eq!(config, MascotConfig::default());
    }

    #[test]
    fn test_empty_property_rejected() {
        let config = MascotConfig {
            notify_property: String::new(),
            ..MascotConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
