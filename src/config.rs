//! Tunables for the proposal screen, read from the environment (and `.env`).

use std::time::Duration;

use bevy::prelude::*;
use thiserror::Error;

// Footprint reserved for the No button when picking a spot for it
pub const CONTROL_WIDTH: f32 = 120.0;
pub const CONTROL_HEIGHT: f32 = 60.0;

pub const GRAVITY: f32 = 0.1;
pub const DAMPING: f32 = 0.99;

pub const HOLD_THRESHOLD_MS: u64 = 500;
pub const EVADE_BURST_MS: u64 = 2000;
pub const CONFETTI_COUNT: usize = 100;
pub const TAUNT_COUNT: usize = 12;
pub const VOLUME: f32 = 0.5;
pub const SAMPLE_RATE: u32 = 44_100;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{key}: expected {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Resource, Clone, Debug, PartialEq)]
pub struct ProposalConfig {
    pub control_size: Vec2,
    pub hold_threshold: Duration,
    pub evade_burst_lifetime: Duration,
    pub confetti_count: usize,
    pub taunt_count: usize,
    pub gravity: f32,
    pub damping: f32,
    /// When set, touches on the No button only evade after a long press.
    pub touch_hold_evasion: bool,
    pub volume: f32,
    pub muted: bool,
    pub sample_rate: u32,
    pub seed: Option<u64>,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            control_size: Vec2::new(CONTROL_WIDTH, CONTROL_HEIGHT),
            hold_threshold: Duration::from_millis(HOLD_THRESHOLD_MS),
            evade_burst_lifetime: Duration::from_millis(EVADE_BURST_MS),
            confetti_count: CONFETTI_COUNT,
            taunt_count: TAUNT_COUNT,
            gravity: GRAVITY,
            damping: DAMPING,
            touch_hold_evasion: true,
            volume: VOLUME,
            muted: false,
            sample_rate: SAMPLE_RATE,
            seed: None,
        }
    }
}

impl ProposalConfig {
    /// Loads `.env` if present, then reads `VALENTINE_*` variables.
    pub fn from_env() -> (Self, Vec<ConfigError>) {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Applies every override that parses. A malformed value leaves its own
    /// key at the default and is handed back; the other keys still apply.
    pub fn from_lookup<F>(lookup: F) -> (Self, Vec<ConfigError>)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let mut rejected = Vec::new();

        if let Some(ms) = keep(parse::<u64, _>(&lookup, "VALENTINE_HOLD_MS", "milliseconds"), &mut rejected) {
            cfg.hold_threshold = Duration::from_millis(ms);
        }
        if let Some(ms) = keep(
            parse::<u64, _>(&lookup, "VALENTINE_EVADE_BURST_MS", "milliseconds"),
            &mut rejected,
        ) {
            cfg.evade_burst_lifetime = Duration::from_millis(ms);
        }
        if let Some(n) = keep(parse(&lookup, "VALENTINE_CONFETTI", "a particle count"), &mut rejected) {
            cfg.confetti_count = n;
        }
        if let Some(n) = keep(parse(&lookup, "VALENTINE_TAUNTS", "a particle count"), &mut rejected) {
            cfg.taunt_count = n;
        }
        if let Some(seed) = keep(parse(&lookup, "VALENTINE_SEED", "an unsigned integer"), &mut rejected) {
            cfg.seed = Some(seed);
        }
        if let Some(volume) = keep(parse::<f32, _>(&lookup, "VALENTINE_VOLUME", "a number"), &mut rejected) {
            if volume.is_finite() {
                cfg.volume = volume.clamp(0.0, 1.0);
            } else {
                rejected.push(ConfigError::Invalid {
                    key: "VALENTINE_VOLUME",
                    value: volume.to_string(),
                    expected: "a number",
                });
            }
        }
        if let Some(muted) = keep(flag(&lookup, "VALENTINE_MUTE"), &mut rejected) {
            cfg.muted = muted;
        }
        if let Some(hold) = keep(flag(&lookup, "VALENTINE_TOUCH_HOLD"), &mut rejected) {
            cfg.touch_hold_evasion = hold;
        }

        (cfg, rejected)
    }
}

fn keep<T>(parsed: Result<Option<T>, ConfigError>, rejected: &mut Vec<ConfigError>) -> Option<T> {
    parsed.unwrap_or_else(|e| {
        rejected.push(e);
        None
    })
}

fn parse<T, F>(lookup: &F, key: &'static str, expected: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse().map(Some).map_err(|_| ConfigError::Invalid {
        key,
        value: raw.clone(),
        expected,
    })
}

fn flag<F>(lookup: &F, key: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            expected: "a boolean",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let (cfg, rejected) = ProposalConfig::from_lookup(|_| None);
        assert!(rejected.is_empty());
        assert_eq!(cfg, ProposalConfig::default());
        assert_eq!(cfg.hold_threshold, Duration::from_millis(500));
        assert_eq!(cfg.evade_burst_lifetime, Duration::from_secs(2));
        assert_eq!(cfg.control_size, Vec2::new(120.0, 60.0));
    }

    #[test]
    fn overrides_are_applied() {
        let (cfg, rejected) = ProposalConfig::from_lookup(lookup_from(&[
            ("VALENTINE_HOLD_MS", "750"),
            ("VALENTINE_EVADE_BURST_MS", "1500"),
            ("VALENTINE_CONFETTI", "40"),
            ("VALENTINE_SEED", "7"),
            ("VALENTINE_MUTE", "yes"),
            ("VALENTINE_TOUCH_HOLD", "off"),
        ]));
        assert!(rejected.is_empty());

        assert_eq!(cfg.hold_threshold, Duration::from_millis(750));
        assert_eq!(cfg.evade_burst_lifetime, Duration::from_millis(1500));
        assert_eq!(cfg.confetti_count, 40);
        assert_eq!(cfg.seed, Some(7));
        assert!(cfg.muted);
        assert!(!cfg.touch_hold_evasion);
    }

    #[test]
    fn volume_is_clamped() {
        let (cfg, _) = ProposalConfig::from_lookup(lookup_from(&[("VALENTINE_VOLUME", "3.5")]));
        assert_eq!(cfg.volume, 1.0);

        let (cfg, rejected) = ProposalConfig::from_lookup(lookup_from(&[("VALENTINE_VOLUME", "inf")]));
        assert_eq!(cfg.volume, VOLUME);
        assert_eq!(rejected.len(), 1);
    }

    #[test]
    fn garbage_is_reported_with_its_key() {
        let (cfg, rejected) = ProposalConfig::from_lookup(lookup_from(&[("VALENTINE_HOLD_MS", "soon")]));
        assert_eq!(cfg.hold_threshold, Duration::from_millis(HOLD_THRESHOLD_MS));
        assert_eq!(
            rejected,
            vec![ConfigError::Invalid {
                key: "VALENTINE_HOLD_MS",
                value: "soon".into(),
                expected: "milliseconds",
            }]
        );
    }

    #[test]
    fn one_bad_value_keeps_the_good_ones() {
        let (cfg, rejected) = ProposalConfig::from_lookup(lookup_from(&[
            ("VALENTINE_MUTE", "maybe"),
            ("VALENTINE_SEED", "7"),
            ("VALENTINE_CONFETTI", "lots"),
            ("VALENTINE_TAUNTS", "5"),
        ]));

        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.taunt_count, 5);
        assert!(!cfg.muted);
        assert_eq!(cfg.confetti_count, CONFETTI_COUNT);

        let keys: Vec<_> = rejected
            .iter()
            .map(|ConfigError::Invalid { key, .. }| *key)
            .collect();
        assert_eq!(keys, ["VALENTINE_CONFETTI", "VALENTINE_MUTE"]);
        assert!(rejected[1].to_string().starts_with("VALENTINE_MUTE"));
    }

    #[test]
    fn blank_values_are_ignored() {
        let (cfg, rejected) = ProposalConfig::from_lookup(lookup_from(&[("VALENTINE_SEED", "  ")]));
        assert!(rejected.is_empty());
        assert_eq!(cfg.seed, None);
    }
}
