use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

/// Accepted avatar TTL, in hours: one hour up to ten years.
pub const AVATAR_TTL_HOURS_RANGE: RangeInclusive<i64> = 1..=24 * 365 * 10;

/// Runtime configuration, read from the environment (after `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Maximum resident messages per chat window.
    pub window_capacity: usize,
    pub avatar_db_path: PathBuf,
    pub avatar_ttl_hours: i64,
    /// Byte budget for the avatar sweep.
    pub avatar_max_bytes: u64,
    pub avatar_sweep_secs: u64,
    /// Largest outbound payload the transport accepts.
    pub max_event_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            window_capacity: 200,
            avatar_db_path: PathBuf::from("tgsearch-avatars.db"),
            avatar_ttl_hours: 168, // 7 days
            avatar_max_bytes: 64 * 1024 * 1024,
            avatar_sweep_secs: 3600,
            max_event_bytes: 1024 * 1024,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to
    /// the default with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            window_capacity: parsed(&lookup, "TGSEARCH_WINDOW_CAPACITY", defaults.window_capacity),
            avatar_db_path: lookup("TGSEARCH_AVATAR_DB_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.avatar_db_path),
            avatar_ttl_hours: within(
                parsed(&lookup, "TGSEARCH_AVATAR_TTL_HOURS", defaults.avatar_ttl_hours),
                "TGSEARCH_AVATAR_TTL_HOURS",
                AVATAR_TTL_HOURS_RANGE,
                defaults.avatar_ttl_hours,
            ),
            avatar_max_bytes: parsed(&lookup, "TGSEARCH_AVATAR_MAX_BYTES", defaults.avatar_max_bytes),
            avatar_sweep_secs: parsed(&lookup, "TGSEARCH_AVATAR_SWEEP_SECS", defaults.avatar_sweep_secs),
            max_event_bytes: parsed(&lookup, "TGSEARCH_MAX_EVENT_BYTES", defaults.max_event_bytes),
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value for {}: '{}', using default {:?}", key, raw, default);
            default
        }),
        None => default,
    }
}

fn within<T>(value: T, key: &str, range: RangeInclusive<T>, default: T) -> T
where
    T: PartialOrd + std::fmt::Debug,
{
    if range.contains(&value) {
        value
    } else {
        warn!(
            "Out of range value for {}: {:?} (allowed {:?}), using default {:?}",
            key, value, range, default
        );
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ClientConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config_from(&[]), ClientConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let cfg = config_from(&[
            ("TGSEARCH_WINDOW_CAPACITY", "50"),
            ("TGSEARCH_AVATAR_DB_PATH", "/tmp/av.db"),
            ("TGSEARCH_AVATAR_TTL_HOURS", "24"),
        ]);
        assert_eq!(cfg.window_capacity, 50);
        assert_eq!(cfg.avatar_db_path, PathBuf::from("/tmp/av.db"));
        assert_eq!(cfg.avatar_ttl_hours, 24);
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = config_from(&[
            ("TGSEARCH_WINDOW_CAPACITY", "-3"),
            ("TGSEARCH_MAX_EVENT_BYTES", "lots"),
        ]);
        assert_eq!(cfg.window_capacity, 200);
        assert_eq!(cfg.max_event_bytes, 1024 * 1024);
    }

    #[test]
    fn out_of_range_ttl_falls_back() {
        for raw in ["10000000000", "-5", "0", "99999999999999999999"] {
            let cfg = config_from(&[("TGSEARCH_AVATAR_TTL_HOURS", raw)]);
            assert_eq!(cfg.avatar_ttl_hours, 168, "{}", raw);
        }
        let cfg = config_from(&[("TGSEARCH_AVATAR_TTL_HOURS", "87600")]);
        assert_eq!(cfg.avatar_ttl_hours, 87600);
    }

    #[test]
    fn zero_capacity_is_passed_through_for_the_window_to_reject() {
        let cfg = config_from(&[("TGSEARCH_WINDOW_CAPACITY", "0")]);
        assert_eq!(cfg.window_capacity, 0);
    }
}
