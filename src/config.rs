use log::warn;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/ward_tally";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_NOTIFY_CHANNEL: &str = "tally_changes";
const DEFAULT_REFRESH_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub max_connections: u32,
    /// Postgres channel the change triggers notify on.
    pub notify_channel: String,
    /// Refresh period of `watch`, independent of notifications.
    pub refresh_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            notify_channel: DEFAULT_NOTIFY_CHANNEL.to_string(),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
        }
    }
}

impl Settings {
    /// Reads settings from the environment (after `.env` has been loaded).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: parse_or(&lookup, "TALLY_MAX_CONNECTIONS", defaults.max_connections),
            notify_channel: lookup("TALLY_NOTIFY_CHANNEL")
                .filter(|channel| !channel.trim().is_empty())
                .unwrap_or(defaults.notify_channel),
            refresh_interval: Duration::from_secs(
                parse_or(&lookup, "TALLY_REFRESH_SECS", DEFAULT_REFRESH_SECS).max(1),
            ),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let s = settings(&[]);
        assert_eq!(s.database_url, "postgres://localhost/ward_tally");
        assert_eq!(s.max_connections, 5);
        assert_eq!(s.notify_channel, "tally_changes");
        assert_eq!(s.refresh_interval, Duration::from_secs(60));
    }

    #[test]
    fn environment_overrides_defaults() {
        let s = settings(&[
            ("DATABASE_URL", "postgres://db/election"),
            ("TALLY_MAX_CONNECTIONS", "12"),
            ("TALLY_REFRESH_SECS", "15"),
        ]);
        assert_eq!(s.database_url, "postgres://db/election");
        assert_eq!(s.max_connections, 12);
        assert_eq!(s.refresh_interval, Duration::from_secs(15));
    }

    #[test]
    fn bad_numbers_fall_back() {
        let s = settings(&[("TALLY_MAX_CONNECTIONS", "many"), ("TALLY_REFRESH_SECS", "0")]);
        assert_eq!(s.max_connections, 5);
        assert_eq!(s.refresh_interval, Duration::from_secs(1));
    }
}
