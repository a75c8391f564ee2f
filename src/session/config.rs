use std::time::Duration;

use crate::error::Error;

const DEFAULT_IDLE_LIMIT: Duration = Duration::from_secs(30 * 60);
const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_WARNING_LEAD: Duration = Duration::from_secs(5 * 60);

/// Session lifecycle settings.
///
/// All fields have defaults; override with the `with_*` methods or load
/// them from the environment with [`from_env()`](SessionConfig::from_env).
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct SessionConfig {
    pub(crate) idle_limit: Duration,
    pub(crate) check_interval: Duration,
    pub(crate) warning_lead: Option<Duration>,
    pub(crate) token_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_limit: DEFAULT_IDLE_LIMIT,
            check_interval: DEFAULT_CHECK_INTERVAL,
            warning_lead: Some(DEFAULT_WARNING_LEAD),
            token_key: "authToken".into(),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `DASHBOARD_IDLE_TIMEOUT_SECS`: idle limit before automatic logout
    /// - `DASHBOARD_CHECK_INTERVAL_SECS`: how often the idle check runs
    /// - `DASHBOARD_WARNING_SECS`: expiry warning lead time, `0` disables it
    /// - `DASHBOARD_TOKEN_KEY`: storage key for the session token
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a value is not a non-negative integer,
    /// or if the idle limit or check interval is zero.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();

        if let Some(secs) = parse_secs(&var, "DASHBOARD_IDLE_TIMEOUT_SECS")? {
            config = config.with_idle_limit(non_zero(secs, "DASHBOARD_IDLE_TIMEOUT_SECS")?);
        }
        if let Some(secs) = parse_secs(&var, "DASHBOARD_CHECK_INTERVAL_SECS")? {
            config = config.with_check_interval(non_zero(secs, "DASHBOARD_CHECK_INTERVAL_SECS")?);
        }
        if let Some(secs) = parse_secs(&var, "DASHBOARD_WARNING_SECS")? {
            config = config.with_warning_lead((!secs.is_zero()).then_some(secs));
        }
        if let Some(key) = var("DASHBOARD_TOKEN_KEY").filter(|k| !k.is_empty()) {
            config = config.with_token_key(key);
        }

        Ok(config)
    }

    /// Inactivity after which the session is logged out (default: 30 minutes).
    #[must_use]
    pub fn with_idle_limit(mut self, limit: Duration) -> Self {
        self.idle_limit = limit;
        self
    }

    /// Granularity of the idle check (default: 1 minute, at least 1 second).
    #[must_use]
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Publish an expiry warning this long before logout (default: 5 minutes).
    #[must_use]
    pub fn with_warning_lead(mut self, lead: Option<Duration>) -> Self {
        self.warning_lead = lead;
        self
    }

    #[must_use]
    pub fn with_token_key(mut self, key: impl Into<String>) -> Self {
        self.token_key = key.into();
        self
    }

    #[must_use]
    pub fn idle_limit(&self) -> Duration {
        self.idle_limit
    }

    #[must_use]
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    #[must_use]
    pub fn warning_lead(&self) -> Option<Duration> {
        self.warning_lead
    }

    #[must_use]
    pub fn token_key(&self) -> &str {
        &self.token_key
    }
}

fn parse_secs(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<Duration>, Error> {
    var(name)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| Error::Config(format!("{name}: {e}")))
        })
        .transpose()
}

fn non_zero(d: Duration, name: &str) -> Result<Duration, Error> {
    if d.is_zero() {
        return Err(Error::Config(format!("{name} must be greater than zero")));
    }
    Ok(d)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_map(pairs: &[(&str, &str)]) -> Result<SessionConfig, Error> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        SessionConfig::from_vars(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = SessionConfig::new();
        assert_eq!(config.idle_limit(), Duration::from_secs(1800));
        assert_eq!(config.check_interval(), Duration::from_secs(60));
        assert_eq!(config.warning_lead(), Some(Duration::from_secs(300)));
        assert_eq!(config.token_key(), "authToken");
    }

    #[test]
    fn reads_overrides_from_vars() {
        let config = from_map(&[
            ("DASHBOARD_IDLE_TIMEOUT_SECS", "900"),
            ("DASHBOARD_CHECK_INTERVAL_SECS", " 30 "),
            ("DASHBOARD_WARNING_SECS", "0"),
            ("DASHBOARD_TOKEN_KEY", "dashToken"),
        ])
        .unwrap();
        assert_eq!(config.idle_limit(), Duration::from_secs(900));
        assert_eq!(config.check_interval(), Duration::from_secs(30));
        assert_eq!(config.warning_lead(), None);
        assert_eq!(config.token_key(), "dashToken");
    }

    #[test]
    fn rejects_invalid_numbers() {
        let err = from_map(&[("DASHBOARD_IDLE_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("DASHBOARD_IDLE_TIMEOUT_SECS")));
    }

    #[test]
    fn rejects_zero_idle_limit() {
        assert!(from_map(&[("DASHBOARD_IDLE_TIMEOUT_SECS", "0")]).is_err());
        assert!(from_map(&[("DASHBOARD_CHECK_INTERVAL_SECS", "0")]).is_err());
    }
}
