use std::time::Duration;

use veil_core::error::CoreError;
use veil_core::polling::{PollPolicy, DEFAULT_POLL_INTERVAL};

use crate::api::DEFAULT_BASE_URL;
use crate::session::API_KEY_ENV_VARS;

/// Default per-request HTTP timeout.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for talking to the public API.
#[derive(Debug, Clone, PartialEq)]
pub struct GenAiConfig {
    /// Scheme and host of the REST API.
    pub base_url: String,
    /// Initial API key, if one is configured.
    pub api_key: Option<String>,
    /// Fixed delay between status queries.
    pub poll_interval: Duration,
    /// Optional bound on total waiting time per job.
    pub poll_deadline: Option<Duration>,
    /// Optional bound on status queries per job.
    pub poll_max_attempts: Option<u32>,
    /// Timeout applied to every individual HTTP call.
    pub http_timeout: Duration,
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_deadline: None,
            poll_max_attempts: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl GenAiConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                     | Default                                     |
    /// |-----------------------------|---------------------------------------------|
    /// | `GEMINI_BASE_URL`           | `https://generativelanguage.googleapis.com` |
    /// | `GEMINI_API_KEY` / `API_KEY`| unset                                       |
    /// | `POLL_INTERVAL_SECS`        | `10`                                        |
    /// | `POLL_DEADLINE_SECS`        | unset (wait indefinitely)                   |
    /// | `POLL_MAX_ATTEMPTS`         | unset (no cap)                              |
    /// | `HTTP_TIMEOUT_SECS`         | `60`                                        |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let base_url = get("GEMINI_BASE_URL").unwrap_or(defaults.base_url);
        let api_key = API_KEY_ENV_VARS.iter().find_map(|name| get(*name));

        let poll_interval = match get("POLL_INTERVAL_SECS") {
            Some(v) => Duration::from_secs(parse_number::<u64>("POLL_INTERVAL_SECS", &v)?),
            None => defaults.poll_interval,
        };
        let poll_deadline = get("POLL_DEADLINE_SECS")
            .map(|v| parse_number("POLL_DEADLINE_SECS", &v).map(Duration::from_secs))
            .transpose()?;
        let poll_max_attempts = get("POLL_MAX_ATTEMPTS")
            .map(|v| parse_number::<u32>("POLL_MAX_ATTEMPTS", &v))
            .transpose()?;
        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_number::<u64>("HTTP_TIMEOUT_SECS", &v)?),
            None => defaults.http_timeout,
        };

        let config = Self {
            base_url,
            api_key,
            poll_interval,
            poll_deadline,
            poll_max_attempts,
            http_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the wait settings. Configured polling always pauses between
    /// queries; a zero interval is only accepted on a [`PollPolicy`] built
    /// in code.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval.is_zero() {
            return Err(CoreError::Validation(
                "poll interval must be at least one second".to_string(),
            ));
        }
        self.poll_policy().validate()
    }

    /// Poll policy described by this configuration.
    pub fn poll_policy(&self) -> PollPolicy {
        let mut policy = PollPolicy::fixed(self.poll_interval);
        policy.deadline = self.poll_deadline;
        policy.max_attempts = self.poll_max_attempts;
        policy
    }

    /// Build the shared HTTP client.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder().timeout(self.http_timeout).build()
    }
}

/// Parse an integer variable; out-of-range values are errors, not wrapped.
fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, CoreError> {
    value.trim().parse().map_err(|_| {
        CoreError::Validation(format!(
            "{name} must be a non-negative integer in range, got '{value}'"
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<GenAiConfig, CoreError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GenAiConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(load(&[]).unwrap(), GenAiConfig::default());
    }

    #[test]
    fn gemini_key_preferred_over_generic_key() {
        let config = load(&[("API_KEY", "generic"), ("GEMINI_API_KEY", "gemini")]).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("gemini"));

        let config = load(&[("API_KEY", "generic"), ("GEMINI_API_KEY", " ")]).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("generic"));
    }

    #[test]
    fn bounds_flow_into_poll_policy() {
        let config = load(&[
            ("POLL_INTERVAL_SECS", "2"),
            ("POLL_DEADLINE_SECS", "600"),
            ("POLL_MAX_ATTEMPTS", "30"),
        ])
        .unwrap();
        let policy = config.poll_policy();

        assert_eq!(policy.interval, Duration::from_secs(2));
        assert_eq!(policy.deadline, Some(Duration::from_secs(600)));
        assert_eq!(policy.max_attempts, Some(30));
    }

    #[test]
    fn garbage_number_rejected() {
        assert_matches!(
            load(&[("POLL_INTERVAL_SECS", "soon")]),
            Err(CoreError::Validation(msg)) if msg.contains("POLL_INTERVAL_SECS")
        );
    }

    #[test]
    fn oversized_attempt_cap_rejected() {
        assert_matches!(
            load(&[("POLL_MAX_ATTEMPTS", "4294967297")]),
            Err(CoreError::Validation(msg)) if msg.contains("POLL_MAX_ATTEMPTS")
        );
        let config = load(&[("POLL_MAX_ATTEMPTS", "4294967295")]).unwrap();
        assert_eq!(config.poll_max_attempts, Some(u32::MAX));
    }

    #[test]
    fn zero_interval_rejected() {
        assert_matches!(
            load(&[("POLL_INTERVAL_SECS", "0")]),
            Err(CoreError::Validation(_))
        );
    }
}
