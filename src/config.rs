// Runtime configuration
// Read from the environment (optionally seeded from a .env file)

use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_ELEVATION_URL: &str = "https://epqs.nationalmap.gov/v1/json";
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";
pub const DEFAULT_USER_AGENT: &str = "AsteroidImpactSimulator/1.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// NASA NeoWs API key
    pub nasa_api_key: String,
    /// Route simulations through the remote backend first
    pub use_backend: bool,
    pub backend_url: String,
    pub elevation_url: String,
    pub nominatim_url: String,
    /// Upper bound on every outbound HTTP request
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl SimulatorConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; missing or unparsable keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let use_backend = non_empty("IMPACT_USE_BACKEND")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(defaults.use_backend);

        let request_timeout = non_empty("HTTP_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        Self {
            nasa_api_key: non_empty("NASA_API_KEY").unwrap_or(defaults.nasa_api_key),
            use_backend,
            backend_url: non_empty("IMPACT_BACKEND_URL").unwrap_or(defaults.backend_url),
            elevation_url: non_empty("USGS_ELEVATION_URL").unwrap_or(defaults.elevation_url),
            nominatim_url: non_empty("NOMINATIM_URL").unwrap_or(defaults.nominatim_url),
            request_timeout,
            user_agent: non_empty("HTTP_USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }

    /// Shared reqwest client honoring the configured timeout and user agent.
    pub fn http_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .user_agent(self.user_agent.clone())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            })
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            nasa_api_key: "DEMO_KEY".to_string(),
            use_backend: false,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            elevation_url: DEFAULT_ELEVATION_URL.to_string(),
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
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
    fn test_defaults_when_nothing_set() {
        let config = SimulatorConfig::from_lookup(|_| None);
        assert_eq!(config, SimulatorConfig::default());
        assert_eq!(config.nasa_api_key, "DEMO_KEY");
        assert!(!config.use_backend);
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = SimulatorConfig::from_lookup(lookup_from(&[
            ("NASA_API_KEY", "abc123"),
            ("IMPACT_USE_BACKEND", "TRUE"),
            ("IMPACT_BACKEND_URL", "http://sim.internal:9000"),
            ("HTTP_TIMEOUT_SECS", "3"),
        ]));

        assert_eq!(config.nasa_api_key, "abc123");
        assert!(config.use_backend);
        assert_eq!(config.backend_url, "http://sim.internal:9000");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        let config = SimulatorConfig::from_lookup(lookup_from(&[
            ("HTTP_TIMEOUT_SECS", "soon"),
            ("NASA_API_KEY", "   "),
            ("IMPACT_USE_BACKEND", "maybe"),
        ]));

        assert_eq!(config.request_timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.nasa_api_key, "DEMO_KEY");
        assert!(!config.use_backend);
    }
}
