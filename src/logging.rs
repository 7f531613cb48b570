// Logging - tracing subscriber setup
// The engine only emits events; hosts decide whether to install a subscriber

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn";

/// Install a console subscriber.
///
/// `RUST_LOG` takes precedence, then `filter`, then [`DEFAULT_FILTER`].
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(filter: Option<&str>) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match filter.filter(|f| !f.trim().is_empty()) {
            Some(f) => EnvFilter::new(f),
            None => default_env_filter(),
        }
    });

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()
        .is_ok()
}

fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_quiets_http_stack() {
        let filter_str = format!("{}", default_env_filter());
        assert!(filter_str.contains("reqwest=warn"));
        assert!(filter_str.contains("hyper=warn"));
        assert!(filter_str.contains("info"));
    }

    #[test]
    fn test_module_filter_parses() {
        let result = EnvFilter::try_new("warn,asteroid_impact::terrain=debug");
        assert!(result.is_ok());
    }

    #[test]
    fn test_second_init_is_harmless() {
        init_logging(Some("debug"));
        assert!(!init_logging(None));
    }
}
