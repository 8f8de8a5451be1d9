use std::time::Duration;

/// Realtime gateway configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared HS256 secret used to verify bearer tokens.
    pub jwt_secret: String,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Path the WebSocket endpoint is mounted on.
    pub ws_path: String,
    /// How often the server pings each socket.
    pub heartbeat_interval: Duration,
    /// A socket with no inbound traffic for this long is evicted.
    pub idle_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            jwt_secret: required_var("JWT_SECRET"),
            port: parsed_var("PORT").unwrap_or(5000),
            ws_path: std::env::var("WS_PATH")
                .ok()
                .filter(|s| s.starts_with('/'))
                .unwrap_or_else(|| "/ws".to_string()),
            heartbeat_interval: positive_secs(
                std::env::var("WS_HEARTBEAT_INTERVAL_SECS").ok().as_deref(),
                30,
            ),
            idle_timeout: positive_secs(std::env::var("WS_IDLE_TIMEOUT_SECS").ok().as_deref(), 90),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Whole seconds from `raw`, falling back to `default` when unset, unparsable,
/// or zero. Timers built from these durations panic on a zero period.
fn positive_secs(raw: Option<&str>, default: u64) -> Duration {
    let secs = raw
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&secs| secs > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}
