//! Configuration for the chess room server
//!
//! Every setting comes from an environment variable with a built-in
//! default. Values that fail to parse fall back to the default.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_GRACE_SECS: u64 = 30;
const DEFAULT_ABORT_PLIES: usize = 2;
const DEFAULT_RETENTION_SECS: u64 = 300;
/// Upper bound for timer settings; larger values are clamped.
const MAX_TIMER_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// How long a disconnected player may take to come back.
    pub grace: Duration,
    /// Plies after which abort is refused.
    pub abort_ply_limit: usize,
    /// How long an ended game stays readable.
    pub retention: Duration,
    pub log_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            addr: get_addr(),
            grace: get_grace(),
            abort_ply_limit: get_abort_plies(),
            retention: get_retention(),
            log_dir: get_log_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            grace: Duration::from_secs(DEFAULT_GRACE_SECS),
            abort_ply_limit: DEFAULT_ABORT_PLIES,
            retention: Duration::from_secs(DEFAULT_RETENTION_SECS),
            log_dir: None,
        }
    }
}

/// Listen address from CHESSROOM_ADDR.
pub fn get_addr() -> SocketAddr {
    parse_or(std::env::var("CHESSROOM_ADDR").ok(), default_addr())
}

/// Reconnect grace window from CHESSROOM_GRACE_SECS.
pub fn get_grace() -> Duration {
    timer_secs(
        std::env::var("CHESSROOM_GRACE_SECS").ok(),
        DEFAULT_GRACE_SECS,
    )
}

/// Abort cut-off from CHESSROOM_ABORT_PLIES.
pub fn get_abort_plies() -> usize {
    parse_or(
        std::env::var("CHESSROOM_ABORT_PLIES").ok(),
        DEFAULT_ABORT_PLIES,
    )
}

/// Ended-game retention from CHESSROOM_RETENTION_SECS.
pub fn get_retention() -> Duration {
    timer_secs(
        std::env::var("CHESSROOM_RETENTION_SECS").ok(),
        DEFAULT_RETENTION_SECS,
    )
}

/// Rolling log directory from CHESSROOM_LOG_DIR. Unset means stdout.
pub fn get_log_dir() -> Option<PathBuf> {
    std::env::var("CHESSROOM_LOG_DIR")
        .ok()
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Seconds setting for a server timer, clamped so deadlines stay
/// representable.
fn timer_secs(raw: Option<String>, default: u64) -> Duration {
    let secs = parse_or(raw, default);
    if secs > MAX_TIMER_SECS {
        tracing::warn!(secs, max = MAX_TIMER_SECS, "Timer setting too large, clamping");
    }
    Duration::from_secs(secs.min(MAX_TIMER_SECS))
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    match raw {
        Some(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!(%value, "Unparseable config value, using default");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.addr.to_string(), DEFAULT_ADDR);
        assert_eq!(config.grace, Duration::from_secs(30));
        assert_eq!(config.abort_ply_limit, 2);
        assert_eq!(config.retention, Duration::from_secs(300));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_parse_or() {
        assert_eq!(parse_or(Some("45".into()), 30u64), 45);
        assert_eq!(parse_or(Some(" 7 ".into()), 30u64), 7);
        assert_eq!(parse_or(Some("soon".into()), 30u64), 30);
        assert_eq!(parse_or(None, 30u64), 30);

        let addr: SocketAddr = parse_or(Some("0.0.0.0:9000".into()), default_addr());
        assert_eq!(addr.port(), 9000);
        let addr: SocketAddr = parse_or(Some("localhost".into()), default_addr());
        assert_eq!(addr, default_addr());
    }

    #[test]
    fn test_timer_settings_are_clamped() {
        assert_eq!(timer_secs(Some("45".into()), 30), Duration::from_secs(45));
        assert_eq!(timer_secs(None, 30), Duration::from_secs(30));
        assert_eq!(
            timer_secs(Some(u64::MAX.to_string()), 30),
            Duration::from_secs(MAX_TIMER_SECS)
        );

        // A clamped grace window can always be added to the current instant.
        let grace = timer_secs(Some("18446744073709551615".into()), 30);
        assert!(tokio::time::Instant::now().checked_add(grace).is_some());
    }
}
