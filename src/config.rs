//! Server configuration
//!
//! Read from environment variables, with the bind address overridable by
//! the first command line argument.

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::hub::DEFAULT_SESSION_TTL;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Default period between expiry sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

const ADDR_VAR: &str = "POLL_HUB_ADDR";
const SESSION_TTL_VAR: &str = "POLL_HUB_SESSION_TTL_SECS";
const SWEEP_INTERVAL_VAR: &str = "POLL_HUB_SWEEP_INTERVAL_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Listen address
    pub addr: String,
    /// Idle time after which a session is swept
    pub session_ttl: Duration,
    /// Period of the sweeper task
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            session_ttl: DEFAULT_SESSION_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl Config {
    /// Build the configuration from the process environment and arguments
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok(), env::args().nth(1))
    }

    fn from_lookup<F>(lookup: F, addr_arg: Option<String>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            addr: addr_arg
                .or_else(|| lookup(ADDR_VAR))
                .unwrap_or(defaults.addr),
            session_ttl: secs_or(lookup(SESSION_TTL_VAR), SESSION_TTL_VAR, defaults.session_ttl),
            sweep_interval: secs_or(
                lookup(SWEEP_INTERVAL_VAR),
                SWEEP_INTERVAL_VAR,
                defaults.sweep_interval,
            ),
        }
    }
}

fn secs_or(value: Option<String>, key: &str, default: Duration) -> Duration {
    let Some(value) = value else {
        return default;
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => {
            warn!("Ignoring invalid {}={:?}, using {:?}", key, value, default);
            default
        }
    }
}
