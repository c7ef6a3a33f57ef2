//! Environment driven configuration.
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const CRIO_SOCKET_PATH: &str = "CRIO_SOCKET_PATH";
pub const ROOTFS_MOUNT_PATH: &str = "ROOTFS_MOUNT_PATH";
pub const POLL_INTERVAL_MS: &str = "POLL_INTERVAL_MS";
pub const IDLE_INTERVAL_MS: &str = "IDLE_INTERVAL_MS";
pub const POLICY_ENABLED: &str = "POLICY_ENABLED";
pub const API_LISTEN_ADDR: &str = "API_LISTEN_ADDR";

const DEFAULT_CRIO_SOCKET: &str = "/var/run/crio/crio.sock";
const DEFAULT_ROOTFS: &str = "/";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_API_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value `{value}` for `{var}`: expected {expected}")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Sleep durations of the discovery loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    /// Sleep after a cycle that applied changes.
    pub active: Duration,
    /// Sleep after a cycle that found nothing to do.
    pub idle: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            active: DEFAULT_POLL_INTERVAL,
            idle: DEFAULT_IDLE_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub crio_socket: PathBuf,
    /// Host root filesystem; namespaces are read from `<rootfs>/proc`.
    pub rootfs: PathBuf,
    pub intervals: PollIntervals,
    /// Whether namespace mappings are handed to the attribution subsystem.
    pub policy_enabled: bool,
    /// Listen address of the read-side API, `None` if disabled.
    pub api_addr: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crio_socket: PathBuf::from(DEFAULT_CRIO_SOCKET),
            rootfs: PathBuf::from(DEFAULT_ROOTFS),
            intervals: PollIntervals::default(),
            policy_enabled: true,
            api_addr: Some(DEFAULT_API_ADDR.to_owned()),
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the configuration from `lookup`, falling back to defaults for
    /// unset variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = lookup(CRIO_SOCKET_PATH) {
            config.crio_socket = PathBuf::from(path);
        }
        if let Some(path) = lookup(ROOTFS_MOUNT_PATH) {
            config.rootfs = PathBuf::from(path);
        }
        if let Some(raw) = lookup(POLL_INTERVAL_MS) {
            config.intervals.active = parse_millis(POLL_INTERVAL_MS, raw)?;
        }
        if let Some(raw) = lookup(IDLE_INTERVAL_MS) {
            config.intervals.idle = parse_millis(IDLE_INTERVAL_MS, raw)?;
        }
        if let Some(raw) = lookup(POLICY_ENABLED) {
            config.policy_enabled = parse_bool(POLICY_ENABLED, raw)?;
        }
        if let Some(addr) = lookup(API_LISTEN_ADDR) {
            let addr = addr.trim();
            config.api_addr = (!addr.is_empty()).then(|| addr.to_owned());
        }

        Ok(config)
    }

    pub fn proc_root(&self) -> PathBuf {
        self.rootfs.join("proc")
    }
}

fn parse_millis(var: &'static str, raw: String) -> Result<Duration> {
    u64::from_str(raw.trim())
        .map(Duration::from_millis)
        .map_err(|_| Error::InvalidValue {
            var,
            value: raw,
            expected: "a number of milliseconds",
        })
}

fn parse_bool(var: &'static str, raw: String) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidValue {
            var,
            value: raw,
            expected: "a boolean",
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.proc_root(), PathBuf::from("/proc"));
        assert_eq!(config.intervals.active, Duration::from_millis(50));
        assert_eq!(config.intervals.idle, Duration::from_millis(10));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            (CRIO_SOCKET_PATH, "/run/crio/crio.sock"),
            (ROOTFS_MOUNT_PATH, "/rootfs"),
            (POLL_INTERVAL_MS, "250"),
            (IDLE_INTERVAL_MS, " 20 "),
            (POLICY_ENABLED, "false"),
            (API_LISTEN_ADDR, ""),
        ]))
        .unwrap();

        assert_eq!(config.crio_socket, PathBuf::from("/run/crio/crio.sock"));
        assert_eq!(config.proc_root(), PathBuf::from("/rootfs/proc"));
        assert_eq!(config.intervals.active, Duration::from_millis(250));
        assert_eq!(config.intervals.idle, Duration::from_millis(20));
        assert!(!config.policy_enabled);
        assert_eq!(config.api_addr, None);
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = Config::from_lookup(lookup(&[(POLL_INTERVAL_MS, "soon")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value `soon` for `POLL_INTERVAL_MS`: expected a number of milliseconds"
        );

        assert!(Config::from_lookup(lookup(&[(POLICY_ENABLED, "maybe")])).is_err());
    }
}
