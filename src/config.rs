//! Runtime configuration read from environment variables.

use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use crate::correlation::RetentionPolicy;

const DEFAULT_SOCKET: &str = "/run/containerd/containerd.sock";
const DEFAULT_NAMESPACE: &str = "k8s.io";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("environment variable `{var}` must be a number of seconds, got `{value}`: {source}")]
    InvalidSeconds {
        var: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("environment variable `{var}` must be greater than zero")]
    Zero { var: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path of the containerd gRPC socket.
    pub socket_path: PathBuf,
    /// containerd namespace whose events are observed.
    pub namespace: String,
    pub connect_timeout: Duration,
    /// How long a preparation start may wait for its commit before it is evicted.
    pub pending_ttl: Duration,
    /// How long a completed preparation stays resolvable by name. `None` keeps it forever.
    pub layer_retention: Option<Duration>,
    pub sweep_interval: Duration,
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if a duration variable is not a non-negative integer, or is zero
    /// where zero has no meaning.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let socket_path = get("CONTAINERD_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET));
        let namespace = get("CONTAINERD_NAMESPACE")
            .map(|namespace| namespace.trim().to_owned())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned());

        let connect_timeout = non_zero(
            "CONNECT_TIMEOUT_SECS",
            seconds("CONNECT_TIMEOUT_SECS", get("CONNECT_TIMEOUT_SECS"))?,
        )?
        .unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let pending_ttl = non_zero(
            "PENDING_PREPARATION_TTL_SECS",
            seconds(
                "PENDING_PREPARATION_TTL_SECS",
                get("PENDING_PREPARATION_TTL_SECS"),
            )?,
        )?
        .unwrap_or(DEFAULT_PENDING_TTL);
        let layer_retention = seconds("LAYER_RETENTION_SECS", get("LAYER_RETENTION_SECS"))?;
        let sweep_interval = non_zero(
            "SWEEP_INTERVAL_SECS",
            seconds("SWEEP_INTERVAL_SECS", get("SWEEP_INTERVAL_SECS"))?,
        )?
        .unwrap_or(DEFAULT_SWEEP_INTERVAL);

        Ok(Self {
            socket_path,
            namespace,
            connect_timeout,
            pending_ttl,
            layer_retention,
            sweep_interval,
        })
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            pending_ttl: self.pending_ttl,
            layer_retention: self.layer_retention,
        }
    }
}

fn seconds(var: &'static str, value: Option<String>) -> Result<Option<Duration>> {
    value
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|source| Error::InvalidSeconds { var, value, source })
        })
        .transpose()
}

fn non_zero(var: &'static str, duration: Option<Duration>) -> Result<Option<Duration>> {
    match duration {
        Some(duration) if duration.is_zero() => Err(Error::Zero { var }),
        duration => Ok(duration),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.socket_path, PathBuf::from(DEFAULT_SOCKET));
        assert_eq!(config.namespace, "k8s.io");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.pending_ttl, Duration::from_secs(3600));
        assert_eq!(config.layer_retention, None);
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("CONTAINERD_SOCKET", "/rootfs/run/containerd/containerd.sock"),
            ("CONTAINERD_NAMESPACE", "moby"),
            ("PENDING_PREPARATION_TTL_SECS", "120"),
            ("LAYER_RETENTION_SECS", "86400"),
            ("SWEEP_INTERVAL_SECS", " 5 "),
        ])
        .unwrap();
        assert_eq!(
            config.socket_path,
            PathBuf::from("/rootfs/run/containerd/containerd.sock")
        );
        assert_eq!(config.namespace, "moby");
        assert_eq!(config.sweep_interval, Duration::from_secs(5));

        let policy = config.retention_policy();
        assert_eq!(policy.pending_ttl, Duration::from_secs(120));
        assert_eq!(policy.layer_retention, Some(Duration::from_secs(86400)));
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let config = config_from(&[("CONTAINERD_NAMESPACE", ""), ("LAYER_RETENTION_SECS", " ")])
            .unwrap();
        assert_eq!(config.namespace, "k8s.io");
        assert_eq!(config.layer_retention, None);
    }

    #[test]
    fn test_invalid_seconds() {
        let err = config_from(&[("SWEEP_INTERVAL_SECS", "1m")]).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidSeconds {
                var: "SWEEP_INTERVAL_SECS",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let err = config_from(&[("SWEEP_INTERVAL_SECS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            Error::Zero {
                var: "SWEEP_INTERVAL_SECS"
            }
        ));
    }

    #[test]
    fn test_zero_pending_ttl_rejected() {
        let err = config_from(&[("PENDING_PREPARATION_TTL_SECS", "0")]).unwrap_err();
        assert!(matches!(
            err,
            Error::Zero {
                var: "PENDING_PREPARATION_TTL_SECS"
            }
        ));
    }
}
