//! Settings of the daemon itself; the control loop reads `OrchestratorConfig`.
use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    path::PathBuf,
    time::Duration,
};

use retro_core::{Lookup, MAX_WAIT_SECS, config::ConfigResult};

/// Seconds between two scheduled runs.
pub const DEFAULT_SCHEDULE_INTERVAL_SECS: u64 = 86_400;
pub const DEFAULT_API_LISTEN: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 8080));
pub const DEFAULT_REGISTRY_MANIFEST: &str = "model-registry.json";

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub schedule_interval: Duration,
    pub api_listen: SocketAddr,
    /// Trainer command line; only the `retrain` command needs it.
    pub train_command: Option<String>,
    pub registry_manifest: PathBuf,
}

impl AgentConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup::new(get);
        Ok(Self {
            schedule_interval: Duration::from_secs(
                env.bounded_or("SCHEDULE_INTERVAL", DEFAULT_SCHEDULE_INTERVAL_SECS, MAX_WAIT_SECS)?,
            ),
            api_listen: env.parse_or("API_LISTEN", DEFAULT_API_LISTEN)?,
            train_command: env.optional("TRAIN_COMMAND"),
            registry_manifest: env
                .optional("REGISTRY_MANIFEST")
                .unwrap_or_else(|| DEFAULT_REGISTRY_MANIFEST.to_string())
                .into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retro_core::ConfigError;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> ConfigResult<AgentConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AgentConfig::from_lookup(move |k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.schedule_interval, Duration::from_secs(86_400));
        assert_eq!(cfg.api_listen.to_string(), "0.0.0.0:8080");
        assert!(cfg.train_command.is_none());
        assert_eq!(cfg.registry_manifest, PathBuf::from(DEFAULT_REGISTRY_MANIFEST));
    }

    #[test]
    fn overrides() {
        let cfg = load(&[
            ("SCHEDULE_INTERVAL", "3600"),
            ("API_LISTEN", "127.0.0.1:9000"),
            ("TRAIN_COMMAND", "python -m train"),
            ("REGISTRY_MANIFEST", "/var/lib/retro/registry.json"),
        ])
        .unwrap();
        assert_eq!(cfg.schedule_interval, Duration::from_secs(3600));
        assert_eq!(cfg.api_listen.port(), 9000);
        assert_eq!(cfg.train_command.as_deref(), Some("python -m train"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            load(&[("SCHEDULE_INTERVAL", "0")]),
            Err(ConfigError::Invalid { key: "SCHEDULE_INTERVAL", .. })
        ));
        assert!(matches!(
            load(&[("SCHEDULE_INTERVAL", "18446744073709551615")]),
            Err(ConfigError::Invalid { key: "SCHEDULE_INTERVAL", .. })
        ));
        assert!(matches!(
            load(&[("API_LISTEN", "localhost")]),
            Err(ConfigError::Invalid { key: "API_LISTEN", .. })
        ));
    }
}
