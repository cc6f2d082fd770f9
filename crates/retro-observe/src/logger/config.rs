use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::logger::{LoggerError, LoggerFormat, LoggerLevel};

/// Environment variable selecting [`LoggerFormat`].
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
/// Environment variable holding the [`LoggerLevel`] filter expression.
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
/// Environment variable disabling ANSI colors when set to `0`/`false`/`no`.
pub const ENV_LOG_COLOR: &str = "LOG_COLOR";

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: LoggerLevel,
    /// Include module targets in each line.
    pub with_targets: bool,
    /// Colored text output; still disabled when stdout is not a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Read `LOG_FORMAT`, `LOG_LEVEL` and `LOG_COLOR` from the process environment.
    pub fn from_env() -> Result<Self, LoggerError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`LoggerConfig::from_env`] with an injectable variable source.
    /// Unset or blank variables keep their defaults.
    pub fn from_vars<F>(get: F) -> Result<Self, LoggerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();
        if let Some(raw) = var(ENV_LOG_FORMAT) {
            cfg.format = raw.parse()?;
        }
        if let Some(raw) = var(ENV_LOG_LEVEL) {
            cfg.level = raw.parse()?;
        }
        if let Some(raw) = var(ENV_LOG_COLOR) {
            cfg.use_color = !matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }
        Ok(cfg)
    }

    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = LoggerConfig::from_vars(vars(&[(ENV_LOG_LEVEL, "  ")])).unwrap();
        assert_eq!(cfg.format, LoggerFormat::Text);
        assert_eq!(cfg.level.as_str(), "info");
        assert!(cfg.use_color);
    }

    #[test]
    fn reads_format_level_and_color() {
        let cfg = LoggerConfig::from_vars(vars(&[
            (ENV_LOG_FORMAT, "json"),
            (ENV_LOG_LEVEL, "retro_core=debug,info"),
            (ENV_LOG_COLOR, "false"),
        ]))
        .unwrap();
        assert_eq!(cfg.format, LoggerFormat::Json);
        assert_eq!(cfg.level.as_str(), "retro_core=debug,info");
        assert!(!cfg.use_color);
        assert!(!cfg.should_use_color());
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(
            LoggerConfig::from_vars(vars(&[(ENV_LOG_FORMAT, "xml")])),
            Err(LoggerError::InvalidFormat(_))
        ));
        assert!(matches!(
            LoggerConfig::from_vars(vars(&[(ENV_LOG_LEVEL, "core=chatty")])),
            Err(LoggerError::InvalidLevel(_))
        ));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: LoggerConfig = serde_json::from_str(r#"{"level":"debug"}"#).unwrap();
        assert_eq!(cfg.level.as_str(), "debug");
        assert_eq!(cfg.format, LoggerFormat::Text);
        assert!(cfg.with_targets);
    }
}
