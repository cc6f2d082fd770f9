use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::logger::LoggerError;

/// Validated `EnvFilter` expression used as the log level setting.
///
/// The raw directive string is kept as written (for example `"info"` or
/// `"retro_core=debug,retro_exec=trace,info"`) so it can be echoed back in
/// diagnostics. Parsing and deserialization reject anything `EnvFilter`
/// would refuse, so a constructed value always yields a working filter.
///
/// # Examples
/// ```
/// use retro_observe::LoggerLevel;
///
/// let lvl: LoggerLevel = "retro_core=debug,info".parse().unwrap();
/// assert_eq!(lvl.as_str(), "retro_core=debug,info");
/// assert!("retro_core=loud".parse::<LoggerLevel>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoggerLevel(String);

impl LoggerLevel {
    /// Validate `s` as a filter expression.
    ///
    /// # Examples
    /// ```
    /// use retro_observe::LoggerLevel;
    ///
    /// let lvl = LoggerLevel::new("warn").unwrap();
    /// assert_eq!(lvl.as_str(), "warn");
    /// ```
    pub fn new(s: impl Into<String>) -> Result<Self, LoggerError> {
        Self::try_from(s.into())
    }

    /// The directive string exactly as configured.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the `EnvFilter` for the subscriber.
    ///
    /// The expression was validated on construction; `info` is only a fallback for the unreachable error arm.
    ///
    /// # Examples
    /// ```
    /// use retro_observe::LoggerLevel;
    ///
    /// let lvl: LoggerLevel = "retro_exec=trace,info".parse().unwrap();
    /// let _filter = lvl.to_env_filter();
    /// ```
    pub fn to_env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(self.as_str()).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.trim().to_owned())
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match EnvFilter::try_new(&s) {
            Ok(_) => Ok(Self(s)),
            Err(e) => Err(LoggerError::InvalidLevel(format!("{s}: {e}"))),
        }
    }
}

impl From<LoggerLevel> for String {
    fn from(l: LoggerLevel) -> Self {
        l.0
    }
}
