use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::logger::LoggerError;

/// Log output format, selected with `LOG_FORMAT`.
///
/// - `Text`: human-readable lines, colored when the terminal allows it.
/// - `Json`: one JSON object per event, for log collectors.
/// - `Journald`: events go to systemd-journald (Linux only).
///
/// Parsing is case-insensitive and accepts `plain` as an alias of `text` and
/// `journal` as an alias of `journald`. Serialization uses the canonical name.
///
/// # Examples
/// ```
/// use retro_observe::LoggerFormat;
///
/// let fmt: LoggerFormat = " JSON ".parse().unwrap();
/// assert_eq!(fmt, LoggerFormat::Json);
/// assert_eq!(fmt.to_string(), "json");
/// assert_eq!("plain".parse::<LoggerFormat>().unwrap(), LoggerFormat::Text);
/// assert!("xml".parse::<LoggerFormat>().is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoggerFormat {
    /// Human-readable lines (default).
    #[default]
    Text,
    /// One JSON object per event.
    Json,
    /// systemd-journald (Linux only).
    Journald,
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "journald" | "journal" => {
                if cfg!(target_os = "linux") {
                    Ok(Self::Journald)
                } else {
                    Err(LoggerError::JournaldNotSupported)
                }
            }
            _ => Err(LoggerError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LoggerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Journald => "journald",
        })
    }
}

impl Serialize for LoggerFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LoggerFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitive() {
        assert_eq!("JSON".parse::<LoggerFormat>().unwrap(), LoggerFormat::Json);
        assert_eq!(" text ".parse::<LoggerFormat>().unwrap(), LoggerFormat::Text);
        assert_eq!("plain".parse::<LoggerFormat>().unwrap(), LoggerFormat::Text);
    }

    #[test]
    fn rejects_unknown() {
        for bad in ["", "xml", "logfmt"] {
            assert!(bad.parse::<LoggerFormat>().is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn journald_on_linux() {
        let parsed: LoggerFormat = serde_json::from_str(r#""journald""#).unwrap();
        assert_eq!(parsed, LoggerFormat::Journald);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), r#""journald""#);
    }
}
