//! Typed accessors over a string key lookup.
use std::str::FromStr;

use super::error::{ConfigError, ConfigResult};

pub struct Lookup<F> {
    get: F,
}

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn new(get: F) -> Self {
        Self { get }
    }

    /// Value of `key`, with blank values treated as unset.
    pub fn optional(&self, key: &str) -> Option<String> {
        (self.get)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn required(&self, key: &'static str) -> ConfigResult<String> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    pub fn parse_or<T>(&self, key: &'static str, default: T) -> ConfigResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Positive integer, `0` is rejected.
    pub fn positive_or(&self, key: &'static str, default: u64) -> ConfigResult<u64> {
        let v = self.parse_or(key, default)?;
        if v == 0 {
            return Err(ConfigError::Invalid {
                key,
                value: v.to_string(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(v)
    }

    /// Positive integer no greater than `max`.
    pub fn bounded_or(&self, key: &'static str, default: u64, max: u64) -> ConfigResult<u64> {
        let v = self.positive_or(key, default)?;
        if v > max {
            return Err(ConfigError::Invalid {
                key,
                value: v.to_string(),
                reason: format!("must not exceed {max}"),
            });
        }
        Ok(v)
    }

    /// `1`, `true` and `yes` (any case) enable the flag; anything else disables it.
    pub fn flag(&self, key: &str) -> bool {
        self.optional(key)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }
}
