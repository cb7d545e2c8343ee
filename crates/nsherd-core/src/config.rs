//! Configuration for the nsherd system
//!
//! Configuration values are resolved through a precedence-ordered chain of
//! sources: the first source that knows a key wins. The daemon typically
//! layers environment variables over built-in defaults, so
//! `NSHERD_UPDATE_INTERVAL=60` overrides the default poll cadence without
//! any further wiring.
//!
//! The core consumes a small, typed [`Settings`] snapshot produced from the
//! resolver at startup. Missing *required* keys are a startup-time fatal
//! error; missing optional keys mean "feature disabled", never an error.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default record TTL in seconds
pub const DEFAULT_TTL: u64 = 10;

/// Default reconciliation poll interval in seconds
pub const DEFAULT_UPDATE_INTERVAL: u64 = 10;

/// Default per-call timeout for provider operations in seconds
pub const DEFAULT_CALL_TIMEOUT: u64 = 10;

/// A single configuration source in the resolution chain
pub trait ConfigSource: Send + Sync {
    /// Resolve a key (e.g. `"update_interval"`) to a raw string value.
    ///
    /// Returns `None` if this source does not know the key.
    fn resolve(&self, key: &str) -> Option<String>;
}

/// Configuration source backed by process environment variables
///
/// A key is translated by upper-casing it, replacing `:` separators with
/// `_`, and prepending the prefix: with prefix `NSHERD`, the key
/// `update_interval` resolves against `NSHERD_UPDATE_INTERVAL`.
pub struct EnvSource {
    prefix: String,
}

impl EnvSource {
    /// Create an environment source with the given variable prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn variable(&self, key: &str) -> String {
        format!("{}_{}", self.prefix, key.replace(':', "_")).to_uppercase()
    }
}

impl ConfigSource for EnvSource {
    fn resolve(&self, key: &str) -> Option<String> {
        std::env::var(self.variable(key)).ok()
    }
}

/// Configuration source backed by an in-memory map
///
/// Used for built-in defaults and for values discovered at runtime.
pub struct MapSource {
    values: HashMap<String, String>,
}

impl MapSource {
    /// Create a map source from key/value pairs
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

impl<const N: usize> From<[(&str, &str); N]> for MapSource {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl ConfigSource for MapSource {
    fn resolve(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Precedence-ordered configuration resolver
///
/// Sources are consulted in registration order; the first source that
/// resolves a key wins. Register the highest-priority source first.
#[derive(Default)]
pub struct ConfigResolver {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source with the lowest priority so far
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Append an environment-variable source with the given prefix
    pub fn with_env(self, prefix: impl Into<String>) -> Self {
        self.with_source(EnvSource::new(prefix))
    }

    /// Append an in-memory map source
    pub fn with_map(self, source: MapSource) -> Self {
        self.with_source(source)
    }

    /// Resolve a key against the source chain
    pub fn resolve(&self, key: &str) -> Option<String> {
        self.sources.iter().find_map(|source| source.resolve(key))
    }

    /// Resolve a key as an unsigned integer
    ///
    /// An unset key is `Ok(None)`; a set-but-unparsable value is a
    /// configuration error.
    pub fn resolve_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.resolve(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| Error::config(format!("invalid value for {key}: {raw:?}"))),
        }
    }
}

/// Typed settings consumed by the reconciliation engine
#[derive(Debug, Clone)]
pub struct Settings {
    /// Default TTL in seconds for newly created records
    pub default_ttl: u64,

    /// Poll interval in seconds between reconciliation cycles
    pub update_interval: u64,

    /// Timeout in seconds for a single provider call
    pub call_timeout_secs: u64,
}

impl Settings {
    /// Build settings from a configuration resolver
    ///
    /// `update_interval` is required: a chain that cannot produce it (e.g.
    /// defaults were not layered in) is a fatal startup condition.
    pub fn from_resolver(resolver: &ConfigResolver) -> Result<Self> {
        let update_interval = resolver
            .resolve_u64("update_interval")?
            .ok_or_else(|| Error::config("update_interval is required"))?;
        if update_interval == 0 {
            return Err(Error::config("update_interval must be greater than zero"));
        }

        Ok(Self {
            default_ttl: resolver.resolve_u64("ttl")?.unwrap_or(DEFAULT_TTL),
            update_interval,
            call_timeout_secs: resolver
                .resolve_u64("call_timeout")?
                .unwrap_or(DEFAULT_CALL_TIMEOUT),
        })
    }

    /// Poll interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval)
    }

    /// Provider call timeout as a [`Duration`]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Built-in defaults, layered below any caller-provided sources
pub fn default_map() -> MapSource {
    MapSource::from([("ttl", "10"), ("update_interval", "10")])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_source_wins() {
        let resolver = ConfigResolver::new()
            .with_map(MapSource::from([("ttl", "30")]))
            .with_map(default_map());

        assert_eq!(resolver.resolve("ttl"), Some("30".to_string()));
        assert_eq!(resolver.resolve("update_interval"), Some("10".to_string()));
        assert_eq!(resolver.resolve("missing"), None);
    }

    #[test]
    fn settings_from_defaults() {
        let resolver = ConfigResolver::new().with_map(default_map());
        let settings = Settings::from_resolver(&resolver).unwrap();

        assert_eq!(settings.default_ttl, 10);
        assert_eq!(settings.update_interval, 10);
        assert_eq!(settings.call_timeout_secs, DEFAULT_CALL_TIMEOUT);
    }

    #[test]
    fn missing_update_interval_is_fatal() {
        let resolver = ConfigResolver::new().with_map(MapSource::from([("ttl", "10")]));
        let err = Settings::from_resolver(&resolver).unwrap_err();

        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn unparsable_value_is_a_config_error() {
        let resolver = ConfigResolver::new()
            .with_map(MapSource::from([("ttl", "ten"), ("update_interval", "10")]));

        assert!(Settings::from_resolver(&resolver).is_err());
    }

    #[test]
    fn env_source_key_translation() {
        let source = EnvSource::new("NSHERD");

        assert_eq!(source.variable("update_interval"), "NSHERD_UPDATE_INTERVAL");
        assert_eq!(source.variable("docker:url"), "NSHERD_DOCKER_URL");
    }
}
