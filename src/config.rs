//! Caller-facing configuration: `Meta`, `Props`, and `RuntimeConfig`.
//!
//! Mirrors `airssys-rt`'s `SystemConfig`/`SystemConfigBuilder` shape: plain
//! data with `Default`, plus a fluent builder for the pieces callers are
//! expected to customize.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-supplied record carried with an actor; opaque to the core,
/// passed into every `Behavior` callback via the context.
///
/// `kvs` is `serde_json::Value`-valued rather than `String`-valued (§10.7):
/// the original implementation this runtime is grounded on round-trips
/// arbitrary JSON-serializable configuration through the same property bag.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Meta {
    /// Caller-assigned identifier for the owning server/session, if any.
    pub server_id: Option<String>,
    /// Free-form properties, opaque to the core.
    pub kvs: HashMap<String, Value>,
}

impl Meta {
    /// Create an empty `Meta`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use warden_rt::Meta;
    ///
    /// let meta = Meta::new().with_server_id("srv-1").with_kv("region", "eu");
    /// assert_eq!(meta.server_id.as_deref(), Some("srv-1"));
    /// assert_eq!(meta.kvs.get("region").unwrap(), "eu");
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server id.
    pub fn with_server_id(mut self, id: impl Into<String>) -> Self {
        self.server_id = Some(id.into());
        self
    }

    /// Insert a free-form key/value pair.
    pub fn with_kv(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kvs.insert(key.into(), value.into());
        self
    }
}

/// Default alive timeout: 30 minutes of inactivity before idle reclamation.
pub const DEFAULT_ALIVE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default interval between alive checks once an alive timeout is armed.
pub const DEFAULT_ALIVE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Default timeout for `Handle::request`.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Ceiling for `StartActor`/`StopActor` supervisor round-trips (§5).
pub const START_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval used between failed graceful-shutdown attempts (§4.G).
pub const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Per-actor configuration passed to `Runtime::get_or_start`.
///
/// Recognized options per §6.3: `meta`, `alive_timeout`, `kvs`.
#[derive(Debug, Clone, Default)]
pub struct Props {
    /// Opaque metadata, forwarded into the `Behavior`'s context.
    pub meta: Option<Meta>,
    /// Idle-reclamation timeout. `None` or `<= 0` means "use the default".
    pub alive_timeout: Option<Duration>,
    /// Free-form properties, duplicated from `meta.kvs` for convenience
    /// when no full `Meta` is needed.
    pub kvs: HashMap<String, Value>,
}

impl Props {
    /// Start building a `Props` value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use warden_rt::Props;
    ///
    /// let props = Props::builder()
    ///     .alive_timeout(Duration::from_secs(60))
    ///     .kv("level", "intro")
    ///     .build();
    /// assert_eq!(props.alive_timeout, Some(Duration::from_secs(60)));
    /// ```
    pub fn builder() -> PropsBuilder {
        PropsBuilder::default()
    }

    /// Resolve the effective alive timeout, applying the "`<= 0` means
    /// default" boundary rule from §8.
    pub fn effective_alive_timeout(&self) -> Duration {
        match self.alive_timeout {
            Some(d) if !d.is_zero() => d,
            _ => DEFAULT_ALIVE_TIMEOUT,
        }
    }
}

/// Fluent builder for [`Props`].
#[derive(Debug, Default)]
pub struct PropsBuilder {
    props: Props,
}

impl PropsBuilder {
    /// Attach metadata.
    pub fn meta(mut self, meta: Meta) -> Self {
        self.props.meta = Some(meta);
        self
    }

    /// Set the idle-reclamation timeout.
    pub fn alive_timeout(mut self, timeout: Duration) -> Self {
        self.props.alive_timeout = Some(timeout);
        self
    }

    /// Insert a free-form key/value pair.
    pub fn kv(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.kvs.insert(key.into(), value.into());
        self
    }

    /// Finish building.
    pub fn build(self) -> Props {
        self.props
    }
}

/// Runtime-wide knobs the distilled specification leaves as named
/// constants (§10.5). Overridable so tests do not have to wait out
/// production-sized durations.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Default `Handle::request` timeout when the caller does not specify one.
    pub default_request_timeout: Duration,
    /// Ceiling for `StartActor`/`StopActor` supervisor round-trips.
    pub start_stop_timeout: Duration,
    /// Default alive-check interval once an alive timeout is armed.
    pub default_alive_check_interval: Duration,
    /// Poll interval between failed graceful-shutdown attempts.
    pub shutdown_poll_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_request_timeout: DEFAULT_REQUEST_TIMEOUT,
            start_stop_timeout: START_STOP_TIMEOUT,
            default_alive_check_interval: DEFAULT_ALIVE_CHECK_INTERVAL,
            shutdown_poll_interval: SHUTDOWN_POLL_INTERVAL,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn meta_builder_round_trip() {
        let meta = Meta::new().with_server_id("srv-1").with_kv("region", "eu");
        assert_eq!(meta.server_id.as_deref(), Some("srv-1"));
        assert_eq!(meta.kvs.get("region").unwrap(), "eu");
    }

    #[test]
    fn props_default_alive_timeout_is_none() {
        let props = Props::default();
        assert!(props.alive_timeout.is_none());
        assert_eq!(props.effective_alive_timeout(), DEFAULT_ALIVE_TIMEOUT);
    }

    #[test]
    fn props_zero_alive_timeout_falls_back_to_default() {
        let props = Props::builder().alive_timeout(Duration::ZERO).build();
        assert_eq!(props.effective_alive_timeout(), DEFAULT_ALIVE_TIMEOUT);
    }

    #[test]
    fn props_explicit_alive_timeout_is_honored() {
        let props = Props::builder()
            .alive_timeout(Duration::from_secs(90))
            .build();
        assert_eq!(props.effective_alive_timeout(), Duration::from_secs(90));
    }

    #[test]
    fn props_builder_kv() {
        let props = Props::builder().kv("a", 1).build();
        assert_eq!(props.kvs.get("a").unwrap(), 1);
    }

    #[test]
    fn runtime_config_defaults() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.default_request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(cfg.start_stop_timeout, START_STOP_TIMEOUT);
    }
}
