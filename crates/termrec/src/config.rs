//! Environment-based configuration.
//!
//! Recording and playback are configured from the invoking environment:
//! `SHELL` picks the shell, the `RECORDING` marker detects nested sessions,
//! and `TERMREC_*` variables tune the pipelines.

use std::collections::HashMap;
use std::ffi::OsString;
use std::time::Duration;

use termrec_pty::PtyConfig;

/// Environment configuration prefix.
pub const DEFAULT_PREFIX: &str = "TERMREC";

/// Marker variable set in the recorded shell's environment.
pub const DEFAULT_MARKER: &str = "RECORDING";

/// Shell used when `SHELL` is unset or empty.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Frames the decoder may run ahead of playback.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// How long output still buffered in the PTY is drained after the shell exits.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

/// Check whether an environment value means "on".
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Environment variable reader.
///
/// Prefixed lookups (`get`, `parse`, ...) read `<PREFIX>_<NAME>`; `raw`
/// reads a variable verbatim. A fixed map can stand in for the process
/// environment.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Prefix for environment variables.
    prefix: String,
    /// Fixed variables used instead of the process environment.
    vars: Option<HashMap<String, String>>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl EnvConfig {
    /// Create a new environment config reader.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            vars: None,
        }
    }

    /// Create a reader over a fixed set of variables.
    #[must_use]
    pub fn from_vars<I, K, V>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Build the full environment variable name.
    fn var_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_uppercase()
        } else {
            format!("{}_{}", self.prefix, name.to_uppercase())
        }
    }

    /// Get an unprefixed variable.
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<String> {
        match &self.vars {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }

    /// Get a string value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.raw(&self.var_name(name))
    }

    /// Get a parsed value.
    #[must_use]
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| v.trim().parse().ok())
    }

    /// Get a boolean value.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).map(|v| is_truthy(&v))
    }

    /// Get a duration in milliseconds.
    #[must_use]
    pub fn duration_millis(&self, name: &str) -> Option<Duration> {
        self.parse::<u64>(name).map(Duration::from_millis)
    }
}

/// Settings for a recording run.
#[derive(Debug, Clone)]
pub struct RecordConfig {
    /// Shell to spawn on the PTY.
    pub shell: OsString,
    /// Marker variable exported to the shell.
    pub marker_var: String,
    /// Whether we are already running inside a recorded shell.
    pub inside_recording: bool,
    /// Drain window for output still buffered in the PTY after the shell exits.
    pub drain_timeout: Duration,
    /// Whether to capture and forward process signals to the shell.
    pub forward_signals: bool,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            shell: OsString::from(DEFAULT_SHELL),
            marker_var: DEFAULT_MARKER.to_string(),
            inside_recording: false,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            forward_signals: true,
        }
    }
}

impl RecordConfig {
    /// Read the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_config(&EnvConfig::default())
    }

    /// Read the configuration from `env`.
    #[must_use]
    pub fn from_env_config(env: &EnvConfig) -> Self {
        let defaults = Self::default();
        let shell = env
            .raw("SHELL")
            .filter(|s| !s.trim().is_empty())
            .map_or(defaults.shell, OsString::from);
        let inside_recording = env
            .raw(&defaults.marker_var)
            .is_some_and(|v| is_truthy(&v));

        Self {
            shell,
            inside_recording,
            drain_timeout: env
                .duration_millis("DRAIN_MS")
                .unwrap_or(defaults.drain_timeout),
            ..defaults
        }
    }

    /// Set the shell.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<OsString>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Mark whether we are already inside a recording.
    #[must_use]
    pub const fn with_inside_recording(mut self, inside: bool) -> Self {
        self.inside_recording = inside;
        self
    }

    /// Set the post-exit drain window.
    #[must_use]
    pub const fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Enable or disable signal forwarding.
    #[must_use]
    pub const fn with_forward_signals(mut self, forward: bool) -> Self {
        self.forward_signals = forward;
        self
    }

    /// Launch configuration for the recorded shell.
    ///
    /// The shell inherits our environment plus the recording marker, and
    /// runs in its own session with the PTY slave as controlling terminal.
    #[must_use]
    pub fn child_config(&self) -> PtyConfig {
        PtyConfig::builder()
            .env(self.marker_var.as_str(), "true")
            .new_session(true)
            .controlling_terminal(true)
            .build()
    }
}

/// Settings for a playback run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Capacity of the queue between the decode and writer stages.
    pub queue_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl PlaybackConfig {
    /// Read the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_config(&EnvConfig::default())
    }

    /// Read the configuration from `env`.
    #[must_use]
    pub fn from_env_config(env: &EnvConfig) -> Self {
        let queue_capacity = env
            .parse::<usize>("QUEUE")
            .unwrap_or(DEFAULT_QUEUE_CAPACITY)
            .max(1);
        Self { queue_capacity }
    }

    /// Set the queue capacity (at least 1).
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values() {
        for v in ["1", "true", "TRUE", "yes", "On", " true "] {
            assert!(is_truthy(v), "{v} should be truthy");
        }
        for v in ["", "0", "false", "no", "off", "maybe"] {
            assert!(!is_truthy(v), "{v} should not be truthy");
        }
    }

    #[test]
    fn env_config_prefix() {
        let env = EnvConfig::from_vars("TERMREC", [("TERMREC_QUEUE", "8"), ("QUEUE", "99")]);
        assert_eq!(env.parse::<usize>("queue"), Some(8));
        assert_eq!(env.raw("QUEUE").as_deref(), Some("99"));
        assert_eq!(env.get("missing"), None);
    }

    #[test]
    fn env_config_bool_and_duration() {
        let env = EnvConfig::from_vars("X", [("X_FLAG", "yes"), ("X_WAIT", "1500")]);
        assert_eq!(env.bool("flag"), Some(true));
        assert_eq!(env.duration_millis("wait"), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn record_config_from_env() {
        let env = EnvConfig::from_vars(
            DEFAULT_PREFIX,
            [
                ("SHELL", "/bin/zsh"),
                ("RECORDING", "true"),
                ("TERMREC_DRAIN_MS", "10"),
            ],
        );
        let config = RecordConfig::from_env_config(&env);
        assert_eq!(config.shell, OsString::from("/bin/zsh"));
        assert!(config.inside_recording);
        assert_eq!(config.drain_timeout, Duration::from_millis(10));
    }

    #[test]
    fn record_config_defaults_when_unset() {
        let env = EnvConfig::from_vars(DEFAULT_PREFIX, [("SHELL", "  ")]);
        let config = RecordConfig::from_env_config(&env);
        assert_eq!(config.shell, OsString::from(DEFAULT_SHELL));
        assert!(!config.inside_recording);
        assert_eq!(config.drain_timeout, DEFAULT_DRAIN_TIMEOUT);
        assert!(config.forward_signals);
    }

    #[test]
    fn marker_false_is_not_nested() {
        let env = EnvConfig::from_vars(DEFAULT_PREFIX, [("RECORDING", "false")]);
        assert!(!RecordConfig::from_env_config(&env).inside_recording);
    }

    #[test]
    fn child_config_carries_marker() {
        let config = RecordConfig::default().child_config();
        assert_eq!(
            config.env_add.get(&OsString::from(DEFAULT_MARKER)),
            Some(&OsString::from("true"))
        );
        assert!(config.new_session);
        assert!(config.controlling_terminal);
    }

    #[test]
    fn playback_capacity_has_floor() {
        let env = EnvConfig::from_vars(DEFAULT_PREFIX, [("TERMREC_QUEUE", "0")]);
        assert_eq!(PlaybackConfig::from_env_config(&env).queue_capacity, 1);
        assert_eq!(
            PlaybackConfig::default().with_queue_capacity(0).queue_capacity,
            1
        );
        assert_eq!(PlaybackConfig::default().queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }
}
