//! Configuration types for spawning a child on a PTY.
//!
//! This module provides [`PtyConfig`] for configuring the child launch and
//! [`WindowSize`] for PTY geometry.

use std::collections::HashMap;
use std::ffi::OsString;

/// Configuration for launching a child process on a PTY slave.
///
/// # Example
///
/// ```
/// use termrec_pty::PtyConfig;
///
/// let config = PtyConfig::builder()
///     .env("RECORDING", "true")
///     .window_size(80, 24)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Environment variables added on top of the inherited environment.
    pub env_add: HashMap<OsString, OsString>,

    /// Initial window size (columns, rows).
    pub window_size: (u16, u16),

    /// Whether to start the child in a new session (Unix setsid).
    pub new_session: bool,

    /// Whether the slave becomes the child's controlling terminal.
    /// Only honoured together with `new_session`.
    pub controlling_terminal: bool,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            env_add: HashMap::new(),
            window_size: (80, 24),
            new_session: true,
            controlling_terminal: true,
        }
    }
}

impl PtyConfig {
    /// Create a new builder for `PtyConfig`.
    #[must_use]
    pub fn builder() -> PtyConfigBuilder {
        PtyConfigBuilder::new()
    }

    /// Create a new `PtyConfig` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the effective environment for the child process: ours, with
    /// `env_add` layered on top.
    #[must_use]
    pub fn effective_env(&self) -> HashMap<OsString, OsString> {
        let mut env: HashMap<_, _> = std::env::vars_os().collect();
        env.extend(self.env_add.clone());
        env
    }
}

/// Builder for [`PtyConfig`].
#[derive(Debug, Clone, Default)]
pub struct PtyConfigBuilder {
    config: PtyConfig,
}

impl PtyConfigBuilder {
    /// Create a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.config.env_add.insert(key.into(), value.into());
        self
    }

    /// Set the initial window size.
    #[must_use]
    pub const fn window_size(mut self, cols: u16, rows: u16) -> Self {
        self.config.window_size = (cols, rows);
        self
    }

    /// Set whether to create a new session.
    #[must_use]
    pub const fn new_session(mut self, value: bool) -> Self {
        self.config.new_session = value;
        self
    }

    /// Set whether the slave becomes the controlling terminal.
    #[must_use]
    pub const fn controlling_terminal(mut self, value: bool) -> Self {
        self.config.controlling_terminal = value;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> PtyConfig {
        self.config
    }
}

/// Window size for the PTY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    /// Number of columns (characters per line).
    pub cols: u16,
    /// Number of rows (lines).
    pub rows: u16,
    /// Pixel width (optional, often 0).
    pub xpixel: u16,
    /// Pixel height (optional, often 0).
    pub ypixel: u16,
}

impl WindowSize {
    /// Create a new window size with the given dimensions.
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            xpixel: 0,
            ypixel: 0,
        }
    }

    /// Create a window size with pixel dimensions.
    #[must_use]
    pub const fn with_pixels(cols: u16, rows: u16, xpixel: u16, ypixel: u16) -> Self {
        Self {
            cols,
            rows,
            xpixel,
            ypixel,
        }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

impl From<(u16, u16)> for WindowSize {
    fn from((cols, rows): (u16, u16)) -> Self {
        Self::new(cols, rows)
    }
}

#[cfg(unix)]
impl From<rustix::termios::Winsize> for WindowSize {
    fn from(ws: rustix::termios::Winsize) -> Self {
        Self::with_pixels(ws.ws_col, ws.ws_row, ws.ws_xpixel, ws.ws_ypixel)
    }
}

#[cfg(unix)]
impl From<WindowSize> for rustix::termios::Winsize {
    fn from(size: WindowSize) -> Self {
        Self {
            ws_col: size.cols,
            ws_row: size.rows,
            ws_xpixel: size.xpixel,
            ws_ypixel: size.ypixel,
        }
    }
}
