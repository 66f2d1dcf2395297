//! Session configuration for connecting to a graph runner.

use std::time::Duration;

/// Configuration for a runner session.
///
/// Defaults match the editor's conventions: runner at `127.0.0.1:7237`,
/// 3 second connect timeout, status history capped at 100 entries, and a
/// 500 ms settle delay between pushing an update and unpausing during a
/// test run. The environment (optionally via a `.env` file) can override
/// the endpoint and the local runner command.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub history_capacity: usize,
    pub unpause_delay: Duration,
    /// Command line used to spawn a local runner in slave mode, split on
    /// whitespace. `None` means only remote attachment is possible.
    pub runner_command: Option<String>,
}

impl SessionConfig {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 7237;
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
    pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
    pub const DEFAULT_UNPAUSE_DELAY: Duration = Duration::from_millis(500);

    /// Build a config from defaults plus environment overrides
    /// (`PATCHBAY_RUNNER_HOST`, `PATCHBAY_RUNNER_PORT`, `PATCHBAY_RUNNER_CMD`).
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Ok(host) = std::env::var("PATCHBAY_RUNNER_HOST") {
            config.host = host;
        }
        if let Some(port) = std::env::var("PATCHBAY_RUNNER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            config.port = port;
        }
        if let Ok(cmd) = std::env::var("PATCHBAY_RUNNER_CMD") {
            config.runner_command = Some(cmd);
        }
        config
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_runner_command(mut self, command: impl Into<String>) -> Self {
        self.runner_command = Some(command.into());
        self
    }

    /// Socket address string for the configured endpoint.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            history_capacity: Self::DEFAULT_HISTORY_CAPACITY,
            unpause_delay: Self::DEFAULT_UNPAUSE_DELAY,
            runner_command: None,
        }
    }
}
