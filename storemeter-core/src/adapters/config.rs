//! Engine connection configuration.
//!
//! # Security
//! This struct intentionally does NOT store passwords or credentials; those
//! arrive per invocation as `DecryptedCredentials`.

use std::time::Duration;

/// Settings applied to every engine connection.
///
/// # Example
/// ```rust
/// use storemeter_core::adapters::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::default()
///     .with_connect_timeout(Duration::from_secs(5))
///     .with_max_connections(4);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Time allowed to establish a connection or select a server
    pub connect_timeout: Duration,
    /// Maximum connections opened per invocation
    pub max_connections: u32,
    /// Application name reported to the engine
    pub app_name: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            max_connections: 8,
            app_name: format!("storemeter-{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ConnectionConfig {
    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid or unsafe
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_connections == 0 {
            return Err(crate::error::StoreMeterError::configuration(
                "max_connections must be greater than 0",
            ));
        }

        if self.max_connections > 100 {
            return Err(crate::error::StoreMeterError::configuration(
                "max_connections should not exceed 100 for safety",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(crate::error::StoreMeterError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Builder method to set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builder method to set the per-invocation connection limit.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}
