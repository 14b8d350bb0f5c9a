//! MySQL connection pool creation.
//!
//! # Security Features
//! - Connect options are built field by field from decrypted secrets
//! - Sessions are switched to read-only on connect
//! - Pool size and acquire timeout come from [`ConnectionConfig`]

use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};

use super::MySqlConnection;
use crate::Result;
use crate::adapters::ConnectionConfig;
use crate::security::MySqlSecrets;

impl MySqlConnection {
    /// Opens a lazily connected pool for the resource described by `secrets`.
    ///
    /// No network traffic happens here; the first round trip is the
    /// reachability probe in `verify_reachable`.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` is invalid.
    #[allow(clippy::unused_async)]
    pub async fn connect(secrets: &MySqlSecrets, config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let options = connect_options(secrets);
        let target = format!(
            "{}:{}/{}",
            secrets.host.as_str(),
            secrets.port,
            secrets.database_name.as_str()
        );

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(0)
            .acquire_timeout(config.connect_timeout)
            .test_before_acquire(true)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    use sqlx::Executor;
                    conn.execute("SET SESSION TRANSACTION READ ONLY").await?;
                    Ok(())
                })
            })
            .connect_lazy_with(options);

        tracing::debug!(
            target_db = %target,
            max_connections = config.max_connections,
            "Created MySQL connection pool"
        );

        Ok(Self { pool, target })
    }
}

/// Builds connect options from decrypted secrets.
pub(crate) fn connect_options(secrets: &MySqlSecrets) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(secrets.host.as_str())
        .port(secrets.port)
        .username(secrets.username.as_str())
        .password(secrets.password.as_str())
        .database(secrets.database_name.as_str())
}
