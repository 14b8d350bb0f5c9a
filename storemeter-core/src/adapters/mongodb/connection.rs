//! MongoDB client creation.

use mongodb::Client;
use mongodb::options::{ClientOptions, ServerApi, ServerApiVersion};

use super::MongoConnection;
use crate::Result;
use crate::adapters::ConnectionConfig;
use crate::error::{StoreMeterError, redact_database_url};
use crate::security::MongoSecrets;

impl MongoConnection {
    /// Creates a client for the deployment named by `secrets.uri`.
    ///
    /// The driver connects in the background; reachability is confirmed by
    /// `verify_reachable`.
    ///
    /// # Errors
    /// Returns `Connection` if the URI cannot be parsed or the client cannot
    /// be built, `Configuration` if `config` is invalid.
    pub async fn connect(secrets: &MongoSecrets, config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let target = redact_database_url(&secrets.uri);
        let client_options = client_options(&secrets.uri, config).await.map_err(|e| {
            StoreMeterError::connection_failed(
                format!("Invalid MongoDB connection string for {}", target),
                e,
            )
        })?;

        let client = Client::with_options(client_options).map_err(|e| {
            StoreMeterError::connection_failed(
                format!("Failed to create MongoDB client for {}", target),
                e,
            )
        })?;

        tracing::debug!(target_db = %target, "Created MongoDB client");
        Ok(Self { client, target })
    }
}

/// Parses `uri` and applies the timeouts and limits of `config`.
///
/// The Stable API is pinned to version 1.
pub(crate) async fn client_options(
    uri: &str,
    config: &ConnectionConfig,
) -> std::result::Result<ClientOptions, mongodb::error::Error> {
    let mut options = ClientOptions::parse(uri).await?;
    options.connect_timeout = Some(config.connect_timeout);
    options.server_selection_timeout = Some(config.connect_timeout);
    options.max_pool_size = Some(config.max_connections);
    options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
    if options.app_name.is_none() {
        options.app_name = Some(config.app_name.clone());
    }
    Ok(options)
}
