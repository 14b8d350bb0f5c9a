//! Encrypted credential records and their decrypted, zeroizing counterparts.
//!
//! Registry rows arrive as [`EncryptedCredentials`]: every field is ciphertext.
//! [`EncryptedCredentials::decrypt`] turns them into [`DecryptedCredentials`],
//! whose values live in `Zeroizing` containers and are wiped when the
//! invocation drops them. Neither type prints secret values in `Debug`.

use zeroize::Zeroizing;

use super::cipher::FieldCipher;
use crate::Result;
use crate::error::StoreMeterError;
use crate::models::EngineType;

/// MySQL credential row, every field encrypted.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedMySqlCredentials {
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub database_name: String,
}

/// MongoDB credential row, every field encrypted.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedMongoCredentials {
    pub uri: String,
    pub database_name: String,
}

impl std::fmt::Debug for EncryptedMySqlCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedMySqlCredentials").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for EncryptedMongoCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedMongoCredentials").finish_non_exhaustive()
    }
}

/// Engine-specific credential record as stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptedCredentials {
    MySql(EncryptedMySqlCredentials),
    MongoDb(EncryptedMongoCredentials),
}

impl EncryptedCredentials {
    /// Decrypts every field through `cipher`.
    ///
    /// # Errors
    /// Returns `Decryption` naming the first field that failed. Field values
    /// are never included in the error.
    pub fn decrypt(&self, cipher: &dyn FieldCipher) -> Result<DecryptedCredentials> {
        match self {
            Self::MySql(row) => {
                let port = decrypt_field(cipher, "port", &row.port)?;
                let port = port.trim().parse::<u16>().map_err(|_| {
                    StoreMeterError::decryption("field 'port' did not decrypt to a port number")
                })?;
                Ok(DecryptedCredentials::MySql(MySqlSecrets {
                    host: decrypt_field(cipher, "host", &row.host)?,
                    port,
                    username: decrypt_field(cipher, "username", &row.username)?,
                    password: decrypt_field(cipher, "password", &row.password)?,
                    database_name: decrypt_field(cipher, "databaseName", &row.database_name)?,
                }))
            }
            Self::MongoDb(row) => Ok(DecryptedCredentials::MongoDb(MongoSecrets {
                uri: decrypt_field(cipher, "uri", &row.uri)?,
                database_name: decrypt_field(cipher, "databaseName", &row.database_name)?,
            })),
        }
    }
}

fn decrypt_field(
    cipher: &dyn FieldCipher,
    field: &str,
    ciphertext: &str,
) -> Result<Zeroizing<String>> {
    cipher.decrypt(ciphertext).map_err(|e| match e {
        StoreMeterError::Decryption { context } => {
            StoreMeterError::decryption(format!("field '{}': {}", field, context))
        }
        other => other,
    })
}

/// Decrypted MySQL connection parameters.
#[derive(Clone)]
pub struct MySqlSecrets {
    pub host: Zeroizing<String>,
    pub port: u16,
    pub username: Zeroizing<String>,
    pub password: Zeroizing<String>,
    pub database_name: Zeroizing<String>,
}

impl std::fmt::Debug for MySqlSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlSecrets")
            .field("host", &self.host.as_str())
            .field("port", &self.port)
            .field("database_name", &self.database_name.as_str())
            .finish_non_exhaustive()
    }
}

/// Decrypted MongoDB connection parameters.
#[derive(Clone)]
pub struct MongoSecrets {
    pub uri: Zeroizing<String>,
    pub database_name: Zeroizing<String>,
}

impl std::fmt::Debug for MongoSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoSecrets")
            .field("uri", &crate::error::redact_database_url(&self.uri))
            .field("database_name", &self.database_name.as_str())
            .finish()
    }
}

/// Plaintext credentials, held only for the duration of one invocation.
#[derive(Debug, Clone)]
pub enum DecryptedCredentials {
    MySql(MySqlSecrets),
    MongoDb(MongoSecrets),
}

impl DecryptedCredentials {
    pub fn engine_type(&self) -> EngineType {
        match self {
            Self::MySql(_) => EngineType::Relational,
            Self::MongoDb(_) => EngineType::Document,
        }
    }

    /// Database that holds the data stores to measure.
    pub fn database_name(&self) -> &str {
        match self {
            Self::MySql(secrets) => secrets.database_name.as_str(),
            Self::MongoDb(secrets) => secrets.database_name.as_str(),
        }
    }
}
