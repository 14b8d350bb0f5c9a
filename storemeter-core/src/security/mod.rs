//! Credential protection: field ciphers and zeroizing credential containers.
//!
//! # Security Guarantees
//! - Registry credentials stay ciphertext until an invocation needs them
//! - Decrypted values are stored in `Zeroizing` containers and wiped on drop
//! - Neither key material nor plaintext secrets appear in `Debug` output
//!
//! # Module Structure
//! - `cipher`: AES-256-CTR (registry format) and AES-256-GCM field ciphers
//! - `credentials`: encrypted registry rows and decrypted connection secrets

pub mod cipher;
mod credentials;

pub use cipher::{CipherKey, FieldCipher, LegacyCipher, SealedCipher};
pub use credentials::{
    DecryptedCredentials, EncryptedCredentials, EncryptedMongoCredentials,
    EncryptedMySqlCredentials, MongoSecrets, MySqlSecrets,
};
