//! Command-line interface.
//!
//! Every runtime setting can come from a flag or its environment variable.
//! Secret values (registry URL, cipher key and IV) are never echoed in help
//! output.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use storemeter_core::publisher::DEFAULT_TOPIC;
use storemeter_core::{
    CipherKey, ConnectionConfig, FieldCipher, LegacyCipher, PipelineConfig, SealedCipher,
};

#[derive(Debug, Parser)]
#[command(name = "storemeter-worker")]
#[command(about = "Collects record counts and storage volumes of registered data stores")]
#[command(version)]
#[command(long_about = "
StoreMeter worker - data-store volume metadata collector

Reads poll events, one JSON object per line, from stdin or --input:

  {\"dataSourceId\": 42, \"type\": \"mongoDb\", \"dataStores\": [{\"id\": 7, \"name\": \"users\"}]}

For each event it resolves the resource's encrypted credentials from the
registry, connects to the engine, measures every listed table or collection
and writes one JSON measurement per line to stdout.

SECURITY FEATURES:
- Registry credentials are decrypted in memory only
- Read-only engine operations only
- Connection strings are redacted in all logs

EXAMPLES:
  storemeter-worker --input polls.jsonl
  storemeter-worker encrypt 'db.internal'
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(flatten)]
    pub cipher: CipherArgs,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process poll events (default)
    Run,
    /// Encrypt a value for storage in the credential registry
    Encrypt {
        /// Plaintext value
        plaintext: String,
    },
    /// Decrypt a registry value
    Decrypt {
        /// Base64 ciphertext
        ciphertext: String,
    },
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all logs except errors")]
    pub quiet: bool,

    /// Emit logs as JSON
    #[arg(long, global = true, help = "Emit one JSON object per log event")]
    pub log_json: bool,
}

/// Credential cipher scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CipherScheme {
    /// AES-256-CTR with a shared key and IV (registry format)
    LegacyCtr,
    /// AES-256-GCM with a random nonce per value
    AesGcm,
}

#[derive(Debug, Args)]
pub struct CipherArgs {
    /// Base64 AES-256 key
    #[arg(
        long,
        global = true,
        env = "STOREMETER_CIPHER_KEY",
        hide_env_values = true,
        help = "Base64 AES-256 key for registry credentials"
    )]
    pub cipher_key: Option<String>,

    /// Base64 CTR initialization vector
    #[arg(
        long,
        global = true,
        env = "STOREMETER_CIPHER_IV",
        hide_env_values = true,
        help = "Base64 16-byte IV (legacy-ctr scheme only)"
    )]
    pub cipher_iv: Option<String>,

    /// Cipher scheme
    #[arg(
        long,
        global = true,
        env = "STOREMETER_CIPHER_SCHEME",
        value_enum,
        default_value = "legacy-ctr"
    )]
    pub cipher_scheme: CipherScheme,
}

impl CipherArgs {
    /// Builds the configured field cipher.
    ///
    /// # Errors
    /// Returns an error if key material is missing or malformed.
    pub fn build(&self) -> anyhow::Result<Box<dyn FieldCipher>> {
        let key = self.cipher_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!("--cipher-key (or STOREMETER_CIPHER_KEY) is required")
        })?;

        match self.cipher_scheme {
            CipherScheme::LegacyCtr => {
                let iv = self.cipher_iv.as_deref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "--cipher-iv (or STOREMETER_CIPHER_IV) is required for legacy-ctr"
                    )
                })?;
                Ok(Box::new(LegacyCipher::new(CipherKey::from_base64(key, iv)?)))
            }
            CipherScheme::AesGcm => Ok(Box::new(SealedCipher::from_base64_key(key)?)),
        }
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Registry database URL
    #[arg(
        long,
        global = true,
        env = "REGISTRY_DATABASE_URL",
        hide_env_values = true,
        help = "MySQL URL of the credential registry (credentials are redacted in logs)"
    )]
    pub registry_url: Option<String>,

    /// Poll event source
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        help = "Read poll events from FILE instead of stdin"
    )]
    pub input: Option<PathBuf>,

    /// Outbound topic name
    #[arg(long, global = true, env = "STOREMETER_TOPIC", default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// Data stores measured concurrently per resource
    #[arg(
        long,
        global = true,
        env = "STOREMETER_MAX_CONCURRENCY",
        default_value_t = 8,
        value_parser = clap::value_parser!(u16).range(1..=100)
    )]
    pub max_concurrency: u16,

    /// Engine connect timeout in seconds
    #[arg(
        long,
        global = true,
        env = "STOREMETER_CONNECT_TIMEOUT_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..=300)
    )]
    pub connect_timeout_secs: u64,
}

impl RunArgs {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Engine connection settings; the pool is sized to the fan-out.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::default()
            .with_connect_timeout(self.connect_timeout())
            .with_max_connections(u32::from(self.max_concurrency))
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default().with_max_concurrency(usize::from(self.max_concurrency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storemeter_core::ErrorKind;

    const KEY: &str = "8BZ3pCTp71LX5I//QsBYdz7w4JHXNVehSBXuXnScdqg=";
    const IV: &str = "ERttwv7oQb/KUQVBiJZvtA==";

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("storemeter-worker").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_cli_defaults() {
        temp_env::with_vars_unset(
            [
                "STOREMETER_CIPHER_KEY",
                "STOREMETER_CIPHER_IV",
                "STOREMETER_CIPHER_SCHEME",
                "REGISTRY_DATABASE_URL",
                "STOREMETER_TOPIC",
                "STOREMETER_MAX_CONCURRENCY",
                "STOREMETER_CONNECT_TIMEOUT_SECS",
            ],
            || {
                let cli = parse(&[]);
                assert!(cli.command.is_none());
                assert_eq!(cli.run.topic, DEFAULT_TOPIC);
                assert_eq!(cli.run.max_concurrency, 8);
                assert_eq!(cli.run.connect_timeout(), Duration::from_secs(10));
                assert_eq!(cli.cipher.cipher_scheme, CipherScheme::LegacyCtr);
                assert!(cli.cipher.cipher_key.is_none());
                assert!(cli.cipher.build().is_err());
            },
        );
    }

    #[test]
    fn test_cli_reads_env() {
        temp_env::with_vars(
            [
                ("STOREMETER_CIPHER_KEY", Some(KEY)),
                ("STOREMETER_CIPHER_IV", Some(IV)),
                ("REGISTRY_DATABASE_URL", Some("mysql://u:p@registry/meta")),
                ("STOREMETER_MAX_CONCURRENCY", Some("3")),
            ],
            || {
                let cli = parse(&["run"]);
                assert!(matches!(cli.command, Some(Command::Run)));
                assert_eq!(
                    cli.run.registry_url.as_deref(),
                    Some("mysql://u:p@registry/meta")
                );
                assert_eq!(cli.run.connection_config().max_connections, 3);
                assert_eq!(cli.run.pipeline_config().max_concurrency, 3);

                let cipher = cli.cipher.build().unwrap();
                let sealed = cipher.encrypt("db.internal").unwrap();
                assert_eq!(cipher.decrypt(&sealed).unwrap().as_str(), "db.internal");
            },
        );
    }

    #[test]
    fn test_cli_rejects_out_of_range_concurrency() {
        let result = Cli::try_parse_from(["storemeter-worker", "--max-concurrency", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_flags_after_subcommand() {
        let cli = parse(&["encrypt", "secret", "--cipher-key", KEY, "--cipher-scheme", "aes-gcm"]);
        let Some(Command::Encrypt { plaintext }) = &cli.command else {
            panic!("expected encrypt command");
        };
        assert_eq!(plaintext, "secret");
        assert_eq!(cli.cipher.cipher_scheme, CipherScheme::AesGcm);

        let cipher = cli.cipher.build().unwrap();
        let sealed = cipher.encrypt("secret").unwrap();
        assert_eq!(cipher.decrypt(&sealed).unwrap().as_str(), "secret");
    }

    #[test]
    fn test_cli_rejects_malformed_key() {
        let cli = parse(&["--cipher-key", "c2hvcnQ=", "--cipher-iv", IV]);
        let error = cli.cipher.build().unwrap_err();
        let core_error = error
            .downcast_ref::<storemeter_core::StoreMeterError>()
            .unwrap();
        assert_eq!(core_error.kind(), ErrorKind::Configuration);
    }
}
