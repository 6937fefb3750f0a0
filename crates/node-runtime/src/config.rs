//! # Node Configuration
//!
//! One TOML file, every field optional:
//!
//! ```toml
//! [network]
//! bind = "0.0.0.0:5353"
//! client_bind_v4 = "0.0.0.0:0"
//! client_bind_v6 = "[::]:0"
//! request_timeout_secs = 4
//! peers = ["192.0.2.10:5353", "[2001:db8::1]:5353"]
//!
//! [identity]
//! cold_public = "<hex>"
//! hot_secret = "<hex>"
//! hot_proof = "<hex>"
//! trusted_keys = ["<hex>", "<hex>"]
//! min_signatures = 2
//!
//! [sync]
//! name_prefix = "h/"
//! authority_domain = "nic.h"
//! sync_interval_secs = 60
//! ledger_backoff_secs = 60
//! hot_key_refresh_max_secs = 120
//! gossip_max_secs = 10
//! merge_batch_size = 1
//!
//! [storage]
//! snapshot_path = "./data/names.db"
//!
//! [ledger]
//! path = "./data/ledger.json"
//! ```
//!
//! Environment overrides are applied after the file: `QN_BIND_ADDR`,
//! `QN_SNAPSHOT_PATH`, `QN_LEDGER_PATH`, `QN_MIN_SIGNATURES`.

use qn_02_name_records::SignerId;
use qn_03_quorum_rpc::TransportConfig;
use qn_04_name_sync::SyncConfig;
use serde::Deserialize;
use shared_crypto::{Ed25519PublicKey, Ed25519Signature};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed to load.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this layout.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds an unusable value.
    #[error("Invalid {field}: {reason}")]
    Invalid {
        /// Dotted field path.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl ToString) -> Self {
        Self::Invalid {
            field,
            reason: reason.to_string(),
        }
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Sockets and peers.
    pub network: NetworkConfig,
    /// Signing identity and the signer group.
    pub identity: IdentityConfig,
    /// Sync loop tunables.
    pub sync: SyncSettings,
    /// Snapshot location.
    pub storage: StorageConfig,
    /// Ledger source.
    pub ledger: LedgerConfig,
}

/// Network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Where the dispatcher answers requests.
    pub bind: SocketAddr,
    /// Local IPv4 address for outgoing requests.
    pub client_bind_v4: SocketAddr,
    /// Local IPv6 address for outgoing requests.
    pub client_bind_v6: Option<SocketAddr>,
    /// Reply timeout for outgoing requests.
    pub request_timeout: Duration,
    /// Fellow signers.
    pub peers: Vec<SocketAddr>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let transport = TransportConfig::default();
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5353)),
            client_bind_v4: transport.bind_v4,
            client_bind_v6: transport.bind_v6,
            request_timeout: transport.request_timeout,
            peers: Vec::new(),
        }
    }
}

impl NetworkConfig {
    /// Settings for the outgoing transport.
    #[must_use]
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            bind_v4: self.client_bind_v4,
            bind_v6: self.client_bind_v6,
            request_timeout: self.request_timeout,
        }
    }
}

/// This node's signing keys.
#[derive(Debug, Clone)]
pub struct SignerKeys {
    /// Cold public key.
    pub cold_public: SignerId,
    /// Hex seed of the hot key.
    pub hot_secret: String,
    /// Cold signature over the hot public key.
    pub hot_proof: Ed25519Signature,
}

/// Identity configuration.
#[derive(Debug, Clone, Default)]
pub struct IdentityConfig {
    /// Keys to sign with; a resolve-only client has none.
    pub signer: Option<SignerKeys>,
    /// Cold keys of the signer group.
    pub trusted_keys: Vec<SignerId>,
    /// Signatures a resolved record needs. `None` means every trusted key.
    pub min_signatures: Option<usize>,
}

impl IdentityConfig {
    /// Effective quorum size.
    #[must_use]
    pub fn min_signatures(&self) -> usize {
        self.min_signatures.unwrap_or(self.trusted_keys.len())
    }
}

/// Sync loop tunables.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Ledger prefix of the zone.
    pub name_prefix: String,
    /// Domain of the zone authority.
    pub authority_domain: String,
    /// Pause between passes.
    pub sync_interval: Duration,
    /// Pause after a ledger error.
    pub ledger_backoff: Duration,
    /// Upper bound of the hot-key refresh delay.
    pub hot_key_refresh_max: Duration,
    /// Upper bound of the gossip delay.
    pub gossip_max: Duration,
    /// Merge steps per lock hold.
    pub merge_batch_size: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        let sync = SyncConfig::default();
        Self {
            name_prefix: sync.name_prefix,
            authority_domain: sync.authority_domain,
            sync_interval: sync.sync_interval,
            ledger_backoff: sync.ledger_backoff,
            hot_key_refresh_max: sync.hot_key_refresh_max,
            gossip_max: sync.gossip_max,
            merge_batch_size: sync.merge_batch_size,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Snapshot file; `None` keeps the list in memory only.
    pub snapshot_path: Option<PathBuf>,
}

/// Ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// JSON ledger export read by the file ledger.
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/ledger.json"),
        }
    }
}

impl NodeConfig {
    /// Sync engine settings derived from this config.
    #[must_use]
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            name_prefix: self.sync.name_prefix.clone(),
            authority_domain: self.sync.authority_domain.clone(),
            sync_interval: self.sync.sync_interval,
            ledger_backoff: self.sync.ledger_backoff,
            hot_key_refresh_max: self.sync.hot_key_refresh_max,
            gossip_max: self.sync.gossip_max,
            merge_batch_size: self.sync.merge_batch_size,
            trusted_keys: self.identity.trusted_keys.clone(),
            peers: self.network.peers.clone(),
        }
    }

    /// Load from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: toml_config::ConfigFile = toml::from_str(content)?;
        file.resolve()
    }

    /// Apply `QN_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `QN_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("QN_BIND_ADDR") {
            match addr.parse() {
                Ok(bind) => {
                    self.network.bind = bind;
                    info!(bind = %bind, "Bind address from environment");
                }
                Err(_) => warn!(value = %addr, "QN_BIND_ADDR is not a socket address"),
            }
        }
        if let Some(path) = lookup("QN_SNAPSHOT_PATH") {
            self.storage.snapshot_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("QN_LEDGER_PATH") {
            self.ledger.path = PathBuf::from(path);
        }
        if let Some(min) = lookup("QN_MIN_SIGNATURES") {
            match min.parse() {
                Ok(n) => self.identity.min_signatures = Some(n),
                Err(_) => warn!(value = %min, "QN_MIN_SIGNATURES is not a number"),
            }
        }
    }
}

mod toml_config {
    use super::*;

    #[derive(Debug, Deserialize, Default)]
    #[serde(deny_unknown_fields)]
    pub(super) struct ConfigFile {
        #[serde(default)]
        network: NetworkFile,
        #[serde(default)]
        identity: IdentityFile,
        #[serde(default)]
        sync: SyncFile,
        #[serde(default)]
        storage: StorageFile,
        #[serde(default)]
        ledger: LedgerFile,
    }

    #[derive(Debug, Deserialize, Default)]
    struct NetworkFile {
        bind: Option<SocketAddr>,
        client_bind_v4: Option<SocketAddr>,
        client_bind_v6: Option<SocketAddr>,
        request_timeout_secs: Option<u64>,
        #[serde(default)]
        peers: Vec<SocketAddr>,
    }

    #[derive(Debug, Deserialize, Default)]
    struct IdentityFile {
        cold_public: Option<String>,
        hot_secret: Option<String>,
        hot_proof: Option<String>,
        #[serde(default)]
        trusted_keys: Vec<String>,
        min_signatures: Option<usize>,
    }

    #[derive(Debug, Deserialize, Default)]
    struct SyncFile {
        name_prefix: Option<String>,
        authority_domain: Option<String>,
        sync_interval_secs: Option<u64>,
        ledger_backoff_secs: Option<u64>,
        hot_key_refresh_max_secs: Option<u64>,
        gossip_max_secs: Option<u64>,
        merge_batch_size: Option<usize>,
    }

    #[derive(Debug, Deserialize, Default)]
    struct StorageFile {
        snapshot_path: Option<PathBuf>,
    }

    #[derive(Debug, Deserialize, Default)]
    struct LedgerFile {
        path: Option<PathBuf>,
    }

    fn parse_key(field: &'static str, hex: &str) -> Result<SignerId, ConfigError> {
        Ed25519PublicKey::from_hex(hex)
            .map(SignerId::from)
            .map_err(|e| ConfigError::invalid(field, e))
    }

    fn secs(value: Option<u64>, default: Duration) -> Duration {
        value.map_or(default, Duration::from_secs)
    }

    impl ConfigFile {
        pub(super) fn resolve(self) -> Result<NodeConfig, ConfigError> {
            let defaults = NodeConfig::default();

            let n = self.network;
            let network = NetworkConfig {
                bind: n.bind.unwrap_or(defaults.network.bind),
                client_bind_v4: n.client_bind_v4.unwrap_or(defaults.network.client_bind_v4),
                client_bind_v6: n.client_bind_v6.or(defaults.network.client_bind_v6),
                request_timeout: secs(n.request_timeout_secs, defaults.network.request_timeout),
                peers: n.peers,
            };

            let id = self.identity;
            let signer = match (id.cold_public, id.hot_secret, id.hot_proof) {
                (None, None, None) => None,
                (Some(cold), Some(hot_secret), Some(proof)) => Some(SignerKeys {
                    cold_public: parse_key("identity.cold_public", &cold)?,
                    hot_secret,
                    hot_proof: Ed25519Signature::from_hex(&proof)
                        .map_err(|e| ConfigError::invalid("identity.hot_proof", e))?,
                }),
                _ => {
                    return Err(ConfigError::invalid(
                        "identity",
                        "cold_public, hot_secret and hot_proof go together",
                    ))
                }
            };
            let trusted_keys = id
                .trusted_keys
                .iter()
                .map(|k| parse_key("identity.trusted_keys", k))
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(min) = id.min_signatures {
                if min > trusted_keys.len() {
                    return Err(ConfigError::invalid(
                        "identity.min_signatures",
                        format!("{} exceeds {} trusted keys", min, trusted_keys.len()),
                    ));
                }
            }
            let identity = IdentityConfig {
                signer,
                trusted_keys,
                min_signatures: id.min_signatures,
            };

            let s = self.sync;
            let d = defaults.sync;
            let sync = SyncSettings {
                name_prefix: s.name_prefix.unwrap_or(d.name_prefix),
                authority_domain: s.authority_domain.unwrap_or(d.authority_domain),
                sync_interval: secs(s.sync_interval_secs, d.sync_interval),
                ledger_backoff: secs(s.ledger_backoff_secs, d.ledger_backoff),
                hot_key_refresh_max: secs(s.hot_key_refresh_max_secs, d.hot_key_refresh_max),
                gossip_max: secs(s.gossip_max_secs, d.gossip_max),
                merge_batch_size: s.merge_batch_size.unwrap_or(d.merge_batch_size).max(1),
            };

            Ok(NodeConfig {
                network,
                identity,
                sync,
                storage: StorageConfig {
                    snapshot_path: self.storage.snapshot_path,
                },
                ledger: LedgerConfig {
                    path: self.ledger.path.unwrap_or(defaults.ledger.path),
                },
            })
        }
    }
}
