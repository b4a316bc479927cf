//! Explicit configuration threaded into every component.
//!
//! Nothing in qwallet reads ambient process state after start-up. The CLI
//! builds one [`WalletContext`] and passes it down.
//!
//! Precedence, lowest first:
//!
//! 1. [`WalletContext::default`]
//! 2. `settings.json` in the storage root
//! 3. `QWALLET_*` environment variables (a `.env` file is honoured)
//! 4. CLI flags (applied by the caller)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::atomic::write_atomic;
use crate::constants::*;
use crate::error::{Result, WalletError};
use crate::types::{HashVariant, Network, Scheme};

/// Confirmation depth requested when polling signature statuses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    /// Voted on by a supermajority
    #[default]
    Confirmed,
    /// Rooted; cannot be rolled back
    Finalized,
}

impl Commitment {
    /// JSON-RPC identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

impl std::str::FromStr for Commitment {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            other => Err(WalletError::invalid(format!("unknown commitment: {other}"))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SETTINGS FILE
// ═══════════════════════════════════════════════════════════════════════════════

/// User preferences persisted as `settings.json` in the storage root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Network for new wallets and commands without `--network`
    pub default_network: Network,
    /// Scheme for new wallets
    pub default_scheme: Scheme,
    /// Security level for new wallets
    pub default_security_level: u8,
    /// Hash variant for new wallets
    pub default_hash_variant: HashVariant,
    /// KDF round override
    pub kdf_rounds: Option<u32>,
    /// RPC endpoint override
    pub rpc_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_network: Network::Testnet,
            default_scheme: Scheme::Dilithium,
            default_security_level: DEFAULT_SECURITY_LEVEL,
            default_hash_variant: HashVariant::default(),
            kdf_rounds: None,
            rpc_url: None,
        }
    }
}

impl Settings {
    /// Reads settings from `path`; a missing file yields `None`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        let settings = serde_json::from_slice(&bytes).map_err(|e| {
            WalletError::invalid(format!("invalid settings file {}: {e}", path.display()))
        })?;
        Ok(Some(settings))
    }

    /// Writes settings to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, &serde_json::to_vec_pretty(self)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WALLET CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only configuration for one invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletContext {
    /// Default network
    pub network: Network,
    /// Directory holding wallet files, backups and settings
    pub storage_root: PathBuf,
    /// PBKDF2 round count for new saves
    pub kdf_rounds: u32,
    /// RPC endpoint override; `None` uses the network default
    pub rpc_url: Option<String>,
    /// Timeout applied to every RPC request
    pub request_timeout: Duration,
    /// Bounded retry count for transient network failures
    pub max_retries: u32,
    /// Base delay for exponential backoff
    pub retry_base_delay: Duration,
    /// How long confirmation polling may run
    pub confirmation_timeout: Duration,
    /// Fixed interval between confirmation polls
    pub poll_interval: Duration,
    /// Confirmation depth
    pub commitment: Commitment,
}

impl Default for WalletContext {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            storage_root: default_storage_root(),
            kdf_rounds: DEFAULT_KDF_ROUNDS,
            rpc_url: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            confirmation_timeout: Duration::from_secs(DEFAULT_CONFIRMATION_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            commitment: Commitment::default(),
        }
    }
}

/// `~/.qwallet`, or `./.qwallet` when no home directory is known.
pub fn default_storage_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".qwallet")
}

impl WalletContext {
    /// Context rooted at `storage_root` with every other field defaulted.
    pub fn with_root(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            ..Default::default()
        }
    }

    /// Builds the full layered context: defaults, settings file, environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`WalletContext::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut ctx = Self::default();
        if let Some(home) = lookup("QWALLET_HOME") {
            ctx.storage_root = PathBuf::from(home);
        }
        if let Some(settings) = Settings::load(&ctx.settings_path())? {
            ctx.apply_settings(&settings);
        }
        ctx.apply_env(lookup)?;
        ctx.validate()?;
        debug!(
            network = %ctx.network,
            root = %ctx.storage_root.display(),
            kdf_rounds = ctx.kdf_rounds,
            "Wallet context loaded"
        );
        Ok(ctx)
    }

    /// Layers persisted settings over the current values.
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.network = settings.default_network;
        if let Some(rounds) = settings.kdf_rounds {
            self.kdf_rounds = rounds;
        }
        if settings.rpc_url.is_some() {
            self.rpc_url = settings.rpc_url.clone();
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("QWALLET_NETWORK") {
            self.network = v.parse()?;
        }
        if let Some(v) = lookup("QWALLET_KDF_ROUNDS") {
            self.kdf_rounds = parse_env("QWALLET_KDF_ROUNDS", &v)?;
        }
        if let Some(v) = lookup("QWALLET_RPC_URL") {
            self.rpc_url = Some(v);
        }
        if let Some(v) = lookup("QWALLET_TIMEOUT_SECS") {
            self.request_timeout = Duration::from_secs(parse_env("QWALLET_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("QWALLET_MAX_RETRIES") {
            self.max_retries = parse_env("QWALLET_MAX_RETRIES", &v)?;
        }
        if let Some(v) = lookup("QWALLET_CONFIRM_TIMEOUT_SECS") {
            self.confirmation_timeout =
                Duration::from_secs(parse_env("QWALLET_CONFIRM_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("QWALLET_POLL_INTERVAL_MS") {
            self.poll_interval =
                Duration::from_millis(parse_env("QWALLET_POLL_INTERVAL_MS", &v)?);
        }
        if let Some(v) = lookup("QWALLET_COMMITMENT") {
            self.commitment = v.parse()?;
        }
        Ok(())
    }

    /// Rejects unusable configurations.
    pub fn validate(&self) -> Result<()> {
        if self.kdf_rounds < MIN_KDF_ROUNDS {
            return Err(WalletError::invalid(format!(
                "kdf_rounds must be at least {MIN_KDF_ROUNDS}, got {}",
                self.kdf_rounds
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(WalletError::invalid("poll interval must be non-zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(WalletError::invalid("request timeout must be non-zero"));
        }
        if let Some(url) = &self.rpc_url {
            url::Url::parse(url)
                .map_err(|e| WalletError::invalid(format!("invalid RPC URL '{url}': {e}")))?;
        }
        Ok(())
    }

    /// Effective RPC endpoint.
    pub fn rpc_endpoint(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_rpc_url())
    }

    /// Path of the settings file.
    pub fn settings_path(&self) -> PathBuf {
        self.storage_root.join(SETTINGS_FILE_NAME)
    }

    /// Directory holding wallet snapshots.
    pub fn backup_dir(&self) -> PathBuf {
        self.storage_root.join(BACKUP_DIR_NAME)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| WalletError::invalid(format!("{key}={value}: {e}")))
}
