use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, str::FromStr, time::Duration};

/// This is first loaded via the filepath (polkahub.toml by default, settable via CLI arg --config)
/// Then, the .env file is loaded if specified in the `dotenv` field
/// Finally, any env vars are loaded, overwriting any previous values if found
/// For the environment variables, the prefix `POLKAHUB_` is used and the field name in all caps
/// For example, the field `log_level` would be set by the env var `POLKAHUB_LOG_LEVEL`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct HubConfig {
    pub dotenv: Option<PathBuf>,
    pub log_level: LogLevel,
    /// extra `tracing` filter directives, e.g. "polkahub_core=debug"
    pub tracing_directives: Vec<String>,
    /// where file-backed persistence keeps its entries
    /// if not set, the platform data dir is used
    pub storage_dir: Option<PathBuf>,
    /// how long a persisted selection waits for its provider at startup
    pub restore_timeout_ms: u64,
    /// how long multisig/proxy accounts wait for their parent provider
    pub parent_timeout_ms: u64,
    /// how long deserializing an extension account waits for the extension
    pub extension_timeout_ms: u64,
    pub extension_poll_interval_ms: u64,
    /// delay between retries while an extension is pending authorization
    pub extension_retry_delay_ms: u64,
    pub vault_max_frame_size: usize,
    pub proxy_call_index: CallIndex,
    pub multisig_call_index: MultisigCallIndex,
    pub storage_keys: StorageKeys,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            dotenv: None,
            log_level: LogLevel::Info,
            tracing_directives: Vec::new(),
            storage_dir: None,
            restore_timeout_ms: 3000,
            parent_timeout_ms: 3000,
            extension_timeout_ms: 3000,
            extension_poll_interval_ms: 2000,
            extension_retry_delay_ms: 1000,
            vault_max_frame_size: 1024,
            proxy_call_index: CallIndex::POLKADOT_PROXY,
            multisig_call_index: MultisigCallIndex::default(),
            storage_keys: StorageKeys::default(),
        }
    }
}

impl HubConfig {
    /// A missing file is not an error, defaults are used instead
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let s = if path.exists() {
            std::fs::read_to_string(&path)?
        } else {
            String::new()
        };

        let mut config: Self = toml::from_str(&s)?;

        if let Some(dotenv) = &config.dotenv {
            if dotenvy::from_filename(dotenv).is_err() {
                eprintln!("Failed to load .env file");
            }
        }

        config.apply_env(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// `lookup` is typically `std::env::var`, but takes a closure so it can be driven without
    /// touching the process environment
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        fn parse<T: FromStr>(key: &str, value: String) -> Result<T> {
            value
                .parse()
                .map_err(|_| ConfigError::invalid_env(key, value))
        }

        if let Some(log_level) = lookup("POLKAHUB_LOG_LEVEL") {
            self.log_level = log_level.parse()?;
        }

        if let Some(directives) = lookup("POLKAHUB_TRACING_DIRECTIVES") {
            self.tracing_directives = directives
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(storage_dir) = lookup("POLKAHUB_STORAGE_DIR") {
            self.storage_dir = Some(PathBuf::from(storage_dir));
        }

        for (key, field) in [
            ("POLKAHUB_RESTORE_TIMEOUT_MS", &mut self.restore_timeout_ms),
            ("POLKAHUB_PARENT_TIMEOUT_MS", &mut self.parent_timeout_ms),
            ("POLKAHUB_EXTENSION_TIMEOUT_MS", &mut self.extension_timeout_ms),
            (
                "POLKAHUB_EXTENSION_POLL_INTERVAL_MS",
                &mut self.extension_poll_interval_ms,
            ),
            (
                "POLKAHUB_EXTENSION_RETRY_DELAY_MS",
                &mut self.extension_retry_delay_ms,
            ),
        ] {
            if let Some(value) = lookup(key) {
                *field = parse(key, value)?;
            }
        }

        if let Some(value) = lookup("POLKAHUB_VAULT_MAX_FRAME_SIZE") {
            self.vault_max_frame_size = parse("POLKAHUB_VAULT_MAX_FRAME_SIZE", value)?;
        }

        Ok(())
    }

    pub fn restore_timeout(&self) -> Duration {
        Duration::from_millis(self.restore_timeout_ms)
    }

    pub fn parent_timeout(&self) -> Duration {
        Duration::from_millis(self.parent_timeout_ms)
    }

    pub fn extension_timeout(&self) -> Duration {
        Duration::from_millis(self.extension_timeout_ms)
    }

    pub fn extension_poll_interval(&self) -> Duration {
        Duration::from_millis(self.extension_poll_interval_ms)
    }

    pub fn extension_retry_delay(&self) -> Duration {
        Duration::from_millis(self.extension_retry_delay_ms)
    }
}

/// Pallet and call index of a runtime call, used when wrapping calls
/// for proxy and multisig accounts
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallIndex {
    pub pallet: u8,
    pub call: u8,
}

impl CallIndex {
    // Polkadot relay chain `Proxy::proxy`
    pub const POLKADOT_PROXY: Self = Self { pallet: 29, call: 0 };

    pub fn new(pallet: u8, call: u8) -> Self {
        Self { pallet, call }
    }

    pub fn to_bytes(self) -> [u8; 2] {
        [self.pallet, self.call]
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultisigCallIndex {
    pub as_multi_threshold_1: CallIndex,
    pub as_multi: CallIndex,
}

impl Default for MultisigCallIndex {
    // Polkadot relay chain `Multisig` pallet
    fn default() -> Self {
        Self {
            as_multi_threshold_1: CallIndex::new(30, 0),
            as_multi: CallIndex::new(30, 1),
        }
    }
}

/// Each provider keeps its durable state under its own key
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct StorageKeys {
    pub selected_account: String,
    pub read_only: String,
    pub ledger: String,
    pub vault: String,
    pub pjs_wallet: String,
    pub wallet_connect: String,
    pub multisig: String,
    pub proxy: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            selected_account: "selected-account".to_string(),
            read_only: "readonly-accounts".to_string(),
            ledger: "ledger-acc".to_string(),
            vault: "polkadot-vault".to_string(),
            pjs_wallet: "pjs-wallet-plugin".to_string(),
            wallet_connect: "walletconnect-plugin".to_string(),
            multisig: "multisigs".to_string(),
            proxy: "proxies".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}
