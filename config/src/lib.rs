//! ShadowVote Configuration
//!
//! Shared configuration crate for the ShadowVote client and CLI.
//!
//! Handles loading configuration from:
//! 1. SV_CONFIG env var (explicit path)
//! 2. ./shadowvote.toml (current directory)
//! 3. ~/.shadowvote/shadowvote.toml (user home)
//!
//! Environment variables take precedence over TOML config.
//!
//! This crate only loads values. Turning them into runtime types (addresses,
//! ABI, artifact paths) and rejecting malformed entries happens once at
//! client startup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

const CONFIG_FILE_NAME: &str = "shadowvote.toml";
const CONFIG_DIR_NAME: &str = ".shadowvote";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_WASM_PATH: &str = "./circuits/vote_js/vote.wasm";
const DEFAULT_ZKEY_PATH: &str = "./circuits/vote_0001.zkey";
const DEFAULT_SNARKJS_BIN: &str = "snarkjs";
const DEFAULT_PUBLIC_SIGNALS: usize = 2;
const DEFAULT_NULLIFIER_SIGNAL: usize = 0;
const DEFAULT_OPTION_SIGNAL: usize = 1;
const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_OPTIONS: [&str; 3] = ["Ankara", "İstanbul", "İzmir"];

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShadowVoteConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub ballot: BallotConfig,
    #[serde(default)]
    pub circuit: CircuitConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Ledger (verifier contract) connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Verifier/voting contract address (required)
    #[serde(default)]
    pub contract_address: Option<String>,
    /// Path to the contract ABI JSON (required)
    #[serde(default)]
    pub abi_path: Option<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            contract_address: None,
            abi_path: None,
        }
    }
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.into()
}

/// Wallet endpoint. Falls back to the ledger RPC when unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    #[serde(default)]
    pub rpc_url: Option<String>,
}

/// Ballot options, in on-chain order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotConfig {
    #[serde(default = "default_options")]
    pub options: Vec<String>,
}

impl Default for BallotConfig {
    fn default() -> Self {
        Self {
            options: default_options(),
        }
    }
}

fn default_options() -> Vec<String> {
    DEFAULT_OPTIONS.iter().map(|s| s.to_string()).collect()
}

/// Circuit artifacts and public signal layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitConfig {
    #[serde(default = "default_wasm_path")]
    pub wasm_path: String,
    #[serde(default = "default_zkey_path")]
    pub zkey_path: String,
    #[serde(default = "default_snarkjs_bin")]
    pub snarkjs_bin: String,
    #[serde(default = "default_public_signals")]
    pub public_signals: usize,
    /// Slot of the nullifier, or `"none"` if the circuit keeps it private
    #[serde(default = "default_nullifier_signal", with = "signal_slot")]
    pub nullifier_signal: Option<usize>,
    /// Slot of the chosen option, or `"none"` if the circuit keeps it private
    #[serde(default = "default_option_signal", with = "signal_slot")]
    pub option_signal: Option<usize>,
}

/// A public-signal slot written as an index or the word `none`
mod signal_slot {
    use serde::{Deserialize, Deserializer, Serializer, de};

    const NONE: &str = "none";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Index(usize),
        Word(String),
    }

    pub fn serialize<S: Serializer>(slot: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error> {
        match slot {
            Some(index) => serializer.serialize_u64(*index as u64),
            None => serializer.serialize_str(NONE),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Index(index) => Ok(Some(index)),
            Raw::Word(word) if word.eq_ignore_ascii_case(NONE) => Ok(None),
            Raw::Word(word) => Err(de::Error::custom(format!(
                "expected a signal index or \"{NONE}\", got \"{word}\""
            ))),
        }
    }
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            wasm_path: DEFAULT_WASM_PATH.into(),
            zkey_path: DEFAULT_ZKEY_PATH.into(),
            snarkjs_bin: DEFAULT_SNARKJS_BIN.into(),
            public_signals: DEFAULT_PUBLIC_SIGNALS,
            nullifier_signal: Some(DEFAULT_NULLIFIER_SIGNAL),
            option_signal: Some(DEFAULT_OPTION_SIGNAL),
        }
    }
}

fn default_wasm_path() -> String {
    DEFAULT_WASM_PATH.into()
}
fn default_zkey_path() -> String {
    DEFAULT_ZKEY_PATH.into()
}
fn default_snarkjs_bin() -> String {
    DEFAULT_SNARKJS_BIN.into()
}
fn default_public_signals() -> usize {
    DEFAULT_PUBLIC_SIGNALS
}
fn default_nullifier_signal() -> Option<usize> {
    Some(DEFAULT_NULLIFIER_SIGNAL)
}
fn default_option_signal() -> Option<usize> {
    Some(DEFAULT_OPTION_SIGNAL)
}

/// Submission pipeline timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

fn default_confirmation_timeout() -> u64 {
    DEFAULT_CONFIRMATION_TIMEOUT_SECS
}
fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from env var if present
fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

/// Set Option<String> from env var if present
fn env_option_string(key: &str, field: &mut Option<String>) {
    if let Ok(v) = env::var(key) {
        *field = Some(v);
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparseable {}={:?}", key, v),
        }
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl ShadowVoteConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::parse_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check SV_CONFIG env var
        if let Ok(path) = env::var("SV_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            log::warn!("SV_CONFIG points to missing file {}", path.display());
        }

        // 2. Check ./shadowvote.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.shadowvote/shadowvote.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Ledger
        env_string("SV_RPC_URL", &mut self.ledger.rpc_url);
        env_option_string("SV_CONTRACT_ADDRESS", &mut self.ledger.contract_address);
        env_option_string("SV_ABI_PATH", &mut self.ledger.abi_path);

        // Wallet
        env_option_string("SV_WALLET_URL", &mut self.wallet.rpc_url);

        // Circuit
        env_string("SV_CIRCUIT_WASM", &mut self.circuit.wasm_path);
        env_string("SV_PROVING_KEY", &mut self.circuit.zkey_path);
        env_string("SV_SNARKJS_BIN", &mut self.circuit.snarkjs_bin);

        // Pipeline
        env_parse(
            "SV_CONFIRM_TIMEOUT_SECS",
            &mut self.pipeline.confirmation_timeout_secs,
        );
        env_parse("SV_POLL_INTERVAL_MS", &mut self.pipeline.poll_interval_ms);
    }

    /// Wallet endpoint, defaulting to the ledger RPC
    pub fn wallet_url(&self) -> &str {
        self.wallet
            .rpc_url
            .as_deref()
            .unwrap_or(&self.ledger.rpc_url)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.ledger.contract_address = Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".into());
        sample.ledger.abi_path = Some("./getJson/config.json".into());
        toml::to_string_pretty(&sample).unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
