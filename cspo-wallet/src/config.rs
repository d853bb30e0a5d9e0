//! Configuration for wallet generation and storage
//!
//! Higher layers (CLI, installers) construct a [`CspoConfig`] and the
//! domain values ([`Ticker`], [`Purpose`], [`Network`], [`GenerationMode`]).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default timeout for toolchain liveness probes
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default watchdog timeout for a single toolchain derivation call
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Pool ticker, normalized to upper case
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Parse and normalize a ticker
    pub fn new(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::Configuration("ticker must not be empty".to_string()));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::Configuration(format!(
                "invalid ticker {trimmed:?}: only ASCII letters, digits, '-' and '_' are allowed"
            )));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Ticker {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Ticker> for String {
    fn from(ticker: Ticker) -> Self {
        ticker.0
    }
}

/// Wallet purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    /// Pledge wallet
    Pledge,
    /// Rewards wallet
    Rewards,
}

impl Purpose {
    /// Purpose index, used as the payment branch of the derivation path
    pub fn index(&self) -> u32 {
        match self {
            Self::Pledge => 0,
            Self::Rewards => 1,
        }
    }

    /// Directory and file name component
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pledge => "pledge",
            Self::Rewards => "rewards",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Purpose {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pledge" => Ok(Self::Pledge),
            "rewards" => Ok(Self::Rewards),
            other => Err(Error::Configuration(format!(
                "unknown purpose {other:?}: expected pledge or rewards"
            ))),
        }
    }
}

/// Target network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Preview,
    Preprod,
}

impl Network {
    /// Network tag encoded in address headers
    pub fn tag(&self) -> u8 {
        match self {
            Self::Mainnet => 1,
            Self::Testnet | Self::Preview | Self::Preprod => 0,
        }
    }

    pub fn is_mainnet(&self) -> bool {
        matches!(self, Self::Mainnet)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Preview => "preview",
            Self::Preprod => "preprod",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "preview" => Ok(Self::Preview),
            "preprod" => Ok(Self::Preprod),
            other => Err(Error::Configuration(format!(
                "unknown network {other:?}: expected mainnet, testnet, preview or preprod"
            ))),
        }
    }
}

/// Which artifacts a generation run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Addresses, staking key pair and mnemonic copy
    #[default]
    Simple,
    /// Simple output plus every role key, credentials and certificate stand-ins
    Complete,
}

/// Library configuration
#[derive(Debug, Clone)]
pub struct CspoConfig {
    /// User-scoped home directory holding the `.CSPO_<TICKER>` trees
    pub home_dir: PathBuf,
    /// Directory holding the external toolchain binaries
    pub tools_dir: PathBuf,
    /// Timeout for `--version` liveness probes
    pub probe_timeout: Duration,
    /// Watchdog timeout for each toolchain call
    pub command_timeout: Duration,
}

impl Default for CspoConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::with_home(home_dir)
    }
}

impl CspoConfig {
    /// Configuration rooted at an explicit home directory
    pub fn with_home(home_dir: impl Into<PathBuf>) -> Self {
        let home_dir = home_dir.into();
        let tools_dir = home_dir.join(".cardano_spo_cli").join("tools");
        Self {
            home_dir,
            tools_dir,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Build from the process environment.
    ///
    /// Honors `CSPO_HOME`, `CSPO_TOOLS_DIR` and `CSPO_COMMAND_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os("CSPO_HOME") {
            Some(home) => Self::with_home(home),
            None => {
                let home = dirs::home_dir().ok_or_else(|| {
                    Error::Configuration(
                        "cannot determine the home directory; set CSPO_HOME".to_string(),
                    )
                })?;
                Self::with_home(home)
            }
        };

        if let Some(tools) = std::env::var_os("CSPO_TOOLS_DIR") {
            config.tools_dir = PathBuf::from(tools);
        }

        if let Ok(secs) = std::env::var("CSPO_COMMAND_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::Configuration(format!(
                    "CSPO_COMMAND_TIMEOUT_SECS must be a number of seconds, got {secs:?}"
                ))
            })?;
            config.command_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_tools_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tools_dir = dir.into();
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// `<home>/.CSPO_<TICKER>`
    pub fn ticker_dir(&self, ticker: &Ticker) -> PathBuf {
        ticker_dir(&self.home_dir, ticker)
    }

    /// `<home>/.CSPO_<TICKER>/<purpose>`
    pub fn wallet_dir(&self, ticker: &Ticker, purpose: Purpose) -> PathBuf {
        self.ticker_dir(ticker).join(purpose.as_str())
    }
}

/// `<home>/.CSPO_<TICKER>`
pub fn ticker_dir(home: &Path, ticker: &Ticker) -> PathBuf {
    home.join(format!(".CSPO_{}", ticker.as_str()))
}
