//! Derivation backends
//!
//! Three interchangeable tiers implement [`DerivationBackend`]:
//! toolchain-full (`cardano-address` + `cardano-cli`), toolchain-partial
//! (`cardano-address` with local envelope rendering) and local fallback
//! (no external tools). [`BackendFactory`] builds one from a capability map.

mod local;
mod process;
pub mod probe;
mod toolchain;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;
use zeroize::Zeroizing;

use crate::config::{CspoConfig, Network};
use crate::crypto::address::{Address, AddressKind};
use crate::crypto::envelope::render_local_envelopes;
use crate::crypto::keys::{DerivationPath, KeyPair, Role, VerificationMaterial};
use crate::crypto::mnemonic::MnemonicPhrase;
use crate::error::{Error, Result};

pub use local::LocalBackend;
pub use probe::{detect_tier, Capabilities, SystemProbe, Tool, ToolProbe, ToolStatus};
pub use toolchain::ToolchainBackend;

/// Backend tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendTier {
    /// `cardano-address` and `cardano-cli`
    Full,
    /// `cardano-address` only
    Partial,
    /// Local hashing, no external tools
    LocalFallback,
}

impl BackendTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "toolchain-full",
            Self::Partial => "toolchain-partial",
            Self::LocalFallback => "local-fallback",
        }
    }

    pub fn is_toolchain(&self) -> bool {
        !matches!(self, Self::LocalFallback)
    }
}

impl fmt::Display for BackendTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strictly generated addresses are validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// bech32-decode and check the prefix against kind and network
    Strict,
    /// Prefix-only check
    Relaxed,
}

/// Root key of one generation run. Never persisted.
#[derive(Clone)]
pub struct RootKey {
    tier: BackendTier,
    material: Zeroizing<String>,
}

impl RootKey {
    pub(crate) fn new(tier: BackendTier, material: impl Into<String>) -> Self {
        Self {
            tier,
            material: Zeroizing::new(material.into()),
        }
    }

    /// Tier that derived this key
    pub fn tier(&self) -> BackendTier {
        self.tier
    }

    pub(crate) fn expose(&self) -> &str {
        &self.material
    }

    /// Refuse keys produced by another tier
    pub(crate) fn ensure_tier(&self, expected: BackendTier) -> Result<()> {
        if self.tier != expected {
            return Err(Error::derivation(
                "derive key pair",
                format!("root key from {} backend given to {} backend", self.tier, expected),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootKey({}, redacted)", self.tier)
    }
}

/// Verification keys an address is built from
#[derive(Debug, Clone, Copy)]
pub enum AddressInput<'a> {
    Payment(&'a VerificationMaterial),
    Reward(&'a VerificationMaterial),
    Base {
        payment: &'a VerificationMaterial,
        stake: &'a VerificationMaterial,
    },
}

impl AddressInput<'_> {
    pub fn kind(&self) -> AddressKind {
        match self {
            Self::Payment(_) => AddressKind::Payment,
            Self::Reward(_) => AddressKind::Reward,
            Self::Base { .. } => AddressKind::Base,
        }
    }
}

/// Operations every tier provides
pub trait DerivationBackend {
    fn tier(&self) -> BackendTier;

    fn validation_mode(&self) -> ValidationMode {
        if self.tier().is_toolchain() {
            ValidationMode::Strict
        } else {
            ValidationMode::Relaxed
        }
    }

    /// Derive the root key from a mnemonic
    fn derive_root(&self, mnemonic: &MnemonicPhrase) -> Result<RootKey>;

    /// Derive the key pair of `role` at `path`
    fn derive_key_pair(&self, root: &RootKey, role: Role, path: &DerivationPath) -> Result<KeyPair>;

    /// Encode an address of the kind `input` describes
    fn encode_address(&self, input: AddressInput<'_>, network: Network) -> Result<Address>;

    /// Render `(skey, vkey)` text envelopes for a key pair
    fn render_key_envelopes(&self, pair: &KeyPair) -> Result<(String, String)> {
        render_local_envelopes(pair)
    }
}

/// Backend factory
pub struct BackendFactory;

impl BackendFactory {
    /// Create a backend of `tier` using tool paths from `capabilities`
    pub fn create_backend(
        tier: BackendTier,
        capabilities: &Capabilities,
        config: &CspoConfig,
    ) -> Result<Box<dyn DerivationBackend>> {
        match tier {
            BackendTier::LocalFallback => Ok(Box::new(LocalBackend::new())),
            BackendTier::Partial => {
                let backend = ToolchainBackend::partial(tool_path(capabilities, Tool::CardanoAddress)?, config.command_timeout);
                Ok(Box::new(backend))
            }
            BackendTier::Full => {
                let backend = ToolchainBackend::full(
                    tool_path(capabilities, Tool::CardanoAddress)?,
                    tool_path(capabilities, Tool::CardanoCli)?,
                    config.command_timeout,
                );
                Ok(Box::new(backend))
            }
        }
    }

    /// Probe the toolchain and create the best backend it supports
    pub fn select(probe: &dyn ToolProbe, config: &CspoConfig) -> Result<Box<dyn DerivationBackend>> {
        let capabilities = probe.capabilities();
        let tier = detect_tier(&capabilities);
        info!(tier = %tier, "selected derivation backend");
        Self::create_backend(tier, &capabilities, config)
    }
}

fn tool_path(capabilities: &Capabilities, tool: Tool) -> Result<std::path::PathBuf> {
    capabilities
        .path(tool)
        .map(|p| p.to_path_buf())
        .ok_or_else(|| Error::ToolchainUnavailable {
            tool: tool.name().to_string(),
            reason: "not installed".to_string(),
        })
}
