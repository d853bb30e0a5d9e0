//! Wallet generation runs

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::layout::WalletLayout;
use super::pipeline::build_bundle;
use super::verify::verify_bundle;
use crate::backend::{BackendFactory, BackendTier, DerivationBackend, LocalBackend, SystemProbe};
use crate::config::{CspoConfig, GenerationMode, Network, Purpose, Ticker};
use crate::crypto::address::AddressKind;
use crate::crypto::mnemonic::MnemonicPhrase;
use crate::error::{Error, Result};
use crate::mnemonic_store::{FileMnemonicStore, MnemonicStore};

/// Summary of a finished generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub ticker: String,
    pub purpose: Purpose,
    pub network: Network,
    pub tier: BackendTier,
    pub wallet_dir: PathBuf,
    pub base_addr: String,
    pub reward_addr: String,
    pub files: Vec<String>,
}

impl GenerationReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::encoding("generation report", e))
    }
}

/// Generates and persists wallets
pub struct WalletGenerator {
    config: CspoConfig,
    store: Box<dyn MnemonicStore>,
    backend: Box<dyn DerivationBackend>,
}

impl WalletGenerator {
    /// Generator with an explicit store and backend
    pub fn new(config: CspoConfig, store: Box<dyn MnemonicStore>, backend: Box<dyn DerivationBackend>) -> Self {
        Self { config, store, backend }
    }

    /// Generator using the on-disk mnemonic store and the best backend the
    /// installed toolchain supports
    pub fn from_config(config: CspoConfig) -> Result<Self> {
        let probe = SystemProbe::from_config(&config);
        let backend = BackendFactory::select(&probe, &config)?;
        let store = Box::new(FileMnemonicStore::new(&config.home_dir));
        Ok(Self::new(config, store, backend))
    }

    pub fn config(&self) -> &CspoConfig {
        &self.config
    }

    /// Tier the generator starts with
    pub fn backend_tier(&self) -> BackendTier {
        self.backend.tier()
    }

    /// Generate, verify and persist the wallet for (ticker, purpose).
    ///
    /// A downgrade-eligible failure in a toolchain tier reruns the whole
    /// generation on the local fallback backend. Nothing is written before
    /// every address has been verified.
    pub fn generate(
        &self,
        ticker: &Ticker,
        purpose: Purpose,
        network: Network,
        mode: GenerationMode,
    ) -> Result<GenerationReport> {
        info!(ticker = %ticker, purpose = %purpose, network = %network, tier = %self.backend.tier(), "generating wallet");
        let mnemonic = self.store.get_or_create(ticker)?;

        match self.run(self.backend.as_ref(), &mnemonic, ticker, purpose, network, mode) {
            Err(e) if e.is_downgrade_eligible() && self.backend.tier().is_toolchain() => {
                warn!(
                    error = %e,
                    from = %self.backend.tier(),
                    "toolchain failed, falling back to local derivation for this run"
                );
                self.run(&LocalBackend::new(), &mnemonic, ticker, purpose, network, mode)
            }
            result => result,
        }
    }

    fn run(
        &self,
        backend: &dyn DerivationBackend,
        mnemonic: &MnemonicPhrase,
        ticker: &Ticker,
        purpose: Purpose,
        network: Network,
        mode: GenerationMode,
    ) -> Result<GenerationReport> {
        let bundle = build_bundle(backend, mnemonic, ticker, purpose, network, mode)?;
        verify_bundle(backend, &bundle)?;

        let layout = WalletLayout::from_config(&self.config, ticker, purpose);
        let files = layout.render(&bundle, backend)?;
        layout.persist(&files)?;

        let report = GenerationReport {
            ticker: ticker.to_string(),
            purpose,
            network,
            tier: bundle.tier(),
            wallet_dir: layout.dir().to_path_buf(),
            base_addr: bundle.address(AddressKind::Base)?.to_string(),
            reward_addr: bundle.address(AddressKind::Reward)?.to_string(),
            files: files.iter().map(|f| f.name().to_string()).collect(),
        };
        info!(dir = %report.wallet_dir.display(), tier = %report.tier, "wallet generated");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnemonic_store::MemoryMnemonicStore;

    #[test]
    fn test_report_json() {
        let home = tempfile::tempdir().unwrap();
        let generator = WalletGenerator::new(
            CspoConfig::with_home(home.path()),
            Box::new(MemoryMnemonicStore::new()),
            Box::new(LocalBackend::new()),
        );
        let ticker = Ticker::new("json").unwrap();
        let report = generator
            .generate(&ticker, Purpose::Rewards, Network::Preview, GenerationMode::Simple)
            .unwrap();

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["ticker"], "JSON");
        assert_eq!(json["purpose"], "rewards");
        assert_eq!(json["tier"], "local-fallback");
        assert!(json["reward_addr"].as_str().unwrap().starts_with("stake_test"));
        assert_eq!(json["files"].as_array().unwrap().len(), 5);
    }
}
