//! CSPO Wallet Core - Cardano stake-pool operator wallet generation
//!
//! This library produces and safeguards the wallet material a stake-pool
//! operator needs: a per-ticker BIP39 mnemonic, role keys along the
//! CIP-1852 catalogue, verified base and reward addresses, and
//! password-based encryption of signing keys and mnemonics at rest.
//!
//! Derivation runs through one of three backends: the external
//! `cardano-address`/`cardano-cli` toolchain, `cardano-address` alone, or a
//! local fallback that needs no tools.

pub mod backend;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod mnemonic_store;
pub mod storage;
pub mod wallet;

mod perms;

// Re-export commonly used types for convenience
pub use backend::{BackendFactory, BackendTier, DerivationBackend};
pub use config::{CspoConfig, GenerationMode, Network, Purpose, Ticker};
pub use error::{Error, Result};
pub use mnemonic_store::{FileMnemonicStore, MemoryMnemonicStore, MnemonicStore};
pub use wallet::{GenerationReport, WalletGenerator, WalletLayout};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
