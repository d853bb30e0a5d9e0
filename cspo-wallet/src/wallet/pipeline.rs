//! Key and address pipeline

use std::collections::BTreeMap;

use tracing::debug;

use crate::backend::{AddressInput, BackendTier, DerivationBackend, RootKey};
use crate::config::{GenerationMode, Network, Purpose, Ticker};
use crate::crypto::address::{Address, AddressKind};
use crate::crypto::keys::{KeyPair, Role, VerificationMaterial};
use crate::crypto::mnemonic::MnemonicPhrase;
use crate::error::{Error, Result};

/// Derive the key pair of `role` for `purpose` from the run's root key
pub fn derive_role(
    backend: &dyn DerivationBackend,
    root: &RootKey,
    role: Role,
    purpose: Purpose,
) -> Result<KeyPair> {
    let path = role.path(purpose);
    debug!(role = %role, path = %path, "deriving role");
    backend.derive_key_pair(root, role, &path)
}

/// Base address from payment and stake verification keys
pub fn build_base_address(
    backend: &dyn DerivationBackend,
    payment: &VerificationMaterial,
    stake: &VerificationMaterial,
    network: Network,
) -> Result<Address> {
    backend.encode_address(AddressInput::Base { payment, stake }, network)
}

/// Reward address from the stake verification key
pub fn build_reward_address(
    backend: &dyn DerivationBackend,
    stake: &VerificationMaterial,
    network: Network,
) -> Result<Address> {
    backend.encode_address(AddressInput::Reward(stake), network)
}

/// Payment-only address from the payment verification key
pub fn build_payment_address(
    backend: &dyn DerivationBackend,
    payment: &VerificationMaterial,
    network: Network,
) -> Result<Address> {
    backend.encode_address(AddressInput::Payment(payment), network)
}

/// Keys and addresses of one (ticker, purpose) wallet
#[derive(Debug, Clone)]
pub struct WalletBundle {
    ticker: Ticker,
    purpose: Purpose,
    network: Network,
    mode: GenerationMode,
    tier: BackendTier,
    mnemonic: MnemonicPhrase,
    keys: BTreeMap<Role, KeyPair>,
    addresses: BTreeMap<AddressKind, Address>,
}

impl WalletBundle {
    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn purpose(&self) -> Purpose {
        self.purpose
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    /// Tier of the backend that produced every key in the bundle
    pub fn tier(&self) -> BackendTier {
        self.tier
    }

    pub fn mnemonic(&self) -> &MnemonicPhrase {
        &self.mnemonic
    }

    pub fn keys(&self) -> &BTreeMap<Role, KeyPair> {
        &self.keys
    }

    pub fn addresses(&self) -> &BTreeMap<AddressKind, Address> {
        &self.addresses
    }

    pub fn key(&self, role: Role) -> Result<&KeyPair> {
        self.keys
            .get(&role)
            .ok_or_else(|| Error::derivation("wallet bundle", format!("no {role} key in bundle")))
    }

    pub fn address(&self, kind: AddressKind) -> Result<&Address> {
        self.addresses
            .get(&kind)
            .ok_or_else(|| Error::derivation("wallet bundle", format!("no {kind} address in bundle")))
    }

    /// Recompute the address of `kind` from the bundle's keys
    pub fn compute_address(&self, backend: &dyn DerivationBackend, kind: AddressKind) -> Result<Address> {
        compute_address(backend, &self.keys, kind, self.network)
    }
}

fn compute_address(
    backend: &dyn DerivationBackend,
    keys: &BTreeMap<Role, KeyPair>,
    kind: AddressKind,
    network: Network,
) -> Result<Address> {
    let vk = |role: Role| {
        keys.get(&role)
            .map(|pair| pair.verification())
            .ok_or_else(|| Error::derivation("address", format!("no {role} key for {kind} address")))
    };

    match kind {
        AddressKind::Base => build_base_address(backend, vk(Role::Payment)?, vk(Role::Stake)?, network),
        AddressKind::Payment => build_payment_address(backend, vk(Role::Payment)?, network),
        AddressKind::Reward => build_reward_address(backend, vk(Role::Stake)?, network),
    }
}

/// Run the pipeline: root key, role keys, then addresses
pub fn build_bundle(
    backend: &dyn DerivationBackend,
    mnemonic: &MnemonicPhrase,
    ticker: &Ticker,
    purpose: Purpose,
    network: Network,
    mode: GenerationMode,
) -> Result<WalletBundle> {
    let root = backend.derive_root(mnemonic)?;

    let roles: &[Role] = match mode {
        GenerationMode::Simple => &Role::SIMPLE,
        GenerationMode::Complete => &Role::ALL,
    };
    let mut keys = BTreeMap::new();
    for &role in roles {
        keys.insert(role, derive_role(backend, &root, role, purpose)?);
    }

    let kinds: &[AddressKind] = match mode {
        GenerationMode::Simple => &[AddressKind::Base, AddressKind::Reward],
        GenerationMode::Complete => &[AddressKind::Base, AddressKind::Payment, AddressKind::Reward],
    };
    let mut addresses = BTreeMap::new();
    for &kind in kinds {
        addresses.insert(kind, compute_address(backend, &keys, kind, network)?);
    }

    Ok(WalletBundle {
        ticker: ticker.clone(),
        purpose,
        network,
        mode,
        tier: backend.tier(),
        mnemonic: mnemonic.clone(),
        keys,
        addresses,
    })
}
