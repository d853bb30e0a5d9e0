//! Local fallback backend
//!
//! Used when no external toolchain is available. Keys come from a
//! deterministic hash chain over the BIP39 seed, and addresses are encoded
//! locally. The output is stable for a given mnemonic but is not
//! interchangeable with keys produced by the toolchain tiers.

use ed25519_dalek::{SigningKey, VerifyingKey};
use hmac::Hmac;
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroizing;

use super::{AddressInput, BackendTier, DerivationBackend, RootKey};
use crate::config::Network;
use crate::crypto::address::{self, Address, AddressKind, Credential};
use crate::crypto::keys::{DerivationPath, KeyPair, Role, SigningMaterial, VerificationMaterial};
use crate::crypto::mnemonic::MnemonicPhrase;
use crate::error::{Error, Result};

const MASTER_KEY_SALT: &[u8] = b"cardano-master-key";
const MASTER_KEY_ROUNDS: u32 = 100_000;
const MASTER_KEY_LEN: usize = 64;

/// Local fallback backend
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }

    fn master_key(root: &RootKey) -> Result<Zeroizing<Vec<u8>>> {
        let master = hex::decode(root.expose())
            .map_err(|e| Error::derivation("local root key", e))?;
        if master.len() != MASTER_KEY_LEN {
            return Err(Error::derivation(
                "local root key",
                format!("expected {MASTER_KEY_LEN} bytes, got {}", master.len()),
            ));
        }
        Ok(Zeroizing::new(master))
    }
}

/// SHA-256(master || SHA-256(role label || '/' || path)).
///
/// The purpose index is not hashed separately; it is the payment branch of
/// `path` (`m/1852'/1815'/0'/<purpose>/0`), so stake keys match across purposes.
fn child_key(master: &[u8], role: Role, path: &DerivationPath) -> Zeroizing<[u8; 32]> {
    let label_hash = Sha256::new()
        .chain_update(role.label().as_bytes())
        .chain_update(b"/")
        .chain_update(path.to_toolchain_string().as_bytes())
        .finalize();

    let digest = Sha256::new()
        .chain_update(master)
        .chain_update(label_hash)
        .finalize();

    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&digest);
    key
}

fn credential_for(vk: &VerificationMaterial) -> Result<Credential> {
    Credential::from_verification(vk)
}

impl DerivationBackend for LocalBackend {
    fn tier(&self) -> BackendTier {
        BackendTier::LocalFallback
    }

    fn derive_root(&self, mnemonic: &MnemonicPhrase) -> Result<RootKey> {
        let seed = mnemonic.to_seed()?;
        let mut master = Zeroizing::new([0u8; MASTER_KEY_LEN]);
        pbkdf2::pbkdf2::<Hmac<Sha512>>(&seed, MASTER_KEY_SALT, MASTER_KEY_ROUNDS, &mut master[..])
            .map_err(|e| Error::derivation("local master key", e))?;
        Ok(RootKey::new(self.tier(), hex::encode(&master[..])))
    }

    fn derive_key_pair(&self, root: &RootKey, role: Role, path: &DerivationPath) -> Result<KeyPair> {
        root.ensure_tier(self.tier())?;
        let master = Self::master_key(root)?;
        let secret = child_key(&master, role, path);

        let signing_key = SigningKey::from_bytes(&secret);
        let verifying_key = VerifyingKey::from(&signing_key);

        Ok(KeyPair::new(
            role,
            SigningMaterial::new(hex::encode(&secret[..])),
            VerificationMaterial::new(hex::encode(verifying_key.as_bytes())),
        ))
    }

    fn encode_address(&self, input: AddressInput<'_>, network: Network) -> Result<Address> {
        match input {
            AddressInput::Payment(payment) => {
                let payment = credential_for(payment)?;
                address::encode_address(AddressKind::Payment, network, Some(&payment), None)
            }
            AddressInput::Reward(stake) => {
                let stake = credential_for(stake)?;
                address::encode_address(AddressKind::Reward, network, None, Some(&stake))
            }
            AddressInput::Base { payment, stake } => {
                let payment = credential_for(payment)?;
                let stake = credential_for(stake)?;
                address::encode_address(AddressKind::Base, network, Some(&payment), Some(&stake))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Purpose;

    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art";

    #[test]
    fn test_local_derivation_is_deterministic() {
        let backend = LocalBackend::new();
        let mnemonic = MnemonicPhrase::parse(TEST_MNEMONIC).unwrap();

        let root_a = backend.derive_root(&mnemonic).unwrap();
        let root_b = backend.derive_root(&mnemonic).unwrap();
        let path = Role::Stake.path(Purpose::Pledge);

        let a = backend.derive_key_pair(&root_a, Role::Stake, &path).unwrap();
        let b = backend.derive_key_pair(&root_b, Role::Stake, &path).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.verification().as_str().len(), 64);
    }

    #[test]
    fn test_roles_and_purposes_diverge() {
        let backend = LocalBackend::new();
        let mnemonic = MnemonicPhrase::parse(TEST_MNEMONIC).unwrap();
        let root = backend.derive_root(&mnemonic).unwrap();

        let pledge = backend
            .derive_key_pair(&root, Role::Payment, &Role::Payment.path(Purpose::Pledge))
            .unwrap();
        let rewards = backend
            .derive_key_pair(&root, Role::Payment, &Role::Payment.path(Purpose::Rewards))
            .unwrap();
        let stake = backend
            .derive_key_pair(&root, Role::Stake, &Role::Stake.path(Purpose::Pledge))
            .unwrap();

        assert_ne!(pledge.verification(), rewards.verification());
        assert_ne!(pledge.verification(), stake.verification());
    }

    #[test]
    fn test_child_key_formula() {
        let backend = LocalBackend::new();
        let mnemonic = MnemonicPhrase::parse(TEST_MNEMONIC).unwrap();
        let root = backend.derive_root(&mnemonic).unwrap();
        let master = hex::decode(root.expose()).unwrap();

        let path = Role::Payment.path(Purpose::Rewards);
        assert_eq!(path.to_toolchain_string(), "1852H/1815H/0H/1/0");

        let label_hash = Sha256::digest(b"payment/1852H/1815H/0H/1/0");
        let expected = Sha256::new().chain_update(&master).chain_update(label_hash).finalize();

        let pair = backend.derive_key_pair(&root, Role::Payment, &path).unwrap();
        assert_eq!(pair.signing().expose(), hex::encode(expected));

        let stake_pledge = backend
            .derive_key_pair(&root, Role::Stake, &Role::Stake.path(Purpose::Pledge))
            .unwrap();
        let stake_rewards = backend
            .derive_key_pair(&root, Role::Stake, &Role::Stake.path(Purpose::Rewards))
            .unwrap();
        assert_eq!(stake_pledge, stake_rewards);
    }

    #[test]
    fn test_local_addresses() {
        let backend = LocalBackend::new();
        let mnemonic = MnemonicPhrase::parse(TEST_MNEMONIC).unwrap();
        let root = backend.derive_root(&mnemonic).unwrap();
        let payment = backend
            .derive_key_pair(&root, Role::Payment, &Role::Payment.path(Purpose::Pledge))
            .unwrap();
        let stake = backend
            .derive_key_pair(&root, Role::Stake, &Role::Stake.path(Purpose::Pledge))
            .unwrap();

        let base = backend
            .encode_address(
                AddressInput::Base {
                    payment: payment.verification(),
                    stake: stake.verification(),
                },
                Network::Mainnet,
            )
            .unwrap();
        assert!(base.as_str().starts_with("addr1"));

        let reward = backend
            .encode_address(AddressInput::Reward(stake.verification()), Network::Preprod)
            .unwrap();
        assert!(reward.as_str().starts_with("stake_test1"));
    }

    #[test]
    fn test_rejects_foreign_root() {
        let backend = LocalBackend::new();
        let root = RootKey::new(BackendTier::Full, "root_xsk1whatever");
        let result = backend.derive_key_pair(&root, Role::Stake, &Role::Stake.path(Purpose::Pledge));
        assert!(matches!(result, Err(Error::Derivation { .. })));
    }
}
