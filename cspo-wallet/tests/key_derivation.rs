//! Tests for key derivation

use cspo_wallet::backend::{AddressInput, DerivationBackend, LocalBackend};
use cspo_wallet::crypto::keys::*;
use cspo_wallet::crypto::mnemonic::*;
use cspo_wallet::{Network, Purpose};

const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art";

#[test]
fn test_role_catalogue_paths() {
    let expected = [
        (Role::Payment, Purpose::Pledge, "m/1852'/1815'/0'/0/0"),
        (Role::Payment, Purpose::Rewards, "m/1852'/1815'/0'/1/0"),
        (Role::Stake, Purpose::Rewards, "m/1852'/1815'/0'/2/0"),
        (Role::DRep, Purpose::Pledge, "m/1852'/1815'/0'/3/0"),
        (Role::CcCold, Purpose::Pledge, "m/1852'/1815'/0'/4/0"),
        (Role::CcHot, Purpose::Pledge, "m/1852'/1815'/0'/5/0"),
        (Role::MultisigPayment, Purpose::Rewards, "m/1854'/1815'/0'/0/0"),
        (Role::MultisigStake, Purpose::Pledge, "m/1854'/1815'/0'/2/0"),
        (Role::MultisigDRep, Purpose::Pledge, "m/1854'/1815'/0'/3/0"),
    ];

    for (role, purpose, path) in expected {
        assert_eq!(role.path(purpose).to_string(), path, "{role} for {purpose}");
    }
}

#[test]
fn test_local_key_derivation() {
    let phrase = MnemonicPhrase::parse(MNEMONIC).unwrap();
    let backend = LocalBackend::new();
    let root = backend.derive_root(&phrase).unwrap();

    let pair = backend
        .derive_key_pair(&root, Role::Stake, &Role::Stake.path(Purpose::Pledge))
        .unwrap();

    assert_eq!(pair.role(), Role::Stake);
    assert_eq!(pair.signing().expose().len(), 64);
    assert_eq!(pair.verification().public_key_bytes().unwrap().len(), 32);
}

#[test]
fn test_local_reward_address_is_shared_across_purposes() {
    let phrase = MnemonicPhrase::parse(MNEMONIC).unwrap();
    let backend = LocalBackend::new();
    let root = backend.derive_root(&phrase).unwrap();

    let stake_pledge = backend
        .derive_key_pair(&root, Role::Stake, &Role::Stake.path(Purpose::Pledge))
        .unwrap();
    let stake_rewards = backend
        .derive_key_pair(&root, Role::Stake, &Role::Stake.path(Purpose::Rewards))
        .unwrap();

    let a = backend
        .encode_address(AddressInput::Reward(stake_pledge.verification()), Network::Mainnet)
        .unwrap();
    let b = backend
        .encode_address(AddressInput::Reward(stake_rewards.verification()), Network::Mainnet)
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_generated_mnemonic_is_24_words() {
    let phrase = generate_mnemonic(MnemonicStrength::Words24).unwrap();
    assert_eq!(phrase.word_count(), 24);
    assert!(validate_mnemonic(phrase.as_str()).is_ok());
}
