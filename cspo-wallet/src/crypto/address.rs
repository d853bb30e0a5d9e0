//! Address kinds, bech32 handling and key credentials

use std::fmt;

use bech32::{FromBase32, ToBase32, Variant};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Network;
use crate::crypto::keys::VerificationMaterial;
use crate::error::{Error, Result};

/// Human-readable prefixes accepted for generated addresses
pub const VALID_PREFIXES: [&str; 4] = ["addr", "addr_test", "stake", "stake_test"];

/// Length of a key credential in bytes
pub const CREDENTIAL_LEN: usize = 28;

/// Address kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    /// Payment credential plus delegation credential
    Base,
    /// Payment credential only
    Payment,
    /// Delegation credential only, used for reward withdrawal
    Reward,
}

impl AddressKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Payment => "payment",
            Self::Reward => "reward",
        }
    }

    /// Expected human-readable prefix on a network
    pub fn prefix(&self, network: Network) -> &'static str {
        match (self, network.is_mainnet()) {
            (Self::Reward, true) => "stake",
            (Self::Reward, false) => "stake_test",
            (_, true) => "addr",
            (_, false) => "addr_test",
        }
    }

    /// Shelley header nibble
    fn header_type(&self) -> u8 {
        match self {
            Self::Base => 0b0000,
            Self::Payment => 0b0110,
            Self::Reward => 0b1110,
        }
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An encoded address tagged with its kind and network
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    kind: AddressKind,
    network: Network,
    encoded: String,
}

impl Address {
    pub fn new(kind: AddressKind, network: Network, encoded: impl Into<String>) -> Self {
        Self {
            kind,
            network,
            encoded: encoded.into(),
        }
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

/// Hash-derived identifier of a verification key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Credential([u8; CREDENTIAL_LEN]);

impl Credential {
    /// Leading 28 bytes of SHA-256 over the raw public key
    pub fn from_verification(vk: &VerificationMaterial) -> Result<Self> {
        let public_key = vk.public_key_bytes()?;
        let digest = Sha256::digest(public_key);
        let mut credential = [0u8; CREDENTIAL_LEN];
        credential.copy_from_slice(&digest[..CREDENTIAL_LEN]);
        Ok(Self(credential))
    }

    pub fn as_bytes(&self) -> &[u8; CREDENTIAL_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Encode a Shelley-layout address from credentials.
///
/// `Base` needs both credentials, `Payment` only the payment one and
/// `Reward` only the stake one.
pub fn encode_address(
    kind: AddressKind,
    network: Network,
    payment: Option<&Credential>,
    stake: Option<&Credential>,
) -> Result<Address> {
    let mut payload = Vec::with_capacity(1 + 2 * CREDENTIAL_LEN);
    payload.push((kind.header_type() << 4) | network.tag());

    match (kind, payment, stake) {
        (AddressKind::Base, Some(payment), Some(stake)) => {
            payload.extend_from_slice(payment.as_bytes());
            payload.extend_from_slice(stake.as_bytes());
        }
        (AddressKind::Payment, Some(payment), _) => payload.extend_from_slice(payment.as_bytes()),
        (AddressKind::Reward, _, Some(stake)) => payload.extend_from_slice(stake.as_bytes()),
        _ => {
            return Err(Error::encoding(
                format!("{kind} address"),
                "missing credential for this address kind",
            ))
        }
    }

    let encoded = bech32::encode(kind.prefix(network), payload.to_base32(), Variant::Bech32)
        .map_err(|e| Error::encoding(format!("{kind} address"), format!("bech32 encoding failed: {e}")))?;

    Ok(Address::new(kind, network, encoded))
}

/// Decode a bech32 string into its prefix and data bytes
pub fn decode_bech32_bytes(encoded: &str) -> Result<(String, Vec<u8>)> {
    let (hrp, data, _variant) = bech32::decode(encoded)
        .map_err(|e| Error::encoding(encoded, format!("bech32 decoding failed: {e}")))?;
    let bytes = Vec::<u8>::from_base32(&data)
        .map_err(|e| Error::encoding(encoded, format!("bech32 base32 conversion failed: {e}")))?;
    Ok((hrp, bytes))
}

/// Decode an address and return its human-readable prefix
pub fn decode_prefix(encoded: &str) -> Result<String> {
    decode_bech32_bytes(encoded).map(|(hrp, _)| hrp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(byte: u8) -> Credential {
        Credential([byte; CREDENTIAL_LEN])
    }

    #[test]
    fn test_prefixes_follow_network() {
        assert_eq!(AddressKind::Base.prefix(Network::Mainnet), "addr");
        assert_eq!(AddressKind::Payment.prefix(Network::Preview), "addr_test");
        assert_eq!(AddressKind::Reward.prefix(Network::Mainnet), "stake");
        assert_eq!(AddressKind::Reward.prefix(Network::Preprod), "stake_test");
    }

    #[test]
    fn test_encode_base_address() {
        let address = encode_address(
            AddressKind::Base,
            Network::Mainnet,
            Some(&credential(1)),
            Some(&credential(2)),
        )
        .unwrap();

        let (hrp, bytes) = decode_bech32_bytes(address.as_str()).unwrap();
        assert_eq!(hrp, "addr");
        assert_eq!(bytes.len(), 57);
        assert_eq!(bytes[0], 0x01);
        assert_eq!(&bytes[1..29], &[1u8; CREDENTIAL_LEN]);
        assert_eq!(&bytes[29..], &[2u8; CREDENTIAL_LEN]);
    }

    #[test]
    fn test_encode_reward_address_on_testnet() {
        let address = encode_address(AddressKind::Reward, Network::Testnet, None, Some(&credential(9))).unwrap();
        let (hrp, bytes) = decode_bech32_bytes(address.as_str()).unwrap();
        assert_eq!(hrp, "stake_test");
        assert_eq!(bytes[0], 0xe0);
        assert_eq!(bytes.len(), 29);
    }

    #[test]
    fn test_missing_credential_is_rejected() {
        let result = encode_address(AddressKind::Base, Network::Mainnet, Some(&credential(1)), None);
        assert!(matches!(result, Err(Error::Encoding { .. })));
    }

    #[test]
    fn test_credential_from_verification() {
        let vk = VerificationMaterial::new(hex::encode([5u8; 32]));
        let a = Credential::from_verification(&vk).unwrap();
        let b = Credential::from_verification(&vk).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_hex().len(), 56);
    }

    #[test]
    fn test_decode_prefix_rejects_garbage() {
        assert!(decode_prefix("not-an-address").is_err());
    }
}
