//! Derivation paths, the role catalogue and key pairs

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::config::Purpose;
use crate::error::{Error, Result};

/// Offset added to an index to mark it hardened
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// CIP-1852 wallet purpose
pub const PURPOSE_SINGLE_SIG: u32 = 1852;
/// CIP-1854 multisig purpose
pub const PURPOSE_MULTISIG: u32 = 1854;
/// SLIP-44 coin type
pub const COIN_TYPE: u32 = 1815;

/// One component of a derivation path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub index: u32,
    pub hardened: bool,
}

impl PathSegment {
    pub fn hardened(index: u32) -> Self {
        Self { index, hardened: true }
    }

    pub fn normal(index: u32) -> Self {
        Self { index, hardened: false }
    }

    /// Index with the hardened bit applied
    pub fn raw_index(&self) -> u32 {
        if self.hardened {
            HARDENED_OFFSET + self.index
        } else {
            self.index
        }
    }
}

/// An ordered list of path segments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivationPath {
    segments: Vec<PathSegment>,
}

impl DerivationPath {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// Parse `m/1852'/1815'/0'/0/0` or the toolchain form `1852H/1815H/0H/0/0`
    pub fn parse(path: &str) -> Result<Self> {
        let body = path.strip_prefix("m/").unwrap_or(path);
        if body.is_empty() {
            return Err(Error::Configuration(format!("Invalid derivation path: {path}")));
        }

        let mut segments = Vec::new();
        for component in body.split('/') {
            let hardened = component.ends_with('\'') || component.ends_with('H');
            let digits = component.trim_end_matches(['\'', 'H']);
            let index = digits.parse::<u32>().map_err(|_| {
                Error::Configuration(format!("Invalid derivation path component: {component}"))
            })?;
            if index >= HARDENED_OFFSET {
                return Err(Error::Configuration(format!(
                    "Derivation path component out of range: {component}"
                )));
            }
            segments.push(PathSegment { index, hardened });
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Path as accepted by `cardano-address key child` (no `m/`, `H` marks)
    pub fn to_toolchain_string(&self) -> String {
        self.segments
            .iter()
            .map(|s| {
                if s.hardened {
                    format!("{}H", s.index)
                } else {
                    s.index.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for s in &self.segments {
            if s.hardened {
                write!(f, "/{}'", s.index)?;
            } else {
                write!(f, "/{}", s.index)?;
            }
        }
        Ok(())
    }
}

/// Key roles of a stake-pool operator wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Payment,
    Stake,
    DRep,
    CcCold,
    CcHot,
    MultisigPayment,
    MultisigStake,
    MultisigDRep,
}

impl Role {
    /// Every role, in derivation order
    pub const ALL: [Role; 8] = [
        Role::Payment,
        Role::Stake,
        Role::DRep,
        Role::CcCold,
        Role::CcHot,
        Role::MultisigPayment,
        Role::MultisigStake,
        Role::MultisigDRep,
    ];

    /// Roles derived in simple mode
    pub const SIMPLE: [Role; 2] = [Role::Payment, Role::Stake];

    /// File stem and hashing label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Stake => "stake",
            Self::DRep => "drep",
            Self::CcCold => "cc-cold",
            Self::CcHot => "cc-hot",
            Self::MultisigPayment => "ms_payment",
            Self::MultisigStake => "ms_stake",
            Self::MultisigDRep => "ms_drep",
        }
    }

    /// Branch (fourth path component). Only payment depends on the purpose.
    pub fn branch(&self, purpose: Purpose) -> u32 {
        match self {
            Self::Payment => purpose.index(),
            Self::Stake | Self::MultisigStake => 2,
            Self::DRep | Self::MultisigDRep => 3,
            Self::CcCold => 4,
            Self::CcHot => 5,
            Self::MultisigPayment => 0,
        }
    }

    pub fn is_multisig(&self) -> bool {
        matches!(
            self,
            Self::MultisigPayment | Self::MultisigStake | Self::MultisigDRep
        )
    }

    /// `<purpose>'/1815'/0'/<branch>/0`
    pub fn path(&self, purpose: Purpose) -> DerivationPath {
        let wallet_purpose = if self.is_multisig() {
            PURPOSE_MULTISIG
        } else {
            PURPOSE_SINGLE_SIG
        };
        DerivationPath::new(vec![
            PathSegment::hardened(wallet_purpose),
            PathSegment::hardened(COIN_TYPE),
            PathSegment::hardened(0),
            PathSegment::normal(self.branch(purpose)),
            PathSegment::normal(0),
        ])
    }

    /// Key-type flag of `cardano-cli key convert-cardano-address-key`
    pub fn cli_key_flag(&self) -> &'static str {
        match self {
            Self::Payment | Self::MultisigPayment => "--shelley-payment-key",
            Self::Stake | Self::MultisigStake => "--shelley-stake-key",
            Self::DRep | Self::MultisigDRep => "--drep-key",
            Self::CcCold => "--cc-cold-key",
            Self::CcHot => "--cc-hot-key",
        }
    }

    /// Text-envelope type names for the signing and verification files
    pub fn envelope_types(&self) -> (&'static str, &'static str) {
        match self {
            Self::Payment | Self::MultisigPayment => (
                "PaymentExtendedSigningKeyShelley_ed25519_bip32",
                "PaymentExtendedVerificationKeyShelley_ed25519_bip32",
            ),
            Self::Stake | Self::MultisigStake => (
                "StakeExtendedSigningKeyShelley_ed25519_bip32",
                "StakeExtendedVerificationKeyShelley_ed25519_bip32",
            ),
            Self::DRep | Self::MultisigDRep => (
                "DRepExtendedSigningKey_ed25519_bip32",
                "DRepExtendedVerificationKey_ed25519_bip32",
            ),
            Self::CcCold => (
                "ConstitutionalCommitteeColdExtendedSigningKey_ed25519_bip32",
                "ConstitutionalCommitteeColdExtendedVerificationKey_ed25519_bip32",
            ),
            Self::CcHot => (
                "ConstitutionalCommitteeHotExtendedSigningKey_ed25519_bip32",
                "ConstitutionalCommitteeHotExtendedVerificationKey_ed25519_bip32",
            ),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Signing half of a key pair, in the textual form the backend produced.
///
/// Wiped on drop; `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningMaterial(Zeroizing<String>);

impl SigningMaterial {
    pub fn new(text: impl Into<String>) -> Self {
        Self(Zeroizing::new(text.into()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SigningMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningMaterial(redacted)")
    }
}

/// Verification half of a key pair: a bech32 extended key from the
/// toolchain, or hex from the local backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VerificationMaterial(String);

impl VerificationMaterial {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The raw 32-byte Ed25519 public key (chain code dropped)
    pub fn public_key_bytes(&self) -> Result<[u8; 32]> {
        let bytes = match hex::decode(&self.0) {
            Ok(bytes) => bytes,
            Err(_) => crate::crypto::address::decode_bech32_bytes(&self.0)
                .map(|(_, bytes)| bytes)?,
        };
        if bytes.len() < 32 {
            return Err(Error::encoding(
                "verification key",
                format!("expected at least 32 bytes, got {}", bytes.len()),
            ));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes[..32]);
        Ok(key)
    }
}

impl fmt::Display for VerificationMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A key pair for one role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    role: Role,
    signing: SigningMaterial,
    verification: VerificationMaterial,
}

impl KeyPair {
    pub fn new(role: Role, signing: SigningMaterial, verification: VerificationMaterial) -> Self {
        Self { role, signing, verification }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Get the signing material (SENSITIVE)
    pub fn signing(&self) -> &SigningMaterial {
        &self.signing
    }

    pub fn verification(&self) -> &VerificationMaterial {
        &self.verification
    }
}
