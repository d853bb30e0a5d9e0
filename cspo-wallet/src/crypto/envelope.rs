//! Text envelopes for key and certificate files

use ciborium::Value;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::address::{decode_bech32_bytes, Credential};
use crate::crypto::keys::{KeyPair, Role};
use crate::error::{Error, Result};

/// JSON wrapper used by `.skey`, `.vkey` and `.cert` files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(rename = "cborHex")]
    pub cbor_hex: String,
}

impl KeyEnvelope {
    /// Wrap raw bytes as a CBOR byte string
    pub fn from_bytes(kind: impl Into<String>, description: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let kind = kind.into();
        let cbor_hex = cbor_hex(&kind, bytes)?;
        Ok(Self {
            kind,
            description: description.into(),
            cbor_hex,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::encoding(format!("{} envelope", self.kind), e))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::encoding("text envelope", e))
    }
}

/// Hex of `bytes` encoded as a single CBOR byte string
fn cbor_hex(subject: &str, bytes: &[u8]) -> Result<String> {
    let mut value = Value::Bytes(bytes.to_vec());
    let mut buf = Zeroizing::new(Vec::with_capacity(bytes.len() + 9));
    let encoded = ciborium::into_writer(&value, &mut *buf);
    if let Value::Bytes(copy) = &mut value {
        copy.zeroize();
    }
    encoded.map_err(|e| Error::encoding(format!("{subject} envelope"), format!("CBOR serialization failed: {e}")))?;
    Ok(hex::encode(&*buf))
}

/// Key text is either hex (local backend) or bech32 (toolchain)
fn key_bytes(text: &str) -> Result<Vec<u8>> {
    match hex::decode(text.trim()) {
        Ok(bytes) => Ok(bytes),
        Err(_) => decode_bech32_bytes(text.trim()).map(|(_, bytes)| bytes),
    }
}

fn describe(role: Role, half: &str) -> String {
    let name = match role {
        Role::Payment => "Payment",
        Role::Stake => "Stake",
        Role::DRep => "Delegate Representative",
        Role::CcCold => "Constitutional Committee Cold",
        Role::CcHot => "Constitutional Committee Hot",
        Role::MultisigPayment => "Multisig Payment",
        Role::MultisigStake => "Multisig Stake",
        Role::MultisigDRep => "Multisig Delegate Representative",
    };
    format!("{name} {half} Key")
}

/// Render `(skey, vkey)` JSON for a key pair without the external toolchain
pub fn render_local_envelopes(pair: &KeyPair) -> Result<(String, String)> {
    let (skey_type, vkey_type) = pair.role().envelope_types();

    let signing = Zeroizing::new(key_bytes(pair.signing().expose())?);
    let skey = KeyEnvelope::from_bytes(skey_type, describe(pair.role(), "Signing"), &signing)?;
    let vkey = KeyEnvelope::from_bytes(
        vkey_type,
        describe(pair.role(), "Verification"),
        &key_bytes(pair.verification().as_str())?,
    )?;

    Ok((skey.to_json()?, vkey.to_json()?))
}

/// Stake registration certificate stand-in. Not valid for submission.
pub fn placeholder_registration_cert(stake: &Credential) -> Result<String> {
    KeyEnvelope::from_bytes(
        "CertificateShelley",
        "Stake Address Registration Certificate (placeholder)",
        stake.as_bytes(),
    )?
    .to_json()
}

/// Stake delegation certificate stand-in. Not valid for submission.
pub fn placeholder_delegation_cert(stake: &Credential) -> Result<String> {
    KeyEnvelope::from_bytes(
        "CertificateShelley",
        "Stake Delegation Certificate (placeholder)",
        stake.as_bytes(),
    )?
    .to_json()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{SigningMaterial, VerificationMaterial};

    #[test]
    fn test_cbor_byte_string_headers() {
        assert_eq!(cbor_hex("t", &[1, 2]).unwrap(), "420102");
        assert!(cbor_hex("t", &[0u8; 32]).unwrap().starts_with("5820"));
        assert!(cbor_hex("t", &[0u8; 96]).unwrap().starts_with("5860"));
        assert!(cbor_hex("t", &[0u8; 300]).unwrap().starts_with("59012c"));

        let decoded: Value = ciborium::from_reader(hex::decode(cbor_hex("t", &[7u8; 64]).unwrap()).unwrap().as_slice()).unwrap();
        assert_eq!(decoded, Value::Bytes(vec![7u8; 64]));
    }

    #[test]
    fn test_render_local_envelopes() {
        let pair = KeyPair::new(
            Role::Stake,
            SigningMaterial::new(hex::encode([1u8; 32])),
            VerificationMaterial::new(hex::encode([2u8; 32])),
        );
        let (skey, vkey) = render_local_envelopes(&pair).unwrap();

        let skey = KeyEnvelope::from_json(&skey).unwrap();
        assert_eq!(skey.kind, "StakeExtendedSigningKeyShelley_ed25519_bip32");
        assert!(skey.cbor_hex.starts_with("5820"));

        let vkey = KeyEnvelope::from_json(&vkey).unwrap();
        assert_eq!(vkey.description, "Stake Verification Key");
        assert_eq!(vkey.cbor_hex, format!("5820{}", hex::encode([2u8; 32])));
    }

    #[test]
    fn test_envelope_json_field_names() {
        let envelope = KeyEnvelope::from_bytes("T", "D", &[0xab]).unwrap();
        let json = envelope.to_json().unwrap();
        assert!(json.contains("\"type\""));
        assert!(json.contains("\"cborHex\": \"41ab\""));
    }
}
