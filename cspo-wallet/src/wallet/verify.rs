//! Address self-verification
//!
//! Every address in a bundle is computed a second time through the same
//! backend calls and must match exactly. Each address is then validated:
//! strictly (bech32 decode, prefix matching kind and network) for toolchain
//! tiers, by prefix only for the local fallback.

use tracing::{debug, info};

use super::pipeline::WalletBundle;
use crate::backend::{DerivationBackend, ValidationMode};
use crate::crypto::address::{decode_prefix, Address, VALID_PREFIXES};
use crate::error::{Error, Result};

/// Recompute and validate every address of `bundle`
pub fn verify_bundle(backend: &dyn DerivationBackend, bundle: &WalletBundle) -> Result<()> {
    let mode = backend.validation_mode();

    for (&kind, address) in bundle.addresses() {
        let candidate = bundle.compute_address(backend, kind)?;
        if candidate.as_str() != address.as_str() {
            return Err(Error::VerificationMismatch {
                kind: kind.to_string(),
                first: address.to_string(),
                second: candidate.to_string(),
            });
        }
        validate_address(address, mode)?;
        debug!(kind = %kind, "address verified");
    }

    info!(
        addresses = bundle.addresses().len(),
        tier = %bundle.tier(),
        "address verification successful"
    );
    Ok(())
}

/// Validate the encoding of a single address
pub fn validate_address(address: &Address, mode: ValidationMode) -> Result<()> {
    let text = address.as_str();
    match mode {
        ValidationMode::Relaxed => {
            if text.starts_with("addr") || text.starts_with("stake") {
                Ok(())
            } else {
                Err(Error::encoding(
                    format!("{} address {text}", address.kind()),
                    "expected an addr or stake prefix",
                ))
            }
        }
        ValidationMode::Strict => {
            let hrp = decode_prefix(text)?;
            if !VALID_PREFIXES.contains(&hrp.as_str()) {
                return Err(Error::encoding(
                    format!("{} address {text}", address.kind()),
                    format!("unexpected prefix {hrp:?}"),
                ));
            }
            let expected = address.kind().prefix(address.network());
            if hrp != expected {
                return Err(Error::encoding(
                    format!("{} address {text}", address.kind()),
                    format!("prefix {hrp:?} does not match {expected:?} on {}", address.network()),
                ));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;
    use crate::crypto::address::AddressKind;

    fn bech32(hrp: &str) -> String {
        use bech32::{ToBase32, Variant};
        bech32::encode(hrp, [1u8; 29].to_base32(), Variant::Bech32).unwrap()
    }

    #[test]
    fn test_strict_validation() {
        let good = Address::new(AddressKind::Reward, Network::Mainnet, bech32("stake"));
        assert!(validate_address(&good, ValidationMode::Strict).is_ok());

        let wrong_network = Address::new(AddressKind::Reward, Network::Mainnet, bech32("stake_test"));
        assert!(validate_address(&wrong_network, ValidationMode::Strict).is_err());

        let wrong_kind = Address::new(AddressKind::Base, Network::Mainnet, bech32("stake"));
        assert!(validate_address(&wrong_kind, ValidationMode::Strict).is_err());

        let foreign = Address::new(AddressKind::Base, Network::Mainnet, bech32("bc"));
        assert!(validate_address(&foreign, ValidationMode::Strict).is_err());

        let undecodable = Address::new(AddressKind::Base, Network::Mainnet, "addr1notbech32");
        assert!(validate_address(&undecodable, ValidationMode::Strict).is_err());
    }

    #[test]
    fn test_relaxed_validation() {
        let plain = Address::new(AddressKind::Base, Network::Mainnet, "addr1notbech32");
        assert!(validate_address(&plain, ValidationMode::Relaxed).is_ok());

        let bad = Address::new(AddressKind::Base, Network::Mainnet, "xyz1abc");
        assert!(matches!(
            validate_address(&bad, ValidationMode::Relaxed),
            Err(Error::Encoding { .. })
        ));
    }
}
