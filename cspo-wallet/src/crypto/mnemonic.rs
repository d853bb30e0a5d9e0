//! Mnemonic phrase generation and handling

use std::fmt;

use bip39::Mnemonic;
use rand::{rngs::OsRng, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{Error, Result};

/// Supported mnemonic strengths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MnemonicStrength {
    /// 12 words (128 bits)
    Words12,
    /// 24 words (256 bits)
    Words24,
}

impl MnemonicStrength {
    /// Get entropy length in bytes
    fn entropy_bytes(&self) -> usize {
        match self {
            Self::Words12 => 16, // 128 bits = 16 bytes
            Self::Words24 => 32, // 256 bits = 32 bytes
        }
    }

    /// Number of words in a phrase of this strength
    pub fn word_count(&self) -> usize {
        match self {
            Self::Words12 => 12,
            Self::Words24 => 24,
        }
    }
}

/// A validated BIP39 phrase.
///
/// The words are kept in a buffer that is wiped on drop, and `Debug`
/// never prints them.
#[derive(Clone, PartialEq, Eq)]
pub struct MnemonicPhrase(Zeroizing<String>);

impl MnemonicPhrase {
    /// Parse a phrase, trimming surrounding whitespace
    pub fn parse(phrase: &str) -> Result<Self> {
        let trimmed = phrase.trim();
        validate_mnemonic(trimmed)?;
        Ok(Self(Zeroizing::new(trimmed.to_string())))
    }

    /// The phrase as stored on disk
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn word_count(&self) -> usize {
        self.0.split_whitespace().count()
    }

    /// 64-byte BIP39 seed with an empty passphrase
    pub fn to_seed(&self) -> Result<Zeroizing<Vec<u8>>> {
        mnemonic_to_seed(&self.0, None).map(Zeroizing::new)
    }
}

impl fmt::Debug for MnemonicPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MnemonicPhrase({} words, redacted)", self.word_count())
    }
}

/// Generate a new random mnemonic phrase with the given strength
pub fn generate_mnemonic(strength: MnemonicStrength) -> Result<MnemonicPhrase> {
    let mut entropy = vec![0u8; strength.entropy_bytes()];
    OsRng.fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy(&entropy);
    entropy.zeroize();
    let mnemonic = mnemonic.map_err(|e| Error::Configuration(format!("mnemonic generation failed: {e}")))?;

    Ok(MnemonicPhrase(Zeroizing::new(mnemonic.to_string())))
}

/// Validate a mnemonic phrase
pub fn validate_mnemonic(phrase: &str) -> Result<()> {
    Mnemonic::parse_normalized(phrase)
        .map(|_| ())
        .map_err(|e| Error::Configuration(format!("invalid BIP39 phrase: {e}")))
}

/// Generate a seed from a mnemonic phrase and optional passphrase
pub fn mnemonic_to_seed(phrase: &str, passphrase: Option<&str>) -> Result<Vec<u8>> {
    let mnemonic = Mnemonic::parse_normalized(phrase)
        .map_err(|e| Error::Configuration(format!("invalid BIP39 phrase: {e}")))?;

    let seed = mnemonic.to_seed(passphrase.unwrap_or(""));
    Ok(seed.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_generate_mnemonic() {
        let mnemonic = generate_mnemonic(MnemonicStrength::Words24).unwrap();
        assert!(validate_mnemonic(mnemonic.as_str()).is_ok());
        assert_eq!(mnemonic.word_count(), 24);

        let short = generate_mnemonic(MnemonicStrength::Words12).unwrap();
        assert_eq!(short.word_count(), MnemonicStrength::Words12.word_count());
    }

    #[test]
    fn test_validate_mnemonic() {
        let invalid = "invalid mnemonic phrase test test test test test test test test test";

        assert!(validate_mnemonic(TEST_MNEMONIC).is_ok());
        assert!(validate_mnemonic(invalid).is_err());
    }

    #[test]
    fn test_mnemonic_to_seed() {
        let seed = mnemonic_to_seed(TEST_MNEMONIC, None).unwrap();

        // BIP39 seeds are 512 bits (64 bytes)
        assert_eq!(seed.len(), 64);
    }

    #[test]
    fn test_phrase_is_trimmed_and_redacted() {
        let phrase = MnemonicPhrase::parse(&format!("  {TEST_MNEMONIC}\n")).unwrap();
        assert_eq!(phrase.as_str(), TEST_MNEMONIC);

        let debug = format!("{phrase:?}");
        assert!(!debug.contains("abandon"));
        assert!(debug.contains("12 words"));
    }
}
