//! Error types for the cspo-wallet library

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Custom error type for wallet-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed ticker, purpose, network or home directory
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Mnemonic error in {}: {reason} (restore the file from backup; it is never regenerated automatically)", path.display())]
    Mnemonic { path: PathBuf, reason: String },

    /// A tool of the external toolchain is absent or not runnable
    #[error("Toolchain unavailable: {tool}: {reason} (falling back to local derivation)")]
    ToolchainUnavailable { tool: String, reason: String },

    /// Subprocess failure or malformed output during derivation
    #[error("Key derivation error in {stage}: {reason} (files from this run are untrusted; regenerate)")]
    Derivation { stage: String, reason: String },

    #[error("Address verification failed: {kind} address mismatch ({first} != {second}); nothing was written, regenerate the wallet")]
    VerificationMismatch {
        kind: String,
        first: String,
        second: String,
    },

    #[error("Encoding error for {subject}: {reason}")]
    Encoding { subject: String, reason: String },

    /// Wrong password or tampered ciphertext
    #[error("Authentication failed for {file}: wrong password or corrupted file (no data was changed)")]
    Authentication { file: String },

    #[error("Secured file not found: {name} (run view without a file name to list secured files)")]
    SecuredFileNotFound { name: String },

    #[error("No sensitive files found in {}", dir.display())]
    NoSensitiveFiles { dir: PathBuf },

    #[error("No secured files found in {}", dir.display())]
    NoSecuredFiles { dir: PathBuf },

    /// Plaintext and encrypted forms of the same file coexist
    #[error("Conflicting files at {}: remove either the plaintext or the .enc copy", path.display())]
    Conflict { path: PathBuf },

    /// Regeneration would overwrite a wallet whose keys are encrypted at rest
    #[error("Wallet at {} holds secured files {files:?}: restore or remove the secured files first", dir.display())]
    SecuredWallet { dir: PathBuf, files: Vec<String> },

    #[error("Cannot export {}: missing required files {missing:?} (regenerate or restore the wallet first)", dir.display())]
    MissingExportFiles { dir: PathBuf, missing: Vec<String> },

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap an I/O error with the path it concerns
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn derivation(stage: impl Into<String>, reason: impl ToString) -> Self {
        Self::Derivation {
            stage: stage.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn encoding(subject: impl Into<String>, reason: impl ToString) -> Self {
        Self::Encoding {
            subject: subject.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether a toolchain tier may recover from this error by retrying
    /// the operation against the local fallback backend.
    pub fn is_downgrade_eligible(&self) -> bool {
        matches!(
            self,
            Self::ToolchainUnavailable { .. } | Self::Derivation { .. }
        )
    }

    /// Whether this is an authentication failure (wrong password)
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

/// Result type for wallet-core operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downgrade_eligibility() {
        assert!(Error::derivation("cardano-address key child", "exit status 1").is_downgrade_eligible());
        assert!(Error::ToolchainUnavailable {
            tool: "cardano-cli".to_string(),
            reason: "not found".to_string(),
        }
        .is_downgrade_eligible());

        let mismatch = Error::VerificationMismatch {
            kind: "base".to_string(),
            first: "addr1a".to_string(),
            second: "addr1b".to_string(),
        };
        assert!(!mismatch.is_downgrade_eligible());
        assert!(!Error::encoding("base address", "bad prefix").is_downgrade_eligible());
        assert!(!Error::Authentication { file: "payment.skey".to_string() }.is_downgrade_eligible());
    }

    #[test]
    fn test_io_error_names_path() {
        let err = Error::io("/tmp/wallet/payment.skey", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(err.to_string().contains("/tmp/wallet/payment.skey"));
    }
}
