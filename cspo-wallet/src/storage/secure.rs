//! Secure, view and restore
//!
//! `secure` encrypts every sensitive file of a directory to `<name>.enc`
//! and removes the plaintext. `restore` reverses it. Both work in a staging
//! directory first and only touch the real files once every file has been
//! processed, so a wrong password or a bad file leaves the directory as it
//! was. `view` decrypts in memory only.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::cipher::{decrypt, encrypt};
use crate::error::{Error, Result};
use crate::perms::write_private;
use crate::wallet::WalletLayout;

/// Marker extension of encrypted files
pub const ENCRYPTED_EXTENSION: &str = "enc";

const SENSITIVE_SUFFIXES: [&str; 3] = [".skey", "_skey", "mnemonic.txt"];

/// Whether a plaintext file name holds signing keys or a mnemonic
pub fn is_sensitive_name(name: &str) -> bool {
    SENSITIVE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

fn encrypted_name(name: &str) -> String {
    format!("{name}.{ENCRYPTED_EXTENSION}")
}

/// Whether a file name is an encrypted `<name>.enc` file
pub fn is_encrypted_name(name: &str) -> bool {
    logical_name(name).is_some()
}

fn logical_name(encrypted: &str) -> Option<&str> {
    encrypted
        .strip_suffix(ENCRYPTED_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
        .filter(|s| !s.is_empty())
}

/// Plaintext sensitive files and encrypted files of a directory
struct Scan {
    sensitive: Vec<String>,
    encrypted: Vec<String>,
}

fn scan(dir: &Path) -> Result<Scan> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut sensitive = Vec::new();
    let mut encrypted = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if logical_name(&name).is_some() {
            encrypted.push(name);
        } else if is_sensitive_name(&name) {
            sensitive.push(name);
        }
    }

    sensitive.sort();
    encrypted.sort();

    for name in &sensitive {
        if encrypted.contains(&encrypted_name(name)) {
            return Err(Error::Conflict { path: dir.join(name) });
        }
    }

    Ok(Scan { sensitive, encrypted })
}

fn staging_dir(dir: &Path) -> Result<tempfile::TempDir> {
    tempfile::Builder::new()
        .prefix(".secure-")
        .tempdir_in(dir)
        .map_err(|e| Error::io(dir, e))
}

/// Move staged files into `dir`, then delete `originals`.
///
/// If a rename fails, files already moved are removed again and the
/// originals stay in place.
fn commit(dir: &Path, staging: &Path, staged: &[String], originals: &[String]) -> Result<()> {
    let mut committed: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for name in staged {
        let target = dir.join(name);
        if let Err(e) = fs::rename(staging.join(name), &target) {
            for path in &committed {
                if let Err(undo) = fs::remove_file(path) {
                    warn!(error = %undo, path = %path.display(), "failed to roll back staged file");
                }
            }
            return Err(Error::io(&target, e));
        }
        committed.push(target);
    }

    for name in originals {
        let path = dir.join(name);
        fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
    }
    Ok(())
}

/// Encrypt every sensitive file in `dir`. Returns the secured file names.
pub fn secure(dir: &Path, password: &str) -> Result<Vec<String>> {
    let scan = scan(dir)?;
    if scan.sensitive.is_empty() {
        return Err(Error::NoSensitiveFiles { dir: dir.to_path_buf() });
    }

    let staging = staging_dir(dir)?;
    let mut staged = Vec::with_capacity(scan.sensitive.len());
    for name in &scan.sensitive {
        let path = dir.join(name);
        let plaintext = Zeroizing::new(fs::read(&path).map_err(|e| Error::io(&path, e))?);
        let envelope = encrypt(password, &plaintext, name)?;

        let target = encrypted_name(name);
        write_private(&staging.path().join(&target), &envelope)?;
        debug!(file = %name, "file encrypted");
        staged.push(target);
    }

    commit(dir, staging.path(), &staged, &scan.sensitive)?;
    info!(dir = %dir.display(), files = staged.len(), "sensitive files secured");
    Ok(scan.sensitive)
}

/// Names of the encrypted files in `dir`, marker stripped.
///
/// Every file is decrypted first, so a wrong password always fails.
pub fn list_secured(dir: &Path, password: &str) -> Result<Vec<String>> {
    let scan = scan(dir)?;
    if scan.encrypted.is_empty() {
        return Err(Error::NoSecuredFiles { dir: dir.to_path_buf() });
    }

    let mut names = Vec::with_capacity(scan.encrypted.len());
    for encrypted in &scan.encrypted {
        let path = dir.join(encrypted);
        let envelope = fs::read(&path).map_err(|e| Error::io(&path, e))?;
        decrypt(password, &envelope, encrypted)?;
        if let Some(name) = logical_name(encrypted) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Decrypt one secured file in memory. `name` may include the marker.
pub fn view_file(dir: &Path, password: &str, name: &str) -> Result<Zeroizing<Vec<u8>>> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(Error::Configuration(format!("invalid secured file name {name:?}")));
    }

    let logical = logical_name(name).unwrap_or(name);
    let encrypted = encrypted_name(logical);
    let path = dir.join(&encrypted);
    if !path.is_file() {
        return Err(Error::SecuredFileNotFound {
            name: logical.to_string(),
        });
    }

    let envelope = fs::read(&path).map_err(|e| Error::io(&path, e))?;
    decrypt(password, &envelope, &encrypted)
}

/// Result of [`view`]
pub enum ViewOutput {
    /// Logical names of the secured files
    Listing(Vec<String>),
    /// Plaintext of one file, never written to disk
    Contents {
        name: String,
        plaintext: Zeroizing<Vec<u8>>,
    },
}

impl std::fmt::Debug for ViewOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Listing(names) => f.debug_tuple("Listing").field(names).finish(),
            Self::Contents { name, .. } => f.debug_struct("Contents").field("name", name).finish_non_exhaustive(),
        }
    }
}

/// List secured files, or decrypt one when `name` is given
pub fn view(dir: &Path, password: &str, name: Option<&str>) -> Result<ViewOutput> {
    match name {
        None => list_secured(dir, password).map(ViewOutput::Listing),
        Some(name) => {
            let plaintext = view_file(dir, password, name)?;
            let name = logical_name(name).unwrap_or(name).to_string();
            Ok(ViewOutput::Contents { name, plaintext })
        }
    }
}

/// Decrypt every secured file back to its original name.
/// Returns the restored file names.
pub fn restore(dir: &Path, password: &str) -> Result<Vec<String>> {
    let scan = scan(dir)?;
    if scan.encrypted.is_empty() {
        return Err(Error::NoSecuredFiles { dir: dir.to_path_buf() });
    }

    let staging = staging_dir(dir)?;
    let mut staged = Vec::with_capacity(scan.encrypted.len());
    for encrypted in &scan.encrypted {
        let name = match logical_name(encrypted) {
            Some(name) => name.to_string(),
            None => continue,
        };
        if dir.join(&name).exists() {
            return Err(Error::Conflict { path: dir.join(&name) });
        }

        let path = dir.join(encrypted);
        let envelope = fs::read(&path).map_err(|e| Error::io(&path, e))?;
        let plaintext = decrypt(password, &envelope, encrypted)?;
        write_private(&staging.path().join(&name), &plaintext)?;
        debug!(file = %name, "file decrypted");
        staged.push(name);
    }

    commit(dir, staging.path(), &staged, &scan.encrypted)?;
    info!(dir = %dir.display(), files = staged.len(), "secured files restored");
    Ok(staged)
}

/// Secure a wallet's directory
pub fn secure_wallet(layout: &WalletLayout, password: &str) -> Result<Vec<String>> {
    secure(layout.dir(), password)
}

/// View a wallet's secured files
pub fn view_wallet(layout: &WalletLayout, password: &str, name: Option<&str>) -> Result<ViewOutput> {
    view(layout.dir(), password, name)
}

/// Restore a wallet's secured files
pub fn restore_wallet(layout: &WalletLayout, password: &str) -> Result<Vec<String>> {
    restore(layout.dir(), password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitivity_patterns() {
        assert!(is_sensitive_name("payment.skey"));
        assert!(is_sensitive_name("TEST-pledge.staking_skey"));
        assert!(is_sensitive_name("TEST-pledge.mnemonic.txt"));
        assert!(is_sensitive_name("TEST-shared.mnemonic.txt"));
        assert!(!is_sensitive_name("payment.vkey"));
        assert!(!is_sensitive_name("TEST-pledge.staking_vkey"));
        assert!(!is_sensitive_name("payment.skey.enc"));
        assert!(!is_sensitive_name("base.addr"));
    }

    #[test]
    fn test_logical_name() {
        assert_eq!(logical_name("payment.skey.enc"), Some("payment.skey"));
        assert_eq!(logical_name("payment.skey"), None);
        assert_eq!(logical_name(".enc"), None);
    }

    #[test]
    fn test_conflict_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("payment.skey"), "plain").unwrap();
        fs::write(dir.path().join("payment.skey.enc"), "cipher").unwrap();

        assert!(matches!(secure(dir.path(), "p1"), Err(Error::Conflict { .. })));
        assert!(matches!(restore(dir.path(), "p1"), Err(Error::Conflict { .. })));
    }

    #[test]
    fn test_view_rejects_path_names() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            view_file(dir.path(), "p1", "../payment.skey"),
            Err(Error::Configuration(_))
        ));
    }
}
