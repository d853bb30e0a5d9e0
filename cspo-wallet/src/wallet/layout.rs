//! Wallet directory layout and persistence
//!
//! ```text
//! <home>/.CSPO_<TICKER>/<purpose>/<TICKER>-<purpose>.{base_addr,reward_addr,staking_skey,staking_vkey,mnemonic.txt}
//! ```
//! Complete mode adds per-role `.skey`/`.vkey` envelopes, `.addr` files,
//! credentials and placeholder certificates.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use zeroize::Zeroizing;

use super::pipeline::WalletBundle;
use crate::backend::DerivationBackend;
use crate::config::{ticker_dir, CspoConfig, GenerationMode, Purpose, Ticker};
use crate::crypto::address::{AddressKind, Credential};
use crate::crypto::envelope::{placeholder_delegation_cert, placeholder_registration_cert};
use crate::crypto::keys::Role;
use crate::error::{Error, Result};
use crate::perms::{create_private_dir, write_private, write_public};
use crate::storage::{is_encrypted_name, is_sensitive_name};

/// Files an export bundle needs, by extension
pub const EXPORT_EXTENSIONS: [&str; 4] = ["base_addr", "reward_addr", "staking_skey", "staking_vkey"];

/// Roles whose credentials are written in complete mode
const CREDENTIAL_ROLES: [Role; 4] = [
    Role::Payment,
    Role::Stake,
    Role::MultisigPayment,
    Role::MultisigStake,
];

/// One file of a rendered wallet
#[derive(Clone)]
pub struct WalletFile {
    name: String,
    contents: Zeroizing<Vec<u8>>,
}

impl WalletFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: Zeroizing::new(contents.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// Signing keys and mnemonics
    pub fn is_sensitive(&self) -> bool {
        is_sensitive_name(&self.name)
    }
}

impl std::fmt::Debug for WalletFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletFile")
            .field("name", &self.name)
            .field("len", &self.contents.len())
            .finish()
    }
}

/// Location and naming of one (ticker, purpose) wallet
#[derive(Debug, Clone)]
pub struct WalletLayout {
    ticker: Ticker,
    purpose: Purpose,
    dir: PathBuf,
}

impl WalletLayout {
    pub fn new(home: &Path, ticker: &Ticker, purpose: Purpose) -> Self {
        Self {
            ticker: ticker.clone(),
            purpose,
            dir: ticker_dir(home, ticker).join(purpose.as_str()),
        }
    }

    pub fn from_config(config: &CspoConfig, ticker: &Ticker, purpose: Purpose) -> Self {
        Self::new(&config.home_dir, ticker, purpose)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<TICKER>-<purpose>.<extension>`
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}-{}.{extension}", self.ticker.as_str(), self.purpose.as_str())
    }

    pub fn path(&self, extension: &str) -> PathBuf {
        self.dir.join(self.file_name(extension))
    }

    /// Render every file of `bundle`. Nothing is written.
    pub fn render(&self, bundle: &WalletBundle, backend: &dyn DerivationBackend) -> Result<Vec<WalletFile>> {
        let stake = bundle.key(Role::Stake)?;
        let mut files = vec![
            WalletFile::new(self.file_name("base_addr"), bundle.address(AddressKind::Base)?.as_str()),
            WalletFile::new(self.file_name("reward_addr"), bundle.address(AddressKind::Reward)?.as_str()),
            WalletFile::new(self.file_name("staking_skey"), stake.signing().expose()),
            WalletFile::new(self.file_name("staking_vkey"), stake.verification().as_str()),
            WalletFile::new(self.file_name("mnemonic.txt"), bundle.mnemonic().as_str()),
        ];

        if bundle.mode() == GenerationMode::Complete {
            for kind in [AddressKind::Base, AddressKind::Payment, AddressKind::Reward] {
                files.push(WalletFile::new(
                    format!("{kind}.addr"),
                    bundle.address(kind)?.as_str(),
                ));
            }

            for (role, pair) in bundle.keys() {
                let (skey, vkey) = backend.render_key_envelopes(pair)?;
                files.push(WalletFile::new(format!("{}.skey", role.label()), skey));
                files.push(WalletFile::new(format!("{}.vkey", role.label()), vkey));
            }

            for role in CREDENTIAL_ROLES {
                let credential = Credential::from_verification(bundle.key(role)?.verification())?;
                files.push(WalletFile::new(format!("{}.cred", role.label()), credential.to_hex()));
            }

            let stake_credential = Credential::from_verification(stake.verification())?;
            files.push(WalletFile::new("stake.cert", placeholder_registration_cert(&stake_credential)?));
            files.push(WalletFile::new("delegation.cert", placeholder_delegation_cert(&stake_credential)?));
        }

        Ok(files)
    }

    /// Replace the wallet directory with exactly `files`.
    ///
    /// Files are written to a staging directory next to the wallet
    /// directory and swapped in with renames. If the swap fails the
    /// previous directory is put back. A directory holding `.enc` files is
    /// never replaced; those must be restored or removed first.
    pub fn persist(&self, files: &[WalletFile]) -> Result<Vec<PathBuf>> {
        let secured = self.secured_files()?;
        if !secured.is_empty() {
            warn!(dir = %self.dir.display(), count = secured.len(), "refusing to overwrite secured wallet");
            return Err(Error::SecuredWallet {
                dir: self.dir.clone(),
                files: secured,
            });
        }

        let parent = self
            .dir
            .parent()
            .ok_or_else(|| Error::Configuration(format!("wallet dir {} has no parent", self.dir.display())))?;
        create_private_dir(parent)?;

        let staging = tempfile::Builder::new()
            .prefix(&format!(".{}-staging-", self.purpose.as_str()))
            .tempdir_in(parent)
            .map_err(|e| Error::io(parent, e))?;

        for file in files {
            let path = staging.path().join(file.name());
            if file.is_sensitive() {
                write_private(&path, file.contents())?;
            } else {
                write_public(&path, file.contents())?;
            }
        }

        let backup = parent.join(format!(".{}.previous", self.purpose.as_str()));
        if backup.exists() {
            fs::remove_dir_all(&backup).map_err(|e| Error::io(&backup, e))?;
        }

        let had_previous = self.dir.exists();
        if had_previous {
            fs::rename(&self.dir, &backup).map_err(|e| Error::io(&self.dir, e))?;
        }

        if let Err(e) = fs::rename(staging.path(), &self.dir) {
            if had_previous {
                if let Err(restore) = fs::rename(&backup, &self.dir) {
                    warn!(error = %restore, backup = %backup.display(), "failed to restore previous wallet directory");
                }
            }
            return Err(Error::io(&self.dir, e));
        }
        create_private_dir(&self.dir)?;

        if had_previous {
            if let Err(e) = fs::remove_dir_all(&backup) {
                warn!(error = %e, path = %backup.display(), "failed to remove previous wallet directory");
            }
        }

        info!(dir = %self.dir.display(), files = files.len(), "wallet files written");
        Ok(files.iter().map(|f| self.dir.join(f.name())).collect())
    }

    /// Check the plaintext export files exist and return their paths
    pub fn verify_export_ready(&self) -> Result<Vec<PathBuf>> {
        let paths: Vec<PathBuf> = EXPORT_EXTENSIONS.iter().map(|ext| self.path(ext)).collect();
        let missing: Vec<String> = paths
            .iter()
            .filter(|p| !p.is_file())
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();

        if !missing.is_empty() {
            return Err(Error::MissingExportFiles {
                dir: self.dir.clone(),
                missing,
            });
        }
        Ok(paths)
    }

    /// File names in the wallet directory, sorted
    pub fn list_files(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&self.dir, e))?;
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if is_file {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Encrypted files in the wallet directory, empty if it does not exist
    pub fn secured_files(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = self.list_files()?;
        names.retain(|name| is_encrypted_name(name));
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(home: &Path) -> WalletLayout {
        WalletLayout::new(home, &Ticker::new("TEST").unwrap(), Purpose::Pledge)
    }

    #[test]
    fn test_file_names() {
        let layout = layout(Path::new("/home/op"));
        assert_eq!(layout.file_name("base_addr"), "TEST-pledge.base_addr");
        assert_eq!(layout.dir(), Path::new("/home/op/.CSPO_TEST/pledge"));
    }

    #[test]
    fn test_persist_replaces_directory() {
        let home = tempfile::tempdir().unwrap();
        let layout = layout(home.path());

        layout
            .persist(&[WalletFile::new("old.txt", "old"), WalletFile::new("keep.txt", "v1")])
            .unwrap();
        layout.persist(&[WalletFile::new("keep.txt", "v2")]).unwrap();

        assert_eq!(layout.list_files().unwrap(), vec!["keep.txt".to_string()]);
        assert_eq!(fs::read_to_string(layout.dir().join("keep.txt")).unwrap(), "v2");

        // No staging or backup directories are left behind.
        let siblings: Vec<_> = fs::read_dir(layout.dir().parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(siblings, vec!["pledge".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_sensitive_files_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let home = tempfile::tempdir().unwrap();
        let layout = layout(home.path());
        layout
            .persist(&[
                WalletFile::new("TEST-pledge.staking_skey", "secret"),
                WalletFile::new("TEST-pledge.base_addr", "addr1"),
            ])
            .unwrap();

        let mode = |name: &str| fs::metadata(layout.dir().join(name)).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode("TEST-pledge.staking_skey"), 0o600);
        assert_ne!(mode("TEST-pledge.base_addr"), 0o600);
    }

    #[test]
    fn test_verify_export_ready() {
        let home = tempfile::tempdir().unwrap();
        let layout = layout(home.path());
        layout
            .persist(&[
                WalletFile::new(layout.file_name("base_addr"), "addr1"),
                WalletFile::new(layout.file_name("reward_addr"), "stake1"),
            ])
            .unwrap();

        match layout.verify_export_ready() {
            Err(Error::MissingExportFiles { missing, .. }) => {
                assert_eq!(missing, vec!["TEST-pledge.staking_skey", "TEST-pledge.staking_vkey"]);
            }
            other => panic!("expected missing files, got {other:?}"),
        }
    }

    #[test]
    fn test_list_files_missing_dir() {
        let home = tempfile::tempdir().unwrap();
        assert!(matches!(layout(home.path()).list_files(), Err(Error::Io { .. })));
    }
}
