//! Per-ticker mnemonic storage
//!
//! Each ticker owns exactly one phrase. It is created on first use, reused
//! for every purpose afterwards and never overwritten.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::info;

use crate::config::{ticker_dir, Ticker};
use crate::crypto::mnemonic::{generate_mnemonic, MnemonicPhrase, MnemonicStrength};
use crate::error::{Error, Result};
use crate::perms::create_private_dir;

/// Keyed store from ticker to its mnemonic phrase
pub trait MnemonicStore {
    /// Return the ticker's phrase, creating and persisting it on first use
    fn get_or_create(&self, ticker: &Ticker) -> Result<MnemonicPhrase>;
}

/// On-disk store at `<home>/.CSPO_<TICKER>/<TICKER>-shared.mnemonic.txt`
#[derive(Debug, Clone)]
pub struct FileMnemonicStore {
    home_dir: PathBuf,
}

impl FileMnemonicStore {
    pub fn new(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
        }
    }

    /// Path of the shared phrase for `ticker`
    pub fn phrase_path(&self, ticker: &Ticker) -> PathBuf {
        ticker_dir(&self.home_dir, ticker).join(format!("{}-shared.mnemonic.txt", ticker.as_str()))
    }

    fn load(path: &Path) -> Result<MnemonicPhrase> {
        let text = zeroize::Zeroizing::new(fs::read_to_string(path).map_err(|e| Error::io(path, e))?);
        MnemonicPhrase::parse(&text).map_err(|e| Error::Mnemonic {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Create the file exclusively; `Ok(false)` if it already exists
    fn create(path: &Path, phrase: &MnemonicPhrase) -> Result<bool> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = match options.open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(Error::io(path, e)),
        };
        file.write_all(phrase.as_str().as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| Error::io(path, e))?;
        Ok(true)
    }
}

impl MnemonicStore for FileMnemonicStore {
    fn get_or_create(&self, ticker: &Ticker) -> Result<MnemonicPhrase> {
        let path = self.phrase_path(ticker);
        if path.exists() {
            info!(ticker = %ticker, "using existing shared mnemonic");
            return Self::load(&path);
        }

        if let Some(parent) = path.parent() {
            create_private_dir(parent)?;
        }

        let phrase = generate_mnemonic(MnemonicStrength::Words24)?;
        if Self::create(&path, &phrase)? {
            info!(ticker = %ticker, path = %path.display(), "created shared mnemonic");
            Ok(phrase)
        } else {
            // Another process created it between the check and the write.
            Self::load(&path)
        }
    }
}

/// In-memory store for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryMnemonicStore {
    phrases: Mutex<HashMap<Ticker, MnemonicPhrase>>,
}

impl MemoryMnemonicStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a known phrase
    pub fn insert(&self, ticker: Ticker, phrase: MnemonicPhrase) {
        let mut phrases = self.phrases.lock().unwrap_or_else(|e| e.into_inner());
        phrases.insert(ticker, phrase);
    }
}

impl MnemonicStore for MemoryMnemonicStore {
    fn get_or_create(&self, ticker: &Ticker) -> Result<MnemonicPhrase> {
        let mut phrases = self.phrases.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(phrase) = phrases.get(ticker) {
            return Ok(phrase.clone());
        }
        let phrase = generate_mnemonic(MnemonicStrength::Words24)?;
        phrases.insert(ticker.clone(), phrase.clone());
        Ok(phrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_reuses_phrase() {
        let home = tempfile::tempdir().unwrap();
        let store = FileMnemonicStore::new(home.path());
        let ticker = Ticker::new("test").unwrap();

        let first = store.get_or_create(&ticker).unwrap();
        let second = store.get_or_create(&ticker).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.word_count(), 24);

        let path = store.phrase_path(&ticker);
        assert!(path.ends_with(".CSPO_TEST/TEST-shared.mnemonic.txt"));
        assert_eq!(fs::read_to_string(&path).unwrap(), first.as_str());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let home = tempfile::tempdir().unwrap();
        let store = FileMnemonicStore::new(home.path());
        let ticker = Ticker::new("perm").unwrap();
        store.get_or_create(&ticker).unwrap();

        let mode = fs::metadata(store.phrase_path(&ticker)).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_corrupt_phrase_is_not_replaced() {
        let home = tempfile::tempdir().unwrap();
        let store = FileMnemonicStore::new(home.path());
        let ticker = Ticker::new("bad").unwrap();
        let path = store.phrase_path(&ticker);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not a valid phrase").unwrap();

        let err = store.get_or_create(&ticker).unwrap_err();
        assert!(matches!(err, Error::Mnemonic { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "not a valid phrase");
    }

    #[test]
    fn test_existing_phrase_is_trimmed() {
        let home = tempfile::tempdir().unwrap();
        let store = FileMnemonicStore::new(home.path());
        let ticker = Ticker::new("trim").unwrap();
        let path = store.phrase_path(&ticker);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
        fs::write(&path, format!("{phrase}\n")).unwrap();

        assert_eq!(store.get_or_create(&ticker).unwrap().as_str(), phrase);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryMnemonicStore::new();
        let ticker = Ticker::new("mem").unwrap();
        let a = store.get_or_create(&ticker).unwrap();
        let b = store.get_or_create(&ticker).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, store.get_or_create(&Ticker::new("other").unwrap()).unwrap());
    }
}
