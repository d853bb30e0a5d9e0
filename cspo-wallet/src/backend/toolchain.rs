//! Toolchain-backed tiers
//!
//! Derivation and address encoding go through `cardano-address`. In the
//! full tier `cardano-cli` also renders the key text envelopes; the partial
//! tier renders them locally.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use super::process::run_piped;
use super::{AddressInput, BackendTier, DerivationBackend, RootKey};
use crate::config::Network;
use crate::crypto::address::{decode_bech32_bytes, Address, AddressKind};
use crate::crypto::envelope::render_local_envelopes;
use crate::crypto::keys::{DerivationPath, KeyPair, Role, SigningMaterial, VerificationMaterial};
use crate::crypto::mnemonic::MnemonicPhrase;
use crate::error::{Error, Result};
use crate::perms::write_private;

/// Backend driving the external toolchain
#[derive(Debug, Clone)]
pub struct ToolchainBackend {
    address_tool: PathBuf,
    cli_tool: Option<PathBuf>,
    timeout: Duration,
}

impl ToolchainBackend {
    /// Full tier: `cardano-address` plus `cardano-cli`
    pub fn full(address_tool: impl Into<PathBuf>, cli_tool: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            address_tool: address_tool.into(),
            cli_tool: Some(cli_tool.into()),
            timeout,
        }
    }

    /// Partial tier: `cardano-address` only
    pub fn partial(address_tool: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            address_tool: address_tool.into(),
            cli_tool: None,
            timeout,
        }
    }

    fn address(&self, args: &[&str], input: &str) -> Result<String> {
        let stage = format!("cardano-address {}", args.iter().take(2).copied().collect::<Vec<_>>().join(" "));
        run_piped(&self.address_tool, args, Some(input), self.timeout)?.into_stdout(&stage)
    }

    fn cli(&self, cli: &std::path::Path, args: &[&str]) -> Result<()> {
        let stage = format!("cardano-cli {}", args.iter().take(2).copied().collect::<Vec<_>>().join(" "));
        let output = run_piped(cli, args, None, self.timeout)?;
        if !output.status.success() {
            return Err(Error::derivation(stage, format!("{}: {}", output.status, output.stderr.trim())));
        }
        Ok(())
    }

    fn tag(network: Network) -> &'static str {
        if network.is_mainnet() {
            "1"
        } else {
            "0"
        }
    }

    /// Reject output that is not a single bech32 string
    fn expect_bech32(stage: &str, text: String) -> Result<String> {
        if text.split_whitespace().count() != 1 || decode_bech32_bytes(&text).is_err() {
            return Err(Error::derivation(stage, "malformed tool output"));
        }
        Ok(text)
    }

    fn read_output(path: &std::path::Path, stage: &str) -> Result<String> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        if text.trim().is_empty() {
            return Err(Error::derivation(stage, format!("{} is empty", path.display())));
        }
        Ok(text)
    }
}

impl DerivationBackend for ToolchainBackend {
    fn tier(&self) -> BackendTier {
        if self.cli_tool.is_some() {
            BackendTier::Full
        } else {
            BackendTier::Partial
        }
    }

    fn derive_root(&self, mnemonic: &MnemonicPhrase) -> Result<RootKey> {
        let root = self.address(&["key", "from-recovery-phrase", "Shelley"], mnemonic.as_str())?;
        let root = Self::expect_bech32("cardano-address key from-recovery-phrase", root)?;
        Ok(RootKey::new(self.tier(), root))
    }

    fn derive_key_pair(&self, root: &RootKey, role: Role, path: &DerivationPath) -> Result<KeyPair> {
        root.ensure_tier(self.tier())?;
        let toolchain_path = path.to_toolchain_string();
        debug!(role = %role, path = %path, "deriving key pair");

        let xsk = self.address(&["key", "child", &toolchain_path], root.expose())?;
        let xsk = SigningMaterial::new(Self::expect_bech32("cardano-address key child", xsk)?);

        let xvk = self.address(&["key", "public", "--with-chain-code"], xsk.expose())?;
        let xvk = Self::expect_bech32("cardano-address key public", xvk)?;

        Ok(KeyPair::new(role, xsk, VerificationMaterial::new(xvk)))
    }

    fn encode_address(&self, input: AddressInput<'_>, network: Network) -> Result<Address> {
        let tag = Self::tag(network);
        let encoded = match input {
            AddressInput::Payment(vk) => {
                self.address(&["address", "payment", "--network-tag", tag], vk.as_str())?
            }
            AddressInput::Reward(vk) => {
                self.address(&["address", "stake", "--network-tag", tag], vk.as_str())?
            }
            AddressInput::Base { payment, stake } => {
                let payment_addr =
                    self.address(&["address", "payment", "--network-tag", tag], payment.as_str())?;
                self.address(&["address", "delegation", stake.as_str()], &payment_addr)?
            }
        };

        let kind: AddressKind = input.kind();
        let encoded = Self::expect_bech32(&format!("{kind} address"), encoded)?;
        Ok(Address::new(kind, network, encoded))
    }

    fn render_key_envelopes(&self, pair: &KeyPair) -> Result<(String, String)> {
        let cli = match &self.cli_tool {
            Some(cli) => cli,
            None => return render_local_envelopes(pair),
        };

        // Removed on drop, including every error path below.
        let scratch = tempfile::Builder::new()
            .prefix(".cspo-keys-")
            .tempdir()
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;
        let xsk_file = scratch.path().join("key.xsk");
        let skey_file = scratch.path().join("key.skey");
        let vkey_file = scratch.path().join("key.vkey");

        write_private(&xsk_file, pair.signing().expose().as_bytes())?;

        let xsk_arg = xsk_file.to_string_lossy();
        let skey_arg = skey_file.to_string_lossy();
        let vkey_arg = vkey_file.to_string_lossy();

        self.cli(
            cli,
            &[
                "key",
                "convert-cardano-address-key",
                pair.role().cli_key_flag(),
                "--signing-key-file",
                &xsk_arg,
                "--out-file",
                &skey_arg,
            ],
        )?;
        self.cli(
            cli,
            &[
                "key",
                "verification-key",
                "--signing-key-file",
                &skey_arg,
                "--verification-key-file",
                &vkey_arg,
            ],
        )?;

        let skey = Self::read_output(&skey_file, "cardano-cli key convert-cardano-address-key")?;
        let vkey = Self::read_output(&vkey_file, "cardano-cli key verification-key")?;
        Ok((skey, vkey))
    }
}
