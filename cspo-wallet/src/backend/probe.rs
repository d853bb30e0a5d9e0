//! Toolchain capability detection

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::process::run_piped;
use super::BackendTier;
use crate::config::CspoConfig;

/// External tools the backend knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    CardanoAddress,
    CardanoCli,
}

impl Tool {
    pub const ALL: [Tool; 2] = [Tool::CardanoAddress, Tool::CardanoCli];

    pub fn name(&self) -> &'static str {
        match self {
            Self::CardanoAddress => "cardano-address",
            Self::CardanoCli => "cardano-cli",
        }
    }

    /// Binary file name on this platform
    pub fn file_name(&self) -> String {
        if cfg!(windows) {
            format!("{}.exe", self.name())
        } else {
            self.name().to_string()
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the probe found for one tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub path: PathBuf,
    /// Whether a `--version` probe succeeded (false when it was skipped)
    pub live: bool,
}

/// Capability map: tool to status, absent tools are missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    tools: HashMap<Tool, ToolStatus>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tool: Tool, status: ToolStatus) {
        self.tools.insert(tool, status);
    }

    /// Builder-style insert
    pub fn with_tool(mut self, tool: Tool, path: impl Into<PathBuf>, live: bool) -> Self {
        self.insert(tool, ToolStatus { path: path.into(), live });
        self
    }

    pub fn get(&self, tool: Tool) -> Option<&ToolStatus> {
        self.tools.get(&tool)
    }

    pub fn is_present(&self, tool: Tool) -> bool {
        self.tools.contains_key(&tool)
    }

    pub fn is_live(&self, tool: Tool) -> bool {
        self.tools.get(&tool).map(|s| s.live).unwrap_or(false)
    }

    pub fn path(&self, tool: Tool) -> Option<&Path> {
        self.tools.get(&tool).map(|s| s.path.as_path())
    }
}

/// Pick the tier a capability map supports.
///
/// Full needs both tools with a live `cardano-cli`; partial needs only
/// `cardano-address`; anything else is local fallback.
pub fn detect_tier(capabilities: &Capabilities) -> BackendTier {
    let has_address = capabilities.is_present(Tool::CardanoAddress);
    let cli_live = capabilities.is_present(Tool::CardanoCli) && capabilities.is_live(Tool::CardanoCli);

    match (has_address, cli_live) {
        (true, true) => BackendTier::Full,
        (true, false) => BackendTier::Partial,
        _ => BackendTier::LocalFallback,
    }
}

/// Source of tool availability
pub trait ToolProbe {
    /// Path to the tool binary, if installed
    fn locate(&self, tool: Tool) -> Option<PathBuf>;

    /// Whether the tool answers `--version` within the probe timeout
    fn is_live(&self, tool: Tool, path: &Path) -> bool;

    /// Build the capability map for every known tool
    fn capabilities(&self) -> Capabilities {
        let mut capabilities = Capabilities::new();
        for tool in Tool::ALL {
            if let Some(path) = self.locate(tool) {
                let live = self.is_live(tool, &path);
                debug!(tool = %tool, path = %path.display(), live, "tool located");
                capabilities.insert(tool, ToolStatus { path, live });
            } else {
                debug!(tool = %tool, "tool not installed");
            }
        }
        capabilities
    }
}

/// Probe the installed toolchain directory.
///
/// Only `tools_dir` is searched; binaries elsewhere on `PATH` are ignored so
/// the tier reflects what the installer put in place.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    tools_dir: PathBuf,
    timeout: Duration,
}

impl SystemProbe {
    pub fn new(tools_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            tools_dir: tools_dir.into(),
            timeout,
        }
    }

    pub fn from_config(config: &CspoConfig) -> Self {
        Self::new(&config.tools_dir, config.probe_timeout)
    }
}

/// `cardano-cli` is known to crash on Apple silicon
fn cli_probe_unsafe() -> bool {
    cfg!(all(target_os = "macos", target_arch = "aarch64"))
}

impl ToolProbe for SystemProbe {
    fn locate(&self, tool: Tool) -> Option<PathBuf> {
        let path = self.tools_dir.join(tool.file_name());
        path.is_file().then_some(path)
    }

    fn is_live(&self, tool: Tool, path: &Path) -> bool {
        if tool == Tool::CardanoCli && cli_probe_unsafe() {
            info!("skipping cardano-cli liveness probe on macOS/aarch64");
            return false;
        }

        match run_piped(path, &["--version"], None, self.timeout) {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                warn!(tool = %tool, status = %output.status, "tool failed its liveness probe");
                false
            }
            Err(e) => {
                warn!(tool = %tool, error = %e, "tool failed its liveness probe");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_tier_table() {
        let none = Capabilities::new();
        assert_eq!(detect_tier(&none), BackendTier::LocalFallback);

        let address_only = Capabilities::new().with_tool(Tool::CardanoAddress, "/t/cardano-address", true);
        assert_eq!(detect_tier(&address_only), BackendTier::Partial);

        let dead_cli = address_only.clone().with_tool(Tool::CardanoCli, "/t/cardano-cli", false);
        assert_eq!(detect_tier(&dead_cli), BackendTier::Partial);

        let full = address_only.clone().with_tool(Tool::CardanoCli, "/t/cardano-cli", true);
        assert_eq!(detect_tier(&full), BackendTier::Full);

        let cli_only = Capabilities::new().with_tool(Tool::CardanoCli, "/t/cardano-cli", true);
        assert_eq!(detect_tier(&cli_only), BackendTier::LocalFallback);
    }

    #[test]
    fn test_system_probe_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let probe = SystemProbe::new(dir.path(), Duration::from_secs(1));
        let capabilities = probe.capabilities();
        assert!(!capabilities.is_present(Tool::CardanoAddress));
        assert_eq!(detect_tier(&capabilities), BackendTier::LocalFallback);
    }

    #[cfg(unix)]
    #[test]
    fn test_capabilities_ignore_unknown_tools() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let script = dir.path().join("bech32");
        std::fs::write(&script, format!("#!/bin/sh\ntouch {}\n", marker.display())).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let capabilities = SystemProbe::new(dir.path(), Duration::from_secs(1)).capabilities();
        assert_eq!(capabilities, Capabilities::new());
        assert!(!marker.exists());
    }
}
