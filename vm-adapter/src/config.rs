//! Backend configuration
//!
//! Backends are described by a JSON list such as
//!
//! ```json
//! [
//!   { "kind": "erigon", "path": "/usr/local/bin/evm", "name": "erigon-1" },
//!   { "kind": "erigon", "path": "/opt/erigon/evm", "name": "erigon-2", "slow_threshold_ms": 5000 }
//! ]
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::erigon::ErigonVm;
use crate::vm::Vm;

/// Supported backend implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VmKind {
    Erigon,
}

/// Configuration for one backend instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmConfig {
    pub kind: VmKind,
    /// Path to the backend executable
    pub path: PathBuf,
    /// Display name, unique among configured backends
    pub name: String,
    /// Runs at or over this many milliseconds count as slow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slow_threshold_ms: Option<u64>,
    /// Characters following the state-root marker that make up the root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_root_width: Option<usize>,
}

impl VmConfig {
    pub fn new(kind: VmKind, path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            name: name.into(),
            slow_threshold_ms: None,
            state_root_width: None,
        }
    }

    /// Instantiate the configured backend
    pub fn build(&self) -> Box<dyn Vm> {
        match self.kind {
            VmKind::Erigon => {
                let mut vm = ErigonVm::new(&self.path, &self.name);
                if let Some(ms) = self.slow_threshold_ms {
                    vm = vm.with_slow_threshold(Duration::from_millis(ms));
                }
                if let Some(width) = self.state_root_width {
                    vm = vm.with_state_root_width(width);
                }
                Box::new(vm)
            }
        }
    }
}

/// Load a list of backend configurations from a JSON file
pub fn load_configs(path: &Path) -> Result<Vec<VmConfig>> {
    let data = fs::read(path)
        .with_context(|| format!("Failed to read VM config {}", path.display()))?;
    let configs: Vec<VmConfig> = serde_json::from_slice(&data)
        .with_context(|| format!("Failed to parse VM config {}", path.display()))?;

    let mut names: Vec<&str> = configs.iter().map(|c| c.name.as_str()).collect();
    names.sort_unstable();
    if let Some(dup) = names.windows(2).find(|pair| pair[0] == pair[1]) {
        anyhow::bail!("Duplicate VM name {:?} in {}", dup[0], path.display());
    }

    tracing::info!("Loaded {} VM configurations from {}", configs.len(), path.display());
    Ok(configs)
}

/// Load and instantiate every backend in a configuration file
pub fn load_vms(path: &Path) -> Result<Vec<Box<dyn Vm>>> {
    Ok(load_configs(path)?.iter().map(VmConfig::build).collect())
}
