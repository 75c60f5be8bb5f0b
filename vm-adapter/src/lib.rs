//! VM Adapter - Uniform driving of external EVM implementations
//!
//! This crate runs EVM backend binaries on state tests through one
//! interface, normalizing their traces with [`trace_normalizer`] so that the
//! outputs of different backends can be diffed.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use vm_adapter::{ErigonVm, Vm};
//!
//! let vm = ErigonVm::new("/usr/local/bin/evm", "erigon");
//! let mut trace = Vec::new();
//! match vm.run_state_test(Path::new("tests/add.json"), &mut trace, false) {
//!     Ok(result) => println!("{} took {:?}", result.cmd, result.exec_time),
//!     Err(err) => eprintln!("{err} (reproduce with: {})", err.cmd()),
//! }
//! ```
//!
//! Runs carry no timeout; callers that need one must kill the backend
//! process themselves.

pub mod config;
pub mod erigon;
pub mod error;
pub mod process;
pub mod state_root;
pub mod stats;
pub mod vm;

pub use config::{load_configs, load_vms, VmConfig, VmKind};
pub use erigon::ErigonVm;
pub use error::{RunError, VmError};
pub use process::TraceMode;
pub use stats::{VmStat, VmStatSnapshot};
pub use vm::{StateRootOutput, TracingResult, Vm};

/// Result type for adapter operations
pub type Result<T> = std::result::Result<T, RunError>;
