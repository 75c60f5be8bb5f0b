//! The interface every backend implements

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::Result;

/// Outcome of one traced run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TracingResult {
    /// Literal invocation, program followed by its arguments
    pub cmd: String,
    /// Wall-clock execution time
    pub exec_time: Duration,
    /// Whether the run met the slow-test threshold
    pub slow: bool,
}

impl TracingResult {
    /// Result for a run that never started
    pub fn not_started(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            ..Default::default()
        }
    }
}

/// Final state root obtained without tracing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRootOutput {
    pub root: String,
    pub cmd: String,
}

impl StateRootOutput {
    /// Decode a `0x`-prefixed hex root
    pub fn bytes(&self) -> std::result::Result<Vec<u8>, hex::FromHexError> {
        hex::decode(self.root.strip_prefix("0x").unwrap_or(&self.root))
    }
}

/// An EVM implementation driven through a uniform interface
///
/// Callers use backends polymorphically through `dyn Vm`; a new backend is
/// added by implementing this trait.
pub trait Vm: Send + Sync {
    /// Identifier used in reports and error messages
    fn name(&self) -> &str;

    /// Handle for concurrent worker `worker`
    ///
    /// The worker must use only the returned handle from then on. Backends
    /// without per-run state may share everything but their identity.
    fn instance(&self, worker: usize) -> Box<dyn Vm>;

    /// Execute the state test at `path`, writing the canonical trace to `out`.
    ///
    /// With `speed_test` set the backend is asked for a reduced trace
    /// (no stack, memory or return data).
    fn run_state_test(
        &self,
        path: &Path,
        out: &mut dyn Write,
        speed_test: bool,
    ) -> Result<TracingResult>;

    /// Execute the state test at `path` without tracing and report its
    /// final state root.
    fn state_root(&self, path: &Path) -> Result<StateRootOutput>;

    /// Labeled snapshot of the backend's statistics
    fn stats(&self) -> Vec<(&'static str, String)>;

    /// Release backend resources
    fn close(&self) {}
}
