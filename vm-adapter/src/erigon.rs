//! Adapter for the Erigon `evm` binary

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use trace_normalizer::{NormalizeSummary, TraceNormalizer};

use crate::error::{RunError, VmError};
use crate::process::{run_combined, run_traced, TraceMode};
use crate::state_root::{parse_state_root, HEX_ROOT_WIDTH};
use crate::stats::VmStat;
use crate::vm::{StateRootOutput, TracingResult, Vm};

/// Wrapper around Erigon's `evm statetest`
///
/// Holds no per-run state, so all instances share one set of statistics.
#[derive(Debug, Clone)]
pub struct ErigonVm {
    path: PathBuf,
    /// Distinguishes several configured instances of the same binary
    name: String,
    state_root_width: usize,
    normalizer: TraceNormalizer,
    stats: Arc<VmStat>,
}

impl ErigonVm {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: path.into(),
            normalizer: TraceNormalizer::new(name.clone()),
            name,
            state_root_width: HEX_ROOT_WIDTH,
            stats: Arc::new(VmStat::default()),
        }
    }

    /// Use `threshold` to classify slow runs. Resets the statistics.
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.stats = Arc::new(VmStat::new(threshold));
        self
    }

    /// Number of characters taken after the state-root marker
    pub fn with_state_root_width(mut self, width: usize) -> Self {
        self.state_root_width = width;
        self
    }

    /// Override the trace line buffer limits
    pub fn with_buffer_limits(mut self, initial_capacity: usize, max_line: usize) -> Self {
        self.normalizer = self
            .normalizer
            .with_buffer_limits(initial_capacity, max_line);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build the invocation for `mode`
    pub fn command(&self, mode: TraceMode, test: &Path) -> Command {
        let mut cmd = Command::new(&self.path);
        match mode {
            TraceMode::Full => {
                cmd.args(["--json", "--noreturndata", "--nomemory"]);
            }
            TraceMode::Speed => {
                cmd.args(["--nomemory", "--noreturndata", "--nostack"]);
            }
            TraceMode::ResultOnly => {}
        }
        cmd.arg("statetest").arg(test);
        cmd
    }

    /// Read the state root from untraced combined output
    pub fn parse_state_root(&self, data: &[u8]) -> Result<String, VmError> {
        parse_state_root(&self.name, data, self.state_root_width)
    }

    /// Normalize raw Erigon trace output from `input` into `out`
    pub fn copy<R: Read, W: Write + ?Sized>(&self, out: &mut W, input: R) -> NormalizeSummary {
        self.normalizer.normalize(input, out)
    }
}

impl Vm for ErigonVm {
    fn name(&self) -> &str {
        &self.name
    }

    fn instance(&self, _worker: usize) -> Box<dyn Vm> {
        Box::new(self.clone())
    }

    fn run_state_test(
        &self,
        path: &Path,
        out: &mut dyn Write,
        speed_test: bool,
    ) -> Result<TracingResult, RunError> {
        let cmd = self.command(TraceMode::from_speed_test(speed_test), path);
        run_traced(&self.name, cmd, &self.normalizer, out, &self.stats)
    }

    // Only works for tests that are not filled: Erigon prints the root on
    // success only when it has no expected post-state to check against.
    fn state_root(&self, path: &Path) -> Result<StateRootOutput, RunError> {
        let output = run_combined(&self.name, self.command(TraceMode::ResultOnly, path))?;
        match self.parse_state_root(&output.data) {
            Ok(root) => Ok(StateRootOutput {
                root,
                cmd: output.cmd,
            }),
            Err(source) => {
                tracing::error!(vm = %self.name, cmd = %output.cmd, "failed to find stateroot");
                let result = TracingResult {
                    cmd: output.cmd,
                    exec_time: output.exec_time,
                    slow: false,
                };
                Err(RunError::new(result, source))
            }
        }
    }

    fn stats(&self) -> Vec<(&'static str, String)> {
        self.stats.snapshot().labeled()
    }
}
