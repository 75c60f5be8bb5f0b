//! Running a backend binary as a subprocess
//!
//! Traced runs stream the child's stderr through a [`TraceNormalizer`] while
//! the child is still running, then wait for it. Untraced runs capture the
//! whole output, which is small without tracing.

use std::io::{self, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use trace_normalizer::TraceNormalizer;

use crate::error::{RunError, VmError};
use crate::stats::VmStat;
use crate::vm::TracingResult;

/// Output fidelity requested from a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMode {
    /// Structured per-step log with stack, without memory and return data
    Full,
    /// Reduced log without memory, return data or stack
    Speed,
    /// No tracing, only the final result
    ResultOnly,
}

impl TraceMode {
    pub fn from_speed_test(speed_test: bool) -> Self {
        if speed_test {
            TraceMode::Speed
        } else {
            TraceMode::Full
        }
    }
}

/// Render `cmd` as program and arguments joined by spaces
pub fn command_line(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A spawned child that is reaped however the caller leaves scope
struct Reaper {
    child: Option<Child>,
}

impl Reaper {
    fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    fn child_mut(&mut self) -> Option<&mut Child> {
        self.child.as_mut()
    }

    fn wait(mut self) -> io::Result<ExitStatus> {
        match self.child.take() {
            Some(mut child) => child.wait(),
            None => Err(io::Error::other("child already reaped")),
        }
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Run `cmd`, normalizing its stderr into `out`.
///
/// `stats` is updated once the child has exited, whatever its status. A
/// child that cannot be started leaves `stats` untouched.
pub fn run_traced(
    vm: &str,
    mut cmd: Command,
    normalizer: &TraceNormalizer,
    out: &mut dyn Write,
    stats: &VmStat,
) -> Result<TracingResult, RunError> {
    let cmdline = command_line(&cmd);
    let launch_failed = |source: io::Error| {
        RunError::new(
            TracingResult::not_started(cmdline.clone()),
            VmError::Launch {
                vm: vm.to_string(),
                cmd: cmdline.clone(),
                source,
            },
        )
    };

    let start = Instant::now();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    let mut reaper = Reaper::new(cmd.spawn().map_err(&launch_failed)?);
    let Some(mut stderr) = reaper.child_mut().and_then(|child| child.stderr.take()) else {
        return Err(launch_failed(io::Error::other("stderr was not captured")));
    };

    let summary = normalizer.normalize(&mut stderr, out);
    // The normalizer may stop early; keep draining so the child never blocks
    // on a full pipe.
    if let Err(e) = io::copy(&mut stderr, &mut io::sink()) {
        tracing::debug!(vm = %vm, "draining trace output failed: {}", e);
    }
    drop(stderr);

    let status = reaper.wait();
    let (exec_time, slow) = stats.trace_done(start);
    tracing::debug!(
        vm = %vm,
        cmd = %cmdline,
        ?exec_time,
        slow,
        steps = summary.steps,
        malformed = summary.malformed,
        "traced run finished"
    );
    if slow {
        tracing::info!(vm = %vm, cmd = %cmdline, "slow test: {:?}", exec_time);
    }

    let result = TracingResult {
        cmd: cmdline.clone(),
        exec_time,
        slow,
    };
    match status {
        Ok(status) if status.success() => Ok(result),
        Ok(status) => Err(RunError::new(
            result,
            VmError::Exit {
                vm: vm.to_string(),
                cmd: cmdline,
                status,
            },
        )),
        Err(source) => Err(RunError::new(
            result,
            VmError::Wait {
                vm: vm.to_string(),
                cmd: cmdline,
                source,
            },
        )),
    }
}

/// Output of an untraced run
#[derive(Debug)]
pub struct CombinedOutput {
    /// Stdout followed by stderr
    pub data: Vec<u8>,
    pub cmd: String,
    pub exec_time: Duration,
}

/// Run `cmd` to completion and capture all of its output.
pub fn run_combined(vm: &str, mut cmd: Command) -> Result<CombinedOutput, RunError> {
    let cmdline = command_line(&cmd);
    let start = Instant::now();
    let output = cmd.stdin(Stdio::null()).output().map_err(|source| {
        RunError::new(
            TracingResult::not_started(cmdline.clone()),
            VmError::Launch {
                vm: vm.to_string(),
                cmd: cmdline.clone(),
                source,
            },
        )
    })?;
    let exec_time = start.elapsed();
    tracing::debug!(vm = %vm, cmd = %cmdline, ?exec_time, "untraced run finished");

    if !output.status.success() {
        let result = TracingResult {
            cmd: cmdline.clone(),
            exec_time,
            slow: false,
        };
        return Err(RunError::new(
            result,
            VmError::Exit {
                vm: vm.to_string(),
                cmd: cmdline,
                status: output.status,
            },
        ));
    }

    let mut data = output.stdout;
    data.extend_from_slice(&output.stderr);
    Ok(CombinedOutput {
        data,
        cmd: cmdline,
        exec_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let mut cmd = Command::new("/usr/local/bin/evm");
        cmd.args(["--json", "--nomemory", "statetest", "/tmp/test.json"]);
        assert_eq!(
            command_line(&cmd),
            "/usr/local/bin/evm --json --nomemory statetest /tmp/test.json"
        );
    }

    #[test]
    fn test_trace_mode_from_speed_test() {
        assert_eq!(TraceMode::from_speed_test(true), TraceMode::Speed);
        assert_eq!(TraceMode::from_speed_test(false), TraceMode::Full);
    }

    #[test]
    fn test_launch_failure_keeps_command_and_skips_stats() {
        let stats = VmStat::default();
        let mut cmd = Command::new("/nonexistent/evm-binary");
        cmd.arg("statetest");
        let mut out = Vec::new();

        let err = run_traced("ghost", cmd, &TraceNormalizer::new("ghost"), &mut out, &stats)
            .unwrap_err();

        assert_eq!(err.cmd(), "/nonexistent/evm-binary statetest");
        assert!(matches!(err.source, VmError::Launch { .. }));
        assert_eq!(stats.snapshot().execs, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_combined_launch_failure() {
        let err = run_combined("ghost", Command::new("/nonexistent/evm-binary")).unwrap_err();
        assert_eq!(err.cmd(), "/nonexistent/evm-binary");
        assert!(err.to_string().starts_with("ghost: failed to start"));
    }
}
