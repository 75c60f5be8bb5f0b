//! Error types for adapter runs

use std::io;
use std::process::ExitStatus;

use thiserror::Error;

use crate::vm::TracingResult;

/// Ways a backend run can fail
#[derive(Debug, Error)]
pub enum VmError {
    #[error("{vm}: failed to start `{cmd}`: {source}")]
    Launch {
        vm: String,
        cmd: String,
        #[source]
        source: io::Error,
    },

    #[error("{vm}: waiting for `{cmd}` failed: {source}")]
    Wait {
        vm: String,
        cmd: String,
        #[source]
        source: io::Error,
    },

    #[error("{vm}: `{cmd}` exited with {status}")]
    Exit {
        vm: String,
        cmd: String,
        status: ExitStatus,
    },

    #[error("{vm}: no stateroot found")]
    NoStateRoot { vm: String },
}

/// A failed run, together with what is known about it
///
/// `result.cmd` always holds the attempted invocation so the run can be
/// reproduced by hand.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct RunError {
    pub result: TracingResult,
    pub source: VmError,
}

impl RunError {
    pub fn new(result: TracingResult, source: VmError) -> Self {
        Self { result, source }
    }

    /// The literal command of the failed run
    pub fn cmd(&self) -> &str {
        &self.result.cmd
    }
}
