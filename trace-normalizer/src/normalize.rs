//! Trace normalization
//!
//! Turns one backend's raw structured log output into the canonical stream:
//! one canonical line per genuine instruction step, in backend order,
//! followed by exactly one `{"stateRoot":..}` trailer.

use std::io::{Read, Write};

use crate::encode::{encode_state_root, encode_step};
use crate::error::TraceError;
use crate::reader::{Line, LineReader, DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_LINE};
use crate::trace::{StateRoot, StructLog};

/// Counters describing one normalization pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeSummary {
    /// State root written in the trailer, empty if none was found
    pub state_root: String,
    /// Canonical step records written
    pub steps: usize,
    /// STOP steps dropped
    pub halts_dropped: usize,
    /// Depth-zero summary and result lines seen
    pub summaries: usize,
    /// Lines that failed to decode
    pub malformed: usize,
    /// Lines over the size limit
    pub oversized: usize,
    /// Whether output stopped early because the sink failed
    pub truncated: bool,
}

/// Streaming normalizer for one backend's trace output
#[derive(Debug, Clone)]
pub struct TraceNormalizer {
    vm: String,
    initial_capacity: usize,
    max_line: usize,
}

impl TraceNormalizer {
    /// Create a normalizer; `vm` labels log messages.
    pub fn new(vm: impl Into<String>) -> Self {
        Self {
            vm: vm.into(),
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_line: DEFAULT_MAX_LINE,
        }
    }

    /// Override the line buffer's starting size and hard cap
    pub fn with_buffer_limits(mut self, initial_capacity: usize, max_line: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self.max_line = max_line;
        self
    }

    /// Normalize `input` into `out`.
    ///
    /// Malformed and oversized lines are logged and skipped. A failing sink
    /// stops the pass; everything written before the failure stays written.
    pub fn normalize<R: Read, W: Write + ?Sized>(&self, input: R, out: &mut W) -> NormalizeSummary {
        let mut summary = NormalizeSummary::default();
        let mut root = StateRoot::default();
        let mut reader = LineReader::with_limits(input, self.initial_capacity, self.max_line);
        let mut encoded = Vec::with_capacity(256);

        loop {
            let data = match reader.next_line() {
                Ok(Some(Line::Complete(data))) => data,
                Ok(Some(Line::Oversized { len })) => {
                    summary.oversized += 1;
                    let err = TraceError::LineTooLong {
                        len,
                        max: self.max_line,
                    };
                    tracing::warn!(vm = %self.vm, "{}", err);
                    continue;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(vm = %self.vm, "reading trace output failed: {}", e);
                    break;
                }
            };
            if data.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let log = match StructLog::parse(data) {
                Ok(log) => log,
                Err(e) => {
                    summary.malformed += 1;
                    tracing::warn!(
                        vm = %self.vm,
                        line = %String::from_utf8_lossy(data),
                        "{}",
                        e
                    );
                    continue;
                }
            };

            // Depth zero is never an instruction: either an end-of-run
            // summary such as {"output":"","gasUsed":"0x2d1cc4","error":".."}
            // or the {"stateRoot":".."} line.
            if !log.is_step() {
                summary.summaries += 1;
                if root.is_empty() {
                    if let Ok(found) = serde_json::from_slice::<StateRoot>(data) {
                        root = found;
                    }
                }
                if !root.is_empty() {
                    break;
                }
                continue;
            }
            // Some backends step onto a virtual STOP when running off the end
            // of the code; other backends don't, so STOPs are never compared.
            if log.is_stop() {
                summary.halts_dropped += 1;
                continue;
            }

            encoded.clear();
            encode_step(&log, &mut encoded);
            encoded.push(b'\n');
            if let Err(e) = out.write_all(&encoded) {
                tracing::error!(vm = %self.vm, "writing canonical trace failed: {}", e);
                summary.truncated = true;
                summary.state_root = root.state_root;
                return summary;
            }
            summary.steps += 1;
        }

        let mut trailer = encode_state_root(&root);
        trailer.push(b'\n');
        if let Err(e) = out.write_all(&trailer) {
            tracing::error!(vm = %self.vm, "writing state root failed: {}", e);
            summary.truncated = true;
        }
        summary.state_root = root.state_root;
        summary
    }
}
