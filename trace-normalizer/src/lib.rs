//! Trace Normalizer - Canonical trace streams from heterogeneous EVM backends
//!
//! Every EVM implementation prints its structured per-instruction log in a
//! slightly different shape. This crate decodes those logs line by line and
//! re-encodes them into one canonical form that can be diffed byte for byte
//! across backends.
//!
//! # Overview
//!
//! A canonical stream consists of:
//!
//! * One line per genuine instruction step (`depth >= 1`), in backend order
//! * Exactly one trailing `{"stateRoot":"..."}` line, empty when no root was found
//!
//! Malformed and oversized lines are skipped, and STOP steps are dropped since
//! some backends synthesize a STOP when execution runs off the end of the code.
//!
//! # Usage
//!
//! ```
//! use trace_normalizer::TraceNormalizer;
//!
//! let raw = concat!(
//!     r#"{"pc":0,"op":96,"gas":"0x5208","gasCost":"0x3","depth":1}"#, "\n",
//!     r#"{"stateRoot": "0x01"}"#, "\n",
//! );
//!
//! let mut out = Vec::new();
//! let summary = TraceNormalizer::new("erigon").normalize(raw.as_bytes(), &mut out);
//! assert_eq!(summary.steps, 1);
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     "{\"pc\":0,\"op\":96,\"gas\":\"0x5208\",\"cost\":\"0x3\",\"depth\":1}\n{\"stateRoot\":\"0x01\"}\n",
//! );
//! ```

pub mod encode;
pub mod error;
pub mod normalize;
pub mod reader;
pub mod trace;

pub use encode::{encode_state_root, encode_step};
pub use error::TraceError;
pub use normalize::{NormalizeSummary, TraceNormalizer};
pub use reader::{Line, LineReader};
pub use trace::{StateRoot, StructLog, OP_STOP};
