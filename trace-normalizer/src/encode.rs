//! Canonical encoding of trace lines
//!
//! Fields are written in a fixed order with fixed formatting, so two
//! backends that agree on a step produce byte-identical lines.
//!
//! Layout:
//!
//! ```text
//! {"pc":N,"op":N,"gas":"0xH","cost":"0xH","depth":N[,"error":"S"][,"stack":[..]][,"memory":"0x.."][,"returnData":"0x.."]}
//! ```

use std::fmt::Write as _;

use crate::trace::{StateRoot, StructLog};

/// Append the canonical encoding of `log` to `buf`, without a newline.
pub fn encode_step(log: &StructLog, buf: &mut Vec<u8>) {
    let mut line = String::with_capacity(96);
    // Writing into a String cannot fail.
    let _ = write!(
        line,
        r#"{{"pc":{},"op":{},"gas":"{:#x}","cost":"{:#x}","depth":{}"#,
        log.pc, log.op, log.gas, log.cost, log.depth
    );
    if let Some(error) = &log.error {
        line.push_str(r#","error":"#);
        push_json_string(&mut line, error);
    }
    if let Some(stack) = &log.stack {
        line.push_str(r#","stack":["#);
        for (i, item) in stack.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            line.push('"');
            line.push_str(item);
            line.push('"');
        }
        line.push(']');
    }
    if let Some(memory) = &log.memory {
        line.push_str(r#","memory":"0x"#);
        line.push_str(&hex::encode(memory));
        line.push('"');
    }
    if let Some(data) = &log.return_data {
        line.push_str(r#","returnData":"0x"#);
        line.push_str(&hex::encode(data));
        line.push('"');
    }
    line.push('}');
    buf.extend_from_slice(line.as_bytes());
}

/// Canonical encoding of the trailer, without a newline.
pub fn encode_state_root(root: &StateRoot) -> Vec<u8> {
    serde_json::to_vec(root).unwrap_or_else(|_| br#"{"stateRoot":""}"#.to_vec())
}

fn push_json_string(out: &mut String, value: &str) {
    match serde_json::to_string(value) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => out.push_str("\"\""),
    }
}
