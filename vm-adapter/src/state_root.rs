//! State-root extraction from untraced output

use crate::error::VmError;

/// Text preceding the root in a backend's result line
pub const STATE_ROOT_MARKER: &[u8] = br#""stateRoot": ""#;

/// Window width of a `0x`-prefixed 32-byte hash
pub const HEX_ROOT_WIDTH: usize = 66;

/// Extract the `width` characters following the state-root marker in `data`.
///
/// The value is not validated; a missing marker or a window running past the
/// end of `data` is reported as [`VmError::NoStateRoot`].
pub fn parse_state_root(vm: &str, data: &[u8], width: usize) -> Result<String, VmError> {
    let no_root = || VmError::NoStateRoot { vm: vm.to_string() };
    let start = data
        .windows(STATE_ROOT_MARKER.len())
        .position(|window| window == STATE_ROOT_MARKER)
        .ok_or_else(no_root)?
        + STATE_ROOT_MARKER.len();
    let window = start
        .checked_add(width)
        .and_then(|end| data.get(start..end))
        .ok_or_else(no_root)?;
    Ok(String::from_utf8_lossy(window).into_owned())
}
