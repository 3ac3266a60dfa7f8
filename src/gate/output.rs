//! All-or-nothing copy of a move into caller storage.

use crate::error::GateError;

/// Room for a one-character move plus the terminator
pub const MIN_OUTPUT_CAPACITY: usize = 2;

/// Copy `mv` followed by a NUL into `out`.
///
/// Returns the number of bytes written. When the move does not fit, `out`
/// is left untouched.
pub fn write_terminated(mv: &str, out: &mut [u8]) -> Result<usize, GateError> {
    let required = mv.len() + 1;
    if required > out.len() {
        return Err(GateError::BufferTooSmall {
            capacity: out.len(),
            required,
        });
    }
    out[..mv.len()].copy_from_slice(mv.as_bytes());
    out[mv.len()] = 0;
    Ok(required)
}
