//! C ABI for embedding hosts.
//!
//! A single process-wide [`RequestGate`] backs these functions. Hosts may
//! install their own with [`install_gate`] before the first call; otherwise
//! the first call builds one from the environment ([`RequestGate::from_env`]).
//!
//! Nothing unwinds across this boundary: every outcome collapses to 1/0.

use std::ffi::{c_char, CStr};
use std::panic::{self, AssertUnwindSafe};
use std::slice;

use once_cell::sync::OnceCell;

use crate::gate::RequestGate;

static GLOBAL_GATE: OnceCell<RequestGate> = OnceCell::new();

/// Install the process-wide gate.
///
/// Fails (returning the gate) if one is already installed or was already
/// built on first use.
pub fn install_gate(gate: RequestGate) -> Result<(), RequestGate> {
    GLOBAL_GATE.set(gate)
}

/// The process-wide gate, built from the environment on first use.
pub fn global_gate() -> &'static RequestGate {
    GLOBAL_GATE.get_or_init(RequestGate::from_env)
}

/// Compute a move for the FEN at `fen`.
///
/// Writes a NUL-terminated move into `out_move` and returns 1, or returns 0
/// and leaves `out_move` untouched.
///
/// # Safety
///
/// `fen` must be null or point to a NUL-terminated string. `out_move` must
/// be null or valid for writes of `out_capacity` bytes.
#[no_mangle]
pub unsafe extern "C" fn bestmove_gate_compute(
    fen: *const c_char,
    skill_level: i32,
    move_time_ms: i32,
    out_move: *mut c_char,
    out_capacity: i32,
) -> i32 {
    if fen.is_null() || out_move.is_null() || out_capacity <= 1 {
        return 0;
    }
    let Ok(position) = CStr::from_ptr(fen).to_str() else {
        log::debug!("rejecting non UTF-8 position");
        return 0;
    };
    let Ok(capacity) = usize::try_from(out_capacity) else {
        return 0;
    };
    let out = slice::from_raw_parts_mut(out_move.cast::<u8>(), capacity);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        global_gate().compute_best_move(position, skill_level, move_time_ms, out)
    }));
    match result {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(_) => {
            log::error!("panic inside bestmove_gate_compute");
            0
        }
    }
}

/// Initialize the engine if needed; 1 when it is usable.
#[no_mangle]
pub extern "C" fn bestmove_gate_is_available() -> i32 {
    match panic::catch_unwind(|| global_gate().is_available()) {
        Ok(true) => 1,
        _ => 0,
    }
}
