//! Shared test doubles: an in-process fake engine and a scripted UCI peer.

#![allow(dead_code)]

pub mod fake;
pub mod peer;

/// Standard starting position
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Read a NUL-terminated move out of a buffer
pub fn terminated_str(buf: &[u8]) -> &str {
    let end = buf.iter().position(|b| *b == 0).expect("missing terminator");
    std::str::from_utf8(&buf[..end]).expect("move is not UTF-8")
}
