//! Error types for the engine collaborator and the request gate.

use std::fmt;

/// Error type for failures reported by an engine backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine process could not be started
    Launch { program: String, reason: String },
    /// The engine did not answer a handshake step in time
    Handshake { expected: &'static str },
    /// The engine went away (pipe closed, process killed)
    Disconnected,
    /// Writing to the engine failed
    Io { reason: String },
    /// The engine does not declare an option with this name
    UnknownOption { name: String },
    /// The value does not fit the option's declared type
    InvalidOptionValue { name: String, value: String },
    /// A command would not fit on one protocol line
    InvalidCommand { line: String },
    /// A search is already running
    Busy,
    /// Construction panicked
    Panicked { message: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Launch { program, reason } => {
                write!(f, "Failed to launch engine '{program}': {reason}")
            }
            EngineError::Handshake { expected } => {
                write!(f, "Engine did not answer with '{expected}' in time")
            }
            EngineError::Disconnected => write!(f, "Engine is disconnected"),
            EngineError::Io { reason } => write!(f, "Engine I/O error: {reason}"),
            EngineError::UnknownOption { name } => write!(f, "No such option '{name}'"),
            EngineError::InvalidOptionValue { name, value } => {
                write!(f, "Invalid value '{value}' for option '{name}'")
            }
            EngineError::InvalidCommand { line } => {
                write!(f, "Refusing to send multi-line command {line:?}")
            }
            EngineError::Busy => write!(f, "Engine is already searching"),
            EngineError::Panicked { message } => {
                write!(f, "Engine construction panicked: {message}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::BrokenPipe => EngineError::Disconnected,
            _ => EngineError::Io {
                reason: e.to_string(),
            },
        }
    }
}

/// Reason a single request through the gate produced no move.
///
/// None of these outlive the request: the next caller sees an idle engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Position string was empty
    EmptyPosition,
    /// Output storage cannot hold the move plus its terminator
    BufferTooSmall { capacity: usize, required: usize },
    /// Engine construction failed earlier in this process
    Unavailable,
    /// Too many callers already inside the gate
    Overloaded { limit: usize },
    /// The engine rejected a command
    Engine(EngineError),
    /// No bestmove arrived before the hard wait ceiling
    Timeout { waited_ms: u64 },
    /// The engine answered without a usable move
    NoMove { reported: String },
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::EmptyPosition => write!(f, "Empty position"),
            GateError::BufferTooSmall { capacity, required } => {
                write!(f, "Output buffer holds {capacity} bytes, {required} required")
            }
            GateError::Unavailable => write!(f, "Engine is unavailable"),
            GateError::Overloaded { limit } => {
                write!(f, "Gate is full ({limit} callers pending)")
            }
            GateError::Engine(e) => write!(f, "{e}"),
            GateError::Timeout { waited_ms } => {
                write!(f, "No bestmove after {waited_ms} ms")
            }
            GateError::NoMove { reported } => {
                write!(f, "Engine reported no legal move ('{reported}')")
            }
        }
    }
}

impl std::error::Error for GateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GateError::Engine(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EngineError> for GateError {
    fn from(e: EngineError) -> Self {
        GateError::Engine(e)
    }
}
