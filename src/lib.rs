pub mod config;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod gate;
pub mod lifecycle;
pub mod sync;

pub use config::{EngineConfig, GateConfig};
pub use engine::{Engine, SearchLimits, UciEngine};
pub use error::{EngineError, GateError};
pub use gate::{BestMove, RequestGate};
pub use lifecycle::{EngineCell, EngineFactory, InitOutcome, InitState, UciLauncher};
