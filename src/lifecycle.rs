//! One-time construction of the shared engine instance.
//!
//! An [`EngineCell`] runs its factory at most once, no matter how many
//! threads race to use it, and remembers the outcome for its whole life.
//! A failed construction is never retried: the failures we expect here
//! (missing binary, missing network file, unsupported CPU) do not heal.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::engine::{noop_bestmove, noop_info, Engine, UciEngine};
use crate::error::EngineError;

/// Worker threads given to the engine
pub const BASELINE_THREADS: u32 = 1;

/// Hash table size given to the engine, in MB
pub const BASELINE_HASH_MB: u32 = 32;

/// The shared engine, serialized behind a mutex
pub type SharedEngine = Mutex<Box<dyn Engine>>;

/// Builds engine instances.
pub trait EngineFactory: Send + Sync {
    /// Process-wide setup that must precede construction.
    fn init_static(&self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Construct a new engine instance.
    fn construct(&self, config: &EngineConfig) -> Result<Box<dyn Engine>, EngineError>;
}

/// Launches an external UCI engine process
#[derive(Debug, Clone, Copy, Default)]
pub struct UciLauncher;

impl EngineFactory for UciLauncher {
    fn construct(&self, config: &EngineConfig) -> Result<Box<dyn Engine>, EngineError> {
        Ok(Box::new(UciEngine::spawn(config)?))
    }
}

/// Result of the single construction attempt
pub enum InitOutcome {
    Ready(SharedEngine),
    Failed(EngineError),
}

impl InitOutcome {
    #[must_use]
    pub fn engine(&self) -> Option<&SharedEngine> {
        match self {
            InitOutcome::Ready(engine) => Some(engine),
            InitOutcome::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&EngineError> {
        match self {
            InitOutcome::Ready(_) => None,
            InitOutcome::Failed(e) => Some(e),
        }
    }

    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self, InitOutcome::Ready(_))
    }
}

/// Observable initialization state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    /// No caller has needed the engine yet (or construction is running)
    Pending,
    Ready,
    Failed,
}

/// Lazily constructed, never-rebuilt engine slot
pub struct EngineCell {
    factory: Box<dyn EngineFactory>,
    config: EngineConfig,
    outcome: OnceCell<InitOutcome>,
}

impl EngineCell {
    pub fn new<F: EngineFactory + 'static>(factory: F, config: EngineConfig) -> Self {
        EngineCell {
            factory: Box::new(factory),
            config,
            outcome: OnceCell::new(),
        }
    }

    /// Cell backed by an external UCI engine.
    #[must_use]
    pub fn uci(config: EngineConfig) -> Self {
        Self::new(UciLauncher, config)
    }

    /// Construct the engine on first use; later calls return the same outcome.
    ///
    /// Concurrent first callers block until the one attempt finishes.
    pub fn ensure_initialized(&self) -> &InitOutcome {
        self.outcome
            .get_or_init(|| initialize(self.factory.as_ref(), &self.config))
    }

    /// The engine if construction succeeded.
    pub fn engine(&self) -> Option<&SharedEngine> {
        self.ensure_initialized().engine()
    }

    /// Current state, without triggering construction.
    #[must_use]
    pub fn state(&self) -> InitState {
        match self.outcome.get() {
            None => InitState::Pending,
            Some(InitOutcome::Ready(_)) => InitState::Ready,
            Some(InitOutcome::Failed(_)) => InitState::Failed,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

fn initialize(factory: &dyn EngineFactory, config: &EngineConfig) -> InitOutcome {
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| build(factory, config)));
    let result = match attempt {
        Ok(result) => result,
        Err(payload) => Err(EngineError::Panicked {
            message: panic_message(payload.as_ref()),
        }),
    };

    match result {
        Ok(engine) => {
            log::info!("engine initialized");
            InitOutcome::Ready(Mutex::new(engine))
        }
        Err(e) => {
            log::error!("engine initialization failed permanently: {e}");
            InitOutcome::Failed(e)
        }
    }
}

fn build(factory: &dyn EngineFactory, config: &EngineConfig) -> Result<Box<dyn Engine>, EngineError> {
    factory.init_static()?;
    let mut engine = factory.construct(config)?;

    apply_baseline(engine.as_mut(), "Threads", &BASELINE_THREADS.to_string())?;
    apply_baseline(engine.as_mut(), "Hash", &BASELINE_HASH_MB.to_string())?;

    engine.set_on_info(noop_info());
    engine.set_on_bestmove(noop_bestmove());
    Ok(engine)
}

/// Options the engine does not declare are skipped.
fn apply_baseline(engine: &mut dyn Engine, name: &str, value: &str) -> Result<(), EngineError> {
    match engine.set_option(name, value) {
        Err(EngineError::UnknownOption { .. }) => {
            log::debug!("engine has no '{name}' option; leaving default");
            Ok(())
        }
        other => other,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
