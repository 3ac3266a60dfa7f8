//! In-process engine that answers on its own worker thread.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use bestmove_gate::engine::options::parse_option_declaration;
use bestmove_gate::engine::{noop_bestmove, BestMoveCallback, InfoCallback, OptionsMap};
use bestmove_gate::{Engine, EngineConfig, EngineError, EngineFactory, SearchLimits};

/// What the fake reports as its best move
#[derive(Clone, Debug)]
pub enum Answer {
    Fixed(&'static str),
    /// Report the position string itself, to detect cross-request leaks
    EchoPosition,
    NoMove,
}

#[derive(Clone, Debug)]
pub struct Script {
    pub answer: Answer,
    pub ponder: Option<&'static str>,
    /// Time until the fake answers on its own (capped by movetime)
    pub think: Duration,
    /// Whether `stop` still produces a bestmove
    pub answer_on_stop: bool,
    /// After an unanswered stop, fire the old callback this much later
    pub late_answer: Option<Duration>,
    /// This many leading searches ignore movetime and run until stopped
    pub stall_searches: usize,
    pub declare_skill: bool,
}

impl Default for Script {
    fn default() -> Self {
        Script {
            answer: Answer::Fixed("e2e4"),
            ponder: None,
            think: Duration::from_millis(5),
            answer_on_stop: true,
            late_answer: None,
            stall_searches: 0,
            declare_skill: true,
        }
    }
}

/// Observations shared between the fake and the test
#[derive(Default)]
pub struct Probe {
    pub inits: AtomicUsize,
    pub constructs: AtomicUsize,
    pub searches: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub configured_while_busy: AtomicBool,
    pub commands: Mutex<Vec<String>>,
}

impl Probe {
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    fn record(&self, cmd: String) {
        self.commands.lock().push(cmd);
    }
}

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct FakeEngine {
    script: Script,
    probe: Arc<Probe>,
    options: OptionsMap,
    position: String,
    on_bestmove: Arc<Mutex<BestMoveCallback>>,
    worker: Option<Worker>,
}

impl FakeEngine {
    pub fn new(script: Script, probe: Arc<Probe>) -> Self {
        let mut options = OptionsMap::new();
        let mut declarations = vec![
            "option name Threads type spin default 1 min 1 max 512",
            "option name Hash type spin default 16 min 1 max 1024",
        ];
        if script.declare_skill {
            declarations.push("option name Skill Level type spin default 20 min 0 max 20");
        }
        for line in declarations {
            options.insert(parse_option_declaration(line).unwrap());
        }
        FakeEngine {
            script,
            probe,
            options,
            position: String::new(),
            on_bestmove: Arc::new(Mutex::new(noop_bestmove())),
            worker: None,
        }
    }
}

impl Engine for FakeEngine {
    fn options(&self) -> &OptionsMap {
        &self.options
    }

    fn set_option(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        if self.is_searching() {
            self.probe.configured_while_busy.store(true, Ordering::SeqCst);
        }
        let (name, value) = self.options.validate(name, value)?;
        self.probe.record(format!("setoption {name} {value}"));
        Ok(())
    }

    fn set_position(&mut self, position: &str, _moves: &[String]) -> Result<(), EngineError> {
        self.position = position.to_string();
        self.probe.record(format!("position {position}"));
        Ok(())
    }

    fn go(&mut self, limits: &SearchLimits) -> Result<(), EngineError> {
        if self.worker.is_some() {
            return Err(EngineError::Busy);
        }
        self.probe.record(format!("go {limits}"));
        let index = self.probe.searches.fetch_add(1, Ordering::SeqCst);
        let stall = index < self.script.stall_searches;
        let now_active = self.probe.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_active.fetch_max(now_active, Ordering::SeqCst);

        let think = self.script.think.min(Duration::from_millis(limits.movetime_ms));
        let answer = match &self.script.answer {
            Answer::Fixed(mv) => (*mv).to_string(),
            Answer::EchoPosition => self.position.clone(),
            Answer::NoMove => "(none)".to_string(),
        };
        let ponder = self.script.ponder;
        let answer_on_stop = self.script.answer_on_stop;
        let late_answer = self.script.late_answer;
        let slot = Arc::clone(&self.on_bestmove);
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::spawn(move || {
            let stopped = if stall {
                let _ = stop_rx.recv();
                true
            } else {
                !matches!(stop_rx.recv_timeout(think), Err(RecvTimeoutError::Timeout))
            };
            let callback = slot.lock().clone();
            if !stopped || answer_on_stop {
                callback(&answer, ponder);
            } else if let Some(delay) = late_answer {
                thread::spawn(move || {
                    thread::sleep(delay);
                    callback(&answer, ponder);
                });
            }
        });

        self.worker = Some(Worker {
            stop: stop_tx,
            handle,
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(worker) = &self.worker {
            self.probe.record("stop".to_string());
            let _ = worker.stop.try_send(());
        }
    }

    fn wait_for_search_finished(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.handle.join();
            self.probe.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn set_on_bestmove(&mut self, callback: BestMoveCallback) {
        *self.on_bestmove.lock() = callback;
    }

    fn set_on_info(&mut self, _callback: InfoCallback) {}

    fn is_searching(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }
}

/// Factory handing out [`FakeEngine`]s, or failing on purpose
pub struct FakeFactory {
    pub script: Script,
    pub probe: Arc<Probe>,
    pub fail_with: Option<EngineError>,
    pub init_delay: Duration,
}

impl FakeFactory {
    pub fn new(script: Script) -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let factory = FakeFactory {
            script,
            probe: Arc::clone(&probe),
            fail_with: None,
            init_delay: Duration::ZERO,
        };
        (factory, probe)
    }

    pub fn failing(error: EngineError) -> (Self, Arc<Probe>) {
        let (mut factory, probe) = Self::new(Script::default());
        factory.fail_with = Some(error);
        (factory, probe)
    }
}

impl EngineFactory for FakeFactory {
    fn init_static(&self) -> Result<(), EngineError> {
        self.probe.inits.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.init_delay);
        Ok(())
    }

    fn construct(&self, _config: &EngineConfig) -> Result<Box<dyn Engine>, EngineError> {
        self.probe.constructs.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = &self.fail_with {
            return Err(e.clone());
        }
        Ok(Box::new(FakeEngine::new(self.script.clone(), Arc::clone(&self.probe))))
    }
}
