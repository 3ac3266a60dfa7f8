//! Engine backend driving an external UCI engine.
//!
//! Commands are written to the engine's stdin; a dedicated reader thread
//! parses its stdout and fires the progress and bestmove callbacks. That
//! reader thread is the "engine-chosen thread" the gate has to bridge.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};

use super::options::OptionsMap;
use super::protocol::{parse_engine_message, EngineCommand, EngineMessage};
use super::{noop_bestmove, noop_info, BestMoveCallback, Engine, InfoCallback, SearchLimits};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::sync::deadline_after;

/// Time the process gets to exit after `quit` before it is killed
const QUIT_GRACE_MS: u64 = 200;

/// Poll interval while waiting for the process to exit
const EXIT_POLL_MS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activity {
    Idle,
    Searching,
    Closed,
}

/// State shared with the reader thread
struct Shared {
    activity: Mutex<Activity>,
    changed: Condvar,
    on_bestmove: Mutex<BestMoveCallback>,
    on_info: Mutex<InfoCallback>,
    /// After `uciok` only `readyok` is forwarded to the control channel
    handshake_done: AtomicBool,
}

impl Shared {
    fn new() -> Self {
        Shared {
            activity: Mutex::new(Activity::Idle),
            changed: Condvar::new(),
            on_bestmove: Mutex::new(noop_bestmove()),
            on_info: Mutex::new(noop_info()),
            handshake_done: AtomicBool::new(false),
        }
    }

    fn activity(&self) -> Activity {
        *self.activity.lock()
    }

    fn set(&self, next: Activity) {
        *self.activity.lock() = next;
        self.changed.notify_all();
    }

    /// Searching -> Idle; leaves Closed alone.
    fn finish_search(&self) {
        let mut activity = self.activity.lock();
        if *activity == Activity::Searching {
            *activity = Activity::Idle;
        }
        drop(activity);
        self.changed.notify_all();
    }
}

/// A UCI engine reached over a reader/writer pair, usually a child process
pub struct UciEngine {
    writer: Box<dyn Write + Send>,
    child: Option<Child>,
    shared: Arc<Shared>,
    control: Receiver<EngineMessage>,
    options: OptionsMap,
    name: Option<String>,
    handshake_timeout: Duration,
    stop_timeout: Duration,
}

impl UciEngine {
    /// Launch `config.program` and complete the UCI handshake.
    pub fn spawn(config: &EngineConfig) -> Result<Self, EngineError> {
        #[cfg(unix)]
        ignore_default_sigpipe();

        let program = config.program.display().to_string();
        let launch_error = |reason: String| EngineError::Launch {
            program: program.clone(),
            reason,
        };

        let mut child = Command::new(&config.program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| launch_error(e.to_string()))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(launch_error("stdio was not captured".to_string()));
        };

        log::info!("started engine '{program}' (pid {})", child.id());
        Self::from_transport(stdout, stdin, Some(child), config)
    }

    /// Wrap an already connected transport and complete the UCI handshake.
    ///
    /// `child`, when given, is killed if the engine stops responding and
    /// when the engine is dropped.
    pub fn from_transport<R, W>(
        reader: R,
        writer: W,
        child: Option<Child>,
        config: &EngineConfig,
    ) -> Result<Self, EngineError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let shared = Arc::new(Shared::new());
        let (control_tx, control_rx) = unbounded();

        let mut engine = UciEngine {
            writer: Box::new(writer),
            child,
            shared: Arc::clone(&shared),
            control: control_rx,
            options: OptionsMap::new(),
            name: None,
            handshake_timeout: Duration::from_millis(config.handshake_timeout_ms),
            stop_timeout: Duration::from_millis(config.stop_timeout_ms),
        };

        thread::Builder::new()
            .name("uci-reader".to_string())
            .spawn(move || read_loop(BufReader::new(reader), &shared, &control_tx))?;

        engine.handshake()?;
        log::info!(
            "engine '{}' ready with {} options",
            engine.name().unwrap_or("unnamed"),
            engine.options.len()
        );
        Ok(engine)
    }

    /// Name reported with `id name`
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Round-trip `isready`/`readyok`.
    pub fn sync_ready(&mut self) -> Result<(), EngineError> {
        // Stale acknowledgements from an earlier round trip.
        while self.control.try_recv().is_ok() {}
        self.send(&EngineCommand::IsReady)?;
        let deadline = deadline_after(self.handshake_timeout);
        loop {
            if let EngineMessage::ReadyOk = self.recv_control(deadline, "readyok")? {
                return Ok(());
            }
        }
    }

    fn handshake(&mut self) -> Result<(), EngineError> {
        self.send(&EngineCommand::Uci)?;
        let deadline = deadline_after(self.handshake_timeout);
        loop {
            match self.recv_control(deadline, "uciok")? {
                EngineMessage::Id { key, value } if key == "name" => self.name = Some(value),
                EngineMessage::Option(option) => self.options.insert(option),
                EngineMessage::UciOk => break,
                _ => {}
            }
        }
        self.shared.handshake_done.store(true, Ordering::SeqCst);
        self.sync_ready()
    }

    fn recv_control(
        &self,
        deadline: Option<Instant>,
        expected: &'static str,
    ) -> Result<EngineMessage, EngineError> {
        let Some(deadline) = deadline else {
            return self.control.recv().map_err(|_| EngineError::Disconnected);
        };
        match self.control.recv_deadline(deadline) {
            Ok(msg) => Ok(msg),
            Err(RecvTimeoutError::Timeout) => Err(EngineError::Handshake { expected }),
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::Disconnected),
        }
    }

    fn send(&mut self, cmd: &EngineCommand) -> Result<(), EngineError> {
        let line = cmd.to_string();
        if line.contains(['\n', '\r']) {
            return Err(EngineError::InvalidCommand { line });
        }
        if self.peer_gone() {
            return Err(EngineError::Disconnected);
        }
        log::trace!(">> {line}");
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Whether the engine can no longer read commands. Writing to an exited
    /// process raises SIGPIPE.
    fn peer_gone(&mut self) -> bool {
        if self.shared.activity() == Activity::Closed {
            return true;
        }
        let exited = self
            .child
            .as_mut()
            .is_some_and(|child| matches!(child.try_wait(), Ok(Some(_))));
        if exited {
            log::debug!("engine process has exited");
            self.shared.set(Activity::Closed);
        }
        exited
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.shared.activity() == Activity::Closed {
            return Err(EngineError::Disconnected);
        }
        Ok(())
    }

    /// Kill the process (if we own one) and refuse further searches.
    fn terminate(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.shared.set(Activity::Closed);
    }
}

impl Engine for UciEngine {
    fn options(&self) -> &OptionsMap {
        &self.options
    }

    fn set_option(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.ensure_open()?;
        let (name, value) = self.options.validate(name, value)?;
        self.send(&EngineCommand::SetOption { name, value })
    }

    fn set_position(&mut self, position: &str, moves: &[String]) -> Result<(), EngineError> {
        self.ensure_open()?;
        self.send(&EngineCommand::Position {
            position: position.to_string(),
            moves: moves.to_vec(),
        })
    }

    fn go(&mut self, limits: &SearchLimits) -> Result<(), EngineError> {
        {
            let mut activity = self.shared.activity.lock();
            match *activity {
                Activity::Searching => return Err(EngineError::Busy),
                Activity::Closed => return Err(EngineError::Disconnected),
                Activity::Idle => *activity = Activity::Searching,
            }
        }
        if let Err(e) = self.send(&EngineCommand::Go(*limits)) {
            self.shared.finish_search();
            return Err(e);
        }
        Ok(())
    }

    fn stop(&mut self) {
        if self.shared.activity() != Activity::Searching {
            return;
        }
        if let Err(e) = self.send(&EngineCommand::Stop) {
            log::warn!("failed to send stop: {e}");
        }
    }

    /// Bounded by the configured stop timeout; an engine that overruns it
    /// is terminated.
    fn wait_for_search_finished(&mut self) {
        let deadline = deadline_after(self.stop_timeout);
        let mut activity = self.shared.activity.lock();
        while *activity == Activity::Searching {
            match deadline {
                Some(deadline) => {
                    if self
                        .shared
                        .changed
                        .wait_until(&mut activity, deadline)
                        .timed_out()
                    {
                        break;
                    }
                }
                None => self.shared.changed.wait(&mut activity),
            }
        }
        if *activity != Activity::Searching {
            return;
        }
        drop(activity);

        log::error!(
            "engine still searching {} ms after stop; terminating it",
            self.stop_timeout.as_millis()
        );
        self.terminate();
    }

    fn set_on_bestmove(&mut self, callback: BestMoveCallback) {
        *self.shared.on_bestmove.lock() = callback;
    }

    fn set_on_info(&mut self, callback: InfoCallback) {
        *self.shared.on_info.lock() = callback;
    }

    fn is_searching(&self) -> bool {
        self.shared.activity() == Activity::Searching
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        if !self.peer_gone() {
            if self.shared.activity() == Activity::Searching {
                let _ = self.send(&EngineCommand::Stop);
            }
            let _ = self.send(&EngineCommand::Quit);
        }

        if let Some(mut child) = self.child.take() {
            let deadline = Instant::now() + Duration::from_millis(QUIT_GRACE_MS);
            loop {
                match child.try_wait() {
                    Ok(Some(_)) => break,
                    Ok(None) if Instant::now() < deadline => {
                        thread::sleep(Duration::from_millis(EXIT_POLL_MS));
                    }
                    _ => {
                        let _ = child.kill();
                        let _ = child.wait();
                        break;
                    }
                }
            }
        }
    }
}

/// Reader thread body: dispatch engine output until EOF.
fn read_loop<R: BufRead>(mut reader: R, shared: &Shared, control: &Sender<EngineMessage>) {
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                log::warn!("engine output unreadable: {e}");
                break;
            }
        }
        let Some(msg) = parse_engine_message(&line) else {
            continue;
        };
        match msg {
            EngineMessage::Info(info) => {
                // Clone out of the lock so the callback may re-register.
                let callback = shared.on_info.lock().clone();
                callback(&info);
            }
            EngineMessage::BestMove { mv, ponder } => {
                let callback = shared.on_bestmove.lock().clone();
                callback(&mv, ponder.as_deref());
                // Idle only after delivery: a finished wait implies the
                // callback has run.
                shared.finish_search();
            }
            EngineMessage::Unknown(text) => log::trace!("<< {text}"),
            EngineMessage::ReadyOk => {
                let _ = control.send(EngineMessage::ReadyOk);
            }
            other if shared.handshake_done.load(Ordering::SeqCst) => {
                log::debug!("ignoring {other:?} after handshake");
            }
            other => {
                let _ = control.send(other);
            }
        }
    }
    shared.set(Activity::Closed);
    log::debug!("engine output closed");
}

/// Make a write to an exited engine fail with `EPIPE` instead of killing
/// the process. A handler the host installed is left in place.
#[cfg(unix)]
fn ignore_default_sigpipe() {
    static IGNORE: std::sync::Once = std::sync::Once::new();
    IGNORE.call_once(|| {
        // SAFETY: only swaps the process-wide disposition of SIGPIPE.
        unsafe {
            let previous = libc::signal(libc::SIGPIPE, libc::SIG_IGN);
            if previous != libc::SIG_DFL && previous != libc::SIG_ERR {
                libc::signal(libc::SIGPIPE, previous);
            }
        }
    });
}
