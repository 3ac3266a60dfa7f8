//! A scripted UCI engine reachable through in-memory pipes.
//!
//! `connect` returns a reader/writer pair suitable for
//! `UciEngine::from_transport`, plus a log of every line the peer received.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

#[derive(Clone, Debug)]
pub struct PeerScript {
    pub name: &'static str,
    pub options: Vec<&'static str>,
    pub bestmove: &'static str,
    pub ponder: Option<&'static str>,
    pub think: Duration,
    /// Reply with bestmove after `stop`
    pub honor_stop: bool,
    /// Never answer `uci` / `isready`
    pub silent_handshake: bool,
    /// Close the output pipe when a search starts
    pub crash_on_go: bool,
}

impl Default for PeerScript {
    fn default() -> Self {
        PeerScript {
            name: "Scripted 1.0",
            options: vec![
                "option name Threads type spin default 1 min 1 max 512",
                "option name Hash type spin default 16 min 1 max 33554432",
                "option name Skill Level type spin default 20 min 0 max 20",
                "option name Ponder type check default false",
            ],
            bestmove: "e2e4",
            ponder: Some("e7e5"),
            think: Duration::from_millis(5),
            honor_stop: true,
            silent_handshake: false,
            crash_on_go: false,
        }
    }
}

pub type Received = Arc<Mutex<Vec<String>>>;

pub fn connect(script: PeerScript) -> (PeerReader, PeerWriter, Received) {
    let (tx, rx) = unbounded();
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let reader = PeerReader {
        lines: rx,
        pending: Vec::new(),
    };
    let writer = PeerWriter {
        script,
        buf: Vec::new(),
        out: Some(tx),
        stop: None,
        received: Arc::clone(&received),
    };
    (reader, writer, received)
}

/// Engine output, as seen by the GUI side
pub struct PeerReader {
    lines: Receiver<String>,
    pending: Vec<u8>,
}

impl Read for PeerReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.lines.recv() {
                Ok(line) => {
                    self.pending = line.into_bytes();
                    self.pending.push(b'\n');
                }
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

/// Engine input: interprets each complete line
pub struct PeerWriter {
    script: PeerScript,
    buf: Vec<u8>,
    out: Option<Sender<String>>,
    stop: Option<Sender<()>>,
    received: Received,
}

impl PeerWriter {
    fn emit(&self, line: String) {
        if let Some(out) = &self.out {
            let _ = out.send(line);
        }
    }

    fn handle(&mut self, line: &str) {
        self.received.lock().push(line.to_string());
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.first().copied() {
            Some("uci") if !self.script.silent_handshake => {
                self.emit(format!("id name {}", self.script.name));
                self.emit("id author nobody".to_string());
                for option in self.script.options.clone() {
                    self.emit(option.to_string());
                }
                self.emit("uciok".to_string());
            }
            Some("isready") if !self.script.silent_handshake => {
                self.emit("readyok".to_string());
            }
            Some("go") => self.go(&parts),
            Some("stop") => {
                if let Some(stop) = self.stop.take() {
                    let _ = stop.try_send(());
                }
            }
            Some("quit") => {
                self.out = None;
                self.stop = None;
            }
            _ => {}
        }
    }

    fn go(&mut self, parts: &[&str]) {
        if self.script.crash_on_go {
            self.out = None;
            return;
        }
        let Some(out) = self.out.clone() else {
            return;
        };
        let movetime = parts
            .iter()
            .position(|p| *p == "movetime")
            .and_then(|i| parts.get(i + 1))
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(self.script.think, Duration::from_millis);
        let think = self.script.think.min(movetime);
        let bestmove = match self.script.ponder {
            Some(ponder) => format!("bestmove {} ponder {ponder}", self.script.bestmove),
            None => format!("bestmove {}", self.script.bestmove),
        };
        let honor_stop = self.script.honor_stop;
        let (stop_tx, stop_rx) = bounded::<()>(1);
        self.stop = Some(stop_tx);

        thread::spawn(move || {
            let stopped = !matches!(stop_rx.recv_timeout(think), Err(RecvTimeoutError::Timeout));
            if !stopped {
                let _ = out.send("info depth 1 score cp 20 nodes 20 time 1 pv e2e4".to_string());
            }
            if !stopped || honor_stop {
                let _ = out.send(bestmove);
            }
        });
    }
}

impl Write for PeerWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            self.handle(&line);
        }
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
