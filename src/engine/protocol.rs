//! UCI text protocol, seen from the GUI side.
//!
//! [`EngineCommand`] renders the lines we send; [`parse_engine_message`]
//! classifies the lines the engine sends back.

use std::fmt;

use super::options::{parse_option_declaration, EngineOption};
use super::SearchLimits;

/// A command sent to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    Uci,
    IsReady,
    SetOption { name: String, value: String },
    Position { position: String, moves: Vec<String> },
    Go(SearchLimits),
    Stop,
    Quit,
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineCommand::Uci => write!(f, "uci"),
            EngineCommand::IsReady => write!(f, "isready"),
            EngineCommand::SetOption { name, value } => {
                if value.is_empty() {
                    write!(f, "setoption name {name}")
                } else {
                    write!(f, "setoption name {name} value {value}")
                }
            }
            EngineCommand::Position { position, moves } => {
                if position.trim() == "startpos" {
                    write!(f, "position startpos")?;
                } else {
                    write!(f, "position fen {position}")?;
                }
                if !moves.is_empty() {
                    write!(f, " moves {}", moves.join(" "))?;
                }
                Ok(())
            }
            EngineCommand::Go(limits) => write!(f, "go {limits}"),
            EngineCommand::Stop => write!(f, "stop"),
            EngineCommand::Quit => write!(f, "quit"),
        }
    }
}

/// Search progress reported on an `info` line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchInfo {
    pub depth: u32,
    pub seldepth: u32,
    pub score: String,
    pub nodes: u64,
    pub nps: u64,
    pub hashfull: u32,
    pub time_ms: u128,
    pub pv: String,
    /// Free text from `info string ...`
    pub text: Option<String>,
}

/// A line received from the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineMessage {
    Id { key: String, value: String },
    Option(EngineOption),
    UciOk,
    ReadyOk,
    Info(SearchInfo),
    BestMove { mv: String, ponder: Option<String> },
    Unknown(String),
}

pub fn parse_engine_message(line: &str) -> Option<EngineMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parts: Vec<&str> = trimmed.split_whitespace().collect();

    let msg = match parts[0] {
        "uciok" => EngineMessage::UciOk,
        "readyok" => EngineMessage::ReadyOk,
        "id" if parts.len() >= 2 => EngineMessage::Id {
            key: parts[1].to_string(),
            value: parts[2..].join(" "),
        },
        "option" => match parse_option_declaration(trimmed) {
            Some(opt) => EngineMessage::Option(opt),
            None => EngineMessage::Unknown(trimmed.to_string()),
        },
        "info" => EngineMessage::Info(parse_info(&parts)),
        "bestmove" => EngineMessage::BestMove {
            mv: parts.get(1).map(|m| (*m).to_string()).unwrap_or_default(),
            ponder: match (parts.get(2), parts.get(3)) {
                (Some(&"ponder"), Some(p)) => Some((*p).to_string()),
                _ => None,
            },
        },
        _ => EngineMessage::Unknown(trimmed.to_string()),
    };

    Some(msg)
}

fn parse_info(parts: &[&str]) -> SearchInfo {
    let mut info = SearchInfo::default();
    let mut i = 1;
    while i < parts.len() {
        let next = parts.get(i + 1).copied().unwrap_or("");
        match parts[i] {
            "depth" => info.depth = next.parse().unwrap_or(0),
            "seldepth" => info.seldepth = next.parse().unwrap_or(0),
            "nodes" => info.nodes = next.parse().unwrap_or(0),
            "nps" => info.nps = next.parse().unwrap_or(0),
            "hashfull" => info.hashfull = next.parse().unwrap_or(0),
            "time" => info.time_ms = next.parse().unwrap_or(0),
            "score" => {
                // score cp 34 | score mate -3, optionally followed by a bound
                let end = (i + 3).min(parts.len());
                let mut score = parts[i + 1..end].join(" ");
                if let Some(bound @ (&"lowerbound" | &"upperbound")) = parts.get(end) {
                    score.push(' ');
                    score.push_str(bound);
                    i += 1;
                }
                info.score = score;
                i += 1;
            }
            "pv" => {
                info.pv = parts[i + 1..].join(" ");
                break;
            }
            "string" => {
                info.text = Some(parts[i + 1..].join(" "));
                break;
            }
            _ => {
                i += 1;
                continue;
            }
        }
        i += 2;
    }
    info
}
