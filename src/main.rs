use std::env;
use std::process::ExitCode;

use bestmove_gate::ffi::global_gate;

const DEFAULT_SKILL: i32 = 20;
const DEFAULT_MOVETIME_MS: i32 = 1000;

fn usage() -> ExitCode {
    eprintln!("usage: bestmove [--skill N] [--movetime MS] <fen | startpos>");
    ExitCode::from(2)
}

fn main() -> ExitCode {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "warn"),
    );

    let mut skill = DEFAULT_SKILL;
    let mut movetime = DEFAULT_MOVETIME_MS;
    let mut position_parts: Vec<String> = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--skill" => match args.next().and_then(|v| v.parse().ok()) {
                Some(v) => skill = v,
                None => return usage(),
            },
            "--movetime" => match args.next().and_then(|v| v.parse().ok()) {
                Some(v) => movetime = v,
                None => return usage(),
            },
            "-h" | "--help" => return usage(),
            _ => position_parts.push(arg),
        }
    }
    if position_parts.is_empty() {
        return usage();
    }
    let position = position_parts.join(" ");

    match global_gate().best_move(&position, skill, movetime) {
        Ok(best) => {
            match best.ponder {
                Some(ponder) => println!("{} ponder {ponder}", best.mv),
                None => println!("{}", best.mv),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::info!("{e}");
            eprintln!("no result");
            ExitCode::FAILURE
        }
    }
}
