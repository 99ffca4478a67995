//! isolab CLI: anomaly demos and script replay.
//!
//! - `isolab demo <scenario|all> [--level L]` runs canned anomaly scripts
//! - `isolab replay <file.json> [--seed k=v]...` plays a script and prints the trace

mod commands;
mod demo;
mod format;
mod parse;

use std::process;

use isolab::prelude::{play_events, Engine};
use isolab::replay::load_events;

use commands::build_cli;
use format::{format_reports, format_trace, to_json};
use parse::{log_level, matches_to_action, CliAction};

fn main() {
    let matches = build_cli().get_matches();

    if let Some(level) = log_level(&matches) {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
    }

    let exit_code = match matches_to_action(&matches) {
        Ok(action) => match run(action) {
            Ok(output) => {
                print!("{}", output);
                0
            }
            Err(e) => {
                eprintln!("(error) {}", e);
                1
            }
        },
        Err(e) => {
            eprintln!("(error) {}", e);
            1
        }
    };
    process::exit(exit_code);
}

fn run(action: CliAction) -> isolab::Result<String> {
    match action {
        CliAction::Demo {
            scenarios,
            levels,
            json,
            options,
        } => {
            let mut reports = Vec::new();
            for scenario in &scenarios {
                for level in &levels {
                    reports.push(demo::run(*scenario, *level, &options)?);
                }
            }
            Ok(if json {
                to_json(&reports) + "\n"
            } else {
                format_reports(&reports)
            })
        }
        CliAction::Replay {
            path,
            seeds,
            json,
            options,
        } => {
            let events = load_events(&path)?;
            let engine = Engine::new();
            for (key, value) in seeds {
                engine.seed(key, value);
            }
            let trace = play_events(&events, engine.table(), &options)?;
            Ok(if json {
                to_json(&trace) + "\n"
            } else {
                format_trace(&trace)
            })
        }
    }
}
