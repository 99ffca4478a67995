//! ArgMatches → CliAction conversion.

use clap::ArgMatches;
use isolab::prelude::{IsolationLevel, Key, ReplayOptions, Value};
use std::path::PathBuf;
use std::time::Duration;

use crate::demo::Scenario;

/// The result of parsing the command line.
#[derive(Debug)]
pub enum CliAction {
    /// Run scenarios against levels.
    Demo {
        scenarios: Vec<Scenario>,
        levels: Vec<IsolationLevel>,
        json: bool,
        options: ReplayOptions,
    },
    /// Play a script file.
    Replay {
        path: PathBuf,
        seeds: Vec<(Key, Value)>,
        json: bool,
        options: ReplayOptions,
    },
}

/// Convert clap ArgMatches into a CliAction.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    let (sub_name, sub_matches) = matches
        .subcommand()
        .ok_or_else(|| "No command provided".to_string())?;

    match sub_name {
        "demo" => parse_demo(sub_matches),
        "replay" => parse_replay(sub_matches),
        other => Err(format!("Unknown command: {}", other)),
    }
}

/// Verbosity count → log level; `None` keeps logging off.
pub fn log_level(matches: &ArgMatches) -> Option<tracing::Level> {
    match matches.get_count("verbose") {
        0 => None,
        1 => Some(tracing::Level::DEBUG),
        _ => Some(tracing::Level::TRACE),
    }
}

fn parse_demo(matches: &ArgMatches) -> Result<CliAction, String> {
    let scenarios = match required(matches, "scenario")? {
        "all" => Scenario::ALL.to_vec(),
        name => vec![name.parse()?],
    };
    let levels = match matches.get_one::<String>("level") {
        Some(raw) => vec![parse_level(raw)?],
        None => IsolationLevel::ALL.to_vec(),
    };
    Ok(CliAction::Demo {
        scenarios,
        levels,
        json: matches.get_flag("json"),
        options: replay_options(matches),
    })
}

fn parse_replay(matches: &ArgMatches) -> Result<CliAction, String> {
    let path = PathBuf::from(required(matches, "file")?);
    let seeds = matches
        .get_many::<String>("seed")
        .into_iter()
        .flatten()
        .map(String::as_str)
        .map(parse_seed)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CliAction::Replay {
        path,
        seeds,
        json: matches.get_flag("json"),
        options: replay_options(matches),
    })
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str, String> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| format!("Missing argument: {}", name))
}

fn replay_options(matches: &ArgMatches) -> ReplayOptions {
    let options = ReplayOptions::default();
    match matches.get_one::<u64>("timeout-ms") {
        Some(ms) => options.with_timeout(Duration::from_millis(*ms)),
        None => options,
    }
}

/// Parse a level name, e.g. `rc` or `two-phase-locking`.
pub fn parse_level(raw: &str) -> Result<IsolationLevel, String> {
    raw.parse::<IsolationLevel>().map_err(|e| e.to_string())
}

/// Parse a `key=value` seed.
pub fn parse_seed(raw: &str) -> Result<(Key, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Seed must be key=value, got: {}", raw))?;
    if key.is_empty() {
        return Err(format!("Seed has an empty key: {}", raw));
    }
    Ok((Key::from(key), Value::from(value)))
}
