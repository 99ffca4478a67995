//! Clap command tree.

use clap::{Arg, ArgAction, Command};

/// Build the top-level `isolab` command.
pub fn build_cli() -> Command {
    Command::new("isolab")
        .about("Isolation-level laboratory: watch anomalies happen, or not")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Log to stderr; repeat for more detail (-v debug, -vv trace)"),
        )
        .subcommand(demo_command())
        .subcommand(replay_command())
}

fn demo_command() -> Command {
    Command::new("demo")
        .about("Run an anomaly scenario under one or every isolation level")
        .arg(
            Arg::new("scenario")
                .required(true)
                .value_parser(["dirty-read", "dirty-write", "read-skew", "write-skew", "all"])
                .help("Anomaly to provoke"),
        )
        .arg(
            Arg::new("level")
                .long("level")
                .short('l')
                .help("Only this level (ru, rc, si, 2pl or a full name)"),
        )
        .arg(json_flag())
        .arg(timeout_arg("2000"))
}

fn replay_command() -> Command {
    Command::new("replay")
        .about("Play a JSON script of reads, writes and commits")
        .arg(Arg::new("file").required(true).help("Script file"))
        .arg(
            Arg::new("seed")
                .long("seed")
                .short('s')
                .action(ArgAction::Append)
                .help("Committed row before the script starts, as key=value"),
        )
        .arg(json_flag())
        .arg(timeout_arg("3000"))
}

fn json_flag() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print JSON instead of text")
}

fn timeout_arg(default: &'static str) -> Arg {
    Arg::new("timeout-ms")
        .long("timeout-ms")
        .value_parser(clap::value_parser!(u64))
        .default_value(default)
        .help("Give up on blocked transactions after this many milliseconds")
}
