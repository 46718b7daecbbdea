//! Command-line interface implementation
//!
//! Wires argument parsing, configuration, command resolution and the
//! pipeline together and turns their errors into exit codes.

use clap::{Arg, ArgAction, Command};
use std::env;
use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::process::ExitCode;

use crate::args::{self, FlagTarget, Parsed, FLAGS};
use crate::config;
use crate::pipeline::Job;
use crate::scaler;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;

/// Environment variable holding the log filter (falls back to `RUST_LOG`)
pub const LOG_ENV: &str = "SCALERIM_LOG";

const AFTER_HELP: &str = "\
Any other option is passed along to the scaler command unchanged.

Examples:
  scalerim <source> <destination>
  scalerim <source> <destination> -k 4
  scalerim -k 4 --extend=2 -f <source> <destination>

The order doesn't matter, except source goes before destination.
This is only useful for sprites: the transparent fringe or rounded corners
it leaves would be artifacts on a non-sprite image.";

/// Build a clap command mirroring the flag table, used to render help.
pub fn usage_command() -> Command {
    let mut cmd = Command::new("scalerim")
        .version(env!("CARGO_PKG_VERSION"))
        .about(
            "Pad a sprite before running a pixel-art scaler (default scalerx), \
             then crop the padding back off",
        )
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(Arg::new("source").value_name("SOURCE").required(true).help("Sprite to scale"))
        .arg(
            Arg::new("destination")
                .value_name("DESTINATION")
                .required(true)
                .help("Where to write the scaled sprite"),
        )
        .after_help(AFTER_HELP);

    for spec in FLAGS {
        let mut arg = Arg::new(spec.name).help(spec.help);
        if let Some(long) = spec.long {
            arg = arg.long(long);
        }
        if let Some(short) = spec.short {
            arg = arg.short(short);
        }
        arg = match spec.target {
            FlagTarget::Help => arg.action(ArgAction::Help),
            FlagTarget::Version => arg.action(ArgAction::Version),
            _ if spec.takes_value => {
                arg.action(ArgAction::Set).value_name(spec.value_name).require_equals(!spec.delayed)
            }
            _ => arg.action(ArgAction::SetTrue),
        };
        cmd = cmd.arg(arg);
    }
    cmd
}

fn init_logging() {
    let filter = env::var(LOG_ENV)
        .or_else(|_| env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    let _ = env_logger::Builder::new()
        .parse_filters(&filter)
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            let marker = match record.level() {
                log::Level::Error => "ERROR:",
                log::Level::Warn => "WARNING:",
                log::Level::Info => "*",
                log::Level::Debug | log::Level::Trace => "debug:",
            };
            writeln!(buf, "{} {}", marker, record.args())
        })
        .try_init();
}

/// Parse the process arguments and run.
pub fn run() -> ExitCode {
    init_logging();
    let tokens: Vec<OsString> = env::args_os().skip(1).collect();
    run_with(&tokens)
}

/// Run with explicit arguments (without the program name).
pub fn run_with<S: AsRef<OsStr>>(tokens: &[S]) -> ExitCode {
    let invocation = match args::parse_args(tokens) {
        Ok(Parsed::Run(invocation)) => invocation,
        Ok(Parsed::Help) => {
            println!("{}", usage_command().render_help());
            return ExitCode::from(EXIT_SUCCESS);
        }
        Ok(Parsed::Version) => {
            println!("scalerim {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::from(EXIT_SUCCESS);
        }
        Err(e) => {
            eprintln!("{}", usage_command().render_usage());
            eprintln!();
            eprintln!("Error: {}", e);
            eprintln!("Run with --help for more information.");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let config = match config::load_config(None) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let command = invocation.options.command.as_deref().unwrap_or(&config.scaler.command);
    let program = match scaler::resolve_command(command) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Install it, or choose another scaler with -c/--command.");
            return ExitCode::from(EXIT_ERROR);
        }
    };
    log::debug!("path to {}: {}", command, program.display());

    let job = Job::from_invocation(invocation, &config, program);
    match job.run() {
        Ok(report) => {
            log::debug!("{:?}", report);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
