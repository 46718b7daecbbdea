//! Command-line token parsing
//!
//! Scalerim only understands a handful of flags. Everything else belongs to
//! the external scaler, so parsing cannot reject unknown options: they are
//! collected, in order, as pass-through tokens. The known flags live in a
//! single schema table, [`FLAGS`], consulted by [`parse_args`].
//!
//! Tokens are `OsString`s: paths and forwarded options reach the pipeline
//! and the scaler byte for byte, even when they are not valid UTF-8.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use thiserror::Error;

/// Error type for argument parsing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgsError {
    /// Source and/or destination positional missing
    #[error("{}", missing_message(*.no_source, *.no_destination))]
    MissingPositional { no_source: bool, no_destination: bool },
    /// A value flag appeared without its value
    #[error("{flag} requires a value ({usage})")]
    MissingValue { flag: String, usage: &'static str },
    /// A value could not be parsed
    #[error("invalid value '{value}' for {flag}: expected {expected}")]
    InvalidValue { flag: String, value: String, expected: &'static str },
}

fn missing_message(no_source: bool, no_destination: bool) -> String {
    let mut msg = String::new();
    if no_source {
        msg.push_str("You didn't supply a source file (a first argument not starting with '-'). ");
    }
    if no_destination {
        msg.push_str(
            "You didn't supply a destination file (a second argument not starting with '-').",
        );
    }
    msg.trim_end().to_string()
}

/// What a recognized flag sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagTarget {
    Force,
    Command,
    Extend,
    /// Forwarded to the external scaler together with its value.
    Forward,
    Help,
    Version,
}

/// One entry of the flag schema.
#[derive(Debug, Clone, Copy)]
pub struct FlagSpec {
    /// Stable identifier
    pub name: &'static str,
    /// Long name, used as `--name`
    pub long: Option<&'static str>,
    /// Short form, used as `-c`
    pub short: Option<char>,
    /// Whether the flag carries a value
    pub takes_value: bool,
    /// Whether a missing inline value is taken from the next token
    pub delayed: bool,
    pub target: FlagTarget,
    /// Placeholder shown in usage
    pub value_name: &'static str,
    pub help: &'static str,
}

impl FlagSpec {
    fn usage(&self) -> &'static str {
        if self.delayed {
            "pass it as the next argument or after '='"
        } else {
            "pass it after '=', e.g. -e=2"
        }
    }
}

/// The flags scalerim itself understands.
pub const FLAGS: &[FlagSpec] = &[
    FlagSpec {
        name: "force",
        long: Some("force"),
        short: Some('f'),
        takes_value: false,
        delayed: false,
        target: FlagTarget::Force,
        value_name: "",
        help: "Overwrite destination file if present",
    },
    FlagSpec {
        name: "command",
        long: Some("command"),
        short: Some('c'),
        takes_value: true,
        delayed: true,
        target: FlagTarget::Command,
        value_name: "name",
        help: "External scaler command to run (default: scalerx)",
    },
    FlagSpec {
        name: "extend",
        long: Some("extend"),
        short: Some('e'),
        takes_value: true,
        delayed: false,
        target: FlagTarget::Extend,
        value_name: "n",
        help: "Extra pixels of margin to keep around the scaled sprite",
    },
    FlagSpec {
        name: "scale",
        long: None,
        short: Some('k'),
        takes_value: true,
        delayed: true,
        target: FlagTarget::Forward,
        value_name: "n",
        help: "Scale factor, forwarded to the external scaler",
    },
    FlagSpec {
        name: "help",
        long: Some("help"),
        short: None,
        takes_value: false,
        delayed: false,
        target: FlagTarget::Help,
        value_name: "",
        help: "Print help",
    },
    FlagSpec {
        name: "version",
        long: Some("version"),
        short: None,
        takes_value: false,
        delayed: false,
        target: FlagTarget::Version,
        value_name: "",
        help: "Print version",
    },
];

fn find_long(name: &str) -> Option<&'static FlagSpec> {
    FLAGS.iter().find(|f| f.long == Some(name))
}

fn find_short(c: char) -> Option<&'static FlagSpec> {
    FLAGS.iter().find(|f| f.short == Some(c))
}

/// How the force flag was given, for messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceSource {
    Short,
    Long,
}

impl std::fmt::Display for ForceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForceSource::Short => write!(f, "-f"),
            ForceSource::Long => write!(f, "--force"),
        }
    }
}

/// Options collected from the command line.
///
/// Unset fields fall back to the configuration file, then to defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub force: Option<ForceSource>,
    pub command: Option<String>,
    pub extend: Option<i32>,
    /// Tokens for the external scaler, in command-line order.
    pub passthrough: Vec<OsString>,
}

/// A parsed command line that should run the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub options: Options,
}

/// Result of parsing the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Run(Invocation),
    Help,
    Version,
}

/// Mutable state used only while walking the tokens.
#[derive(Default)]
struct ParseState {
    options: Options,
    source: Option<PathBuf>,
    destination: Option<PathBuf>,
    help: bool,
    version: bool,
}

impl ParseState {
    fn apply(
        &mut self,
        spec: &FlagSpec,
        flag: &str,
        value: Option<&OsStr>,
        long: bool,
    ) -> Result<(), ArgsError> {
        match spec.target {
            FlagTarget::Force => {
                self.options.force =
                    Some(if long { ForceSource::Long } else { ForceSource::Short });
                log::debug!("set force to true ({})", flag);
            }
            FlagTarget::Command => {
                let value = require_text(spec, flag, value)?;
                log::debug!("set command to {}", value);
                self.options.command = Some(value.to_string());
            }
            FlagTarget::Extend => {
                let value = require_text(spec, flag, value)?;
                let extend = value.trim().parse::<i32>().map_err(|_| ArgsError::InvalidValue {
                    flag: flag.to_string(),
                    value: value.to_string(),
                    expected: "an integer number of pixels",
                })?;
                log::debug!("set extend to {}", extend);
                self.options.extend = Some(extend);
            }
            FlagTarget::Forward => {
                let value = require_value(spec, flag, value)?;
                log::debug!("forwarding {} {}", flag, value.to_string_lossy());
                self.options.passthrough.push(OsString::from(flag));
                self.options.passthrough.push(value.to_os_string());
            }
            FlagTarget::Help => self.help = true,
            FlagTarget::Version => self.version = true,
        }
        Ok(())
    }

    fn positional(&mut self, token: &OsStr) {
        if self.source.is_none() {
            self.source = Some(PathBuf::from(token));
        } else if self.destination.is_none() {
            self.destination = Some(PathBuf::from(token));
        } else {
            log::error!(
                "You supplied extra unnamed arguments. The scaler will get the {} option.",
                token.to_string_lossy()
            );
            self.options.passthrough.push(token.to_os_string());
        }
    }

    fn pass_along(&mut self, token: &OsStr) {
        log::info!("passing along unknown option '{}'", token.to_string_lossy());
        self.options.passthrough.push(token.to_os_string());
    }
}

fn require_value<'a>(
    spec: &FlagSpec,
    flag: &str,
    value: Option<&'a OsStr>,
) -> Result<&'a OsStr, ArgsError> {
    value.ok_or_else(|| ArgsError::MissingValue { flag: flag.to_string(), usage: spec.usage() })
}

fn require_text<'a>(
    spec: &FlagSpec,
    flag: &str,
    value: Option<&'a OsStr>,
) -> Result<&'a str, ArgsError> {
    let value = require_value(spec, flag, value)?;
    value.to_str().ok_or_else(|| ArgsError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string_lossy().into_owned(),
        expected: "UTF-8 text",
    })
}

/// The flag a non-UTF-8 token would set, if its name is one of ours.
fn known_flag_name(lossy: &str) -> Option<&str> {
    let name = lossy.split_once('=').map_or(lossy, |(n, _)| n);
    let known = match name.strip_prefix("--") {
        Some(long) => find_long(long).is_some(),
        None => {
            let mut chars = name.strip_prefix('-')?.chars();
            matches!((chars.next().and_then(find_short), chars.next()), (Some(_), None))
        }
    };
    known.then_some(name)
}

/// Parse command-line tokens (without the program name).
pub fn parse_args<I, S>(args: I) -> Result<Parsed, ArgsError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let tokens: Vec<OsString> = args.into_iter().map(|s| s.as_ref().to_os_string()).collect();
    let mut state = ParseState::default();
    let mut iter = tokens.iter();

    while let Some(raw) = iter.next() {
        let Some(token) = raw.to_str() else {
            let lossy = raw.to_string_lossy();
            if lossy.len() > 1 && lossy.starts_with('-') {
                if let Some(flag) = known_flag_name(&lossy).map(str::to_string) {
                    return Err(ArgsError::InvalidValue {
                        flag,
                        value: lossy.into_owned(),
                        expected: "UTF-8 text",
                    });
                }
                state.pass_along(raw);
            } else {
                state.positional(raw);
            }
            continue;
        };

        if let Some(body) = token.strip_prefix("--") {
            let (name, inline) = match body.split_once('=') {
                Some((n, v)) => (n, Some(v)),
                None => (body, None),
            };
            let Some(spec) = find_long(name) else {
                state.pass_along(raw);
                continue;
            };
            let flag = format!("--{}", name);
            let value = if spec.takes_value && inline.is_none() && spec.delayed {
                iter.next().map(OsString::as_os_str)
            } else {
                inline.map(OsStr::new)
            };
            state.apply(spec, &flag, value, true)?;
        } else if let Some(body) = token.strip_prefix('-').filter(|b| !b.is_empty()) {
            if let Some((name, inline)) = body.split_once('=') {
                // -x=value
                let mut chars = name.chars();
                match (chars.next().and_then(find_short), chars.next()) {
                    (Some(spec), None) if spec.takes_value => {
                        let flag = format!("-{}", name);
                        state.apply(spec, &flag, Some(OsStr::new(inline)), false)?;
                    }
                    _ => state.pass_along(raw),
                }
                continue;
            }

            if body.chars().count() == 1 {
                if let Some(spec) = body.chars().next().and_then(find_short).filter(|s| s.takes_value)
                {
                    let value =
                        if spec.delayed { iter.next().map(OsString::as_os_str) } else { None };
                    state.apply(spec, token, value, false)?;
                    continue;
                }
            }

            // cluster of switches; stops at the first one we don't own
            let mut owned = true;
            for c in body.chars() {
                match find_short(c).filter(|s| !s.takes_value) {
                    Some(spec) => state.apply(spec, token, None, false)?,
                    None => {
                        owned = false;
                        break;
                    }
                }
            }
            if !owned {
                state.pass_along(raw);
            }
        } else {
            state.positional(raw);
        }
    }

    if state.help {
        return Ok(Parsed::Help);
    }
    if state.version {
        return Ok(Parsed::Version);
    }

    match (state.source, state.destination) {
        (Some(source), Some(destination)) => {
            Ok(Parsed::Run(Invocation { source, destination, options: state.options }))
        }
        (source, destination) => Err(ArgsError::MissingPositional {
            no_source: source.is_none(),
            no_destination: destination.is_none(),
        }),
    }
}
