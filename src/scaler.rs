//! External scaler resolution and invocation

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;

/// Error type for running the external scaler
#[derive(Debug, Error)]
pub enum ScalerError {
    /// The command could not be found on PATH
    #[error("{command} wasn't found in the path")]
    NotFound { command: String },
    /// Neither direct execution nor the shell fallback could start the command
    #[error("failed to run '{command}': {source}")]
    InvocationFailed {
        command: String,
        #[source]
        source: io::Error,
    },
    /// The command ran but did not write its output file
    #[error("the command did not result in '{}'", .path.display())]
    OutputMissing { path: PathBuf },
}

/// Locate an executable.
///
/// A command containing a path separator must name an existing file.
/// Otherwise every `PATH` entry is searched; on Windows each `PATHEXT`
/// extension is tried as well.
pub fn resolve_command(command: &str) -> Result<PathBuf, ScalerError> {
    let not_found = || ScalerError::NotFound { command: command.to_string() };
    if command.is_empty() {
        return Err(not_found());
    }

    let as_path = Path::new(command);
    if as_path.components().count() > 1 || as_path.is_absolute() {
        return if is_executable(as_path) { Ok(as_path.to_path_buf()) } else { Err(not_found()) };
    }

    let path_var = env::var_os("PATH").ok_or_else(not_found)?;
    find_in_paths(command, &path_var).ok_or_else(not_found)
}

fn find_in_paths(command: &str, path_var: &OsString) -> Option<PathBuf> {
    let extensions = executable_extensions();
    for dir in env::split_paths(path_var) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        for ext in &extensions {
            let candidate = dir.join(format!("{}{}", command, ext));
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(windows)]
fn executable_extensions() -> Vec<String> {
    let pathext = env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string());
    let mut exts = vec![String::new()];
    exts.extend(pathext.split(';').filter(|e| !e.is_empty()).map(|e| e.to_ascii_lowercase()));
    exts
}

#[cfg(not(windows))]
fn executable_extensions() -> Vec<String> {
    vec![String::new()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata().map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// A fully-built scaler command line.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalerCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl ScalerCommand {
    /// `program [args...] input output`
    pub fn new(program: PathBuf, args: Vec<OsString>, input: &Path, output: &Path) -> Self {
        Self { program, args, input: input.to_path_buf(), output: output.to_path_buf() }
    }

    /// Every token after the program, in order.
    pub fn argv(&self) -> Vec<OsString> {
        let mut argv = self.args.clone();
        argv.push(self.input.clone().into_os_string());
        argv.push(self.output.clone().into_os_string());
        argv
    }

    /// Space-joined form, used for logging and the shell fallback.
    pub fn shell_line(&self) -> String {
        let mut parts = vec![shell_quote(&self.program.to_string_lossy())];
        parts.extend(self.argv().iter().map(|a| shell_quote(&a.to_string_lossy())));
        parts.join(" ")
    }
}

#[cfg(not(windows))]
fn shell_quote(token: &str) -> String {
    let plain = !token.is_empty()
        && token.chars().all(|c| c.is_ascii_alphanumeric() || "-_=./:,+@%".contains(c));
    if plain {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', "'\\''"))
    }
}

#[cfg(windows)]
fn shell_quote(token: &str) -> String {
    if token.is_empty() || token.contains(' ') {
        format!("\"{}\"", token)
    } else {
        token.to_string()
    }
}

#[cfg(not(windows))]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(line);
    cmd
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(line);
    cmd
}

/// How the scaler was run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalerRun {
    pub status: ExitStatus,
    /// Direct execution failed and the shell fallback was used
    pub via_shell: bool,
}

/// Run the scaler and check that it produced its output file.
///
/// A non-zero exit status is only logged; the output file decides success.
pub fn run_scaler(cmd: &ScalerCommand) -> Result<ScalerRun, ScalerError> {
    let line = cmd.shell_line();
    log::info!("running '{}'...", line);

    let run = match Command::new(&cmd.program).args(cmd.argv()).status() {
        Ok(status) => ScalerRun { status, via_shell: false },
        Err(e) => {
            log::error!("{}", e);
            log::info!("trying the command through the shell...");
            let status = shell_command(&line)
                .status()
                .map_err(|source| ScalerError::InvocationFailed { command: line.clone(), source })?;
            ScalerRun { status, via_shell: true }
        }
    };

    if !run.status.success() {
        log::warn!("'{}' exited with {}", cmd.program.display(), run.status);
    }

    if !cmd.output.is_file() {
        return Err(ScalerError::OutputMissing { path: cmd.output.clone() });
    }
    Ok(run)
}
