//! scalerim - pad sprites before pixel-art upscaling, then crop the padding off

use std::process::ExitCode;

use scalerim::cli;

fn main() -> ExitCode {
    cli::run()
}
