//! pxscale - nearest-neighbor integer upscaler
//!
//! Takes the same `-k <n> <input> <output>` shape as scalerx, so it can
//! stand in for it: `scalerim -c pxscale -k 4 hero.png hero_4x.png`.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use scalerim::output::{load_rgba, save_image, scale_image};

#[derive(Parser)]
#[command(name = "pxscale")]
#[command(about = "Scale an image by an integer factor using nearest-neighbor sampling")]
#[command(version)]
struct Args {
    /// Scale factor (1-16)
    #[arg(short = 'k', default_value = "2", value_parser = clap::value_parser!(u32).range(1..=16))]
    scale: u32,

    /// Input image
    input: PathBuf,

    /// Output image
    output: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let image = match load_rgba(&args.input) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: Cannot open input file '{}': {}", args.input.display(), e);
            return ExitCode::from(1);
        }
    };

    let scaled = scale_image(image, args.scale);
    if let Err(e) = save_image(&scaled, &args.output) {
        eprintln!("Error: Cannot write '{}': {}", args.output.display(), e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}
