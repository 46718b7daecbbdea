//! Pad, scale, crop
//!
//! [`Job::prepare`] checks the filesystem preconditions and [`Job::run`]
//! drives the three stages inside a temporary [`Workspace`], which is
//! cleaned up whichever stage fails.

use crate::args::{ForceSource, Invocation};
use crate::config::ScalerimConfig;
use crate::geometry::{self, CropPlan, CropRect, CropTopAxis, GeometryError};
use crate::output::{self, OutputError};
use crate::scaler::{self, ScalerCommand, ScalerError};
use crate::workspace::Workspace;
use image::imageops;
use image::RgbaImage;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for the pad/scale/crop pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source file is missing or not a regular file
    #[error("'{}' does not exist.", .0.display())]
    SourceMissing(PathBuf),
    /// Destination exists and overwriting wasn't requested
    #[error("'{}' already exists, and you didn't specify --force or -f.", .0.display())]
    DestinationExists(PathBuf),
    /// Temp directory could not be created
    #[error("could not create temporary workspace: {0}")]
    Workspace(#[source] std::io::Error),
    /// Reading or writing one of the images failed
    #[error("{}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: OutputError,
    },
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Scaler(#[from] ScalerError),
}

impl PipelineError {
    fn image(path: &Path) -> impl FnOnce(OutputError) -> PipelineError + '_ {
        move |source| PipelineError::Image { path: path.to_path_buf(), source }
    }
}

/// Everything the pipeline needs, resolved from arguments and config.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub force: Option<ForceSource>,
    /// Resolved path of the external scaler
    pub program: PathBuf,
    /// Tokens forwarded to the scaler
    pub scaler_args: Vec<OsString>,
    pub extend: i32,
    pub crop_top: CropTopAxis,
    /// Parent of the temporary workspace; the system temp dir when unset
    pub temp_parent: Option<PathBuf>,
}

impl Job {
    /// Merge command-line options over the config, with `program` already resolved.
    ///
    /// Config args come first, then the command-line pass-through tokens.
    pub fn from_invocation(inv: Invocation, config: &ScalerimConfig, program: PathBuf) -> Self {
        let mut scaler_args: Vec<OsString> =
            config.scaler.args.iter().map(OsString::from).collect();
        scaler_args.extend(inv.options.passthrough);
        if forwards_wrap(&scaler_args) {
            log::warn!(
                "-w may produce unexpected results on scalerx or other scalers where -w means \
                 wrap, if the wrapping is used on non-sprites as is its usual use"
            );
        }
        Self {
            source: inv.source,
            destination: inv.destination,
            force: inv.options.force,
            program,
            scaler_args,
            extend: inv.options.extend.unwrap_or(config.output.extend),
            crop_top: config.output.crop_top,
            temp_parent: None,
        }
    }

    /// Check that the source exists and the destination may be written.
    pub fn prepare(&self) -> Result<(), PipelineError> {
        if !self.source.is_file() {
            return Err(PipelineError::SourceMissing(self.source.clone()));
        }
        if self.destination.is_file() {
            match self.force {
                Some(flag) => {
                    log::info!("overwriting '{}' due to {}.", self.destination.display(), flag)
                }
                None => return Err(PipelineError::DestinationExists(self.destination.clone())),
            }
        }
        Ok(())
    }

    /// Run every stage, then clean up the workspace.
    pub fn run(&self) -> Result<Report, PipelineError> {
        self.prepare()?;

        let workspace = match &self.temp_parent {
            Some(parent) => Workspace::create_in(parent, &self.source),
            None => Workspace::create(&self.source),
        }
        .map_err(PipelineError::Workspace)?;

        let result = self.run_in(&workspace);

        // cleanup failures never override the pipeline result
        if let Err(e) = workspace.cleanup() {
            log::warn!("temporary files may remain: {}", e);
        }
        result
    }

    fn run_in(&self, workspace: &Workspace) -> Result<Report, PipelineError> {
        let source_img =
            output::load_rgba(&self.source).map_err(PipelineError::image(&self.source))?;
        let source_size = source_img.dimensions();

        let padded = pad_image(&source_img)?;
        let padded_size = padded.dimensions();
        if !output::keeps_alpha(workspace.padded()) {
            log::warn!(
                "'{}' has no alpha channel, so the padding is saved opaque and the scaler \
                 may still see the sprite's edge; convert the source to PNG first",
                self.source.display()
            );
        }
        log::info!("saving extended image for input: '{}'", workspace.padded().display());
        output::save_image(&padded, workspace.padded())
            .map_err(PipelineError::image(workspace.padded()))?;

        let did_exist = self.destination.is_file();

        let cmd = ScalerCommand::new(
            self.program.clone(),
            self.scaler_args.clone(),
            workspace.padded(),
            workspace.scaled(),
        );
        scaler::run_scaler(&cmd)?;

        let scaled =
            output::load_rgba(workspace.scaled()).map_err(PipelineError::image(workspace.scaled()))?;
        let scaled_size = scaled.dimensions();

        let plan = geometry::plan_crop(source_size, scaled_size, self.extend, self.crop_top)?;
        log::info!("source size: {}x{}", source_size.0, source_size.1);
        log::info!("temp size: {}x{}", scaled_size.0, scaled_size.1);
        log::info!("cropped at: {},{}", plan.rect.left, plan.rect.top);
        log::info!("new size: {}x{}", plan.rect.width, plan.rect.height);

        let cropped = crop_scaled(&scaled, plan.rect);
        log::info!("saving destination '{}'", self.destination.display());
        output::save_image(&cropped, &self.destination)
            .map_err(PipelineError::image(&self.destination))?;

        if did_exist {
            log::info!("'{}' was overwritten.", self.destination.display());
        } else {
            log::info!("'{}' was created.", self.destination.display());
        }

        Ok(Report {
            source_size,
            padded_size,
            scaled_size,
            plan,
            output_size: cropped.dimensions(),
            overwritten: did_exist,
        })
    }
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub source_size: (u32, u32),
    pub padded_size: (u32, u32),
    pub scaled_size: (u32, u32),
    pub plan: CropPlan,
    pub output_size: (u32, u32),
    /// Destination existed before the run
    pub overwritten: bool,
}

/// Whether the scaler is asked to wrap around the image edges.
fn forwards_wrap(args: &[OsString]) -> bool {
    args.iter().any(|a| a == "-w")
}

/// Center `source` on a transparent canvas twice its size.
pub fn pad_image(source: &RgbaImage) -> Result<RgbaImage, GeometryError> {
    let (w, h) = geometry::padded_size(source.width(), source.height())?;
    let mut canvas = RgbaImage::new(w, h);
    let (x, y) = geometry::center_offset((w, h), source.dimensions());
    imageops::replace(&mut canvas, source, x as i64, y as i64);
    Ok(canvas)
}

/// Cut `rect` out of `scaled`; parts outside the image come out transparent.
pub fn crop_scaled(scaled: &RgbaImage, rect: CropRect) -> RgbaImage {
    let mut out = RgbaImage::new(rect.width, rect.height);

    let x0 = rect.left.max(0);
    let y0 = rect.top.max(0);
    let x1 = (rect.left + rect.width as i64).min(scaled.width() as i64);
    let y1 = (rect.top + rect.height as i64).min(scaled.height() as i64);
    if x0 >= x1 || y0 >= y1 {
        return out;
    }

    let view = imageops::crop_imm(scaled, x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
        .to_image();
    imageops::replace(&mut out, &view, x0 - rect.left, y0 - rect.top);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Options;
    use image::Rgba;
    use tempfile::TempDir;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    fn solid(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, RED)
    }

    #[test]
    fn test_pad_image_size_and_position() {
        let padded = pad_image(&solid(3, 5)).unwrap();
        assert_eq!(padded.dimensions(), (6, 10));

        for y in 0..10 {
            for x in 0..6 {
                let inside = (1..4).contains(&x) && (2..7).contains(&y);
                let expected = if inside { RED } else { CLEAR };
                assert_eq!(*padded.get_pixel(x, y), expected, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_pad_image_keeps_partial_alpha() {
        let mut src = RgbaImage::new(2, 2);
        src.put_pixel(0, 0, Rgba([10, 20, 30, 40]));
        let padded = pad_image(&src).unwrap();
        assert_eq!(*padded.get_pixel(1, 1), Rgba([10, 20, 30, 40]));
        assert_eq!(*padded.get_pixel(2, 2), CLEAR);
    }

    #[test]
    fn test_crop_scaled_inside() {
        let mut img = RgbaImage::new(8, 8);
        img.put_pixel(3, 2, RED);
        let out = crop_scaled(&img, CropRect { left: 2, top: 2, width: 4, height: 4 });
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(*out.get_pixel(1, 0), RED);
    }

    #[test]
    fn test_crop_scaled_outside_is_transparent() {
        let img = solid(4, 4);
        let out = crop_scaled(&img, CropRect { left: -1, top: 2, width: 6, height: 4 });
        assert_eq!(out.dimensions(), (6, 4));
        assert_eq!(*out.get_pixel(0, 0), CLEAR);
        assert_eq!(*out.get_pixel(1, 0), RED);
        assert_eq!(*out.get_pixel(4, 1), RED);
        assert_eq!(*out.get_pixel(5, 1), CLEAR);
        assert_eq!(*out.get_pixel(1, 2), CLEAR);
    }

    #[test]
    fn test_crop_scaled_disjoint() {
        let out = crop_scaled(&solid(4, 4), CropRect { left: 10, top: 10, width: 2, height: 2 });
        assert_eq!(out, RgbaImage::new(2, 2));
    }

    #[test]
    fn test_pad_then_crop_roundtrip_at_scale_one() {
        let mut src = solid(5, 3);
        src.put_pixel(0, 0, Rgba([0, 255, 0, 255]));
        let padded = pad_image(&src).unwrap();
        let plan =
            geometry::plan_crop((5, 3), padded.dimensions(), 0, CropTopAxis::Height).unwrap();
        assert_eq!(crop_scaled(&padded, plan.rect), src);
    }

    fn job(temp: &TempDir, force: Option<ForceSource>) -> Job {
        let inv = Invocation {
            source: temp.path().join("in.png"),
            destination: temp.path().join("out.png"),
            options: Options { force, ..Options::default() },
        };
        Job::from_invocation(inv, &ScalerimConfig::default(), PathBuf::from("scalerx"))
    }

    #[test]
    fn test_from_invocation_merges_config() {
        let mut config = ScalerimConfig::default();
        config.scaler.args = vec!["-k".into(), "4".into()];
        config.output.extend = 3;
        config.output.crop_top = CropTopAxis::Height;

        let inv = Invocation {
            source: PathBuf::from("a.png"),
            destination: PathBuf::from("b.png"),
            options: Options {
                extend: Some(1),
                passthrough: vec!["--smooth".into()],
                ..Options::default()
            },
        };
        let job = Job::from_invocation(inv, &config, PathBuf::from("/bin/scalerx"));
        assert_eq!(job.scaler_args, vec!["-k", "4", "--smooth"]);
        assert_eq!(job.extend, 1);
        assert_eq!(job.crop_top, CropTopAxis::Height);
        assert_eq!(job.program, PathBuf::from("/bin/scalerx"));
    }

    #[test]
    fn test_forwards_wrap_sees_config_args() {
        let mut config = ScalerimConfig::default();
        config.scaler.args = vec!["-w".into()];
        let inv = Invocation {
            source: PathBuf::from("a.png"),
            destination: PathBuf::from("b.png"),
            options: Options::default(),
        };
        let job = Job::from_invocation(inv, &config, PathBuf::from("scalerx"));
        assert!(forwards_wrap(&job.scaler_args));

        let other = [OsString::from("-k"), OsString::from("2"), OsString::from("-wrap")];
        assert!(!forwards_wrap(&other));
    }

    #[test]
    fn test_prepare_missing_source() {
        let temp = TempDir::new().unwrap();
        let err = job(&temp, None).prepare().unwrap_err();
        assert!(matches!(err, PipelineError::SourceMissing(_)));
    }

    #[test]
    fn test_prepare_destination_exists() {
        let temp = TempDir::new().unwrap();
        output::save_image(&solid(2, 2), &temp.path().join("in.png")).unwrap();
        std::fs::write(temp.path().join("out.png"), b"keep me").unwrap();

        let err = job(&temp, None).prepare().unwrap_err();
        assert!(matches!(err, PipelineError::DestinationExists(_)));
        assert_eq!(std::fs::read(temp.path().join("out.png")).unwrap(), b"keep me");

        job(&temp, Some(ForceSource::Short)).prepare().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_copying_scaler() {
        // a scaler that copies its input is a 1x upscale
        let temp = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        output::save_image(&solid(4, 2), &temp.path().join("in.png")).unwrap();

        let mut job = job(&temp, None);
        job.program = scaler::resolve_command("sh").unwrap();
        job.scaler_args = vec!["-c".into(), "cp \"$1\" \"$2\"".into(), "sh".into()];
        job.crop_top = CropTopAxis::Height;
        job.temp_parent = Some(work.path().to_path_buf());

        let report = job.run().unwrap();
        assert_eq!(report.source_size, (4, 2));
        assert_eq!(report.padded_size, (8, 4));
        assert_eq!(report.output_size, (4, 2));
        assert!(!report.overwritten);
        assert_eq!(output::load_rgba(&temp.path().join("out.png")).unwrap(), solid(4, 2));
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    fn copying_job(temp: &TempDir, work: &TempDir, force: Option<ForceSource>) -> Job {
        let mut job = job(temp, force);
        job.program = scaler::resolve_command("sh").unwrap();
        job.scaler_args = vec!["-c".into(), "cp \"$1\" \"$2\"".into(), "sh".into()];
        job.temp_parent = Some(work.path().to_path_buf());
        job
    }

    #[cfg(unix)]
    #[test]
    fn test_run_reports_overwrite() {
        let temp = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        output::save_image(&solid(2, 2), &temp.path().join("in.png")).unwrap();
        output::save_image(&RgbaImage::new(9, 9), &temp.path().join("out.png")).unwrap();

        let report = copying_job(&temp, &work, Some(ForceSource::Long)).run().unwrap();
        assert!(report.overwritten);
        assert_eq!(output::load_rgba(&temp.path().join("out.png")).unwrap(), solid(2, 2));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_rejects_huge_extend_and_cleans_up() {
        let temp = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        output::save_image(&solid(4, 4), &temp.path().join("in.png")).unwrap();

        let mut job = copying_job(&temp, &work, None);
        job.extend = 1_000_000_000;

        let err = job.run().unwrap_err();
        assert!(matches!(err, PipelineError::Geometry(GeometryError::CropTooLarge { .. })));
        assert!(!temp.path().join("out.png").exists());
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_cleans_up_when_scaler_fails() {
        let temp = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        output::save_image(&solid(4, 4), &temp.path().join("in.png")).unwrap();

        let mut job = job(&temp, None);
        job.program = scaler::resolve_command("sh").unwrap();
        job.scaler_args = vec!["-c".into(), "exit 1".into(), "sh".into()];
        job.temp_parent = Some(work.path().to_path_buf());

        let err = job.run().unwrap_err();
        assert!(matches!(err, PipelineError::Scaler(ScalerError::OutputMissing { .. })));
        assert!(!temp.path().join("out.png").exists());
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }
}
