//! Temporary workspace for the padded and scaled intermediates

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Extension used when the source path has none
const DEFAULT_EXTENSION: &str = "png";

/// A temp directory holding `padded.<ext>` and `scaled.<ext>`.
///
/// Call [`Workspace::cleanup`] to remove it and see what failed; dropping
/// the workspace still removes the directory, silently.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    padded: PathBuf,
    scaled: PathBuf,
}

impl Workspace {
    /// Create a workspace under the system temp directory.
    pub fn create(source: &Path) -> io::Result<Self> {
        Self::create_in(&std::env::temp_dir(), source)
    }

    /// Create a workspace under `parent`, naming files after `source`'s extension.
    pub fn create_in(parent: &Path, source: &Path) -> io::Result<Self> {
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_EXTENSION);
        let dir = tempfile::Builder::new().prefix("scalerim-").tempdir_in(parent)?;
        let padded = dir.path().join(format!("padded.{}", ext));
        let scaled = dir.path().join(format!("scaled.{}", ext));
        log::debug!("created workspace '{}'", dir.path().display());
        Ok(Self { dir, padded, scaled })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Input for the external scaler
    pub fn padded(&self) -> &Path {
        &self.padded
    }

    /// Output expected from the external scaler
    pub fn scaled(&self) -> &Path {
        &self.scaled
    }

    /// Remove both intermediates and the directory.
    ///
    /// Every removal is attempted; the first error is returned.
    pub fn cleanup(self) -> io::Result<()> {
        let mut first_err = None;
        for file in [&self.padded, &self.scaled] {
            if file.is_file() {
                if let Err(e) = fs::remove_file(file) {
                    log::warn!("could not remove '{}': {}", file.display(), e);
                    first_err.get_or_insert(e);
                }
            }
        }

        let dir = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            log::warn!("could not remove '{}': {}", dir.display(), e);
            first_err.get_or_insert(e);
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_uses_source_extension() {
        let parent = TempDir::new().unwrap();
        let ws = Workspace::create_in(parent.path(), Path::new("sprites/hero.bmp")).unwrap();
        assert_eq!(ws.padded().file_name().unwrap(), "padded.bmp");
        assert_eq!(ws.scaled().file_name().unwrap(), "scaled.bmp");
        assert!(ws.path().starts_with(parent.path()));
        assert!(ws.path().is_dir());
    }

    #[test]
    fn test_workspace_default_extension() {
        let parent = TempDir::new().unwrap();
        let ws = Workspace::create_in(parent.path(), Path::new("hero")).unwrap();
        assert_eq!(ws.padded().extension().unwrap(), "png");
    }

    #[test]
    fn test_cleanup_removes_everything() {
        let parent = TempDir::new().unwrap();
        let ws = Workspace::create_in(parent.path(), Path::new("hero.png")).unwrap();
        fs::write(ws.padded(), b"padded").unwrap();
        fs::write(ws.scaled(), b"scaled").unwrap();
        let dir = ws.path().to_path_buf();

        ws.cleanup().unwrap();
        assert!(!dir.exists());
        assert_eq!(fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_cleanup_with_nothing_written() {
        let parent = TempDir::new().unwrap();
        let ws = Workspace::create_in(parent.path(), Path::new("hero.png")).unwrap();
        let dir = ws.path().to_path_buf();
        ws.cleanup().unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let parent = TempDir::new().unwrap();
        let dir = {
            let ws = Workspace::create_in(parent.path(), Path::new("hero.png")).unwrap();
            fs::write(ws.padded(), b"padded").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!dir.exists());
    }
}
