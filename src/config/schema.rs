//! Configuration schema types for `scalerim.toml`
//!
//! Every section is optional; a missing file and an empty file both give the
//! built-in defaults.

use crate::geometry::CropTopAxis;
use serde::{Deserialize, Serialize};

/// Default external scaler command
pub const DEFAULT_COMMAND: &str = "scalerx";

/// External scaler section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerConfig {
    /// Command used when `-c/--command` is not given
    #[serde(default = "default_command")]
    pub command: String,
    /// Tokens forwarded to the scaler ahead of command-line pass-through flags
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_command() -> String {
    DEFAULT_COMMAND.to_string()
}

impl Default for ScalerConfig {
    fn default() -> Self {
        Self { command: default_command(), args: Vec::new() }
    }
}

/// Cropping section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Extra margin used when `-e/--extend` is not given
    #[serde(default)]
    pub extend: i32,
    /// Which scaled dimension centers the crop's top edge
    #[serde(default)]
    pub crop_top: CropTopAxis,
}

/// Root of `scalerim.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScalerimConfig {
    #[serde(default)]
    pub scaler: ScalerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// A single validation problem
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "scaler.command")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scalerim.toml: '{}' {}", self.field, self.message)
    }
}

impl ScalerimConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.scaler.command.trim().is_empty() {
            errors.push(ConfigValidationError {
                field: "scaler.command".to_string(),
                message: "must be a non-empty string".to_string(),
            });
        }

        if let Some(i) = self.scaler.args.iter().position(|a| a.is_empty()) {
            errors.push(ConfigValidationError {
                field: format!("scaler.args[{}]", i),
                message: "must not be empty".to_string(),
            });
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
