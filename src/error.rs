// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use thiserror::Error;

/// 流水线错误 (全部为致命错误,不自动重试)
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to open video {source_name}: {reason}")]
    Open { source_name: String, reason: String },
    #[error("Unsupported upload {file_name}: {reason}")]
    UnsupportedInput { file_name: String, reason: String },
    #[error("Landmark extraction failed: {0}")]
    Extract(String),
    #[error("Frame format error: {0}")]
    Format(String),
    #[error("Trend plot failed: {0}")]
    Plot(String),
    #[error("Output frame size changed from {}x{} to {}x{}", .expected.0, .expected.1, .found.0, .found.1)]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("Failed to write output video: {0}")]
    Write(String),
    #[error("Pose model error: {0}")]
    Model(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn open(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Open {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn unsupported(file_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::UnsupportedInput {
            file_name: file_name.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
