use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures of the classification core.
///
/// Load failures (`MissingResource`, `CorruptArtifact`, `ArchitectureMismatch`)
/// are fatal for the process. `InvalidImage` and `Runtime` only fail the
/// request that raised them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("{resource} not found. Searched: {}{}", format_paths(.searched), format_detail(.detail))]
    MissingResource {
        resource: &'static str,
        searched: Vec<PathBuf>,
        detail: Option<String>,
    },

    #[error(
        "{} is not a real weights file ({size} bytes, expected tens of megabytes): {reason}",
        .path.display()
    )]
    CorruptArtifact {
        path: PathBuf,
        size: u64,
        reason: String,
    },

    #[error("model architecture does not match the artifact: {0}")]
    ArchitectureMismatch(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(Box<InferenceError>),

    #[error("inference runtime error: {0}")]
    Runtime(String),
}

impl InferenceError {
    /// True for errors caused by the request rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, InferenceError::InvalidImage(_))
    }

    /// The load failure behind a `ModelUnavailable`, or `self`.
    pub fn root_cause(&self) -> &InferenceError {
        match self {
            InferenceError::ModelUnavailable(inner) => inner.root_cause(),
            other => other,
        }
    }

    pub(crate) fn missing(resource: &'static str, searched: &[PathBuf]) -> Self {
        InferenceError::MissingResource {
            resource,
            searched: searched.to_vec(),
            detail: None,
        }
    }

    /// The first existing candidate did not hold a usable resource.
    pub(crate) fn malformed(resource: &'static str, path: &Path, reason: impl ToString) -> Self {
        InferenceError::MissingResource {
            resource,
            searched: vec![path.to_path_buf()],
            detail: Some(reason.to_string()),
        }
    }
}

impl From<candle_core::Error> for InferenceError {
    fn from(e: candle_core::Error) -> Self {
        InferenceError::Runtime(e.to_string())
    }
}

impl From<preprocess::PreprocessError> for InferenceError {
    fn from(e: preprocess::PreprocessError) -> Self {
        InferenceError::InvalidImage(e.to_string())
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    let shown: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    format!("[{}]", shown.join(", "))
}

fn format_detail(detail: &Option<String>) -> String {
    detail
        .as_ref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default()
}
