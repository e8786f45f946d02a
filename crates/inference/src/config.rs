use std::env;
use std::path::PathBuf;

/// Where the model resources live.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Explicit class-list location, tried before the built-in candidates
    pub classes_path: Option<PathBuf>,
    /// Explicit weights location, tried before the built-in candidates
    pub model_path: Option<PathBuf>,
    /// Fixed deployment root
    pub deploy_root: PathBuf,
}

impl InferenceConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        let classes_path = env::var("CLASSES_PATH").ok().map(PathBuf::from);
        let model_path = env::var("MODEL_PATH").ok().map(PathBuf::from);
        let deploy_root = env::var("DEPLOY_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DEPLOY_ROOT));

        Self {
            classes_path,
            model_path,
            deploy_root,
        }
    }
}

pub const DEFAULT_DEPLOY_ROOT: &str = "/app";

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            classes_path: None,
            model_path: None,
            deploy_root: PathBuf::from(DEFAULT_DEPLOY_ROOT),
        }
    }
}
