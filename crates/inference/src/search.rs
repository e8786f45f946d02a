//! Candidate filesystem locations for the model resources.
//!
//! Each resource has an ordered layout of `(anchor, relative path)` pairs. The
//! first candidate that exists wins, so deployment-specific locations are added
//! by extending a layout table rather than by touching lookup code.

use crate::config::InferenceConfig;
use std::env;
use std::path::{Path, PathBuf};

pub const CLASS_LIST_FILE: &str = "classes.json";
pub const ARTIFACT_FILE: &str = "best_model.safetensors";

/// Base directory a candidate path is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Directory holding the running executable
    CodeDir,
    /// Current working directory; candidates stay relative
    WorkingDir,
    /// Two directories above `CodeDir`
    ProjectRoot,
    /// Fixed deployment root
    DeployRoot,
}

use Anchor::{CodeDir, DeployRoot, ProjectRoot, WorkingDir};

pub const CLASS_LIST_LAYOUT: &[(Anchor, &str)] = &[
    (CodeDir, CLASS_LIST_FILE),
    (WorkingDir, CLASS_LIST_FILE),
    (ProjectRoot, CLASS_LIST_FILE),
    (WorkingDir, "../classes.json"),
    (DeployRoot, CLASS_LIST_FILE),
];

pub const ARTIFACT_LAYOUT: &[(Anchor, &str)] = &[
    (DeployRoot, "dataset/best_model.safetensors"),
    (DeployRoot, ARTIFACT_FILE),
    (CodeDir, "dataset/best_model.safetensors"),
    (CodeDir, ARTIFACT_FILE),
    (ProjectRoot, "dataset/best_model.safetensors"),
    (ProjectRoot, ARTIFACT_FILE),
    (WorkingDir, "dataset/best_model.safetensors"),
    (WorkingDir, "../dataset/best_model.safetensors"),
    (WorkingDir, ARTIFACT_FILE),
];

/// Concrete directories behind each [`Anchor`].
#[derive(Debug, Clone)]
pub struct Anchors {
    pub code_dir: Option<PathBuf>,
    pub project_root: Option<PathBuf>,
    pub deploy_root: PathBuf,
}

impl Anchors {
    /// Derive anchors from the running executable.
    pub fn detect(deploy_root: impl Into<PathBuf>) -> Self {
        let code_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        Self::from_code_dir(code_dir, deploy_root)
    }

    pub fn from_code_dir(code_dir: Option<PathBuf>, deploy_root: impl Into<PathBuf>) -> Self {
        let project_root = code_dir
            .as_deref()
            .and_then(Path::parent)
            .and_then(Path::parent)
            .map(Path::to_path_buf);

        Self {
            code_dir,
            project_root,
            deploy_root: deploy_root.into(),
        }
    }

    fn resolve(&self, anchor: Anchor, relative: &str) -> Option<PathBuf> {
        match anchor {
            CodeDir => self.code_dir.as_ref().map(|dir| dir.join(relative)),
            WorkingDir => Some(PathBuf::from(relative)),
            ProjectRoot => self.project_root.as_ref().map(|dir| dir.join(relative)),
            DeployRoot => Some(self.deploy_root.join(relative)),
        }
    }
}

/// Ordered candidate locations for one resource.
#[derive(Debug, Clone)]
pub struct SearchPath {
    candidates: Vec<PathBuf>,
}

impl SearchPath {
    /// Expand a layout against `anchors`, with an optional explicit path first.
    pub fn new(anchors: &Anchors, layout: &[(Anchor, &str)], explicit: Option<&Path>) -> Self {
        let mut candidates: Vec<PathBuf> = explicit.map(Path::to_path_buf).into_iter().collect();

        for (anchor, relative) in layout {
            if let Some(path) = anchors.resolve(*anchor, relative) {
                if !candidates.contains(&path) {
                    candidates.push(path);
                }
            }
        }

        Self { candidates }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// First candidate that is an existing file. Stops probing at the first hit.
    pub fn first_existing(&self) -> Option<&Path> {
        self.candidates
            .iter()
            .find(|path| path.is_file())
            .map(PathBuf::as_path)
    }
}

/// Search paths for both model resources.
#[derive(Debug, Clone)]
pub struct ResourceLocator {
    pub classes: SearchPath,
    pub artifact: SearchPath,
}

impl ResourceLocator {
    pub fn new(anchors: &Anchors, config: &InferenceConfig) -> Self {
        Self {
            classes: SearchPath::new(anchors, CLASS_LIST_LAYOUT, config.classes_path.as_deref()),
            artifact: SearchPath::new(anchors, ARTIFACT_LAYOUT, config.model_path.as_deref()),
        }
    }

    pub fn from_config(config: &InferenceConfig) -> Self {
        Self::new(&Anchors::detect(config.deploy_root.clone()), config)
    }
}
