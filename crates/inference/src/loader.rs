use crate::artifact;
use crate::backend::InferenceBackend;
use crate::config::InferenceConfig;
use crate::device::{device_name, select_device};
use crate::error::InferenceError;
use crate::model::{self, ResNetConfig};
use crate::registry::{ClassList, ClassRegistry};
use crate::search::{ResourceLocator, SearchPath};
use std::sync::Arc;
use std::time::Instant;

/// Class list and network, loaded together.
pub struct LoadedModel {
    pub classes: Arc<ClassList>,
    pub network: Box<dyn InferenceBackend>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("classes", &self.classes.len())
            .finish_non_exhaustive()
    }
}

/// One call performs the whole filesystem search, validation and
/// deserialization.
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<LoadedModel, InferenceError>;
}

/// Loads the class list and weights artifact from the candidate locations.
pub struct FsModelLoader {
    registry: ClassRegistry,
    artifact: SearchPath,
    architecture: ResNetConfig,
}

impl FsModelLoader {
    pub fn new(locator: ResourceLocator) -> Self {
        Self::with_architecture(locator, ResNetConfig::resnet50())
    }

    /// Loader for a network other than ResNet-50, e.g. a reduced test network.
    pub fn with_architecture(locator: ResourceLocator, architecture: ResNetConfig) -> Self {
        Self {
            registry: ClassRegistry::new(locator.classes),
            artifact: locator.artifact,
            architecture,
        }
    }

    pub fn from_config(config: &InferenceConfig) -> Self {
        Self::new(ResourceLocator::from_config(config))
    }
}

impl ModelLoader for FsModelLoader {
    fn load(&self) -> Result<LoadedModel, InferenceError> {
        let _span = common::span!("load_model");
        let start = Instant::now();

        let classes = self.registry.load_classes()?;
        let path = artifact::resolve_artifact_path(&self.artifact)?;
        let device = select_device();

        let network = model::build_network_with(self.architecture, classes.len())?;
        let network = model::load_weights(network, &path, &device)?;

        tracing::info!(
            device = device_name(&device),
            classes = classes.len(),
            path = %path.display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model ready"
        );

        Ok(LoadedModel {
            classes,
            network: Box::new(network),
        })
    }
}
