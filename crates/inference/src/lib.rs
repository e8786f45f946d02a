pub mod artifact;
pub mod backend;
pub mod cache;
pub mod config;
pub mod device;
pub mod error;
pub mod loader;
pub mod model;
pub mod postprocessing;
pub mod registry;
pub mod search;
pub mod service;

// Re-export commonly used types for convenience
pub use backend::InferenceBackend;
pub use preprocess::ImageTensor;
pub use cache::{CacheState, ModelCache};
pub use config::InferenceConfig;
pub use error::InferenceError;
pub use loader::{FsModelLoader, LoadedModel, ModelLoader};
pub use postprocessing::{LabelScore, PredictionResult};
pub use registry::ClassList;
pub use service::{Classifier, global, load_model, predict_from_bytes, predict_from_path};
