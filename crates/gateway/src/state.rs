use inference::Classifier;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<Classifier>,
    pub top_k: usize,
    pub max_upload_bytes: usize,
}
