use crate::cache::{CacheState, ModelCache};
use crate::config::InferenceConfig;
use crate::error::InferenceError;
use crate::loader::{FsModelLoader, LoadedModel, ModelLoader};
use crate::postprocessing::{self, PredictionResult};
use crate::registry::ClassList;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};
use std::fs;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Instant;

struct Metrics {
    duration: Histogram<f64>,
    predictions: Counter<u64>,
    failures: Counter<u64>,
}

impl Metrics {
    fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
        ];

        Self {
            duration: meter
                .f64_histogram("classifier_inference_duration_seconds")
                .with_description("Time to classify one image (preprocess + forward + ranking)")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
            predictions: meter
                .u64_counter("classifier_predictions_total")
                .with_description("Images classified successfully")
                .build(),
            failures: meter
                .u64_counter("classifier_prediction_failures_total")
                .with_description("Classification requests that failed")
                .build(),
        }
    }
}

/// Inference entry point: owns the model cache and turns images into
/// ranked predictions.
pub struct Classifier {
    cache: ModelCache,
    metrics: Metrics,
}

impl Classifier {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            cache: ModelCache::new(loader),
            metrics: Metrics::new("classifier"),
        }
    }

    pub fn from_config(config: &InferenceConfig) -> Self {
        Self::new(FsModelLoader::from_config(config))
    }

    /// Startup hook. Loads once; later calls return the cached outcome.
    ///
    /// Failures come back as the loader reported them, not wrapped in
    /// `ModelUnavailable`.
    pub fn load_model(&self) -> Result<Arc<LoadedModel>, InferenceError> {
        self.cache.load()
    }

    pub fn classes(&self) -> Result<Arc<ClassList>, InferenceError> {
        Ok(Arc::clone(&self.cache.get()?.classes))
    }

    pub fn state(&self) -> CacheState {
        self.cache.state()
    }

    pub fn predict_from_bytes(
        &self,
        image_bytes: &[u8],
        top_k: usize,
    ) -> Result<PredictionResult, InferenceError> {
        let start = Instant::now();
        let outcome = self.run(image_bytes, top_k);

        match &outcome {
            Ok(result) => {
                self.metrics
                    .duration
                    .record(start.elapsed().as_secs_f64(), &[]);
                self.metrics.predictions.add(1, &[]);
                tracing::debug!(
                    prediction = %result.prediction,
                    confidence = result.confidence,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Classified image"
                );
            }
            Err(e) => {
                let kind = if e.is_client_error() { "client" } else { "server" };
                self.metrics.failures.add(1, &[KeyValue::new("kind", kind)]);
                tracing::warn!(error = %e, "Classification failed");
            }
        }

        outcome
    }

    /// Same pipeline as [`Self::predict_from_bytes`]; an unreadable file is an
    /// invalid image.
    pub fn predict_from_path(
        &self,
        path: impl AsRef<Path>,
        top_k: usize,
    ) -> Result<PredictionResult, InferenceError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            InferenceError::InvalidImage(format!("cannot read {}: {}", path.display(), e))
        })?;

        self.predict_from_bytes(&bytes, top_k)
    }

    fn run(&self, image_bytes: &[u8], top_k: usize) -> Result<PredictionResult, InferenceError> {
        let _span = common::span!("predict");

        let model = self.cache.get()?;
        let input = preprocess::preprocess(image_bytes)?;
        let logits = model.network.forward(&input)?;

        if logits.len() != model.classes.len() {
            return Err(InferenceError::ArchitectureMismatch(format!(
                "network produced {} scores for {} classes",
                logits.len(),
                model.classes.len()
            )));
        }

        if let Some(bad) = logits.iter().find(|v| !v.is_finite()) {
            return Err(InferenceError::Runtime(format!(
                "network produced a non-finite score ({})",
                bad
            )));
        }

        Ok(postprocessing::rank(&logits, &model.classes, top_k))
    }
}

static GLOBAL: LazyLock<Arc<Classifier>> =
    LazyLock::new(|| Arc::new(Classifier::from_config(&InferenceConfig::from_env())));

/// Process-wide classifier configured from the environment.
pub fn global() -> Arc<Classifier> {
    Arc::clone(&GLOBAL)
}

pub fn load_model() -> Result<Arc<LoadedModel>, InferenceError> {
    GLOBAL.load_model()
}

pub fn predict_from_bytes(
    image_bytes: &[u8],
    top_k: usize,
) -> Result<PredictionResult, InferenceError> {
    GLOBAL.predict_from_bytes(image_bytes, top_k)
}

pub fn predict_from_path(
    path: impl AsRef<Path>,
    top_k: usize,
) -> Result<PredictionResult, InferenceError> {
    GLOBAL.predict_from_path(path, top_k)
}
