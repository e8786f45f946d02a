use crate::error::InferenceError;
use crate::model::ClassificationNetwork;
use candle_core::Tensor;
use preprocess::ImageTensor;

pub trait InferenceBackend: Send + Sync {
    /// Raw output scores for one preprocessed image, one per class.
    fn forward(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError>;
}

impl InferenceBackend for ClassificationNetwork {
    fn forward(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        let _span = common::span_debug!("forward");

        let shape = input.dim();
        let data = match input.as_slice() {
            Some(slice) => slice.to_vec(),
            None => input.iter().copied().collect(),
        };
        let tensor = Tensor::from_vec(data, shape, self.device())?;

        let logits = self.logits(&tensor)?.flatten_all()?.to_vec1::<f32>()?;

        Ok(logits)
    }
}
