mod resnet;
mod weights;

pub use resnet::{ResNet, ResNetConfig};
pub use weights::{load_weights, load_weights_from_bytes};

use crate::error::InferenceError;
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{VarBuilder, VarMap};
use std::sync::PoisonError;

/// Architecture with freshly initialized parameter slots and no forward pass.
///
/// Slots are filled by [`load_weights`], which is the only way to obtain a
/// [`ClassificationNetwork`].
pub struct UnloadedNetwork {
    config: ResNetConfig,
    num_classes: usize,
    slots: VarMap,
}

impl UnloadedNetwork {
    pub fn config(&self) -> &ResNetConfig {
        &self.config
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Every named parameter slot with its shape, sorted by name.
    pub fn parameter_shapes(&self) -> Vec<(String, Vec<usize>)> {
        let slots = self.slots.data().lock().unwrap_or_else(PoisonError::into_inner);
        let mut shapes: Vec<(String, Vec<usize>)> = slots
            .iter()
            .map(|(name, var)| (name.clone(), var.dims().to_vec()))
            .collect();
        shapes.sort();
        shapes
    }
}

/// ResNet-50 with a `num_classes`-wide output layer and no pretrained weights.
pub fn build_network(num_classes: usize) -> Result<UnloadedNetwork, InferenceError> {
    build_network_with(ResNetConfig::resnet50(), num_classes)
}

pub fn build_network_with(
    config: ResNetConfig,
    num_classes: usize,
) -> Result<UnloadedNetwork, InferenceError> {
    if num_classes == 0 {
        return Err(InferenceError::ArchitectureMismatch(
            "network needs at least one output class".to_string(),
        ));
    }

    let slots = VarMap::new();
    let vb = VarBuilder::from_varmap(&slots, DType::F32, &Device::Cpu);
    // Only the slots are kept; the module is rebuilt over loaded tensors
    ResNet::new(&config, num_classes, vb)?;

    tracing::debug!(
        layers = ?config.layers,
        base_width = config.base_width,
        num_classes,
        "Built network architecture"
    );

    Ok(UnloadedNetwork {
        config,
        num_classes,
        slots,
    })
}

/// Network with loaded, detached weights, in inference-only mode.
pub struct ClassificationNetwork {
    model: ResNet,
    device: Device,
    num_classes: usize,
}

impl ClassificationNetwork {
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Raw `(batch, num_classes)` scores for a `(batch, 3, H, W)` input.
    pub fn logits(&self, input: &Tensor) -> Result<Tensor, InferenceError> {
        let input = input.to_device(&self.device)?;
        Ok(self.model.forward(&input)?)
    }
}
