use super::{ClassificationNetwork, ResNet, UnloadedNetwork};
use crate::artifact;
use crate::device::device_name;
use crate::error::InferenceError;
use candle_core::{DType, Device, Tensor, Var};
use candle_nn::VarBuilder;
use std::collections::HashMap;
use std::path::Path;
use std::sync::PoisonError;

/// Training counters stored next to batch-norm statistics; never parameters.
const IGNORED_SUFFIX: &str = ".num_batches_tracked";

/// Mismatches listed individually before the rest is summarized.
const MAX_REPORTED: usize = 8;

/// Read, validate and deserialize the artifact into `network`.
pub fn load_weights(
    network: UnloadedNetwork,
    artifact_path: &Path,
    device: &Device,
) -> Result<ClassificationNetwork, InferenceError> {
    let bytes = artifact::read_artifact(artifact_path)?;
    load_weights_from_bytes(network, artifact_path, &bytes, device)
}

/// Fill every slot of `network` from safetensors `bytes` and freeze it on `device`.
///
/// `artifact_path` is only used in diagnostics.
pub fn load_weights_from_bytes(
    network: UnloadedNetwork,
    artifact_path: &Path,
    bytes: &[u8],
    device: &Device,
) -> Result<ClassificationNetwork, InferenceError> {
    let _span = common::span!("load_weights");

    let tensors = candle_core::safetensors::load_buffer(bytes, &Device::Cpu).map_err(|e| {
        InferenceError::CorruptArtifact {
            path: artifact_path.to_path_buf(),
            size: bytes.len() as u64,
            reason: format!("cannot deserialize safetensors: {}", e),
        }
    })?;

    let slots = network.slots.data().lock().unwrap_or_else(PoisonError::into_inner);
    verify_layout(&slots, &tensors)?;

    let mut frozen = HashMap::with_capacity(slots.len());
    for (name, var) in slots.iter() {
        let Some(tensor) = tensors.get(name) else {
            continue;
        };
        var.set(&tensor.to_dtype(DType::F32)?)?;
        frozen.insert(name.clone(), var.as_detached_tensor().to_device(device)?);
    }
    drop(slots);

    let vb = VarBuilder::from_tensors(frozen, DType::F32, device);
    let model = ResNet::new(&network.config, network.num_classes, vb)?;

    tracing::info!(
        path = %artifact_path.display(),
        tensors = tensors.len(),
        num_classes = network.num_classes,
        device = device_name(device),
        "Loaded network weights"
    );

    Ok(ClassificationNetwork {
        model,
        device: device.clone(),
        num_classes: network.num_classes,
    })
}

/// Every slot needs a same-shaped tensor and every tensor needs a slot.
fn verify_layout(
    slots: &HashMap<String, Var>,
    tensors: &HashMap<String, Tensor>,
) -> Result<(), InferenceError> {
    let mut problems = Vec::new();

    for (name, var) in slots {
        match tensors.get(name) {
            None => problems.push(format!("`{}` missing from artifact", name)),
            Some(tensor) if tensor.dims() != var.dims() => problems.push(format!(
                "`{}` has shape {:?}, network expects {:?}",
                name,
                tensor.dims(),
                var.dims()
            )),
            Some(_) => {}
        }
    }

    for name in tensors.keys() {
        if !slots.contains_key(name) && !name.ends_with(IGNORED_SUFFIX) {
            problems.push(format!("`{}` has no slot in the network", name));
        }
    }

    if problems.is_empty() {
        return Ok(());
    }

    problems.sort();
    let total = problems.len();
    let mut message = problems
        .into_iter()
        .take(MAX_REPORTED)
        .collect::<Vec<_>>()
        .join("; ");
    if total > MAX_REPORTED {
        message.push_str(&format!("; and {} more", total - MAX_REPORTED));
    }

    Err(InferenceError::ArchitectureMismatch(format!(
        "{} parameter(s) differ: {}",
        total, message
    )))
}
