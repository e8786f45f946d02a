use candle_core::Device;
use candle_core::utils::{cuda_is_available, metal_is_available};

/// Pick the fastest available compute device, falling back to the CPU.
pub fn select_device() -> Device {
    if cuda_is_available() {
        match Device::new_cuda(0) {
            Ok(device) => {
                tracing::info!("Using CUDA device 0");
                return device;
            }
            Err(e) => tracing::warn!(error = %e, "CUDA reported available but failed to initialize"),
        }
    }

    if metal_is_available() {
        match Device::new_metal(0) {
            Ok(device) => {
                tracing::info!("Using Metal device 0");
                return device;
            }
            Err(e) => tracing::warn!(error = %e, "Metal reported available but failed to initialize"),
        }
    }

    tracing::info!("Using CPU device");
    Device::Cpu
}

pub fn device_name(device: &Device) -> &'static str {
    match device {
        Device::Cpu => "cpu",
        Device::Cuda(_) => "cuda",
        Device::Metal(_) => "metal",
    }
}
