//! GPU utilization sampling.
//!
//! [`NvmlSource`] reads one device through the NVIDIA Management
//! Library. Initialisation is allowed to fail (no driver, no NVIDIA
//! hardware); the caller then runs its idle gate degraded.

use nvml_wrapper::error::NvmlError;
use nvml_wrapper::Nvml;

/// A source of GPU utilization samples.
pub trait UtilizationSource: Send + Sync {
    /// Current utilization of the monitored GPU, in percent.
    fn utilization(&self) -> Result<u32, TelemetryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("NVML error: {0}")]
    Nvml(#[from] NvmlError),

    #[error("GPU index {index} out of range ({count} devices)")]
    NoSuchDevice { index: u32, count: u32 },
}

/// NVML-backed sampler for a single GPU index.
pub struct NvmlSource {
    nvml: Nvml,
    gpu_index: u32,
}

impl NvmlSource {
    /// Initialise NVML and check that `gpu_index` exists.
    pub fn init(gpu_index: u32) -> Result<Self, TelemetryError> {
        let nvml = Nvml::init()?;
        let count = nvml.device_count()?;
        if gpu_index >= count {
            return Err(TelemetryError::NoSuchDevice {
                index: gpu_index,
                count,
            });
        }

        let name = nvml
            .device_by_index(gpu_index)
            .and_then(|d| d.name())
            .unwrap_or_else(|_| "unknown".to_string());
        tracing::info!(gpu_index, gpu_count = count, gpu_name = %name, "NVML initialised");

        Ok(Self { nvml, gpu_index })
    }

    pub fn gpu_index(&self) -> u32 {
        self.gpu_index
    }
}

impl UtilizationSource for NvmlSource {
    fn utilization(&self) -> Result<u32, TelemetryError> {
        let device = self.nvml.device_by_index(self.gpu_index)?;
        Ok(device.utilization_rates()?.gpu)
    }
}
