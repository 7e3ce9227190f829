use anyhow::Result;
use candle_core::Device;
use tracing::info;
#[cfg(feature = "metal")]
use tracing::warn;

use appsearch_core::config::EmbeddingDevice;

/// Resolve the configured device. `Auto` prefers Metal when the crate is built
/// with the `metal` feature and a GPU is present. An explicit `Metal` that
/// cannot be honoured is an error.
pub fn select_device(choice: EmbeddingDevice) -> Result<Device> {
    match choice {
        EmbeddingDevice::Cpu => {}
        EmbeddingDevice::Auto => {
            #[cfg(feature = "metal")]
            match Device::new_metal(0) {
                Ok(dev) => { info!("embedding device: Metal"); return Ok(dev); }
                Err(e) => warn!(error = %e, "Metal unavailable, embedding on CPU"),
            };
        }
        EmbeddingDevice::Metal => {
            #[cfg(feature = "metal")]
            {
                let dev = Device::new_metal(0)?;
                info!("embedding device: Metal");
                return Ok(dev);
            }
            #[cfg(not(feature = "metal"))]
            anyhow::bail!("embedding.device = \"metal\" needs appsearch-embed built with the `metal` feature");
        }
    }
    info!("embedding device: CPU");
    Ok(Device::Cpu)
}
