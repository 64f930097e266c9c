use std::sync::OnceLock;

use candle_core::Device;
use tracing::info;

static SHARED: OnceLock<Device> = OnceLock::new();

pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) { info!("device: metal (mps)"); return dev; }
    }
    info!("device: cpu");
    Device::Cpu
}

/// Process-wide device, selected on first use. Concurrent callers all
/// observe the same instance.
pub fn shared_device() -> &'static Device {
    SHARED.get_or_init(select_device)
}
