use anyhow::{anyhow, Result};
use candle_core::Device;
use tracing::info;

use medfaq_core::config::DevicePreference;

/// Resolves the configured preference to a candle device.
///
/// An explicit `metal` request fails when the crate was built without the
/// `metal` feature or no GPU is present; `auto` falls back to the CPU instead.
pub fn select_device(preference: DevicePreference) -> Result<Device> {
    let device = match preference {
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Metal => metal().ok_or_else(|| anyhow!("embedding.device = \"metal\" but no Metal device is available"))?,
        DevicePreference::Auto => match metal() {
            Some(dev) => dev,
            None => Device::Cpu,
        },
    };
    info!(requested = ?preference, device = if device.is_metal() { "metal" } else { "cpu" }, "embedding device selected");
    Ok(device)
}

#[cfg(feature = "metal")]
fn metal() -> Option<Device> {
    match Device::new_metal(0) {
        Ok(dev) => Some(dev),
        Err(e) => {
            tracing::warn!(error = %e, "metal device unavailable");
            None
        }
    }
}

#[cfg(not(feature = "metal"))]
fn metal() -> Option<Device> {
    tracing::debug!("built without the metal feature");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_preference_is_always_honoured() {
        assert!(matches!(select_device(DevicePreference::Cpu).unwrap(), Device::Cpu));
    }

    #[cfg(not(feature = "metal"))]
    #[test]
    fn metal_without_the_feature_is_an_error_but_auto_falls_back() {
        let err = select_device(DevicePreference::Metal).unwrap_err();
        assert!(err.to_string().contains("metal"));
        assert!(matches!(select_device(DevicePreference::Auto).unwrap(), Device::Cpu));
    }
}
