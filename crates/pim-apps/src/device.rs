//! Device construction shared by the binaries

use crate::error::Result;
use pim_backends::{DeviceConfig, DeviceFamily, FunctionalDevice};
use std::path::Path;

/// A functional device, with the geometry from `config_file` when given
pub fn open_device(family: DeviceFamily, config_file: Option<&Path>) -> Result<FunctionalDevice> {
    let config = match config_file {
        Some(path) => DeviceConfig::from_json_file(path)?,
        None => DeviceConfig::default(),
    };
    tracing::info!(%family, %config, "creating device");
    Ok(FunctionalDevice::with_config(family, config)?)
}
