//! Harness configuration
//!
//! Defaults can be overridden from the environment:
//!
//! - `PIM_BITSERIAL_ELEMENTS`: elements per operand vector
//! - `PIM_BITSERIAL_SEED`: base seed for reproducible operands
//! - `PIM_DEVICE_CONFIG`: path of a JSON [`DeviceConfig`]

use crate::error::{HarnessError, Result};
use pim_backends::DeviceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Elements per operand vector unless configured otherwise
pub const DEFAULT_NUM_ELEMENTS: usize = 4000;

pub const ENV_ELEMENTS: &str = "PIM_BITSERIAL_ELEMENTS";
pub const ENV_SEED: &str = "PIM_BITSERIAL_SEED";
pub const ENV_DEVICE_CONFIG: &str = "PIM_DEVICE_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub num_elements: usize,
    /// `None` draws every category's operands from OS entropy
    pub seed: Option<u64>,
    pub device: DeviceConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            num_elements: DEFAULT_NUM_ELEMENTS,
            seed: None,
            device: DeviceConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Defaults overridden by whatever the environment sets
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(ENV_ELEMENTS) {
            config.num_elements = value
                .trim()
                .parse()
                .map_err(|_| HarnessError::config(format!("{ENV_ELEMENTS}: '{value}' is not a count")))?;
        }
        if let Ok(value) = std::env::var(ENV_SEED) {
            let seed = value
                .trim()
                .parse()
                .map_err(|_| HarnessError::config(format!("{ENV_SEED}: '{value}' is not a u64")))?;
            config.seed = Some(seed);
        }
        if let Ok(path) = std::env::var(ENV_DEVICE_CONFIG) {
            config = config.with_device_file(path)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_num_elements(mut self, num_elements: usize) -> Self {
        self.num_elements = num_elements;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }

    /// Load the device geometry from a JSON file
    pub fn with_device_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let device = DeviceConfig::from_json_file(path)
            .map_err(|err| HarnessError::config(format!("{}: {err}", path.display())))?;
        Ok(self.with_device(device))
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_elements < 2 {
            return Err(HarnessError::config(format!(
                "need at least 2 elements per operand, got {}",
                self.num_elements
            )));
        }
        self.device
            .validate()
            .map_err(|err| HarnessError::config(err.to_string()))
    }
}
