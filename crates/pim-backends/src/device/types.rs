//! Types for device configuration and handles

use crate::error::{BackendError, Result};
use crate::isa::{DataType, LogicOp, RowInstructionKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Handle to an allocated device object
///
/// Objects are opaque handles managed by the device.
/// Use [`crate::Device`] methods to interact with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(pub u64);

impl ObjId {
    /// Create a new object handle
    pub const fn new(id: u64) -> Self {
        ObjId(id)
    }

    /// Get the internal ID
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj{}", self.0)
    }
}

/// Bit-serial device family
///
/// The family decides which row instructions the processing elements accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceFamily {
    /// Vertical bit-serial SIMD: row reads/writes plus full register logic
    BitSimdV,
    /// Triple-row activation: only majority and complement are native
    Simdram,
}

impl DeviceFamily {
    pub const ALL: [DeviceFamily; 2] = [DeviceFamily::BitSimdV, DeviceFamily::Simdram];

    /// Command line / log name
    pub const fn name(self) -> &'static str {
        match self {
            DeviceFamily::BitSimdV => "bitsimd-v",
            DeviceFamily::Simdram => "simdram",
        }
    }

    /// Whether processing elements of this family accept `kind`
    pub const fn supports(self, kind: RowInstructionKind) -> bool {
        match self {
            DeviceFamily::BitSimdV => true,
            DeviceFamily::Simdram => matches!(
                kind,
                RowInstructionKind::ReadRow
                    | RowInstructionKind::WriteRow
                    | RowInstructionKind::Set
                    | RowInstructionKind::Move
                    | RowInstructionKind::Not
                    | RowInstructionKind::Maj
            ),
        }
    }

    /// Logic functions available as single instructions
    pub fn native_logic(self) -> Vec<LogicOp> {
        [LogicOp::And, LogicOp::Or, LogicOp::Xor, LogicOp::Xnor]
            .into_iter()
            .filter(|op| self.supports(RowInstructionKind::Logic(*op)))
            .collect()
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceFamily {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bitsimd-v" | "bitsimd_v" | "bitsimdv" => Ok(DeviceFamily::BitSimdV),
            "simdram" => Ok(DeviceFamily::Simdram),
            other => Err(format!("unknown device family '{other}'")),
        }
    }
}

/// Geometry of the simulated memory
///
/// Each core is one subarray: `num_rows` rows of `num_cols` bit columns.
/// One element occupies one column and `bits` consecutive rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    pub num_cores: u64,
    pub num_rows: u32,
    pub num_cols: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            num_cores: 16,
            num_rows: 8192,
            num_cols: 8192,
        }
    }
}

impl DeviceConfig {
    pub const fn new(num_cores: u64, num_rows: u32, num_cols: u64) -> Self {
        Self {
            num_cores,
            num_rows,
            num_cols,
        }
    }

    /// Reject geometries with an empty dimension
    pub fn validate(&self) -> Result<()> {
        if self.num_cores == 0 || self.num_rows == 0 || self.num_cols == 0 {
            return Err(BackendError::invalid_config(format!(
                "all dimensions must be non-zero (cores={}, rows={}, cols={})",
                self.num_cores, self.num_rows, self.num_cols
            )));
        }
        Ok(())
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: DeviceConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Number of cores an object of `num_elements` spans
    pub const fn cores_for(&self, num_elements: u64) -> u64 {
        num_elements.div_ceil(self.num_cols)
    }
}

impl fmt::Display for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cores x {} rows x {} cols", self.num_cores, self.num_rows, self.num_cols)
    }
}

/// Metadata of an allocated object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectInfo {
    pub id: ObjId,
    pub num_elements: u64,
    pub bits: u32,
    pub data_type: DataType,
    /// Base object this one was allocated against, if any
    pub base: Option<ObjId>,
    /// First core of the placement
    pub first_core: u64,
    pub num_cores: u64,
}

impl ObjectInfo {
    /// Size of one element in host memory
    pub const fn host_element_bytes(&self) -> usize {
        self.bits.div_ceil(8) as usize
    }

    /// Size of the whole object in host memory
    pub const fn host_bytes(&self) -> usize {
        self.host_element_bytes() * self.num_elements as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_obj_id() {
        let id = ObjId::new(42);
        assert_eq!(id.id(), 42);
        assert_eq!(id.to_string(), "obj42");
    }

    #[test]
    fn test_family_parse_and_support() {
        assert_eq!("BitSIMD-V".parse::<DeviceFamily>(), Ok(DeviceFamily::BitSimdV));
        assert_eq!("simdram".parse::<DeviceFamily>(), Ok(DeviceFamily::Simdram));
        assert!("fulcrum".parse::<DeviceFamily>().is_err());

        assert!(DeviceFamily::BitSimdV.supports(RowInstructionKind::Sel));
        assert!(!DeviceFamily::Simdram.supports(RowInstructionKind::Sel));
        assert!(DeviceFamily::Simdram.supports(RowInstructionKind::Maj));
        assert!(DeviceFamily::Simdram.native_logic().is_empty());
        assert_eq!(DeviceFamily::BitSimdV.native_logic().len(), 4);
    }

    #[test]
    fn test_config_validate() {
        assert!(DeviceConfig::default().validate().is_ok());
        assert!(matches!(
            DeviceConfig::new(0, 16, 16).validate(),
            Err(BackendError::InvalidConfig(_))
        ));
        assert_eq!(DeviceConfig::new(4, 128, 256).cores_for(512), 2);
        assert_eq!(DeviceConfig::new(4, 128, 256).cores_for(513), 3);
    }

    #[test]
    fn test_config_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"num_cores": 4, "num_rows": 128, "num_cols": 256}}"#).unwrap();

        let config = DeviceConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config, DeviceConfig::new(4, 128, 256));
    }

    #[test]
    fn test_config_from_json_file_rejects_unknown_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"num_cores": 4, "num_rows": 128, "num_cols": 256, "ranks": 2}}"#).unwrap();

        let err = DeviceConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, BackendError::ConfigParse(_)));
    }

    #[test]
    fn test_object_info_host_size() {
        let info = ObjectInfo {
            id: ObjId::new(1),
            num_elements: 10,
            bits: 33,
            data_type: DataType::Int32,
            base: None,
            first_core: 0,
            num_cores: 1,
        };
        assert_eq!(info.host_element_bytes(), 5);
        assert_eq!(info.host_bytes(), 50);
    }
}
