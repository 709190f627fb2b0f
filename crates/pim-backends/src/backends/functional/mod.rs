//! Functional device simulator
//!
//! Bit-accurate model of a bit-serial PIM device. It keeps objects in
//! vertical layout, runs row instructions against a register file, and
//! computes native operations on the host.
//!
//! # Architecture
//!
//! ```text
//! FunctionalDevice
//! ├── ObjectArena   - Bit-planes + per-core row accounting
//! ├── RegisterFile  - SA + R1..R5, bound to one placement
//! └── DeviceStats   - Command counters
//! ```

mod executor;
pub(crate) mod memory;

use crate::device::{Device, DeviceConfig, DeviceFamily, ObjId, ObjectInfo};
use crate::error::Result;
use crate::isa::{DataType, Operands, PimOp, RowInstruction};
use crate::stats::DeviceStats;
use executor::RegisterFile;
use memory::ObjectArena;
use parking_lot::RwLock;
use std::sync::Arc;

struct DeviceState {
    arena: ObjectArena,
    registers: RegisterFile,
    stats: DeviceStats,
}

/// Functional simulator of one device family
///
/// Clones share the same device state.
#[derive(Clone)]
pub struct FunctionalDevice {
    family: DeviceFamily,
    state: Arc<RwLock<DeviceState>>,
}

impl FunctionalDevice {
    /// Create a device with the default geometry
    ///
    /// # Example
    ///
    /// ```rust
    /// use pim_backends::{Device, DeviceFamily, FunctionalDevice};
    ///
    /// let device = FunctionalDevice::new(DeviceFamily::Simdram);
    /// assert_eq!(device.config().num_cores, 16);
    /// ```
    pub fn new(family: DeviceFamily) -> Self {
        Self::from_parts(family, DeviceConfig::default())
    }

    /// Create a device with a custom geometry
    pub fn with_config(family: DeviceFamily, config: DeviceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(family, config))
    }

    fn from_parts(family: DeviceFamily, config: DeviceConfig) -> Self {
        tracing::debug!(device = family.name(), %config, "creating functional device");
        Self {
            family,
            state: Arc::new(RwLock::new(DeviceState {
                arena: ObjectArena::new(config),
                registers: RegisterFile::new(),
                stats: DeviceStats::default(),
            })),
        }
    }

    /// Number of live objects
    pub fn live_objects(&self) -> usize {
        self.state.read().arena.len()
    }
}

impl Device for FunctionalDevice {
    fn family(&self) -> DeviceFamily {
        self.family
    }

    fn config(&self) -> DeviceConfig {
        self.state.read().arena.config()
    }

    fn allocate(&mut self, num_elements: u64, bits: u32, data_type: DataType) -> Result<ObjId> {
        let obj = self.state.write().arena.allocate(num_elements, bits, data_type)?;
        tracing::trace!(%obj, num_elements, bits, %data_type, "allocated object");
        Ok(obj)
    }

    fn allocate_associated(&mut self, bits: u32, base: ObjId, data_type: DataType) -> Result<ObjId> {
        let obj = self.state.write().arena.allocate_associated(bits, base, data_type)?;
        tracing::trace!(%obj, %base, bits, %data_type, "allocated associated object");
        Ok(obj)
    }

    fn free(&mut self, obj: ObjId) -> Result<()> {
        let mut state = self.state.write();
        state.arena.free(obj)?;
        state.registers.release(obj);
        tracing::trace!(%obj, "freed object");
        Ok(())
    }

    fn object_info(&self, obj: ObjId) -> Result<ObjectInfo> {
        self.state.read().arena.info(obj)
    }

    fn copy_host_to_device(&mut self, data: &[u8], obj: ObjId) -> Result<()> {
        let mut state = self.state.write();
        state.arena.copy_from_host(obj, data)?;
        state.stats.bytes_copied_in += data.len() as u64;
        Ok(())
    }

    fn copy_device_to_host(&mut self, obj: ObjId, data: &mut [u8]) -> Result<()> {
        let mut state = self.state.write();
        state.arena.copy_to_host(obj, data)?;
        state.stats.bytes_copied_out += data.len() as u64;
        Ok(())
    }

    fn execute(&mut self, op: PimOp, operands: Operands) -> Result<()> {
        let mut state = self.state.write();
        executor::execute_native(&mut state.arena, op, operands)?;
        state.stats.record_native(op);
        Ok(())
    }

    fn execute_row(&mut self, obj: ObjId, instr: RowInstruction) -> Result<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        executor::execute_row(&mut state.arena, &mut state.registers, self.family, obj, instr)?;
        state.stats.record_row(instr.kind());
        Ok(())
    }

    fn reset_stats(&mut self) {
        self.state.write().stats = DeviceStats::default();
    }

    fn stats(&self) -> DeviceStats {
        self.state.read().stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceExt;
    use crate::error::BackendError;
    use crate::isa::RowInstructionKind;

    #[test]
    fn test_functional_device_creation() {
        let device = FunctionalDevice::new(DeviceFamily::BitSimdV);
        assert_eq!(device.family(), DeviceFamily::BitSimdV);
        assert_eq!(device.config(), DeviceConfig::default());
        assert_eq!(device.live_objects(), 0);
    }

    #[test]
    fn test_with_config_validates() {
        let err = FunctionalDevice::with_config(DeviceFamily::Simdram, DeviceConfig::new(1, 0, 8));
        assert!(matches!(err, Err(BackendError::InvalidConfig(_))));
    }

    #[test]
    fn test_typed_copies() {
        let mut device = FunctionalDevice::new(DeviceFamily::Simdram);
        let obj = device.allocate(5, 32, DataType::Fp32).unwrap();

        let data = [1.0f32, -2.5, 0.0, 3.25, f32::MAX];
        device.copy_to_device(&data, obj).unwrap();

        let mut out = [0.0f32; 5];
        device.copy_from_device(obj, &mut out).unwrap();
        assert_eq!(out, data);

        let mut wrong = [0u16; 5];
        assert!(matches!(
            device.copy_from_device(obj, &mut wrong),
            Err(BackendError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_stats_are_counted_and_reset() {
        let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
        let a = device.allocate(8, 8, DataType::UInt8).unwrap();
        let b = device.allocate_associated(8, a, DataType::UInt8).unwrap();
        device.copy_to_device(&[1u8; 8], a).unwrap();

        device.execute_row(a, RowInstruction::ReadRow { obj: a, row: 0 }).unwrap();
        device.execute_row(b, RowInstruction::WriteRow { obj: b, row: 0 }).unwrap();
        device.execute(PimOp::Add, Operands::binary(a, a, b)).unwrap();

        let stats = device.stats();
        assert_eq!(stats.row_count(RowInstructionKind::ReadRow), 1);
        assert_eq!(stats.row_count(RowInstructionKind::WriteRow), 1);
        assert_eq!(stats.native_ops.get("add"), Some(&1));
        assert_eq!(stats.bytes_copied_in, 8);

        device.reset_stats();
        assert!(device.stats().is_empty());
    }

    #[test]
    fn test_registers_persist_within_placement() {
        let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
        let a = device.allocate(4, 8, DataType::UInt8).unwrap();
        let b = device.allocate_associated(8, a, DataType::UInt8).unwrap();
        device.copy_to_device(&[0xffu8; 4], a).unwrap();

        device.execute_row(a, RowInstruction::ReadRow { obj: a, row: 3 }).unwrap();
        device.execute_row(b, RowInstruction::WriteRow { obj: b, row: 5 }).unwrap();

        let mut out = [0u8; 4];
        device.copy_from_device(b, &mut out).unwrap();
        assert_eq!(out, [0x20; 4]);
    }

    #[test]
    fn test_clone_shares_state() {
        let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
        let other = device.clone();
        let obj = device.allocate(1, 8, DataType::Int8).unwrap();
        assert_eq!(other.live_objects(), 1);
        device.free(obj).unwrap();
        assert_eq!(other.live_objects(), 0);
    }
}
