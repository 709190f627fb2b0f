//! Device trait for bit-serial PIM execution
//!
//! This trait defines the interface every simulated or real device exposes.

use super::types::{DeviceConfig, DeviceFamily, ObjId, ObjectInfo};
use crate::error::{BackendError, Result};
use crate::isa::{DataType, Operands, PimOp, RowInstruction};
use crate::stats::DeviceStats;

/// Device trait for bit-serial processing-in-memory
///
/// # Architecture
///
/// ```text
/// ┌─────────────────────────────────────────────────────────┐
/// │                      Device Trait                        │
/// │  - Object management (allocate/associate/free)           │
/// │  - Host transfers (copy in/out)                          │
/// │  - Native ops (execute) and row instructions             │
/// │  - Statistics                                            │
/// └─────────────────────┬───────────────────────────────────┘
///                       │
///               ┌───────┴───────┐
///               ▼               ▼
///         ┌───────────┐   ┌───────────┐
///         │ BitSIMD-V │   │  SIMDRAM  │
///         └───────────┘   └───────────┘
/// ```
///
/// # Memory Model
///
/// Objects are stored vertically: row `i` of an object holds bit `i` of
/// every element. An object created with [`Device::allocate_associated`]
/// shares the placement of its base, so the same row index of both objects
/// covers the same elements and the two can be combined row by row.
///
/// # Usage
///
/// ```rust
/// use pim_backends::{DataType, Device, DeviceExt, DeviceFamily, FunctionalDevice, Operands, PimOp};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
///
/// let a = device.allocate(4, 32, DataType::Int32)?;
/// let b = device.allocate_associated(32, a, DataType::Int32)?;
/// let c = device.allocate_associated(32, a, DataType::Int32)?;
///
/// device.copy_to_device(&[1i32, 2, 3, 4], a)?;
/// device.copy_to_device(&[10i32, 20, 30, 40], b)?;
/// device.execute(PimOp::Add, Operands::binary(a, b, c))?;
///
/// let mut out = vec![0i32; 4];
/// device.copy_from_device(c, &mut out)?;
/// assert_eq!(out, vec![11, 22, 33, 44]);
///
/// device.free(c)?;
/// device.free(b)?;
/// device.free(a)?;
/// # Ok(())
/// # }
/// ```
pub trait Device {
    // ============================================================================================
    // Identity
    // ============================================================================================

    /// Device family, which fixes the accepted row instructions
    fn family(&self) -> DeviceFamily;

    /// Memory geometry
    fn config(&self) -> DeviceConfig;

    // ============================================================================================
    // Object Management
    // ============================================================================================

    /// Allocate an object of `num_elements` elements, `bits` rows each
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `num_elements` or `bits` is zero
    /// - the cores the object spans do not have `bits` free rows
    fn allocate(&mut self, num_elements: u64, bits: u32, data_type: DataType) -> Result<ObjId>;

    /// Allocate an object sharing the placement of `base`
    ///
    /// If `base` is itself associated, the new object joins the same root.
    fn allocate_associated(&mut self, bits: u32, base: ObjId, data_type: DataType) -> Result<ObjId>;

    /// Free an object and return its rows
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is invalid or if objects associated
    /// with it are still alive.
    fn free(&mut self, obj: ObjId) -> Result<()>;

    /// Metadata of a live object
    fn object_info(&self, obj: ObjId) -> Result<ObjectInfo>;

    // ============================================================================================
    // Host Transfers
    // ============================================================================================

    /// Copy a host buffer into an object
    ///
    /// The buffer holds `num_elements` little-endian values of
    /// `ceil(bits / 8)` bytes each. Bits above `bits` are ignored.
    fn copy_host_to_device(&mut self, data: &[u8], obj: ObjId) -> Result<()>;

    /// Copy an object into a host buffer, zero-filling bits above `bits`
    fn copy_device_to_host(&mut self, obj: ObjId, data: &mut [u8]) -> Result<()>;

    // ============================================================================================
    // Execution
    // ============================================================================================

    /// Execute a native element-wise operation
    ///
    /// All operands must be associated, share one data type, and be as
    /// wide as that type. Comparisons write 1 or 0.
    fn execute(&mut self, op: PimOp, operands: Operands) -> Result<()>;

    /// Execute one row instruction
    ///
    /// `obj` selects the placement the register file is bound to; it must be
    /// associated with every object referenced by the instruction.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::UnsupportedInstruction`] when the family
    /// does not implement the instruction.
    fn execute_row(&mut self, obj: ObjId, instr: RowInstruction) -> Result<()>;

    // ============================================================================================
    // Statistics
    // ============================================================================================

    /// Clear all counters
    fn reset_stats(&mut self);

    /// Snapshot of the counters since the last reset
    fn stats(&self) -> DeviceStats;

    /// Log the counters through `tracing`
    fn show_stats(&self) {
        self.stats().log(self.family());
    }
}

/// Typed host transfers for any [`Device`]
///
/// Element types must match the host width of the object exactly, so a
/// 32-bit object is copied through `i32`, `u32` or `f32`.
pub trait DeviceExt: Device {
    /// Copy a typed slice into an object
    fn copy_to_device<T: bytemuck::Pod>(&mut self, data: &[T], obj: ObjId) -> Result<()> {
        check_element_width::<T>(&self.object_info(obj)?)?;
        self.copy_host_to_device(bytemuck::cast_slice(data), obj)
    }

    /// Copy an object into a typed slice
    fn copy_from_device<T: bytemuck::Pod>(&mut self, obj: ObjId, data: &mut [T]) -> Result<()> {
        check_element_width::<T>(&self.object_info(obj)?)?;
        self.copy_device_to_host(obj, bytemuck::cast_slice_mut(data))
    }
}

impl<D: Device + ?Sized> DeviceExt for D {}

fn check_element_width<T>(info: &ObjectInfo) -> Result<()> {
    let width = std::mem::size_of::<T>();
    if width != info.host_element_bytes() {
        return Err(BackendError::SizeMismatch {
            obj: info.id,
            expected: info.host_element_bytes(),
            actual: width,
        });
    }
    Ok(())
}
