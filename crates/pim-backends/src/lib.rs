//! Bit-serial processing-in-memory devices
//!
//! This crate provides:
//! - **Command set**: native element-wise operations and row instructions
//! - **Device trait**: object allocation, host transfers and execution
//! - **Functional device**: bit-accurate simulator of each device family
//! - **Statistics**: per-command counters
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Bit-serial micro-programs                │
//! │         (row instructions over vertical objects)         │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                      Device Trait                        │
//! │     allocate / copy / execute / execute_row / stats      │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                    FunctionalDevice                      │
//! │          BitSIMD-V family │ SIMDRAM family               │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use pim_backends::{DataType, Device, DeviceExt, DeviceFamily, FunctionalDevice, Operands, PimOp};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
//!
//! let a = device.allocate(3, 8, DataType::UInt8)?;
//! let b = device.allocate_associated(8, a, DataType::UInt8)?;
//! device.copy_to_device(&[0b1011u8, 0, 255], a)?;
//! device.execute(PimOp::PopCount, Operands::unary(a, b))?;
//!
//! let mut counts = [0u8; 3];
//! device.copy_from_device(b, &mut counts)?;
//! assert_eq!(counts, [3, 0, 8]);
//!
//! device.free(b)?;
//! device.free(a)?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod device;
pub mod error;
pub mod isa;
pub mod stats;

pub use backends::FunctionalDevice;
pub use device::{Device, DeviceConfig, DeviceExt, DeviceFamily, ObjId, ObjectChain, ObjectInfo};
pub use error::{BackendError, Result};
pub use isa::{DataType, LogicOp, Operands, PimOp, RowInstruction, RowInstructionKind, RowReg};
pub use stats::DeviceStats;
