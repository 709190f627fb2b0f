//! Device abstraction
//!
//! - [`Device`]: the trait every device implements
//! - [`DeviceExt`]: typed host transfers on top of it
//! - [`ObjectChain`]: a base object and its associated objects
//! - Handles, families and geometry

mod chain;
mod traits;
mod types;

pub use chain::ObjectChain;
pub use traits::{Device, DeviceExt};
pub use types::{DeviceConfig, DeviceFamily, ObjId, ObjectInfo};
