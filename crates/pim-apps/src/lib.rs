//! # pim-apps
//!
//! Small applications built directly on the [`pim_backends::Device`]
//! surface: element-wise vector addition and max pooling. Both follow the
//! same pipeline of allocate, upload, execute, download and free.
//!
//! ```
//! use pim_apps::vector_add;
//! use pim_backends::{DeviceFamily, FunctionalDevice};
//!
//! let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
//! let sum = vector_add(&mut device, &[1, 2, 3], &[10, 20, 30])?;
//! assert_eq!(sum, vec![11, 22, 33]);
//! # Ok::<(), pim_apps::AppError>(())
//! ```

pub mod device;
pub mod error;
pub mod max_pool;
pub mod vec_add;

pub use device::open_device;
pub use error::{AppError, Result};
pub use max_pool::{decompose, max_pool, max_pool_cpu, mismatches, PoolParams, Volume};
pub use vec_add::{demo_operands, vector_add};
