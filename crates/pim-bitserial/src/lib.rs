//! # pim-bitserial
//!
//! Differential testing of bit-serial PIM microcode.
//!
//! For each device family and numeric category, every catalogue operation
//! runs twice on the same simulated device: natively, and as a bit-serial
//! kernel built from single-row instructions. The results must agree bit
//! for bit, and no operand may change.
//!
//! ```text
//! TestOrchestrator ──► DifferentialEngine ──► Device::execute        (reference)
//!        │                     │
//!        │                     └────────────► BitSerialOps kernel
//!        │                                        └─► Device::execute_row
//!        ▼
//!  HarnessReport
//! ```
//!
//! ## Example
//!
//! ```
//! use pim_bitserial::{HarnessConfig, NumericCategory, TestOrchestrator};
//! use pim_backends::DeviceFamily;
//!
//! let config = HarnessConfig::default().with_num_elements(64).with_seed(1);
//! let report = TestOrchestrator::new(config).run_all(&[DeviceFamily::BitSimdV], &[NumericCategory::UInt8]);
//! assert!(report.all_passed());
//! ```

pub mod catalogue;
pub mod category;
pub mod config;
pub mod element;
pub mod engine;
pub mod error;
pub mod generator;
pub mod ops;
pub mod orchestrator;
pub mod report;

pub use category::{NumericCategory, NumericKind, ValueRange};
pub use config::HarnessConfig;
pub use element::Element;
pub use engine::{
    CategoryRun, DifferentialEngine, HostOperands, MismatchReport, MismatchSample, TestOutcome, TestStatus,
};
pub use error::{HarnessError, Result};
pub use generator::OperandGenerator;
pub use ops::{BitSerialOps, Kernel, KernelArgs, KernelTable};
pub use orchestrator::TestOrchestrator;
pub use report::{CategorySummary, HarnessReport, ReportedError};
