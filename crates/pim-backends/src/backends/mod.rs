//! Device implementations
//!
//! - `functional` - Bit-accurate simulator for every device family

pub mod functional;

pub use functional::FunctionalDevice;
