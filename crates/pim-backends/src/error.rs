//! Error types for device operations

use crate::device::ObjId;
use crate::isa::DataType;
use std::fmt;

/// Result type for device operations
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors that can occur while allocating, copying or executing on a device
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Invalid object handle
    #[error("invalid object handle: {0}")]
    InvalidObject(ObjId),

    /// Not enough free rows on the cores an allocation needs
    #[error("out of device memory: need {rows} rows on {cores} core(s), {available} available")]
    OutOfMemory { cores: u64, rows: u32, available: u32 },

    /// Zero-sized or otherwise malformed allocation request
    #[error("invalid allocation: {0}")]
    InvalidAllocation(String),

    /// Base object freed while associated objects are still alive
    #[error("object {base} still has {live} associated object(s) alive")]
    AssociatedObjectsAlive { base: ObjId, live: usize },

    /// Objects used together do not share a placement
    #[error("objects {lhs} and {rhs} are not associated (element counts {lhs_len} vs {rhs_len})")]
    NotAssociated {
        lhs: ObjId,
        rhs: ObjId,
        lhs_len: u64,
        rhs_len: u64,
    },

    /// Host buffer size does not match the object
    #[error("host buffer of {actual} bytes does not match object {obj} ({expected} bytes)")]
    SizeMismatch { obj: ObjId, expected: usize, actual: usize },

    /// Row index beyond the object's bit width
    #[error("row {row} out of range for object {obj} with {bits} rows")]
    RowOutOfRange { obj: ObjId, row: u32, bits: u32 },

    /// Object data type does not fit the operation
    #[error("type mismatch on {obj}: expected {expected}, got {actual}")]
    TypeMismatch {
        obj: ObjId,
        expected: DataType,
        actual: DataType,
    },

    /// Native operation not available for the data type
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Row instruction not available on the device family
    #[error("unsupported instruction: {0}")]
    UnsupportedInstruction(String),

    /// Division by zero in a native division
    #[error("division by zero at element {0}")]
    DivisionByZero(usize),

    /// Device configuration rejected
    #[error("invalid device configuration: {0}")]
    InvalidConfig(String),

    /// Device configuration file could not be read
    #[error("failed to read device configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Device configuration file could not be parsed
    #[error("failed to parse device configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a type mismatch error
    pub fn type_mismatch(obj: ObjId, expected: DataType, actual: DataType) -> Self {
        Self::TypeMismatch { obj, expected, actual }
    }

    /// Create an unsupported operation error
    pub fn unsupported(msg: impl fmt::Display) -> Self {
        Self::UnsupportedOperation(msg.to_string())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
