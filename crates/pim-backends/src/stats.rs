//! Device execution counters

use crate::device::DeviceFamily;
use crate::isa::{PimOp, RowInstructionKind};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counters accumulated since the last [`crate::Device::reset_stats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceStats {
    /// Row instructions by name ("row.read", "reg.maj", ...)
    pub row_instructions: BTreeMap<&'static str, u64>,
    /// Native operations by name
    pub native_ops: BTreeMap<&'static str, u64>,
    pub bytes_copied_in: u64,
    pub bytes_copied_out: u64,
}

impl DeviceStats {
    pub fn record_row(&mut self, kind: RowInstructionKind) {
        *self.row_instructions.entry(kind.name()).or_default() += 1;
    }

    pub fn record_native(&mut self, op: PimOp) {
        *self.native_ops.entry(op.name()).or_default() += 1;
    }

    /// Total number of row instructions
    pub fn total_row_instructions(&self) -> u64 {
        self.row_instructions.values().sum()
    }

    /// Count for one instruction kind
    pub fn row_count(&self, kind: RowInstructionKind) -> u64 {
        self.row_instructions.get(kind.name()).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.row_instructions.is_empty()
            && self.native_ops.is_empty()
            && self.bytes_copied_in == 0
            && self.bytes_copied_out == 0
    }

    /// Emit the counters as `info` events
    pub fn log(&self, family: DeviceFamily) {
        tracing::info!(
            device = family.name(),
            row_instructions = self.total_row_instructions(),
            bytes_in = self.bytes_copied_in,
            bytes_out = self.bytes_copied_out,
            "device stats"
        );
        for (name, count) in &self.row_instructions {
            tracing::info!(device = family.name(), command = name, count, "row command");
        }
        for (name, count) in &self.native_ops {
            tracing::info!(device = family.name(), op = name, count, "native op");
        }
    }
}
