//! Bit-serial operation sets
//!
//! A [`BitSerialOps`] record is the capability table of one device family:
//! for each numeric kind it maps every catalogue operation to an optional
//! kernel. Operations without a kernel are unimplemented for that family,
//! and callers check [`BitSerialOps::kernel`] before dispatching.
//!
//! # Kernels
//!
//! Kernels are plain functions over [`Microcode`]. They only touch operands
//! through row instructions, never write to their sources, and free every
//! temporary they allocate.

pub mod bitsimd_v;
pub mod fp32;
pub mod int;
pub mod microcode;
pub mod simdram;

pub use microcode::{Emitter, Field, GateSet, Microcode, Row};

use crate::category::NumericKind;
use pim_backends::{BackendError, Device, DeviceFamily, ObjId, PimOp, Result};

/// Operands of one kernel invocation
#[derive(Debug, Clone, Copy)]
pub struct KernelArgs {
    pub src1: Field,
    pub src2: Option<Field>,
    pub dest: Field,
}

impl KernelArgs {
    pub fn unary(src: Field, dest: Field) -> Self {
        Self {
            src1: src,
            src2: None,
            dest,
        }
    }

    pub fn binary(src1: Field, src2: Field, dest: Field) -> Self {
        Self {
            src1,
            src2: Some(src2),
            dest,
        }
    }

    /// Both sources of a binary kernel
    pub fn sources(&self) -> Result<(Field, Field)> {
        let src2 = self
            .src2
            .ok_or_else(|| BackendError::unsupported("binary kernel called without a second source"))?;
        Ok((self.src1, src2))
    }
}

/// A bit-serial implementation of one operation
pub type Kernel = fn(&mut Microcode<'_>, &KernelArgs) -> Result<()>;

/// Operation id to kernel, unimplemented by default
#[derive(Clone, Copy)]
pub struct KernelTable {
    kernels: [Option<Kernel>; PimOp::ALL.len()],
}

impl KernelTable {
    pub const fn new() -> Self {
        Self {
            kernels: [None; PimOp::ALL.len()],
        }
    }

    pub fn with(mut self, op: PimOp, kernel: Kernel) -> Self {
        self.kernels[op.id()] = Some(kernel);
        self
    }

    pub fn get(&self, op: PimOp) -> Option<Kernel> {
        self.kernels[op.id()]
    }

    /// Implemented operations in id order
    pub fn implemented(&self) -> impl Iterator<Item = PimOp> + '_ {
        PimOp::ALL.into_iter().filter(|op| self.get(*op).is_some())
    }
}

impl Default for KernelTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability record of one device family
pub struct BitSerialOps {
    gates: Box<dyn GateSet>,
    signed: KernelTable,
    unsigned: KernelTable,
    float: KernelTable,
}

impl BitSerialOps {
    /// Empty record: every operation unimplemented
    pub fn new(gates: Box<dyn GateSet>) -> Self {
        Self {
            gates,
            signed: KernelTable::new(),
            unsigned: KernelTable::new(),
            float: KernelTable::new(),
        }
    }

    /// The operation set of `family`
    pub fn for_family(family: DeviceFamily) -> Self {
        match family {
            DeviceFamily::BitSimdV => bitsimd_v::ops(),
            DeviceFamily::Simdram => simdram::ops(),
        }
    }

    pub fn with_table(mut self, kind: NumericKind, table: KernelTable) -> Self {
        *self.table_mut(kind) = table;
        self
    }

    /// Mark one operation unimplemented
    pub fn without(mut self, kind: NumericKind, op: PimOp) -> Self {
        self.table_mut(kind).kernels[op.id()] = None;
        self
    }

    fn table_mut(&mut self, kind: NumericKind) -> &mut KernelTable {
        match kind {
            NumericKind::Signed => &mut self.signed,
            NumericKind::Unsigned => &mut self.unsigned,
            NumericKind::Float => &mut self.float,
        }
    }

    pub fn table(&self, kind: NumericKind) -> &KernelTable {
        match kind {
            NumericKind::Signed => &self.signed,
            NumericKind::Unsigned => &self.unsigned,
            NumericKind::Float => &self.float,
        }
    }

    pub fn family(&self) -> DeviceFamily {
        self.gates.family()
    }

    pub fn gates(&self) -> &dyn GateSet {
        self.gates.as_ref()
    }

    pub fn kernel(&self, kind: NumericKind, op: PimOp) -> Option<Kernel> {
        self.table(kind).get(op)
    }

    pub fn supports(&self, kind: NumericKind, op: PimOp) -> bool {
        self.kernel(kind, op).is_some()
    }

    /// Run `kernel` with `anchor` as the placement for temporaries
    pub fn run(&self, device: &mut dyn Device, kernel: Kernel, anchor: ObjId, args: &KernelArgs) -> Result<()> {
        let mut mc = Microcode::new(device, self.gates(), anchor)?;
        kernel(&mut mc, args)?;
        mc.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_table_defaults_to_unimplemented() {
        let table = KernelTable::new();
        assert_eq!(table.implemented().count(), 0);

        let table = table.with(PimOp::Xor, int::xor);
        assert_eq!(table.implemented().collect::<Vec<_>>(), vec![PimOp::Xor]);
        assert!(table.get(PimOp::Add).is_none());
    }

    #[test]
    fn test_without_removes_one_operation() {
        let ops = BitSerialOps::for_family(DeviceFamily::BitSimdV).without(NumericKind::Signed, PimOp::Min);
        assert!(!ops.supports(NumericKind::Signed, PimOp::Min));
        assert!(ops.supports(NumericKind::Unsigned, PimOp::Min));
        assert_eq!(ops.table(NumericKind::Signed).implemented().count(), 14);
    }

    #[test]
    fn test_sources_requires_second_operand() {
        let field = Field::whole(ObjId::new(1), 8);
        assert!(KernelArgs::unary(field, field).sources().is_err());
        assert!(KernelArgs::binary(field, field, field).sources().is_ok());
    }
}
