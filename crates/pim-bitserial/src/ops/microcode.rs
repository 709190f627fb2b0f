//! Gate-level programming of a bit-serial device
//!
//! Kernels are written against [`Microcode`], which offers one-bit gates over
//! object rows. Each gate is lowered by the family's [`GateSet`] into row
//! instructions executed on the device.
//!
//! ```text
//! kernel ──► Microcode::xor(a, b, dst)
//!                 │
//!                 ▼
//!            GateSet::logic ──► read a / mov / read b / xor / write dst
//! ```

use pim_backends::{
    BackendError, DataType, Device, DeviceFamily, LogicOp, ObjId, Result, RowInstruction, RowReg,
};

/// One row (bit position) of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    pub obj: ObjId,
    pub index: u32,
}

/// Consecutive rows of one object holding an unsigned bit field, LSB first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub obj: ObjId,
    pub offset: u32,
    pub width: u32,
}

impl Field {
    /// The whole object
    pub const fn whole(obj: ObjId, bits: u32) -> Self {
        Self {
            obj,
            offset: 0,
            width: bits,
        }
    }

    /// Row `i` of the field
    pub fn row(self, i: u32) -> Row {
        debug_assert!(i < self.width, "row {i} outside field of width {}", self.width);
        Row {
            obj: self.obj,
            index: self.offset + i,
        }
    }

    /// Most significant row
    pub fn msb(self) -> Row {
        self.row(self.width - 1)
    }

    /// Sub-field of `width` rows starting at row `start`
    pub fn slice(self, start: u32, width: u32) -> Field {
        debug_assert!(start + width <= self.width);
        Field {
            obj: self.obj,
            offset: self.offset + start,
            width,
        }
    }

    pub fn rows(self) -> impl DoubleEndedIterator<Item = Row> {
        (0..self.width).map(move |i| self.row(i))
    }
}

// ================================================================================================
// Emitter
// ================================================================================================

/// Issues row instructions on behalf of one operand placement
pub struct Emitter<'a> {
    device: &'a mut dyn Device,
    anchor: ObjId,
}

impl Emitter<'_> {
    fn emit(&mut self, instr: RowInstruction) -> Result<()> {
        self.device.execute_row(self.anchor, instr)
    }

    /// Sense `row` into SA
    pub fn read(&mut self, row: Row) -> Result<()> {
        self.emit(RowInstruction::ReadRow {
            obj: row.obj,
            row: row.index,
        })
    }

    /// Write SA into `row`
    pub fn write(&mut self, row: Row) -> Result<()> {
        self.emit(RowInstruction::WriteRow {
            obj: row.obj,
            row: row.index,
        })
    }

    pub fn set(&mut self, dest: RowReg, value: bool) -> Result<()> {
        self.emit(RowInstruction::Set { dest, value })
    }

    pub fn mov(&mut self, src: RowReg, dest: RowReg) -> Result<()> {
        self.emit(RowInstruction::Move { src, dest })
    }

    pub fn not(&mut self, src: RowReg, dest: RowReg) -> Result<()> {
        self.emit(RowInstruction::Not { src, dest })
    }

    pub fn logic(&mut self, op: LogicOp, src1: RowReg, src2: RowReg, dest: RowReg) -> Result<()> {
        self.emit(RowInstruction::Logic { op, src1, src2, dest })
    }

    pub fn maj(&mut self, a: RowReg, b: RowReg, c: RowReg, dest: RowReg) -> Result<()> {
        self.emit(RowInstruction::Maj { a, b, c, dest })
    }

    pub fn sel(&mut self, cond: RowReg, a: RowReg, b: RowReg, dest: RowReg) -> Result<()> {
        self.emit(RowInstruction::Sel { cond, a, b, dest })
    }

    /// Read `row` and park it in `reg`
    pub fn load(&mut self, row: Row, reg: RowReg) -> Result<()> {
        self.read(row)?;
        if reg != RowReg::Sa {
            self.mov(RowReg::Sa, reg)?;
        }
        Ok(())
    }
}

// ================================================================================================
// Gate Sets
// ================================================================================================

/// Lowering of one-bit gates into a family's row instructions
///
/// Every gate reads all of its inputs before it writes `dst`, so the
/// destination may alias an input.
pub trait GateSet: Send + Sync {
    fn family(&self) -> DeviceFamily;

    /// `dst = op(a, b)`
    fn logic(&self, em: &mut Emitter<'_>, op: LogicOp, a: Row, b: Row, dst: Row) -> Result<()>;

    /// `dst = maj(a, b, c)`
    fn maj(&self, em: &mut Emitter<'_>, a: Row, b: Row, c: Row, dst: Row) -> Result<()>;

    /// `dst = cond ? a : b`
    fn sel(&self, em: &mut Emitter<'_>, cond: Row, a: Row, b: Row, dst: Row) -> Result<()>;

    fn copy(&self, em: &mut Emitter<'_>, src: Row, dst: Row) -> Result<()> {
        em.read(src)?;
        em.write(dst)
    }

    fn constant(&self, em: &mut Emitter<'_>, dst: Row, value: bool) -> Result<()> {
        em.set(RowReg::Sa, value)?;
        em.write(dst)
    }

    fn not(&self, em: &mut Emitter<'_>, src: Row, dst: Row) -> Result<()> {
        em.read(src)?;
        em.not(RowReg::Sa, RowReg::Sa)?;
        em.write(dst)
    }
}

// ================================================================================================
// Microcode Context
// ================================================================================================

/// Execution context of one kernel invocation
///
/// Temporaries are allocated associated with the anchor operand and freed
/// in reverse order, either by [`Microcode::finish`] or on drop.
pub struct Microcode<'a> {
    em: Emitter<'a>,
    gates: &'a dyn GateSet,
    temp_type: DataType,
    temps: Vec<ObjId>,
}

impl<'a> Microcode<'a> {
    pub fn new(device: &'a mut dyn Device, gates: &'a dyn GateSet, anchor: ObjId) -> Result<Self> {
        let temp_type = device.object_info(anchor)?.data_type;
        Ok(Self {
            em: Emitter { device, anchor },
            gates,
            temp_type,
            temps: Vec::new(),
        })
    }

    pub fn family(&self) -> DeviceFamily {
        self.gates.family()
    }

    /// Allocate a scratch field of `width` rows on the anchor's placement
    pub fn temp(&mut self, width: u32) -> Result<Field> {
        let obj = self.em.device.allocate_associated(width, self.em.anchor, self.temp_type)?;
        self.temps.push(obj);
        Ok(Field::whole(obj, width))
    }

    /// Free the most recent temporary
    pub fn release(&mut self, field: Field) -> Result<()> {
        match self.temps.last() {
            Some(&last) if last == field.obj => {
                self.temps.pop();
                self.em.device.free(last)
            }
            _ => Err(BackendError::InvalidAllocation(format!(
                "{} is not the most recent temporary",
                field.obj
            ))),
        }
    }

    /// Free all remaining temporaries, newest first
    pub fn finish(mut self) -> Result<()> {
        self.free_temps()
    }

    fn free_temps(&mut self) -> Result<()> {
        let mut first_error = None;
        while let Some(obj) = self.temps.pop() {
            if let Err(err) = self.em.device.free(obj) {
                tracing::warn!(%obj, error = %err, "failed to free kernel temporary");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // ============================================================================================
    // Gates
    // ============================================================================================

    pub fn copy(&mut self, src: Row, dst: Row) -> Result<()> {
        self.gates.copy(&mut self.em, src, dst)
    }

    pub fn constant(&mut self, dst: Row, value: bool) -> Result<()> {
        self.gates.constant(&mut self.em, dst, value)
    }

    pub fn not(&mut self, src: Row, dst: Row) -> Result<()> {
        self.gates.not(&mut self.em, src, dst)
    }

    pub fn and(&mut self, a: Row, b: Row, dst: Row) -> Result<()> {
        self.gates.logic(&mut self.em, LogicOp::And, a, b, dst)
    }

    pub fn or(&mut self, a: Row, b: Row, dst: Row) -> Result<()> {
        self.gates.logic(&mut self.em, LogicOp::Or, a, b, dst)
    }

    pub fn xor(&mut self, a: Row, b: Row, dst: Row) -> Result<()> {
        self.gates.logic(&mut self.em, LogicOp::Xor, a, b, dst)
    }

    pub fn xnor(&mut self, a: Row, b: Row, dst: Row) -> Result<()> {
        self.gates.logic(&mut self.em, LogicOp::Xnor, a, b, dst)
    }

    pub fn maj(&mut self, a: Row, b: Row, c: Row, dst: Row) -> Result<()> {
        self.gates.maj(&mut self.em, a, b, c, dst)
    }

    pub fn sel(&mut self, cond: Row, a: Row, b: Row, dst: Row) -> Result<()> {
        self.gates.sel(&mut self.em, cond, a, b, dst)
    }
}

impl Drop for Microcode<'_> {
    fn drop(&mut self) {
        let _ = self.free_temps();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::bitsimd_v::BitSimdVGates;
    use pim_backends::{DeviceExt, FunctionalDevice};

    #[test]
    fn test_field_rows() {
        let field = Field {
            obj: ObjId::new(1),
            offset: 4,
            width: 8,
        };
        assert_eq!(field.row(0).index, 4);
        assert_eq!(field.msb().index, 11);
        let upper = field.slice(2, 3);
        assert_eq!(upper.offset, 6);
        assert_eq!(upper.rows().map(|r| r.index).collect::<Vec<_>>(), vec![6, 7, 8]);
    }

    #[test]
    fn test_temporaries_are_freed_newest_first() {
        let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
        let anchor = device.allocate(16, 8, DataType::UInt8).unwrap();
        let gates = BitSimdVGates;

        let mut mc = Microcode::new(&mut device, &gates, anchor).unwrap();
        let first = mc.temp(4).unwrap();
        let second = mc.temp(2).unwrap();
        assert!(mc.release(first).is_err());
        mc.release(second).unwrap();
        mc.temp(1).unwrap();
        mc.finish().unwrap();

        assert_eq!(device.live_objects(), 1);
        device.free(anchor).unwrap();
    }

    #[test]
    fn test_drop_frees_temporaries() {
        let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
        let anchor = device.allocate(16, 8, DataType::UInt8).unwrap();
        let gates = BitSimdVGates;
        {
            let mut mc = Microcode::new(&mut device, &gates, anchor).unwrap();
            mc.temp(3).unwrap();
            mc.temp(3).unwrap();
        }
        assert_eq!(device.live_objects(), 1);
    }

    #[test]
    fn test_gates_may_alias_destination() {
        let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
        let obj = device.allocate(4, 2, DataType::UInt8).unwrap();
        device.copy_to_device(&[0b00u8, 0b01, 0b10, 0b11], obj).unwrap();
        let gates = BitSimdVGates;

        let mut mc = Microcode::new(&mut device, &gates, obj).unwrap();
        let field = Field::whole(obj, 2);
        mc.xor(field.row(0), field.row(1), field.row(0)).unwrap();
        mc.finish().unwrap();

        let mut out = [0u8; 4];
        device.copy_from_device(obj, &mut out).unwrap();
        assert_eq!(out, [0b00, 0b01, 0b11, 0b10]);
    }
}
