//! Object memory for the functional device
//!
//! Each object is a stack of bit-planes. Plane `r` packs bit `r` of every
//! element into `u64` words, element `i` at word `i / 64`, bit `i % 64`.
//!
//! ```text
//!            element 0 1 2 3 ...
//! plane 0  (LSB)     1 0 1 1
//! plane 1            0 0 1 0
//! ...
//! plane bits-1 (MSB) 0 1 0 0
//! ```
//!
//! Rows are accounted per core. An object of `n` elements spans
//! `ceil(n / num_cols)` consecutive cores and takes `bits` rows on each.

use crate::device::{DeviceConfig, ObjId, ObjectInfo};
use crate::error::{BackendError, Result};
use crate::isa::DataType;
use std::collections::HashMap;

/// Widest object the simulator stores
pub(crate) const MAX_OBJECT_BITS: u32 = 64;

/// Number of packed words in one row of `num_elements` elements
pub(crate) fn words_for(num_elements: u64) -> usize {
    num_elements.div_ceil(64) as usize
}

/// Mask of valid element bits in the last word of a row
pub(crate) fn tail_mask(num_elements: u64) -> u64 {
    match num_elements % 64 {
        0 => u64::MAX,
        rem => (1u64 << rem) - 1,
    }
}

/// Mask of the low `bits` bits of an element
pub(crate) fn value_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// An allocated object and its bit-planes
pub(crate) struct DeviceObject {
    pub info: ObjectInfo,
    pub planes: Vec<Vec<u64>>,
    /// Objects allocated against this one that are still alive
    pub live_children: usize,
}

/// Object table and per-core row accounting
pub(crate) struct ObjectArena {
    config: DeviceConfig,
    /// Free rows per core
    free_rows: Vec<u32>,
    objects: HashMap<u64, DeviceObject>,
    next_id: u64,
}

impl ObjectArena {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            free_rows: vec![config.num_rows; config.num_cores as usize],
            objects: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> DeviceConfig {
        self.config
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    // ============================================================================================
    // Allocation
    // ============================================================================================

    pub fn allocate(&mut self, num_elements: u64, bits: u32, data_type: DataType) -> Result<ObjId> {
        check_bits(bits)?;
        if num_elements == 0 {
            return Err(BackendError::InvalidAllocation(
                "object must have at least one element".to_string(),
            ));
        }

        let cores = self.config.cores_for(num_elements);
        if cores > self.config.num_cores {
            return Err(BackendError::InvalidAllocation(format!(
                "{num_elements} elements need {cores} cores, device has {}",
                self.config.num_cores
            )));
        }

        let first_core = self.find_window(cores, bits)?;
        self.insert(ObjectInfo {
            id: ObjId::new(0),
            num_elements,
            bits,
            data_type,
            base: None,
            first_core,
            num_cores: cores,
        })
    }

    pub fn allocate_associated(&mut self, bits: u32, base: ObjId, data_type: DataType) -> Result<ObjId> {
        check_bits(bits)?;
        let base_info = self.info(base)?;
        let root = base_info.base.unwrap_or(base);

        let available = self.min_free(base_info.first_core, base_info.num_cores);
        if available < bits {
            return Err(BackendError::OutOfMemory {
                cores: base_info.num_cores,
                rows: bits,
                available,
            });
        }

        let id = self.insert(ObjectInfo {
            id: ObjId::new(0),
            num_elements: base_info.num_elements,
            bits,
            data_type,
            base: Some(root),
            first_core: base_info.first_core,
            num_cores: base_info.num_cores,
        })?;
        if let Some(root_obj) = self.objects.get_mut(&root.id()) {
            root_obj.live_children += 1;
        }
        Ok(id)
    }

    pub fn free(&mut self, obj: ObjId) -> Result<()> {
        let entry = self.objects.get(&obj.id()).ok_or(BackendError::InvalidObject(obj))?;
        if entry.live_children > 0 {
            return Err(BackendError::AssociatedObjectsAlive {
                base: obj,
                live: entry.live_children,
            });
        }

        let Some(removed) = self.objects.remove(&obj.id()) else {
            return Err(BackendError::InvalidObject(obj));
        };
        let info = removed.info;
        for core in self.core_range(info.first_core, info.num_cores) {
            self.free_rows[core] += info.bits;
        }
        if let Some(root) = info.base {
            if let Some(root_obj) = self.objects.get_mut(&root.id()) {
                root_obj.live_children = root_obj.live_children.saturating_sub(1);
            }
        }
        Ok(())
    }

    fn insert(&mut self, mut info: ObjectInfo) -> Result<ObjId> {
        let id = ObjId::new(self.next_id);
        self.next_id += 1;
        info.id = id;

        for core in self.core_range(info.first_core, info.num_cores) {
            self.free_rows[core] -= info.bits;
        }
        let words = words_for(info.num_elements);
        self.objects.insert(
            id.id(),
            DeviceObject {
                info,
                planes: vec![vec![0u64; words]; info.bits as usize],
                live_children: 0,
            },
        );
        Ok(id)
    }

    /// First run of `cores` consecutive cores that all have `bits` free rows
    fn find_window(&self, cores: u64, bits: u32) -> Result<u64> {
        let last_start = self.config.num_cores - cores;
        let mut best_available = 0;
        for start in 0..=last_start {
            let available = self.min_free(start, cores);
            if available >= bits {
                return Ok(start);
            }
            best_available = best_available.max(available);
        }
        Err(BackendError::OutOfMemory {
            cores,
            rows: bits,
            available: best_available,
        })
    }

    fn min_free(&self, first_core: u64, cores: u64) -> u32 {
        self.core_range(first_core, cores)
            .map(|core| self.free_rows[core])
            .min()
            .unwrap_or(0)
    }

    fn core_range(&self, first_core: u64, cores: u64) -> std::ops::Range<usize> {
        first_core as usize..(first_core + cores) as usize
    }

    // ============================================================================================
    // Lookup
    // ============================================================================================

    pub fn get(&self, obj: ObjId) -> Result<&DeviceObject> {
        self.objects.get(&obj.id()).ok_or(BackendError::InvalidObject(obj))
    }

    fn get_mut(&mut self, obj: ObjId) -> Result<&mut DeviceObject> {
        self.objects.get_mut(&obj.id()).ok_or(BackendError::InvalidObject(obj))
    }

    pub fn info(&self, obj: ObjId) -> Result<ObjectInfo> {
        self.get(obj).map(|entry| entry.info)
    }

    /// Fail unless both objects share one placement
    pub fn check_associated(&self, lhs: ObjId, rhs: ObjId) -> Result<()> {
        let lhs_info = self.info(lhs)?;
        let rhs_info = self.info(rhs)?;
        if lhs_info.base.unwrap_or(lhs) != rhs_info.base.unwrap_or(rhs) {
            return Err(BackendError::NotAssociated {
                lhs,
                rhs,
                lhs_len: lhs_info.num_elements,
                rhs_len: rhs_info.num_elements,
            });
        }
        Ok(())
    }

    // ============================================================================================
    // Row Access
    // ============================================================================================

    pub fn row(&self, obj: ObjId, row: u32) -> Result<&[u64]> {
        let entry = self.get(obj)?;
        entry
            .planes
            .get(row as usize)
            .map(Vec::as_slice)
            .ok_or(BackendError::RowOutOfRange {
                obj,
                row,
                bits: entry.info.bits,
            })
    }

    pub fn set_row(&mut self, obj: ObjId, row: u32, data: &[u64]) -> Result<()> {
        let entry = self.get_mut(obj)?;
        let num_elements = entry.info.num_elements;
        let bits = entry.info.bits;
        let plane = entry
            .planes
            .get_mut(row as usize)
            .ok_or(BackendError::RowOutOfRange { obj, row, bits })?;
        if data.len() != plane.len() {
            return Err(BackendError::SizeMismatch {
                obj,
                expected: plane.len() * 8,
                actual: data.len() * 8,
            });
        }
        plane.copy_from_slice(data);
        if let Some(last) = plane.last_mut() {
            *last &= tail_mask(num_elements);
        }
        Ok(())
    }

    // ============================================================================================
    // Element Access
    // ============================================================================================

    /// Gather every element as a raw `bits`-wide pattern
    pub fn read_elements(&self, obj: ObjId) -> Result<Vec<u64>> {
        let entry = self.get(obj)?;
        let mut values = vec![0u64; entry.info.num_elements as usize];
        for (bit, plane) in entry.planes.iter().enumerate() {
            for (index, value) in values.iter_mut().enumerate() {
                let set = (plane[index / 64] >> (index % 64)) & 1;
                *value |= set << bit;
            }
        }
        Ok(values)
    }

    /// Scatter raw element patterns into the bit-planes, dropping bits above `bits`
    pub fn write_elements(&mut self, obj: ObjId, values: &[u64]) -> Result<()> {
        let entry = self.get_mut(obj)?;
        let expected = entry.info.num_elements as usize;
        if values.len() != expected {
            return Err(BackendError::SizeMismatch {
                obj,
                expected,
                actual: values.len(),
            });
        }
        for (bit, plane) in entry.planes.iter_mut().enumerate() {
            plane.fill(0);
            for (index, value) in values.iter().enumerate() {
                plane[index / 64] |= ((value >> bit) & 1) << (index % 64);
            }
        }
        Ok(())
    }

    pub fn copy_from_host(&mut self, obj: ObjId, data: &[u8]) -> Result<()> {
        let info = self.info(obj)?;
        check_host_size(&info, data.len())?;
        let values: Vec<u64> = data
            .chunks_exact(info.host_element_bytes())
            .map(|bytes| {
                bytes
                    .iter()
                    .rev()
                    .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
            })
            .collect();
        self.write_elements(obj, &values)
    }

    pub fn copy_to_host(&self, obj: ObjId, data: &mut [u8]) -> Result<()> {
        let info = self.info(obj)?;
        check_host_size(&info, data.len())?;
        let values = self.read_elements(obj)?;
        for (bytes, value) in data.chunks_exact_mut(info.host_element_bytes()).zip(values) {
            for (shift, byte) in bytes.iter_mut().enumerate() {
                *byte = (value >> (shift * 8)) as u8;
            }
        }
        Ok(())
    }
}

fn check_bits(bits: u32) -> Result<()> {
    if bits == 0 || bits > MAX_OBJECT_BITS {
        return Err(BackendError::InvalidAllocation(format!(
            "element width must be 1..={MAX_OBJECT_BITS} bits, got {bits}"
        )));
    }
    Ok(())
}

fn check_host_size(info: &ObjectInfo, actual: usize) -> Result<()> {
    if actual != info.host_bytes() {
        return Err(BackendError::SizeMismatch {
            obj: info.id,
            expected: info.host_bytes(),
            actual,
        });
    }
    Ok(())
}
