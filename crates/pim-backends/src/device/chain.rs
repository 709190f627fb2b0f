//! Ownership of a base object and the objects associated with it

use super::{Device, ObjId};
use crate::error::{BackendError, Result};
use crate::isa::DataType;

/// A base object plus its associated objects on one device
///
/// Objects are freed in reverse allocation order, so the base always goes
/// last. Dropping the chain frees whatever is left, which keeps an early `?`
/// return from leaking device rows.
pub struct ObjectChain<'d> {
    device: &'d mut dyn Device,
    objects: Vec<ObjId>,
}

impl<'d> ObjectChain<'d> {
    pub fn new(device: &'d mut dyn Device) -> Self {
        Self {
            device,
            objects: Vec::new(),
        }
    }

    pub fn device(&mut self) -> &mut dyn Device {
        &mut *self.device
    }

    /// Live objects, base first
    pub fn objects(&self) -> &[ObjId] {
        &self.objects
    }

    /// Allocate the base object; the chain must be empty
    pub fn base(&mut self, num_elements: u64, data_type: DataType) -> Result<ObjId> {
        if !self.objects.is_empty() {
            return Err(BackendError::InvalidAllocation(
                "object chain already has a base object".to_string(),
            ));
        }
        let obj = self.device.allocate(num_elements, data_type.bits(), data_type)?;
        self.objects.push(obj);
        Ok(obj)
    }

    /// Allocate an object associated with the base
    pub fn associated(&mut self, data_type: DataType) -> Result<ObjId> {
        let base = *self
            .objects
            .first()
            .ok_or_else(|| BackendError::InvalidAllocation("object chain has no base object".to_string()))?;
        let obj = self.device.allocate_associated(data_type.bits(), base, data_type)?;
        self.objects.push(obj);
        Ok(obj)
    }

    /// Free every object, newest first
    ///
    /// Keeps freeing after a failure and returns the first error.
    pub fn release(mut self) -> Result<()> {
        self.free_all()
    }

    fn free_all(&mut self) -> Result<()> {
        let mut first_error = None;
        while let Some(obj) = self.objects.pop() {
            if let Err(err) = self.device.free(obj) {
                tracing::error!(%obj, error = %err, "free failed");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for ObjectChain<'_> {
    fn drop(&mut self) {
        let _ = self.free_all();
    }
}
