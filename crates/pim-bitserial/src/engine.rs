//! Differential test engine
//!
//! Runs every catalogue operation of one numeric category twice on the same
//! device, once natively and once through the family's bit-serial kernel,
//! and compares the two results bit for bit.
//!
//! Each test case walks the same states:
//!
//! ```text
//! Setup ─► RunReference ─► RunEmulated ─► Verify ─► Report
//! ```
//!
//! Operand vectors are generated once per category and uploaded afresh for
//! every test case. All device objects of a test case live in one
//! [`ObjectChain`] and are freed, newest first, before the next case.

use crate::catalogue::{operations, SecondOperand};
use crate::category::NumericCategory;
use crate::element::Element;
use crate::error::{HarnessError, Result};
use crate::generator::{equality_indices, seed_equal, OperandGenerator};
use crate::ops::{BitSerialOps, Field, KernelArgs};
use pim_backends::{Device, DeviceExt, DeviceFamily, ObjId, ObjectChain, Operands, PimOp};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Mismatching elements reported per failed test
pub const MAX_MISMATCH_SAMPLES: usize = 3;

// ================================================================================================
// Host Operands
// ================================================================================================

/// Host copies of the four operand vectors of a category
#[derive(Debug, Clone)]
pub struct HostOperands<T> {
    pub src1: Vec<T>,
    pub src2: Vec<T>,
    pub src_non_zero: Vec<T>,
    pub src3: Vec<T>,
}

impl<T: Element> HostOperands<T> {
    /// Draw all four vectors from the category's bounds
    ///
    /// `src2` is forced equal to `src1` at [`equality_indices`] so that
    /// equality comparisons see both outcomes.
    pub fn generate(gen: &mut OperandGenerator, num_elements: usize) -> Result<Self> {
        let category = T::CATEGORY;
        let (min, max) = T::bounds_from(category.bounds()).ok_or_else(|| {
            HarnessError::config(format!("element type does not match category {category}"))
        })?;
        let indices = equality_indices(num_elements)?;

        let src1 = gen.generate(num_elements, min, max, false)?;
        let mut src2 = gen.generate(num_elements, min, max, false)?;
        seed_equal(&src1, &mut src2, &indices)?;
        let src_non_zero = gen.generate(num_elements, min, max, true)?;
        let src3 = gen.generate(num_elements, min, max, false)?;

        Ok(Self {
            src1,
            src2,
            src_non_zero,
            src3,
        })
    }

    pub fn len(&self) -> usize {
        self.src1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.src1.is_empty()
    }

    fn check_lengths(&self) -> Result<()> {
        let n = self.src1.len();
        if n < 2 || [&self.src2, &self.src_non_zero, &self.src3].iter().any(|v| v.len() != n) {
            return Err(HarnessError::config(format!(
                "operand vectors must share a length of at least 2 (src1 has {n})"
            )));
        }
        Ok(())
    }

    fn second(&self, which: SecondOperand) -> Option<&[T]> {
        match which {
            SecondOperand::General => Some(&self.src2),
            SecondOperand::NonZero => Some(&self.src_non_zero),
            SecondOperand::None => None,
        }
    }
}

// ================================================================================================
// Outcomes
// ================================================================================================

/// One mismatching element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MismatchSample {
    pub index: usize,
    pub src1: String,
    pub src2: Option<String>,
    pub expected: String,
    pub actual: String,
}

/// Result mismatch summary: total count plus the first few elements
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MismatchReport {
    pub total: usize,
    pub samples: Vec<MismatchSample>,
}

/// Final state of one test case
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    /// Result mismatch, operand corruption, or both
    Failed {
        mismatch: Option<MismatchReport>,
        corrupted_inputs: Vec<&'static str>,
    },
    /// The family has no kernel for this operation
    Unimplemented,
    /// The bit-serial kernel stopped with a device error
    KernelError { message: String },
    /// The device refused a call during the test case
    BackendFailure { call: &'static str, message: String },
}

impl TestStatus {
    pub fn passed(&self) -> bool {
        matches!(self, TestStatus::Passed)
    }

    /// Allocation, copy or free refused; native execution errors do not count
    pub fn is_device_failure(&self) -> bool {
        matches!(self, TestStatus::BackendFailure { call, .. } if *call != "execute")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestOutcome {
    pub family: DeviceFamily,
    pub category: NumericCategory,
    pub op: PimOp,
    #[serde(flatten)]
    pub status: TestStatus,
}

/// Outcomes of one category on one family, in catalogue order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRun {
    pub family: DeviceFamily,
    pub category: NumericCategory,
    pub outcomes: Vec<TestOutcome>,
}

impl CategoryRun {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.passed()).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Test cases whose setup or teardown the device refused
    pub fn backend_failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_device_failure()).count()
    }

    pub fn outcome(&self, op: PimOp) -> Option<&TestOutcome> {
        self.outcomes.iter().find(|o| o.op == op)
    }
}

// ================================================================================================
// Host Transfers
// ================================================================================================

fn upload<T: Element>(chain: &mut ObjectChain<'_>, data: &[T], obj: ObjId) -> Result<()> {
    chain
        .device()
        .copy_to_device(data, obj)
        .map_err(HarnessError::backend("copy_host_to_device"))
}

fn download<T: Element>(chain: &mut ObjectChain<'_>, obj: ObjId) -> Result<Vec<T>> {
    let device = chain.device();
    let len = device
        .object_info(obj)
        .map_err(HarnessError::backend("object_info"))?
        .num_elements;
    let mut out = vec![<T as bytemuck::Zeroable>::zeroed(); len as usize];
    device
        .copy_from_device(obj, &mut out)
        .map_err(HarnessError::backend("copy_device_to_host"))?;
    Ok(out)
}

// ================================================================================================
// Engine
// ================================================================================================

/// Device objects of one test case
struct CaseObjects {
    src1: ObjId,
    src2: ObjId,
    src_non_zero: ObjId,
    dest1: ObjId,
    dest2: ObjId,
    src3: ObjId,
}

impl CaseObjects {
    fn second(&self, which: SecondOperand) -> Option<ObjId> {
        match which {
            SecondOperand::General => Some(self.src2),
            SecondOperand::NonZero => Some(self.src_non_zero),
            SecondOperand::None => None,
        }
    }
}

/// Compares bit-serial kernels against native operations on one device
pub struct DifferentialEngine<'a> {
    device: &'a mut dyn Device,
    ops: &'a BitSerialOps,
    num_elements: usize,
}

impl<'a> DifferentialEngine<'a> {
    /// # Errors
    ///
    /// Configuration error if the operation set targets another family or
    /// the population is smaller than two elements.
    pub fn new(device: &'a mut dyn Device, ops: &'a BitSerialOps, num_elements: usize) -> Result<Self> {
        if device.family() != ops.family() {
            return Err(HarnessError::config(format!(
                "{} operation set cannot drive a {} device",
                ops.family(),
                device.family()
            )));
        }
        equality_indices(num_elements)?;
        Ok(Self {
            device,
            ops,
            num_elements,
        })
    }

    pub fn family(&self) -> DeviceFamily {
        self.ops.family()
    }

    /// Generate operands for `T`'s category and run its full catalogue
    pub fn run_category<T: Element>(&mut self, gen: &mut OperandGenerator) -> Result<CategoryRun> {
        let operands = HostOperands::<T>::generate(gen, self.num_elements)?;
        self.run_with_operands(&operands)
    }

    /// Run the full catalogue of `T`'s category on fixed operands
    ///
    /// Only configuration problems are returned as errors. Device failures
    /// are recorded in the outcome of the test case they hit.
    pub fn run_with_operands<T: Element>(&mut self, host: &HostOperands<T>) -> Result<CategoryRun> {
        host.check_lengths()?;
        let family = self.family();
        let category = T::CATEGORY;
        let mut run = CategoryRun {
            family,
            category,
            outcomes: Vec::new(),
        };

        for &op in operations(category.kind()) {
            let tag = format!("[{family}:{category}:{op}:{}]", op.id());
            info!("{tag} Start");

            let status = match self.run_case(host, op, &tag) {
                Ok(status) => status,
                Err(HarnessError::Backend { call, source }) => {
                    error!("{tag} {call} failed: {source}");
                    TestStatus::BackendFailure {
                        call,
                        message: source.to_string(),
                    }
                }
                Err(err) => return Err(err),
            };

            if status.passed() {
                info!("{tag} End -- Succeeded!");
            } else {
                warn!("{tag} End -- Failed!");
            }
            run.outcomes.push(TestOutcome {
                family,
                category,
                op,
                status,
            });
        }

        info!(%family, %category, "{} / {} passed", run.passed(), run.total());
        Ok(run)
    }

    fn run_case<T: Element>(&mut self, host: &HostOperands<T>, op: PimOp, tag: &str) -> Result<TestStatus> {
        let category = T::CATEGORY;
        let Some(kernel) = self.ops.kernel(category.kind(), op) else {
            warn!("{tag} no bit-serial kernel on {}", self.ops.family());
            return Ok(TestStatus::Unimplemented);
        };
        let data_type = category.data_type();
        let bits = data_type.bits();
        let which = SecondOperand::for_op(op);

        // Setup
        let mut chain = ObjectChain::new(&mut *self.device);
        let src1 = chain
            .base(host.len() as u64, data_type)
            .map_err(HarnessError::backend("allocate"))?;
        let mut associated = || {
            chain
                .associated(data_type)
                .map_err(HarnessError::backend("allocate_associated"))
        };
        let objs = CaseObjects {
            src1,
            src2: associated()?,
            src_non_zero: associated()?,
            dest1: associated()?,
            dest2: associated()?,
            // trailing object, catches writes past the destinations
            src3: associated()?,
        };
        upload(&mut chain, &host.src1, objs.src1)?;
        upload(&mut chain, &host.src2, objs.src2)?;
        upload(&mut chain, &host.src_non_zero, objs.src_non_zero)?;
        upload(&mut chain, &host.src3, objs.src3)?;
        debug!("{tag} operands uploaded");

        // RunReference
        let second = objs.second(which);
        let operands = match second {
            Some(src2) => Operands::binary(objs.src1, src2, objs.dest1),
            None => Operands::unary(objs.src1, objs.dest1),
        };
        chain
            .device()
            .execute(op, operands)
            .map_err(HarnessError::backend("execute"))?;

        // RunEmulated
        let args = KernelArgs {
            src1: Field::whole(objs.src1, bits),
            src2: second.map(|obj| Field::whole(obj, bits)),
            dest: Field::whole(objs.dest2, bits),
        };
        chain.device().reset_stats();
        let emulated = self.ops.run(chain.device(), kernel, objs.src1, &args);
        chain.device().show_stats();
        if let Err(err) = emulated {
            warn!("{tag} bit-serial kernel failed: {err}");
            chain.release().map_err(HarnessError::backend("free"))?;
            return Ok(TestStatus::KernelError {
                message: err.to_string(),
            });
        }

        // Verify
        let expected: Vec<T> = download(&mut chain, objs.dest1)?;
        let actual: Vec<T> = download(&mut chain, objs.dest2)?;
        let mismatch = compare_results(host, which, &expected, &actual);
        if let Some(report) = &mismatch {
            for s in &report.samples {
                warn!(
                    "{tag} element {}: src1 = {}, src2 = {}, expected {}, got {}",
                    s.index,
                    s.src1,
                    s.src2.as_deref().unwrap_or("-"),
                    s.expected,
                    s.actual
                );
            }
            warn!("{tag} {} of {} elements differ", report.total, expected.len());
        }

        let mut corrupted_inputs = Vec::new();
        let inputs: [(&'static str, ObjId, &[T]); 4] = [
            ("src1", objs.src1, host.src1.as_slice()),
            ("src2", objs.src2, host.src2.as_slice()),
            ("srcNonZero", objs.src_non_zero, host.src_non_zero.as_slice()),
            ("src3", objs.src3, host.src3.as_slice()),
        ];
        for (role, obj, original) in inputs {
            let now: Vec<T> = download(&mut chain, obj)?;
            if !all_bit_eq(original, &now) {
                warn!("{tag} operand {role} was modified");
                corrupted_inputs.push(role);
            }
        }

        // Report
        chain.release().map_err(HarnessError::backend("free"))?;
        Ok(if mismatch.is_none() && corrupted_inputs.is_empty() {
            TestStatus::Passed
        } else {
            TestStatus::Failed {
                mismatch,
                corrupted_inputs,
            }
        })
    }
}

fn all_bit_eq<T: Element>(lhs: &[T], rhs: &[T]) -> bool {
    lhs.len() == rhs.len() && lhs.iter().zip(rhs).all(|(a, b)| a.bit_eq(b))
}

fn compare_results<T: Element>(
    host: &HostOperands<T>,
    which: SecondOperand,
    expected: &[T],
    actual: &[T],
) -> Option<MismatchReport> {
    let second = host.second(which);
    let mut total = 0;
    let mut samples = Vec::new();
    for (index, (want, got)) in expected.iter().zip(actual).enumerate() {
        if want.bit_eq(got) {
            continue;
        }
        total += 1;
        if samples.len() < MAX_MISMATCH_SAMPLES {
            samples.push(MismatchSample {
                index,
                src1: host.src1[index].to_string(),
                src2: second.map(|v| v[index].to_string()),
                expected: want.to_string(),
                actual: got.to_string(),
            });
        }
    }
    (total > 0).then_some(MismatchReport { total, samples })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::NumericKind;
    use crate::ops::{int, KernelTable};
    use pim_backends::FunctionalDevice;

    fn operands_i8() -> HostOperands<i8> {
        HostOperands {
            src1: vec![1, -2, 3, 4, 5, -6, 7, 8],
            src2: vec![1, 2, -3, 4, 9, 6, 7, -8],
            src_non_zero: vec![1, 1, 2, 2, -3, 3, 4, 4],
            src3: vec![0; 8],
        }
    }

    #[test]
    fn test_full_catalogue_passes() {
        let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
        let ops = BitSerialOps::for_family(DeviceFamily::BitSimdV);
        let mut engine = DifferentialEngine::new(&mut device, &ops, 8).unwrap();

        let run = engine.run_with_operands(&operands_i8()).unwrap();
        assert_eq!(run.total(), 15);
        assert_eq!(run.passed(), 15, "{:?}", run.outcomes);
        assert_eq!(device.live_objects(), 0);
    }

    // Writes 0 everywhere, so only a few elements happen to match
    fn zero_kernel(mc: &mut crate::ops::Microcode<'_>, args: &KernelArgs) -> pim_backends::Result<()> {
        for row in args.dest.rows() {
            mc.constant(row, false)?;
        }
        Ok(())
    }

    // Flips bit 0 of the first source
    fn corrupting_kernel(mc: &mut crate::ops::Microcode<'_>, args: &KernelArgs) -> pim_backends::Result<()> {
        int::add(mc, args)?;
        let row = args.src1.row(0);
        mc.not(row, row)
    }

    #[test]
    fn test_mismatch_is_sampled() {
        let table = KernelTable::new().with(PimOp::Add, zero_kernel);
        let ops = BitSerialOps::for_family(DeviceFamily::BitSimdV).with_table(NumericKind::Signed, table);
        let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
        let mut engine = DifferentialEngine::new(&mut device, &ops, 8).unwrap();

        let run = engine.run_with_operands(&operands_i8()).unwrap();
        let add = run.outcome(PimOp::Add).unwrap();
        let TestStatus::Failed { mismatch: Some(report), corrupted_inputs } = &add.status else {
            panic!("expected a result mismatch, got {:?}", add.status);
        };
        // sums: 2, 0, 0, 8, 14, 0, 14, 0
        assert_eq!(report.total, 4);
        assert_eq!(report.samples.len(), MAX_MISMATCH_SAMPLES);
        assert_eq!(report.samples[0].index, 0);
        assert_eq!(report.samples[0].expected, "2");
        assert_eq!(report.samples[0].actual, "0");
        assert_eq!(report.samples[1].index, 3);
        assert!(corrupted_inputs.is_empty());

        assert!(matches!(
            run.outcome(PimOp::Sub).unwrap().status,
            TestStatus::Unimplemented
        ));
        assert_eq!(run.passed(), 0);
        assert_eq!(device.live_objects(), 0);
    }

    #[test]
    fn test_input_corruption_is_detected() {
        let table = KernelTable::new().with(PimOp::Add, corrupting_kernel);
        let ops = BitSerialOps::for_family(DeviceFamily::BitSimdV).with_table(NumericKind::Signed, table);
        let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
        let mut engine = DifferentialEngine::new(&mut device, &ops, 8).unwrap();

        let run = engine.run_with_operands(&operands_i8()).unwrap();
        assert_eq!(
            run.outcome(PimOp::Add).unwrap().status,
            TestStatus::Failed {
                mismatch: None,
                corrupted_inputs: vec!["src1"],
            }
        );
    }

    // Writes a row past the end of the destination
    fn failing_kernel(mc: &mut crate::ops::Microcode<'_>, args: &KernelArgs) -> pim_backends::Result<()> {
        mc.temp(4)?;
        let outside = Field {
            obj: args.dest.obj,
            offset: args.dest.width + 100,
            width: 1,
        };
        mc.constant(outside.row(0), true)
    }

    #[test]
    fn test_kernel_error_fails_only_its_operation() {
        let table = KernelTable::new()
            .with(PimOp::Add, failing_kernel)
            .with(PimOp::Sub, failing_kernel)
            .with(PimOp::Xor, int::xor);
        let ops = BitSerialOps::for_family(DeviceFamily::BitSimdV).with_table(NumericKind::Signed, table);
        let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
        let mut engine = DifferentialEngine::new(&mut device, &ops, 8).unwrap();

        let run = engine.run_with_operands(&operands_i8()).unwrap();
        assert!(matches!(
            run.outcome(PimOp::Add).unwrap().status,
            TestStatus::KernelError { .. }
        ));
        assert!(matches!(
            run.outcome(PimOp::Sub).unwrap().status,
            TestStatus::KernelError { .. }
        ));
        assert_eq!(run.outcome(PimOp::Xor).unwrap().status, TestStatus::Passed);
        assert_eq!(run.backend_failures(), 0);
        assert_eq!(device.live_objects(), 0);
    }

    #[test]
    fn test_backend_failure_is_recorded() {
        // too few rows for six 8-bit objects
        let config = pim_backends::DeviceConfig::new(1, 40, 64);
        let mut device = FunctionalDevice::with_config(DeviceFamily::BitSimdV, config).unwrap();
        let ops = BitSerialOps::for_family(DeviceFamily::BitSimdV);
        let mut engine = DifferentialEngine::new(&mut device, &ops, 8).unwrap();

        let run = engine.run_with_operands(&operands_i8()).unwrap();
        assert_eq!(run.backend_failures(), 15);
        assert!(matches!(
            &run.outcomes[0].status,
            TestStatus::BackendFailure { call: "allocate_associated", .. }
        ));
        assert_eq!(device.live_objects(), 0);
    }

    #[test]
    fn test_rejects_family_mismatch_and_tiny_population() {
        let mut device = FunctionalDevice::new(DeviceFamily::Simdram);
        let ops = BitSerialOps::for_family(DeviceFamily::BitSimdV);
        assert!(DifferentialEngine::new(&mut device, &ops, 8).is_err());

        let ops = BitSerialOps::for_family(DeviceFamily::Simdram);
        assert!(matches!(
            DifferentialEngine::new(&mut device, &ops, 1),
            Err(HarnessError::Configuration(_))
        ));
    }
}
