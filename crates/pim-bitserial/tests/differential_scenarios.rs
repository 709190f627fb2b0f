//! End-to-end scenarios for the differential harness
//!
//! Every test drives the functional simulator through the public API: the
//! orchestrator for whole runs, the engine directly where the operands or
//! the operation set need to be fixed.

use pim_backends::{DataType, Device, DeviceConfig, DeviceExt, DeviceFamily, FunctionalDevice, Operands, PimOp};
use pim_bitserial::generator::{equality_indices, seed_equal};
use pim_bitserial::{
    BitSerialOps, DifferentialEngine, HarnessConfig, HostOperands, NumericCategory, NumericKind, OperandGenerator,
    TestOrchestrator, TestStatus,
};

fn small_config() -> HarnessConfig {
    HarnessConfig::default()
        .with_num_elements(128)
        .with_seed(2024)
        .with_device(DeviceConfig::new(4, 2048, 128))
}

#[test]
fn test_int32_with_fixed_first_operand() -> pim_bitserial::Result<()> {
    pim_tracing::init_test_tracing();

    let n = 4000;
    let mut gen = OperandGenerator::seeded(17);
    let mut host = HostOperands::<i32>::generate(&mut gen, n)?;
    host.src1 = (0..n as i32).map(|i| i - 2000).collect();
    host.src2 = gen.generate(n, -100_000, 100_000, false)?;
    seed_equal(&host.src1, &mut host.src2, &equality_indices(n)?)?;
    assert_eq!(host.src2[100], -1900);
    assert_eq!(host.src2[3000], 1000);

    let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
    let ops = BitSerialOps::for_family(DeviceFamily::BitSimdV);
    let mut engine = DifferentialEngine::new(&mut device, &ops, n)?;
    let run = engine.run_with_operands(&host)?;

    assert_eq!(run.outcome(PimOp::Add).map(|o| &o.status), Some(&TestStatus::Passed));
    assert_eq!(run.outcome(PimOp::Eq).map(|o| &o.status), Some(&TestStatus::Passed));
    assert_eq!((run.passed(), run.total()), (15, 15));
    assert_eq!(device.live_objects(), 0);
    Ok(())
}

#[test]
fn test_forced_equalities_reach_the_device() -> pim_backends::Result<()> {
    let n = 4000;
    let src1: Vec<i32> = (0..n as i32).map(|i| i - 2000).collect();
    let mut src2 = vec![i32::MAX; n];
    seed_equal(&src1, &mut src2, &[100, 3000]).expect("indices in range");

    let mut device = FunctionalDevice::new(DeviceFamily::Simdram);
    let a = device.allocate(n as u64, 32, DataType::Int32)?;
    let b = device.allocate_associated(32, a, DataType::Int32)?;
    let eq = device.allocate_associated(32, a, DataType::Int32)?;
    device.copy_to_device(&src1, a)?;
    device.copy_to_device(&src2, b)?;
    device.execute(PimOp::Eq, Operands::binary(a, b, eq))?;

    let mut out = vec![0i32; n];
    device.copy_from_device(eq, &mut out)?;
    let hits: Vec<usize> = out.iter().enumerate().filter(|(_, v)| **v == 1).map(|(i, _)| i).collect();
    assert_eq!(hits, vec![100, 3000]);

    device.free(eq)?;
    device.free(b)?;
    device.free(a)
}

#[test]
fn test_uint8_division_never_sees_zero() -> pim_bitserial::Result<()> {
    let mut gen = OperandGenerator::seeded(3);
    let host = HostOperands::<u8>::generate(&mut gen, 4000)?;
    assert!(host.src_non_zero.iter().all(|v| *v != 0));

    let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
    let ops = BitSerialOps::for_family(DeviceFamily::BitSimdV);
    let run = DifferentialEngine::new(&mut device, &ops, 4000)?.run_with_operands(&host)?;
    assert_eq!(run.outcome(PimOp::Div).map(|o| &o.status), Some(&TestStatus::Passed));
    Ok(())
}

#[test]
fn test_unimplemented_operation_only_affects_its_category() -> pim_bitserial::Result<()> {
    let ops = BitSerialOps::for_family(DeviceFamily::BitSimdV).without(NumericKind::Signed, PimOp::Min);
    let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
    let mut engine = DifferentialEngine::new(&mut device, &ops, 256)?;
    let mut gen = OperandGenerator::seeded(99);

    let signed = engine.run_category::<i16>(&mut gen)?;
    assert_eq!((signed.passed(), signed.total()), (14, 15));
    assert_eq!(
        signed.outcome(PimOp::Min).map(|o| &o.status),
        Some(&TestStatus::Unimplemented)
    );

    let unsigned = engine.run_category::<u16>(&mut gen)?;
    assert_eq!((unsigned.passed(), unsigned.total()), (15, 15));
    Ok(())
}

#[test]
fn test_full_run_per_family() {
    pim_tracing::init_test_tracing();

    let report = TestOrchestrator::new(small_config()).run_all(&[], &[]);
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(report.stats.len(), 18);

    for category in NumericCategory::ALL {
        let bitsimd = report.stats(DeviceFamily::BitSimdV, category).expect("bitsimd-v ran");
        assert!(bitsimd.all_passed(), "bitsimd-v {category}: {bitsimd:?}");

        let simdram = report.stats(DeviceFamily::Simdram, category).expect("simdram ran");
        let expected = match category {
            NumericCategory::Fp32 => (0, 4),
            _ => (13, 15),
        };
        assert_eq!((simdram.passed, simdram.total), expected, "simdram {category}");
    }

    assert_eq!(report.total(), 2 * (8 * 15 + 4));
    assert!(!report.all_passed());
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let run = || {
        TestOrchestrator::new(small_config())
            .run_all(&[DeviceFamily::Simdram], &[NumericCategory::Int64])
            .to_json()
            .expect("report serializes")
    };
    assert_eq!(run(), run());
}

#[test]
fn test_unknown_names_are_reported() {
    let report = TestOrchestrator::new(small_config()).run_named(&["simdram"], &["uint8", "complex64"]);
    assert_eq!(report.stats.len(), 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].message.contains("complex64"));
    assert!(!report.all_passed());
}
