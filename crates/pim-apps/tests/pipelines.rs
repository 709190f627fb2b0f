//! End-to-end application runs on both device families

use pim_apps::{demo_operands, max_pool, max_pool_cpu, mismatches, open_device, vector_add, PoolParams, Volume};
use pim_backends::{Device, DeviceConfig, DeviceFamily, FunctionalDevice};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;

#[test]
fn vector_add_on_every_family() {
    let (a, b) = demo_operands(1000);
    for family in DeviceFamily::ALL {
        let mut device = FunctionalDevice::new(family);
        let sum = vector_add(&mut device, &a, &b).unwrap();
        let expected: Vec<i32> = a.iter().zip(&b).map(|(x, y)| x.wrapping_add(*y)).collect();
        assert_eq!(sum, expected, "{family}");
        assert!(!device.stats().is_empty());
    }
}

#[test]
fn max_pool_matches_host_reference() {
    let mut rng = StdRng::seed_from_u64(11);
    let input = Volume::random(4, 12, 10, 1000, &mut rng).unwrap();
    let params = PoolParams {
        kernel_height: 3,
        kernel_width: 3,
        stride: 3,
    };
    let cpu = max_pool_cpu(&input, &params).unwrap();
    for family in DeviceFamily::ALL {
        let mut device = FunctionalDevice::new(family);
        let pim = max_pool(&mut device, &input, &params).unwrap();
        assert!(mismatches(&pim, &cpu).unwrap().is_empty(), "{family}");
        assert_eq!(device.live_objects(), 0);
    }
}

#[test]
fn max_pool_rejects_slices_wider_than_device() {
    let mut device = FunctionalDevice::with_config(DeviceFamily::BitSimdV, DeviceConfig::new(1, 128, 2)).unwrap();
    let input = Volume::new(1, 4, 4, vec![0; 16]).unwrap();
    assert!(max_pool(&mut device, &input, &PoolParams::default()).is_err());
}

#[test]
fn open_device_reads_geometry_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let config = DeviceConfig::new(2, 256, 128);
    write!(file, "{}", serde_json::to_string(&config).unwrap()).unwrap();

    let device = open_device(DeviceFamily::Simdram, Some(file.path())).unwrap();
    assert_eq!(device.config(), config);
    assert_eq!(device.family(), DeviceFamily::Simdram);
    assert!(open_device(DeviceFamily::Simdram, Some(std::path::Path::new("/nonexistent/device.json"))).is_err());
}
