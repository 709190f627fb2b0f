//! Runs the differential engine over device families and numeric categories

use crate::category::NumericCategory;
use crate::config::HarnessConfig;
use crate::engine::{CategoryRun, DifferentialEngine};
use crate::error::{HarnessError, Result};
use crate::generator::OperandGenerator;
use crate::ops::BitSerialOps;
use crate::report::HarnessReport;
use pim_backends::{DeviceFamily, FunctionalDevice};
use tracing::{error, info, info_span, warn};

/// Test cases that may fail on the device before a family is abandoned
pub const MAX_BACKEND_FAILURES: usize = 2;

/// Spreads the base seed across categories
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Seed of `category` under base seed `seed`, independent of which other
/// categories are selected
fn category_seed(seed: u64, category: NumericCategory) -> u64 {
    seed.wrapping_add((category as u64).wrapping_mul(SEED_STRIDE))
}

/// Drives one [`DifferentialEngine`] run per (family, category) pair
pub struct TestOrchestrator {
    config: HarnessConfig,
}

impl TestOrchestrator {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run `categories` on every family in `families`
    ///
    /// An empty list selects everything. Category failures are recorded in
    /// the report and never stop the remaining categories.
    pub fn run_all(&self, families: &[DeviceFamily], categories: &[NumericCategory]) -> HarnessReport {
        let families = if families.is_empty() { &DeviceFamily::ALL[..] } else { families };
        let categories = if categories.is_empty() {
            &NumericCategory::ALL[..]
        } else {
            categories
        };

        let mut report = HarnessReport::new();
        for &family in families {
            self.run_family(family, categories, &mut report);
        }
        info!(
            passed = report.passed(),
            total = report.total(),
            errors = report.errors.len(),
            "harness run complete"
        );
        report
    }

    /// Like [`run_all`](Self::run_all), but with names as typed on the command line
    ///
    /// Unknown names are recorded as errors and skipped.
    pub fn run_named<D, T>(&self, device_names: &[D], test_names: &[T]) -> HarnessReport
    where
        D: AsRef<str>,
        T: AsRef<str>,
    {
        let mut errors = Vec::new();
        let families = parse_names::<DeviceFamily>(device_names, &mut errors);
        let categories = parse_names::<NumericCategory>(test_names, &mut errors);

        // every name rejected: run nothing rather than everything
        let nothing_left = (!device_names.is_empty() && families.is_empty())
            || (!test_names.is_empty() && categories.is_empty());
        let mut report = if nothing_left {
            HarnessReport::new()
        } else {
            self.run_all(&families, &categories)
        };

        for message in errors {
            report.record_error(None, None, message);
        }
        report
    }

    fn run_family(&self, family: DeviceFamily, categories: &[NumericCategory], report: &mut HarnessReport) {
        let _span = info_span!("family", %family).entered();

        let mut device = match FunctionalDevice::with_config(family, self.config.device) {
            Ok(device) => device,
            Err(err) => {
                error!(error = %err, "device setup failed");
                report.record_error(Some(family), None, format!("device setup failed: {err}"));
                return;
            }
        };
        let ops = BitSerialOps::for_family(family);
        info!(device = %self.config.device, "running {} categories", categories.len());

        let mut backend_failures = 0;
        for &category in categories {
            if backend_failures >= MAX_BACKEND_FAILURES {
                warn!(%category, "skipped after repeated device failures");
                report.record_error(
                    Some(family),
                    Some(category),
                    "skipped after repeated device failures",
                );
                continue;
            }

            let mut gen = match self.config.seed {
                Some(seed) => OperandGenerator::seeded(category_seed(seed, category)),
                None => OperandGenerator::new(),
            };

            match self.run_category(&mut device, &ops, category, &mut gen) {
                Ok(run) => {
                    backend_failures += run.backend_failures();
                    report.record(run);
                }
                Err(err) => {
                    if err.is_backend() {
                        backend_failures += 1;
                    }
                    error!(%category, error = %err, "category skipped");
                    report.record_error(Some(family), Some(category), err.to_string());
                }
            }
        }
    }

    fn run_category(
        &self,
        device: &mut FunctionalDevice,
        ops: &BitSerialOps,
        category: NumericCategory,
        gen: &mut OperandGenerator,
    ) -> Result<CategoryRun> {
        let _span = info_span!("category", %category).entered();
        let mut engine = DifferentialEngine::new(device, ops, self.config.num_elements)?;
        match category {
            NumericCategory::Int8 => engine.run_category::<i8>(gen),
            NumericCategory::Int16 => engine.run_category::<i16>(gen),
            NumericCategory::Int32 => engine.run_category::<i32>(gen),
            NumericCategory::Int64 => engine.run_category::<i64>(gen),
            NumericCategory::UInt8 => engine.run_category::<u8>(gen),
            NumericCategory::UInt16 => engine.run_category::<u16>(gen),
            NumericCategory::UInt32 => engine.run_category::<u32>(gen),
            NumericCategory::UInt64 => engine.run_category::<u64>(gen),
            NumericCategory::Fp32 => engine.run_category::<f32>(gen),
        }
    }
}

fn parse_names<P>(names: &[impl AsRef<str>], errors: &mut Vec<String>) -> Vec<P>
where
    P: std::str::FromStr<Err = String>,
{
    names
        .iter()
        .filter_map(|name| match name.as_ref().parse::<P>() {
            Ok(parsed) => Some(parsed),
            Err(msg) => {
                let err = HarnessError::config(msg);
                warn!(error = %err, "ignoring name");
                errors.push(err.to_string());
                None
            }
        })
        .collect()
}
