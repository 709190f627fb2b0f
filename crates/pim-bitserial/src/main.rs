//! Bit-serial verification harness
//!
//! ```bash
//! # every family, every category
//! pim-bitserial
//!
//! # one family, two categories, reproducible operands
//! pim-bitserial --device simdram --test int8 --test uint32 --seed 7
//!
//! # machine-readable report
//! pim-bitserial --json > report.json
//! ```
//!
//! Exits with status 0 when every test passed and 1 otherwise.

use clap::Parser;
use pim_bitserial::{HarnessConfig, HarnessError, TestOrchestrator};
use pim_tracing::{init_global_tracing, TracingConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// Differential testing of bit-serial microcode against native device operations
#[derive(Parser, Debug)]
#[command(name = "pim-bitserial")]
#[command(version)]
struct Args {
    /// Device family to test (bitsimd-v, simdram); repeatable, default all
    #[arg(short, long = "device", value_name = "NAME")]
    devices: Vec<String>,

    /// Numeric category to test (int8..int64, uint8..uint64, fp32); repeatable, default all
    #[arg(short, long = "test", value_name = "CATEGORY")]
    tests: Vec<String>,

    /// Elements per operand vector
    #[arg(short, long)]
    elements: Option<usize>,

    /// Base seed for operand generation
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON device configuration
    #[arg(long, value_name = "FILE")]
    device_config: Option<PathBuf>,

    /// Print the report as JSON instead of a table
    #[arg(long)]
    json: bool,
}

impl Args {
    fn harness_config(&self) -> Result<HarnessConfig, HarnessError> {
        let mut config = HarnessConfig::from_env()?;
        if let Some(elements) = self.elements {
            config = config.with_num_elements(elements);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(path) = &self.device_config {
            config = config.with_device_file(path)?;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(err) = init_global_tracing(&TracingConfig::from_env_or(TracingConfig::for_local())) {
        eprintln!("warning: tracing disabled: {err}");
    }

    let config = match args.harness_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        elements = config.num_elements,
        seed = ?config.seed,
        device = %config.device,
        "starting harness"
    );

    let report = TestOrchestrator::new(config).run_named(&args.devices, &args.tests);

    if args.json {
        match report.to_json() {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("error: failed to serialize report: {err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{report}");
    }

    if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
