//! Max pooling on the simulated device
//!
//! ```bash
//! max-pool -r 224 -c 224 -d 64 -s 2 -l 2 -w 2 --verify
//! ```

use clap::Parser;
use pim_apps::{max_pool, max_pool_cpu, mismatches, open_device, AppError, PoolParams, Volume};
use pim_backends::{Device, DeviceFamily};
use pim_tracing::{init_global_tracing, TracingConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::process::ExitCode;

/// Max-pool a stack of random Int32 matrices on a PIM device
#[derive(Parser, Debug)]
#[command(name = "max-pool")]
#[command(version)]
struct Args {
    /// Input rows
    #[arg(short = 'r', long, default_value_t = 224)]
    rows: usize,

    /// Input columns
    #[arg(short = 'c', long, default_value_t = 224)]
    columns: usize,

    /// Number of stacked matrices
    #[arg(short = 'd', long, default_value_t = 64)]
    depth: usize,

    /// Window stride
    #[arg(short = 's', long, default_value_t = 2)]
    stride: usize,

    /// Kernel height
    #[arg(short = 'l', long, default_value_t = 2)]
    kernel_height: usize,

    /// Kernel width
    #[arg(short = 'w', long, default_value_t = 2)]
    kernel_width: usize,

    /// Compare against max pooling on the host
    #[arg(short = 'v', long)]
    verify: bool,

    /// Seed for the random input
    #[arg(long)]
    seed: Option<u64>,

    /// Device family
    #[arg(long, default_value = "bitsimd-v")]
    device: DeviceFamily,

    /// JSON device configuration
    #[arg(short = 'f', long, value_name = "FILE")]
    device_config: Option<PathBuf>,
}

fn run(args: &Args) -> Result<bool, AppError> {
    let params = PoolParams {
        kernel_height: args.kernel_height,
        kernel_width: args.kernel_width,
        stride: args.stride,
    };
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let input = Volume::random(args.depth, args.rows, args.columns, 1000, &mut rng)?;

    let mut device = open_device(args.device, args.device_config.as_deref())?;
    let output = max_pool(&mut device, &input, &params)?;
    println!(
        "Pooled {}x{}x{} into {}x{}x{}",
        input.depth(),
        input.rows(),
        input.cols(),
        output.depth(),
        output.rows(),
        output.cols()
    );

    let mut ok = true;
    if args.verify {
        let wrong = mismatches(&output, &max_pool_cpu(&input, &params)?)?;
        for (d, r, c) in wrong.iter().take(10) {
            println!("Mismatch at depth {d}, row {r}, column {c}");
        }
        if wrong.is_empty() {
            println!("Success: PIM results match with CPU results");
        } else {
            println!("Failure: {} PIM results do not match with CPU results", wrong.len());
            ok = false;
        }
    }
    device.show_stats();
    Ok(ok)
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = init_global_tracing(&TracingConfig::from_env_or(TracingConfig::for_local())) {
        eprintln!("warning: tracing disabled: {err}");
    }

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Abort: {err}");
            ExitCode::FAILURE
        }
    }
}
