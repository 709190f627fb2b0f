//! Int32 vector addition on the simulated device
//!
//! ```bash
//! vec-add --elements 4096 --device simdram
//! ```

use clap::Parser;
use pim_apps::{demo_operands, open_device, vector_add};
use pim_backends::{Device, DeviceFamily};
use pim_tracing::{init_global_tracing, TracingConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// Add two Int32 vectors on a PIM device and check the result on the host
#[derive(Parser, Debug)]
#[command(name = "vec-add")]
#[command(version)]
struct Args {
    /// Number of elements
    #[arg(short = 'n', long, default_value_t = 512)]
    elements: usize,

    /// Device family
    #[arg(short, long, default_value = "bitsimd-v")]
    device: DeviceFamily,

    /// JSON device configuration
    #[arg(short = 'f', long, value_name = "FILE")]
    device_config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = init_global_tracing(&TracingConfig::from_env_or(TracingConfig::for_local())) {
        eprintln!("warning: tracing disabled: {err}");
    }

    let (a, b) = demo_operands(args.elements);
    let result = open_device(args.device, args.device_config.as_deref())
        .and_then(|mut device| Ok((vector_add(&mut device, &a, &b)?, device)));
    let (sum, device) = match result {
        Ok(out) => out,
        Err(err) => {
            eprintln!("Abort: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut wrong = 0;
    for ((x, y), got) in a.iter().zip(&b).zip(&sum) {
        let want = x.wrapping_add(*y);
        if *got != want {
            println!("Wrong answer: {x} + {y} = {got} (expected {want})");
            wrong += 1;
        }
    }
    device.show_stats();

    if wrong == 0 {
        println!("All correct!");
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
