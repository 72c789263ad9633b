use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::info;
use memprobe_bin::{init_logging, parse_number, run_probe};
use memprobe_shm::{ShmConfig, ShmProbe};

/// CLI arguments for the `shm_rw` binary.
///
/// Every argument is optional; the defaults reproduce the classic check of a
/// 1 KB region backed by `/tmp/simbricks_shm_test`.
#[derive(Debug, Parser)]
#[command(about = "Verify a pattern round trip through a file-backed shared mapping")]
struct CliArgs {
    /// Backing file, created for the run and removed afterwards.
    #[clap(long = "path", default_value = "/tmp/simbricks_shm_test")]
    path: PathBuf,
    /// Size of the region in bytes (hex with 0x prefix or decimal).
    #[clap(long = "size", default_value = "1024", value_parser = parse_number)]
    size: usize,
    /// Output file for the report (JSON format).
    #[clap(long = "output")]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    init_logging();

    let args = CliArgs::parse();
    info!("CLI args: {:?}", args);

    let mut probe = ShmProbe::new(ShmConfig {
        path: args.path,
        size: args.size,
    });
    run_probe(&mut probe, args.output.as_deref())
}
