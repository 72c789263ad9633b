use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::info;
use memprobe_bin::{init_logging, parse_number, parse_phys_addr, run_probe};
use memprobe_core::memory::PhysAddr;
use memprobe_fixed_addr::{FixedAddrConfig, FixedAddrProbe, TEST_VALUE};

/// CLI arguments for the `shm_rw_fixed_addr` binary.
///
/// Every argument is optional; the defaults probe one page at 2 GiB through
/// `/dev/mem`, falling back to `/tmp/fixed_addr_mem`.
#[derive(Debug, Parser)]
#[command(about = "Verify read/write consistency at a fixed physical address")]
struct CliArgs {
    /// Physical address to probe (hex with 0x prefix or decimal).
    #[clap(long = "phys-addr", default_value = "0x80000000", value_parser = parse_phys_addr)]
    phys_addr: PhysAddr,
    /// Number of bytes to map (hex with 0x prefix or decimal).
    #[clap(long = "size", default_value = "4096", value_parser = parse_number)]
    size: usize,
    /// Privileged physical-memory device.
    #[clap(long = "device", default_value = "/dev/mem")]
    device: PathBuf,
    /// File used to simulate physical memory when the device is unusable.
    #[clap(long = "fallback", default_value = "/tmp/fixed_addr_mem")]
    fallback: PathBuf,
    /// Output file for the report (JSON format).
    #[clap(long = "output")]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    init_logging();

    let args = CliArgs::parse();
    info!("CLI args: {:?}", args);

    let mut probe = FixedAddrProbe::new(FixedAddrConfig {
        phys_addr: args.phys_addr,
        size: args.size,
        device: args.device,
        fallback: args.fallback,
        test_value: TEST_VALUE,
    });
    run_probe(&mut probe, args.output.as_deref())
}
