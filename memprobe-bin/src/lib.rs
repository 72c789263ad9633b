//! # Memprobe
//!
//! Command line front ends for the memprobe diagnostics. Two binaries are built:
//!
//! - `shm_rw`: maps a temporary file shared and verifies a pattern round trip.
//! - `shm_rw_fixed_addr`: maps a fixed physical address through `/dev/mem`, falling
//!   back to a file-backed simulation, and verifies read/write consistency.
//!
//! Both run without arguments using the built-in defaults, print their
//! diagnostics to stdout and exit with 0 only if every comparison matched.
//! Set `RUST_LOG` to change the log level.

#[macro_use]
extern crate log;

use std::path::Path;
use std::process::ExitCode;

use memprobe_core::memory::PhysAddr;
use memprobe_core::probe::{Probe, ProbeError};

/// Initializes `env_logger` at `info` level, writing to stdout.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();
}

/// Parses a number given in hex (`0x` prefix) or decimal.
pub fn parse_number(s: &str) -> Result<usize, String> {
    let s = s.trim().replace('_', "");
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse::<usize>(),
    };
    parsed.map_err(|e| format!("invalid number {:?}: {}", s, e))
}

/// Parses a physical address given in hex (`0x` prefix) or decimal.
pub fn parse_phys_addr(s: &str) -> Result<PhysAddr, String> {
    parse_number(s).map(PhysAddr::new)
}

/// Runs a probe, optionally saves its report and maps the result to an exit code.
///
/// Setup errors are logged with their OS error text and yield a failing exit
/// code. With `output` set, the report (or the error) is written as JSON.
pub fn run_probe(probe: &mut dyn Probe, output: Option<&Path>) -> ExitCode {
    let name = probe.name();
    match probe.run() {
        Ok(report) => {
            if let Some(output) = output {
                if let Err(e) = report.save_to_file(output) {
                    error!(target: name, "Failed to save report to {:?}: {}", output, e);
                    return ExitCode::FAILURE;
                }
            }
            report.exit_code()
        }
        Err(e) => {
            error!(target: name, "ERROR: {}", e);
            if let Some(output) = output {
                if let Err(e) = save_error(output, name, &e) {
                    error!(target: name, "Failed to save error to {:?}: {}", output, e);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn save_error(output: &Path, probe: &str, error: &ProbeError) -> anyhow::Result<()> {
    let value = serde_json::json!({
        "probe": probe,
        "passed": false,
        "error": error,
    });
    std::fs::write(output, serde_json::to_string_pretty(&value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_number, parse_phys_addr};

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("4096"), Ok(4096));
        assert_eq!(parse_number("0x1000"), Ok(4096));
        assert_eq!(parse_number("0X8000_0000"), Ok(0x8000_0000));
        assert!(parse_number("0xZZ").is_err());
        assert!(parse_number("").is_err());
    }

    #[test]
    fn test_parse_phys_addr() {
        assert_eq!(
            parse_phys_addr("0x80000000").map(|a| a.as_usize()),
            Ok(0x8000_0000)
        );
    }
}
