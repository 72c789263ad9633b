use std::path::PathBuf;

use log::{info, warn};
use memprobe_core::memory::{MappedRegion, PatternFill, PhysAddr, WordPointer};
use memprobe_core::probe::{Probe, ProbeError};
use memprobe_core::report::ProbeReport;
use memprobe_core::util::{Size, WORD_SIZE};
use serde::Serialize;

const TAG: &str = "shm_rw_syscall";

/// Configuration of a [`ShmProbe`].
#[derive(Clone, Debug, Serialize)]
pub struct ShmConfig {
    /// Backing file, created for the run and removed afterwards
    pub path: PathBuf,
    /// Size of the region in bytes
    pub size: usize,
}

impl Default for ShmConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/tmp/simbricks_shm_test"),
            size: Size::KB(1).bytes(),
        }
    }
}

/// Probe that maps a temporary file shared and checks a pattern round trip.
pub struct ShmProbe {
    config: ShmConfig,
}

impl ShmProbe {
    /// Creates a new shared memory probe.
    pub fn new(config: ShmConfig) -> Self {
        Self { config }
    }

    fn validate(&self) -> Result<(), ProbeError> {
        let size = self.config.size;
        if size == 0 || !size.is_multiple_of(WORD_SIZE) {
            return Err(ProbeError::InvalidConfig(format!(
                "region size {} is not a non-zero multiple of {}",
                size, WORD_SIZE
            )));
        }
        Ok(())
    }
}

impl Default for ShmProbe {
    fn default() -> Self {
        Self::new(ShmConfig::default())
    }
}

impl Probe for ShmProbe {
    fn name(&self) -> &'static str {
        TAG
    }

    fn run(&mut self) -> Result<ProbeReport, ProbeError> {
        self.validate()?;
        info!(target: TAG, "Creating shared memory region using file-based approach...");
        let region = MappedRegion::temp_file(&self.config.path, PhysAddr::new(0), self.config.size)
            .inspect_err(|e| warn!(target: TAG, "ERROR: Failed to create shared memory region: {}", e))?;
        info!(
            target: TAG,
            "Successfully mapped shared memory to virtual address {:p}",
            region.ptr()
        );

        info!(target: TAG, "Initializing memory with test pattern...");
        region.zero();

        info!(target: TAG, "Writing test pattern...");
        region.fill_pattern();

        info!(target: TAG, "Reading back and verifying...");
        let mut report = ProbeReport::new(TAG, &region).with_data(self.serialize());
        report.extend(region.verify_pattern());

        if report.passed() {
            info!(target: TAG, "PASS: all {} bytes match", region.len());
        } else {
            warn!(target: TAG, "FAIL: data mismatch");
        }
        Ok(report)
    }

    fn serialize(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.config).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::{ShmConfig, ShmProbe};
    use memprobe_core::memory::pattern_word;
    use memprobe_core::probe::{Probe, ProbeError};
    use std::path::PathBuf;

    fn config(name: &str, size: usize) -> ShmConfig {
        ShmConfig {
            path: std::env::temp_dir()
                .join(format!("memprobe-shm-{}-{}", name, std::process::id())),
            size,
        }
    }

    #[test]
    fn test_default_config() {
        let config = ShmConfig::default();
        assert_eq!(config.path, PathBuf::from("/tmp/simbricks_shm_test"));
        assert_eq!(config.size, 1024);
    }

    #[test]
    fn test_pattern_round_trip() -> anyhow::Result<()> {
        let config = config("roundtrip", 1024);
        let path = config.path.clone();
        let report = ShmProbe::new(config).run()?;
        assert!(report.passed());
        assert_eq!(report.checks().len(), 128);
        for (i, check) in report.checks().iter().enumerate() {
            assert_eq!(check.slot, i);
            assert_eq!(check.actual, pattern_word(i));
        }
        assert!(!path.exists(), "backing file must be removed");
        Ok(())
    }

    #[test]
    fn test_existing_file_is_reused() -> anyhow::Result<()> {
        let config = config("existing", 256);
        std::fs::write(&config.path, vec![0xAAu8; 4096])?;
        let path = config.path.clone();
        let report = ShmProbe::new(config).run()?;
        assert!(report.passed());
        assert_eq!(report.checks().len(), 32);
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_invalid_size() {
        for size in [0, 12] {
            let config = config("invalid", size);
            let path = config.path.clone();
            let err = ShmProbe::new(config).run().err();
            assert!(matches!(err, Some(ProbeError::InvalidConfig(_))));
            assert!(!path.exists());
        }
    }

    #[test]
    fn test_unwritable_path() {
        let config = ShmConfig {
            path: PathBuf::from("/nonexistent-dir/memprobe-shm"),
            size: 1024,
        };
        let err = ShmProbe::new(config).run().err();
        assert!(matches!(err, Some(ProbeError::Region(_))));
    }
}
