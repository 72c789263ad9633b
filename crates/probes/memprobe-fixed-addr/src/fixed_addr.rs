use std::path::PathBuf;

use log::{info, warn};
use memprobe_core::memory::{
    MappedRegion, PhysAddr, RegionError, WordPointer, mem_fence, pattern_word,
};
use memprobe_core::probe::{Probe, ProbeError};
use memprobe_core::report::{CheckOutcome, ProbeReport};
use memprobe_core::util::{PAGE_SIZE, Size, WORD_SIZE};
use serde::Serialize;

const TAG: &str = "shm_rw_fixed_addr";

/// Value written to slot 0 in the first check.
pub const TEST_VALUE: u64 = 0xDEAD_BEEF_CAFE_BABE;

/// Number of consecutive slots written with pattern words.
pub const TEST_SLOTS: usize = 4;

/// Configuration of a [`FixedAddrProbe`].
#[derive(Clone, Debug, Serialize)]
pub struct FixedAddrConfig {
    /// Physical address to probe. Also the offset into the fallback file.
    pub phys_addr: PhysAddr,
    /// Number of bytes to map starting at `phys_addr`
    pub size: usize,
    /// Privileged physical-memory device
    pub device: PathBuf,
    /// File used when the device cannot be used
    pub fallback: PathBuf,
    /// Value written to slot 0
    pub test_value: u64,
}

impl Default for FixedAddrConfig {
    fn default() -> Self {
        Self {
            // 2 GiB, above the guest's main memory
            phys_addr: PhysAddr::new(Size::GB(2).bytes()),
            size: PAGE_SIZE,
            device: PathBuf::from("/dev/mem"),
            fallback: PathBuf::from("/tmp/fixed_addr_mem"),
            test_value: TEST_VALUE,
        }
    }
}

/// Probe that checks read/write consistency at a fixed physical address.
pub struct FixedAddrProbe {
    config: FixedAddrConfig,
}

impl FixedAddrProbe {
    /// Creates a new fixed address probe.
    pub fn new(config: FixedAddrConfig) -> Self {
        Self { config }
    }

    fn validate(&self) -> Result<(), ProbeError> {
        let FixedAddrConfig {
            phys_addr, size, ..
        } = &self.config;
        if *size < TEST_SLOTS * WORD_SIZE || !size.is_multiple_of(WORD_SIZE) {
            return Err(ProbeError::InvalidConfig(format!(
                "mapping size {} must be a multiple of {} and hold at least {} slots",
                size, WORD_SIZE, TEST_SLOTS
            )));
        }
        if !phys_addr.as_usize().is_multiple_of(WORD_SIZE) {
            return Err(ProbeError::InvalidConfig(format!(
                "physical address 0x{:X} is not {}-byte aligned",
                phys_addr, WORD_SIZE
            )));
        }
        Ok(())
    }

    /// Maps the target through the device, or through the fallback file if
    /// the device path fails at any step.
    fn map(&self) -> Result<MappedRegion, ProbeError> {
        let FixedAddrConfig {
            phys_addr,
            size,
            device,
            fallback,
            ..
        } = &self.config;

        let opened = || {
            info!(
                target: TAG,
                "{:?} opened successfully, attempting direct mapping", device
            )
        };
        match MappedRegion::open_device(device, *phys_addr, *size) {
            Ok(region) => {
                opened();
                info!(
                    target: TAG,
                    "Successfully mapped {:?} at aligned address 0x{:X}",
                    device,
                    phys_addr.as_usize() - region.page_offset()
                );
                return Ok(region);
            }
            Err(RegionError::Open { source, .. }) => {
                info!(
                    target: TAG,
                    "{:?} not available ({}), using file-based approach", device, source
                );
            }
            Err(e) => {
                opened();
                info!(
                    target: TAG,
                    "{:?} mapping failed: {}, falling back to file-based approach", device, e
                );
            }
        }

        info!(target: TAG, "Using file-based approach");
        MappedRegion::temp_file(fallback, *phys_addr, *size)
            .inspect_err(|e| warn!(target: TAG, "Failed to map {:?}: {}", fallback, e))
            .map_err(Into::into)
    }
}

impl Default for FixedAddrProbe {
    fn default() -> Self {
        Self::new(FixedAddrConfig::default())
    }
}

impl Probe for FixedAddrProbe {
    fn name(&self) -> &'static str {
        TAG
    }

    fn run(&mut self) -> Result<ProbeReport, ProbeError> {
        self.validate()?;
        let phys_addr = self.config.phys_addr;
        let test_value = self.config.test_value;
        info!(target: TAG, "Accessing fixed physical address 0x{:X}", phys_addr);

        let region = self.map()?;
        info!(
            target: TAG,
            "Successfully mapped address 0x{:X} to virtual address {:p}",
            phys_addr,
            region.ptr()
        );
        let mut report = ProbeReport::new(TAG, &region).with_data(self.serialize());

        info!(target: TAG, "Running simple test...");
        mem_fence();
        let original = region.read_word(0);
        info!(
            target: TAG,
            "Original value at 0x{:X}: 0x{:016X}", phys_addr, original
        );

        info!(target: TAG, "Writing test value 0x{:016X}", test_value);
        mem_fence();
        region.write_word(0, test_value);
        mem_fence();

        mem_fence();
        let read = region.read_word(0);
        info!(target: TAG, "Read back value: 0x{:016X}", read);
        let outcome = CheckOutcome::new("test_value", 0, test_value, read);
        if outcome.passed() {
            info!(target: TAG, "PASS: Read back matches written value");
        } else {
            warn!(target: TAG, "FAIL: Read back does not match written value");
        }
        report.push(outcome);

        info!(target: TAG, "Testing multiple memory locations...");
        let mut all_matched = true;
        for slot in 0..TEST_SLOTS {
            let value = pattern_word(slot);
            region.write_word(slot, value);
            mem_fence();

            mem_fence();
            let read = region.read_word(slot);
            info!(
                target: TAG,
                "Location [{}]: wrote 0x{:016X}, read 0x{:016X}", slot, value, read
            );
            let outcome = CheckOutcome::new("locations", slot, value, read);
            if !outcome.passed() {
                warn!(target: TAG, "FAIL at offset {}: mismatch detected", slot);
                all_matched = false;
            }
            report.push(outcome);
        }
        if all_matched {
            info!(target: TAG, "PASS: All test locations match");
        } else {
            warn!(target: TAG, "FAIL: Some locations had mismatches");
        }

        info!(target: TAG, "Restoring original value");
        mem_fence();
        region.write_word(0, original);
        mem_fence();
        let restored = region.read_word(0);
        report.push(CheckOutcome::new("restore", 0, original, restored));

        drop(region);
        if report.passed() {
            info!(target: TAG, "Test completed successfully");
        } else {
            warn!(
                target: TAG,
                "Test completed with {} failed checks",
                report.failed()
            );
        }
        Ok(report)
    }

    fn serialize(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.config).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::{FixedAddrConfig, FixedAddrProbe, TEST_SLOTS, TEST_VALUE};
    use memprobe_core::memory::{PhysAddr, RegionError, pattern_word};
    use memprobe_core::probe::{Probe, ProbeError};
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("memprobe-fixed-{}-{}", name, std::process::id()))
    }

    fn config(name: &str, phys_addr: usize, device: impl Into<PathBuf>) -> FixedAddrConfig {
        FixedAddrConfig {
            phys_addr: PhysAddr::new(phys_addr),
            size: 4096,
            device: device.into(),
            fallback: temp_path(name),
            test_value: TEST_VALUE,
        }
    }

    fn word_at(contents: &[u8], offset: usize) -> u64 {
        u64::from_ne_bytes(contents[offset..offset + 8].try_into().unwrap())
    }

    #[test]
    fn test_default_config() {
        let config = FixedAddrConfig::default();
        assert_eq!(config.phys_addr.as_usize(), 0x8000_0000);
        assert_eq!(config.size, 4096);
        assert_eq!(config.device, PathBuf::from("/dev/mem"));
        assert_eq!(config.fallback, PathBuf::from("/tmp/fixed_addr_mem"));
        assert_eq!(config.test_value, 0xDEAD_BEEF_CAFE_BABE);
    }

    #[test]
    fn test_fallback_when_device_missing() -> anyhow::Result<()> {
        let config = config("missing", 0x10000, "/nonexistent/mem");
        let fallback = config.fallback.clone();
        let report = FixedAddrProbe::new(config).run()?;
        assert!(report.passed());
        assert!(!report.backing().is_device());
        assert_eq!(report.backing().path(), fallback.as_path());
        assert!(!fallback.exists(), "fallback file must be removed");
        Ok(())
    }

    #[test]
    fn test_fallback_when_device_map_fails() -> anyhow::Result<()> {
        let config = config("nomap", 0x10000, "/dev/null");
        let report = FixedAddrProbe::new(config).run()?;
        assert!(report.passed());
        assert!(!report.backing().is_device());
        Ok(())
    }

    #[test]
    fn test_check_sequence() -> anyhow::Result<()> {
        let config = config("sequence", 0x2000, "/nonexistent/mem");
        let report = FixedAddrProbe::new(config).run()?;
        let checks = report.checks();
        assert_eq!(checks.len(), 1 + TEST_SLOTS + 1);

        assert_eq!(checks[0].label, "test_value");
        assert_eq!(checks[0].actual, TEST_VALUE);
        for (i, check) in checks[1..=TEST_SLOTS].iter().enumerate() {
            assert_eq!(check.label, "locations");
            assert_eq!(check.slot, i);
            assert_eq!(check.actual, pattern_word(i));
        }
        let restore = &checks[TEST_SLOTS + 1];
        assert_eq!(restore.label, "restore");
        assert_eq!(restore.actual, 0);
        assert!(restore.passed());
        Ok(())
    }

    #[test]
    fn test_device_path_restores_original() -> anyhow::Result<()> {
        // a regular file stands in for the device node
        let device = temp_path("device");
        let phys_addr = 0x3000 + 0x18;
        let mut contents = vec![0u8; phys_addr + 4096];
        contents[phys_addr..phys_addr + 8].copy_from_slice(&0x1122_3344_5566_7788u64.to_ne_bytes());
        std::fs::write(&device, &contents)?;

        let config = config("device-fallback", phys_addr, &device);
        let fallback = config.fallback.clone();
        let report = FixedAddrProbe::new(config).run()?;
        assert!(report.passed());
        assert!(report.backing().is_device());
        assert!(!fallback.exists(), "fallback must not be touched");

        let contents = std::fs::read(&device)?;
        std::fs::remove_file(&device)?;
        assert_eq!(word_at(&contents, phys_addr), 0x1122_3344_5566_7788);
        for slot in 1..TEST_SLOTS {
            assert_eq!(word_at(&contents, phys_addr + slot * 8), pattern_word(slot));
        }
        Ok(())
    }

    #[test]
    fn test_unaligned_page_target() -> anyhow::Result<()> {
        let config = config("unaligned", 0x10010, "/nonexistent/mem");
        let report = FixedAddrProbe::new(config).run()?;
        assert!(report.passed());
        Ok(())
    }

    #[test]
    fn test_target_past_address_space() {
        let config = config("overflow", 0xFFFF_FFFF_FFFF_F000, "/nonexistent/mem");
        let fallback = config.fallback.clone();
        let err = FixedAddrProbe::new(config).run().err();
        assert!(matches!(
            err,
            Some(ProbeError::Region(RegionError::OutOfRange { .. }))
        ));
        assert!(!fallback.exists());
    }

    #[test]
    fn test_invalid_config() {
        let mut small = config("small", 0x1000, "/nonexistent/mem");
        small.size = 16;
        assert!(matches!(
            FixedAddrProbe::new(small).run().err(),
            Some(ProbeError::InvalidConfig(_))
        ));

        let misaligned = config("misaligned", 0x1004, "/nonexistent/mem");
        let fallback = misaligned.fallback.clone();
        assert!(matches!(
            FixedAddrProbe::new(misaligned).run().err(),
            Some(ProbeError::InvalidConfig(_))
        ));
        assert!(!fallback.exists());
    }
}
