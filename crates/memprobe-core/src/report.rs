//! Probe results.
//!
//! A [`ProbeReport`] collects one [`CheckOutcome`] per comparison a probe
//! performs. A report passes only if at least one check ran and every check
//! matched.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;

use log::info;
use serde::{Serialize, Serializer};

use crate::memory::{Backing, MappedRegion, PhysAddr, WordPointer};

fn as_hex<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{:016X}", value))
}

fn addr_as_hex<S: Serializer>(value: &usize, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{:X}", value))
}

/// Result of comparing one slot against the value written to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    /// Name of the check phase
    pub label: &'static str,
    /// Slot index inside the mapped region
    pub slot: usize,
    /// Value written to the slot
    #[serde(serialize_with = "as_hex")]
    pub expected: u64,
    /// Value read back from the slot
    #[serde(serialize_with = "as_hex")]
    pub actual: u64,
}

impl CheckOutcome {
    /// Creates a new outcome.
    pub fn new(label: &'static str, slot: usize, expected: u64, actual: u64) -> Self {
        Self {
            label,
            slot,
            expected,
            actual,
        }
    }

    /// Returns true if the read-back value equals the written one.
    pub fn passed(&self) -> bool {
        self.expected == self.actual
    }
}

/// Results of a single probe run.
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    /// ISO 8601 timestamp of when the probe ran
    date: String,
    probe: &'static str,
    backing: Backing,
    target: PhysAddr,
    #[serde(serialize_with = "addr_as_hex")]
    vaddr: usize,
    len: usize,
    checks: Vec<CheckOutcome>,
    failed: usize,
    passed: bool,
    /// Additional JSON metadata (probe-specific)
    data: Option<serde_json::Value>,
}

impl ProbeReport {
    /// Creates an empty report for a probe that mapped `region`.
    pub fn new(probe: &'static str, region: &MappedRegion) -> Self {
        Self {
            date: chrono::Local::now().to_rfc3339(),
            probe,
            backing: region.backing().clone(),
            target: region.target(),
            vaddr: region.ptr() as usize,
            len: region.len(),
            checks: Vec::new(),
            failed: 0,
            passed: false,
            data: None,
        }
    }

    /// Attaches probe-specific metadata.
    pub fn with_data(mut self, data: Option<serde_json::Value>) -> Self {
        self.data = data;
        self
    }

    /// Records a check outcome.
    pub fn push(&mut self, outcome: CheckOutcome) {
        if !outcome.passed() {
            self.failed += 1;
        }
        self.checks.push(outcome);

        // Update calculated fields
        self.passed = self.failed == 0 && !self.checks.is_empty();
    }

    /// Returns the name of the probe that produced this report.
    pub fn probe(&self) -> &'static str {
        self.probe
    }

    /// Returns the store that backed the probed region.
    pub fn backing(&self) -> &Backing {
        &self.backing
    }

    /// Returns all recorded outcomes in the order they were checked.
    pub fn checks(&self) -> &[CheckOutcome] {
        &self.checks
    }

    /// Returns the number of failed checks.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Returns true if at least one check ran and all of them matched.
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Process exit code for this report: success only if the report passed.
    pub fn exit_code(&self) -> ExitCode {
        if self.passed {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    /// Writes the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_file(&self, filename: impl AsRef<Path>) -> std::io::Result<()> {
        let filename = filename.as_ref();
        let file = File::create(filename)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        info!("Results saved to {:?}", filename);
        Ok(())
    }
}

impl Extend<CheckOutcome> for ProbeReport {
    fn extend<I: IntoIterator<Item = CheckOutcome>>(&mut self, iter: I) {
        for outcome in iter {
            self.push(outcome);
        }
    }
}
