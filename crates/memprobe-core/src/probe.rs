//! Memory probe traits.
//!
//! This module defines the [`Probe`] trait that every mapping check implements.

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::memory::RegionError;
use crate::report::ProbeReport;

/// Errors that abort a probe before or while acquiring its region.
///
/// Verification failures are not errors; they are recorded in the
/// [`ProbeReport`].
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The mapped region could not be acquired.
    #[error(transparent)]
    Region(#[from] RegionError),
    /// The probe configuration cannot be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Serialize for ProbeError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Trait for memory mapping probes.
///
/// A probe acquires a [`MappedRegion`](crate::memory::MappedRegion), writes
/// known values, reads them back and records every comparison. The region is
/// released before [`run()`](Probe::run) returns, on success and on error.
pub trait Probe {
    /// Short name used as log target and report label.
    fn name(&self) -> &'static str;

    /// Runs the probe.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the configuration is invalid or the region
    /// cannot be acquired. Mismatches are reported through
    /// [`ProbeReport::passed`], not as errors.
    fn run(&mut self) -> Result<ProbeReport, ProbeError>;

    /// Optionally serializes probe configuration to JSON.
    ///
    /// The value is embedded in the report produced by [`run()`](Probe::run).
    fn serialize(&self) -> Option<serde_json::Value> {
        None
    }
}
