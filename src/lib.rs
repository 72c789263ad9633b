//! # Memprobe
//!
//! Diagnostic probes that validate shared and physical memory mappings on a
//! host. This crate re-exports [`memprobe_core`] and, behind features, the
//! individual probes:
//!
//! - `shm` - [`memprobe_shm`], the file-backed shared memory probe
//! - `fixed-addr` - [`memprobe_fixed_addr`], the fixed physical address probe
//!
//! Both are enabled by default.

pub use memprobe_core::*;

#[cfg(feature = "fixed-addr")]
pub use memprobe_fixed_addr;
#[cfg(feature = "shm")]
pub use memprobe_shm;
