//! # Memprobe Core
//!
//! `memprobe-core` is the foundational library for the memprobe diagnostics.
//! It provides the pieces shared by every probe:
//!
//! - [`memory::MappedRegion`] - A scoped shared mapping of a file or of a
//!   physical-memory device. Unmapping, closing and removal of temporary
//!   backing files happen on drop, on every exit path.
//!
//! - [`memory::WordPointer`] and [`memory::PatternFill`] - Volatile 64-bit slot
//!   access and the `TAG | index` pattern check.
//!
//! - [`probe::Probe`] - The interface every probe implements.
//!
//! - [`report::ProbeReport`] - The per-run record of every comparison, which
//!   decides the exit code and can be written as JSON.
//!
//! ## Platform Support
//!
//! Linux. Direct physical mappings need root privileges and a kernel that
//! permits `/dev/mem` access to the requested range.

#![warn(missing_docs)]

pub mod memory;
pub mod probe;
pub mod report;
pub mod util;
