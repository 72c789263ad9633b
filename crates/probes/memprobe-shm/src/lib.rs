//! File-backed shared memory probe.
//!
//! This crate provides a probe that emulates a shared memory segment with a
//! regular file. It maps the file shared, writes a `TAG | index` pattern word
//! into every 8-byte slot and verifies the pattern after a memory fence.
//!
//! Implements the [`memprobe_core::probe::Probe`] trait.
//!
//! # Use Cases
//!
//! - Sanity check of `mmap(MAP_SHARED)` on hosts without `shm_open`
//! - Guest images of simulated systems before attaching real shared memory

#![warn(missing_docs)]

mod shm;

pub use shm::{ShmConfig, ShmProbe};
