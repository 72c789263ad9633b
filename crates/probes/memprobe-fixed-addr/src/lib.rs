//! Fixed physical address probe.
//!
//! This crate provides a probe that maps a fixed physical address through
//! `/dev/mem` and verifies read/write consistency at that address. If the
//! device cannot be opened or the range cannot be mapped, the probe falls back
//! to a file-backed simulation in which the physical address becomes the file
//! offset.
//!
//! Implements the [`memprobe_core::probe::Probe`] trait.
//!
//! # Platform Requirements
//!
//! - Linux
//! - Root privileges for `/dev/mem` access
//! - Kernel must allow `/dev/mem` access to the target range (`CONFIG_STRICT_DEVMEM`
//!   blocks ordinary RAM); otherwise the file-backed fallback is used

#![warn(missing_docs)]

mod fixed_addr;

pub use fixed_addr::{FixedAddrConfig, FixedAddrProbe, TEST_SLOTS, TEST_VALUE};
