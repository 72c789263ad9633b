//! The `memory` module provides the mapped-region resource and word-level access to it.
//!
//! - `MappedRegion`: a scoped shared mapping of a file or physical-memory device.
//! - `Backing`: the store providing the pages of a region.
//! - `WordPointer`: a trait for volatile 64-bit slot access.
//! - `PatternFill`: a trait for writing and verifying pattern words.
//! - `PhysAddr`: a physical address (or simulated file offset) with page alignment helpers.
//! - `mem_fence`: a full hardware memory fence.
mod fence;
mod pattern;
mod phys_addr;
mod region;

pub use self::fence::mem_fence;
pub use self::pattern::{PatternFill, pattern_word};
pub use self::phys_addr::PhysAddr;
pub use self::region::{Backing, MappedRegion, RegionError};

use crate::util::WORD_SIZE;

/// Trait for accessing memory as an array of 64-bit slots.
///
/// All accesses are volatile so that every read and write reaches the mapping.
#[allow(clippy::len_without_is_empty)]
pub trait WordPointer {
    /// Returns a pointer to slot 0.
    fn ptr(&self) -> *mut u64;

    /// Returns the length of the memory region in bytes.
    fn len(&self) -> usize;

    /// Returns the number of whole slots in the region.
    fn words(&self) -> usize {
        self.len() / WORD_SIZE
    }

    /// Returns a pointer to the given slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot` lies outside the region.
    fn addr(&self, slot: usize) -> *mut u64 {
        assert!(
            slot < self.words(),
            "WordPointer::addr failed. Slot {} >= {}",
            slot,
            self.words()
        );
        unsafe { self.ptr().add(slot) }
    }

    /// Reads a slot.
    fn read_word(&self, slot: usize) -> u64 {
        unsafe { std::ptr::read_volatile(self.addr(slot)) }
    }

    /// Writes a slot.
    fn write_word(&self, slot: usize, value: u64) {
        unsafe { std::ptr::write_volatile(self.addr(slot), value) }
    }
}
