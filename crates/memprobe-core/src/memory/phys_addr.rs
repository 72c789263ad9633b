use std::fmt::{Debug, Formatter};
use std::ops::Add;

use serde::Serialize;

#[repr(transparent)]
#[derive(Clone, Copy, Default, Serialize, PartialEq, Eq, PartialOrd, Ord)]
/// Physical memory address.
///
/// A newtype wrapper around a physical address value. For file-backed
/// simulations the same value is used as the offset into the backing file.
pub struct PhysAddr(usize);

impl Debug for PhysAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("PhysAddr(0x{:02x})", self.0))
    }
}

impl PhysAddr {
    /// Creates a new physical address.
    pub const fn new(addr: usize) -> Self {
        PhysAddr(addr)
    }

    /// Returns the address as a usize.
    pub const fn as_usize(&self) -> usize {
        self.0
    }

    /// Rounds the address down to the start of its page.
    ///
    /// `page_size` must be a power of two.
    pub fn align_down(&self, page_size: usize) -> PhysAddr {
        debug_assert!(page_size.is_power_of_two());
        PhysAddr(self.0 & !(page_size - 1))
    }

    /// Returns the distance from the start of the page to this address.
    pub fn page_offset(&self, page_size: usize) -> usize {
        self.0 - self.align_down(page_size).0
    }
}

impl std::fmt::UpperHex for PhysAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::UpperHex::fmt(&self.0, f)
    }
}

impl std::fmt::Pointer for PhysAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:p}", self.0 as *const u8)
    }
}

impl Add<usize> for PhysAddr {
    type Output = PhysAddr;

    fn add(self, rhs: usize) -> Self::Output {
        PhysAddr(self.0 + rhs)
    }
}
