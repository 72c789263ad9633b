//! Utility functions and types used throughout memprobe.
//!
//! - [`Size`] - Memory size representation
//! - Constants for memory operations ([`PAGE_SIZE`], [`WORD_SIZE`], [`PATTERN_TAG`])
//! - [`page_size`] - The runtime page size of the host

mod constants;
mod size;

pub use self::constants::*;
pub use self::size::Size;

/// Returns the page size reported by the operating system.
///
/// Falls back to [`PAGE_SIZE`] if `sysconf` cannot tell.
pub fn page_size() -> usize {
    let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page <= 0 {
        log::warn!(
            "sysconf(_SC_PAGESIZE) failed, assuming {} bytes",
            PAGE_SIZE
        );
        return PAGE_SIZE;
    }
    page as usize
}

#[cfg(test)]
mod tests {
    use super::page_size;

    #[test]
    fn test_page_size_power_of_two() {
        let page = page_size();
        assert!(page.is_power_of_two());
        assert!(page >= 4096);
    }
}
