/// Region size in bytes, kilobytes or gigabytes.
///
/// Binary multipliers (1 KB = 1024 bytes).
///
/// ```
/// use memprobe_core::util::Size;
///
/// assert_eq!(Size::KB(1).bytes(), 1024);
/// assert_eq!(Size::KB(4).words(), 512);
/// ```
#[derive(Clone, Copy, Debug)]
pub enum Size {
    /// Size in bytes
    B(usize),
    /// Size in kilobytes (1 KB = 1024 bytes)
    KB(usize),
    /// Size in gigabytes (1 GB = 1024 * 1024 KB)
    GB(usize),
}

impl Size {
    /// Converts this size to bytes.
    pub const fn bytes(&self) -> usize {
        match self {
            Size::B(bytes) => *bytes,
            Size::KB(kb) => *kb * (1 << 10),
            Size::GB(gb) => *gb * (1 << 30),
        }
    }

    /// Number of whole 64-bit slots that fit into this size.
    pub const fn words(&self) -> usize {
        self.bytes() / super::WORD_SIZE
    }
}
