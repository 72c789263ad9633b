/// Standard page size (4096 bytes), used when the OS cannot report one
pub const PAGE_SIZE: usize = 4096;

/// Size of one pattern slot in bytes
pub const WORD_SIZE: usize = std::mem::size_of::<u64>();

/// Tag ORed into every pattern word
pub const PATTERN_TAG: u64 = 0xDEAD_BEEF_0000_0000;
