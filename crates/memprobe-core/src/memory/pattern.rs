use log::{debug, warn};

use super::{WordPointer, mem_fence};
use crate::report::CheckOutcome;
use crate::util::PATTERN_TAG;

/// Returns the pattern word for a slot: [`PATTERN_TAG`] ORed with the index.
///
/// ```
/// use memprobe_core::memory::pattern_word;
///
/// assert_eq!(pattern_word(0), 0xDEAD_BEEF_0000_0000);
/// assert_eq!(pattern_word(127), 0xDEAD_BEEF_0000_007F);
/// ```
pub const fn pattern_word(index: usize) -> u64 {
    PATTERN_TAG | index as u64
}

/// Trait for filling a region with pattern words and verifying them.
pub trait PatternFill {
    /// Writes [`pattern_word`] into every slot, followed by a fence.
    fn fill_pattern(&self);

    /// Reads every slot back and compares it with [`pattern_word`].
    ///
    /// Stops at the first mismatch. The returned outcomes cover every slot
    /// compared so far, the mismatch included.
    fn verify_pattern(&self) -> Vec<CheckOutcome>;
}

impl<T: WordPointer> PatternFill for T {
    fn fill_pattern(&self) {
        debug!("write pattern to {} slots", self.words());
        for slot in 0..self.words() {
            self.write_word(slot, pattern_word(slot));
        }
        mem_fence();
    }

    fn verify_pattern(&self) -> Vec<CheckOutcome> {
        mem_fence();
        let mut outcomes = Vec::with_capacity(self.words());
        for slot in 0..self.words() {
            let outcome =
                CheckOutcome::new("pattern", slot, pattern_word(slot), self.read_word(slot));
            if !outcome.passed() {
                warn!(
                    "Mismatch at index {}: expected 0x{:016X}, got 0x{:016X}",
                    slot, outcome.expected, outcome.actual
                );
                outcomes.push(outcome);
                break;
            }
            outcomes.push(outcome);
        }
        outcomes
    }
}
