/// Full memory fence.
///
/// Orders all loads and stores issued before the fence against those issued
/// after it. Emits `mfence` on x86_64.
#[inline(always)]
pub fn mem_fence() {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        std::arch::x86_64::_mm_mfence()
    };
    #[cfg(not(target_arch = "x86_64"))]
    std::sync::atomic::fence(std::sync::atomic::Ordering::SeqCst);
}
