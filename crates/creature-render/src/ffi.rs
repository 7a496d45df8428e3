//! C ABI for hosts written in other languages.
//!
//! Only the counter is exported: pipelines encode into a borrowed
//! `wgpu::RenderPass`, which has no C representation.
//!
//! Handles are opaque pointers created by `*_make` and released by `*_free`.
//! C declarations live in `include/counter.h`.

use std::ffi::c_void;

use crate::counter::Counter;

/// Returned by [`counter_next`] for a null handle or an exhausted counter.
/// Never issued as an id.
pub const COUNTER_EXHAUSTED: u64 = u64::MAX;

/// Allocates a counter in its initial state.
#[unsafe(no_mangle)]
pub extern "C" fn counter_make() -> *mut c_void {
    Box::into_raw(Box::new(Counter::new())).cast()
}

/// Returns the next id and advances the counter.
///
/// # Safety
/// `ptr` must be null or a live handle from [`counter_make`], not used
/// concurrently from another thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn counter_next(ptr: *mut c_void) -> u64 {
    // SAFETY: guaranteed by the caller; null is handled by `as_mut`.
    let Some(counter) = (unsafe { ptr.cast::<Counter>().as_mut() }) else {
        log::warn!("counter_next called with a null handle");
        return COUNTER_EXHAUSTED;
    };
    counter.next().unwrap_or(COUNTER_EXHAUSTED)
}

/// Releases a counter. Null is ignored.
///
/// # Safety
/// `ptr` must be null or a live handle from [`counter_make`]; it must not be
/// used again afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn counter_free(ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: `ptr` came from `Box::into_raw` in `counter_make`.
    drop(unsafe { Box::from_raw(ptr.cast::<Counter>()) });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_issues_sequential_ids() {
        let handle = counter_make();
        unsafe {
            assert_eq!(counter_next(handle), 0);
            assert_eq!(counter_next(handle), 1);
            assert_eq!(counter_next(handle), 2);
            counter_free(handle);
        }
    }

    #[test]
    fn handles_are_independent() {
        let a = counter_make();
        let b = counter_make();
        unsafe {
            counter_next(a);
            counter_next(a);
            assert_eq!(counter_next(b), 0);
            counter_free(a);
            counter_free(b);
        }
    }

    #[test]
    fn null_handle_is_tolerated() {
        unsafe {
            assert_eq!(counter_next(std::ptr::null_mut()), COUNTER_EXHAUSTED);
            counter_free(std::ptr::null_mut());
        }
    }

    #[test]
    fn header_declares_every_export() {
        let header = include_str!("../include/counter.h");

        assert!(header.contains("void *counter_make(void);"));
        assert!(header.contains("uint64_t counter_next(void *counter);"));
        assert!(header.contains("void counter_free(void *counter);"));
        assert_eq!(COUNTER_EXHAUSTED, u64::MAX);
        assert!(header.contains("#define COUNTER_EXHAUSTED UINT64_MAX"));
    }
}
