//! `critical-section` 1.x implementation for ESP-IDF builds.
//!
//! `embassy-sync`'s `CriticalSectionRawMutex` guards the snapshot slot with
//! these. The section is a process-wide re-entrant mutex: depth is tracked
//! per thread and only the outermost acquire takes the lock.

use core::cell::{Cell, RefCell};
use std::sync::{Mutex, MutexGuard, PoisonError};

static CRITICAL_SECTION_MUTEX: Mutex<()> = Mutex::new(());

thread_local! {
    static CRITICAL_SECTION_DEPTH: Cell<u8> = const { Cell::new(0) };
    static CRITICAL_SECTION_GUARD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
}

#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    CRITICAL_SECTION_DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            // The guarded data is `()`, so a poisoned lock is still usable.
            let lock = CRITICAL_SECTION_MUTEX
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            CRITICAL_SECTION_GUARD.with(|guard| *guard.borrow_mut() = Some(lock));
        }
        let new_depth = d.saturating_add(1);
        depth.set(new_depth);
        new_depth
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    CRITICAL_SECTION_DEPTH.with(|depth| {
        let d = depth.get();
        if d == 0 {
            return;
        }
        depth.set(d - 1);
        if d == 1 {
            CRITICAL_SECTION_GUARD.with(|guard| *guard.borrow_mut() = None);
        }
    })
}
