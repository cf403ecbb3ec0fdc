//! Process-wide planner serialization.
//!
//! The native planner is not thread-safe, so every call that touches planner state
//! (plan creation and destruction, wisdom, time limit, cleanup) runs inside
//! [`with_planner`]. One lock covers both precisions and every engine.

use lazy_static::lazy_static;
use std::cell::Cell;
use std::sync::{Mutex, PoisonError};

lazy_static! {
    static ref PLANNER_LOCK: Mutex<()> = Mutex::new(());
}

thread_local! {
    static HELD: Cell<bool> = const { Cell::new(false) };
}

struct HeldFlag;

impl HeldFlag {
    fn raise() -> Self {
        HELD.with(|held| held.set(true));
        HeldFlag
    }
}

impl Drop for HeldFlag {
    fn drop(&mut self) {
        HELD.with(|held| held.set(false));
    }
}

/// Runs `f` with the planner lock held, releasing it on return or unwind.
///
/// Not reentrant: calling it again from inside `f` deadlocks.
pub fn with_planner<R>(f: impl FnOnce() -> R) -> R {
    // The lock guards no data, so a poisoned lock is still a valid lock.
    let _guard = PLANNER_LOCK
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let _held = HeldFlag::raise();
    f()
}

/// Whether the calling thread is inside [`with_planner`].
pub fn held_by_current_thread() -> bool {
    HELD.with(|held| held.get())
}
