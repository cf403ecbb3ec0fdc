//! PPT Invariant System: Runtime invariant enforcement with contract tracking.
//!
//! Recording is one atomic bit per id. It sits on the data path (`execute`, `set`,
//! `copy_to`), which must never wait on a lock.

#[cfg(feature = "ppt")]
use std::sync::atomic::{AtomicU32, Ordering};

// Invariant constants for contract tracking
pub const BUFFER_ALLOCATED: u32 = 1;
pub const BUFFER_RELEASED_ONCE: u32 = 2;
pub const LENGTH_CHECKED: u32 = 3;
pub const PLAN_SHAPE_CHECKED: u32 = 4;
pub const PLAN_CREATED_UNDER_LOCK: u32 = 5;
pub const PLAN_HANDLE_NON_NULL: u32 = 6;
pub const PLAN_RELEASED_ONCE: u32 = 7;
pub const OWNERSHIP_CASCADE: u32 = 8;
pub const EXECUTE_ON_LIVE_BUFFERS: u32 = 9;

#[cfg(feature = "ppt")]
static INVARIANT_LOG: AtomicU32 = AtomicU32::new(0);

/// Bit of `id` in the log; ids past 31 cannot be recorded.
#[cfg(feature = "ppt")]
fn bit(id: u32) -> Option<u32> {
    1u32.checked_shl(id)
}

#[cfg(feature = "ppt")]
/// Assert an invariant: logs it and panics on failure.
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, context: Option<&str>) {
    if !condition {
        let full_message = if let Some(ctx) = context {
            format!("Invariant {} failed: {} (context: {})", id, message, ctx)
        } else {
            format!("Invariant {} failed: {}", id, message)
        };
        log::error!("{}", full_message);
        panic!("{}", full_message);
    }
    if let Some(bit) = bit(id) {
        // Skip the read-modify-write once recorded.
        if INVARIANT_LOG.load(Ordering::Relaxed) & bit == 0 {
            INVARIANT_LOG.fetch_or(bit, Ordering::Relaxed);
        }
    }
}

#[cfg(not(feature = "ppt"))]
/// Assert an invariant: checks condition and panics on failure.
pub(crate) fn assert_invariant(_id: u32, condition: bool, message: &str, _context: Option<&str>) {
    if !condition {
        panic!("Invariant failed: {}", message);
    }
}

#[cfg(feature = "ppt")]
/// Contract test: checks that specified invariants were asserted.
pub fn contract_test(test_name: &str, required_invariants: &[u32]) {
    let log = INVARIANT_LOG.load(Ordering::Acquire);
    let missing: Vec<u32> = required_invariants
        .iter()
        .copied()
        .filter(|&inv| bit(inv).map_or(true, |bit| log & bit == 0))
        .collect();
    if !missing.is_empty() {
        panic!(
            "Contract test '{}' failed: invariants not enforced: {:?}",
            test_name, missing
        );
    }
}

#[cfg(not(feature = "ppt"))]
/// Contract test: no-op when PPT feature is disabled.
pub fn contract_test(_test_name: &str, _required_invariants: &[u32]) {}

#[cfg(feature = "ppt")]
/// Clear invariant log (for between test runs).
pub fn clear_invariant_log() {
    INVARIANT_LOG.store(0, Ordering::Release);
}

#[cfg(not(feature = "ppt"))]
/// Clear invariant log: no-op when PPT feature is disabled.
pub fn clear_invariant_log() {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_assert_invariant_pass() {
        assert_invariant(0, 1 + 1 == 2, "Math works", Some("basic"));
    }

    #[test]
    #[should_panic(expected = "Math broken")]
    fn test_assert_invariant_fail() {
        assert_invariant(0, 1 + 1 == 3, "Math broken", None);
    }

    #[test]
    fn test_contract_test() {
        assert_invariant(LENGTH_CHECKED, true, "recorded", None);
        contract_test("example", &[LENGTH_CHECKED]);
    }

    #[test]
    fn concurrent_recording_keeps_every_id() {
        let threads: Vec<_> = (BUFFER_ALLOCATED..=EXECUTE_ON_LIVE_BUFFERS)
            .map(|id| {
                thread::spawn(move || {
                    for _ in 0..1000 {
                        assert_invariant(id, true, "recorded", None);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        contract_test(
            "all ids",
            &(BUFFER_ALLOCATED..=EXECUTE_ON_LIVE_BUFFERS).collect::<Vec<_>>(),
        );
    }

    #[cfg(feature = "ppt")]
    #[test]
    #[should_panic(expected = "invariants not enforced")]
    fn test_contract_test_reports_missing() {
        contract_test("missing", &[u32::MAX]);
    }

    #[cfg(feature = "ppt")]
    #[test]
    fn ids_past_the_bit_set_are_ignored() {
        assert_invariant(40, true, "out of range", None);
        assert!(bit(40).is_none());
    }
}
