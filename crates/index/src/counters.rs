//! Process-wide version-node bookkeeping.
//!
//! `current_nodes` and `max_nodes` exist purely for test observability (P7
//! "GC bound", P8 "GC blocking") — they are not durable data and carry no
//! meaning outside a single process lifetime. Updated with relaxed atomics,
//! per spec §4.1.
//!
//! Unlike the reference implementation this crate was ported from — where
//! `RegisterVersionNode`/`UnregisterVersionNode` calls do not pair up
//! one-to-one (commit and rollback both skip the unregister, an underflow
//! waiting to happen) — every allocation here calls [`register`] exactly
//! once and every free calls [`unregister`] exactly once. See `DESIGN.md`
//! for the resolution of that open question.

use std::sync::atomic::{AtomicU64, Ordering};

static CURRENT_NODES: AtomicU64 = AtomicU64::new(0);
static MAX_NODES: AtomicU64 = AtomicU64::new(0);

/// Record the allocation of one version node. Call exactly once per
/// allocation — never speculatively, never more than once for the same
/// node.
pub fn register() {
    let updated = CURRENT_NODES.fetch_add(1, Ordering::Relaxed) + 1;
    let mut observed = MAX_NODES.load(Ordering::Relaxed);
    while updated > observed {
        match MAX_NODES.compare_exchange_weak(
            observed,
            updated,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(current) => observed = current,
        }
    }
}

/// Record the permanent free of one version node. Call exactly once per
/// free, and only for a node that previously called [`register`].
pub fn unregister() {
    CURRENT_NODES.fetch_sub(1, Ordering::Relaxed);
}

/// Currently live version nodes across every chain in the process.
pub fn current_nodes() -> u64 {
    CURRENT_NODES.load(Ordering::Relaxed)
}

/// High-water mark of [`current_nodes`] ever observed.
pub fn max_nodes() -> u64 {
    MAX_NODES.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // The counters are process-global, so serialize the tests that read
    // exact values against each other; everything else in the crate's test
    // suite only reads current_nodes()/max_nodes() as a relative delta.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn register_tracks_high_water_mark() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let before = current_nodes();
        register();
        register();
        unregister();
        assert_eq!(current_nodes(), before + 1);
        assert!(max_nodes() >= before + 2);
    }
}
