use crate::buffer::lru_k_replacer::LRUKReplacer;
use crate::buffer::replace::Replacer;
use crate::default_logger;
use crate::errors::Result;
use std::sync::Arc;
use std::thread;

#[test]
fn test_lru_k_replacer() -> Result<()> {
    let logger = default_logger();
    let replacer = LRUKReplacer::new(7, 2, &logger)?;

    for frame_id in 1..=6 {
        replacer.record_access(frame_id);
    }
    for frame_id in 1..=6 {
        replacer.set_evictable(frame_id, true);
    }
    assert_eq!(replacer.size(), 6);

    // a second access moves frame 1 into the cache queue, so the history
    // frames go first, oldest first access leading
    replacer.record_access(1);

    assert_eq!(replacer.evict(), Some(2));
    assert_eq!(replacer.evict(), Some(3));
    assert_eq!(replacer.evict(), Some(4));
    assert_eq!(replacer.evict(), Some(5));
    assert_eq!(replacer.evict(), Some(6));
    assert_eq!(replacer.evict(), Some(1));
    assert_eq!(replacer.evict(), None);
    assert_eq!(replacer.size(), 0);

    Ok(())
}

#[test]
fn test_pinned_frames_are_skipped() -> Result<()> {
    let logger = default_logger();
    let replacer = LRUKReplacer::new(3, 2, &logger)?;

    replacer.record_access(0);
    replacer.record_access(1);
    replacer.record_access(2);
    replacer.set_evictable(0, true);
    replacer.set_evictable(1, false);
    replacer.set_evictable(2, true);
    assert_eq!(replacer.size(), 2);

    assert_eq!(replacer.evict(), Some(0));
    assert_eq!(replacer.evict(), Some(2));
    // frame 1 stays pinned
    assert_eq!(replacer.evict(), None);
    assert_eq!(replacer.size(), 0);

    Ok(())
}

#[test]
fn test_history_preferred_over_cache() -> Result<()> {
    let logger = default_logger();
    let replacer = LRUKReplacer::new(2, 3, &logger)?;

    replacer.record_access(0);
    replacer.record_access(0);
    replacer.record_access(0);
    replacer.record_access(1);
    replacer.set_evictable(0, true);
    replacer.set_evictable(1, true);

    // frame 1 has not reached k accesses yet, so it is evicted before the
    // hot frame 0
    assert_eq!(replacer.evict(), Some(1));
    assert_eq!(replacer.evict(), Some(0));
    assert_eq!(replacer.evict(), None);

    Ok(())
}

#[test]
fn test_cache_orders_by_recency() -> Result<()> {
    let logger = default_logger();
    let replacer = LRUKReplacer::new(3, 2, &logger)?;

    for frame_id in 0..3 {
        replacer.record_access(frame_id);
    }
    for frame_id in 0..3 {
        replacer.record_access(frame_id);
    }
    // all three frames are cached now in order 0, 1, 2; refresh frame 0
    replacer.record_access(0);
    for frame_id in 0..3 {
        replacer.set_evictable(frame_id, true);
    }

    assert_eq!(replacer.evict(), Some(1));
    assert_eq!(replacer.evict(), Some(2));
    assert_eq!(replacer.evict(), Some(0));

    Ok(())
}

#[test]
fn test_set_evictable_is_idempotent() -> Result<()> {
    let logger = default_logger();
    let replacer = LRUKReplacer::new(2, 2, &logger)?;

    replacer.record_access(0);
    assert_eq!(replacer.size(), 0);

    replacer.set_evictable(0, true);
    assert_eq!(replacer.size(), 1);
    replacer.set_evictable(0, true);
    assert_eq!(replacer.size(), 1);

    replacer.set_evictable(0, false);
    assert_eq!(replacer.size(), 0);
    replacer.set_evictable(0, false);
    assert_eq!(replacer.size(), 0);

    // untracked frames are a no-op
    replacer.set_evictable(1, true);
    assert_eq!(replacer.size(), 0);

    Ok(())
}

#[test]
fn test_remove() -> Result<()> {
    let logger = default_logger();
    let replacer = LRUKReplacer::new(4, 2, &logger)?;

    replacer.record_access(0);
    replacer.record_access(1);
    replacer.set_evictable(0, true);
    replacer.set_evictable(1, true);
    assert_eq!(replacer.size(), 2);

    replacer.remove(0);
    assert_eq!(replacer.size(), 1);

    // a removed frame is untracked again, so a second remove is a no-op
    replacer.remove(0);
    assert_eq!(replacer.size(), 1);

    assert_eq!(replacer.evict(), Some(1));
    assert_eq!(replacer.evict(), None);

    // re-accessing a removed frame starts a fresh history
    replacer.record_access(0);
    replacer.set_evictable(0, true);
    assert_eq!(replacer.evict(), Some(0));

    Ok(())
}

#[test]
fn test_zero_arguments_are_rejected() {
    let logger = default_logger();
    assert!(LRUKReplacer::new(0, 2, &logger).is_err());
    assert!(LRUKReplacer::new(2, 0, &logger).is_err());
}

#[test]
#[should_panic(expected = "out of range")]
fn test_record_access_out_of_range() {
    let logger = default_logger();
    let replacer = LRUKReplacer::new(2, 2, &logger).unwrap();
    replacer.record_access(2);
}

#[test]
#[should_panic(expected = "not evictable")]
fn test_remove_pinned_frame() {
    let logger = default_logger();
    let replacer = LRUKReplacer::new(2, 2, &logger).unwrap();
    replacer.record_access(0);
    replacer.remove(0);
}

#[test]
fn test_concurrent_access() -> Result<()> {
    let logger = default_logger();
    let replacer = Arc::new(LRUKReplacer::new(64, 2, &logger)?);

    let mut handles = Vec::new();
    for t in 0..4 {
        let replacer = Arc::clone(&replacer);
        handles.push(thread::spawn(move || {
            for frame_id in (t * 16)..(t * 16 + 16) {
                replacer.record_access(frame_id);
                replacer.record_access(frame_id);
                replacer.set_evictable(frame_id, true);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(replacer.size(), 64);
    for _ in 0..64 {
        assert!(replacer.evict().is_some());
    }
    assert_eq!(replacer.evict(), None);

    Ok(())
}
