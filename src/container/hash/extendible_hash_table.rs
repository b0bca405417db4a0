use crate::errors::Result;
use slog::Logger;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Mutex;
use xxhash_rust::xxh3::Xxh3Builder;

struct Bucket<K, V> {
    local_depth: usize,
    items: Vec<(K, V)>,
}

impl<K, V> Bucket<K, V> {
    fn new(local_depth: usize, capacity: usize) -> Self {
        Self {
            local_depth,
            items: Vec::with_capacity(capacity),
        }
    }
}

impl<K: Eq, V> Bucket<K, V> {
    fn get(&self, key: &K) -> Option<&V> {
        self.items.iter().find(|item| item.0 == *key).map(|item| &item.1)
    }

    fn remove(&mut self, key: &K) -> bool {
        match self.items.iter().position(|item| item.0 == *key) {
            Some(pos) => {
                self.items.swap_remove(pos);
                true
            }
            None => false,
        }
    }
}

struct Dir<K, V> {
    global_depth: usize,
    // slot -> index into the bucket arena; several slots may share one bucket
    slots: Vec<usize>,
    // the arena only grows: buckets are never merged and the directory never shrinks
    buckets: Vec<Bucket<K, V>>,
}

// Extendible hash table with a growable directory. A key lands in the slot
// addressed by the low global_depth bits of its hash; a full bucket is split
// on its local_depth bit, doubling the directory first when the two depths
// meet.
pub struct ExtendibleHashTable<K, V, S = Xxh3Builder> {
    bucket_size: usize,
    hasher: S,
    latch: Mutex<Dir<K, V>>,
    logger: Logger,
}

impl<K, V> ExtendibleHashTable<K, V> {
    pub fn new(bucket_size: usize, logger: &Logger) -> Result<Self> {
        Self::with_hasher(bucket_size, Xxh3Builder::new(), logger)
    }
}

impl<K, V, S> ExtendibleHashTable<K, V, S> {
    pub fn with_hasher(bucket_size: usize, hasher: S, logger: &Logger) -> Result<Self> {
        if bucket_size == 0 {
            bail!("bucket size must be at least one");
        }
        Ok(Self {
            bucket_size,
            hasher,
            latch: Mutex::new(Dir {
                global_depth: 0,
                slots: vec![0],
                buckets: vec![Bucket::new(0, bucket_size)],
            }),
            logger: logger.clone(),
        })
    }

    pub fn global_depth(&self) -> usize {
        self.latch.lock().unwrap().global_depth
    }

    pub fn local_depth(&self, dir_index: usize) -> usize {
        let dir = self.latch.lock().unwrap();
        dir.buckets[dir.slots[dir_index]].local_depth
    }

    pub fn num_buckets(&self) -> usize {
        self.latch.lock().unwrap().buckets.len()
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> ExtendibleHashTable<K, V, S> {
    fn hash_of(&self, key: &K) -> u64 {
        let mut state = self.hasher.build_hasher();
        key.hash(&mut state);
        state.finish()
    }

    fn slot_of(hash: u64, global_depth: usize) -> usize {
        (hash & ((1u64 << global_depth) - 1)) as usize
    }

    pub fn find(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let hash = self.hash_of(key);
        let dir = self.latch.lock().unwrap();
        let slot = Self::slot_of(hash, dir.global_depth);
        dir.buckets[dir.slots[slot]].get(key).cloned()
    }

    pub fn remove(&self, key: &K) -> bool {
        let hash = self.hash_of(key);
        let mut guard = self.latch.lock().unwrap();
        let dir = &mut *guard;
        let slot = Self::slot_of(hash, dir.global_depth);
        let bucket_idx = dir.slots[slot];
        dir.buckets[bucket_idx].remove(key)
    }

    // Existing keys are updated in place. A full target bucket triggers the
    // split-and-retry loop; skewed hashes may take several rounds before the
    // item fits.
    pub fn insert(&self, key: K, value: V) {
        let hash = self.hash_of(&key);
        let mut guard = self.latch.lock().unwrap();
        let dir = &mut *guard;
        loop {
            let slot = Self::slot_of(hash, dir.global_depth);
            let bucket_idx = dir.slots[slot];
            let bucket = &mut dir.buckets[bucket_idx];

            if let Some(item) = bucket.items.iter_mut().find(|item| item.0 == key) {
                item.1 = value;
                return;
            }
            if bucket.items.len() < self.bucket_size {
                bucket.items.push((key, value));
                return;
            }

            let local_depth = bucket.local_depth;
            debug_assert!(local_depth <= dir.global_depth);
            if local_depth == dir.global_depth {
                // the second half of the grown directory mirrors the first
                dir.slots.extend_from_within(..);
                dir.global_depth += 1;
                debug!(self.logger, "directory doubled"; "global_depth" => dir.global_depth);
            }
            self.split(dir, bucket_idx);
        }
    }

    fn split(&self, dir: &mut Dir<K, V>, bucket_idx: usize) {
        let depth = dir.buckets[bucket_idx].local_depth;
        let split_bit = 1u64 << depth;

        dir.buckets[bucket_idx].local_depth = depth + 1;
        let sibling_idx = dir.buckets.len();
        dir.buckets.push(Bucket::new(depth + 1, self.bucket_size));

        // slots that pointed at the split bucket and carry the split bit move over
        for (slot, bucket) in dir.slots.iter_mut().enumerate() {
            if *bucket == bucket_idx && (slot as u64 & split_bit) != 0 {
                *bucket = sibling_idx;
            }
        }

        let items = std::mem::take(&mut dir.buckets[bucket_idx].items);
        for (key, value) in items {
            let target = if (self.hash_of(&key) & split_bit) != 0 {
                sibling_idx
            } else {
                bucket_idx
            };
            dir.buckets[target].items.push((key, value));
        }

        debug!(self.logger, "bucket split";
               "local_depth" => depth + 1, "num_buckets" => dir.buckets.len());
    }
}

#[cfg(test)]
impl<K: Hash + Eq, V, S: BuildHasher> ExtendibleHashTable<K, V, S> {
    // Checks the directory against its structural invariants: depth bounds,
    // slot-to-bucket hash agreement, and the exact 2^(global - local) share
    // count per bucket.
    pub(crate) fn check_integrity(&self) {
        let dir = self.latch.lock().unwrap();
        assert_eq!(dir.slots.len(), 1 << dir.global_depth);

        let mut shares = vec![0usize; dir.buckets.len()];
        for (slot, &bucket_idx) in dir.slots.iter().enumerate() {
            let bucket = &dir.buckets[bucket_idx];
            assert!(bucket.local_depth <= dir.global_depth);
            assert!(bucket.items.len() <= self.bucket_size);
            shares[bucket_idx] += 1;

            let mask = (1u64 << bucket.local_depth) - 1;
            for item in &bucket.items {
                assert_eq!(self.hash_of(&item.0) & mask, slot as u64 & mask);
            }
        }
        for (bucket_idx, &count) in shares.iter().enumerate() {
            let expected = 1usize << (dir.global_depth - dir.buckets[bucket_idx].local_depth);
            assert_eq!(count, expected, "bucket {} has a wrong share count", bucket_idx);
        }
    }
}
