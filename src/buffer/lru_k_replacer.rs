use crate::buffer::replace::Replacer;
use crate::errors::Result;
use crate::FrameId;
use slog::Logger;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Clone, Copy)]
struct FrameEntry {
    access_count: usize,
    evictable: bool,
    in_history: bool,
}

struct FrameLists {
    // frames with fewer than k accesses, ordered by first access (oldest at the front)
    history: VecDeque<FrameId>,
    // frames with at least k accesses, ordered by recency (least recent at the front)
    cache: VecDeque<FrameId>,
    // per-frame bookkeeping for every tracked frame
    entries: HashMap<FrameId, FrameEntry>,
    // number of tracked frames currently marked evictable
    curr_size: usize,
}

impl FrameLists {
    fn detach(&mut self, frame_id: FrameId, in_history: bool) {
        let list = if in_history {
            &mut self.history
        } else {
            &mut self.cache
        };
        if let Some(pos) = list.iter().position(|&id| id == frame_id) {
            list.remove(pos);
        }
    }
}

// LRU-K replacer over a fixed set of frame ids. Frames with fewer than k
// recorded accesses are preferred as victims, oldest first access first;
// once every candidate has reached k accesses the policy degenerates to
// classic LRU over the cache queue.
pub struct LRUKReplacer {
    num_frames: usize,
    k: usize,
    latch: Mutex<FrameLists>,
    logger: Logger,
}

impl LRUKReplacer {
    pub fn new(num_frames: usize, k: usize, logger: &Logger) -> Result<Self> {
        if num_frames == 0 {
            bail!("replacer needs at least one frame");
        }
        if k == 0 {
            bail!("k must be at least one");
        }
        Ok(Self {
            num_frames,
            k,
            latch: Mutex::new(FrameLists {
                history: VecDeque::with_capacity(num_frames),
                cache: VecDeque::with_capacity(num_frames),
                entries: HashMap::with_capacity(num_frames),
                curr_size: 0,
            }),
            logger: logger.clone(),
        })
    }
}

impl Replacer for LRUKReplacer {
    // New frames enter the history queue unevictable. If every frame slot is
    // already tracked the access is dropped: the buffer pool is expected to
    // evict before touching an untracked frame.
    fn record_access(&self, frame_id: FrameId) {
        assert!(
            frame_id < self.num_frames,
            "frame_id {} is out of range",
            frame_id
        );
        let mut guard = self.latch.lock().unwrap();
        let lists = &mut *guard;

        if !lists.entries.contains_key(&frame_id) {
            if lists.entries.len() >= self.num_frames {
                debug!(self.logger, "replacer full, access dropped"; "frame_id" => frame_id);
                return;
            }
            lists.entries.insert(
                frame_id,
                FrameEntry {
                    access_count: 0,
                    evictable: false,
                    in_history: true,
                },
            );
            lists.history.push_back(frame_id);
        }

        let (access_count, was_in_history) = {
            let entry = lists.entries.get_mut(&frame_id).expect("entry must exist");
            entry.access_count += 1;
            (entry.access_count, entry.in_history)
        };

        // sub-k accesses never reorder the history queue
        if access_count < self.k {
            return;
        }

        // the k-th and every later access splices the frame to the MRU end
        if was_in_history {
            lists
                .entries
                .get_mut(&frame_id)
                .expect("entry must exist")
                .in_history = false;
        }
        lists.detach(frame_id, was_in_history);
        lists.cache.push_back(frame_id);
    }

    fn set_evictable(&self, frame_id: FrameId, set_evictable: bool) {
        assert!(
            frame_id < self.num_frames,
            "frame_id {} is out of range",
            frame_id
        );
        let mut guard = self.latch.lock().unwrap();
        let lists = &mut *guard;
        if let Some(entry) = lists.entries.get_mut(&frame_id) {
            if entry.evictable && !set_evictable {
                lists.curr_size -= 1;
            } else if !entry.evictable && set_evictable {
                lists.curr_size += 1;
            }
            entry.evictable = set_evictable;
        }
    }

    fn remove(&self, frame_id: FrameId) {
        assert!(
            frame_id < self.num_frames,
            "frame_id {} is out of range",
            frame_id
        );
        let mut lists = self.latch.lock().unwrap();
        let entry = match lists.entries.get(&frame_id) {
            Some(entry) => *entry,
            None => return,
        };
        assert!(entry.evictable, "frame {} is not evictable", frame_id);
        lists.entries.remove(&frame_id);
        lists.detach(frame_id, entry.in_history);
        lists.curr_size -= 1;
    }

    fn evict(&self) -> Option<FrameId> {
        let mut guard = self.latch.lock().unwrap();

        // history candidates win over cache candidates; within each queue the
        // front holds the oldest relevant timestamp
        let victim = {
            let lists = &*guard;
            lists
                .history
                .iter()
                .chain(lists.cache.iter())
                .copied()
                .find(|id| lists.entries[id].evictable)?
        };

        let lists = &mut *guard;
        let entry = lists.entries.remove(&victim).expect("victim must be tracked");
        lists.detach(victim, entry.in_history);
        lists.curr_size -= 1;
        debug!(self.logger, "frame evicted"; "frame_id" => victim);
        Some(victim)
    }

    fn size(&self) -> usize {
        self.latch.lock().unwrap().curr_size
    }
}
