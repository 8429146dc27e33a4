//! Consistent-hash ring with a fixed slot table and virtual nodes.
//!
//! Each worker owns `VIRTUAL_NODES` slots, placed by hashing `"{id}-{replica}"`
//! and resolving collisions with linear probing. Request lookup hashes the key
//! the same way and walks forward (wrapping at the capacity) to the first
//! occupied slot, so a key always resolves to the same worker as long as the
//! membership does not change.

use crate::error::BalancerError;
use std::collections::HashMap;
use xxhash_rust::xxh3::xxh3_64;

/// Total slots on the ring. Fixed at construction, never changes at runtime.
pub const NUM_SLOTS: usize = 512;

/// Virtual nodes per worker.
pub const VIRTUAL_NODES: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualNode {
    pub worker_id: String,
    pub replica: usize,
}

#[derive(Debug)]
pub struct HashRing {
    slots: Vec<Option<VirtualNode>>,
    /// Reverse index: worker id -> its occupied slots, for O(K) removal.
    worker_slots: HashMap<String, Vec<usize>>,
    num_slots: usize,
    vnodes_per_worker: usize,
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new(NUM_SLOTS, VIRTUAL_NODES)
    }
}

impl HashRing {
    pub fn new(num_slots: usize, vnodes_per_worker: usize) -> Self {
        assert!(vnodes_per_worker >= 1 && vnodes_per_worker <= num_slots);

        Self {
            slots: vec![None; num_slots],
            worker_slots: HashMap::new(),
            num_slots,
            vnodes_per_worker,
        }
    }

    fn hash(&self, key: &str) -> usize {
        (xxh3_64(key.as_bytes()) % self.num_slots as u64) as usize
    }

    /// Linear probe from `home`, returning the first free slot.
    fn probe_free(&self, home: usize) -> Option<usize> {
        (0..self.num_slots)
            .map(|step| (home + step) % self.num_slots)
            .find(|&slot| self.slots[slot].is_none())
    }

    /// Insert `worker_id` with its virtual nodes and return the occupied slots.
    ///
    /// If any virtual node cannot be placed, slots placed earlier in the same
    /// call are rolled back, so the ring invariants hold even after a failure.
    pub fn add(&mut self, worker_id: &str) -> Result<Vec<usize>, BalancerError> {
        if self.contains(worker_id) {
            return Err(BalancerError::DuplicateWorker(worker_id.to_string()));
        }

        // Capacity bound: more than num_slots / vnodes workers cannot all get
        // their full complement of slots.
        if self.len() >= self.capacity() {
            return Err(BalancerError::RingExhausted);
        }

        let mut placed = Vec::with_capacity(self.vnodes_per_worker);

        for replica in 0..self.vnodes_per_worker {
            let home = self.hash(&format!("{worker_id}-{replica}"));

            match self.probe_free(home) {
                Some(slot) => {
                    self.slots[slot] = Some(VirtualNode {
                        worker_id: worker_id.to_string(),
                        replica,
                    });
                    placed.push(slot);
                }
                None => {
                    for slot in placed {
                        self.slots[slot] = None;
                    }
                    return Err(BalancerError::RingExhausted);
                }
            }
        }

        self.worker_slots.insert(worker_id.to_string(), placed.clone());

        Ok(placed)
    }

    /// Free all virtual nodes of `worker_id`. No-op when the worker is absent.
    pub fn remove(&mut self, worker_id: &str) {
        if let Some(slots) = self.worker_slots.remove(worker_id) {
            for slot in slots {
                self.slots[slot] = None;
            }
        }
    }

    /// Resolve `key` to the worker owning the first occupied slot at or after
    /// the key's home slot.
    pub fn route(&self, key: &str) -> Result<String, BalancerError> {
        if self.is_empty() {
            return Err(BalancerError::EmptyRing);
        }

        let home = self.hash(key);

        for step in 0..self.num_slots {
            let slot = (home + step) % self.num_slots;
            if let Some(node) = &self.slots[slot] {
                return Ok(node.worker_id.clone());
            }
        }

        // Unreachable: a non-empty membership always occupies at least one slot.
        Err(BalancerError::EmptyRing)
    }

    pub fn contains(&self, worker_id: &str) -> bool {
        self.worker_slots.contains_key(worker_id)
    }

    /// Maximum number of workers that can hold a full complement of slots.
    pub fn capacity(&self) -> usize {
        self.num_slots / self.vnodes_per_worker
    }

    /// Current worker ids, unsorted.
    pub fn members(&self) -> Vec<String> {
        self.worker_slots.keys().cloned().collect()
    }

    /// Number of distinct workers.
    pub fn len(&self) -> usize {
        self.worker_slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worker_slots.is_empty()
    }

    /// Full `(slot, worker_id)` listing in slot order, for diagnostics.
    pub fn view(&self) -> Vec<(usize, String)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, node)| {
                node.as_ref().map(|n| (slot, n.worker_id.clone()))
            })
            .collect()
    }
}
