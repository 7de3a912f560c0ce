use std::collections::BTreeSet;

use crate::process::Pid;

/// Swap-block allocator: tracks, for every block, the set of pids sharing
/// it, plus the free-block pool and the running count of blocks still
/// available (§4.1).
#[derive(Debug)]
pub struct SwapAllocator {
    swap_file: Vec<BTreeSet<Pid>>,
    open_swap: BTreeSet<usize>,
    num_swap_available: usize,
}

impl SwapAllocator {
    pub fn new(swap_blocks: usize) -> Self {
        Self {
            swap_file: vec![BTreeSet::new(); swap_blocks],
            open_swap: (0..swap_blocks).collect(),
            num_swap_available: swap_blocks,
        }
    }

    pub fn num_available(&self) -> usize {
        self.num_swap_available
    }

    /// Pops and returns any block from the physical free pool, or `None`
    /// if none remain. Does not assign a sharer; the caller does that with
    /// [`Self::add_sharer`]. Purely a pool operation — it does not consult
    /// [`Self::num_available`], because the COW-split path (§4.3b) also
    /// draws from this pool to satisfy a block already pessimistically
    /// charged at fork time, after `num_swap_available` may have hit zero.
    /// A fresh ordinary reservation must check [`Self::num_available`]
    /// itself before calling this (see `Pager::map`'s swap-backed branch).
    pub fn reserve(&mut self) -> Option<usize> {
        let block = *self.open_swap.iter().next()?;
        self.open_swap.remove(&block);
        Some(block)
    }

    /// Charges one block of swap accounting to a process without touching
    /// the free pool (used when re-charging a parent's reservation onto a
    /// child at fork time).
    pub fn charge(&mut self, blocks: usize) {
        self.num_swap_available -= blocks;
    }

    pub fn refund(&mut self, blocks: usize) {
        self.num_swap_available += blocks;
    }

    pub fn add_sharer(&mut self, block: usize, pid: Pid) {
        self.swap_file[block].insert(pid);
    }

    /// Removes `pid` from `block`'s sharer set. Returns the block to the
    /// free pool if it becomes empty.
    pub fn remove_sharer(&mut self, block: usize, pid: Pid) {
        self.swap_file[block].remove(&pid);
        if self.swap_file[block].is_empty() {
            self.open_swap.insert(block);
        }
    }

    pub fn sharer_count(&self, block: usize) -> usize {
        self.swap_file[block].len()
    }

    pub fn sharers(&self, block: usize) -> impl Iterator<Item = Pid> + '_ {
        self.swap_file[block].iter().copied()
    }

    /// The sole remaining sharer of `block`, if there is exactly one.
    pub fn sole_sharer(&self, block: usize) -> Option<Pid> {
        let mut iter = self.swap_file[block].iter();
        match (iter.next(), iter.next()) {
            (Some(&pid), None) => Some(pid),
            _ => None,
        }
    }

    /// Whether `block` is currently in the free pool. Used by the invariant
    /// checker to confirm every block backing a resident sharer was
    /// actually reserved.
    pub fn is_free(&self, block: usize) -> bool {
        self.open_swap.contains(&block)
    }
}
