use std::collections::BTreeMap;

use crate::config::PagerConfig;
use crate::disk_info::DiskInfo;
use crate::pte::PageTableEntry;

/// Process identifier. Opaque handle supplied by the host; the pager never
/// interprets it beyond equality and ordering.
pub type Pid = u64;

/// Per-process state: page table, disk locations, and swap accounting.
///
/// Mirrors `pcb_t`: `page_table`/`disk_info` are sized to `N_VPAGES` up
/// front (dense arena, allocated from 0 via `next_vpage`) rather than grown
/// lazily, since every valid vpn must be addressable by index from the
/// fault handler.
#[derive(Debug, Clone)]
pub struct ProcessControlBlock {
    pub page_table: Vec<PageTableEntry>,
    pub disk_info: Vec<DiskInfo>,
    pub next_vpage: usize,
    pub swap_reserved: usize,
}

impl ProcessControlBlock {
    pub fn new(config: &PagerConfig) -> Self {
        let n = config.n_vpages();
        Self {
            page_table: vec![PageTableEntry::cleared(); n],
            disk_info: (0..n).map(|_| DiskInfo::default()).collect(),
            next_vpage: 0,
            swap_reserved: 0,
        }
    }
}

/// The pager's process table: `pid -> pcb`.
///
/// A `BTreeMap` rather than a hash map so that iteration (eviction's
/// reference-bit refresh pass aside, which only ever touches `sharers`
/// lists) is deterministic, which matters for the invariant-checking tests.
#[derive(Debug, Default)]
pub struct ProcessTable {
    processes: BTreeMap<Pid, ProcessControlBlock>,
}

impl ProcessTable {
    pub fn get(&self, pid: Pid) -> Option<&ProcessControlBlock> {
        self.processes.get(&pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut ProcessControlBlock> {
        self.processes.get_mut(&pid)
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.processes.contains_key(&pid)
    }

    pub fn insert(&mut self, pid: Pid, pcb: ProcessControlBlock) {
        self.processes.insert(pid, pcb);
    }

    pub fn remove(&mut self, pid: Pid) -> Option<ProcessControlBlock> {
        self.processes.remove(&pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pid, &ProcessControlBlock)> {
        self.processes.iter().map(|(&pid, pcb)| (pid, pcb))
    }

    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.processes.keys().copied()
    }
}
