use log::{debug, trace};

use crate::config::PagerConfig;
use crate::disk_info::DiskInfo;
use crate::error::{PagerError, PagerResult};
use crate::file_index::FileIndex;
use crate::frame::FrameTable;
use crate::host::HostOps;
use crate::process::{Pid, ProcessControlBlock, ProcessTable};
use crate::pte::PageTableEntry;
use crate::swap::SwapAllocator;

/// The demand-paging virtual memory manager.
///
/// Generic over [`HostOps`] rather than reaching for hidden globals: the
/// embedding runtime provides an implementation of the host surface,
/// constructs a `Pager`, and calls its six entry points (§6). `create` and
/// `fault` return `Result<(), PagerError>`; `map` returns `Option<usize>`
/// (an arena address), mapped at the host's own call site to the spec's
/// `0`/`-1`/`null` ABI if one is needed.
pub struct Pager<H: HostOps> {
    pub(crate) config: PagerConfig,
    pub(crate) host: H,
    pub(crate) frames: FrameTable,
    pub(crate) swap: SwapAllocator,
    pub(crate) file_index: FileIndex,
    pub(crate) processes: ProcessTable,
    pub(crate) current_pid: Option<Pid>,
}

impl<H: HostOps> Pager<H> {
    /// Called once before any other entry point. Zeroes frame 0, which is
    /// pinned for the lifetime of the pager, and populates the frame and
    /// swap free pools.
    pub fn init(config: PagerConfig, mut host: H) -> Self {
        debug!(
            "pager init: memory_pages={} swap_blocks={} page_size={}",
            config.memory_pages, config.swap_blocks, config.page_size
        );
        {
            let page_size = config.page_size;
            let zero_frame = &mut host.physmem()[..page_size];
            zero_frame.fill(0);
        }
        Self {
            frames: FrameTable::new(config.memory_pages),
            swap: SwapAllocator::new(config.swap_blocks),
            file_index: FileIndex::default(),
            processes: ProcessTable::default(),
            current_pid: None,
            config,
            host,
        }
    }

    /// The process the next `fault`/`destroy`/`map` call will act on.
    pub fn current_pid(&self) -> Option<Pid> {
        self.current_pid
    }

    /// The page table of the current process, standing in for the
    /// `page_table_base_register` the host's MMU would consult — and
    /// write — on every reference (§6, "Rust-native surface"). Mutable
    /// because the MMU side of the embedding is what sets `referenced` and
    /// `dirty` on every access; `refresh_frame_bits` (clock.rs) only reads
    /// those bits back out of the PTE, it never originates them.
    pub fn page_table_base_register(&mut self) -> Option<&mut [PageTableEntry]> {
        let pid = self.current_pid?;
        self.processes.get_mut(pid).map(|pcb| pcb.page_table.as_mut_slice())
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    /// Direct access to the host, for callers that need to poke physical
    /// memory or configure I/O failures the way a real MMU and disk
    /// controller would sit outside the pager's own state.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn require_current(&self) -> Pid {
        self.current_pid.expect("pager entry point called before switch()")
    }

    /// Re-checks the invariants in §8 and logs any violation. Compiled out
    /// of release builds, the way the original guarded its own
    /// `check_states()` calls behind a commented-out call site.
    #[cfg(debug_assertions)]
    pub(crate) fn trace_invariants(&self, op: &str) {
        let violations = self.check_invariants();
        if violations.is_empty() {
            log::trace!("invariants hold after {op}");
        } else {
            log::error!("invariant violations after {op}: {violations:?}");
        }
    }

    #[cfg(not(debug_assertions))]
    pub(crate) fn trace_invariants(&self, _op: &str) {}

    /// Fork semantics: the child's arena starts out identical to the
    /// parent's. If the parent isn't managed by the pager, the child gets
    /// an empty arena instead of an error (§4.5).
    pub fn create(&mut self, parent_pid: Pid, child_pid: Pid) -> PagerResult<()> {
        trace!("create(parent={parent_pid}, child={child_pid})");
        let Some(parent) = self.processes.get(parent_pid) else {
            self.processes.insert(child_pid, ProcessControlBlock::new(&self.config));
            return Ok(());
        };

        if parent.swap_reserved > self.swap.num_available() {
            return Err(PagerError::SwapFull);
        }

        let child = parent.clone();
        let next_vpage = child.next_vpage;
        self.swap.charge(child.swap_reserved);
        self.processes.insert(child_pid, child);

        for vpn in 0..next_vpage {
            let disk_info = self.processes.get(parent_pid).unwrap().disk_info[vpn].clone();
            if !disk_info.valid {
                continue;
            }

            if !disk_info.file_backed {
                self.swap.add_sharer(disk_info.block, child_pid);

                let parent_pte = &mut self.processes.get_mut(parent_pid).unwrap().page_table[vpn];
                parent_pte.write_enable = false;
                let parent_resident = parent_pte.read_enable && parent_pte.ppage != 0;
                let parent_ppage = parent_pte.ppage;

                self.processes.get_mut(child_pid).unwrap().page_table[vpn].write_enable = false;

                if parent_resident {
                    self.frames.get_mut(parent_ppage).sharers.push(child_pid, vpn);
                }
            } else {
                self.file_index.entry(&disk_info.filename, disk_info.block).sharers.push(child_pid, vpn);

                let parent_pte = self.processes.get(parent_pid).unwrap().page_table[vpn];
                if parent_pte.read_enable && parent_pte.ppage != 0 {
                    self.frames.get_mut(parent_pte.ppage).sharers.push(child_pid, vpn);
                }
            }
        }

        self.trace_invariants("create");
        Ok(())
    }

    /// Rebinds the current process. Per the original's semantics, switching
    /// to an unmanaged pid silently creates an empty PCB for it (the same
    /// default-construct-on-first-use behavior `create` applies to an
    /// unmanaged parent).
    pub fn switch(&mut self, pid: Pid) {
        trace!("switch({pid})");
        if !self.processes.contains(pid) {
            self.processes.insert(pid, ProcessControlBlock::new(&self.config));
        }
        self.current_pid = Some(pid);
    }

    /// Tears down the current process: credits its swap reservation back,
    /// releases or reassigns every swap block and file-backed slot it held,
    /// and frees any frame left with no remaining sharers.
    pub fn destroy(&mut self) {
        let pid = self.require_current();
        trace!("destroy(current={pid})");

        self.refresh_all_reference_bits();

        let pcb = self.processes.get(pid).unwrap().clone();
        self.swap.refund(pcb.swap_reserved);

        for vpn in 0..pcb.next_vpage {
            let disk_info = &pcb.disk_info[vpn];
            if !disk_info.valid {
                continue;
            }

            if !disk_info.file_backed {
                self.swap.remove_sharer(disk_info.block, pid);
                if let Some(last_pid) = self.swap.sole_sharer(disk_info.block) {
                    let pte = &mut self.processes.get_mut(last_pid).unwrap().page_table[vpn];
                    if pte.read_enable && pte.ppage != 0 {
                        pte.set(None, Some(true), Some(true), None, None);
                    }
                }
            } else {
                self.file_index.entry(&disk_info.filename, disk_info.block).sharers.remove_pid(pid);
            }
        }

        if let Some(pcb) = self.processes.get_mut(pid) {
            for pte in &mut pcb.page_table {
                pte.clear();
            }
        }

        for frame in 1..self.frames.memory_pages() {
            self.frames.get_mut(frame).sharers.remove_pid(pid);

            let meta = self.frames.get(frame);
            if meta.sharers.is_empty() && !meta.file_backed {
                self.frames.release_frame(frame);
            }
        }

        self.processes.remove(pid);
        self.current_pid = None;
        self.trace_invariants("destroy");
    }

    /// Allocates the lowest invalid virtual page in the current process's
    /// arena. Returns `None` if the arena is already full, the swap file is
    /// full (swap-backed request), or the filename doesn't lie entirely in
    /// the valid arena (file-backed request).
    pub fn map(&mut self, filename_va: Option<usize>, block: usize) -> Option<usize> {
        let pid = self.require_current();
        let vpn = self.processes.get(pid).unwrap().next_vpage;
        if vpn >= self.config.n_vpages() {
            return None;
        }

        let address = self.config.page_address(vpn);

        match filename_va {
            None => {
                // §4.1: reserve() signals FULL once `num_swap_available`
                // hits zero, not merely once `open_swap` is empty — after a
                // fork, pessimistic accounting can exhaust the former while
                // the latter still holds physically free blocks earmarked
                // for a sibling's eventual COW split. Gate here rather than
                // inside `reserve()` itself, since the COW path (4.3b) also
                // calls `reserve()` and must keep drawing from that
                // pre-charged pool even once `num_swap_available` is 0.
                if self.swap.num_available() == 0 {
                    return None;
                }
                let swap_block = self.swap.reserve()?;
                self.swap.add_sharer(swap_block, pid);
                self.swap.charge(1);

                let pcb = self.processes.get_mut(pid).unwrap();
                pcb.disk_info[vpn] = DiskInfo { valid: true, file_backed: false, filename: String::new(), block: swap_block };
                pcb.page_table[vpn].set(Some(0), Some(true), Some(false), Some(false), Some(false));
                pcb.swap_reserved += 1;
                pcb.next_vpage += 1;
            }
            Some(va) => {
                let fname = self.read_filename_from_va(va).ok()?;

                let resident_ppn = self.file_index.get(&fname, block).map(|e| e.ppn).unwrap_or(0);

                if resident_ppn != 0 {
                    self.frames.get_mut(resident_ppn).sharers.push(pid, vpn);
                    self.file_index.entry(&fname, block).sharers.push(pid, vpn);

                    let pcb = self.processes.get_mut(pid).unwrap();
                    pcb.page_table[vpn].set(Some(resident_ppn), Some(true), Some(true), Some(false), Some(false));
                } else {
                    self.file_index.entry(&fname, block).sharers.push(pid, vpn);

                    let pcb = self.processes.get_mut(pid).unwrap();
                    pcb.page_table[vpn].clear();
                }

                let pcb = self.processes.get_mut(pid).unwrap();
                pcb.disk_info[vpn] = DiskInfo { valid: true, file_backed: true, filename: fname, block };
                pcb.next_vpage += 1;
            }
        }

        self.trace_invariants("map");
        Some(address)
    }
}
