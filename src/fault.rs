use log::trace;

use crate::error::{PagerError, PagerResult};
use crate::host::HostOps;
use crate::pager::Pager;
use crate::process::Pid;
use crate::sharers::SharerSet;

impl<H: HostOps> Pager<H> {
    /// Services a fault at `va` in the current process's arena (§4.3).
    /// Exactly one of four paths applies; none of them mutate pager state
    /// on failure (the only failure modes are `INVALID_VA` and `IO_FAIL`).
    pub fn fault(&mut self, va: usize, write_flag: bool) -> PagerResult<()> {
        trace!("fault(va={va:#x}, write={write_flag})");
        let pid = self.require_current();
        let vpn = self.config.vpn_of(va).ok_or(PagerError::InvalidVa { va })?;

        let pcb = self.processes.get(pid).ok_or(PagerError::InvalidVa { va })?;
        if !pcb.disk_info[vpn].valid {
            return Err(PagerError::InvalidVa { va });
        }
        let pte = pcb.page_table[vpn];
        let file_backed = pcb.disk_info[vpn].file_backed;

        let result = if file_backed && !pte.read_enable {
            self.fault_file_backed(pid, vpn)
        } else if pte.read_enable && !pte.write_enable {
            self.fault_cow_split(pid, vpn)
        } else if !pte.read_enable && !file_backed {
            self.fault_swap_nonresident(pid, vpn, write_flag)
        } else {
            // Already resident with full permissions: benign, can happen
            // after a read fault is immediately followed by a write fault
            // on a PTE that already had write_enable set.
            Ok(())
        };

        if result.is_ok() {
            self.trace_invariants("fault");
        }
        result
    }

    /// Path (a): file-backed page, non-resident. Reads the block in, then
    /// fans the resulting frame out to every process that has mapped the
    /// same `(filename, block)` — file-backed pages are shared read-write
    /// by construction, no copy-on-write between sharers.
    fn fault_file_backed(&mut self, pid: Pid, vpn: usize) -> PagerResult<()> {
        let d = self.processes.get(pid).unwrap().disk_info[vpn].clone();
        let frame = self.get_free_frame()?;

        if !self.read_block_into_frame(Some(&d.filename), d.block, frame) {
            self.frames.release_frame(frame);
            return Err(PagerError::IoFail { op: "file_read for file-backed fault" });
        }

        self.file_index.entry(&d.filename, d.block).ppn = frame;
        let sharers: Vec<_> = self.file_index.entry(&d.filename, d.block).sharers.iter().collect();
        for (p, v) in sharers {
            if let Some(pcb) = self.processes.get_mut(p) {
                pcb.page_table[v].set(Some(frame), Some(true), Some(true), Some(false), Some(false));
            }
            self.frames.get_mut(frame).sharers.push(p, v);
        }

        {
            let meta = self.frames.get_mut(frame);
            meta.file_backed = true;
            meta.block = Some(d.block);
            meta.filename = Some(d.filename);
            meta.referenced = false;
            meta.dirty = false;
        }
        self.frames.mark_resident(frame);
        Ok(())
    }

    /// Path (b): a swap-backed page that is resident and shared read-only —
    /// either the first write after fork to a page still mirrored by a
    /// sibling, or the first-ever write to a freshly `map`ped page (whose
    /// PTE initially points at the pinned zero frame). Splits the writer
    /// onto a private frame and, if needed, a private swap block.
    fn fault_cow_split(&mut self, pid: Pid, vpn: usize) -> PagerResult<()> {
        let old_frame = self.processes.get(pid).unwrap().page_table[vpn].ppage;

        // Frame 0 (the zero frame) is pinned and carries no reverse mapping
        // of its own: every never-written page points at it without being
        // tracked there, so there are no siblings to refresh or promote.
        if old_frame != 0 {
            let siblings: Vec<_> =
                self.frames.get(old_frame).sharers.iter().filter(|&(p, v)| !(p == pid && v == vpn)).collect();
            for (p, v) in siblings {
                if let Some(pcb) = self.processes.get_mut(p) {
                    pcb.page_table[v].referenced = true;
                }
            }
        }

        let new_frame = self.get_free_frame()?;
        self.copy_frame(old_frame, new_frame);

        if old_frame != 0 {
            self.frames.get_mut(old_frame).sharers.remove(pid, vpn);
            if let Some((p, v)) = self.frames.get(old_frame).sharers.only() {
                if let Some(pcb) = self.processes.get_mut(p) {
                    pcb.page_table[v].write_enable = true;
                }
            }
        }

        let mut block = self.processes.get(pid).unwrap().disk_info[vpn].block;
        if self.swap.sharer_count(block) > 1 {
            self.swap.remove_sharer(block, pid);
            block = self.swap.reserve().expect("pessimistic swap accounting guarantees a block for COW");
            self.swap.add_sharer(block, pid);
            self.processes.get_mut(pid).unwrap().disk_info[vpn].block = block;
        }

        self.processes.get_mut(pid).unwrap().page_table[vpn].set(
            Some(new_frame),
            Some(true),
            Some(true),
            Some(false),
            Some(false),
        );
        {
            let meta = self.frames.get_mut(new_frame);
            meta.sharers = SharerSet::default();
            meta.sharers.push(pid, vpn);
            meta.block = Some(block);
            meta.file_backed = false;
            meta.referenced = false;
            meta.dirty = false;
        }
        self.frames.mark_resident(new_frame);

        Ok(())
    }

    /// Path (c): swap-backed page, non-resident. Reads the block in once;
    /// if it's still shared among fork siblings, fans the frame out to all
    /// of them read-only, immediately splitting the writer onto a private
    /// copy if this fault was itself a write.
    fn fault_swap_nonresident(&mut self, pid: Pid, vpn: usize, write_flag: bool) -> PagerResult<()> {
        let block = self.processes.get(pid).unwrap().disk_info[vpn].block;
        let frame = self.get_free_frame()?;

        if !self.read_block_into_frame(None, block, frame) {
            self.frames.release_frame(frame);
            return Err(PagerError::IoFail { op: "file_read for swap-backed fault" });
        }

        if self.swap.sharer_count(block) > 1 {
            let sharers: Vec<_> = self.swap.sharers(block).collect();
            for p in sharers {
                if let Some(pcb) = self.processes.get_mut(p) {
                    pcb.page_table[vpn].set(Some(frame), Some(true), Some(false), Some(false), Some(write_flag));
                }
                self.frames.get_mut(frame).sharers.push(p, vpn);
            }
            {
                let meta = self.frames.get_mut(frame);
                meta.referenced = write_flag;
                meta.block = Some(block);
                meta.file_backed = false;
                meta.dirty = false;
            }

            if write_flag {
                // The writer's PTE now matches path (b)'s precondition
                // exactly (resident, read-only): reuse it to split the
                // writer onto a private frame while siblings keep sharing
                // `frame` read-only.
                self.fault_cow_split(pid, vpn)?;
            }
            self.frames.mark_resident(frame);
        } else {
            self.processes.get_mut(pid).unwrap().page_table[vpn].set(
                Some(frame),
                Some(true),
                Some(true),
                Some(false),
                Some(false),
            );
            self.frames.get_mut(frame).sharers.push(pid, vpn);
            {
                let meta = self.frames.get_mut(frame);
                meta.referenced = false;
                meta.block = Some(block);
                meta.file_backed = false;
                meta.dirty = false;
            }
            self.frames.mark_resident(frame);
        }

        Ok(())
    }

    fn read_block_into_frame(&mut self, filename: Option<&str>, block: usize, frame: usize) -> bool {
        let page_size = self.config.page_size;
        let dst = {
            let mem = self.host.physmem();
            &mut mem[frame * page_size..frame * page_size + page_size]
        };
        self.host.file_read(filename, block, dst)
    }

    fn copy_frame(&mut self, src: usize, dst: usize) {
        let page_size = self.config.page_size;
        let mut buf = vec![0u8; page_size];
        {
            let mem = self.host.physmem();
            buf.copy_from_slice(&mem[src * page_size..src * page_size + page_size]);
        }
        let mem = self.host.physmem();
        mem[dst * page_size..dst * page_size + page_size].copy_from_slice(&buf);
    }
}
