use log::trace;

use crate::error::{PagerError, PagerResult};
use crate::host::HostOps;
use crate::pager::Pager;

impl<H: HostOps> Pager<H> {
    /// Returns a frame ready to receive new content: from the open pool if
    /// one exists, otherwise by evicting (§4.2). The caller owns the frame
    /// until it calls [`crate::frame::FrameTable::mark_resident`] once its
    /// sharers and PTEs are fully populated; until then the frame cannot be
    /// chosen as an eviction victim, because it isn't in `clock_queue`.
    pub(crate) fn get_free_frame(&mut self) -> PagerResult<usize> {
        if let Some(frame) = self.frames.take_open_frame() {
            return Ok(frame);
        }
        self.evict()
    }

    /// OR's every sharer's `referenced`/`dirty` PTE bits up into the
    /// frame's own metadata. Hardware writes these bits to the PTE, not to
    /// the frame, so any decision consulting them must refresh first
    /// (§4.2 step 1, §9 "refresh-before-decide").
    pub(crate) fn refresh_frame_bits(&mut self, frame: usize) {
        let sharers: Vec<_> = self.frames.get(frame).sharers.iter().collect();
        let mut referenced = false;
        let mut dirty = false;
        for (pid, vpn) in sharers {
            if let Some(pcb) = self.processes.get(pid) {
                let pte = pcb.page_table[vpn];
                referenced |= pte.referenced;
                dirty |= pte.dirty;
            }
        }
        if referenced {
            self.frames.get_mut(frame).referenced = true;
        }
        if dirty {
            self.frames.get_mut(frame).dirty = true;
        }
    }

    pub(crate) fn refresh_all_reference_bits(&mut self) {
        for frame in self.frames.non_pinned_frames().collect::<Vec<_>>() {
            self.refresh_frame_bits(frame);
        }
    }

    /// One-handed clock eviction (§4.2): refreshes every non-pinned
    /// frame's bits, then scans the clock queue clearing `referenced` on
    /// anything it passes (on both the frame and its sharers' PTEs) until
    /// it finds a frame already at `referenced == false`, which becomes
    /// the victim. Writes it back if dirty, invalidates every sharer's
    /// PTE, and returns it to the free pool.
    ///
    /// The victim is popped out of `clock_queue` rather than rotated back
    /// in: a frame under active reconstruction by the current fault must
    /// not be selectable again until the caller re-marks it resident (§9,
    /// Open Question 3's recursion hazard).
    pub(crate) fn evict(&mut self) -> PagerResult<usize> {
        self.refresh_all_reference_bits();

        let victim = loop {
            let frame = self.frames.clock_pop_front().expect("clock queue exhausted without a victim");
            if !self.frames.get(frame).referenced {
                break frame;
            }
            self.frames.get_mut(frame).referenced = false;
            let sharers: Vec<_> = self.frames.get(frame).sharers.iter().collect();
            for (pid, vpn) in sharers {
                if let Some(pcb) = self.processes.get_mut(pid) {
                    pcb.page_table[vpn].referenced = false;
                }
            }
            self.frames.clock_push_back(frame);
        };

        trace!("evict: selected victim frame {victim}");

        if self.frames.get(victim).dirty {
            let meta = self.frames.get(victim).clone();
            let page_size = self.config.page_size;
            let bytes = {
                let mem = self.host.physmem();
                mem[victim * page_size..victim * page_size + page_size].to_vec()
            };
            let block = meta.block.expect("dirty frame must be backed by a block");
            let ok = self.host.file_write(meta.filename.as_deref(), block, &bytes);
            if !ok {
                // Roll the victim straight back into the clock queue: eviction
                // failed, the frame is still resident and unchanged.
                self.frames.clock_push_back(victim);
                return Err(PagerError::IoFail { op: "writeback during eviction" });
            }
        }

        let meta = self.frames.get(victim).clone();
        if meta.file_backed {
            let filename = meta.filename.as_deref().expect("file-backed frame must have a filename");
            let block = meta.block.expect("file-backed frame must have a block");
            self.file_index.entry(filename, block).ppn = 0;
        }

        for (pid, vpn) in meta.sharers.iter() {
            if let Some(pcb) = self.processes.get_mut(pid) {
                pcb.page_table[vpn].clear();
            }
        }

        self.frames.release_frame(victim);
        Ok(victim)
    }
}
