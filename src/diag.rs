use crate::host::HostOps;
use crate::pager::Pager;

impl<H: HostOps> Pager<H> {
    /// Cross-checks every piece of reverse-mapping bookkeeping the pager
    /// keeps against the page tables it derives from, returning every
    /// violation found rather than panicking on the first one. Ported from
    /// the original's `check_states`, which the original called after every
    /// mutating operation under a debug build; here it's opt-in, meant for
    /// tests and any host that wants to call it after its own operations.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();

        if self.frames.open_frames().contains(&0) {
            violations.push("frame 0 (pinned) must never be in the open pool".into());
        }

        for (pid, pcb) in self.processes.iter() {
            for vpn in 0..pcb.next_vpage {
                let disk_info = &pcb.disk_info[vpn];
                if !disk_info.valid {
                    continue;
                }
                let pte = pcb.page_table[vpn];

                if disk_info.file_backed {
                    if disk_info.filename.is_empty() {
                        violations.push(format!("pid {pid} vpn {vpn}: file-backed page has an empty filename"));
                    }
                    continue;
                }

                let sharers = self.swap.sharer_count(disk_info.block);
                if sharers > 1 && pte.write_enable {
                    violations.push(format!(
                        "pid {pid} vpn {vpn}: swap block {} is shared by {sharers} pids but write_enable is set",
                        disk_info.block
                    ));
                }
                if sharers == 1 && pte.ppage != 0 && pte.read_enable && !pte.write_enable {
                    violations.push(format!(
                        "pid {pid} vpn {vpn}: sole sharer of swap block {} is resident and readable but not writable",
                        disk_info.block
                    ));
                }
                if self.swap.is_free(disk_info.block) {
                    violations.push(format!(
                        "pid {pid} vpn {vpn}: swap block {} backs a valid page but is marked free",
                        disk_info.block
                    ));
                }
            }
        }

        for frame in self.frames.non_pinned_frames() {
            let meta = self.frames.get(frame);
            let n = meta.sharers.len();

            if n > 0 && meta.block.is_none() {
                violations.push(format!("frame {frame}: has sharers but no backing block"));
            }
            if n == 0 && !meta.file_backed && meta.block.is_some() {
                violations.push(format!("frame {frame}: free swap-backed frame still carries a block"));
            }
            if !meta.file_backed && meta.filename.is_some() {
                violations.push(format!("frame {frame}: not file-backed but carries a filename"));
            }

            for (pid, vpn) in meta.sharers.iter() {
                let Some(pcb) = self.processes.get(pid) else {
                    violations.push(format!("frame {frame}: sharer pid {pid} no longer exists"));
                    continue;
                };
                let pte = pcb.page_table[vpn];
                let disk_info = &pcb.disk_info[vpn];

                if disk_info.file_backed != meta.file_backed {
                    violations.push(format!("frame {frame}: file_backed mismatch with sharer pid {pid} vpn {vpn}"));
                }
                if pte.ppage != frame {
                    violations.push(format!(
                        "frame {frame}: sharer pid {pid} vpn {vpn} has pte.ppage={} instead",
                        pte.ppage
                    ));
                }
                if disk_info.block != meta.block {
                    violations.push(format!("frame {frame}: sharer pid {pid} vpn {vpn} disk block mismatch"));
                }
            }
        }

        for (filename, blocks) in self.file_index.iter() {
            for (block, entry) in blocks {
                if entry.ppn != 0 {
                    let frame_sharers = self.frames.get(entry.ppn).sharers.len();
                    if entry.sharers.len() != frame_sharers {
                        violations.push(format!(
                            "file {filename} block {block}: {} index sharers but frame {} has {frame_sharers}",
                            entry.sharers.len(),
                            entry.ppn
                        ));
                    }
                }
                for (pid, vpn) in entry.sharers.iter() {
                    let Some(pcb) = self.processes.get(pid) else { continue };
                    let pte = pcb.page_table[vpn];
                    if entry.ppn == 0 && pte.read_enable {
                        violations.push(format!(
                            "file {filename} block {block}: non-resident but pid {pid} vpn {vpn} is readable"
                        ));
                    }
                    if pte.read_enable && pte.ppage != entry.ppn {
                        violations.push(format!(
                            "file {filename} block {block}: pid {pid} vpn {vpn} readable but points at frame {} instead of {}",
                            pte.ppage, entry.ppn
                        ));
                    }
                }
            }
        }

        violations
    }
}
