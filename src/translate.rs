use crate::error::{PagerError, PagerResult};
use crate::host::HostOps;
use crate::pager::Pager;

impl<H: HostOps> Pager<H> {
    /// Materializes the NUL-terminated filename string living at `start_va`
    /// in the current process's arena, faulting pages in read-only as it
    /// walks off the end of each one (§4.4). Used by `map`'s file-backed
    /// path: the filename is a string the caller wrote into its own arena,
    /// not a string the host hands over directly.
    pub(crate) fn read_filename_from_va(&mut self, start_va: usize) -> PagerResult<String> {
        let mut va = start_va;
        let mut out = String::new();
        loop {
            let byte = self.translate_byte(va).ok_or(PagerError::BadFilename { va: start_va })?;
            if byte == 0 {
                return Ok(out);
            }
            out.push(byte as char);
            va += 1;
        }
    }

    /// Translates `va` to its backing byte, faulting the page in read-only
    /// first if it isn't resident yet. `None` if `va` lies outside the
    /// arena or the fault-in itself fails.
    fn translate_byte(&mut self, va: usize) -> Option<u8> {
        let pid = self.current_pid?;
        let vpn = self.config.vpn_of(va)?;
        let offset = self.config.offset_in_page(va);

        let resident = self.processes.get(pid)?.page_table[vpn].read_enable;
        if !resident {
            self.fault(va, false).ok()?;
        }

        let frame = self.processes.get(pid)?.page_table[vpn].ppage;
        self.processes.get_mut(pid)?.page_table[vpn].referenced = true;

        let page_size = self.config.page_size;
        let mem = self.host.physmem();
        Some(mem[frame * page_size + offset])
    }
}
