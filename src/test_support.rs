use std::collections::{HashMap, HashSet};

use crate::host::HostOps;

/// In-memory stand-in for the host runtime, used by every `#[cfg(test)]`
/// module in this crate. Physical memory and the swap file are flat byte
/// vectors; named files grow lazily on first touch. `file_read`/`file_write`
/// can be made to fail once for a given `(name, block)` pair, which is how
/// the IO_FAIL scenarios are exercised without a real disk.
pub(crate) struct InMemoryHost {
    physmem: Vec<u8>,
    swap: Vec<u8>,
    files: HashMap<String, Vec<u8>>,
    page_size: usize,
    fail_reads: HashSet<(Option<String>, usize)>,
    fail_writes: HashSet<(Option<String>, usize)>,
}

impl InMemoryHost {
    pub(crate) fn new(memory_pages: usize, swap_blocks: usize, page_size: usize) -> Self {
        Self {
            physmem: vec![0u8; memory_pages * page_size],
            swap: vec![0u8; swap_blocks * page_size],
            files: HashMap::new(),
            page_size,
            fail_reads: HashSet::new(),
            fail_writes: HashSet::new(),
        }
    }

    pub(crate) fn fail_next_read(&mut self, name: Option<&str>, block: usize) {
        self.fail_reads.insert((name.map(str::to_string), block));
    }

    pub(crate) fn fail_next_write(&mut self, name: Option<&str>, block: usize) {
        self.fail_writes.insert((name.map(str::to_string), block));
    }

    pub(crate) fn byte(&self, frame: usize, offset: usize) -> u8 {
        self.physmem[frame * self.page_size + offset]
    }

    fn file_slice(&mut self, name: &str, block: usize) -> &mut [u8] {
        let page_size = self.page_size;
        let file = self.files.entry(name.to_string()).or_default();
        if file.len() < (block + 1) * page_size {
            file.resize((block + 1) * page_size, 0);
        }
        &mut file[block * page_size..(block + 1) * page_size]
    }
}

impl HostOps for InMemoryHost {
    fn file_read(&mut self, filename: Option<&str>, block: usize, dst: &mut [u8]) -> bool {
        if self.fail_reads.remove(&(filename.map(str::to_string), block)) {
            return false;
        }
        let page_size = self.page_size;
        match filename {
            None => dst.copy_from_slice(&self.swap[block * page_size..(block + 1) * page_size]),
            Some(name) => dst.copy_from_slice(self.file_slice(name, block)),
        }
        true
    }

    fn file_write(&mut self, filename: Option<&str>, block: usize, src: &[u8]) -> bool {
        if self.fail_writes.remove(&(filename.map(str::to_string), block)) {
            return false;
        }
        let page_size = self.page_size;
        match filename {
            None => self.swap[block * page_size..(block + 1) * page_size].copy_from_slice(src),
            Some(name) => self.file_slice(name, block).copy_from_slice(src),
        }
        true
    }

    fn physmem(&mut self) -> &mut [u8] {
        &mut self.physmem
    }
}

pub(crate) fn tiny_config() -> crate::config::PagerConfig {
    crate::config::PagerConfig { arena_base: 0x6000_0000, arena_size: 4 * 1024, page_size: 1024, memory_pages: 4, swap_blocks: 8 }
}
