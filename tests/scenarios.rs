//! Whole-pager integration tests, one per numbered end-to-end scenario.
//!
//! All scenarios share the same layout: `PAGESIZE=1024`, `memory_pages=4`
//! (so 3 usable frames beyond the pinned zero frame), `swap_blocks=8`,
//! `ARENA_BASE=0x6000_0000`.

use std::collections::{HashMap, HashSet};

use pager::{HostOps, PagerConfig, PagerError, Pager};

fn config() -> PagerConfig {
    PagerConfig { arena_base: 0x6000_0000, arena_size: 4 * 1024, page_size: 1024, memory_pages: 4, swap_blocks: 8 }
}

/// Fake host runtime: flat physical memory, a flat swap region, and a set
/// of named files, each backed by a plain byte vector. `file_read`/
/// `file_write` can be told to fail once for a given `(name, block)` pair.
struct InMemoryHost {
    physmem: Vec<u8>,
    swap: Vec<u8>,
    files: HashMap<String, Vec<u8>>,
    page_size: usize,
    fail_reads: HashSet<(Option<String>, usize)>,
}

impl InMemoryHost {
    fn new(config: &PagerConfig) -> Self {
        Self {
            physmem: vec![0u8; config.memory_pages * config.page_size],
            swap: vec![0u8; config.swap_blocks * config.page_size],
            files: HashMap::new(),
            page_size: config.page_size,
            fail_reads: HashSet::new(),
        }
    }

    fn fail_next_read(&mut self, name: Option<&str>, block: usize) {
        self.fail_reads.insert((name.map(str::to_string), block));
    }

    fn slice_for(&mut self, filename: &str, block: usize) -> &mut [u8] {
        let page_size = self.page_size;
        let file = self.files.entry(filename.to_string()).or_default();
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
            Some(name) => dst.copy_from_slice(self.slice_for(name, block)),
        }
        true
    }

    fn file_write(&mut self, filename: Option<&str>, block: usize, src: &[u8]) -> bool {
        let page_size = self.page_size;
        match filename {
            None => self.swap[block * page_size..(block + 1) * page_size].copy_from_slice(src),
            Some(name) => self.slice_for(name, block).copy_from_slice(src),
        }
        true
    }

    fn physmem(&mut self) -> &mut [u8] {
        &mut self.physmem
    }
}

fn byte_at(pager: &mut Pager<InMemoryHost>, va: usize) -> u8 {
    let pid = pager.current_pid().unwrap();
    let vpn = pager.config().vpn_of(va).unwrap();
    let offset = pager.config().offset_in_page(va);
    let frame = pager.page_table_base_register().unwrap()[vpn].ppage;
    let page_size = pager.config().page_size;
    let _ = pid;
    pager_memory(pager)[frame * page_size + offset]
}

/// Simulates a hardware write access: pokes the byte through the frame and
/// sets `referenced`/`dirty` on the PTE the way the MMU would, since
/// `refresh_frame_bits` (clock.rs) only ever reads those bits back out of
/// the PTE, it never originates them.
fn write_byte(pager: &mut Pager<InMemoryHost>, va: usize, value: u8) {
    let vpn = pager.config().vpn_of(va).unwrap();
    let offset = pager.config().offset_in_page(va);
    let page_table = pager.page_table_base_register().unwrap();
    let frame = page_table[vpn].ppage;
    page_table[vpn].referenced = true;
    page_table[vpn].dirty = true;
    let page_size = pager.config().page_size;
    pager_memory(pager)[frame * page_size + offset] = value;
}

/// `HostOps::physmem` is the only way to reach the raw bytes; exposed here
/// under a distinct name so call sites read as "the memory behind the
/// pager's frames" rather than a host callback.
fn pager_memory<'a>(pager: &'a mut Pager<InMemoryHost>) -> &'a mut [u8] {
    pager.host_mut().physmem()
}

#[test]
fn scenario_1_fresh_swap_page_reads_as_zero() {
    let cfg = config();
    let mut pager = Pager::init(cfg, InMemoryHost::new(&cfg));
    pager.create(0, 1).unwrap();
    pager.switch(1);
    let p = pager.map(None, 0).unwrap();
    pager.fault(p, false).unwrap();
    assert_eq!(byte_at(&mut pager, p), 0);
}

#[test]
fn scenario_2_eviction_round_trip_preserves_written_content() {
    let cfg = config();
    let mut pager = Pager::init(cfg, InMemoryHost::new(&cfg));
    pager.switch(1);

    let p = pager.map(None, 0).unwrap();
    pager.fault(p, true).unwrap();
    write_byte(&mut pager, p, b'A');

    // Force eviction: map and fault three more swap pages than there are
    // free frames, so the clock has to reclaim `p`'s frame.
    for block in 1..=3 {
        let q = pager.map(None, block).unwrap();
        pager.fault(q, true).unwrap();
        write_byte(&mut pager, q, b'Q');
    }

    pager.fault(p, false).unwrap();
    assert_eq!(byte_at(&mut pager, p), b'A');
}

#[test]
fn scenario_3_fork_isolation_and_cow_independence() {
    let cfg = config();
    let mut pager = Pager::init(cfg, InMemoryHost::new(&cfg));
    pager.switch(1);
    let vp = pager.map(None, 0).unwrap();
    pager.fault(vp, true).unwrap();
    write_byte(&mut pager, vp, b'X');

    pager.create(1, 2).unwrap();

    pager.switch(2);
    pager.fault(vp, false).unwrap();
    assert_eq!(byte_at(&mut pager, vp), b'X', "fork isolation: child sees parent's pre-fork content");

    pager.fault(vp, true).unwrap();
    write_byte(&mut pager, vp, b'Y');
    assert_eq!(byte_at(&mut pager, vp), b'Y');

    pager.switch(1);
    pager.fault(vp, false).unwrap();
    assert_eq!(byte_at(&mut pager, vp), b'X', "COW independence: parent unaffected by child's write");
}

#[test]
fn scenario_4_shared_file_backed_view_and_writeback() {
    let cfg = config();
    let mut pager = Pager::init(cfg, InMemoryHost::new(&cfg));

    pager.switch(1);
    let name_p = write_filename(&mut pager, 0, "f");
    let p = pager.map(Some(name_p), 0).unwrap();

    pager.switch(2);
    let name_q = write_filename(&mut pager, 0, "f");
    let q = pager.map(Some(name_q), 0).unwrap();
    assert_eq!(p, q);

    pager.switch(1);
    pager.fault(p, true).unwrap();
    write_byte(&mut pager, p, b'Z');

    pager.switch(2);
    pager.fault(q, false).unwrap();
    assert_eq!(byte_at(&mut pager, q), b'Z', "shared view: Q sees P's write with no COW split");

    // Force eviction of the shared frame, then fault it back in: the
    // content must have been written back to the file and re-read from it.
    // A third, otherwise-uninvolved process does the forcing: P and Q have
    // each already used two of their four vpns, leaving too little arena
    // room to cycle the clock hand all the way around to the shared frame.
    pager.switch(3);
    for block in 1..=3 {
        let r = pager.map(None, block).unwrap();
        pager.fault(r, true).unwrap();
    }

    pager.switch(2);
    pager.fault(q, false).unwrap();
    assert_eq!(byte_at(&mut pager, q), b'Z');
}

/// Pessimistic fork accounting can exhaust `num_swap_available` before the
/// physical `open_swap` pool itself runs dry: with 3 blocks total, P reserves
/// one, forks (pessimistically re-charging the same count to C), then P
/// reserves the last accounting unit for itself. A further `map` on either
/// process must fail even though one block is still sitting unused in
/// `open_swap`, held back for a COW split that hasn't happened yet.
#[test]
fn scenario_5_fork_reservation_can_exhaust_swap_before_the_physical_pool_does() {
    let cfg = PagerConfig { swap_blocks: 3, ..config() };
    let mut pager = Pager::init(cfg, InMemoryHost::new(&cfg));
    pager.switch(1);
    assert!(pager.map(None, 0).is_some());

    pager.create(1, 2).unwrap();

    assert!(pager.map(None, 0).is_some(), "one accounting unit still available to P");
    assert_eq!(pager.map(None, 0), None, "swap fully committed to P and C's pessimistic reservations");
    pager.switch(2);
    assert_eq!(pager.map(None, 0), None, "C's own reservation is equally exhausted");
}

/// When the parent has already reserved every swap block, forking cannot
/// pessimistically double that reservation: §4.5 requires `create` to fail
/// with no state mutated rather than leave the child half-constructed.
#[test]
fn scenario_5b_fork_fails_once_the_parent_alone_has_reserved_all_swap() {
    let cfg = PagerConfig { swap_blocks: 2, ..config() };
    let mut pager = Pager::init(cfg, InMemoryHost::new(&cfg));
    pager.switch(1);
    assert!(pager.map(None, 0).is_some());
    assert!(pager.map(None, 1).is_some());

    let err = pager.create(1, 2).unwrap_err();
    assert!(matches!(err, PagerError::SwapFull));
}

#[test]
fn scenario_6_io_fail_on_file_backed_fault_leaves_state_clean() {
    let cfg = config();
    let mut pager = Pager::init(cfg, InMemoryHost::new(&cfg));
    pager.switch(1);
    let name_va = write_filename(&mut pager, 0, "name");
    let p = pager.map(Some(name_va), 3).unwrap();

    pager.host_mut().fail_next_read(Some("name"), 3);
    let err = pager.fault(p, false).unwrap_err();
    assert!(matches!(err, PagerError::IoFail { .. }));

    let vpn = pager.config().vpn_of(p).unwrap();
    assert!(!pager.page_table_base_register().unwrap()[vpn].read_enable, "PTE left cleared on IO_FAIL");
}

/// Maps a swap page, write-faults it in, writes `name\0` through it, and
/// returns its arena address — the arena-resident string `map`'s
/// file-backed path expects as its filename argument.
fn write_filename(pager: &mut Pager<InMemoryHost>, swap_block: usize, name: &str) -> usize {
    let va = pager.map(None, swap_block).unwrap();
    pager.fault(va, true).unwrap();
    for (i, &b) in name.as_bytes().iter().chain(std::iter::once(&0u8)).enumerate() {
        write_byte(pager, va + i, b);
    }
    va
}
