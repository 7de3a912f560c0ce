use std::collections::{BTreeSet, VecDeque};

use crate::sharers::SharerSet;

/// Physical-frame metadata, one per frame including the pinned zero frame.
#[derive(Debug, Clone, Default)]
pub struct FrameMeta {
    pub frame: usize,
    pub referenced: bool,
    pub dirty: bool,
    pub file_backed: bool,
    /// Swap block or file block this frame is backed by. `None` when free.
    pub block: Option<usize>,
    pub filename: Option<String>,
    pub sharers: SharerSet,
}

impl FrameMeta {
    fn reset_free(&mut self) {
        self.referenced = false;
        self.dirty = false;
        self.file_backed = false;
        self.block = None;
        self.filename = None;
        self.sharers = SharerSet::default();
    }
}

/// Physical-frame table and the free-frame / clock-queue bookkeeping that
/// partitions `{1..memory_pages}` (frame 0 is pinned and never appears in
/// either set).
#[derive(Debug)]
pub struct FrameTable {
    frames: Vec<FrameMeta>,
    open_frames: BTreeSet<usize>,
    clock_queue: VecDeque<usize>,
}

impl FrameTable {
    pub fn new(memory_pages: usize) -> Self {
        let frames = (0..memory_pages).map(|frame| FrameMeta { frame, ..Default::default() }).collect();
        let open_frames = (1..memory_pages).collect();
        Self { frames, open_frames, clock_queue: VecDeque::new() }
    }

    pub fn get(&self, frame: usize) -> &FrameMeta {
        &self.frames[frame]
    }

    pub fn get_mut(&mut self, frame: usize) -> &mut FrameMeta {
        &mut self.frames[frame]
    }

    pub fn memory_pages(&self) -> usize {
        self.frames.len()
    }

    /// Non-pinned frame indices: `1..memory_pages`. Used for the
    /// reference/dirty refresh pass, which must touch every resident
    /// non-pinned frame, not just the ones currently in `clock_queue`.
    pub fn non_pinned_frames(&self) -> impl Iterator<Item = usize> {
        1..self.frames.len()
    }

    /// Removes and returns any open frame. `None` if no frame is free; the
    /// caller must then evict. Deliberately does *not* enqueue the frame
    /// onto the clock yet: the frame is under construction until the
    /// caller finishes populating its sharers and PTEs and calls
    /// [`Self::mark_resident`], so it must not be visible to eviction in
    /// the meantime (see the recursion hazard note on `evict`).
    pub fn take_open_frame(&mut self) -> Option<usize> {
        let frame = *self.open_frames.iter().next()?;
        self.open_frames.remove(&frame);
        Some(frame)
    }

    /// Returns a frame to the free pool, resetting its metadata and
    /// dropping it from the clock queue if present.
    pub fn release_frame(&mut self, frame: usize) {
        self.clock_queue.retain(|&f| f != frame);
        self.frames[frame].reset_free();
        self.open_frames.insert(frame);
    }

    /// Marks a freshly populated frame evict-eligible: removes it from the
    /// open pool (harmless if it wasn't there, e.g. it came from `evict`)
    /// and enqueues it onto the clock. Must be called only after the
    /// frame's sharers and every affected PTE have reached their final
    /// state for the current fault.
    pub fn mark_resident(&mut self, frame: usize) {
        self.open_frames.remove(&frame);
        if !self.clock_queue.contains(&frame) {
            self.clock_queue.push_back(frame);
        }
    }

    pub fn clock_queue(&self) -> &VecDeque<usize> {
        &self.clock_queue
    }

    pub fn clock_pop_front(&mut self) -> Option<usize> {
        self.clock_queue.pop_front()
    }

    pub fn clock_push_back(&mut self, frame: usize) {
        self.clock_queue.push_back(frame);
    }

    pub fn open_frames(&self) -> &BTreeSet<usize> {
        &self.open_frames
    }
}
