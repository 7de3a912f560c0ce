/// The runtime surface the pager is linked against.
///
/// Stands in for the host's `file_read`/`file_write` callbacks and its
/// `physmem` byte window (§1, §6). Replacing the original's `extern`-linked
/// globals with a trait makes the pager generic over its embedding instead
/// of assuming a single global runtime, and lets tests substitute an
/// in-memory fake (see `tests/scenarios.rs`).
pub trait HostOps {
    /// Reads one block into `dst`. `filename = None` addresses the swap file.
    /// `dst.len()` is always exactly the pager's page size.
    /// Returns `false` on I/O failure.
    fn file_read(&mut self, filename: Option<&str>, block: usize, dst: &mut [u8]) -> bool;

    /// Writes one block from `src`. `filename = None` addresses the swap file.
    /// `src.len()` is always exactly the pager's page size.
    /// Returns `false` on I/O failure.
    fn file_write(&mut self, filename: Option<&str>, block: usize, src: &[u8]) -> bool;

    /// The physical memory window, `memory_pages * page_size` bytes.
    fn physmem(&mut self) -> &mut [u8];
}
