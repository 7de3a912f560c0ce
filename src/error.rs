/// Failure kinds surfaced by the pager (§7 of the spec this crate implements).
///
/// Every public entry point collapses this into the `0`/`-1`/`null` sentinel
/// its C-style counterpart would return; internal helpers thread it through
/// with `?` and never `unwrap`/`expect` it away.
#[derive(Debug, thiserror::Error)]
pub enum PagerError {
    #[error("virtual address {va:#x} is outside the arena or not mapped")]
    InvalidVa { va: usize },

    #[error("process arena is full")]
    ArenaFull,

    #[error("swap file has no free blocks")]
    SwapFull,

    #[error("filename string at {va:#x} does not lie entirely in the valid arena")]
    BadFilename { va: usize },

    #[error("I/O failure during {op}")]
    IoFail { op: &'static str },
}

pub type PagerResult<T> = Result<T, PagerError>;
