//! A demand-paging virtual memory manager.
//!
//! Each managed process owns a flat arena of virtual pages backed either by
//! a swap block or by a block of a named file. Pages are faulted in lazily,
//! shared copy-on-write across `fork`, and evicted with a one-handed clock
//! algorithm when physical memory runs out. The manager itself never touches
//! disk or physical memory directly — it drives an embedding [`HostOps`]
//! implementation that does.
//!
//! The six entry points ([`Pager::init`], [`Pager::create`],
//! [`Pager::switch`], [`Pager::fault`], [`Pager::destroy`], [`Pager::map`])
//! mirror the lifecycle a kernel's MMU and scheduler would drive: `init`
//! once, `switch` on every context switch, `fault` on every access
//! violation, `create` on `fork`, `destroy` on process exit, and `map` when
//! a process extends its arena.

#![forbid(unsafe_op_in_unsafe_fn)]

mod clock;
mod config;
mod disk_info;
#[cfg(debug_assertions)]
mod diag;
mod error;
mod fault;
mod file_index;
mod frame;
mod host;
mod pager;
mod process;
mod pte;
mod sharers;
mod swap;
#[cfg(test)]
mod test_support;
mod translate;

pub use config::PagerConfig;
pub use error::{PagerError, PagerResult};
pub use host::HostOps;
pub use pager::Pager;
pub use process::Pid;
pub use pte::PageTableEntry;
