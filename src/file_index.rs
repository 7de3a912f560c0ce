use std::collections::BTreeMap;

use crate::sharers::SharerSet;

/// One `(filename, block)` slot: which frame currently holds it (`0` if
/// non-resident) and every `(pid, vpn)` mapped to it.
#[derive(Debug, Clone, Default)]
pub struct FileBackedEntry {
    pub ppn: usize,
    pub sharers: SharerSet,
}

/// Maps `filename -> block -> FileBackedEntry`.
///
/// Entries are created lazily on first `map` and never removed, even once
/// their sharer set empties out — the original never garbage-collected
/// these and this rewrite preserves that (§3, Open Question 1).
#[derive(Debug, Default)]
pub struct FileIndex {
    index: BTreeMap<String, BTreeMap<usize, FileBackedEntry>>,
}

impl FileIndex {
    pub fn entry(&mut self, filename: &str, block: usize) -> &mut FileBackedEntry {
        self.index.entry(filename.to_string()).or_default().entry(block).or_default()
    }

    pub fn get(&self, filename: &str, block: usize) -> Option<&FileBackedEntry> {
        self.index.get(filename)?.get(&block)
    }

    /// Every `(filename, block -> entry)` group, for the invariant checker.
    pub fn iter(&self) -> impl Iterator<Item = (&str, impl Iterator<Item = (usize, &FileBackedEntry)>)> {
        self.index.iter().map(|(name, blocks)| (name.as_str(), blocks.iter().map(|(&b, e)| (b, e))))
    }
}
