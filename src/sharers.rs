use crate::process::Pid;

/// Ordered multiset of `(pid, vpn)` pairs: the reverse mapping from a shared
/// resource (a frame, a file-backed block) back to every page table entry
/// that currently references it.
///
/// The original kept this as a `std::queue`, rotating entries through the
/// front/back to implement "remove all matching, keep the rest" without a
/// hash lookup; a plain insertion-ordered `Vec` gives the same semantics
/// (and the same "ordered" guarantee §3 calls for) without the rotation
/// dance.
#[derive(Debug, Clone, Default)]
pub struct SharerSet(Vec<(Pid, usize)>);

impl SharerSet {
    pub fn push(&mut self, pid: Pid, vpn: usize) {
        self.0.push((pid, vpn));
    }

    /// Removes every entry for `pid`, regardless of vpn.
    pub fn remove_pid(&mut self, pid: Pid) {
        self.0.retain(|&(p, _)| p != pid);
    }

    /// Removes the single entry `(pid, vpn)`, if present.
    pub fn remove(&mut self, pid: Pid, vpn: usize) {
        self.0.retain(|&(p, v)| !(p == pid && v == vpn));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pid, usize)> + '_ {
        self.0.iter().copied()
    }

    /// The sole entry, if there is exactly one.
    pub fn only(&self) -> Option<(Pid, usize)> {
        match self.0.as_slice() {
            [entry] => Some(*entry),
            _ => None,
        }
    }

    pub fn contains_pid(&self, pid: Pid) -> bool {
        self.0.iter().any(|&(p, _)| p == pid)
    }
}
