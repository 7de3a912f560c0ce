/// Hardware-format page table entry, mutated in place by the pager and read
/// directly by the host's MMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageTableEntry {
    pub ppage: usize,
    pub read_enable: bool,
    pub write_enable: bool,
    pub referenced: bool,
    pub dirty: bool,
}

impl PageTableEntry {
    /// A PTE with no permissions, pointing at frame 0.
    pub const fn cleared() -> Self {
        Self { ppage: 0, read_enable: false, write_enable: false, referenced: false, dirty: false }
    }

    /// Sets only the fields given `Some`, leaving the rest untouched.
    ///
    /// Mirrors the original's `set_pte_bits` (which used `-1` as "leave
    /// unchanged" for each `int` parameter); `Option` makes that sentinel
    /// explicit instead of relying on a magic negative value.
    pub fn set(
        &mut self,
        ppage: Option<usize>,
        read_enable: Option<bool>,
        write_enable: Option<bool>,
        dirty: Option<bool>,
        referenced: Option<bool>,
    ) {
        if let Some(v) = ppage {
            self.ppage = v;
        }
        if let Some(v) = read_enable {
            self.read_enable = v;
        }
        if let Some(v) = write_enable {
            self.write_enable = v;
        }
        if let Some(v) = dirty {
            self.dirty = v;
        }
        if let Some(v) = referenced {
            self.referenced = v;
        }
    }

    /// Resets the entry to its non-resident, no-permission state.
    pub fn clear(&mut self) {
        *self = Self::cleared();
    }
}
