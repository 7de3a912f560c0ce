/// Per-virtual-page disk location, one per arena slot.
///
/// `block` indexes into the swap file when `!file_backed`, or into the named
/// file otherwise. Meaningless until `valid`.
#[derive(Debug, Clone, Default)]
pub struct DiskInfo {
    pub valid: bool,
    pub file_backed: bool,
    pub filename: String,
    pub block: usize,
}
