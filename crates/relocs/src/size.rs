//! The sizing pass.

use crate::aggregate::{NormalizedEntry, RelocationList};
use aot_relocs_environ::{PointerWidth, TargetWidth, relocation_size};

/// Serialized size of one entry, header included.
pub fn entry_size<W: TargetWidth>(entry: &NormalizedEntry<W>) -> usize {
    let size = relocation_size(entry.kind(), W::WIDTH);
    debug_assert!(size > 0, "{} records cannot be written", entry.kind());
    usize::from(size)
}

/// Size of the leading fields of a buffer: the region size, then the
/// well-known class chain offset when symbols are validated.
pub fn prefix_size(width: PointerWidth, validation: bool) -> usize {
    let pointer = usize::from(width.bytes());
    if validation { 2 * pointer } else { pointer }
}

/// Total size of the buffer holding `list`.
pub fn total_size<W: TargetWidth>(list: &RelocationList<W>, validation: bool) -> usize {
    prefix_size(W::WIDTH, validation) + list.entries().iter().map(entry_size).sum::<usize>()
}
