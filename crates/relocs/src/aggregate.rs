//! Turning the code generator's requests into the ordered list of records.

use aot_relocs_environ::{
    MethodContext, RecordFlags, RelocationKind, RelocationRequest, RelocationTarget,
    TargetWidth, Tunables,
};
use core::fmt;

/// What a normalized entry writes.
pub enum EntryTarget<W: TargetWidth> {
    /// A target requested by the code generator.
    Target(RelocationTarget),
    /// Trampolines reserved for the method's inline-cache slots.
    PicTrampolines(W::PicTrampolineCount),
}

impl<W: TargetWidth> EntryTarget<W> {
    /// The record kind written for this entry.
    pub fn kind(&self) -> RelocationKind {
        match self {
            EntryTarget::Target(target) => target.kind(),
            EntryTarget::PicTrampolines(_) => RelocationKind::PicTrampolines,
        }
    }
}

impl<W: TargetWidth> fmt::Debug for EntryTarget<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntryTarget::Target(target) => f.debug_tuple("Target").field(target).finish(),
            EntryTarget::PicTrampolines(count) => {
                f.debug_tuple("PicTrampolines").field(count).finish()
            }
        }
    }
}

/// One record to be written.
#[derive(Debug)]
pub struct NormalizedEntry<W: TargetWidth> {
    /// What the record refers to.
    pub target: EntryTarget<W>,
    /// Whether patch-site offsets are stored 32 bits wide.
    pub wide_offsets: bool,
}

impl<W: TargetWidth> NormalizedEntry<W> {
    /// The record kind written for this entry.
    pub fn kind(&self) -> RelocationKind {
        self.target.kind()
    }

    /// The flags byte of the record header.
    pub fn flags(&self) -> RecordFlags {
        if self.wide_offsets {
            RecordFlags::WIDE_OFFSETS
        } else {
            RecordFlags::empty()
        }
    }
}

/// The records of one compilation, in the order they are written.
#[derive(Debug)]
pub struct RelocationList<W: TargetWidth> {
    entries: Vec<NormalizedEntry<W>>,
}

impl<W: TargetWidth> RelocationList<W> {
    /// The entries in write order.
    pub fn entries(&self) -> &[NormalizedEntry<W>] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Normalizes the requests of one compilation.
///
/// Each request contributes its validation records followed by its own
/// target, in request order. When the target reserves trampolines for
/// inline-cache slots and the method has any, one trampoline count entry is
/// appended last. If any patch site of the method needs a 32-bit offset,
/// every entry is flagged as using wide offsets.
pub fn normalize<W: TargetWidth>(
    requests: &[RelocationRequest],
    method: &MethodContext,
    tunables: &Tunables,
) -> RelocationList<W> {
    debug_assert_eq!(tunables.pointer_width, W::WIDTH);
    let wide_offsets = requests.iter().any(|r| r.needs_wide_offsets());

    let mut entries = Vec::with_capacity(requests.len() + 1);
    for request in requests {
        for validation in &request.validations {
            entries.push(NormalizedEntry {
                target: EntryTarget::Target(RelocationTarget::Validation(*validation)),
                wide_offsets,
            });
        }
        entries.push(NormalizedEntry {
            target: EntryTarget::Target(request.target.clone()),
            wide_offsets,
        });
    }

    if tunables.needs_method_trampolines && method.pic_slot_count > 0 {
        match W::pic_trampolines(method.pic_slot_count) {
            Some(count) => entries.push(NormalizedEntry {
                target: EntryTarget::PicTrampolines(count),
                wide_offsets,
            }),
            None => log::trace!(
                "no trampolines reserved for {} inline-cache slots on {} targets",
                method.pic_slot_count,
                W::WIDTH
            ),
        }
    }

    RelocationList { entries }
}
