//! Allocating the relocation buffer and writing every record into it.

use crate::aggregate::{EntryTarget, NormalizedEntry, RelocationList, normalize};
use crate::emit::{EmitContext, FieldValues};
use crate::sink::RecordSink;
use crate::size::{entry_size, prefix_size, total_size};
use aot_relocs_environ::object::Endianness;
use aot_relocs_environ::{
    EncodeServices, FieldType, MethodContext, PointerWidth, Ptr32, Ptr64, RelocationError,
    RelocationRequest, RelocationTable, TargetWidth, Tunables, schema,
};
use log::{debug, trace, warn};
use smallvec::smallvec;

/// The finished relocation data of one compilation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelocationBuffer {
    data: Box<[u8]>,
    width: PointerWidth,
    endian: Endianness,
    has_well_known_offset: bool,
}

impl RelocationBuffer {
    /// The serialized bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pointer width the buffer was written for.
    pub fn width(&self) -> PointerWidth {
        self.width
    }

    /// Whether the well-known class chain offset follows the region size.
    pub fn has_well_known_offset(&self) -> bool {
        self.has_well_known_offset
    }

    /// Splits the buffer into its records.
    pub fn table(&self) -> anyhow::Result<RelocationTable<'_>> {
        RelocationTable::parse(
            &self.data,
            self.width,
            self.endian,
            self.has_well_known_offset,
        )
    }

    /// Takes the serialized bytes.
    pub fn into_data(self) -> Box<[u8]> {
        self.data
    }
}

/// Produces the relocation data of one compilation.
///
/// Returns `Ok(None)` when there is nothing to record: no requests and no
/// symbol validation. Any failure aborts relocation data generation for the
/// compilation as a whole.
pub fn process_relocations(
    requests: &[RelocationRequest],
    method: &MethodContext,
    tunables: &Tunables,
    services: EncodeServices<'_>,
) -> Result<Option<RelocationBuffer>, RelocationError> {
    let endian = tunables.byte_order.endianness();
    match tunables.pointer_width {
        PointerWidth::U32 => {
            let list = normalize::<Ptr32>(requests, method, tunables);
            encode(&list, method, endian, services)
        }
        PointerWidth::U64 => {
            let list = normalize::<Ptr64>(requests, method, tunables);
            encode(&list, method, endian, services)
        }
    }
}

/// Sizes, allocates and writes the buffer for a normalized list.
pub fn encode<W: TargetWidth>(
    list: &RelocationList<W>,
    method: &MethodContext,
    endian: Endianness,
    services: EncodeServices<'_>,
) -> Result<Option<RelocationBuffer>, RelocationError> {
    let validation = services.validation.is_enabled();
    if list.is_empty() && !validation {
        debug!("no relocation data needed");
        return Ok(None);
    }

    let width = W::WIDTH;
    let size = total_size(list, validation);
    debug!(
        "encoding {} relocation records in {size} bytes for a {width} target",
        list.len()
    );

    // The well-known classes are checked even without records, since they
    // may be why none were needed.
    let well_known_offset = if validation {
        let offsets = services.validation.well_known_class_chain_offsets();
        let offset = services.shared_cache.offset_of(offsets).ok_or_else(|| {
            let message = format!(
                "well-known class chain offsets {:#x} are not in the shared cache",
                offsets.0
            );
            warn!("{message}");
            RelocationError::AotDataGenerationFailed(message)
        })?;
        Some(offset)
    } else {
        None
    };

    let mut data = services.allocator.allocate(size).ok_or_else(|| {
        warn!("failed to allocate {size} bytes of relocation data");
        RelocationError::AllocationFailed { size }
    })?;
    if data.len() != size {
        warn!(
            "relocation allocator returned {} bytes for a {size} byte request",
            data.len()
        );
        return Err(RelocationError::AllocationFailed { size });
    }

    let (prefix, mut rest) = data.split_at_mut(prefix_size(width, validation));
    let mut sink = RecordSink::new(prefix, endian);
    sink.put_pointer(width, size as u64);
    if let Some(offset) = well_known_offset {
        sink.put_pointer(width, offset);
    }
    sink.finish();

    let cx = EmitContext::new(method, services);
    for entry in list.entries() {
        let (record, tail) = core::mem::take(&mut rest).split_at_mut(entry_size(entry));
        rest = tail;
        let values = match &entry.target {
            EntryTarget::Target(target) => cx.field_values(target).inspect_err(|e| {
                warn!("no relocation data for {} record: {e}", entry.kind());
            })?,
            EntryTarget::PicTrampolines(count) => {
                smallvec![u64::from(W::pic_trampoline_count(count))]
            }
        };
        let written = write_entry(RecordSink::new(record, endian), entry, &values);
        trace!("{} record: {written} bytes, fields {values:x?}", entry.kind());
    }
    debug_assert!(rest.is_empty());

    Ok(Some(RelocationBuffer {
        data: data.into_boxed_slice(),
        width,
        endian,
        has_well_known_offset: validation,
    }))
}

/// Writes the header and fields of one record, returning its size.
///
/// Panics if the values do not match the record's layout.
pub fn write_entry<W: TargetWidth>(
    mut sink: RecordSink<'_>,
    entry: &NormalizedEntry<W>,
    values: &FieldValues,
) -> usize {
    let width = W::WIDTH;
    let kind = entry.kind();
    let Some(schema) = schema(kind).filter(|s| s.is_supported(width)) else {
        unreachable!("{kind} records cannot be written on {width} targets");
    };
    assert_eq!(
        schema.fields().len(),
        values.len(),
        "wrong number of fields for {kind} record"
    );

    let size = sink.remaining();
    debug_assert_eq!(schema.size(width).map(usize::from), Some(size));
    sink.put2(size as u16);
    sink.put1(kind as u8);
    sink.put1(entry.flags().bits());
    let header_word = sink.offset();
    if width == PointerWidth::U64 {
        sink.put4(0);
    }

    for (field, &value) in schema.fields().iter().zip(values) {
        let narrow = |bits: u32| {
            assert!(
                value >> bits == 0,
                "{value:#x} does not fit the {bits}-bit field of a {kind} record"
            );
        };
        match (field, width) {
            (FieldType::HeaderWord, PointerWidth::U64) => {
                narrow(32);
                sink.patch4(header_word, value as u32);
                continue;
            }
            _ => sink.align_to(usize::from(field.align(width))),
        }
        match field {
            FieldType::Pointer => sink.put_pointer(width, value),
            FieldType::U32 | FieldType::HeaderWord => {
                narrow(32);
                sink.put4(value as u32);
            }
            FieldType::U16 => {
                narrow(16);
                sink.put2(value as u16);
            }
            FieldType::U8 => {
                narrow(8);
                sink.put1(value as u8);
            }
        }
    }
    sink.align_to(usize::from(schema.align(width)));
    sink.finish()
}
