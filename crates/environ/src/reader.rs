//! Walking finished relocation buffers.
//!
//! This only splits a buffer into its records and decodes their fields; it
//! never applies a relocation. It is used for diagnostics and to check the
//! encoder's output.

use crate::schema::{FieldType, RecordFlags, align_up, schema};
use crate::{PointerWidth, RelocationKind};
use anyhow::{Context, Result, anyhow, bail};
use object::endian::{Endianness, U16, U32, U64};
use object::Bytes;
use smallvec::SmallVec;

fn read_pointer(data: &mut Bytes<'_>, width: PointerWidth, endian: Endianness) -> Result<u64> {
    let value = match width {
        PointerWidth::U32 => data
            .read::<U32<Endianness>>()
            .map(|v| u64::from(v.get(endian))),
        PointerWidth::U64 => data.read::<U64<Endianness>>().map(|v| v.get(endian)),
    };
    value.map_err(|_| anyhow!("Unable to read {width} pointer"))
}

/// A relocation buffer split into its parts.
#[derive(Clone, Debug)]
pub struct RelocationTable<'a> {
    width: PointerWidth,
    endian: Endianness,
    region_size: u64,
    well_known_class_chain_offset: Option<u64>,
    records: &'a [u8],
}

impl<'a> RelocationTable<'a> {
    /// Parses the leading fields of a relocation buffer.
    ///
    /// `has_well_known_offset` tells whether the buffer was written with
    /// symbol validation enabled, which the buffer itself does not record.
    pub fn parse(
        data: &'a [u8],
        width: PointerWidth,
        endian: Endianness,
        has_well_known_offset: bool,
    ) -> Result<RelocationTable<'a>> {
        let mut bytes = Bytes(data);
        let region_size =
            read_pointer(&mut bytes, width, endian).context("Unable to read region size")?;
        if usize::try_from(region_size).ok() != Some(data.len()) {
            bail!(
                "region size {region_size} does not match buffer length {}",
                data.len()
            );
        }
        let well_known_class_chain_offset = if has_well_known_offset {
            Some(
                read_pointer(&mut bytes, width, endian)
                    .context("Unable to read well-known class chain offset")?,
            )
        } else {
            None
        };
        Ok(RelocationTable {
            width,
            endian,
            region_size,
            well_known_class_chain_offset,
            records: bytes.0,
        })
    }

    /// Total size of the buffer, as recorded in it.
    pub fn region_size(&self) -> u64 {
        self.region_size
    }

    /// Shared cache offset of the well-known class chains, if present.
    pub fn well_known_class_chain_offset(&self) -> Option<u64> {
        self.well_known_class_chain_offset
    }

    /// Iterates over the records in the order they were written.
    pub fn records(&self) -> Records<'a> {
        Records {
            width: self.width,
            endian: self.endian,
            data: self.records,
        }
    }
}

/// Iterator over the records of a [`RelocationTable`].
#[derive(Clone, Debug)]
pub struct Records<'a> {
    width: PointerWidth,
    endian: Endianness,
    data: &'a [u8],
}

impl<'a> Records<'a> {
    fn next_record(&mut self) -> Result<RawRecord<'a>> {
        let mut bytes = Bytes(self.data);
        let size = bytes
            .read::<U16<Endianness>>()
            .map_err(|_| anyhow!("Unable to read record size"))?
            .get(self.endian);
        let tag = *bytes
            .read::<u8>()
            .map_err(|_| anyhow!("Unable to read record kind"))?;
        let flags = *bytes
            .read::<u8>()
            .map_err(|_| anyhow!("Unable to read record flags"))?;
        let kind =
            RelocationKind::from_u8(tag).ok_or_else(|| anyhow!("unknown record kind {tag}"))?;
        let flags = RecordFlags::from_bits(flags)
            .ok_or_else(|| anyhow!("unknown flags {flags:#x} on {kind} record"))?;
        let header_word = match self.width {
            PointerWidth::U32 => None,
            PointerWidth::U64 => Some(
                bytes
                    .read::<U32<Endianness>>()
                    .map_err(|_| anyhow!("Unable to read header word of {kind} record"))?
                    .get(self.endian),
            ),
        };

        let size = usize::from(size);
        let header = usize::from(self.width.record_header_size());
        if size < header || size > self.data.len() {
            bail!(
                "{kind} record claims {size} bytes with {} remaining",
                self.data.len()
            );
        }
        let (record, rest) = self.data.split_at(size);
        self.data = rest;
        Ok(RawRecord {
            kind,
            flags,
            header_word,
            body: &record[header..],
            width: self.width,
            endian: self.endian,
        })
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<RawRecord<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }
        let record = self.next_record();
        if record.is_err() {
            self.data = &[];
        }
        Some(record)
    }
}

/// One undecoded relocation record.
#[derive(Clone, Debug)]
pub struct RawRecord<'a> {
    kind: RelocationKind,
    flags: RecordFlags,
    header_word: Option<u32>,
    body: &'a [u8],
    width: PointerWidth,
    endian: Endianness,
}

impl<'a> RawRecord<'a> {
    /// The record's kind.
    pub fn kind(&self) -> RelocationKind {
        self.kind
    }

    /// The record's header flags.
    pub fn flags(&self) -> RecordFlags {
        self.flags
    }

    /// Total size of the record, header included.
    pub fn size(&self) -> usize {
        usize::from(self.width.record_header_size()) + self.body.len()
    }

    /// The spare header word of 64-bit records.
    pub fn header_word(&self) -> Option<u32> {
        self.header_word
    }

    /// Bytes following the header.
    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// Decodes the record's fields according to the layout of its kind.
    ///
    /// Every field is widened to `u64`; pointers are zero-extended.
    pub fn fields(&self) -> Result<SmallVec<[u64; 8]>> {
        let schema = schema(self.kind)
            .filter(|s| s.is_supported(self.width))
            .ok_or_else(|| anyhow!("{} records do not exist on {}", self.kind, self.width))?;
        let expected = schema.size(self.width).map(usize::from);
        if expected != Some(self.size()) {
            bail!(
                "{} record is {} bytes, expected {expected:?}",
                self.kind,
                self.size()
            );
        }

        let header = self.width.record_header_size();
        let mut values = SmallVec::new();
        let mut offset = header;
        for field in schema.fields() {
            if *field == FieldType::HeaderWord {
                if let Some(word) = self.header_word {
                    values.push(u64::from(word));
                    continue;
                }
            }
            offset = align_up(offset, field.align(self.width));
            let start = usize::from(offset - header);
            let mut bytes = Bytes(&self.body[start..]);
            let value = match field {
                FieldType::Pointer => read_pointer(&mut bytes, self.width, self.endian)?,
                FieldType::U32 | FieldType::HeaderWord => bytes
                    .read::<U32<Endianness>>()
                    .map(|v| u64::from(v.get(self.endian)))
                    .map_err(|_| anyhow!("Unable to read u32 field"))?,
                FieldType::U16 => bytes
                    .read::<U16<Endianness>>()
                    .map(|v| u64::from(v.get(self.endian)))
                    .map_err(|_| anyhow!("Unable to read u16 field"))?,
                FieldType::U8 => bytes
                    .read::<u8>()
                    .map(|v| u64::from(*v))
                    .map_err(|_| anyhow!("Unable to read u8 field"))?,
            };
            values.push(value);
            offset += field.size(self.width);
        }
        Ok(values)
    }
}
