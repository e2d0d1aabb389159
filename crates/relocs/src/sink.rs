//! Bounds-checked writer for a single relocation record.

use aot_relocs_environ::PointerWidth;
use aot_relocs_environ::object::endian::{Endian, Endianness};

/// Writes a record into a region sized for it up front.
///
/// Every write is checked against the region: running past its end, or
/// finishing before it is full, means the record layout and the size it was
/// allocated with disagree, and panics.
pub struct RecordSink<'a> {
    data: &'a mut [u8],
    offset: usize,
    endian: Endianness,
}

impl<'a> RecordSink<'a> {
    /// Creates a sink writing `data` from its start.
    pub fn new(data: &'a mut [u8], endian: Endianness) -> RecordSink<'a> {
        RecordSink {
            data,
            offset: 0,
            endian,
        }
    }

    /// Number of bytes written so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of bytes left in the region.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Add a slice of bytes.
    pub fn put_data(&mut self, bytes: &[u8]) {
        let end = self.offset + bytes.len();
        assert!(
            end <= self.data.len(),
            "record overflow: writing {} bytes at offset {} of {}",
            bytes.len(),
            self.offset,
            self.data.len()
        );
        self.data[self.offset..end].copy_from_slice(bytes);
        self.offset = end;
    }

    /// Add 1 byte.
    pub fn put1(&mut self, value: u8) {
        self.put_data(&[value]);
    }

    /// Add 2 bytes.
    pub fn put2(&mut self, value: u16) {
        self.put_data(&self.endian.write_u16(value));
    }

    /// Add 4 bytes.
    pub fn put4(&mut self, value: u32) {
        self.put_data(&self.endian.write_u32(value));
    }

    /// Add 8 bytes.
    pub fn put8(&mut self, value: u64) {
        self.put_data(&self.endian.write_u64(value));
    }

    /// Add a target pointer, truncating `value` to the pointer width.
    pub fn put_pointer(&mut self, width: PointerWidth, value: u64) {
        match width {
            PointerWidth::U32 => self.put4(value as u32),
            PointerWidth::U64 => self.put8(value),
        }
    }

    /// Zero-pad to the given alignment, relative to the start of the region.
    pub fn align_to(&mut self, align: usize) {
        assert!(align.is_power_of_two(), "{align} is not a power of two");
        while self.offset & (align - 1) != 0 {
            self.put1(0);
        }
    }

    /// Overwrite 4 bytes already written at `offset`.
    pub fn patch4(&mut self, offset: usize, value: u32) {
        assert!(
            offset + 4 <= self.offset,
            "patching unwritten bytes at offset {offset}"
        );
        self.data[offset..offset + 4].copy_from_slice(&self.endian.write_u32(value));
    }

    /// Finishes the record, returning the number of bytes written.
    pub fn finish(self) -> usize {
        assert_eq!(
            self.offset,
            self.data.len(),
            "record under-filled: {} of {} bytes written",
            self.offset,
            self.data.len()
        );
        self.offset
    }
}
