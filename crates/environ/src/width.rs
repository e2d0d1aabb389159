//! Pointer widths of the targets relocation data can be produced for.
//!
//! Every relocation buffer is written for exactly one pointer width. The
//! runtime value [`PointerWidth`] describes it for configuration and for the
//! size table, while the [`TargetWidth`] marker types carry the same
//! information at the type level so that records which only exist on one
//! width cannot be constructed for the other.

use anyhow::{Result, anyhow, bail};
use core::fmt;
use serde_derive::{Deserialize, Serialize};
use target_lexicon::Triple;

/// The width, in bits, of a target pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerWidth {
    /// 32-bit pointers.
    #[serde(rename = "32")]
    U32,
    /// 64-bit pointers.
    #[serde(rename = "64")]
    U64,
}

impl PointerWidth {
    /// The width of the host this code is running on.
    pub fn host() -> PointerWidth {
        if cfg!(target_pointer_width = "32") {
            PointerWidth::U32
        } else if cfg!(target_pointer_width = "64") {
            PointerWidth::U64
        } else {
            panic!("unsupported target_pointer_width");
        }
    }

    /// Returns the pointer width of the given target triple.
    pub fn for_triple(triple: &Triple) -> Result<PointerWidth> {
        match triple
            .pointer_width()
            .map_err(|_| anyhow!("failed to retrieve target pointer width"))?
        {
            target_lexicon::PointerWidth::U32 => Ok(PointerWidth::U32),
            target_lexicon::PointerWidth::U64 => Ok(PointerWidth::U64),
            _ => bail!("unsupported target pointer width"),
        }
    }

    /// Size of a pointer in bytes.
    pub const fn bytes(self) -> u16 {
        match self {
            PointerWidth::U32 => 4,
            PointerWidth::U64 => 8,
        }
    }

    /// Size in bytes of the header common to every relocation record.
    ///
    /// The header is `u16 size | u8 kind | u8 flags`, followed on 64-bit
    /// targets by a 32-bit word that is padding for most kinds.
    pub const fn record_header_size(self) -> u16 {
        match self {
            PointerWidth::U32 => 4,
            PointerWidth::U64 => 8,
        }
    }

    /// Alignment of the record header.
    pub const fn record_header_align(self) -> u16 {
        match self {
            PointerWidth::U32 => 2,
            PointerWidth::U64 => 4,
        }
    }
}

impl fmt::Display for PointerWidth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PointerWidth::U32 => f.write_str("32-bit"),
            PointerWidth::U64 => f.write_str("64-bit"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Type-level pointer width of a relocation buffer.
///
/// Implemented only by [`Ptr32`] and [`Ptr64`].
pub trait TargetWidth: sealed::Sealed + Copy + fmt::Debug + Send + Sync + 'static {
    /// The runtime description of this width.
    const WIDTH: PointerWidth;

    /// Payload of a polymorphic-inline-cache trampoline count record.
    ///
    /// Uninhabited on targets where such records do not exist.
    type PicTrampolineCount: Copy + fmt::Debug + PartialEq + Eq + Send + Sync;

    /// Creates a trampoline count record payload, or `None` if this width
    /// never reserves trampolines for inline-cache slots.
    fn pic_trampolines(count: u32) -> Option<Self::PicTrampolineCount>;

    /// Returns the number of trampolines stored in `count`.
    fn pic_trampoline_count(count: &Self::PicTrampolineCount) -> u32;
}

/// Marker for 32-bit targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ptr32;

/// Marker for 64-bit targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ptr64;

/// A value that cannot exist on the current target width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unsupported {}

impl sealed::Sealed for Ptr32 {}
impl sealed::Sealed for Ptr64 {}

impl TargetWidth for Ptr32 {
    const WIDTH: PointerWidth = PointerWidth::U32;
    type PicTrampolineCount = Unsupported;

    fn pic_trampolines(_count: u32) -> Option<Unsupported> {
        None
    }

    fn pic_trampoline_count(count: &Unsupported) -> u32 {
        match *count {}
    }
}

impl TargetWidth for Ptr64 {
    const WIDTH: PointerWidth = PointerWidth::U64;
    type PicTrampolineCount = u32;

    fn pic_trampolines(count: u32) -> Option<u32> {
        Some(count)
    }

    fn pic_trampoline_count(count: &u32) -> u32 {
        *count
    }
}
