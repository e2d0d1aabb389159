//! Serialized layout of every relocation record kind.
//!
//! Each kind that can still be produced has a [`RecordSchema`]: the ordered
//! list of fields written after the common record header. Records are laid
//! out like C structures, every field at its natural alignment and the whole
//! record rounded up to its largest alignment. Both the size table used to
//! allocate relocation buffers and the writer that fills them are derived
//! from these schemas, so the two cannot disagree.

use crate::{PointerWidth, RelocationKind};
use bitflags::bitflags;

bitflags! {
    /// Flags byte of a relocation record header.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct RecordFlags: u8 {
        /// Patch-site offsets of the record are 32 bits wide instead of 16.
        const WIDE_OFFSETS = 0b1;
    }
}

/// The type of a single field in a relocation record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// A target pointer-sized value.
    Pointer,
    /// A 32-bit value.
    U32,
    /// A 16-bit value.
    U16,
    /// An 8-bit value.
    U8,
    /// A 32-bit value stored in the spare header word of 64-bit records.
    ///
    /// On 32-bit targets the header has no spare word and the value is
    /// appended after it instead.
    HeaderWord,
}

impl FieldType {
    /// Number of bytes this field adds after the header.
    pub const fn size(self, width: PointerWidth) -> u16 {
        match self {
            FieldType::Pointer => width.bytes(),
            FieldType::U32 => 4,
            FieldType::U16 => 2,
            FieldType::U8 => 1,
            FieldType::HeaderWord => match width {
                PointerWidth::U32 => 4,
                PointerWidth::U64 => 0,
            },
        }
    }

    /// Alignment of this field within the record.
    pub const fn align(self, width: PointerWidth) -> u16 {
        match self {
            FieldType::Pointer => width.bytes(),
            FieldType::U32 => 4,
            FieldType::U16 => 2,
            FieldType::U8 => 1,
            FieldType::HeaderWord => match width {
                PointerWidth::U32 => 4,
                PointerWidth::U64 => 1,
            },
        }
    }
}

/// The fields of one relocation record kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordSchema {
    fields: &'static [FieldType],
    wide_only: bool,
}

impl RecordSchema {
    const fn new(fields: &'static [FieldType]) -> RecordSchema {
        RecordSchema {
            fields,
            wide_only: false,
        }
    }

    const fn wide_only(fields: &'static [FieldType]) -> RecordSchema {
        RecordSchema {
            fields,
            wide_only: true,
        }
    }

    /// The fields written after the header, in order.
    pub const fn fields(&self) -> &'static [FieldType] {
        self.fields
    }

    /// Whether records with this schema exist on targets of `width`.
    pub const fn is_supported(&self, width: PointerWidth) -> bool {
        !(self.wide_only && matches!(width, PointerWidth::U32))
    }

    /// Alignment of the whole record.
    pub const fn align(&self, width: PointerWidth) -> u16 {
        let mut align = width.record_header_align();
        let mut i = 0;
        while i < self.fields.len() {
            let a = self.fields[i].align(width);
            if a > align {
                align = a;
            }
            i += 1;
        }
        align
    }

    /// Total serialized size of a record, header included, or `None` if
    /// the record does not exist on targets of `width`.
    pub const fn size(&self, width: PointerWidth) -> Option<u16> {
        if !self.is_supported(width) {
            return None;
        }
        let mut offset = width.record_header_size();
        let mut i = 0;
        while i < self.fields.len() {
            let field = self.fields[i];
            offset = align_up(offset, field.align(width)) + field.size(width);
            i += 1;
        }
        Some(align_up(offset, self.align(width)))
    }
}

/// Rounds `offset` up to a multiple of `align`, which must be a power of two.
pub const fn align_up(offset: u16, align: u16) -> u16 {
    (offset + align - 1) & !(align - 1)
}

use FieldType::*;

const EMPTY: &[FieldType] = &[];
const HEADER_WORD: &[FieldType] = &[HeaderWord];
const POINTERS_1: &[FieldType] = &[Pointer; 1];
const POINTERS_2: &[FieldType] = &[Pointer; 2];
const POINTERS_3: &[FieldType] = &[Pointer; 3];
const POINTERS_4: &[FieldType] = &[Pointer; 4];
const POINTERS_5: &[FieldType] = &[Pointer; 5];
const POINTERS_6: &[FieldType] = &[Pointer; 6];
const POINTERS_7: &[FieldType] = &[Pointer; 7];

// Symbol validation records identify classes and methods by 16-bit ids
// assigned by the validation manager.
const CLASS_BY_NAME: &[FieldType] = &[U16, U16, Pointer];
const PROFILED_CLASS: &[FieldType] = &[U16, Pointer, Pointer];
const CLASS_FROM_CP: &[FieldType] = &[U16, U16, U32];
const DEFINING_CLASS_FROM_CP: &[FieldType] = &[U8, U16, U16, U32];
const CLASS_PAIR: &[FieldType] = &[U16, U16];
const CLASS_INSTANCE_OF_CLASS: &[FieldType] = &[U8, U8, U8, U16, U16];
const CLASS_WITH_CHAIN: &[FieldType] = &[U16, Pointer];
const METHOD_FROM_CLASS: &[FieldType] = &[U16, U16, U32];
const METHOD_FROM_CP: &[FieldType] = &[U16, U16, U16, U32];
const VIRTUAL_METHOD_FROM_OFFSET: &[FieldType] = &[U16, U16, U16, U16];
const INTERFACE_METHOD_FROM_CP: &[FieldType] = &[U16, U16, U16, U16, U32];
const METHOD_FROM_CLASS_AND_SIG: &[FieldType] = &[U16, U16, U16, U16, Pointer];
const STACK_WALKER_MAY_SKIP_FRAMES: &[FieldType] = &[U16, U16, U8];
const CLASS_INFO_IS_INITIALIZED: &[FieldType] = &[U16, U8];
const METHOD_FROM_SINGLE_IMPLEMENTER: &[FieldType] = &[U16, U16, U16, U32, U16, U16];
const METHOD_FROM_SINGLE_INTERFACE_IMPLEMENTER: &[FieldType] = &[U16, U16, U16, U16, U32];
const METHOD_FROM_SINGLE_ABSTRACT_IMPLEMENTER: &[FieldType] = &[U16, U16, U16, U32, U16];
const SYMBOL_FROM_MANAGER: &[FieldType] = &[U16, U16];
const RESOLVED_TRAMPOLINES: &[FieldType] = &[U16];

/// Returns the schema of `kind`, or `None` for retired kinds which are never
/// written.
pub const fn schema(kind: RelocationKind) -> Option<RecordSchema> {
    use RelocationKind as K;
    let fields = match kind {
        K::ArrayCopyHelper
        | K::ArrayCopyToc
        | K::BodyInfoAddressLoad
        | K::HierarchyGuard
        | K::AbstractGuard
        | K::EmitClass
        | K::NativeMethodAbsolute
        | K::NativeMethodRelative
        | K::ValidateRootClass
        | K::ValidateClassFromMethod
        | K::ValidateComponentClassFromArrayClass
        | K::ValidateClassClass
        | K::ValidateRomClass
        | K::ValidatePrimitiveClass
        | K::ValidateMethodFromInlinedSite
        | K::ValidateMethodByName
        | K::ValidateArrayClassFromJavaVm => return None,

        K::PicTrampolines => return Some(RecordSchema::wide_only(HEADER_WORD)),

        K::AbsoluteMethodAddress
        | K::BodyInfoAddress
        | K::RamMethod
        | K::AbsoluteMethodAddressOrderedPair
        | K::ClassUnloadAssumption
        | K::RecompQueuedFlag => EMPTY,

        K::HelperAddress | K::AbsoluteHelperAddress => HEADER_WORD,

        K::FixedSequenceAddress
        | K::FixedSequence2Address
        | K::CheckMethodEnter
        | K::CheckMethodExit
        | K::RamMethodSequence
        | K::RamMethodSequenceReg
        | K::GlobalValue
        | K::Hcr
        | K::MethodCallAddress
        | K::BlockFrequency => POINTERS_1,

        K::ConstantPool
        | K::RelativeMethodAddress
        | K::ClassObject
        | K::MethodObject
        | K::InterfaceObject
        | K::Thunks
        | K::Trampolines
        | K::ConstantPoolOrderedPair
        | K::ValidateArbitraryClass => POINTERS_2,

        K::JniVirtualTargetAddress
        | K::JniStaticTargetAddress
        | K::JniSpecialTargetAddress
        | K::StaticRamMethodConst
        | K::SpecialRamMethodConst
        | K::VirtualRamMethodConst
        | K::ClassAddress
        | K::J2iThunks
        | K::J2iVirtualThunkPointer
        | K::ClassPointer
        | K::ArbitraryClassAddress => POINTERS_3,

        K::DataAddress
        | K::VerifyRefArrayForAlloc
        | K::ValidateInstanceField
        | K::ValidateStaticField
        | K::ValidateClass
        | K::InlinedInterfaceMethod
        | K::InlinedVirtualMethod
        | K::MethodPointer => POINTERS_4,

        K::VerifyClassObjectForAlloc
        | K::InlinedStaticMethodWithNopGuard
        | K::InlinedSpecialMethodWithNopGuard
        | K::InlinedVirtualMethodWithNopGuard
        | K::InlinedInterfaceMethodWithNopGuard
        | K::InlinedAbstractMethodWithNopGuard
        | K::InlinedHcrMethod => POINTERS_5,

        K::DebugCounter => POINTERS_6,

        K::ProfiledMethodGuard | K::ProfiledClassGuard | K::ProfiledInlinedMethod => POINTERS_7,

        K::ValidateClassByName => CLASS_BY_NAME,
        K::ValidateProfiledClass => PROFILED_CLASS,
        K::ValidateClassFromCp
        | K::ValidateStaticClassFromCp
        | K::ValidateClassFromITableIndexCp
        | K::ValidateDeclaringClassFromFieldOrStatic => CLASS_FROM_CP,
        K::ValidateDefiningClassFromCp => DEFINING_CLASS_FROM_CP,
        K::ValidateArrayClassFromComponentClass
        | K::ValidateSuperClassFromClass
        | K::ValidateConcreteSubClassFromClass => CLASS_PAIR,
        K::ValidateClassInstanceOfClass => CLASS_INSTANCE_OF_CLASS,
        K::ValidateSystemClassByName | K::ValidateClassChain => CLASS_WITH_CHAIN,
        K::ValidateMethodFromClass => METHOD_FROM_CLASS,
        K::ValidateStaticMethodFromCp
        | K::ValidateSpecialMethodFromCp
        | K::ValidateVirtualMethodFromCp
        | K::ValidateImproperInterfaceMethodFromCp => METHOD_FROM_CP,
        K::ValidateVirtualMethodFromOffset => VIRTUAL_METHOD_FROM_OFFSET,
        K::ValidateInterfaceMethodFromCp => INTERFACE_METHOD_FROM_CP,
        K::ValidateMethodFromClassAndSig => METHOD_FROM_CLASS_AND_SIG,
        K::ValidateStackWalkerMaySkipFrames => STACK_WALKER_MAY_SKIP_FRAMES,
        K::ValidateClassInfoIsInitialized => CLASS_INFO_IS_INITIALIZED,
        K::ValidateMethodFromSingleImplementer => METHOD_FROM_SINGLE_IMPLEMENTER,
        K::ValidateMethodFromSingleInterfaceImplementer => {
            METHOD_FROM_SINGLE_INTERFACE_IMPLEMENTER
        }
        K::ValidateMethodFromSingleAbstractImplementer => METHOD_FROM_SINGLE_ABSTRACT_IMPLEMENTER,
        K::SymbolFromManager | K::DiscontiguousSymbolFromManager => SYMBOL_FROM_MANAGER,
        K::ResolvedTrampolines => RESOLVED_TRAMPOLINES,
    };
    Some(RecordSchema::new(fields))
}

/// Serialized size of a `kind` record on targets of `width`.
///
/// Returns 0 for kinds that are retired or do not exist on `width`; such
/// kinds never appear in a relocation buffer.
pub const fn relocation_size(kind: RelocationKind, width: PointerWidth) -> u16 {
    match schema(kind) {
        Some(schema) => match schema.size(width) {
            Some(size) => size,
            None => 0,
        },
        None => 0,
    }
}

const fn build_size_table(width: PointerWidth) -> [u16; RelocationKind::COUNT] {
    let mut table = [0; RelocationKind::COUNT];
    let mut i = 0;
    while i < RelocationKind::COUNT {
        table[i] = relocation_size(RelocationKind::ALL[i], width);
        i += 1;
    }
    table
}

/// Record sizes on 32-bit targets, indexed by kind tag.
pub static SIZE_TABLE_32: [u16; RelocationKind::COUNT] = build_size_table(PointerWidth::U32);

/// Record sizes on 64-bit targets, indexed by kind tag.
pub static SIZE_TABLE_64: [u16; RelocationKind::COUNT] = build_size_table(PointerWidth::U64);

/// Returns the size table for `width`.
pub fn size_table(width: PointerWidth) -> &'static [u16; RelocationKind::COUNT] {
    match width {
        PointerWidth::U32 => &SIZE_TABLE_32,
        PointerWidth::U64 => &SIZE_TABLE_64,
    }
}

const _: () = {
    use PointerWidth::{U32 as W32, U64 as W64};
    assert!(relocation_size(RelocationKind::GlobalValue, W64) == 16);
    assert!(relocation_size(RelocationKind::ConstantPoolOrderedPair, W64) == 24);
    assert!(relocation_size(RelocationKind::DebugCounter, W64) == 56);
    assert!(relocation_size(RelocationKind::DebugCounter, W32) == 28);
    assert!(relocation_size(RelocationKind::PicTrampolines, W64) == 8);
    assert!(relocation_size(RelocationKind::PicTrampolines, W32) == 0);
};
