//! Typed relocation targets.
//!
//! A [`RelocationTarget`] names exactly what a relocation record must carry
//! to let the loader rebind a value in generated code. The record kind is
//! derived from the target, so a kind can only ever be paired with the
//! payload its schema expects.

use crate::validation::ValidationRecord;
use crate::{RelocationError, RelocationKind};
use cranelift_entity::{PrimaryMap, entity_impl};
use smallvec::SmallVec;

/// Index of a method inlined into the compilation unit.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct InlinedSiteIndex(u32);
entity_impl!(InlinedSiteIndex);

/// Index of a debug counter in the compilation's counter registry.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct DebugCounterId(u32);
entity_impl!(DebugCounterId);

/// The method whose bytecode a relocation refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InlinedSite {
    /// The method being compiled.
    Outermost,
    /// A method inlined into it.
    Inlined(InlinedSiteIndex),
}

impl InlinedSite {
    /// Serialized form: the site index, or all ones for the outermost method.
    pub fn raw(self) -> u64 {
        match self {
            InlinedSite::Outermost => u64::MAX,
            InlinedSite::Inlined(index) => u64::from(index.as_u32()),
        }
    }
}

/// Address of a method's constant pool in the compiling process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConstantPoolHandle(pub u64);

/// Address of a runtime class in the compiling process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClassHandle(pub u64);

/// Address of data that lives in the shared cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CachePointer(pub u64);

/// Runtime helper routine number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HelperId(pub u32);

/// Id assigned to a class, method or other symbol by the symbol validation
/// manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u16);

/// A constant pool entry referenced by generated code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SymbolRef {
    /// Constant pool of the method owning the reference.
    pub constant_pool: ConstantPoolHandle,
    /// Index into that constant pool.
    pub cp_index: i32,
    /// Byte offset from the resolved address, for data references.
    pub offset: i64,
}

impl SymbolRef {
    /// A reference to `cp_index` with no offset.
    pub fn new(constant_pool: ConstantPoolHandle, cp_index: i32) -> SymbolRef {
        SymbolRef {
            constant_pool,
            cp_index,
            offset: 0,
        }
    }
}

/// A call node of the intermediate representation that needs a thunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CodeNode {
    /// The site the call was inlined from.
    pub site: InlinedSite,
    /// The callee's constant pool reference.
    pub symbol: SymbolRef,
}

macro_rules! target_kinds {
    ($(
        $(#[$attr:meta])*
        $name:ident { $($variant:ident),* $(,)? }
    )*) => {$(
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[allow(missing_docs, reason = "variants are named after their record kind")]
        pub enum $name {
            $($variant,)*
        }

        impl $name {
            /// Every variant.
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            /// The record kind written for this variant.
            pub const fn kind(self) -> RelocationKind {
                match self {
                    $($name::$variant => RelocationKind::$variant,)*
                }
            }
        }
    )*};
}

target_kinds! {
    /// Records consisting of the header alone.
    MarkerKind {
        AbsoluteMethodAddress,
        BodyInfoAddress,
        RamMethod,
        AbsoluteMethodAddressOrderedPair,
        ClassUnloadAssumption,
        RecompQueuedFlag,
    }

    /// Records naming a runtime helper.
    HelperKind {
        HelperAddress,
        AbsoluteHelperAddress,
    }

    /// Records carrying one pointer-sized value.
    ValueKind {
        FixedSequenceAddress,
        FixedSequence2Address,
        CheckMethodEnter,
        CheckMethodExit,
        RamMethodSequence,
        RamMethodSequenceReg,
        GlobalValue,
        Hcr,
        MethodCallAddress,
        BlockFrequency,
    }

    /// Records naming a constant pool.
    ConstantPoolKind {
        ConstantPool,
        RelativeMethodAddress,
        ClassObject,
        MethodObject,
        InterfaceObject,
        Thunks,
        Trampolines,
    }

    /// Records naming one constant pool entry.
    ConstantPoolIndexKind {
        JniVirtualTargetAddress,
        JniStaticTargetAddress,
        JniSpecialTargetAddress,
        StaticRamMethodConst,
        SpecialRamMethodConst,
        VirtualRamMethodConst,
        ClassAddress,
    }

    /// Records validating a field or class reference against a class chain.
    FieldValidationKind {
        ValidateInstanceField,
        ValidateStaticField,
        ValidateClass,
    }

    /// Records of methods inlined without a guard.
    InlinedMethodKind {
        InlinedInterfaceMethod,
        InlinedVirtualMethod,
    }

    /// Records of methods inlined behind a patchable no-op guard.
    NopGuardKind {
        InlinedStaticMethodWithNopGuard,
        InlinedSpecialMethodWithNopGuard,
        InlinedVirtualMethodWithNopGuard,
        InlinedInterfaceMethodWithNopGuard,
        InlinedAbstractMethodWithNopGuard,
        InlinedHcrMethod,
    }

    /// Records of guards derived from profiling data.
    ProfiledGuardKind {
        ProfiledMethodGuard,
        ProfiledClassGuard,
        ProfiledInlinedMethod,
    }

    /// Records naming a symbol held by the validation manager.
    SymbolKind {
        SymbolFromManager,
        DiscontiguousSymbolFromManager,
    }
}

/// What a relocation record refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelocationTarget {
    /// A record with no payload.
    Marker(MarkerKind),
    /// A runtime helper routine.
    Helper {
        /// Record kind.
        kind: HelperKind,
        /// Helper routine number.
        helper: HelperId,
    },
    /// A single pointer-sized value.
    Value {
        /// Record kind.
        kind: ValueKind,
        /// The value, truncated to the target pointer width when written.
        value: u64,
    },
    /// A constant pool.
    ConstantPool {
        /// Record kind.
        kind: ConstantPoolKind,
        /// The constant pool.
        constant_pool: ConstantPoolHandle,
        /// Site owning the constant pool.
        site: InlinedSite,
    },
    /// A constant pool paired with the site it belongs to.
    ///
    /// Written secondary (the site) first, then primary (the pool).
    ConstantPoolOrderedPair {
        /// The constant pool.
        constant_pool: ConstantPoolHandle,
        /// Site owning the constant pool.
        site: InlinedSite,
    },
    /// A constant pool entry.
    ConstantPoolEntry {
        /// Record kind.
        kind: ConstantPoolIndexKind,
        /// The referenced entry.
        symbol: SymbolRef,
        /// Site the reference was generated from.
        site: InlinedSite,
    },
    /// The interpreter-to-compiled thunk of a call node.
    J2iThunk(CodeNode),
    /// A pointer to a virtual thunk.
    J2iVirtualThunkPointer {
        /// The call's constant pool entry.
        symbol: SymbolRef,
        /// Site the call was generated from.
        site: InlinedSite,
        /// Offset of the thunk pointer in the constant pool.
        thunk_offset: u64,
    },
    /// Address of static data, `symbol.offset` bytes past the resolved entry.
    DataAddress {
        /// The referenced entry.
        symbol: SymbolRef,
        /// Site the reference was generated from.
        site: InlinedSite,
    },
    /// A check that a class may be allocated inline.
    VerifyClassObjectForAlloc {
        /// The class's constant pool entry.
        symbol: SymbolRef,
        /// Site the allocation was generated from.
        site: InlinedSite,
        /// Instance size assumed by the generated code.
        allocation_size: u64,
        /// Offset of the branch taken when the check fails.
        branch_offset: u64,
    },
    /// A check that a reference array may be allocated inline.
    VerifyRefArrayForAlloc {
        /// The component class's constant pool entry.
        symbol: SymbolRef,
        /// Site the allocation was generated from.
        site: InlinedSite,
        /// Offset of the branch taken when the check fails.
        branch_offset: u64,
    },
    /// A field or class reference validated against the class's chain.
    FieldValidation {
        /// Record kind.
        kind: FieldValidationKind,
        /// The validated entry.
        symbol: SymbolRef,
        /// Site the reference was generated from.
        site: InlinedSite,
        /// The class the entry resolved to at compile time.
        class: ClassHandle,
    },
    /// A method inlined without a guard.
    InlinedMethod {
        /// Record kind.
        kind: InlinedMethodKind,
        /// The call's constant pool entry.
        symbol: SymbolRef,
        /// Site of the inlined body.
        site: InlinedSite,
        /// Class declaring the inlined method.
        class: ClassHandle,
    },
    /// A method inlined behind a no-op guard.
    NopGuard {
        /// Record kind.
        kind: NopGuardKind,
        /// The call's constant pool entry.
        symbol: SymbolRef,
        /// Site of the inlined body.
        site: InlinedSite,
        /// Class declaring the inlined method.
        class: ClassHandle,
        /// Offset of the code the guard branches to once patched.
        destination: u64,
    },
    /// A guard derived from profiling data.
    ProfiledGuard {
        /// Record kind.
        kind: ProfiledGuardKind,
        /// The call's constant pool entry.
        symbol: SymbolRef,
        /// Site of the guarded body.
        site: InlinedSite,
        /// The profiled receiver class.
        class: ClassHandle,
        /// Index of the method in the profiled class.
        method_index: u64,
        /// Offset of the code the guard branches to on failure.
        destination: u64,
    },
    /// A method identified by its class and vtable slot.
    MethodPointer {
        /// Site the pointer was generated from.
        site: InlinedSite,
        /// Class whose vtable holds the method.
        class: ClassHandle,
        /// Slot of the method in that vtable.
        vtable_slot: u64,
    },
    /// A class identified by its class chain.
    ClassPointer {
        /// Site the pointer was generated from.
        site: InlinedSite,
        /// The class.
        class: ClassHandle,
    },
    /// A class referenced through a static symbol.
    ArbitraryClassAddress {
        /// The static symbol holding the class.
        symbol: SymbolRef,
        /// The class.
        class: ClassHandle,
        /// Site the reference was generated from.
        site: InlinedSite,
    },
    /// A class validated by its class chain alone.
    ValidateArbitraryClass {
        /// The class.
        class: ClassHandle,
    },
    /// A debug counter slot.
    DebugCounter(DebugCounterId),
    /// A symbol validation fact.
    Validation(ValidationRecord),
    /// A symbol held by the validation manager.
    Symbol {
        /// Record kind.
        kind: SymbolKind,
        /// The symbol's id.
        symbol_id: SymbolId,
        /// What sort of symbol it is.
        symbol_type: u16,
    },
    /// A trampoline already resolved for a validated method.
    ResolvedTrampolines {
        /// The method's id.
        symbol_id: SymbolId,
    },
}

impl RelocationTarget {
    /// The record kind written for this target.
    pub fn kind(&self) -> RelocationKind {
        match self {
            RelocationTarget::Marker(kind) => kind.kind(),
            RelocationTarget::Helper { kind, .. } => kind.kind(),
            RelocationTarget::Value { kind, .. } => kind.kind(),
            RelocationTarget::ConstantPool { kind, .. } => kind.kind(),
            RelocationTarget::ConstantPoolOrderedPair { .. } => {
                RelocationKind::ConstantPoolOrderedPair
            }
            RelocationTarget::ConstantPoolEntry { kind, .. } => kind.kind(),
            RelocationTarget::J2iThunk(_) => RelocationKind::J2iThunks,
            RelocationTarget::J2iVirtualThunkPointer { .. } => {
                RelocationKind::J2iVirtualThunkPointer
            }
            RelocationTarget::DataAddress { .. } => RelocationKind::DataAddress,
            RelocationTarget::VerifyClassObjectForAlloc { .. } => {
                RelocationKind::VerifyClassObjectForAlloc
            }
            RelocationTarget::VerifyRefArrayForAlloc { .. } => {
                RelocationKind::VerifyRefArrayForAlloc
            }
            RelocationTarget::FieldValidation { kind, .. } => kind.kind(),
            RelocationTarget::InlinedMethod { kind, .. } => kind.kind(),
            RelocationTarget::NopGuard { kind, .. } => kind.kind(),
            RelocationTarget::ProfiledGuard { kind, .. } => kind.kind(),
            RelocationTarget::MethodPointer { .. } => RelocationKind::MethodPointer,
            RelocationTarget::ClassPointer { .. } => RelocationKind::ClassPointer,
            RelocationTarget::ArbitraryClassAddress { .. } => {
                RelocationKind::ArbitraryClassAddress
            }
            RelocationTarget::ValidateArbitraryClass { .. } => {
                RelocationKind::ValidateArbitraryClass
            }
            RelocationTarget::DebugCounter(_) => RelocationKind::DebugCounter,
            RelocationTarget::Validation(record) => record.kind(),
            RelocationTarget::Symbol { kind, .. } => kind.kind(),
            RelocationTarget::ResolvedTrampolines { .. } => RelocationKind::ResolvedTrampolines,
        }
    }
}

/// A method inlined into the compilation unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlinedCallSite {
    /// Constant pool of the inlined method.
    pub constant_pool: ConstantPoolHandle,
}

/// Per-compilation facts the encoder needs besides the requests themselves.
#[derive(Clone, Debug, Default)]
pub struct MethodContext {
    /// Constant pool of the method being compiled.
    pub constant_pool: Option<ConstantPoolHandle>,
    /// Methods inlined into it, by site index.
    pub inlined_sites: PrimaryMap<InlinedSiteIndex, InlinedCallSite>,
    /// Number of polymorphic inline-cache slots in the generated code.
    pub pic_slot_count: u32,
}

impl MethodContext {
    /// Creates a context for a method whose constant pool is `constant_pool`.
    pub fn new(constant_pool: ConstantPoolHandle) -> MethodContext {
        MethodContext {
            constant_pool: Some(constant_pool),
            ..MethodContext::default()
        }
    }

    /// Returns the site that owns `constant_pool`.
    ///
    /// `site` is kept when its method owns the pool. Otherwise the outermost
    /// method is preferred, then the first inlined method owning the pool.
    /// A pool owned by no method in this compilation is an error.
    pub fn correct_inlined_site(
        &self,
        constant_pool: ConstantPoolHandle,
        site: InlinedSite,
    ) -> Result<InlinedSite, RelocationError> {
        if let InlinedSite::Inlined(index) = site {
            if self
                .inlined_sites
                .get(index)
                .is_some_and(|s| s.constant_pool == constant_pool)
            {
                return Ok(site);
            }
        }
        if self.constant_pool == Some(constant_pool) {
            return Ok(InlinedSite::Outermost);
        }
        self.inlined_sites
            .iter()
            .find(|(_, s)| s.constant_pool == constant_pool)
            .map(|(index, _)| InlinedSite::Inlined(index))
            .ok_or_else(|| {
                RelocationError::AotDataGenerationFailed(format!(
                    "constant pool {:#x} is not owned by any method in the compilation",
                    constant_pool.0
                ))
            })
    }
}

/// A relocation requested by the code generator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelocationRequest {
    /// What the record refers to.
    pub target: RelocationTarget,
    /// Offsets in the generated code patched with the resolved value.
    pub patch_sites: SmallVec<[u32; 2]>,
    /// Validation facts the target depends on, written ahead of it.
    pub validations: Vec<ValidationRecord>,
}

impl RelocationRequest {
    /// A request with no patch sites or validations.
    pub fn new(target: RelocationTarget) -> RelocationRequest {
        RelocationRequest {
            target,
            patch_sites: SmallVec::new(),
            validations: Vec::new(),
        }
    }

    /// Adds a patch site.
    pub fn at(mut self, offset: u32) -> RelocationRequest {
        self.patch_sites.push(offset);
        self
    }

    /// Adds a validation fact written ahead of the target.
    pub fn validated_by(mut self, record: ValidationRecord) -> RelocationRequest {
        self.validations.push(record);
        self
    }

    /// Whether any patch site lies beyond what a 16-bit offset can express.
    pub fn needs_wide_offsets(&self) -> bool {
        self.patch_sites.iter().any(|&o| o > u32::from(u16::MAX))
    }
}
