//! The closed set of relocation record kinds.
//!
//! The discriminant of each kind is the tag byte stored in the header of its
//! serialized record. The numbering is shared with the loader that consumes
//! the data and must never be reordered; retired kinds keep their slot.

use core::fmt;

macro_rules! relocation_kinds {
    ($(
        $(#[$attr:meta])*
        $name:ident = $value:literal, $display:literal;
    )*) => {
        /// Tag identifying what kind of deferred fact a relocation record
        /// encodes.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum RelocationKind {
            $(
                #[doc = concat!("`", $display, "` records.")]
                $(#[doc = ""] #[$attr])*
                $name = $value,
            )*
        }

        impl RelocationKind {
            /// Every kind, in tag order.
            pub const ALL: &'static [RelocationKind] = &[$(RelocationKind::$name),*];

            /// Number of kinds; also one past the largest tag.
            pub const COUNT: usize = Self::ALL.len();

            /// Human-readable name used in diagnostics.
            pub const fn name(self) -> &'static str {
                match self {
                    $(RelocationKind::$name => $display,)*
                }
            }

            /// Decodes a tag byte.
            pub const fn from_u8(tag: u8) -> Option<RelocationKind> {
                match tag {
                    $($value => Some(RelocationKind::$name),)*
                    _ => None,
                }
            }
        }
    };
}

relocation_kinds! {
    ConstantPool = 0, "ConstantPool";
    HelperAddress = 1, "HelperAddress";
    RelativeMethodAddress = 2, "RelativeMethodAddress";
    AbsoluteMethodAddress = 3, "AbsoluteMethodAddress";
    DataAddress = 4, "DataAddress";
    ClassObject = 5, "ClassObject";
    MethodObject = 6, "MethodObject";
    InterfaceObject = 7, "InterfaceObject";
    AbsoluteHelperAddress = 8, "AbsoluteHelperAddress";
    FixedSequenceAddress = 9, "FixedSequenceAddress";
    FixedSequence2Address = 10, "FixedSequence2Address";
    JniVirtualTargetAddress = 11, "JNIVirtualTargetAddress";
    JniStaticTargetAddress = 12, "JNIStaticTargetAddress";
    /// Retired.
    ArrayCopyHelper = 13, "ArrayCopyHelper";
    /// Retired.
    ArrayCopyToc = 14, "ArrayCopyToc";
    BodyInfoAddress = 15, "BodyInfoAddress";
    Thunks = 16, "Thunks";
    StaticRamMethodConst = 17, "StaticRamMethodConst";
    Trampolines = 18, "Trampolines";
    /// Number of trampolines reserved for polymorphic inline-cache slots.
    PicTrampolines = 19, "PicTrampolines";
    CheckMethodEnter = 20, "CheckMethodEnter";
    RamMethod = 21, "RamMethod";
    RamMethodSequence = 22, "RamMethodSequence";
    RamMethodSequenceReg = 23, "RamMethodSequenceReg";
    VerifyClassObjectForAlloc = 24, "VerifyClassObjectForAlloc";
    ConstantPoolOrderedPair = 25, "ConstantPoolOrderedPair";
    AbsoluteMethodAddressOrderedPair = 26, "AbsoluteMethodAddressOrderedPair";
    VerifyRefArrayForAlloc = 27, "VerifyRefArrayForAlloc";
    J2iThunks = 28, "J2IThunks";
    GlobalValue = 29, "GlobalValue";
    /// Retired.
    BodyInfoAddressLoad = 30, "BodyInfoAddressLoad";
    ValidateInstanceField = 31, "ValidateInstanceField";
    InlinedStaticMethodWithNopGuard = 32, "InlinedStaticMethodWithNopGuard";
    InlinedSpecialMethodWithNopGuard = 33, "InlinedSpecialMethodWithNopGuard";
    InlinedVirtualMethodWithNopGuard = 34, "InlinedVirtualMethodWithNopGuard";
    InlinedInterfaceMethodWithNopGuard = 35, "InlinedInterfaceMethodWithNopGuard";
    SpecialRamMethodConst = 36, "SpecialRamMethodConst";
    InlinedHcrMethod = 37, "InlinedHCRMethod";
    ValidateStaticField = 38, "ValidateStaticField";
    ValidateClass = 39, "ValidateClass";
    ClassAddress = 40, "ClassAddress";
    Hcr = 41, "HCR";
    ProfiledMethodGuard = 42, "ProfiledMethodGuardRelocation";
    ProfiledClassGuard = 43, "ProfiledClassGuardRelocation";
    /// Retired.
    HierarchyGuard = 44, "HierarchyGuardRelocation";
    /// Retired.
    AbstractGuard = 45, "AbstractGuardRelocation";
    ProfiledInlinedMethod = 46, "ProfiledInlinedMethodRelocation";
    MethodPointer = 47, "MethodPointer";
    ClassPointer = 48, "ClassPointer";
    CheckMethodExit = 49, "CheckMethodExit";
    ValidateArbitraryClass = 50, "ValidateArbitraryClass";
    /// Retired.
    EmitClass = 51, "EmitClass";
    JniSpecialTargetAddress = 52, "JNISpecialTargetAddress";
    VirtualRamMethodConst = 53, "VirtualRamMethodConst";
    InlinedInterfaceMethod = 54, "InlinedInterfaceMethod";
    InlinedVirtualMethod = 55, "InlinedVirtualMethod";
    /// Retired.
    NativeMethodAbsolute = 56, "NativeMethodAbsolute";
    /// Retired.
    NativeMethodRelative = 57, "NativeMethodRelative";
    ArbitraryClassAddress = 58, "ArbitraryClassAddress";
    DebugCounter = 59, "DebugCounter";
    ClassUnloadAssumption = 60, "ClassUnloadAssumption";
    J2iVirtualThunkPointer = 61, "J2IVirtualThunkPointer";
    InlinedAbstractMethodWithNopGuard = 62, "InlinedAbstractMethodWithNopGuard";
    /// Retired.
    ValidateRootClass = 63, "ValidateRootClass";
    ValidateClassByName = 64, "ValidateClassByName";
    ValidateProfiledClass = 65, "ValidateProfiledClass";
    ValidateClassFromCp = 66, "ValidateClassFromCP";
    ValidateDefiningClassFromCp = 67, "ValidateDefiningClassFromCP";
    ValidateStaticClassFromCp = 68, "ValidateStaticClassFromCP";
    /// Retired.
    ValidateClassFromMethod = 69, "ValidateClassFromMethod";
    /// Retired.
    ValidateComponentClassFromArrayClass = 70, "ValidateComponentClassFromArrayClass";
    ValidateArrayClassFromComponentClass = 71, "ValidateArrayClassFromComponentClass";
    ValidateSuperClassFromClass = 72, "ValidateSuperClassFromClass";
    ValidateClassInstanceOfClass = 73, "ValidateClassInstanceOfClass";
    ValidateSystemClassByName = 74, "ValidateSystemClassByName";
    ValidateClassFromITableIndexCp = 75, "ValidateClassFromITableIndexCP";
    ValidateDeclaringClassFromFieldOrStatic = 76, "ValidateDeclaringClassFromFieldOrStatic";
    /// Retired.
    ValidateClassClass = 77, "ValidateClassClass";
    ValidateConcreteSubClassFromClass = 78, "ValidateConcreteSubClassFromClass";
    ValidateClassChain = 79, "ValidateClassChain";
    /// Retired.
    ValidateRomClass = 80, "ValidateRomClass";
    /// Retired.
    ValidatePrimitiveClass = 81, "ValidatePrimitiveClass";
    /// Retired.
    ValidateMethodFromInlinedSite = 82, "ValidateMethodFromInlinedSite";
    /// Retired.
    ValidateMethodByName = 83, "ValidatedMethodByName";
    ValidateMethodFromClass = 84, "ValidatedMethodFromClass";
    ValidateStaticMethodFromCp = 85, "ValidateStaticMethodFromCP";
    ValidateSpecialMethodFromCp = 86, "ValidateSpecialMethodFromCP";
    ValidateVirtualMethodFromCp = 87, "ValidateVirtualMethodFromCP";
    ValidateVirtualMethodFromOffset = 88, "ValidateVirtualMethodFromOffset";
    ValidateInterfaceMethodFromCp = 89, "ValidateInterfaceMethodFromCP";
    ValidateMethodFromClassAndSig = 90, "ValidateMethodFromClassAndSig";
    ValidateStackWalkerMaySkipFrames = 91, "ValidateStackWalkerMaySkipFramesRecord";
    /// Retired.
    ValidateArrayClassFromJavaVm = 92, "ValidateArrayClassFromJavaVM";
    ValidateClassInfoIsInitialized = 93, "ValidateClassInfoIsInitialized";
    ValidateMethodFromSingleImplementer = 94, "ValidateMethodFromSingleImplementer";
    ValidateMethodFromSingleInterfaceImplementer = 95, "ValidateMethodFromSingleInterfaceImplementer";
    ValidateMethodFromSingleAbstractImplementer = 96, "ValidateMethodFromSingleAbstractImplementer";
    ValidateImproperInterfaceMethodFromCp = 97, "ValidateImproperInterfaceMethodFromCP";
    SymbolFromManager = 98, "SymbolFromManager";
    MethodCallAddress = 99, "MethodCallAddress";
    DiscontiguousSymbolFromManager = 100, "DiscontiguousSymbolFromManager";
    ResolvedTrampolines = 101, "ResolvedTrampolines";
    BlockFrequency = 102, "BlockFrequency";
    RecompQueuedFlag = 103, "RecompQueuedFlag";
}

impl fmt::Display for RelocationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
