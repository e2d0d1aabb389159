//! Symbol validation records.
//!
//! When the symbol validation manager is enabled, every class and method the
//! compiled code depends on is given a small id, and the facts that tie ids
//! together are recorded so that a later process can re-derive and check them
//! before trusting the code.

use crate::target::{CachePointer, SymbolId};
use crate::RelocationKind;

/// Whether a query resolved to a definite answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Tristate {
    /// Definitely yes.
    Yes = 0,
    /// Definitely no.
    No = 1,
    /// Not known at compile time.
    Maybe = 2,
}

/// How a class was obtained from a constant pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassFromCpKind {
    /// A class reference.
    Class,
    /// The class of a static field or method reference.
    StaticClass,
    /// The interface named by an itable index.
    ITableIndex,
    /// The class declaring a field or static.
    DeclaringClass,
}

/// How one class relates to another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassRelation {
    /// The first class is the array class of the second.
    ArrayClassOf,
    /// The first class is the superclass of the second.
    SuperClassOf,
    /// The first class is the single concrete subclass of the second.
    ConcreteSubClassOf,
}

/// How a method was obtained from a constant pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MethodFromCpKind {
    /// A static method reference.
    Static,
    /// A special (direct) method reference.
    Special,
    /// A virtual method reference.
    Virtual,
    /// An interface method reference invoked on a non-interface receiver.
    ImproperInterface,
}

/// A single validation fact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValidationRecord {
    /// A class looked up by name from the class loader of another.
    ClassByName {
        /// The class found.
        class_id: SymbolId,
        /// The class whose loader performed the lookup.
        begin_class_id: SymbolId,
        /// Class chain of the class found.
        class_chain: CachePointer,
    },
    /// A class seen in profiling data.
    ProfiledClass {
        /// The class.
        class_id: SymbolId,
        /// Its class chain.
        class_chain: CachePointer,
        /// Class chain identifying its loader.
        loader_chain: CachePointer,
    },
    /// A class resolved through a constant pool entry.
    ClassFromCp {
        /// How the class was derived from the entry.
        kind: ClassFromCpKind,
        /// The class found.
        class_id: SymbolId,
        /// The class owning the constant pool.
        begin_class_id: SymbolId,
        /// The constant pool entry.
        cp_index: u32,
    },
    /// The class defining a field reached through a constant pool.
    DefiningClassFromCp {
        /// Whether the field is static.
        is_static: bool,
        /// The defining class.
        class_id: SymbolId,
        /// The class owning the constant pool.
        begin_class_id: SymbolId,
        /// The constant pool entry.
        cp_index: u32,
    },
    /// Two classes related to each other.
    RelatedClass {
        /// The relation.
        relation: ClassRelation,
        /// The class derived.
        class_id: SymbolId,
        /// The class it was derived from.
        from_class_id: SymbolId,
    },
    /// The outcome of an instance-of test between two classes.
    ClassInstanceOfClass {
        /// Whether the object's type was known exactly.
        object_type_is_fixed: bool,
        /// Whether the cast type was known exactly.
        cast_type_is_fixed: bool,
        /// The test's result.
        is_instance_of: bool,
        /// The object's class.
        class_id_one: SymbolId,
        /// The cast class.
        class_id_two: SymbolId,
    },
    /// A class loaded by the system class loader.
    SystemClassByName {
        /// The class.
        system_class_id: SymbolId,
        /// Its class chain.
        class_chain: CachePointer,
    },
    /// The class chain of a class.
    ClassChain {
        /// The class.
        class_id: SymbolId,
        /// Its class chain.
        class_chain: CachePointer,
    },
    /// A method found by index in a class.
    MethodFromClass {
        /// The method.
        method_id: SymbolId,
        /// The class holding it.
        begin_class_id: SymbolId,
        /// Index of the method in the class.
        index: u32,
    },
    /// A method resolved through a constant pool entry.
    MethodFromCp {
        /// How the method was resolved.
        kind: MethodFromCpKind,
        /// The method.
        method_id: SymbolId,
        /// The class defining it.
        defining_class_id: SymbolId,
        /// The class owning the constant pool.
        begin_class_id: SymbolId,
        /// The constant pool entry.
        cp_index: u32,
    },
    /// A virtual method found by vtable offset.
    VirtualMethodFromOffset {
        /// The method.
        method_id: SymbolId,
        /// The class defining it.
        defining_class_id: SymbolId,
        /// The receiver class.
        begin_class_id: SymbolId,
        /// Vtable offset of the call; must fit in 15 signed bits.
        virtual_call_offset: i16,
        /// Whether runtime resolution was skipped.
        ignore_rt_resolve: bool,
    },
    /// An interface method resolved through a constant pool entry.
    InterfaceMethodFromCp {
        /// The method.
        method_id: SymbolId,
        /// The class defining it.
        defining_class_id: SymbolId,
        /// The class owning the constant pool.
        begin_class_id: SymbolId,
        /// The class the lookup started from.
        lookup_class_id: SymbolId,
        /// The constant pool entry.
        cp_index: u32,
    },
    /// A method found by name and signature.
    MethodFromClassAndSig {
        /// The method.
        method_id: SymbolId,
        /// The class defining it.
        defining_class_id: SymbolId,
        /// The class whose loader performed the lookup.
        begin_class_id: SymbolId,
        /// The class searched.
        lookup_class_id: SymbolId,
        /// The method's read-only description.
        rom_method: CachePointer,
    },
    /// Whether a stack walker may skip a method's frames.
    StackWalkerMaySkipFrames {
        /// The method.
        method_id: SymbolId,
        /// The class declaring it.
        method_class_id: SymbolId,
        /// The answer.
        skip_frames: bool,
    },
    /// Whether a class was initialized at compile time.
    ClassInfoIsInitialized {
        /// The class.
        class_id: SymbolId,
        /// The answer.
        is_initialized: bool,
    },
    /// A method that was the single implementer of a virtual method.
    MethodFromSingleImplementer {
        /// The method.
        method_id: SymbolId,
        /// The class defining it.
        defining_class_id: SymbolId,
        /// The class whose hierarchy was searched.
        this_class_id: SymbolId,
        /// Constant pool index or vtable slot used for the lookup.
        cp_index_or_vft_slot: i32,
        /// The calling method.
        caller_method_id: SymbolId,
        /// Whether resolved interface methods were consulted.
        use_resolved_interface_method: Tristate,
    },
    /// A method that was the single implementer of an interface method.
    MethodFromSingleInterfaceImplementer {
        /// The method.
        method_id: SymbolId,
        /// The class defining it.
        defining_class_id: SymbolId,
        /// The interface searched.
        this_class_id: SymbolId,
        /// The calling method.
        caller_method_id: SymbolId,
        /// The constant pool entry.
        cp_index: i32,
    },
    /// A method that was the single implementer of an abstract method.
    MethodFromSingleAbstractImplementer {
        /// The method.
        method_id: SymbolId,
        /// The class defining it.
        defining_class_id: SymbolId,
        /// The abstract class searched.
        this_class_id: SymbolId,
        /// Vtable slot of the abstract method.
        vft_slot: i32,
        /// The calling method.
        caller_method_id: SymbolId,
    },
}

impl ValidationRecord {
    /// The record kind written for this fact.
    pub fn kind(&self) -> RelocationKind {
        use RelocationKind as K;
        match self {
            ValidationRecord::ClassByName { .. } => K::ValidateClassByName,
            ValidationRecord::ProfiledClass { .. } => K::ValidateProfiledClass,
            ValidationRecord::ClassFromCp { kind, .. } => match kind {
                ClassFromCpKind::Class => K::ValidateClassFromCp,
                ClassFromCpKind::StaticClass => K::ValidateStaticClassFromCp,
                ClassFromCpKind::ITableIndex => K::ValidateClassFromITableIndexCp,
                ClassFromCpKind::DeclaringClass => K::ValidateDeclaringClassFromFieldOrStatic,
            },
            ValidationRecord::DefiningClassFromCp { .. } => K::ValidateDefiningClassFromCp,
            ValidationRecord::RelatedClass { relation, .. } => match relation {
                ClassRelation::ArrayClassOf => K::ValidateArrayClassFromComponentClass,
                ClassRelation::SuperClassOf => K::ValidateSuperClassFromClass,
                ClassRelation::ConcreteSubClassOf => K::ValidateConcreteSubClassFromClass,
            },
            ValidationRecord::ClassInstanceOfClass { .. } => K::ValidateClassInstanceOfClass,
            ValidationRecord::SystemClassByName { .. } => K::ValidateSystemClassByName,
            ValidationRecord::ClassChain { .. } => K::ValidateClassChain,
            ValidationRecord::MethodFromClass { .. } => K::ValidateMethodFromClass,
            ValidationRecord::MethodFromCp { kind, .. } => match kind {
                MethodFromCpKind::Static => K::ValidateStaticMethodFromCp,
                MethodFromCpKind::Special => K::ValidateSpecialMethodFromCp,
                MethodFromCpKind::Virtual => K::ValidateVirtualMethodFromCp,
                MethodFromCpKind::ImproperInterface => K::ValidateImproperInterfaceMethodFromCp,
            },
            ValidationRecord::VirtualMethodFromOffset { .. } => K::ValidateVirtualMethodFromOffset,
            ValidationRecord::InterfaceMethodFromCp { .. } => K::ValidateInterfaceMethodFromCp,
            ValidationRecord::MethodFromClassAndSig { .. } => K::ValidateMethodFromClassAndSig,
            ValidationRecord::StackWalkerMaySkipFrames { .. } => {
                K::ValidateStackWalkerMaySkipFrames
            }
            ValidationRecord::ClassInfoIsInitialized { .. } => K::ValidateClassInfoIsInitialized,
            ValidationRecord::MethodFromSingleImplementer { .. } => {
                K::ValidateMethodFromSingleImplementer
            }
            ValidationRecord::MethodFromSingleInterfaceImplementer { .. } => {
                K::ValidateMethodFromSingleInterfaceImplementer
            }
            ValidationRecord::MethodFromSingleAbstractImplementer { .. } => {
                K::ValidateMethodFromSingleAbstractImplementer
            }
        }
    }
}
