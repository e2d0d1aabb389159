//! Collaborators consulted while relocation data is encoded.
//!
//! These are owned by the runtime and shared between compilation threads.
//! Implementations serialize their own mutation; the encoder only holds
//! shared references to them for the duration of one compilation.

use crate::target::{CachePointer, ClassHandle, DebugCounterId};
use std::collections::TryReserveError;

/// Hands out the memory relocation data is written into.
pub trait RelocationAllocator: Send + Sync {
    /// Allocates exactly `size` bytes, or returns `None` if the request
    /// cannot be satisfied.
    fn allocate(&self, size: usize) -> Option<Vec<u8>>;
}

/// Allocates relocation data from the global heap.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapAllocator;

impl HeapAllocator {
    fn try_allocate(size: usize) -> Result<Vec<u8>, TryReserveError> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(size)?;
        buffer.resize(size, 0);
        Ok(buffer)
    }
}

impl RelocationAllocator for HeapAllocator {
    fn allocate(&self, size: usize) -> Option<Vec<u8>> {
        match HeapAllocator::try_allocate(size) {
            Ok(buffer) => Some(buffer),
            Err(e) => {
                log::warn!("failed to allocate {size} bytes of relocation data: {e}");
                None
            }
        }
    }
}

/// The persistent cache that compiled code is stored in.
///
/// Values living in the cache are referred to by offsets that remain valid
/// in every process attached to it.
pub trait SharedCache: Send + Sync {
    /// Offset of a pointer into the cache, or `None` if it points elsewhere.
    fn offset_of(&self, pointer: CachePointer) -> Option<u64>;

    /// Offset of the class chain of `class`, recording the chain if needed.
    fn class_chain_offset(&self, class: ClassHandle) -> Option<u64>;

    /// Offset of the class chain identifying the class loader of `class`.
    fn loader_chain_offset(&self, class: ClassHandle) -> Option<u64>;

    /// Offset of the read-only description of `class`.
    fn rom_class_offset(&self, class: ClassHandle) -> Option<u64>;

    /// Stores `name` in the cache and returns its offset.
    fn intern_string(&self, name: &str) -> Option<u64>;
}

/// The symbol validation manager of a compilation.
pub trait ValidationManager: Send + Sync {
    /// Whether symbol validation is in use for this compilation.
    fn is_enabled(&self) -> bool;

    /// Pointer to the class chain offsets of the well-known classes.
    fn well_known_class_chain_offsets(&self) -> CachePointer;
}

/// A validation manager for compilations that do not validate symbols.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoValidation;

impl ValidationManager for NoValidation {
    fn is_enabled(&self) -> bool {
        false
    }

    fn well_known_class_chain_offsets(&self) -> CachePointer {
        CachePointer(0)
    }
}

/// Where a debug counter increment was generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebugCounterReloData {
    /// Inlined-site index of the increment.
    pub caller_index: i32,
    /// Bytecode index of the increment.
    pub bytecode_index: i32,
    /// Amount added on every increment.
    pub delta: i32,
    /// Fidelity level of the counter.
    pub fidelity: i8,
    /// Amount added when the counter is static.
    pub static_delta: i32,
}

/// A debug counter incremented by generated code.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DebugCounter {
    /// Counter name.
    pub name: Option<String>,
    /// Data needed to rebind the counter after loading.
    pub relo_data: Option<DebugCounterReloData>,
}

/// The debug counters referenced by a compilation.
pub trait DebugCounterRegistry: Send + Sync {
    /// Returns counter `id`, if registered.
    fn counter(&self, id: DebugCounterId) -> Option<&DebugCounter>;
}

impl DebugCounterRegistry for cranelift_entity::PrimaryMap<DebugCounterId, DebugCounter> {
    fn counter(&self, id: DebugCounterId) -> Option<&DebugCounter> {
        self.get(id)
    }
}

/// Everything the encoder consults besides the requests.
#[derive(Clone, Copy)]
pub struct EncodeServices<'a> {
    /// Buffer allocation.
    pub allocator: &'a dyn RelocationAllocator,
    /// The shared cache.
    pub shared_cache: &'a dyn SharedCache,
    /// The symbol validation manager.
    pub validation: &'a dyn ValidationManager,
    /// The debug counter registry.
    pub debug_counters: &'a dyn DebugCounterRegistry,
}
