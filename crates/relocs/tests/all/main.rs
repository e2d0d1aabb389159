mod encode;

use aot_relocs::RelocationBuffer;
use aot_relocs::environ::{
    ByteOrder, CachePointer, ClassHandle, ConstantPoolHandle, DebugCounter, DebugCounterId,
    DebugCounterRegistry, EncodeServices, HeapAllocator, InlinedCallSite, MethodContext,
    PointerWidth, PrimaryMap, RelocationAllocator, RelocationKind, SharedCache, Tunables,
    ValidationManager,
};
use smallvec::SmallVec;
use std::sync::Mutex;

/// Start of the fake shared cache; pointers below it are not in the cache.
pub const CACHE_BASE: u64 = 0x10_0000;

/// Where the fake validation manager keeps its well-known class chains.
pub const WELL_KNOWN: CachePointer = CachePointer(CACHE_BASE + 0x40);

pub const OUTER_POOL: ConstantPoolHandle = ConstantPoolHandle(0xa000);
pub const INLINED_POOL: ConstantPoolHandle = ConstantPoolHandle(0xb000);

/// A shared cache that remembers every class except the null one.
#[derive(Default)]
pub struct TestCache {
    strings: Mutex<Vec<String>>,
}

impl SharedCache for TestCache {
    fn offset_of(&self, pointer: CachePointer) -> Option<u64> {
        pointer.0.checked_sub(CACHE_BASE)
    }

    fn class_chain_offset(&self, class: ClassHandle) -> Option<u64> {
        (class.0 != 0).then(|| class.0 * 0x10)
    }

    fn loader_chain_offset(&self, class: ClassHandle) -> Option<u64> {
        (class.0 != 0).then(|| class.0 * 0x10 + 8)
    }

    fn rom_class_offset(&self, class: ClassHandle) -> Option<u64> {
        (class.0 != 0).then(|| class.0 * 0x10 + 4)
    }

    fn intern_string(&self, name: &str) -> Option<u64> {
        let mut strings = self.strings.lock().unwrap();
        let index = match strings.iter().position(|s| s == name) {
            Some(index) => index,
            None => {
                strings.push(name.to_string());
                strings.len() - 1
            }
        };
        Some(0x8000 + 0x100 * index as u64)
    }
}

pub struct TestValidation {
    pub enabled: bool,
}

impl ValidationManager for TestValidation {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn well_known_class_chain_offsets(&self) -> CachePointer {
        WELL_KNOWN
    }
}

/// Refuses every allocation.
pub struct NoMemory;

impl RelocationAllocator for NoMemory {
    fn allocate(&self, _size: usize) -> Option<Vec<u8>> {
        None
    }
}

/// Hands out buffers one byte short.
pub struct ShortAllocator;

impl RelocationAllocator for ShortAllocator {
    fn allocate(&self, size: usize) -> Option<Vec<u8>> {
        Some(vec![0; size.saturating_sub(1)])
    }
}

/// Hands out buffers filled with garbage, so every byte must be written.
pub struct DirtyAllocator;

impl RelocationAllocator for DirtyAllocator {
    fn allocate(&self, size: usize) -> Option<Vec<u8>> {
        Some(vec![0xcd; size])
    }
}

/// Everything a compilation needs besides its requests.
pub struct Fixture {
    pub method: MethodContext,
    pub cache: TestCache,
    pub validation: TestValidation,
    pub counters: PrimaryMap<DebugCounterId, DebugCounter>,
}

impl Fixture {
    pub fn new() -> Fixture {
        let _ = env_logger::try_init();
        let mut method = MethodContext::new(OUTER_POOL);
        method.inlined_sites.push(InlinedCallSite {
            constant_pool: INLINED_POOL,
        });
        Fixture {
            method,
            cache: TestCache::default(),
            validation: TestValidation { enabled: false },
            counters: PrimaryMap::new(),
        }
    }

    pub fn services<'a>(&'a self, allocator: &'a dyn RelocationAllocator) -> EncodeServices<'a> {
        EncodeServices {
            allocator,
            shared_cache: &self.cache,
            validation: &self.validation,
            debug_counters: &self.counters as &dyn DebugCounterRegistry,
        }
    }

    pub fn heap(&self) -> EncodeServices<'_> {
        self.services(&HeapAllocator)
    }
}

pub fn tunables(width: PointerWidth) -> Tunables {
    Tunables {
        pointer_width: width,
        byte_order: ByteOrder::Little,
        needs_method_trampolines: width == PointerWidth::U64,
    }
}

/// A decoded record: kind, flags bits, and field values.
pub type Decoded = (RelocationKind, u8, SmallVec<[u64; 8]>);

pub fn decode(buffer: &RelocationBuffer) -> Vec<Decoded> {
    let table = buffer.table().unwrap();
    assert_eq!(table.region_size(), buffer.data().len() as u64);
    table
        .records()
        .map(|record| {
            let record = record.unwrap();
            (record.kind(), record.flags().bits(), record.fields().unwrap())
        })
        .collect()
}
