//! Resolving targets into the field values of their records.
//!
//! Values are produced in the order of the kind's schema and widened to
//! `u64`. Signed quantities are sign-extended, so `-1` becomes all ones at
//! whatever width the field is written.

use aot_relocs_environ::{
    CachePointer, ClassHandle, ConstantPoolIndexKind, DebugCounterId, EncodeServices,
    InlinedSite, MethodContext, RelocationError, RelocationTarget, SymbolId, SymbolRef,
    ValidationRecord,
};
use smallvec::{SmallVec, smallvec};

/// Field values of one record.
pub type FieldValues = SmallVec<[u64; 8]>;

fn signed(value: impl Into<i64>) -> u64 {
    let value: i64 = value.into();
    value as u64
}

fn flag(value: bool) -> u64 {
    u64::from(value)
}

fn id(id: SymbolId) -> u64 {
    u64::from(id.0)
}

/// Everything needed to resolve targets for one compilation.
pub struct EmitContext<'a> {
    method: &'a MethodContext,
    services: EncodeServices<'a>,
}

impl<'a> EmitContext<'a> {
    /// Creates a context for the given method.
    pub fn new(method: &'a MethodContext, services: EncodeServices<'a>) -> EmitContext<'a> {
        EmitContext { method, services }
    }

    fn cache_failure(what: &str, value: u64) -> RelocationError {
        RelocationError::AotDataGenerationFailed(format!(
            "{what} {value:#x} could not be remembered in the shared cache"
        ))
    }

    fn offset_of(&self, pointer: CachePointer) -> Result<u64, RelocationError> {
        self.services
            .shared_cache
            .offset_of(pointer)
            .ok_or_else(|| Self::cache_failure("pointer", pointer.0))
    }

    fn class_chain(&self, class: ClassHandle) -> Result<u64, RelocationError> {
        self.services
            .shared_cache
            .class_chain_offset(class)
            .ok_or_else(|| Self::cache_failure("class chain of class", class.0))
    }

    fn loader_chain(&self, class: ClassHandle) -> Result<u64, RelocationError> {
        self.services
            .shared_cache
            .loader_chain_offset(class)
            .ok_or_else(|| Self::cache_failure("loader of class", class.0))
    }

    fn rom_class(&self, class: ClassHandle) -> Result<u64, RelocationError> {
        self.services
            .shared_cache
            .rom_class_offset(class)
            .ok_or_else(|| Self::cache_failure("ROM class of class", class.0))
    }

    fn corrected_site(
        &self,
        symbol: &SymbolRef,
        site: InlinedSite,
    ) -> Result<u64, RelocationError> {
        Ok(self
            .method
            .correct_inlined_site(symbol.constant_pool, site)?
            .raw())
    }

    /// Resolves `target` into its field values.
    pub fn field_values(&self, target: &RelocationTarget) -> Result<FieldValues, RelocationError> {
        use RelocationTarget as T;
        let cp = |symbol: &SymbolRef| symbol.constant_pool.0;
        let cp_index = |symbol: &SymbolRef| signed(symbol.cp_index);

        let values = match target {
            T::Marker(_) => smallvec![],
            T::Helper { helper, .. } => smallvec![u64::from(helper.0)],
            T::Value { value, .. } => smallvec![*value],
            T::ConstantPool {
                constant_pool,
                site,
                ..
            } => smallvec![site.raw(), constant_pool.0],
            T::ConstantPoolOrderedPair {
                constant_pool,
                site,
            } => smallvec![site.raw(), constant_pool.0],
            T::ConstantPoolEntry { kind, symbol, site } => {
                let site = match kind {
                    ConstantPoolIndexKind::ClassAddress => self.corrected_site(symbol, *site)?,
                    _ => site.raw(),
                };
                smallvec![site, cp(symbol), cp_index(symbol)]
            }
            T::J2iThunk(node) => {
                smallvec![node.site.raw(), cp(&node.symbol), cp_index(&node.symbol)]
            }
            T::J2iVirtualThunkPointer {
                symbol,
                site,
                thunk_offset,
            } => smallvec![site.raw(), cp(symbol), *thunk_offset],
            T::DataAddress { symbol, site } => smallvec![
                self.corrected_site(symbol, *site)?,
                cp(symbol),
                cp_index(symbol),
                signed(symbol.offset),
            ],
            T::VerifyClassObjectForAlloc {
                symbol,
                site,
                allocation_size,
                branch_offset,
            } => smallvec![
                site.raw(),
                cp(symbol),
                cp_index(symbol),
                *allocation_size,
                *branch_offset,
            ],
            T::VerifyRefArrayForAlloc {
                symbol,
                site,
                branch_offset,
            } => smallvec![site.raw(), cp(symbol), cp_index(symbol), *branch_offset],
            T::FieldValidation {
                symbol,
                site,
                class,
                ..
            } => smallvec![
                site.raw(),
                cp(symbol),
                cp_index(symbol),
                self.class_chain(*class)?,
            ],
            T::InlinedMethod {
                symbol,
                site,
                class,
                ..
            } => smallvec![
                site.raw(),
                cp(symbol),
                cp_index(symbol),
                self.rom_class(*class)?,
            ],
            T::NopGuard {
                symbol,
                site,
                class,
                destination,
                ..
            } => smallvec![
                site.raw(),
                cp(symbol),
                cp_index(symbol),
                self.rom_class(*class)?,
                *destination,
            ],
            T::ProfiledGuard {
                symbol,
                site,
                class,
                method_index,
                destination,
                ..
            } => smallvec![
                site.raw(),
                cp(symbol),
                cp_index(symbol),
                self.loader_chain(*class)?,
                self.class_chain(*class)?,
                *method_index,
                *destination,
            ],
            T::MethodPointer {
                site,
                class,
                vtable_slot,
            } => smallvec![
                site.raw(),
                self.loader_chain(*class)?,
                self.class_chain(*class)?,
                *vtable_slot,
            ],
            T::ClassPointer { site, class } => smallvec![
                site.raw(),
                self.loader_chain(*class)?,
                self.class_chain(*class)?,
            ],
            T::ArbitraryClassAddress {
                symbol,
                class,
                site,
            } => smallvec![
                self.corrected_site(symbol, *site)?,
                self.loader_chain(*class)?,
                self.class_chain(*class)?,
            ],
            T::ValidateArbitraryClass { class } => {
                smallvec![self.loader_chain(*class)?, self.class_chain(*class)?]
            }
            T::DebugCounter(counter) => self.debug_counter(*counter)?,
            T::Validation(record) => self.validation(record)?,
            T::Symbol {
                symbol_id,
                symbol_type,
                ..
            } => smallvec![id(*symbol_id), u64::from(*symbol_type)],
            T::ResolvedTrampolines { symbol_id } => smallvec![id(*symbol_id)],
        };
        Ok(values)
    }

    fn debug_counter(&self, id: DebugCounterId) -> Result<FieldValues, RelocationError> {
        let failed = || {
            RelocationError::AotDataGenerationFailed(
                "Failed to generate debug counter relo data".to_string(),
            )
        };
        let counter = self.services.debug_counters.counter(id).ok_or_else(failed)?;
        let (Some(name), Some(data)) = (counter.name.as_deref(), counter.relo_data) else {
            return Err(failed());
        };
        let name = self
            .services
            .shared_cache
            .intern_string(name)
            .ok_or_else(|| {
                RelocationError::AotDataGenerationFailed(format!(
                    "debug counter name {name:?} could not be remembered in the shared cache"
                ))
            })?;
        Ok(smallvec![
            signed(data.caller_index),
            signed(data.bytecode_index),
            name,
            signed(data.delta),
            signed(data.fidelity),
            signed(data.static_delta),
        ])
    }

    fn validation(&self, record: &ValidationRecord) -> Result<FieldValues, RelocationError> {
        use ValidationRecord as V;
        let values = match *record {
            V::ClassByName {
                class_id,
                begin_class_id,
                class_chain,
            } => smallvec![id(class_id), id(begin_class_id), self.offset_of(class_chain)?],
            V::ProfiledClass {
                class_id,
                class_chain,
                loader_chain,
            } => smallvec![
                id(class_id),
                self.offset_of(class_chain)?,
                self.offset_of(loader_chain)?,
            ],
            V::ClassFromCp {
                class_id,
                begin_class_id,
                cp_index,
                ..
            } => smallvec![id(class_id), id(begin_class_id), u64::from(cp_index)],
            V::DefiningClassFromCp {
                is_static,
                class_id,
                begin_class_id,
                cp_index,
            } => smallvec![
                flag(is_static),
                id(class_id),
                id(begin_class_id),
                u64::from(cp_index),
            ],
            V::RelatedClass {
                class_id,
                from_class_id,
                ..
            } => smallvec![id(class_id), id(from_class_id)],
            V::ClassInstanceOfClass {
                object_type_is_fixed,
                cast_type_is_fixed,
                is_instance_of,
                class_id_one,
                class_id_two,
            } => smallvec![
                flag(object_type_is_fixed),
                flag(cast_type_is_fixed),
                flag(is_instance_of),
                id(class_id_one),
                id(class_id_two),
            ],
            V::SystemClassByName {
                system_class_id,
                class_chain,
            } => smallvec![id(system_class_id), self.offset_of(class_chain)?],
            V::ClassChain {
                class_id,
                class_chain,
            } => smallvec![id(class_id), self.offset_of(class_chain)?],
            V::MethodFromClass {
                method_id,
                begin_class_id,
                index,
            } => smallvec![id(method_id), id(begin_class_id), u64::from(index)],
            V::MethodFromCp {
                method_id,
                defining_class_id,
                begin_class_id,
                cp_index,
                ..
            } => smallvec![
                id(method_id),
                id(defining_class_id),
                id(begin_class_id),
                u64::from(cp_index),
            ],
            V::VirtualMethodFromOffset {
                method_id,
                defining_class_id,
                begin_class_id,
                virtual_call_offset,
                ignore_rt_resolve,
            } => {
                // The offset shares its field with the flag in the low bit.
                if !(-0x4000..0x4000).contains(&virtual_call_offset) {
                    return Err(RelocationError::AotDataGenerationFailed(format!(
                        "virtual call offset {virtual_call_offset} does not fit in 15 bits"
                    )));
                }
                let packed = ((virtual_call_offset as u16) << 1) | u16::from(ignore_rt_resolve);
                smallvec![
                    id(method_id),
                    id(defining_class_id),
                    id(begin_class_id),
                    u64::from(packed),
                ]
            }
            V::InterfaceMethodFromCp {
                method_id,
                defining_class_id,
                begin_class_id,
                lookup_class_id,
                cp_index,
            } => smallvec![
                id(method_id),
                id(defining_class_id),
                id(begin_class_id),
                id(lookup_class_id),
                u64::from(cp_index),
            ],
            V::MethodFromClassAndSig {
                method_id,
                defining_class_id,
                begin_class_id,
                lookup_class_id,
                rom_method,
            } => smallvec![
                id(method_id),
                id(defining_class_id),
                id(begin_class_id),
                id(lookup_class_id),
                self.offset_of(rom_method)?,
            ],
            V::StackWalkerMaySkipFrames {
                method_id,
                method_class_id,
                skip_frames,
            } => smallvec![id(method_id), id(method_class_id), flag(skip_frames)],
            V::ClassInfoIsInitialized {
                class_id,
                is_initialized,
            } => smallvec![id(class_id), flag(is_initialized)],
            V::MethodFromSingleImplementer {
                method_id,
                defining_class_id,
                this_class_id,
                cp_index_or_vft_slot,
                caller_method_id,
                use_resolved_interface_method,
            } => smallvec![
                id(method_id),
                id(defining_class_id),
                id(this_class_id),
                u64::from(cp_index_or_vft_slot as u32),
                id(caller_method_id),
                use_resolved_interface_method as u64,
            ],
            V::MethodFromSingleInterfaceImplementer {
                method_id,
                defining_class_id,
                this_class_id,
                caller_method_id,
                cp_index,
            } => smallvec![
                id(method_id),
                id(defining_class_id),
                id(this_class_id),
                id(caller_method_id),
                u64::from(cp_index as u32),
            ],
            V::MethodFromSingleAbstractImplementer {
                method_id,
                defining_class_id,
                this_class_id,
                vft_slot,
                caller_method_id,
            } => smallvec![
                id(method_id),
                id(defining_class_id),
                id(this_class_id),
                u64::from(vft_slot as u32),
                id(caller_method_id),
            ],
        };
        Ok(values)
    }
}
