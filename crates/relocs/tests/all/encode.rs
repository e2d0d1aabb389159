use crate::*;
use aot_relocs::environ::{
    ClassFromCpKind, CodeNode, ConstantPoolIndexKind, DebugCounterReloData, HelperId,
    HelperKind, InlinedSite, InlinedSiteIndex, MarkerKind, NopGuardKind, RelocationError,
    RelocationRequest, RelocationTarget, SymbolId, SymbolRef, ValidationRecord, ValueKind,
    object::Endianness, relocation_size,
};
use aot_relocs::{RelocationBuffer, process_relocations};

fn global_value(value: u64) -> RelocationRequest {
    RelocationRequest::new(RelocationTarget::Value {
        kind: ValueKind::GlobalValue,
        value,
    })
}

fn ordered_pair() -> RelocationRequest {
    RelocationRequest::new(RelocationTarget::ConstantPoolOrderedPair {
        constant_pool: INLINED_POOL,
        site: InlinedSite::Inlined(InlinedSiteIndex::from_u32(0)),
    })
}

fn run(
    fixture: &Fixture,
    requests: &[RelocationRequest],
    width: PointerWidth,
) -> Result<Option<RelocationBuffer>, RelocationError> {
    process_relocations(requests, &fixture.method, &tunables(width), fixture.heap())
}

fn encoded(
    fixture: &Fixture,
    requests: &[RelocationRequest],
    width: PointerWidth,
) -> RelocationBuffer {
    run(fixture, requests, width).unwrap().unwrap()
}

fn encoded_with(
    fixture: &Fixture,
    requests: &[RelocationRequest],
    tunables: &Tunables,
) -> RelocationBuffer {
    process_relocations(requests, &fixture.method, tunables, fixture.heap())
        .unwrap()
        .unwrap()
}

#[test]
fn single_value() {
    let fixture = Fixture::new();
    let buffer = encoded(&fixture, &[global_value(0xdead_beef)], PointerWidth::U64);
    assert_eq!(buffer.data().len(), 8 + 16);
    assert_eq!(
        buffer.data(),
        &[
            24, 0, 0, 0, 0, 0, 0, 0, //
            16, 0, 29, 0, 0, 0, 0, 0, //
            0xef, 0xbe, 0xad, 0xde, 0, 0, 0, 0,
        ]
    );
}

#[test]
fn ordered_pair_writes_site_then_pool() {
    let fixture = Fixture::new();
    let buffer = encoded(&fixture, &[ordered_pair()], PointerWidth::U64);
    let records = decode(&buffer);
    assert_eq!(buffer.data().len(), 8 + 24);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, RelocationKind::ConstantPoolOrderedPair);
    assert_eq!(records[0].2.as_slice(), &[0, INLINED_POOL.0]);
}

#[test]
fn debug_counter() {
    let mut fixture = Fixture::new();
    let id = fixture.counters.push(DebugCounter {
        name: Some("inliner/success".to_string()),
        relo_data: Some(DebugCounterReloData {
            caller_index: -1,
            bytecode_index: 17,
            delta: 1,
            fidelity: 2,
            static_delta: 0,
        }),
    });
    let request = RelocationRequest::new(RelocationTarget::DebugCounter(id));
    let buffer = encoded(&fixture, &[request], PointerWidth::U64);
    assert_eq!(buffer.data().len(), 8 + 56);
    let records = decode(&buffer);
    assert_eq!(records[0].0, RelocationKind::DebugCounter);
    assert_eq!(records[0].2.as_slice(), &[u64::MAX, 17, 0x8000, 1, 2, 0]);
}

#[test]
fn missing_debug_counter_data_fails() {
    let mut fixture = Fixture::new();
    let id = fixture.counters.push(DebugCounter {
        name: Some("unfinished".to_string()),
        relo_data: None,
    });
    let requests = [
        global_value(1),
        RelocationRequest::new(RelocationTarget::DebugCounter(id)),
    ];
    let err = run(&fixture, &requests, PointerWidth::U64).unwrap_err();
    assert!(matches!(err, RelocationError::AotDataGenerationFailed(_)));
    assert!(err.to_string().starts_with("AOT data generation failed"));
}

#[test]
fn empty_with_validation() {
    let mut fixture = Fixture::new();
    fixture.validation.enabled = true;
    let buffer = encoded(&fixture, &[], PointerWidth::U64);
    assert_eq!(buffer.data().len(), 16);
    assert!(buffer.has_well_known_offset());
    let table = buffer.table().unwrap();
    assert_eq!(table.region_size(), 16);
    assert_eq!(
        table.well_known_class_chain_offset(),
        Some(WELL_KNOWN.0 - CACHE_BASE)
    );
    assert_eq!(table.records().count(), 0);
}

#[test]
fn empty_without_validation() {
    let fixture = Fixture::new();
    assert_eq!(run(&fixture, &[], PointerWidth::U64).unwrap(), None);
    assert_eq!(run(&fixture, &[], PointerWidth::U32).unwrap(), None);
}

#[test]
fn value_then_pair() {
    let fixture = Fixture::new();
    let buffer = encoded(&fixture, &[global_value(5), ordered_pair()], PointerWidth::U64);
    assert_eq!(buffer.data().len(), 8 + 16 + 24);
    let kinds = decode(&buffer).into_iter().map(|r| r.0).collect::<Vec<_>>();
    assert_eq!(
        kinds,
        [
            RelocationKind::GlobalValue,
            RelocationKind::ConstantPoolOrderedPair
        ]
    );
}

#[test]
fn well_known_offset_follows_validation_mode() {
    let mut fixture = Fixture::new();
    let requests = [global_value(5)];
    for width in [PointerWidth::U32, PointerWidth::U64] {
        fixture.validation.enabled = false;
        let without = encoded(&fixture, &requests, width);
        fixture.validation.enabled = true;
        let with = encoded(&fixture, &requests, width);
        assert_eq!(
            with.data().len() - without.data().len(),
            usize::from(width.bytes())
        );
        assert_eq!(without.table().unwrap().well_known_class_chain_offset(), None);
        assert_eq!(decode(&with), decode(&without));
    }
}

#[test]
fn well_known_offset_must_be_in_the_cache() {
    struct Outside;
    impl ValidationManager for Outside {
        fn is_enabled(&self) -> bool {
            true
        }
        fn well_known_class_chain_offsets(&self) -> CachePointer {
            CachePointer(0x10)
        }
    }
    let fixture = Fixture::new();
    let services = EncodeServices {
        validation: &Outside,
        ..fixture.heap()
    };
    let result = process_relocations(
        &[],
        &fixture.method,
        &tunables(PointerWidth::U64),
        services,
    );
    assert!(matches!(
        result,
        Err(RelocationError::AotDataGenerationFailed(_))
    ));
}

#[test]
fn allocation_failures() {
    let fixture = Fixture::new();
    let requests = [global_value(5)];
    let result = process_relocations(
        &requests,
        &fixture.method,
        &tunables(PointerWidth::U64),
        fixture.services(&NoMemory),
    );
    assert_eq!(result, Err(RelocationError::AllocationFailed { size: 24 }));

    let result = process_relocations(
        &requests,
        &fixture.method,
        &tunables(PointerWidth::U32),
        fixture.services(&ShortAllocator),
    );
    assert_eq!(result, Err(RelocationError::AllocationFailed { size: 12 }));
}

#[test]
fn every_byte_is_written() {
    let fixture = Fixture::new();
    let requests = [
        RelocationRequest::new(RelocationTarget::Helper {
            kind: HelperKind::HelperAddress,
            helper: HelperId(3),
        }),
        RelocationRequest::new(RelocationTarget::Validation(
            ValidationRecord::StackWalkerMaySkipFrames {
                method_id: SymbolId(1),
                method_class_id: SymbolId(2),
                skip_frames: true,
            },
        )),
    ];
    let dirty = process_relocations(
        &requests,
        &fixture.method,
        &tunables(PointerWidth::U64),
        fixture.services(&DirtyAllocator),
    )
    .unwrap()
    .unwrap();
    let clean = encoded(&fixture, &requests, PointerWidth::U64);
    assert_eq!(dirty.data(), clean.data());
    // 64-bit stack walker record: header, two ids, flag, padding.
    assert_eq!(
        &clean.data()[16..],
        &[16, 0, 91, 0, 0, 0, 0, 0, 1, 0, 2, 0, 1, 0, 0, 0]
    );
}

#[test]
fn trampolines_are_reserved_on_64_bit_only() {
    let mut fixture = Fixture::new();
    fixture.method.pic_slot_count = 4;

    let buffer = encoded(&fixture, &[global_value(1)], PointerWidth::U64);
    let records = decode(&buffer);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].0, RelocationKind::PicTrampolines);
    assert_eq!(records[1].2.as_slice(), &[4]);
    let table = buffer.table().unwrap();
    let last = table.records().last().unwrap().unwrap();
    assert_eq!(last.header_word(), Some(4));
    assert!(last.body().is_empty());

    // Even when the code cache would want them, 32-bit targets never
    // reserve them.
    let mut t = tunables(PointerWidth::U32);
    t.needs_method_trampolines = true;
    let buffer = encoded_with(&fixture, &[global_value(1)], &t);
    let kinds = decode(&buffer).into_iter().map(|r| r.0).collect::<Vec<_>>();
    assert_eq!(kinds, [RelocationKind::GlobalValue]);

    // Nothing but the trampoline count still produces a buffer.
    let buffer = encoded(&fixture, &[], PointerWidth::U64);
    assert_eq!(buffer.data().len(), 8 + 8);
}

#[test]
fn wide_offsets_are_flagged() {
    let fixture = Fixture::new();
    let narrow = encoded(&fixture, &[global_value(1).at(0xfff0)], PointerWidth::U64);
    assert!(decode(&narrow).iter().all(|r| r.1 == 0));

    let wide = encoded(
        &fixture,
        &[global_value(1).at(4), global_value(2).at(0x1_0004)],
        PointerWidth::U64,
    );
    assert!(decode(&wide).iter().all(|r| r.1 == 1));
}

#[test]
fn validations_precede_their_target() {
    let fixture = Fixture::new();
    let symbol = SymbolRef::new(OUTER_POOL, 12);
    let request = RelocationRequest::new(RelocationTarget::ConstantPoolEntry {
        kind: ConstantPoolIndexKind::ClassAddress,
        symbol,
        site: InlinedSite::Inlined(InlinedSiteIndex::from_u32(0)),
    })
    .validated_by(ValidationRecord::ClassFromCp {
        kind: ClassFromCpKind::Class,
        class_id: SymbolId(2),
        begin_class_id: SymbolId(1),
        cp_index: 12,
    })
    .validated_by(ValidationRecord::ClassChain {
        class_id: SymbolId(2),
        class_chain: CachePointer(CACHE_BASE + 0x200),
    });
    let records = decode(&encoded(&fixture, &[global_value(1), request], PointerWidth::U64));
    let kinds = records.iter().map(|r| r.0).collect::<Vec<_>>();
    assert_eq!(
        kinds,
        [
            RelocationKind::GlobalValue,
            RelocationKind::ValidateClassFromCp,
            RelocationKind::ValidateClassChain,
            RelocationKind::ClassAddress,
        ]
    );
    assert_eq!(records[1].2.as_slice(), &[2, 1, 12]);
    assert_eq!(records[2].2.as_slice(), &[2, 0x200]);
    // The class lives in the outermost method's pool.
    assert_eq!(records[3].2.as_slice(), &[u64::MAX, OUTER_POOL.0, 12]);
}

#[test]
fn unowned_constant_pool_fails() {
    let fixture = Fixture::new();
    let request = RelocationRequest::new(RelocationTarget::DataAddress {
        symbol: SymbolRef::new(ConstantPoolHandle(0xc000), 1),
        site: InlinedSite::Outermost,
    });
    assert!(matches!(
        run(&fixture, &[request], PointerWidth::U64),
        Err(RelocationError::AotDataGenerationFailed(_))
    ));
}

#[test]
fn uncached_class_fails() {
    let fixture = Fixture::new();
    let request = RelocationRequest::new(RelocationTarget::NopGuard {
        kind: NopGuardKind::InlinedVirtualMethodWithNopGuard,
        symbol: SymbolRef::new(OUTER_POOL, 3),
        site: InlinedSite::Outermost,
        class: ClassHandle(0),
        destination: 0x80,
    });
    assert!(run(&fixture, &[request], PointerWidth::U32).is_err());
}

#[test]
fn widths_are_isolated() {
    let fixture = Fixture::new();
    let requests = [
        global_value(u64::MAX),
        ordered_pair(),
        RelocationRequest::new(RelocationTarget::Marker(
            MarkerKind::AbsoluteMethodAddressOrderedPair,
        )),
        RelocationRequest::new(RelocationTarget::J2iThunk(CodeNode {
            site: InlinedSite::Outermost,
            symbol: SymbolRef::new(OUTER_POOL, 40),
        })),
    ];
    for width in [PointerWidth::U32, PointerWidth::U64] {
        let buffer = encoded(&fixture, &requests, width);
        assert_eq!(buffer.width(), width);
        let expected = usize::from(width.bytes())
            + requests
                .iter()
                .map(|r| usize::from(relocation_size(r.target.kind(), width)))
                .sum::<usize>();
        assert_eq!(buffer.data().len(), expected);
        let records = decode(&buffer);
        let all_ones = match width {
            PointerWidth::U32 => u64::from(u32::MAX),
            PointerWidth::U64 => u64::MAX,
        };
        assert_eq!(records[0].2.as_slice(), &[all_ones]);
        assert_eq!(records[3].2.as_slice(), &[all_ones, OUTER_POOL.0, 40]);
    }
}

#[test]
fn big_endian_targets() {
    let fixture = Fixture::new();
    let mut t = tunables(PointerWidth::U32);
    t.byte_order = ByteOrder::Big;
    let buffer = encoded_with(&fixture, &[global_value(0x0102_0304)], &t);
    assert_eq!(buffer.data(), &[0, 0, 0, 12, 0, 8, 29, 0, 1, 2, 3, 4]);
    let table = aot_relocs::environ::RelocationTable::parse(
        buffer.data(),
        PointerWidth::U32,
        Endianness::Big,
        false,
    )
    .unwrap();
    assert_eq!(table.records().count(), 1);
}

#[test]
fn tunables_from_config() {
    let fixture = Fixture::new();
    let t = Tunables::from_toml(
        r#"
        [relocations]
        pointer-width = "32"
        byte-order = "little"
        "#,
    )
    .unwrap();
    let buffer = encoded_with(&fixture, &[global_value(7)], &t);
    assert_eq!(buffer.data(), &[12, 0, 0, 0, 8, 0, 29, 0, 7, 0, 0, 0]);

    let triple: target_lexicon::Triple = "aarch64-unknown-linux-gnu".parse().unwrap();
    let t = Tunables::default_for_target(&triple).unwrap();
    let buffer = encoded_with(&fixture, &[global_value(7)], &t);
    assert_eq!(buffer.data().len(), 24);
}
