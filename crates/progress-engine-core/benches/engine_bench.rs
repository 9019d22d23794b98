use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use progress_engine_core::{
    recommend, summarize, CatalogueItem, Counter, EntityId, IdListType, ItemId,
    LevelThresholdPolicy, ProgressionIndex, ProgressionRecord, ReferenceTables,
};

fn mk_counter(index: u32, tables: &ReferenceTables) -> Counter {
    let line = &tables.class_mastery[usize::try_from(index).unwrap_or(0) % tables.class_mastery.len()];
    Counter {
        id: if index % 2 == 0 { line.level7 } else { line.level10 },
        name: format!("bench-{index}"),
        description: String::new(),
        current_value: f64::from(index % 40),
        current_tier: "GOLD".to_string(),
        thresholds: [("PLATINUM".to_string(), 45.0), ("MASTER".to_string(), 60.0)].into_iter().collect(),
        eligible_ids: (0..1_000).map(EntityId).collect(),
        completed_ids: (0..index % 50).map(EntityId).collect(),
        id_list_type: IdListType::Champion,
        category: "VETERANCY".to_string(),
        is_capstone: false,
        capstone_group: None,
        parent_id: None,
        points_awarded: 0,
    }
}

fn mk_record(index: u32) -> ProgressionRecord {
    ProgressionRecord {
        entity_id: EntityId(index),
        level: index % 11,
        points: i64::from(index) * 100,
        points_since_last_level: i64::from(index % 600),
        points_until_next_level: i64::from((index * 37) % 1_200),
    }
}

fn mk_item(index: u32) -> CatalogueItem {
    CatalogueItem {
        id: ItemId(u64::from(index)),
        owner_id: EntityId(index % 170),
        name: format!("skin-{index}"),
        is_base: index % 17 == 0,
        rarity: if index % 5 == 0 { "kEpic".to_string() } else { "kNoRarity".to_string() },
        is_legacy: index % 7 == 0,
        owned: index % 3 == 0,
        in_queue: index % 4 == 0,
    }
}

fn bench_recommend(c: &mut Criterion) {
    let tables = ReferenceTables::default();
    let counters = (0..12).map(|index| mk_counter(index, &tables)).collect::<Vec<_>>();
    let records = (0..1_000).map(mk_record).collect::<Vec<_>>();
    let index = ProgressionIndex::new(&records, &[]);
    let policy = LevelThresholdPolicy::from_tables(&tables);

    c.bench_function("recommend_1000_records", |b| {
        b.iter(|| {
            let report = recommend(&counters, &index, &policy, &tables);
            black_box(report);
        });
    });
}

fn bench_summarize(c: &mut Criterion) {
    let items = (0..1_000).map(mk_item).collect::<Vec<_>>();

    c.bench_function("summarize_1000_items", |b| {
        b.iter(|| {
            let groups = summarize(&items, |item| item.owner_id);
            black_box(groups);
        });
    });
}

criterion_group!(engine_benches, bench_recommend, bench_summarize);
criterion_main!(engine_benches);
