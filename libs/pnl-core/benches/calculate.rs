use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pnl_core::positions::{generate, PositionConfig};
use pnl_core::PnlEngine;
use types::record::UpdateRecord;
use types::reference::ReferenceTable;

fn full_batch(reference: &ReferenceTable, step: f64) -> Vec<UpdateRecord> {
    reference
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let last = row.last * (1.0 + step);
            UpdateRecord {
                symbol_index: i as u32,
                last,
                change: last - row.last,
                change_pct: step * 100.0,
                high: last.max(row.high),
                low: last.min(row.low),
                volume: row.volume,
            }
        })
        .collect()
}

fn bench_calculate(c: &mut Criterion) {
    let reference = ReferenceTable::builtin();
    let directory = reference.directory();
    let config = PositionConfig {
        count: reference.len(),
        ..PositionConfig::default()
    };
    let positions = generate(&directory, &reference, &config, 11).unwrap();

    let mut engine = PnlEngine::new();
    engine.set_directory(directory);
    engine.set_positions(positions);
    let batch = full_batch(&reference, 0.0125);

    c.bench_function("calculate_full_batch", |b| {
        b.iter(|| engine.calculate(black_box(batch.clone())))
    });
}

criterion_group!(benches, bench_calculate);
criterion_main!(benches);
