use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pyrolysis::{simulate, Catalog, Feedstock, SimulationInputs};
use studio_core::{CatalystId, HeatSourceId, Mixture, ModeId};

fn bench_simulate(c: &mut Criterion) {
    let catalog = Catalog::builtin();
    let mixture = Mixture::new([("pino", 60.0), ("polietileno", 40.0)]).unwrap();
    let inputs = SimulationInputs {
        feedstock: Feedstock::Advanced(mixture),
        mode_id: ModeId::new("rapida"),
        heat_source_id: HeatSourceId::new("electrica_renovable"),
        catalyst_id: Some(CatalystId::new("zsm5")),
        temperature_c: 520.0,
        residence_time_s: 2.0,
        oxygen_pct: 1.0,
    };
    c.bench_function("simulate blended feed", |b| {
        b.iter(|| black_box(simulate(&catalog, &inputs)))
    });
}

criterion_group!(benches, bench_simulate);
criterion_main!(benches);
