//! Benchmarks for batch projection runs.
//!
//! Run with: `cargo bench` in the core/ directory.
//!
//! Benchmark groups:
//! 1. compile: parsing and lowering a typical lever script
//! 2. batch_run: a full run over a growing number of projected years,
//!    sequential against parallel

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use plastics_core::catalog::{CONSUMPTION_ATTRS, EOL_ATTRS};
use plastics_core::{
    Baseline, BaselineRecord, BatchEngine, Compiler, EngineOptions, LeverDefinition,
    LeverRegistry, Randomness, RunRequest,
};

const REGIONS: [&str; 4] = ["china", "eu30", "nafta", "row"];

const SCRIPT: &str = "
    var goal = in.recyclingTarget / 100;
    change goal by 0.2 over 2020 to 2050;
    limit goal to [0, 0.9];
    distribute out.china.eolLandfillMT * goal
        across [out.china.eolRecyclingMT, out.china.eolIncinerationMT] proportionally;
    out.china.eolLandfillMT = out.china.eolLandfillMT * (1 - goal);
    var noise = average 10 repeats of draw normally from mean of 1 std of 0.05;
    out.china.consumptionPackagingMT = out.china.consumptionPackagingMT * noise;
    inspect lifecycle of [out.china.consumptionPackagingMT, out.china.consumptionTextileMT];
";

fn baseline(last_year: i32) -> Arc<Baseline> {
    let records = (2010..=2020).flat_map(|year| {
        REGIONS.into_iter().map(move |region| BaselineRecord {
            year,
            region: region.to_string(),
            attributes: CONSUMPTION_ATTRS
                .iter()
                .chain(EOL_ATTRS.iter())
                .enumerate()
                .map(|(i, attribute)| (attribute.to_string(), (i + 1) as f64 + f64::from(year - 2010)))
                .collect(),
        })
    });
    Arc::new(Baseline::from_records(records).with_trend(2021..=last_year))
}

fn registry() -> LeverRegistry {
    let mut registry = LeverRegistry::default();
    for (i, variable) in ["recyclingTarget", "secondTarget", "thirdTarget"].iter().enumerate() {
        registry.register(LeverDefinition {
            variable: variable.to_string(),
            priority: i as i32,
            units: "%".to_string(),
            script: SCRIPT.replace("in.recyclingTarget", &format!("in.{variable}")),
            default_value: 20.0,
        });
    }
    for attribute in CONSUMPTION_ATTRS {
        registry.register(LeverDefinition {
            variable: attribute.replace("MT", "Lifecycle"),
            priority: 100,
            units: "years".to_string(),
            script: String::new(),
            default_value: 5.0,
        });
    }
    registry
}

fn bench_compile(c: &mut Criterion) {
    let compiler = Compiler::default();
    c.bench_function("compile", |b| {
        b.iter(|| compiler.compile(black_box(SCRIPT)));
    });
}

fn bench_batch_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_run");
    let registry = registry();

    for last_year in [2030, 2050] {
        let years = (last_year - 2020) as u64;
        group.throughput(Throughput::Elements(years));

        for parallel in [false, true] {
            let engine = BatchEngine::new(
                baseline(last_year),
                EngineOptions {
                    parallel,
                    randomness: Randomness::Seeded(1),
                },
            );
            let request = RunRequest {
                request_index: 0,
                historical_years: 2010..=2020,
                projection_years: 2021..=last_year,
                levers: registry.ordered(),
                inputs: registry.inputs(),
            };
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, years), &request, |b, request| {
                b.iter(|| engine.run(black_box(request)).expect("run failed"));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_batch_run);
criterion_main!(benches);
