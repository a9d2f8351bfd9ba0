use std::{env, path::PathBuf};

use criterion::{criterion_group, criterion_main, Criterion};
use lr1gen::{grammar::Grammar, lr1::Config, table::ParseTable};

criterion_main!(benches);
criterion_group!(benches, bench_arithmetic, bench_small);

fn bench_arithmetic(c: &mut Criterion) {
    bench_generate(c, "arithmetic");
}

fn bench_small(c: &mut Criterion) {
    bench_generate(c, "assignment");
    bench_generate(c, "list");
    bench_generate(c, "pointer");
}

fn bench_generate(c: &mut Criterion, grammar_name: &str) {
    let project_root = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .expect("missing environment variable: `CARGO_MANIFEST_DIR'");
    let grammar =
        Grammar::from_file(project_root.join(format!("tests/{}.grammar", grammar_name))).unwrap();

    let mut group = c.benchmark_group(grammar_name);
    group.bench_function("Declaration", |b| {
        b.iter(|| Config::new().use_declaration_order().generate(&grammar));
    });
    group.bench_function("Reversed", |b| {
        b.iter(|| Config::new().use_reversed_order().generate(&grammar));
    });
    let collection = Config::new().generate(&grammar);
    group.bench_function("ParseTable", |b| {
        b.iter(|| ParseTable::generate(&collection).unwrap());
    });
    group.finish();
}
