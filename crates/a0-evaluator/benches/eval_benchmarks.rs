use a0_evaluator::{execute, Options};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::BTreeSet;

const SAMPLE: &str = r#"
fn double { x } {
    return { v: x * 2 }
}

fn add { acc, item } {
    return acc + item.v
}

let input = [1, 2, 3, 4, 5]
let doubled = map { in: input, fn: "double" }
let total = reduce { in: doubled, fn: "add", init: 0 }
return { doubled: doubled, total: total }
"#;

fn program() -> a0_ast::Program {
    a0_parser::parse(SAMPLE, "bench.a0").program.expect("bench program must parse")
}

fn bench_execute(c: &mut Criterion) {
    let prog = program();
    c.bench_function("execute_map_reduce_pipeline", |b| {
        b.iter(|| {
            let options = Options::new("bench-run", BTreeSet::new());
            let outcome = execute(black_box(&prog), options);
            black_box(outcome)
        });
    });
}

criterion_group!(benches, bench_execute);
criterion_main!(benches);
