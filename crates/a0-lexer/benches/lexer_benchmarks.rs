use criterion::{black_box, criterion_group, criterion_main, Criterion};

const SAMPLE: &str = r#"
cap { fs.read: allow }
budget { max_tool_calls: 10, max_wall_ms: 5000 }

fn greet { name: "x" } {
    let message = str.concat { a: "hello ", b: name }
    return { message: message }
}

let result = greet { name: "world" }
return { ok: true, value: result.message }
"#;

fn bench_lex(c: &mut Criterion) {
    c.bench_function("lex_sample_program", |b| {
        b.iter(|| {
            let out = a0_lexer::lex(black_box(SAMPLE), "bench.a0");
            black_box(out);
        });
    });
}

criterion_group!(benches, bench_lex);
criterion_main!(benches);
