use criterion::{black_box, criterion_group, criterion_main, Criterion};
use showctl::script::{parse, Interpreter};

fn make_line(pairs: usize) -> String {
    let mut line = String::from("moveto");
    for i in 0..pairs {
        line.push_str(&format!(" key{i} {}", i as f64 * 0.5));
    }
    line
}

fn bench_tokenize(c: &mut Criterion) {
    let short = "flag stars on";
    let quoted = r#"print text "The quick brown fox jumps over the lazy dog" duration 2"#;
    let long = make_line(64);

    let mut g = c.benchmark_group("tokenize");

    g.bench_function("short", |b| b.iter(|| parse(black_box(short))));
    g.bench_function("quoted", |b| b.iter(|| parse(black_box(quoted))));
    g.bench_function("long", |b| b.iter(|| parse(black_box(&long))));

    g.finish();
}

fn bench_execute(c: &mut Criterion) {
    let mut interp = Interpreter::default();
    let _ = interp.execute("define x 0");

    let mut g = c.benchmark_group("execute");

    g.bench_function("add", |b| b.iter(|| interp.execute(black_box("add x 1"))));
    g.bench_function("suppressed", |b| {
        let _ = interp.execute("comment");
        b.iter(|| interp.execute(black_box("add x 1")));
        let _ = interp.execute("uncomment");
    });

    g.finish();
}

criterion_group!(benches, bench_tokenize, bench_execute);
criterion_main!(benches);
