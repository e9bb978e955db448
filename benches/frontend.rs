mod common;

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use minipl::diagnostics::Diagnostics;
use minipl::source::{DEFAULT_TAB_WIDTH, SourceText};
use minipl::{Config, compile, lexer, parser};

fn bench_frontend(c: &mut Criterion) {
    for (label, source) in common::workloads("frontend") {
        common::compile_clean(&label, &source);

        c.bench_function(&format!("frontend_tokenize_{label}"), |b| {
            b.iter(|| {
                let out = lexer::tokenize(black_box(&source), DEFAULT_TAB_WIDTH).expect("tokenize");
                black_box(out);
            })
        });

        c.bench_function(&format!("frontend_parse_{label}"), |b| {
            let text = SourceText::new(&source, DEFAULT_TAB_WIDTH);
            b.iter(|| {
                let mut diagnostics = Diagnostics::new();
                let out = parser::parse(black_box(&text), &mut diagnostics).expect("parse");
                black_box(out);
            })
        });

        c.bench_function(&format!("frontend_compile_{label}"), |b| {
            let config = Config::default();
            b.iter(|| {
                let out = compile(black_box(&source), &config).expect("compile");
                black_box(out);
            })
        });
    }
}

criterion_group!(benches, bench_frontend);
criterion_main!(benches);
