mod common;

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use minipl::vm::Interpreter;

fn bench_vm(c: &mut Criterion) {
    for (label, source) in common::workloads("vm") {
        let compilation = common::compile_clean(&label, &source);
        let bytecode = common::bytecode(&compilation);

        c.bench_function(&format!("vm_execute_{label}"), |b| {
            b.iter(|| {
                let mut input: &[u8] = b"";
                let mut output = Vec::<u8>::new();
                Interpreter::new(black_box(bytecode))
                    .run(&mut input, &mut output)
                    .expect("run");
                black_box(output);
            })
        });
    }
}

criterion_group!(benches, bench_vm);
criterion_main!(benches);
