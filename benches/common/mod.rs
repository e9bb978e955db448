#![allow(dead_code)]
use std::path::Path;

use minipl::bytecode::Bytecode;
use minipl::{Compilation, Config, compile};
use test_support::bench_cases;

/// Fixture programs tagged for the given benchmark group, as (name, source).
pub fn workloads(tag: &str) -> Vec<(String, String)> {
    bench_cases(Path::new("tests/programs"), tag)
        .unwrap_or_else(|err| panic!("load bench cases: {err:#}"))
        .into_iter()
        .map(|case| {
            let source = case
                .program()
                .unwrap_or_else(|err| panic!("read {}: {err:#}", case.name));
            (case.name, source)
        })
        .collect()
}

pub fn compile_clean(name: &str, source: &str) -> Compilation {
    let compilation =
        compile(source, &Config::default()).unwrap_or_else(|err| panic!("compile {name}: {err}"));
    assert!(
        compilation.succeeded(),
        "{name} has diagnostics:\n{}",
        compilation.report()
    );
    compilation
}

pub fn bytecode(compilation: &Compilation) -> &Bytecode {
    compilation
        .bytecode
        .as_ref()
        .expect("clean compilation has bytecode")
}
