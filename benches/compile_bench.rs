//! Benchmarks for Loopbench compilation and execution

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use loopbench::compile::{assemble, Compiler};
use loopbench::instance::{instantiate, ImportTable, MemoryImport};
use loopbench::invoke::invoke;
use loopbench::native;
use loopbench::source::FillLoop;

/// Benchmark text → binary assembly
fn bench_assemble(c: &mut Criterion) {
    let source = FillLoop::benchmark().render();

    c.bench_function("assemble_fill_loop", |b| {
        b.iter(|| black_box(assemble(black_box(&source))))
    });
}

/// Benchmark full compilation (assembly + native code generation)
fn bench_compile(c: &mut Criterion) {
    let compiler = Compiler::new().expect("engine");
    let source = FillLoop::benchmark().render();

    // Warm up
    let _ = compiler.compile(&source);

    c.bench_function("compile_fill_loop", |b| {
        b.iter(|| black_box(compiler.compile(&source)))
    });
}

/// Benchmark instantiation with and without an imported shared memory
fn bench_instantiate(c: &mut Criterion) {
    let compiler = Compiler::new().expect("engine");
    let mut group = c.benchmark_group("instantiate");

    let own = compiler.compile(&FillLoop::benchmark().render()).unwrap();
    group.bench_function("exported_memory", |b| {
        b.iter(|| black_box(instantiate(&own, &ImportTable::empty())))
    });

    let shared = compiler
        .compile(&FillLoop::shared_import().render())
        .unwrap();
    let imports = ImportTable::with_memory(MemoryImport::default());
    group.bench_function("shared_import", |b| {
        b.iter(|| black_box(instantiate(&shared, &imports)))
    });

    group.finish();
}

/// Benchmark one call of the fill loop for a few outer counts
fn bench_fill_loop(c: &mut Criterion) {
    let compiler = Compiler::new().expect("engine");
    let mut group = c.benchmark_group("fill_loop");

    for &outer in &[1u32, 8, 64] {
        let inner = 16_384;
        group.throughput(Throughput::Elements(u64::from(outer) * inner as u64));

        let unit = compiler
            .compile(&FillLoop::benchmark().outer(outer).inner(inner).render())
            .unwrap();
        let mut instance = instantiate(&unit, &ImportTable::empty()).unwrap();
        group.bench_function(format!("wasm_outer_{}", outer), |b| {
            b.iter(|| invoke(&mut instance, "fill_0").unwrap())
        });

        group.bench_function(format!("native_outer_{}", outer), |b| {
            b.iter(|| black_box(native::run(outer, inner)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_assemble,
    bench_compile,
    bench_instantiate,
    bench_fill_loop
);
criterion_main!(benches);
