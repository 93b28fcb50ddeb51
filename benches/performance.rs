// Performance benchmarks for home-sounds
//
// Run with: cargo bench
// View results in: target/criterion/report/index.html

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use home_sounds::{
    FormatterRegistry, HostEvent, Library, LibraryKind, LibraryLayout, NullBackend, SoundCache,
};

const OGG_HEADER: &[u8] = b"OggS\0\x02\0\0\0\0\0\0";

fn library_with_sounds(dir: &std::path::Path, count: usize) -> Library {
    let library = Library::new(LibraryLayout::new(dir.join("sounds"), dir.join("musics")));
    library.ensure_dirs().unwrap();
    for i in 0..count {
        std::fs::write(dir.join("sounds").join(format!("sound{}.ogg", i)), OGG_HEADER).unwrap();
    }
    library
}

/// Benchmark directory listing at several library sizes
fn bench_list_sounds(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_sounds");

    for count in [10, 100, 500] {
        let dir = tempfile::tempdir().unwrap();
        let library = library_with_sounds(dir.path(), count);

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(library.list(LibraryKind::Sound).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark a reconciliation pass on an already loaded cache
fn bench_reconcile_steady_state(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let library = library_with_sounds(dir.path(), 100);
    let cache = SoundCache::new(Arc::new(NullBackend));
    cache.reconcile(&library).unwrap();

    c.bench_function("reconcile_steady_state", |b| {
        b.iter(|| black_box(cache.reconcile(&library).unwrap()))
    });
}

/// Benchmark cache lookup used by every sound trigger
fn bench_cache_lookup(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let library = library_with_sounds(dir.path(), 100);
    let cache = SoundCache::new(Arc::new(NullBackend));
    cache.reconcile(&library).unwrap();

    c.bench_function("cache_lookup", |b| {
        b.iter(|| black_box(cache.get("sound42.ogg")))
    });
}

/// Benchmark event formatting
fn bench_format_event(c: &mut Criterion) {
    let registry = FormatterRegistry::with_builtins();
    let event = HostEvent::new("system.time.sunset");

    c.bench_function("format_event", |b| {
        b.iter(|| black_box(registry.format(&event)))
    });
}

criterion_group!(
    benches,
    bench_list_sounds,
    bench_reconcile_steady_state,
    bench_cache_lookup,
    bench_format_event,
);

criterion_main!(benches);
