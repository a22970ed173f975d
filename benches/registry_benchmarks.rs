//! Benchmarks for the wrapper lifecycle hot paths.
//!
//! - Registry: raw track/release throughput, single and multi-threaded
//! - Wrappers: wrap + drop, clone, cast through `QueryInterface`
//! - Enumerators: draining a long chain enumerator in different batch sizes
//!
//! ## Profiling with Puffin
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- registry
//! ```

use cordebug::prelude::*;
use cordebug::sys::{IID_ICorDebugFrame, ICorDebugChain};
use cordebug::testing::{ChainSpec, FrameSpec, MockProcess};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

const FRAME: WrapperKind = WrapperKind::new("Frame", "ICorDebugFrame", IID_ICorDebugFrame);

fn handle(i: usize) -> HandleId {
    HandleId::from_ptr(((i + 1) * 16) as *const u8)
}

fn bench_registry(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("registry");

    for count in [100usize, 10_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("track_release", count), &count, |b, &count| {
            let registry = ResourceRegistry::new();
            b.iter(|| {
                for i in 0..count {
                    registry.track(black_box(handle(i)), FRAME);
                }
                for i in 0..count {
                    registry.release(black_box(handle(i)), FRAME);
                }
                end_profiling_frame();
            });
        });
    }

    group.throughput(Throughput::Elements(4 * 2_500));
    group.bench_function("contended_4_threads", |b| {
        let registry = Arc::new(ResourceRegistry::new());
        b.iter(|| {
            let workers: Vec<_> = (0..4)
                .map(|worker| {
                    let registry = Arc::clone(&registry);
                    thread::spawn(move || {
                        for i in 0..2_500 {
                            let h = handle(worker * 2_500 + i);
                            registry.track(h, FRAME);
                            registry.release(h, FRAME);
                        }
                    })
                })
                .collect();
            for worker in workers {
                let _ = worker.join();
            }
        });
    });

    group.finish();
}

fn bench_wrappers(c: &mut Criterion) {
    let mut group = c.benchmark_group("wrappers");
    let process = MockProcess::new();
    let session = DebugSession::start(SessionConfig::default());

    group.bench_function("wrap_drop", |b| {
        b.iter(|| {
            let frame: Option<Frame> = unsafe { session.wrap(process.frame(FrameSpec::default())) };
            black_box(frame)
        });
    });

    let frame: Option<Frame> = unsafe { session.wrap(process.frame(FrameSpec::default())) };
    if let Some(frame) = frame {
        group.bench_function("clone", |b| b.iter(|| black_box(frame.clone())));
        group.bench_function("cast_to_il", |b| {
            b.iter(|| black_box(frame.cast_to::<IlFrame>()))
        });
        group.bench_function("probe_native", |b| {
            b.iter(|| black_box(frame.probe::<NativeFrame>()))
        });
    }

    group.finish();
}

fn bench_enumeration(c: &mut Criterion) {
    let mut group = c.benchmark_group("enumeration");
    let process = MockProcess::new();
    let session = DebugSession::start(SessionConfig::default());

    let chains: Vec<*mut ICorDebugChain> = (0..1_000)
        .map(|_| process.chain(ChainSpec::default()))
        .collect();
    let chain_enum: Option<ChainEnum> = unsafe { session.wrap(process.chain_enum(chains)) };
    let Some(chain_enum) = chain_enum else {
        return;
    };

    group.throughput(Throughput::Elements(1_000));
    for batch in [1u32, 16, 256] {
        group.bench_with_input(BenchmarkId::new("drain", batch), &batch, |b, &batch| {
            b.iter(|| {
                let _ = chain_enum.reset();
                black_box(chain_enum.items(batch).count())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_registry, bench_wrappers, bench_enumeration);
criterion_main!(benches);
