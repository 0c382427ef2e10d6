//! Rendering benchmarks.
//!
//! - Fast path: plain `%d %u %s %c` handled without delegation
//! - Delegated: width, precision and radix directives
//! - Extensions, bound format strings and scratch buffers
//!
//! ## Profiling with Puffin
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Mutex;
use std::sync::atomic::AtomicU32;
use textfmt::{BoundFormatString, Formatter, ScratchPool, ScratchSlot, args};

#[cfg(feature = "profile-with-puffin")]
use std::collections::HashMap;

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

/// Print total time per top-level scope across recorded frames.
#[cfg(feature = "profile-with-puffin")]
fn print_profiling_stats() {
    use puffin::Reader;

    let Some(frame_view) = FRAME_VIEW.get() else {
        return;
    };
    let view = frame_view.lock();
    let scope_collection = view.scope_collection();

    let mut totals: HashMap<String, i64> = HashMap::new();
    let mut frames = 0i64;
    for frame in view.recent_frames() {
        frames += 1;
        let Ok(unpacked) = frame.unpacked() else {
            continue;
        };
        for (_thread, stream_info) in unpacked.thread_streams.iter() {
            let Ok(scopes) = Reader::from_start(&stream_info.stream).read_top_scopes() else {
                continue;
            };
            for scope in scopes {
                if let Some(details) = scope_collection.fetch_by_id(&scope.id) {
                    *totals.entry(details.name().to_string()).or_insert(0) +=
                        scope.record.duration_ns;
                }
            }
        }
    }

    println!("\n=== Profiling Summary ({frames} frames) ===");
    let mut entries: Vec<_> = totals.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    for (name, ns) in entries {
        let avg = if frames > 0 { ns / frames } else { ns };
        println!(
            "  {:40} {:>10.2?} avg",
            name,
            std::time::Duration::from_nanos(avg as u64)
        );
    }
}

#[cfg(not(feature = "profile-with-puffin"))]
fn print_profiling_stats() {}

fn directive_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let formatter = Formatter::new();
    let mut buf = [0u8; 256];

    let mut group = c.benchmark_group("format/directives");

    let template = "%s scored %d points in %u rounds (%c)";
    group.throughput(Throughput::Bytes(template.len() as u64));
    group.bench_function("fast_path", |b| {
        b.iter(|| {
            let rendered = formatter
                .format(&mut buf, black_box(template), &args!["player", -1250, 12u32, 'A'])
                .unwrap();
            end_profiling_frame();
            black_box(rendered)
        });
    });

    let template = "[%-12s] %08x %+6d %.3s";
    group.bench_function("delegated", |b| {
        b.iter(|| {
            let rendered = formatter
                .format(&mut buf, black_box(template), &args!["name", 0xbeefu32, 42, "truncated"])
                .unwrap();
            end_profiling_frame();
            black_box(rendered)
        });
    });

    let template = "%[u8] %[i16] %[u32] %[i64]";
    group.bench_function("extensions", |b| {
        b.iter(|| {
            let rendered = formatter
                .format(&mut buf, black_box(template), &args![300, -1, 7, 9])
                .unwrap();
            black_box(rendered)
        });
    });

    let long = "x".repeat(4096);
    group.throughput(Throughput::Bytes(long.len() as u64));
    group.bench_function("truncated_long_string", |b| {
        b.iter(|| {
            let rendered = formatter
                .format(&mut buf, "%s", &args![black_box(long.as_str())])
                .unwrap();
            black_box(rendered)
        });
    });

    group.finish();
    print_profiling_stats();
}

fn bound_and_scratch_benchmarks(c: &mut Criterion) {
    let formatter = Formatter::new();
    let mut group = c.benchmark_group("format/reuse");

    let hits = AtomicU32::new(17);
    let lock = Mutex::new(());
    let name = String::from("sensor");
    let bound = BoundFormatString::builder("%s: %u hits")
        .arg(&name)
        .guarded_by(&lock)
        .arg(&hits)
        .build()
        .unwrap();
    let mut buf = [0u8; 64];
    group.bench_function("bound_render", |b| {
        b.iter(|| black_box(bound.render(&formatter, &mut buf).unwrap()));
    });

    let pool = ScratchPool::new();
    group.bench_function("scratch_render", |b| {
        b.iter(|| {
            let text = pool
                .render(&formatter, ScratchSlot::Status, "frame %u", &args![black_box(60u32)])
                .unwrap();
            black_box(text.len())
        });
    });

    group.finish();
}

criterion_group!(benches, directive_benchmarks, bound_and_scratch_benchmarks);
criterion_main!(benches);
