use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use blockalloc::{Fit, Heap, HeapConfig};

/// Heap with `blocks` allocations where every other one has been released,
/// so the locator has plenty of free holes of mixed sizes to walk through.
fn fragmented(fit: Fit, blocks: usize) -> Heap {
    let mut heap = Heap::from_config(&HeapConfig::default().with_fit(fit).with_limit(16 << 20));
    let ptrs: Vec<_> = (0..blocks)
        .map(|i| heap.allocate(16 + (i * 37) % 240).unwrap())
        .collect();

    for ptr in ptrs.iter().step_by(2) {
        heap.release(*ptr);
    }

    heap
}

pub fn bench_fit(c: &mut Criterion) {
    for fit in [Fit::First, Fit::Best, Fit::Worst] {
        c.bench_function(&format!("{fit:?}_fit_reuse_1000_holes"), |b| {
            b.iter_batched(
                || fragmented(fit, 2000),
                |mut heap| {
                    for i in 0..200 {
                        black_box(heap.allocate(8 + (i * 13) % 120).ok());
                    }
                    black_box(heap)
                },
                BatchSize::SmallInput,
            )
        });
    }

    c.bench_function("allocate_release_cycle", |b| {
        let mut heap = Heap::from_config(&HeapConfig::default());
        b.iter(|| {
            let ptrs: Vec<_> = (0..64).map(|i| heap.allocate(black_box(i * 4)).unwrap()).collect();
            for ptr in ptrs.into_iter().rev() {
                heap.release(ptr);
            }
        })
    });
}

criterion_group!(benches, bench_fit);
criterion_main!(benches);
