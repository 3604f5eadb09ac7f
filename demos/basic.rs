//! Walks a heap reserved from the operating system through a few requests
//! and prints its layout after every step.
//!
//! Run with `RUST_LOG=trace cargo run --example basic` to see the allocator's
//! own logs as well.

use blockalloc::{Fit, Heap, HeapConfig, MappedBreak, Ptr};

fn log_alloc(heap: &Heap<MappedBreak>, what: &str, ptr: Ptr) {
    println!("{what}: received {ptr}");
    print!("{heap}");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = HeapConfig::default().with_fit(Fit::First);
    let mut heap = Heap::with_config(MappedBreak::reserve(64 * 1024)?, &config);

    let x = heap.allocate_zeroed(4, 1)?;
    log_alloc(&heap, "zeroed 4 x 1 byte", x);

    let y = heap.allocate(4)?;
    log_alloc(&heap, "4 bytes", y);

    heap.release(x);
    println!("released {x}");
    print!("{heap}");

    heap.release(y);
    println!("released {y}");
    print!("{heap}");

    let parts: Vec<_> = (1..=4)
        .map(|i| heap.allocate(i * 24))
        .collect::<Result<_, _>>()?;
    heap.release(parts[1]);
    heap.release(parts[2]);
    println!("released two neighbours, they are now one block");
    print!("{heap}");

    let grown = heap.resize(Some(parts[0]), 96)?;
    log_alloc(&heap, "grew the first block in place", grown);

    heap.check()?;
    println!("{:?}", heap.stats());

    Ok(())
}
