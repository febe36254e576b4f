/*!
 * Shared Allocator Tests
 * Concurrent use through the mutex-guarded handle
 */

use heapslab::memory::{AllocatorConfig, MemoryAllocator, SimulatedHeapProvider};
use heapslab::{AllocResult, DeviceSize, MemoryTypeId, SharedMemoryAllocator};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::thread;

const THREADS: usize = 8;
const PER_THREAD: usize = 50;

fn shared() -> SharedMemoryAllocator<SimulatedHeapProvider> {
    MemoryAllocator::with_config(
        SimulatedHeapProvider::new(),
        AllocatorConfig::new(256, 64, 128),
    )
    .unwrap()
    .into()
}

#[test]
fn test_concurrent_allocations_are_disjoint() {
    let allocator = shared();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let allocator = allocator.clone();
            thread::spawn(move || {
                let memory_type = MemoryTypeId((t % 2) as u32);
                (0..PER_THREAD)
                    .map(|i| {
                        let size = ((i % 5) as DeviceSize + 1) * 200;
                        let result = allocator.allocate(memory_type, size, 1).unwrap();
                        (memory_type, result, size)
                    })
                    .collect::<Vec<(MemoryTypeId, AllocResult, DeviceSize)>>()
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    assert_eq!(results.len(), THREADS * PER_THREAD);

    // Every claimed cell appears once
    let mut cells = HashSet::new();
    for (_, result, size) in &results {
        let first = result.offset / 256;
        let count = (size + 255) / 256;
        for cell in first..first + count {
            assert!(cells.insert((result.heap, cell)), "cell claimed twice");
        }
    }

    for (memory_type, result, size) in &results {
        allocator.free_allocation(*memory_type, result, *size).unwrap();
    }
    let stats = allocator.stats();
    assert_eq!(stats.used_bytes, 0);
    assert_eq!(stats.pools.len(), 2);

    allocator.destroy().unwrap();
    allocator.with_lock(|inner| {
        assert!(inner.is_destroyed());
        assert_eq!(inner.provider().live_heaps(), 0);
    });
}

#[test]
fn test_with_lock_runs_atomically() {
    let allocator = shared();
    let (a, b) = allocator.with_lock(|inner| {
        let a = inner.allocate(MemoryTypeId(0), 256, 1).unwrap();
        let b = inner.allocate(MemoryTypeId(0), 256, 1).unwrap();
        (a, b)
    });
    assert_eq!(a.offset, 0);
    assert_eq!(b.offset, 256);
    assert_eq!(allocator.pool_stats(MemoryTypeId(0)).unwrap().used_bytes, 512);

    allocator.destroy().unwrap();
}
