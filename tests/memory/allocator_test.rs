/*!
 * Memory Allocator Tests
 * Growth bounds, error taxonomy, lifecycle and stats
 */

use heapslab::memory::{
    AllocatorConfig, HeapProvider, MemoryAllocator, MemoryError, MemoryPressure,
    MemoryProperties, MemoryRequirements, MemoryTypeInfo, ProviderError, SimulatedHeapProvider,
};
use heapslab::{DeviceSize, HeapHandle, MemoryTypeId, PoolGrowth, RecordingObserver};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const TYPE: MemoryTypeId = MemoryTypeId(2);

fn allocator_with(max_slots: usize) -> MemoryAllocator<SimulatedHeapProvider> {
    MemoryAllocator::with_config(
        SimulatedHeapProvider::new(),
        AllocatorConfig::new(512, 8, max_slots),
    )
    .unwrap()
}

#[test]
fn test_rejects_heap_not_multiple_of_eight() {
    let result = MemoryAllocator::with_config(
        SimulatedHeapProvider::new(),
        AllocatorConfig::new(512, 12, 4),
    );
    assert!(matches!(result, Err(MemoryError::Configuration(_))));
}

#[test]
fn test_size_bound() {
    let mut allocator = allocator_with(4);

    // Seven cells fit; eight would fill the whole heap and are refused
    assert!(allocator.allocate(TYPE, 7 * 512, 1).is_ok());
    assert_eq!(
        allocator.allocate(TYPE, 7 * 512 + 1, 1),
        Err(MemoryError::AllocationTooLarge {
            requested: 7 * 512 + 1,
            cells: 8,
            limit: 4096,
        })
    );
    assert!(matches!(
        allocator.allocate(TYPE, 1 << 30, 1),
        Err(MemoryError::AllocationTooLarge { .. })
    ));

    allocator.destroy().unwrap();
}

#[test]
fn test_growth_stops_at_slot_cap() {
    let mut allocator = allocator_with(2);

    allocator.allocate(TYPE, 7 * 512, 1).unwrap();
    allocator.allocate(TYPE, 7 * 512, 1).unwrap();
    assert_eq!(allocator.pool_stats(TYPE).unwrap().slot_count, 2);

    assert_eq!(
        allocator.allocate(TYPE, 7 * 512, 1),
        Err(MemoryError::PoolExhausted {
            memory_type: TYPE,
            max_slots: 2,
        })
    );
    assert_eq!(allocator.pool_stats(TYPE).unwrap().slot_count, 2);
    assert_eq!(allocator.provider().live_heaps(), 2);

    // Leftover single cells are still served
    assert!(allocator.allocate(TYPE, 512, 1).is_ok());
    assert!(allocator.allocate(TYPE, 512, 1).is_ok());

    allocator.destroy().unwrap();
}

#[test]
fn test_native_failure_on_growth() {
    let provider = SimulatedHeapProvider::new().with_max_heaps(1);
    let mut allocator =
        MemoryAllocator::with_config(provider, AllocatorConfig::new(512, 8, 16)).unwrap();

    allocator.allocate(TYPE, 7 * 512, 1).unwrap();
    let err = allocator.allocate(TYPE, 7 * 512, 1).unwrap_err();
    assert_eq!(
        err,
        MemoryError::NativeAllocationFailure {
            memory_type: TYPE,
            size: 4096,
            source: ProviderError::TooManyObjects { limit: 1 },
        }
    );

    // A new memory type cannot even create its first heap
    assert!(matches!(
        allocator.allocate(MemoryTypeId(9), 1, 1),
        Err(MemoryError::NativeAllocationFailure {
            source: ProviderError::TooManyObjects { .. },
            ..
        })
    ));
    assert!(allocator.pool_stats(MemoryTypeId(9)).is_none());

    allocator.destroy().unwrap();
}

#[test]
fn test_destroy_releases_heaps_and_disables_allocator() {
    let mut allocator = allocator_with(8);
    let live = allocator.allocate(TYPE, 7 * 512, 1).unwrap();
    allocator.allocate(TYPE, 7 * 512, 1).unwrap();
    allocator.allocate(MemoryTypeId(5), 100, 1).unwrap();
    assert_eq!(allocator.provider().live_heaps(), 3);

    allocator.destroy().unwrap();
    assert!(allocator.is_destroyed());
    assert_eq!(allocator.provider().live_heaps(), 0);
    assert_eq!(allocator.provider().allocated_bytes(), 0);

    assert_eq!(allocator.allocate(TYPE, 1, 1), Err(MemoryError::Destroyed));
    assert_eq!(
        allocator.free(live.heap, TYPE, live.offset, 7 * 512),
        Err(MemoryError::InvalidHeap(live.heap))
    );
    assert!(allocator.stats().pools.is_empty());

    // Second destroy is a no-op
    allocator.destroy().unwrap();
}

#[test]
fn test_drop_without_destroy_releases_heaps() {
    let mut provider = SimulatedHeapProvider::new();
    {
        let mut allocator =
            MemoryAllocator::with_config(&mut provider, AllocatorConfig::new(512, 8, 4)).unwrap();
        allocator.allocate(TYPE, 7 * 512, 1).unwrap();
        allocator.allocate(TYPE, 7 * 512, 1).unwrap();
    }
    assert_eq!(provider.live_heaps(), 0);
    assert_eq!(provider.total_requests(), 2);
}

#[test]
fn test_free_allocation_uses_slot_index() {
    let mut allocator = allocator_with(4);
    let a = allocator.allocate(TYPE, 7 * 512, 1).unwrap();
    let b = allocator.allocate(TYPE, 7 * 512, 1).unwrap();
    assert_eq!(a.slot.0, 0);
    assert_eq!(b.slot.0, 1);

    allocator.free_allocation(TYPE, &b, 7 * 512).unwrap();
    let c = allocator.allocate(TYPE, 7 * 512, 1).unwrap();
    assert_eq!(c, b);

    allocator.destroy().unwrap();
}

#[test]
fn test_growth_observer_closure() {
    let grown = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&grown);
    let mut allocator = allocator_with(4).with_observer(Arc::new(move |event: &PoolGrowth| {
        counter.store(event.slot_count, Ordering::SeqCst);
    }));

    allocator.allocate(TYPE, 7 * 512, 1).unwrap();
    assert_eq!(grown.load(Ordering::SeqCst), 0);
    allocator.allocate(TYPE, 7 * 512, 1).unwrap();
    assert_eq!(grown.load(Ordering::SeqCst), 2);
    allocator.allocate(TYPE, 7 * 512, 1).unwrap();
    assert_eq!(grown.load(Ordering::SeqCst), 3);

    allocator.destroy().unwrap();
}

#[test]
fn test_growth_events_report_pool_size() {
    let observer = Arc::new(RecordingObserver::new());
    let mut allocator = allocator_with(4);
    allocator.set_observer(observer.clone());

    for _ in 0..3 {
        allocator.allocate(TYPE, 5 * 512, 1).unwrap();
    }

    let sizes: Vec<u64> = observer.events().iter().map(|e| e.total_bytes).collect();
    assert_eq!(sizes, vec![2 * 4096, 3 * 4096]);

    allocator.destroy().unwrap();
}

#[test]
fn test_stats_and_pressure() {
    let mut allocator = allocator_with(4);
    allocator.allocate(TYPE, 1000, 1).unwrap();
    allocator.allocate(MemoryTypeId(0), 512, 1).unwrap();

    let stats = allocator.stats();
    assert_eq!(stats.pools.len(), 2);
    assert_eq!(stats.pools[0].memory_type, MemoryTypeId(0));
    assert_eq!(stats.total_bytes, 2 * 4096);
    assert_eq!(stats.used_bytes, 3 * 512);
    assert_eq!(stats.slot_count(), 2);

    let pool = allocator.pool_stats(TYPE).unwrap();
    assert_eq!(pool.used_bytes, 1024);
    assert_eq!(pool.free_bytes, 3072);
    assert_eq!(pool.usage_percentage, 25.0);
    assert_eq!(pool.memory_pressure(), MemoryPressure::Low);

    for _ in 0..3 {
        allocator.allocate(TYPE, 7 * 512, 1).unwrap();
    }
    assert_eq!(
        allocator.pool_stats(TYPE).unwrap().memory_pressure(),
        MemoryPressure::Critical
    );

    allocator.destroy().unwrap();
}

#[test]
fn test_allocate_for_requirements() {
    let mut allocator = allocator_with(4);
    let memory_types = [
        MemoryTypeInfo::new(MemoryProperties::DEVICE_LOCAL, 0),
        MemoryTypeInfo::new(
            MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_COHERENT,
            1,
        ),
    ];
    let requirements = MemoryRequirements {
        size: 1500,
        alignment: 1024,
        memory_type_bits: 0b11,
    };

    let (memory_type, result) = allocator
        .allocate_for(
            &requirements,
            MemoryProperties::HOST_VISIBLE,
            &memory_types,
        )
        .unwrap();
    assert_eq!(memory_type, MemoryTypeId(1));
    assert_eq!(result.offset % 1024, 0);

    let missing = allocator.allocate_for(
        &MemoryRequirements {
            memory_type_bits: 0b01,
            ..requirements
        },
        MemoryProperties::HOST_VISIBLE,
        &memory_types,
    );
    assert!(matches!(
        missing,
        Err(MemoryError::NoSuitableMemoryType { .. })
    ));

    allocator
        .free(result.heap, memory_type, result.offset, requirements.size)
        .unwrap();
    allocator.destroy().unwrap();
}

/// Provider whose heaps cannot be released
#[derive(Default)]
struct StickyProvider {
    inner: SimulatedHeapProvider,
}

impl HeapProvider for StickyProvider {
    fn allocate_heap(
        &mut self,
        memory_type: MemoryTypeId,
        size: DeviceSize,
    ) -> Result<HeapHandle, ProviderError> {
        self.inner.allocate_heap(memory_type, size)
    }

    fn free_heap(&mut self, _heap: HeapHandle) -> Result<(), ProviderError> {
        Err(ProviderError::Other("device lost".to_string()))
    }
}

#[test]
fn test_destroy_reports_release_failure() {
    let mut allocator =
        MemoryAllocator::with_config(StickyProvider::default(), AllocatorConfig::new(512, 8, 4))
            .unwrap();
    allocator.allocate(TYPE, 100, 1).unwrap();
    allocator.allocate(MemoryTypeId(0), 100, 1).unwrap();

    let err = allocator.destroy().unwrap_err();
    assert!(matches!(
        err,
        MemoryError::NativeAllocationFailure {
            source: ProviderError::Other(_),
            ..
        }
    ));

    // Destroyed regardless; pools are gone and the call is not retried
    assert!(allocator.is_destroyed());
    assert!(allocator.stats().pools.is_empty());
    allocator.destroy().unwrap();
}
