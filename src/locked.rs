use core::alloc::{GlobalAlloc, Layout};
use core::ptr;

use spin::{Mutex, MutexGuard};

use crate::block_header::WORD_SIZE;
use crate::heap_allocator::HeapAllocator;

/// Serialized facade over a [`HeapAllocator`], exposing it through
/// [`GlobalAlloc`] for callers that need raw pointers and external locking.
/// The inner heap only guarantees machine-word granularity, so layouts asking
/// for more alignment are refused.
pub struct LockedHeapAllocator {
    inner: Mutex<Option<HeapAllocator>>,
}

impl LockedHeapAllocator {
    pub const fn empty() -> Self {
        LockedHeapAllocator {
            inner: Mutex::new(None),
        }
    }

    /// Reserves the backing region. Allocation requests before this call
    /// return null.
    pub fn init(&self, capacity: usize) {
        *self.inner.lock() = Some(HeapAllocator::new(capacity));
    }

    pub fn init_with_poison(&self, capacity: usize, poison_on_free: bool) {
        *self.inner.lock() = Some(HeapAllocator::with_poison(capacity, poison_on_free));
    }

    pub fn lock(&self) -> MutexGuard<'_, Option<HeapAllocator>> {
        self.inner.lock()
    }
}

unsafe impl GlobalAlloc for LockedHeapAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > WORD_SIZE {
            return ptr::null_mut();
        }
        let mut guard = self.inner.lock();
        let Some(heap) = guard.as_mut() else {
            return ptr::null_mut();
        };
        match heap.allocate(layout.size()) {
            Ok(Some(offset)) => {
                // Safety: the offset returned by allocate is in bounds of the
                // live region.
                unsafe { heap.base_ptr().add(offset) }
            }
            Ok(None) => ptr::null_mut(),
            Err(fault) => panic!("heap corruption during alloc: {}", fault),
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        if ptr.is_null() {
            return;
        }
        let mut guard = self.inner.lock();
        let Some(heap) = guard.as_mut() else {
            return;
        };
        let offset = (ptr as usize).wrapping_sub(heap.base_ptr() as usize);
        if let Err(fault) = heap.deallocate(Some(offset)) {
            panic!("heap corruption during dealloc: {}", fault);
        }
    }
}
