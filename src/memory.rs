// src/memory.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process memory counters
//!
//! Heap figures come from [`CountingAllocator`], which the binary installs as
//! the global allocator. Resident and virtual sizes come from `memory-stats`.
//! Counters the platform cannot report read as zero.

use std::alloc::{GlobalAlloc, Layout, System};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use memory_stats::memory_stats;

static LIVE_BYTES: AtomicUsize = AtomicUsize::new(0);
static ALLOCATIONS: AtomicU64 = AtomicU64::new(0);

/// System allocator that counts live bytes and allocation calls
///
/// ```rust,ignore
/// #[global_allocator]
/// static GLOBAL: CountingAllocator = CountingAllocator;
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            LIVE_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
            ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc_zeroed(layout);
        if !ptr.is_null() {
            LIVE_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
            ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        LIVE_BYTES.fetch_sub(layout.size(), Ordering::Relaxed);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = System.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            let old_size = layout.size();
            if new_size > old_size {
                LIVE_BYTES.fetch_add(new_size - old_size, Ordering::Relaxed);
            } else {
                LIVE_BYTES.fetch_sub(old_size - new_size, Ordering::Relaxed);
            }
            ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        }
        new_ptr
    }
}

/// One capture of the process memory counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySnapshot {
    /// Resident set size
    pub system_bytes: u64,
    /// Virtual memory reserved from the OS (heap included)
    pub heap_reserved_bytes: u64,
    /// Bytes live in the counting allocator
    pub heap_allocated_bytes: u64,
    /// Allocation calls since start
    pub allocation_count: u64,
}

impl MemorySnapshot {
    /// Read the counters now. Never fails.
    pub fn capture() -> Self {
        let (system_bytes, heap_reserved_bytes) = match memory_stats() {
            Some(stats) => (stats.physical_mem as u64, stats.virtual_mem as u64),
            None => {
                tracing::trace!("Process memory stats unavailable on this platform");
                (0, 0)
            }
        };
        Self {
            system_bytes,
            heap_reserved_bytes,
            heap_allocated_bytes: LIVE_BYTES.load(Ordering::Relaxed) as u64,
            allocation_count: ALLOCATIONS.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Display for MemorySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rss={} heap_reserved={} heap_used={} allocations={}",
            format_mb(self.system_bytes),
            format_mb(self.heap_reserved_bytes),
            format_mb(self.heap_allocated_bytes),
            self.allocation_count
        )
    }
}

/// Bytes as megabytes with two decimals: `1572864` -> `1.50MB`
pub fn format_mb(bytes: u64) -> String {
    format!("{:.2}MB", bytes as f64 / 1024.0 / 1024.0)
}
