//! Host allocator interface
//!
//! Every dynamic structure of a memory file (and every page queue entry) is
//! granted through an [`Allocator`]. Grants are RAII [`Allocation`] leases, so
//! dropping a block gives its bytes back to the host.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Tagged allocate/free interface supplied by the host process
pub trait Allocator: Send + Sync + fmt::Debug {
    /// Ask for `bytes` of memory on behalf of `tag`. Returns false when refused.
    fn acquire(&self, bytes: usize, tag: &'static str) -> bool;

    /// Give back memory previously granted by `acquire`.
    fn release(&self, bytes: usize, tag: &'static str);

    /// Usage counters, if the allocator keeps them
    fn stats(&self) -> AllocatorStats {
        AllocatorStats::default()
    }
}

/// Allocator statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    pub in_use: usize,
    pub peak: usize,
    pub refused: u64,
}

/// A granted allocation; released back to its allocator on drop
pub struct Allocation {
    allocator: Arc<dyn Allocator>,
    bytes: usize,
    tag: &'static str,
}

impl Allocation {
    /// Request `bytes` from `allocator`
    pub fn acquire(allocator: &Arc<dyn Allocator>, bytes: usize, tag: &'static str) -> Option<Self> {
        if !allocator.acquire(bytes, tag) {
            trace!(bytes, tag, "allocation refused");
            return None;
        }
        Some(Self {
            allocator: Arc::clone(allocator),
            bytes,
            tag,
        })
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        self.allocator.release(self.bytes, self.tag);
    }
}

impl fmt::Debug for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocation")
            .field("bytes", &self.bytes)
            .field("tag", &self.tag)
            .finish()
    }
}

/// Fixed-size byte buffer whose memory is accounted to an allocator
pub struct BlockBuffer {
    data: Box<[u8]>,
    lease: Allocation,
}

/// Bookkeeping bytes charged per buffer on top of its payload
pub const BUFFER_OVERHEAD: usize = std::mem::size_of::<BlockBuffer>();

impl BlockBuffer {
    /// Allocate a zeroed buffer of `len` bytes
    pub fn allocate(allocator: &Arc<dyn Allocator>, len: usize, tag: &'static str) -> Option<Self> {
        let lease = Allocation::acquire(allocator, Self::charge(len), tag)?;
        Some(Self {
            data: vec![0u8; len].into_boxed_slice(),
            lease,
        })
    }

    /// Bytes charged to the allocator for a buffer of `len` bytes
    pub fn charge(len: usize) -> usize {
        len + BUFFER_OVERHEAD
    }

    pub fn charged(&self) -> usize {
        self.lease.bytes()
    }
}

impl Deref for BlockBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for BlockBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl fmt::Debug for BlockBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockBuffer")
            .field("len", &self.data.len())
            .field("tag", &self.lease.tag())
            .finish()
    }
}

/// Allocator backed by the process heap; never refuses
#[derive(Debug, Default)]
pub struct HeapAllocator {
    in_use: AtomicUsize,
    peak: AtomicUsize,
}

impl HeapAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle, ready to pass to a memory file or page queue
    pub fn shared() -> Arc<dyn Allocator> {
        Arc::new(Self::new())
    }
}

impl Allocator for HeapAllocator {
    fn acquire(&self, bytes: usize, _tag: &'static str) -> bool {
        let now = self.in_use.fetch_add(bytes, Ordering::AcqRel) + bytes;
        self.peak.fetch_max(now, Ordering::AcqRel);
        true
    }

    fn release(&self, bytes: usize, _tag: &'static str) {
        self.in_use.fetch_sub(bytes, Ordering::AcqRel);
    }

    fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            in_use: self.in_use.load(Ordering::Acquire),
            peak: self.peak.load(Ordering::Acquire),
            refused: 0,
        }
    }
}

/// Allocator with a byte budget and a switch that refuses every request
///
/// Used by memory-bounded hosts and to simulate allocation failure.
#[derive(Debug)]
pub struct BudgetAllocator {
    limit: AtomicUsize,
    in_use: AtomicUsize,
    peak: AtomicUsize,
    refused: AtomicU64,
    failing: AtomicBool,
}

impl BudgetAllocator {
    /// Create an allocator that grants at most `limit` bytes at a time
    pub fn new(limit: usize) -> Self {
        Self {
            limit: AtomicUsize::new(limit),
            in_use: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            refused: AtomicU64::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Create an allocator without a byte limit
    pub fn unlimited() -> Self {
        Self::new(usize::MAX)
    }

    /// Make every subsequent request fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    pub fn is_failing(&self) -> bool {
        self.failing.load(Ordering::Acquire)
    }

    pub fn set_limit(&self, limit: usize) {
        self.limit.store(limit, Ordering::Release);
    }

    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    fn refuse(&self, bytes: usize, tag: &'static str) -> bool {
        self.refused.fetch_add(1, Ordering::AcqRel);
        trace!(bytes, tag, "budget allocator refused request");
        false
    }
}

impl Allocator for BudgetAllocator {
    fn acquire(&self, bytes: usize, tag: &'static str) -> bool {
        if self.is_failing() {
            return self.refuse(bytes, tag);
        }
        let limit = self.limit.load(Ordering::Acquire);
        let granted = self
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_add(bytes).filter(|total| *total <= limit)
            });
        match granted {
            Ok(previous) => {
                self.peak.fetch_max(previous + bytes, Ordering::AcqRel);
                true
            }
            Err(_) => self.refuse(bytes, tag),
        }
    }

    fn release(&self, bytes: usize, _tag: &'static str) {
        self.in_use.fetch_sub(bytes, Ordering::AcqRel);
    }

    fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            in_use: self.in_use.load(Ordering::Acquire),
            peak: self.peak.load(Ordering::Acquire),
            refused: self.refused.load(Ordering::Acquire),
        }
    }
}
