//! Memory Files
//!
//! Paged in-memory files for band lists. A file grows in fixed-size logical
//! blocks; once its footprint crosses the compression threshold, every block
//! but the one being written is compressed and read back on demand through a
//! small LRU cache of decompressed buffers.
//!
//! # Architecture
//!
//! ```text
//! MemFile
//!   ├─→ LogicalBlock(0) ─→ LogicalBlock(1) ─→ ... ─→ LogicalBlock(tail)
//!   │        │                   │                          │
//!   │        └── offset ──┐      └── offset ──┐             └─→ raw PhysicalBlock
//!   │                     ▼                   ▼
//!   ├─→ compressed chain: [PhysicalBlock] ─→ [PhysicalBlock] ─→ ...
//!   ├─→ RawCache (LRU)  → decompressed copies of recently read blocks
//!   └─→ ReservePool     → phys/log blocks promised to pending writes
//! ```
//!
//! All memory is granted by an [`Allocator`]; compression goes through a
//! [`CompressionAdapter`].

pub mod allocator;
pub mod block;
pub mod cache;
pub mod compression;
pub mod cursor;
pub mod file;
pub mod io;
pub mod reserve;

pub use allocator::{Allocation, Allocator, AllocatorStats, BlockBuffer, BudgetAllocator, HeapAllocator};
pub use block::{LogId, PhysId};
pub use cache::{CacheStats, RawCache};
pub use compression::{
    AlgorithmAdapter, CompressionAdapter, CompressionAlgorithm, FilterStatus, Passthrough,
    StreamFilter,
};
pub use cursor::{ReadCursor, WriteCursor};
pub use file::{MemFile, MemFileStats, OpenMode, SeekMode};
pub use reserve::ReservePool;
