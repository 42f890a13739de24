//! Page Queue
//!
//! Hands finished (or partial) pages from the band-list writer to a renderer
//! running on another thread.
//!
//! # Architecture
//!
//! ```text
//! writer                                   renderer
//!   add_page ─→ enqueue ─→ [FIFO] ─→ start_dequeue ─→ render
//!      │                     │                           │
//!      │  render_req ────────┘                           │
//!      │                                                 ▼
//!      └─ wait_one_page ←──── render_done ←──── finish_dequeue
//! ```
//!
//! The FIFO and its counters sit behind one monitor; two counting semaphores
//! carry "page queued" and "page finished" signals. One entry's worth of
//! memory is held in reserve so a page can always be queued.

pub mod entry;
pub mod queue;
pub mod sync;

pub use entry::{PageAction, PageQueueEntry};
pub use queue::{PageQueue, PageRenderer};
pub use sync::Semaphore;
