//! Page queue between a band-list writer and a renderer thread

use super::entry::{PageAction, PageQueueEntry};
use super::sync::Semaphore;
use crate::error::{Error, Result};
use crate::memfile::allocator::{Allocation, Allocator};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

const ENTRY_TAG: &str = "page queue entry";

/// Renderer side of a page queue
pub trait PageRenderer<P> {
    /// Render one dequeued page; never called for `Terminate`
    fn render(&mut self, entry: &mut PageQueueEntry<P>) -> Result<()>;
}

struct QueueState<P> {
    fifo: VecDeque<PageQueueEntry<P>>,
    /// Queued entries plus the one being rendered
    entry_count: usize,
    dequeue_in_progress: bool,
    enable_render_done_signal: bool,
    /// Entry memory kept back for when the allocator refuses
    reserve: Option<Allocation>,
}

/// FIFO of pages handed from one writer to one renderer
pub struct PageQueue<P> {
    allocator: Arc<dyn Allocator>,
    state: Mutex<QueueState<P>>,
    render_req: Semaphore,
    render_done: Semaphore,
}

impl<P: Send> PageQueue<P> {
    /// Create a queue and allocate its reserve entry
    pub fn new(allocator: Arc<dyn Allocator>) -> Result<Self> {
        let reserve = Allocation::acquire(&allocator, PageQueueEntry::<P>::charge(), ENTRY_TAG)
            .ok_or_else(|| Error::VmError("cannot allocate page queue reserve entry".to_string()))?;
        Ok(Self {
            allocator,
            state: Mutex::new(QueueState {
                fifo: VecDeque::new(),
                entry_count: 0,
                dequeue_in_progress: false,
                enable_render_done_signal: false,
                reserve: Some(reserve),
            }),
            render_req: Semaphore::new(0),
            render_done: Semaphore::new(0),
        })
    }

    /// Allocate an empty entry from the general allocator
    pub fn alloc_entry(&self) -> Option<PageQueueEntry<P>> {
        let lease = Allocation::acquire(&self.allocator, PageQueueEntry::<P>::charge(), ENTRY_TAG)?;
        Some(PageQueueEntry::with_lease(lease, false))
    }

    /// Append an entry and wake the renderer
    pub fn enqueue(&self, entry: PageQueueEntry<P>) {
        let action = entry.action();
        let count = {
            let mut state = self.state.lock();
            state.fifo.push_back(entry);
            state.entry_count += 1;
            state.entry_count
        };
        trace!(%action, count, "page enqueued");
        self.render_req.signal();
    }

    /// Queue a page, drawing on the reserve entry if memory is short
    ///
    /// After the reserve is used this blocks until a new reserve entry can be
    /// allocated, waiting for the renderer to free pages. If the queue drains
    /// and allocation still fails, the result is `Fatal`.
    pub fn add_page(&self, action: PageAction, page_info: Option<P>, copies: u32) -> Result<()> {
        let mut entry = match self.alloc_entry() {
            Some(entry) => entry,
            None => {
                let lease = self.state.lock().reserve.take().ok_or_else(|| {
                    Error::VmError("cannot allocate page queue entry".to_string())
                })?;
                warn!(%action, "page queue reserve entry used");
                PageQueueEntry::with_lease(lease, true)
            }
        };
        entry.fill(action, page_info, copies);
        self.enqueue(entry);

        loop {
            if self.replenish_reserve() {
                return Ok(());
            }
            if !self.wait_one_page() {
                // Drained: the last page may have freed enough memory.
                if self.replenish_reserve() {
                    return Ok(());
                }
                error!("page queue drained but its reserve entry cannot be replaced");
                return Err(Error::Fatal(
                    "cannot replenish page queue reserve entry".to_string(),
                ));
            }
        }
    }

    /// Make sure the reserve entry exists; false if it cannot be allocated
    fn replenish_reserve(&self) -> bool {
        if self.state.lock().reserve.is_some() {
            return true;
        }
        match Allocation::acquire(&self.allocator, PageQueueEntry::<P>::charge(), ENTRY_TAG) {
            Some(lease) => {
                self.state.lock().reserve = Some(lease);
                debug!("page queue reserve entry replenished");
                true
            }
            None => false,
        }
    }

    /// Block until a page is queued, then take it
    ///
    /// The queue counts the entry as present until `finish_dequeue`.
    pub fn start_dequeue(&self) -> Result<PageQueueEntry<P>> {
        self.render_req.wait();
        let mut state = self.state.lock();
        let Some(entry) = state.fifo.pop_front() else {
            error!(count = state.entry_count, "render request signalled on an empty queue");
            return Err(Error::Fatal("page queue is unexpectedly empty".to_string()));
        };
        state.dequeue_in_progress = true;
        Ok(entry)
    }

    /// Release a dequeued entry and wake a writer waiting for a page
    pub fn finish_dequeue(&self, entry: PageQueueEntry<P>) {
        let action = entry.action();
        drop(entry);
        let signal = {
            let mut state = self.state.lock();
            state.dequeue_in_progress = false;
            state.entry_count = state.entry_count.saturating_sub(1);
            std::mem::replace(&mut state.enable_render_done_signal, false)
        };
        trace!(%action, "page finished");
        if signal {
            self.render_done.signal();
        }
    }

    /// Wait for one page to finish rendering
    ///
    /// Returns false immediately when the queue is empty.
    pub fn wait_one_page(&self) -> bool {
        {
            let mut state = self.state.lock();
            if state.entry_count == 0 {
                return false;
            }
            state.enable_render_done_signal = true;
        }
        self.render_done.wait();
        true
    }

    /// Wait until every queued page has been rendered
    pub fn wait_until_empty(&self) {
        while self.wait_one_page() {}
    }

    /// True when nothing is queued or being rendered
    pub fn is_empty(&self) -> bool {
        self.state.lock().entry_count == 0
    }

    /// Queued entries plus the one being rendered
    pub fn len(&self) -> usize {
        self.state.lock().entry_count
    }

    pub fn is_dequeue_in_progress(&self) -> bool {
        self.state.lock().dequeue_in_progress
    }

    /// Whether the reserve entry is available
    pub fn has_reserve(&self) -> bool {
        self.state.lock().reserve.is_some()
    }

    /// Render loop: dequeue and render until `Terminate`
    ///
    /// Returns the number of pages rendered.
    pub fn serve<R>(&self, renderer: &mut R) -> Result<u64>
    where
        R: PageRenderer<P> + ?Sized,
    {
        let mut rendered = 0;
        loop {
            let mut entry = self.start_dequeue()?;
            let action = entry.action();
            let result = match action {
                PageAction::Terminate => Ok(()),
                _ => renderer.render(&mut entry),
            };
            self.finish_dequeue(entry);
            result?;

            if action == PageAction::Terminate {
                debug!(rendered, "render loop terminated");
                return Ok(rendered);
            }
            rendered += 1;
        }
    }
}

impl<P> fmt::Debug for PageQueue<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PageQueue")
            .field("entry_count", &state.entry_count)
            .field("dequeue_in_progress", &state.dequeue_in_progress)
            .field("has_reserve", &state.reserve.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memfile::allocator::{BudgetAllocator, HeapAllocator};

    struct Collect(Vec<(PageAction, u32)>);

    impl PageRenderer<u32> for Collect {
        fn render(&mut self, entry: &mut PageQueueEntry<u32>) -> Result<()> {
            self.0.push((entry.action(), entry.page_info().copied().unwrap_or(0)));
            Ok(())
        }
    }

    #[test]
    fn test_fifo_single_thread() -> Result<()> {
        let queue: PageQueue<u32> = PageQueue::new(HeapAllocator::shared())?;
        assert!(queue.is_empty());

        queue.add_page(PageAction::PartialPage, Some(1), 1)?;
        queue.add_page(PageAction::FullPage, Some(2), 1)?;
        queue.add_page(PageAction::Terminate, None, 0)?;
        assert_eq!(queue.len(), 3);

        let mut renderer = Collect(Vec::new());
        assert_eq!(queue.serve(&mut renderer)?, 2);
        assert_eq!(
            renderer.0,
            vec![(PageAction::PartialPage, 1), (PageAction::FullPage, 2)]
        );
        assert!(queue.is_empty());
        assert!(!queue.wait_one_page());
        Ok(())
    }

    #[test]
    fn test_dequeue_counts_in_progress() -> Result<()> {
        let queue: PageQueue<u32> = PageQueue::new(HeapAllocator::shared())?;
        queue.add_page(PageAction::FullPage, Some(7), 1)?;

        let entry = queue.start_dequeue()?;
        assert!(queue.is_dequeue_in_progress());
        assert_eq!(queue.len(), 1);

        queue.finish_dequeue(entry);
        assert!(!queue.is_dequeue_in_progress());
        assert!(queue.is_empty());
        Ok(())
    }

    #[test]
    fn test_new_without_memory() {
        let budget = Arc::new(BudgetAllocator::unlimited());
        budget.set_failing(true);
        let err = PageQueue::<u32>::new(budget).unwrap_err();
        assert!(matches!(err, Error::VmError(_)));
    }

    #[test]
    fn test_entries_return_memory() -> Result<()> {
        let budget = Arc::new(BudgetAllocator::unlimited());
        let queue: PageQueue<u32> = PageQueue::new(budget.clone())?;
        let reserve_only = budget.in_use();

        queue.add_page(PageAction::FullPage, Some(1), 1)?;
        assert!(budget.in_use() > reserve_only);

        let entry = queue.start_dequeue()?;
        queue.finish_dequeue(entry);
        assert_eq!(budget.in_use(), reserve_only);
        Ok(())
    }
}
