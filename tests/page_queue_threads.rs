//! Integration tests for the page queue across writer and renderer threads

use memclist::error::{Error, Result};
use memclist::memfile::{Allocator, BudgetAllocator, HeapAllocator};
use memclist::{PageAction, PageQueue, PageQueueEntry, PageRenderer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// Records every rendered page number
struct Recorder {
    pages: Vec<u32>,
}

impl PageRenderer<u32> for Recorder {
    fn render(&mut self, entry: &mut PageQueueEntry<u32>) -> Result<()> {
        if let Some(&page) = entry.page_info() {
            self.pages.push(page);
        }
        Ok(())
    }
}

fn spawn_renderer<R>(queue: &Arc<PageQueue<u32>>, mut renderer: R) -> thread::JoinHandle<(Result<u64>, R)>
where
    R: PageRenderer<u32> + Send + 'static,
{
    let queue = Arc::clone(queue);
    thread::spawn(move || {
        let result = queue.serve(&mut renderer);
        (result, renderer)
    })
}

#[test]
fn test_pages_render_in_fifo_order() -> Result<()> {
    let queue = Arc::new(PageQueue::new(HeapAllocator::shared())?);
    let renderer = spawn_renderer(&queue, Recorder { pages: Vec::new() });

    for page in 0..200 {
        let action = if page % 3 == 0 {
            PageAction::PartialPage
        } else {
            PageAction::FullPage
        };
        queue.add_page(action, Some(page), 1)?;
    }
    queue.add_page(PageAction::Terminate, None, 0)?;

    let (result, recorder) = renderer.join().unwrap();
    assert_eq!(result?, 200);
    assert_eq!(recorder.pages, (0..200).collect::<Vec<_>>());
    assert!(queue.is_empty());
    Ok(())
}

/// Renderer that is slow enough for the writer to get ahead of it
struct Slow {
    rendered: Arc<AtomicUsize>,
}

impl PageRenderer<u32> for Slow {
    fn render(&mut self, _entry: &mut PageQueueEntry<u32>) -> Result<()> {
        thread::sleep(Duration::from_millis(2));
        self.rendered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_wait_until_empty_sees_every_page() -> Result<()> {
    let queue = Arc::new(PageQueue::new(HeapAllocator::shared())?);
    let rendered = Arc::new(AtomicUsize::new(0));
    let renderer = spawn_renderer(
        &queue,
        Slow {
            rendered: Arc::clone(&rendered),
        },
    );

    for page in 0..20 {
        queue.add_page(PageAction::FullPage, Some(page), 1)?;
    }
    queue.wait_until_empty();
    assert!(queue.is_empty());
    assert_eq!(rendered.load(Ordering::SeqCst), 20);

    // the queue keeps working after draining
    queue.add_page(PageAction::FullPage, Some(20), 1)?;
    queue.wait_until_empty();
    assert_eq!(rendered.load(Ordering::SeqCst), 21);

    queue.add_page(PageAction::Terminate, None, 0)?;
    let (result, _) = renderer.join().unwrap();
    assert_eq!(result?, 21);
    Ok(())
}

/// Renderer that holds its first page until told to go on
struct Gated {
    release: mpsc::Receiver<()>,
    rendered: Arc<AtomicUsize>,
}

impl PageRenderer<u32> for Gated {
    fn render(&mut self, entry: &mut PageQueueEntry<u32>) -> Result<()> {
        if entry.page_info() == Some(&0) {
            self.release.recv().map_err(|e| Error::Fatal(e.to_string()))?;
        }
        self.rendered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_wait_until_empty_covers_pages_added_while_waiting() -> Result<()> {
    let queue = Arc::new(PageQueue::new(HeapAllocator::shared())?);
    let rendered = Arc::new(AtomicUsize::new(0));
    let (release, gate) = mpsc::channel();
    let renderer = spawn_renderer(
        &queue,
        Gated {
            release: gate,
            rendered: Arc::clone(&rendered),
        },
    );

    queue.add_page(PageAction::FullPage, Some(0), 1)?;

    // Page 0 stays in flight until the second writer has queued page 1.
    let late_writer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || -> Result<()> {
            thread::sleep(Duration::from_millis(20));
            queue.add_page(PageAction::FullPage, Some(1), 1)?;
            release.send(()).map_err(|e| Error::Fatal(e.to_string()))
        })
    };

    queue.wait_until_empty();
    assert_eq!(rendered.load(Ordering::SeqCst), 2);
    assert!(queue.is_empty());
    late_writer.join().unwrap()?;

    queue.add_page(PageAction::Terminate, None, 0)?;
    let (result, _) = renderer.join().unwrap();
    assert_eq!(result?, 2);
    Ok(())
}

/// Renderer that gives the allocator memory back once it sees a page
struct Relieve {
    budget: Arc<BudgetAllocator>,
    pages: mpsc::Sender<(u32, bool)>,
}

impl PageRenderer<u32> for Relieve {
    fn render(&mut self, entry: &mut PageQueueEntry<u32>) -> Result<()> {
        self.budget.set_failing(false);
        let page = entry.page_info().copied().unwrap_or(u32::MAX);
        self.pages
            .send((page, entry.is_from_reserve()))
            .map_err(|e| Error::Fatal(e.to_string()))
    }
}

#[test]
fn test_reserve_entry_is_replenished() -> Result<()> {
    let budget = Arc::new(BudgetAllocator::unlimited());
    let allocator: Arc<dyn Allocator> = budget.clone();
    let queue = Arc::new(PageQueue::new(allocator)?);
    let (tx, rx) = mpsc::channel();
    let renderer = spawn_renderer(
        &queue,
        Relieve {
            budget: Arc::clone(&budget),
            pages: tx,
        },
    );

    budget.set_failing(true);
    queue.add_page(PageAction::FullPage, Some(1), 1)?;
    assert!(queue.has_reserve());
    assert_eq!(rx.recv().unwrap(), (1, true));

    queue.add_page(PageAction::Terminate, None, 0)?;
    let (result, _) = renderer.join().unwrap();
    assert_eq!(result?, 1);
    Ok(())
}

#[test]
fn test_reserve_exhaustion_is_fatal() -> Result<()> {
    let budget = Arc::new(BudgetAllocator::unlimited());
    let allocator: Arc<dyn Allocator> = budget.clone();
    let queue = Arc::new(PageQueue::new(allocator)?);
    let renderer = spawn_renderer(&queue, Recorder { pages: Vec::new() });

    budget.set_failing(true);
    // The page still goes out on the reserve entry, but nothing can replace it.
    let err = queue.add_page(PageAction::FullPage, Some(9), 1).unwrap_err();
    assert!(matches!(err, Error::Fatal(_)));
    assert_eq!(err.code(), -100);
    assert!(!queue.has_reserve());

    // With no reserve and no memory, the next page cannot be queued at all.
    let err = queue.add_page(PageAction::FullPage, Some(10), 1).unwrap_err();
    assert!(matches!(err, Error::VmError(_)));

    budget.set_failing(false);
    queue.add_page(PageAction::Terminate, None, 0)?;
    let (result, recorder) = renderer.join().unwrap();
    assert_eq!(result?, 1);
    assert_eq!(recorder.pages, vec![9]);
    Ok(())
}
