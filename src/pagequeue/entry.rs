//! Page queue entries

use crate::memfile::allocator::Allocation;
use std::fmt;

/// What the renderer should do with a queued page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageAction {
    /// Render the bands written so far; more follow for the same page
    PartialPage,
    /// Render and output a complete page
    FullPage,
    /// Output further copies of the previous page
    CopyPage,
    /// Stop the render loop
    Terminate,
}

impl fmt::Display for PageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageAction::PartialPage => "partial-page",
            PageAction::FullPage => "full-page",
            PageAction::CopyPage => "copy-page",
            PageAction::Terminate => "terminate",
        };
        f.write_str(name)
    }
}

/// One queued page; its memory is held for the allocator until dropped
pub struct PageQueueEntry<P> {
    action: PageAction,
    page_info: Option<P>,
    copies: u32,
    from_reserve: bool,
    _lease: Allocation,
}

impl<P> PageQueueEntry<P> {
    /// Bytes charged to the allocator per entry
    pub fn charge() -> usize {
        std::mem::size_of::<Self>()
    }

    pub(crate) fn with_lease(lease: Allocation, from_reserve: bool) -> Self {
        Self {
            action: PageAction::FullPage,
            page_info: None,
            copies: 1,
            from_reserve,
            _lease: lease,
        }
    }

    /// Describe the page this entry carries
    pub fn fill(&mut self, action: PageAction, page_info: Option<P>, copies: u32) {
        self.action = action;
        self.page_info = page_info;
        self.copies = copies;
    }

    pub fn action(&self) -> PageAction {
        self.action
    }

    pub fn page_info(&self) -> Option<&P> {
        self.page_info.as_ref()
    }

    pub fn page_info_mut(&mut self) -> Option<&mut P> {
        self.page_info.as_mut()
    }

    /// Move the page descriptor out, leaving the entry empty
    pub fn take_page_info(&mut self) -> Option<P> {
        self.page_info.take()
    }

    pub fn copies(&self) -> u32 {
        self.copies
    }

    /// Whether this entry was built from the queue's reserve memory
    pub fn is_from_reserve(&self) -> bool {
        self.from_reserve
    }
}

impl<P> fmt::Debug for PageQueueEntry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageQueueEntry")
            .field("action", &self.action)
            .field("has_page", &self.page_info.is_some())
            .field("copies", &self.copies)
            .field("from_reserve", &self.from_reserve)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memfile::allocator::{Allocator, BudgetAllocator};
    use std::sync::Arc;

    #[test]
    fn test_entry_fill_and_release() {
        let budget = Arc::new(BudgetAllocator::unlimited());
        let allocator: Arc<dyn Allocator> = budget.clone();
        let lease = Allocation::acquire(&allocator, PageQueueEntry::<String>::charge(), "entry").unwrap();

        let mut entry = PageQueueEntry::with_lease(lease, false);
        entry.fill(PageAction::CopyPage, Some("page 3".to_string()), 2);
        assert_eq!(entry.action(), PageAction::CopyPage);
        assert_eq!(entry.copies(), 2);
        assert_eq!(entry.take_page_info().as_deref(), Some("page 3"));
        assert!(entry.page_info().is_none());
        assert!(!entry.is_from_reserve());

        assert!(budget.in_use() > 0);
        drop(entry);
        assert_eq!(budget.in_use(), 0);
    }

    #[test]
    fn test_action_display() {
        assert_eq!(PageAction::PartialPage.to_string(), "partial-page");
        assert_eq!(PageAction::Terminate.to_string(), "terminate");
    }
}
