use std::collections::VecDeque;
use crate::error::{OmError, OmResult};
use crate::types::{PageId, PageNo};

/// A pending physical deallocation
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeallocElem {
    Page(PageId),
    Extent { first: PageId, n_pages: PageNo },
}

impl DeallocElem {
    /// Every page the record covers
    pub fn pages(&self) -> impl Iterator<Item = PageId> {
        let (first, n_pages) = match *self {
            DeallocElem::Page(pid) => (pid, 1),
            DeallocElem::Extent { first, n_pages } => (first, n_pages),
        };
        (first.page_no..first.page_no + n_pages).map(move |page_no| PageId::new(first.vol_no, page_no))
    }
}

/// Caller-owned queue of deallocations deferred by object manager operations.
///
/// The object manager only appends. The owner drains the list once the
/// destroyed objects are committed, see `StorageEngine::free_dealloc_list`.
#[derive(Debug, Default)]
pub struct DeallocList {
    elems: VecDeque<DeallocElem>,
    pool_capacity: Option<usize>,   // None = unbounded
}

impl DeallocList {
    pub fn new() -> Self {
        Self::default()
    }

    /// A list whose element pool holds at most `capacity` records
    pub fn with_pool_capacity(capacity: usize) -> Self {
        DeallocList { elems: VecDeque::with_capacity(capacity), pool_capacity: Some(capacity) }
    }

    /// Append a record at the head of the list
    pub fn push(&mut self, elem: DeallocElem) -> OmResult<()> {
        if self.pool_capacity.is_some_and(|cap| self.elems.len() >= cap) {
            return Err(OmError::PoolExhausted);
        }
        self.elems.push_front(elem);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeallocElem> {
        self.elems.iter()
    }

    /// Take every pending record, newest first
    pub fn drain(&mut self) -> impl Iterator<Item = DeallocElem> + '_ {
        self.elems.drain(..)
    }
}
