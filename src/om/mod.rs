//! Object manager: places, removes and navigates objects in the slotted
//! pages of a data file, and keeps the file's page chain and free-space
//! buckets in step with page occupancy.
//!
//! Every page fixed by an operation is held through a `PageGuard`, so it is
//! unfixed on every return path, errors included.

pub mod catalog;
mod avail_space;
mod file_map;
mod create;
mod read;
mod destroy;
mod navigate;

use std::sync::Arc;
use crate::error::{OmError, OmResult};
use crate::storage::bufferpool::{BufferPool, PageGuard};
use crate::storage::page::{PageType, SlottedPage};
use crate::storage::page_allocator::PageAllocator;
use crate::types::{FileNo, PageId, VolNo};

pub use catalog::CatalogEntry;

pub struct ObjectManager {
    pool: Arc<BufferPool<SlottedPage>>,
    allocator: Arc<PageAllocator>,
}

impl ObjectManager {
    pub fn new(pool: Arc<BufferPool<SlottedPage>>, allocator: Arc<PageAllocator>) -> Self {
        ObjectManager { pool, allocator }
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool<SlottedPage>> {
        &self.pool
    }

    /// Fix a page other than the one the caller is mutating
    fn fix_neighbor(&self, page: &SlottedPage, neighbor: PageId) -> OmResult<PageGuard<SlottedPage>> {
        if neighbor == page.page_id() {
            return Err(OmError::corrupted(
                page.page_id(),
                "page links to itself",
            ));
        }
        self.pool.fix(neighbor)
    }

    /// Allocate a page on the volume and fix it as an empty slotted page.
    /// The page goes back to the allocator if it cannot be buffered.
    fn new_page(&self, vol_no: VolNo, file_no: FileNo, page_type: PageType) -> OmResult<PageGuard<SlottedPage>> {
        let page_no = self.allocator.allocate()?;
        let page = SlottedPage::init(PageId::new(vol_no, page_no), file_no, page_type);
        match self.pool.fix_new(page) {
            Ok(guard) => Ok(guard),
            Err(e) => {
                self.allocator.deallocate(page_no)?;
                Err(e)
            }
        }
    }
}
