use crate::error::{OmError, OmResult};
use crate::storage::page::Page;
use crate::storage::disk_manager::DiskManager;
use std::collections::HashMap;
use std::sync::{RwLock, Arc, Mutex, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use log::{debug, warn};
use crate::storage::replacement_strategy::{
    ReplacementStrategy, ReplacementStrategyType, replacement_strategy_factory
};
use crate::types::PageId;

#[derive(Debug)]
pub struct BufferFrame<P: Page> {
    pub page: RwLock<P>,
    pub is_dirty: AtomicBool,    // if the page is modified
    pub pin_count: AtomicUsize   // number of fixes on the page
}

/// RAII fix on a buffered page. The page is unfixed when the guard drops,
/// so every exit path of a caller releases what it fixed.
pub struct PageGuard<P: Page> {
    frame: Arc<BufferFrame<P>>,
    page_id: PageId,
}

impl<P: Page> PageGuard<P> {
    fn new(frame: Arc<BufferFrame<P>>, page_id: PageId) -> PageGuard<P> {
        frame.pin_count.fetch_add(1, Ordering::SeqCst);
        Self { frame, page_id }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn read(&self) -> RwLockReadGuard<'_, P> {
        self.frame.page.read().unwrap()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, P> {
        self.frame.page.write().unwrap()
    }

    /// Mark the page as modified so it is written back before eviction
    pub fn set_dirty(&self) {
        self.frame.is_dirty.store(true, Ordering::SeqCst);
    }
}

impl<P: Page> Drop for PageGuard<P> {
    fn drop(&mut self) {
        self.frame.pin_count.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct BufferPool<P: Page> {
    page_table: RwLock<HashMap<PageId, Arc<BufferFrame<P>>>>,
    capacity: usize,
    disk: Arc<dyn DiskManager<P>>,
    strategy: Mutex<Box<dyn ReplacementStrategy>>,
}

impl<P: Page + 'static> BufferPool<P> {
    pub fn new(
        capacity: usize,
        strategy_type: ReplacementStrategyType,
        disk: Arc<dyn DiskManager<P>>,
    ) -> Self {
        let strategy = replacement_strategy_factory(
            strategy_type
        );

        BufferPool {
            page_table: RwLock::new(HashMap::new()),
            capacity,
            disk,
            strategy: Mutex::new(strategy),
        }
    }

    /// Get the current bufferpool size
    pub fn current_size(&self) -> usize {
        self.page_table.read().unwrap().len()
    }

    /// Number of frames currently fixed by at least one caller
    pub fn fixed_count(&self) -> usize {
        self.page_table.read().unwrap()
            .values()
            .filter(|frame| frame.pin_count.load(Ordering::SeqCst) > 0)
            .count()
    }

    /// Whether a page is buffered and marked dirty
    pub fn is_dirty(&self, page_id: PageId) -> bool {
        self.page_table.read().unwrap()
            .get(&page_id)
            .is_some_and(|frame| frame.is_dirty.load(Ordering::SeqCst))
    }

    /// Fix a page in memory, reading it from disk if needed.
    /// Evicts an unfixed page when the pool is full.
    pub fn fix(&self, page_id: PageId) -> OmResult<PageGuard<P>> {
        if page_id.vol_no != self.disk.vol_no() {
            return Err(OmError::BadVolume(page_id.vol_no));
        }

        // page is already in memory
        {
            let frames = self.page_table.read().unwrap();
            if let Some(frame) = frames.get(&page_id) {
                self.strategy.lock().unwrap().update(page_id);
                return Ok(PageGuard::new(Arc::clone(frame), page_id));
            }
        }

        // fetch page from disk
        let page = self.disk.read_page(page_id.page_no)?
            .ok_or(OmError::PageNotFound(page_id))?;
        if page.get_id() != page_id {
            return Err(OmError::corrupted(
                page_id,
                format!("page image carries id {}", page.get_id()),
            ));
        }

        self.make_room()?;
        Ok(self.install(page_id, page, false))
    }

    /// Fix a freshly allocated page that has no image on disk yet
    pub fn fix_new(&self, page: P) -> OmResult<PageGuard<P>> {
        let page_id = page.get_id();
        if page_id.vol_no != self.disk.vol_no() {
            return Err(OmError::BadVolume(page_id.vol_no));
        }

        // a stale frame may survive from before the page was freed
        self.discard_page(page_id)?;
        self.make_room()?;
        Ok(self.install(page_id, page, true))
    }

    fn install(&self, page_id: PageId, page: P, is_dirty: bool) -> PageGuard<P> {
        let frame = Arc::new(BufferFrame {
            page: RwLock::new(page),
            is_dirty: AtomicBool::new(is_dirty),
            pin_count: AtomicUsize::new(0),
        });

        let mut frames = self.page_table.write().unwrap();
        frames.insert(page_id, Arc::clone(&frame));
        self.strategy.lock().unwrap().update(page_id);
        PageGuard::new(frame, page_id)
    }

    /// Flush a single dirty page in buffer pool
    pub fn flush_page(&self, page_id: PageId) -> OmResult<()> {
        let frame = self.page_table.read().unwrap()
            .get(&page_id)
            .ok_or(OmError::PageNotFound(page_id))?
            .clone();

        if frame.is_dirty.swap(false, Ordering::SeqCst) {
            let page = frame.page.read().unwrap();
            self.disk.write_page(&page)?;
        }

        Ok(())
    }

    /// Flush all dirty pages in buffer pool
    pub fn flush_all(&self) -> OmResult<()> {
        // clone refs to avoid holding the table lock during I/O
        let frames: Vec<Arc<BufferFrame<P>>> = {
            let map = self.page_table.read().unwrap();
            map.values().cloned().collect()
        };
        for frame in frames {
            if frame.is_dirty.swap(false, Ordering::SeqCst) {
                let page = frame.page.read().unwrap();
                self.disk.write_page(&page)?;
            }
        }
        Ok(())
    }

    /// Drop a page from the pool without writing it back.
    /// Used once the page has been given back to the volume.
    pub fn discard_page(&self, page_id: PageId) -> OmResult<()> {
        let mut frames = self.page_table.write().unwrap();
        if let Some(frame) = frames.get(&page_id) {
            if frame.pin_count.load(Ordering::SeqCst) != 0 {
                return Err(OmError::PageFixed(page_id));
            }
            frames.remove(&page_id);
            self.strategy.lock().unwrap().remove(page_id);
            debug!("discarded page {} from buffer pool", page_id);
        }
        Ok(())
    }

    fn make_room(&self) -> OmResult<()> {
        while self.current_size() >= self.capacity {
            self.evict_one()?;
        }
        Ok(())
    }

    /// Evict one unfixed page using the replacement strategy.
    /// Fails with NoFreeFrames when every frame is fixed.
    fn evict_one(&self) -> OmResult<()> {
        let candidates: Vec<PageId> = self.strategy.lock().unwrap().get_evict().collect();

        for evicted_id in candidates {
            let evicted_ref = {
                let frames = self.page_table.read().unwrap();
                match frames.get(&evicted_id) {
                    Some(r) => Arc::clone(r),
                    None => continue,
                }
            };

            // skip fixed page
            if evicted_ref.pin_count.load(Ordering::SeqCst) != 0 {
                continue;
            }

            // flush page if it's dirty
            if evicted_ref.is_dirty.swap(false, Ordering::SeqCst) {
                let page_read = evicted_ref.page.read().unwrap();
                self.disk.write_page(&*page_read)?;
            }

            // remove from page table (perform ABA checking)
            let mut frames = self.page_table.write().unwrap();
            if frames.get(&evicted_id).is_some_and(|a| Arc::ptr_eq(a, &evicted_ref)) {
                frames.remove(&evicted_id);
                self.strategy.lock().unwrap().remove(evicted_id);
                debug!("evicted page {}", evicted_id);
                return Ok(());
            }
        }

        warn!("buffer pool exhausted: all {} frames are fixed", self.capacity);
        Err(OmError::NoFreeFrames { capacity: self.capacity })
    }
}
