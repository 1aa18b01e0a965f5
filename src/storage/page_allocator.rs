use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex};
use log::{debug, info};
use crate::error::{OmError, OmResult};
use crate::types::{PageId, PageNo};
use crate::storage::page::alloc_map_page::AllocMapPage;
use crate::storage::disk_manager::DiskManager;
use crate::storage::page::Page;

/// A map page in memory
struct MapFrame {
    page: AllocMapPage,
    is_dirty: bool,
}

struct AllocState {
    n_map_pages: PageNo,                // map pages 1..=n_map_pages exist
    cache: HashMap<PageNo, MapFrame>,
}

/// Physical page allocation for one volume, backed by bitmap pages kept in
/// the volume's map file
pub struct PageAllocator {
    disk: Arc<dyn DiskManager<AllocMapPage>>,
    state: Mutex<AllocState>,
}

impl PageAllocator {

    pub fn new(disk: Arc<dyn DiskManager<AllocMapPage>>) -> OmResult<Self> {
        // map page k is stored at position k, position 0 stays unused
        let n_map_pages = disk.num_pages()?.saturating_sub(1) as PageNo;
        Ok(PageAllocator {
            disk,
            state: Mutex::new(AllocState { n_map_pages, cache: HashMap::new() }),
        })
    }

    /// Allocate the lowest free page number of the volume
    pub fn allocate(&self) -> OmResult<PageNo> {
        let mut state = self.state.lock().unwrap();

        for map_no in 1..=state.n_map_pages {
            let frame = self.load(&mut state, map_no)?;
            if let Some(page_no) = frame.page.allocate() {
                frame.is_dirty = true;
                debug!("allocated page {} on volume {}", page_no, self.disk.vol_no());
                return Ok(page_no);
            }
        }

        // every map page is full, start a new one
        let map_no = state.n_map_pages + 1;
        let mut page = AllocMapPage::new(PageId::new(self.disk.vol_no(), map_no));
        let page_no = page.allocate().ok_or_else(|| {
            OmError::corrupted(page.get_id(), "new map page has no free bit")
        })?;
        state.cache.insert(map_no, MapFrame { page, is_dirty: true });
        state.n_map_pages = map_no;
        info!("volume {} grew to {} map pages", self.disk.vol_no(), map_no);
        Ok(page_no)
    }

    /// Give a page back to the volume
    pub fn deallocate(&self, page_no: PageNo) -> OmResult<()> {
        let mut state = self.state.lock().unwrap();
        if page_no == 0 {
            return Err(OmError::DoubleFree(page_no));
        }
        let map_no = AllocMapPage::map_page_for(page_no);
        if map_no > state.n_map_pages {
            return Err(OmError::DoubleFree(page_no));
        }

        let frame = self.load(&mut state, map_no)?;
        if !frame.page.deallocate(page_no) {
            return Err(OmError::DoubleFree(page_no));
        }
        frame.is_dirty = true;
        debug!("deallocated page {} on volume {}", page_no, self.disk.vol_no());
        Ok(())
    }

    pub fn is_allocated(&self, page_no: PageNo) -> OmResult<bool> {
        let mut state = self.state.lock().unwrap();
        if page_no == 0 {
            return Ok(false);
        }
        let map_no = AllocMapPage::map_page_for(page_no);
        if map_no > state.n_map_pages {
            return Ok(false);
        }
        Ok(self.load(&mut state, map_no)?.page.is_allocated(page_no))
    }

    /// Flush dirty map pages to disk
    pub fn flush_all(&self) -> OmResult<()> {
        let mut state = self.state.lock().unwrap();
        for frame in state.cache.values_mut() {
            if frame.is_dirty {
                self.disk.write_page(&frame.page)?;
                frame.is_dirty = false;
            }
        }
        Ok(())
    }

    /// Load a map page from cache or disk
    fn load<'a>(&self, state: &'a mut AllocState, map_no: PageNo) -> OmResult<&'a mut MapFrame> {
        match state.cache.entry(map_no) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let page = self.disk.read_page(map_no)?
                    .ok_or(OmError::PageNotFound(PageId::new(self.disk.vol_no(), map_no)))?;
                Ok(entry.insert(MapFrame { page, is_dirty: false }))
            }
        }
    }
}
