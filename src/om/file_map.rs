use log::{debug, info};
use crate::error::OmResult;
use crate::om::ObjectManager;
use crate::om::catalog::CatalogEntry;
use crate::storage::page::{PageType, SlottedPage};
use crate::types::{FileNo, ObjectId, PageId, PageNo, VolNo, N_BUCKETS};

impl ObjectManager {

    /// Create an empty data file: allocate its first page, record the file
    /// in the catalog and list the page as free space.
    /// Return the identity of the file's catalog object.
    pub fn create_file(
        &self,
        vol_no: VolNo,
        file_no: FileNo,
        thresholds_pct: &[u8; N_BUCKETS],
        catalog_pages: &mut Vec<PageNo>,
    ) -> OmResult<ObjectId> {
        let guard = self.new_page(vol_no, file_no, PageType::Data)?;
        let first_page = guard.page_id().page_no;

        let entry = CatalogEntry::new(file_no, vol_no, first_page, thresholds_pct);
        let cat = self.insert_entry(catalog_pages, &entry)?;
        self.insert_into_avail_list(&cat, &mut guard.write())?;
        guard.set_dirty();

        info!("created file {} on volume {} with first page {}", file_no, vol_no, first_page);
        Ok(cat)
    }

    /// Link `new_page` into the file's page chain right after `after`
    pub(crate) fn append_page(
        &self,
        cat: &ObjectId,
        after: &mut SlottedPage,
        new_page: &mut SlottedPage,
    ) -> OmResult<()> {
        let next = after.next_page();
        match next {
            Some(next) => {
                let guard = self.fix_neighbor(after, PageId::new(after.vol_no(), next))?;
                guard.write().set_prev_page(Some(new_page.page_no()));
                guard.set_dirty();
            }
            None => {
                let (_cat_guard, mut entry) = self.fix_entry(cat)?;
                entry.last_page = new_page.page_no();
                self.update_entry(cat, &entry)?;
            }
        }

        new_page.set_prev_page(Some(after.page_no()));
        new_page.set_next_page(next);
        after.set_next_page(Some(new_page.page_no()));
        debug!("linked page {} after page {}", new_page.page_id(), after.page_id());
        Ok(())
    }

    /// Unlink a page from the file's page chain
    pub(crate) fn delete_page(&self, cat: &ObjectId, page: &mut SlottedPage) -> OmResult<()> {
        let (prev, next) = (page.prev_page(), page.next_page());
        let (_cat_guard, mut entry) = self.fix_entry(cat)?;
        let mut entry_changed = false;

        match prev {
            Some(prev) => {
                let guard = self.fix_neighbor(page, PageId::new(page.vol_no(), prev))?;
                guard.write().set_next_page(next);
                guard.set_dirty();
            }
            None => {
                if let Some(next) = next {
                    entry.first_page = next;
                    entry_changed = true;
                }
            }
        }
        match next {
            Some(next) => {
                let guard = self.fix_neighbor(page, PageId::new(page.vol_no(), next))?;
                guard.write().set_prev_page(prev);
                guard.set_dirty();
            }
            None => {
                if let Some(prev) = prev {
                    entry.last_page = prev;
                    entry_changed = true;
                }
            }
        }
        if entry_changed {
            self.update_entry(cat, &entry)?;
        }

        page.set_prev_page(None);
        page.set_next_page(None);
        debug!("unlinked page {} from file {}", page.page_id(), entry.file_no);
        Ok(())
    }
}
