use log::debug;
use crate::error::{OmError, OmResult};
use crate::om::ObjectManager;
use crate::om::catalog::CatalogEntry;
use crate::storage::bufferpool::PageGuard;
use crate::storage::page::{PageType, SlottedPage};
use crate::storage::page::slotted_page::{required_space, MAX_OBJECT_LENGTH};
use crate::types::{ObjectId, PageId};

impl ObjectManager {

    /// Create an object in the file and return its identity.
    ///
    /// With `near`, the object goes on the same page as that object when it
    /// fits, or on a new page linked right after it. Without, the smallest
    /// free-space bucket whose pages are sure to fit is tried first, then the
    /// file's last page, then a new page appended to the file.
    pub fn create_object(
        &self,
        cat: &ObjectId,
        near: Option<&ObjectId>,
        tag: u16,
        data: &[u8],
    ) -> OmResult<ObjectId> {
        if cat.is_nil() {
            return Err(OmError::BadCatalogObject);
        }
        if near.is_some_and(|n| n.is_nil()) {
            return Err(OmError::BadObjectId);
        }
        if data.len() > MAX_OBJECT_LENGTH {
            return Err(OmError::ObjectTooLarge { length: data.len(), max: MAX_OBJECT_LENGTH });
        }

        let (_cat_guard, entry) = self.fix_entry(cat)?;
        let needed = required_space(data.len());

        let guard = match near {
            Some(near) => self.page_near(cat, &entry, near, needed)?,
            None => self.page_with_room(cat, &entry, needed)?,
        };

        let oid = {
            let mut page = guard.write();
            self.remove_from_avail_list(cat, &mut page)?;
            let (slot_no, unique) = page.insert_object(tag, data).ok_or_else(|| {
                OmError::corrupted(page.page_id(), "selected page cannot hold the object")
            })?;
            self.insert_into_avail_list(cat, &mut page)?;
            ObjectId::new(page.page_id(), slot_no, unique)
        };
        guard.set_dirty();

        debug!("created object {} ({} bytes)", oid, data.len());
        Ok(oid)
    }

    fn page_near(
        &self,
        cat: &ObjectId,
        entry: &CatalogEntry,
        near: &ObjectId,
        needed: usize,
    ) -> OmResult<PageGuard<SlottedPage>> {
        if near.vol_no != entry.vol_no {
            return Err(OmError::BadFileId);
        }
        let guard = self.pool.fix(near.page_id())?;
        {
            let page = guard.read();
            if page.file_no() != entry.file_no || page.page_type() != Some(PageType::Data) {
                return Err(OmError::BadFileId);
            }
            if page.total_free() >= needed {
                drop(page);
                return Ok(guard);
            }
        }
        self.extend_after(cat, entry, &guard)
    }

    fn page_with_room(
        &self,
        cat: &ObjectId,
        entry: &CatalogEntry,
        needed: usize,
    ) -> OmResult<PageGuard<SlottedPage>> {
        for bucket in entry.buckets_fitting(needed) {
            if let Some(page_no) = entry.avail_heads[bucket] {
                return self.pool.fix(PageId::new(entry.vol_no, page_no));
            }
        }

        let last = self.pool.fix(PageId::new(entry.vol_no, entry.last_page))?;
        if last.read().total_free() >= needed {
            return Ok(last);
        }
        self.extend_after(cat, entry, &last)
    }

    /// Allocate a data page for the file and link it after `after`
    fn extend_after(
        &self,
        cat: &ObjectId,
        entry: &CatalogEntry,
        after: &PageGuard<SlottedPage>,
    ) -> OmResult<PageGuard<SlottedPage>> {
        let guard = self.new_page(entry.vol_no, entry.file_no, PageType::Data)?;
        self.append_page(cat, &mut after.write(), &mut guard.write())?;
        after.set_dirty();
        Ok(guard)
    }
}
