use log::debug;
use crate::error::{OmError, OmResult};
use crate::om::ObjectManager;
use crate::storage::dealloc_list::{DeallocElem, DeallocList};
use crate::storage::page::Page;
use crate::types::ObjectId;

impl ObjectManager {

    /// Destroy an object and reclaim its space.
    ///
    /// The page leaves its free-space bucket before the slot is emptied and is
    /// re-listed afterwards. A page left without objects is unlinked from the
    /// file and queued on `dealloc_list` instead, unless it is the file's
    /// first page, which always stays.
    pub fn destroy_object(
        &self,
        cat: &ObjectId,
        oid: &ObjectId,
        dealloc_list: &mut DeallocList,
    ) -> OmResult<()> {
        if cat.is_nil() {
            return Err(OmError::BadCatalogObject);
        }
        if oid.is_nil() {
            return Err(OmError::BadObjectId);
        }

        let (_cat_guard, entry) = self.fix_entry(cat)?;
        if oid.vol_no != entry.vol_no {
            return Err(OmError::BadFileId);
        }

        let guard = self.pool.fix(oid.page_id())?;
        let mut page = guard.write();
        if page.file_no() != entry.file_no {
            return Err(OmError::BadFileId);
        }
        // rejects empty slots and stale identities before anything changes
        page.object(oid)?;

        self.remove_from_avail_list(cat, &mut page)?;
        let reclaimed = page.destroy_slot(oid.slot_no)?;

        if page.is_empty() && page.page_no() != entry.first_page {
            self.delete_page(cat, &mut page)?;
            dealloc_list.push(DeallocElem::Page(page.page_id()))?;
            debug!("page {} emptied and queued for deallocation", page.page_id());
        } else {
            self.insert_into_avail_list(cat, &mut page)?;
        }
        drop(page);
        guard.set_dirty();

        debug!("destroyed object {} ({} bytes reclaimed)", oid, reclaimed);
        Ok(())
    }
}
