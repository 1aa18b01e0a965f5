use log::debug;
use crate::error::{OmError, OmResult};
use crate::om::ObjectManager;
use crate::storage::page::SlottedPage;
use crate::types::{ObjectId, PageId};

// Free-space buckets are doubly linked through the space_prev/space_next
// fields of the member pages; the bucket heads live in the catalog entry.
impl ObjectManager {

    /// Take a page out of the bucket it is listed in, if any.
    /// `page` is the caller's fixed image of the page.
    pub(crate) fn remove_from_avail_list(&self, cat: &ObjectId, page: &mut SlottedPage) -> OmResult<()> {
        let Some(bucket) = page.bucket() else {
            return Ok(());
        };
        let vol_no = page.vol_no();
        let (prev, next) = (page.space_prev(), page.space_next());

        match prev {
            Some(prev) => {
                let guard = self.fix_neighbor(page, PageId::new(vol_no, prev))?;
                guard.write().set_space_next(next);
                guard.set_dirty();
            }
            None => {
                let (_cat_guard, mut entry) = self.fix_entry(cat)?;
                if entry.avail_heads.get(bucket as usize) != Some(&Some(page.page_no())) {
                    return Err(OmError::corrupted(
                        page.page_id(),
                        format!("page claims bucket {} but does not head it", bucket),
                    ));
                }
                entry.avail_heads[bucket as usize] = next;
                self.update_entry(cat, &entry)?;
            }
        }
        if let Some(next) = next {
            let guard = self.fix_neighbor(page, PageId::new(vol_no, next))?;
            guard.write().set_space_prev(prev);
            guard.set_dirty();
        }

        page.set_space_prev(None);
        page.set_space_next(None);
        page.set_bucket(None);
        debug!("page {} left free-space bucket {}", page.page_id(), bucket);
        Ok(())
    }

    /// List a page at the head of the bucket matching its free bytes.
    /// Pages below the smallest threshold stay unlisted.
    pub(crate) fn insert_into_avail_list(&self, cat: &ObjectId, page: &mut SlottedPage) -> OmResult<()> {
        if page.bucket().is_some() {
            return Err(OmError::corrupted(page.page_id(), "page is already in a free-space bucket"));
        }
        let (_cat_guard, mut entry) = self.fix_entry(cat)?;
        let Some(bucket) = entry.bucket_for(page.total_free()) else {
            return Ok(());
        };

        let head = entry.avail_heads[bucket];
        if let Some(head) = head {
            let guard = self.fix_neighbor(page, PageId::new(page.vol_no(), head))?;
            guard.write().set_space_prev(Some(page.page_no()));
            guard.set_dirty();
        }
        page.set_space_prev(None);
        page.set_space_next(head);
        page.set_bucket(Some(bucket as u8));

        entry.avail_heads[bucket] = Some(page.page_no());
        self.update_entry(cat, &entry)?;
        debug!("page {} joined free-space bucket {} ({} bytes free)", page.page_id(), bucket, page.total_free());
        Ok(())
    }
}
