use crate::error::{OmError, OmResult};
use crate::om::ObjectManager;
use crate::om::catalog::CatalogEntry;
use crate::storage::page::SlottedPage;
use crate::types::{ObjectHeader, ObjectId, PageId, PageNo, SlotNo};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Direction {
    Backward,
    Forward,
}

impl ObjectManager {

    /// Object before `cur` in (page chain, slot) order. Starts from the end of
    /// the file when `cur` is None. Ok(None) means there is no previous object.
    pub fn prev_object(
        &self,
        cat: &ObjectId,
        cur: Option<&ObjectId>,
    ) -> OmResult<Option<(ObjectId, ObjectHeader)>> {
        self.scan(cat, cur, Direction::Backward)
    }

    /// Object after `cur`; starts from the beginning of the file when `cur`
    /// is None. Ok(None) means there is no next object.
    pub fn next_object(
        &self,
        cat: &ObjectId,
        cur: Option<&ObjectId>,
    ) -> OmResult<Option<(ObjectId, ObjectHeader)>> {
        self.scan(cat, cur, Direction::Forward)
    }

    fn scan(
        &self,
        cat: &ObjectId,
        cur: Option<&ObjectId>,
        dir: Direction,
    ) -> OmResult<Option<(ObjectId, ObjectHeader)>> {
        if cat.is_nil() {
            return Err(OmError::BadCatalogObject);
        }
        if cur.is_some_and(|c| c.is_nil()) {
            return Err(OmError::BadObjectId);
        }

        let (_cat_guard, entry) = self.fix_entry(cat)?;
        let (mut page_no, mut from) = match cur {
            Some(cur) if cur.vol_no != entry.vol_no => return Err(OmError::BadFileId),
            Some(cur) => (cur.page_no, Some(cur.slot_no)),
            None => match dir {
                Direction::Backward => (entry.last_page, None),
                Direction::Forward => (entry.first_page, None),
            },
        };

        loop {
            let guard = self.pool.fix(PageId::new(entry.vol_no, page_no))?;
            let page = guard.read();
            if page.file_no() != entry.file_no {
                return Err(OmError::BadFileId);
            }

            let slot = match dir {
                Direction::Backward => page.last_occupied_before(from)?,
                Direction::Forward => page.first_occupied_after(from)?,
            };
            if let Some(slot_no) = slot {
                return Ok(Some(Self::object_at(&page, slot_no)?));
            }

            // page exhausted, follow the chain
            match Self::chain_step(&entry, &page, dir) {
                Some(next) => {
                    page_no = next;
                    from = None;
                }
                None => return Ok(None),
            }
        }
    }

    /// Neighbour page in scan direction, None at the end of the file
    fn chain_step(entry: &CatalogEntry, page: &SlottedPage, dir: Direction) -> Option<PageNo> {
        match dir {
            Direction::Backward if page.page_no() != entry.first_page => page.prev_page(),
            Direction::Forward if page.page_no() != entry.last_page => page.next_page(),
            _ => None,
        }
    }

    fn object_at(page: &SlottedPage, slot_no: SlotNo) -> OmResult<(ObjectId, ObjectHeader)> {
        let (unique, header) = page.live_header(slot_no)?.ok_or_else(|| {
            OmError::corrupted(page.page_id(), format!("slot {} reported occupied but is empty", slot_no))
        })?;
        Ok((ObjectId::new(page.page_id(), slot_no, unique), header))
    }
}

#[cfg(test)]
mod tests {
    use crate::om::test_util::TestVolume;
    use super::*;

    #[test]
    fn empty_file_has_no_objects() {
        let mut vol = TestVolume::new(8);
        let cat = vol.create_file();
        assert!(vol.om.prev_object(&cat, None).unwrap().is_none());
        assert!(vol.om.next_object(&cat, None).unwrap().is_none());
    }

    #[test]
    fn step_within_a_page() {
        let mut vol = TestVolume::new(8);
        let cat = vol.create_file();
        let a = vol.om.create_object(&cat, None, 1, b"a").unwrap();
        let b = vol.om.create_object(&cat, None, 2, b"bb").unwrap();

        let (last, header) = vol.om.prev_object(&cat, None).unwrap().unwrap();
        assert_eq!(last, b);
        assert_eq!(header.tag, 2);
        assert_eq!(vol.om.prev_object(&cat, Some(&b)).unwrap().unwrap().0, a);
        assert!(vol.om.prev_object(&cat, Some(&a)).unwrap().is_none());

        assert_eq!(vol.om.next_object(&cat, None).unwrap().unwrap().0, a);
        assert_eq!(vol.om.next_object(&cat, Some(&a)).unwrap().unwrap().0, b);
        assert!(vol.om.next_object(&cat, Some(&b)).unwrap().is_none());
    }

    #[test]
    fn scan_skips_holes() {
        let mut vol = TestVolume::new(8);
        let cat = vol.create_file();
        let oids: Vec<ObjectId> = (0..4)
            .map(|i| vol.om.create_object(&cat, None, i, b"obj").unwrap())
            .collect();
        let mut list = crate::storage::dealloc_list::DeallocList::new();
        vol.om.destroy_object(&cat, &oids[1], &mut list).unwrap();
        vol.om.destroy_object(&cat, &oids[2], &mut list).unwrap();

        assert_eq!(vol.om.prev_object(&cat, Some(&oids[3])).unwrap().unwrap().0, oids[0]);
        assert_eq!(vol.om.next_object(&cat, Some(&oids[0])).unwrap().unwrap().0, oids[3]);
    }

    #[test]
    fn bad_arguments_fix_nothing() {
        let mut vol = TestVolume::new(8);
        let cat = vol.create_file();
        let size = vol.om.buffer_pool().current_size();
        let nil = ObjectId::default();

        assert!(matches!(vol.om.prev_object(&nil, None), Err(OmError::BadCatalogObject)));
        assert!(matches!(vol.om.prev_object(&cat, Some(&nil)), Err(OmError::BadObjectId)));
        assert!(matches!(vol.om.next_object(&nil, None), Err(OmError::BadCatalogObject)));
        assert_eq!(vol.om.buffer_pool().fixed_count(), 0);
        assert_eq!(vol.om.buffer_pool().current_size(), size);
    }
}
