use log::info;
use crate::error::{OmError, OmResult};
use crate::om::ObjectManager;
use crate::storage::bufferpool::PageGuard;
use crate::storage::page::{PageType, SlottedPage};
use crate::storage::page::slotted_page::DATA_AREA_SIZE;
use crate::types::{FileId, FileNo, ObjectId, PageId, PageNo, VolNo, N_BUCKETS};

pub const CATALOG_ENTRY_SIZE: usize = 4 + 2 + 4 + 4 + N_BUCKETS * 4 + N_BUCKETS * 2;

/// Per-file descriptor kept as an object on a catalog page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub file_no: FileNo,
    pub vol_no: VolNo,
    pub first_page: PageNo,
    pub last_page: PageNo,
    pub avail_heads: [Option<PageNo>; N_BUCKETS],   // first page of each free-space bucket
    pub thresholds: [u16; N_BUCKETS],               // minimum free bytes of a bucket's pages
}

impl CatalogEntry {
    pub fn new(file_no: FileNo, vol_no: VolNo, first_page: PageNo, thresholds_pct: &[u8; N_BUCKETS]) -> Self {
        CatalogEntry {
            file_no,
            vol_no,
            first_page,
            last_page: first_page,
            avail_heads: [None; N_BUCKETS],
            thresholds: thresholds_pct.map(|pct| (DATA_AREA_SIZE * pct as usize / 100) as u16),
        }
    }

    pub fn file_id(&self) -> FileId {
        FileId { vol_no: self.vol_no, first_page: self.first_page }
    }

    /// Bucket for a page with `free` reclaimable bytes: the highest bucket
    /// whose threshold the page reaches. None when below every threshold.
    pub fn bucket_for(&self, free: usize) -> Option<usize> {
        self.thresholds.iter().rposition(|&t| free >= t as usize)
    }

    /// Buckets whose every page can hold `needed` bytes, smallest first
    pub fn buckets_fitting(&self, needed: usize) -> impl Iterator<Item = usize> + '_ {
        (0..N_BUCKETS).filter(move |&i| self.thresholds[i] as usize >= needed)
    }

    pub fn encode(&self) -> [u8; CATALOG_ENTRY_SIZE] {
        let mut buf = [0u8; CATALOG_ENTRY_SIZE];
        buf[0..4].copy_from_slice(&self.file_no.to_le_bytes());
        buf[4..6].copy_from_slice(&self.vol_no.to_le_bytes());
        buf[6..10].copy_from_slice(&self.first_page.to_le_bytes());
        buf[10..14].copy_from_slice(&self.last_page.to_le_bytes());
        let mut pos = 14;
        for head in &self.avail_heads {
            buf[pos..pos + 4].copy_from_slice(&head.unwrap_or(0).to_le_bytes());
            pos += 4;
        }
        for threshold in &self.thresholds {
            buf[pos..pos + 2].copy_from_slice(&threshold.to_le_bytes());
            pos += 2;
        }
        buf
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() != CATALOG_ENTRY_SIZE {
            return None;
        }
        let u32_at = |pos: usize| u32::from_le_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]]);
        let u16_at = |pos: usize| u16::from_le_bytes([buf[pos], buf[pos + 1]]);

        let mut avail_heads = [None; N_BUCKETS];
        let mut thresholds = [0u16; N_BUCKETS];
        for i in 0..N_BUCKETS {
            avail_heads[i] = match u32_at(14 + i * 4) {
                0 => None,
                page_no => Some(page_no),
            };
            thresholds[i] = u16_at(14 + N_BUCKETS * 4 + i * 2);
        }

        let entry = CatalogEntry {
            file_no: u32_at(0),
            vol_no: u16_at(4),
            first_page: u32_at(6),
            last_page: u32_at(10),
            avail_heads,
            thresholds,
        };
        if entry.first_page == 0 || entry.last_page == 0 {
            return None;
        }
        Some(entry)
    }
}

impl ObjectManager {

    /// Resolve a catalog object to its entry. The catalog page stays fixed
    /// for as long as the returned guard lives.
    pub(crate) fn fix_entry(&self, cat: &ObjectId) -> OmResult<(PageGuard<SlottedPage>, CatalogEntry)> {
        if cat.is_nil() {
            return Err(OmError::BadCatalogObject);
        }
        let guard = self.pool.fix(cat.page_id())?;
        let entry = {
            let page = guard.read();
            if page.page_type() != Some(PageType::Catalog) {
                return Err(OmError::BadCatalogObject);
            }
            let (_, body) = page.object(cat).map_err(|e| match e {
                OmError::ObjectNotFound(_) => OmError::BadCatalogObject,
                e => e,
            })?;
            CatalogEntry::decode(body)
                .ok_or_else(|| OmError::corrupted(cat.page_id(), "malformed catalog entry"))?
        };
        Ok((guard, entry))
    }

    /// Catalog entry of a file
    pub fn catalog_entry(&self, cat: &ObjectId) -> OmResult<CatalogEntry> {
        Ok(self.fix_entry(cat)?.1)
    }

    /// Physical identity of a file
    pub fn file_id(&self, cat: &ObjectId) -> OmResult<FileId> {
        Ok(self.catalog_entry(cat)?.file_id())
    }

    /// Overwrite a file's catalog entry
    pub(crate) fn update_entry(&self, cat: &ObjectId, entry: &CatalogEntry) -> OmResult<()> {
        let guard = self.pool.fix(cat.page_id())?;
        guard.write().write_object(cat, 0, &entry.encode())?;
        guard.set_dirty();
        Ok(())
    }

    /// Store a new entry on the last catalog page, or on a fresh catalog page
    /// appended to `catalog_pages` when the last one is full
    pub fn insert_entry(&self, catalog_pages: &mut Vec<PageNo>, entry: &CatalogEntry) -> OmResult<ObjectId> {
        let encoded = entry.encode();

        if let Some(&page_no) = catalog_pages.last() {
            let guard = self.pool.fix(PageId::new(entry.vol_no, page_no))?;
            let placed = guard.write().insert_object(0, &encoded);
            if let Some((slot_no, unique)) = placed {
                guard.set_dirty();
                return Ok(ObjectId::new(guard.page_id(), slot_no, unique));
            }
        }

        let guard = self.new_page(entry.vol_no, 0, PageType::Catalog)?;
        let (slot_no, unique) = guard.write()
            .insert_object(0, &encoded)
            .ok_or_else(|| OmError::corrupted(guard.page_id(), "empty catalog page rejects an entry"))?;
        catalog_pages.push(guard.page_id().page_no);
        info!("allocated catalog page {}", guard.page_id());
        Ok(ObjectId::new(guard.page_id(), slot_no, unique))
    }
}
