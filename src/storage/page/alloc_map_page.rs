use std::mem::size_of;
use crate::{bitmap_get, bitmap_set};
use crate::types::{PAGE_SIZE, PageId, PageNo, VolNo};
use crate::storage::page::page::Page;

const MAP_HEADER_SIZE: usize = size_of::<PageNo>() + 2 * size_of::<VolNo>();
pub const MAP_BITS_SIZE: usize = PAGE_SIZE - MAP_HEADER_SIZE;  // allocation bitmap size in bytes
pub const PAGES_PER_MAP_PAGE: usize = MAP_BITS_SIZE * 8;

/// One page of the volume allocation bitmap.
/// Map page k (k >= 1) covers volume pages `(k - 1) * PAGES_PER_MAP_PAGE + 1 ..= k * PAGES_PER_MAP_PAGE`;
/// volume page 0 is never handed out.
#[derive(Clone, Debug)]
pub struct AllocMapPage {
    id: PageId,
    bits: Box<[u8; MAP_BITS_SIZE]>,   // 1 = allocated
}

impl AllocMapPage {

    /// Map page responsible for a volume page
    pub fn map_page_for(page_no: PageNo) -> PageNo {
        ((page_no as usize - 1) / PAGES_PER_MAP_PAGE + 1) as PageNo
    }

    /// First volume page this map page covers
    pub fn base(&self) -> PageNo {
        ((self.id.page_no as usize - 1) * PAGES_PER_MAP_PAGE + 1) as PageNo
    }

    /// Allocate the lowest free page covered by this map page
    /// Return None if every covered page is in use
    pub fn allocate(&mut self) -> Option<PageNo> {
        let index = self.first_free()?;
        bitmap_set!(self.bits, index, true);
        Some(self.base() + index as PageNo)
    }

    /// Mark a page free again. Return false if it was not allocated.
    pub fn deallocate(&mut self, page_no: PageNo) -> bool {
        let index = (page_no - self.base()) as usize;
        if !bitmap_get!(self.bits, index) {
            return false;
        }
        bitmap_set!(self.bits, index, false);
        true
    }

    pub fn is_allocated(&self, page_no: PageNo) -> bool {
        let index = (page_no - self.base()) as usize;
        bitmap_get!(self.bits, index)
    }

    /// Return index of first free bit if exists
    fn first_free(&self) -> Option<usize> {
        self.bits.iter()
            .position(|&b| b != u8::MAX)
            .map(|byte| byte * 8 + self.bits[byte].trailing_ones() as usize)
    }
}

impl Page for AllocMapPage {
    fn new(id: PageId) -> Self {
        debug_assert_ne!(id.page_no, 0);    // map pages are numbered from 1
        AllocMapPage { id, bits: Box::new([0; MAP_BITS_SIZE]) }
    }

    /// Layout:
    /// [page_no: 4][vol_no: 2][reserved: 2][bitmap]
    fn serialize(&self) -> [u8; PAGE_SIZE] {
        let mut buf = [0u8; PAGE_SIZE];
        buf[0..4].copy_from_slice(&self.id.page_no.to_le_bytes());
        buf[4..6].copy_from_slice(&self.id.vol_no.to_le_bytes());
        buf[MAP_HEADER_SIZE..].copy_from_slice(&self.bits[..]);
        buf
    }

    fn deserialize(buf: &[u8; PAGE_SIZE]) -> Option<Self> {
        let page_no = PageNo::from_le_bytes(buf[0..4].try_into().ok()?);
        let vol_no = VolNo::from_le_bytes(buf[4..6].try_into().ok()?);
        if page_no == 0 {
            return None;
        }
        let mut bits = Box::new([0u8; MAP_BITS_SIZE]);
        bits.copy_from_slice(&buf[MAP_HEADER_SIZE..]);
        Some(AllocMapPage { id: PageId::new(vol_no, page_no), bits })
    }

    fn get_id(&self) -> PageId {
        self.id
    }

    fn get_free_space(&self) -> usize {
        self.bits.iter().map(|b| b.count_zeros() as usize).sum()
    }

    fn is_empty(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }
}
