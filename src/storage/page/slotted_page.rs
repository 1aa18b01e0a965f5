use std::mem::size_of;
use log::debug;
use crate::error::{OmError, OmResult};
use crate::page_header_field;
use crate::storage::page::page::Page;
use crate::types::{
    aligned_length, FileNo, ObjectHeader, ObjectId, PageId, PageNo, SlotNo, Unique, VolNo,
    ALIGNMENT, OBJECT_HEADER_SIZE, PAGE_SIZE,
};

pub const PAGE_HEADER_SIZE: usize = 48;
pub const DATA_AREA_SIZE: usize = PAGE_SIZE - PAGE_HEADER_SIZE;
pub const SLOT_SIZE: usize = size_of::<u16>() + size_of::<Unique>();
/// Longest object body an empty page can hold
pub const MAX_OBJECT_LENGTH: usize =
    (DATA_AREA_SIZE - SLOT_SIZE - OBJECT_HEADER_SIZE) & !(ALIGNMENT - 1);

const EMPTY_SLOT: u16 = 0xFFFF;
const NO_BUCKET: u8 = 0xFF;

// header layout
const OFF_PAGE_NO: usize = 0;
const OFF_VOL_NO: usize = 4;
const OFF_PAGE_TYPE: usize = 6;
const OFF_N_SLOTS: usize = 8;
const OFF_FREE: usize = 10;
const OFF_UNUSED: usize = 12;
const OFF_BUCKET: usize = 14;
const OFF_FILE_NO: usize = 16;
const OFF_UNIQUE: usize = 20;
const OFF_PREV_PAGE: usize = 24;
const OFF_NEXT_PAGE: usize = 28;
const OFF_SPACE_PREV: usize = 32;
const OFF_SPACE_NEXT: usize = 36;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PageType {
    Data = 1,
    Catalog = 2,
}

impl PageType {
    fn from_u16(v: u16) -> Option<Self> {
        match v {
            1 => Some(PageType::Data),
            2 => Some(PageType::Catalog),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Slot {
    pub offset: Option<u16>, // None once the object is destroyed
    pub unique: Unique,
}

impl Slot {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offset.is_none()
    }
}

/// Bytes a new object of `length` needs on a page, including its new slot
#[inline]
pub const fn required_space(length: usize) -> usize {
    OBJECT_HEADER_SIZE + aligned_length(length) + SLOT_SIZE
}

/// A slotted page kept as its raw on-disk image.
///
/// Layout:
/// [header: 48][data area, grows forward ->  ...  <- slot array, grows backward]
///
/// Slot i sits at `PAGE_SIZE - (i + 1) * SLOT_SIZE`. `free` is the data
/// high-water mark relative to the data area; bytes of destroyed objects below
/// it are tracked in `unused` until the page is compacted. Emptied slots stay
/// in the array until an insert reuses them, except the highest one, which
/// is dropped when its object is destroyed.
pub struct SlottedPage {
    buf: Box<[u8; PAGE_SIZE]>,
}

impl SlottedPage {

    /// Create an empty page owned by `file_no`
    pub fn init(id: PageId, file_no: FileNo, page_type: PageType) -> Self {
        let mut page = SlottedPage { buf: Box::new([0u8; PAGE_SIZE]) };
        page.set_page_no(id.page_no);
        page.set_vol_no(id.vol_no);
        page.set_page_type_raw(page_type as u16);
        page.set_file_no(file_no);
        page.set_bucket(None);
        page
    }

    page_header_field!(page_no: PageNo, OFF_PAGE_NO);
    page_header_field!(vol_no: VolNo, OFF_VOL_NO);
    page_header_field!(page_type_raw: u16, OFF_PAGE_TYPE);
    page_header_field!(n_slots: u16, OFF_N_SLOTS);
    page_header_field!(free: u16, OFF_FREE);
    page_header_field!(unused: u16, OFF_UNUSED);
    page_header_field!(file_no: FileNo, OFF_FILE_NO);
    page_header_field!(unique: Unique, OFF_UNIQUE);
    page_header_field!(prev_page: link, OFF_PREV_PAGE);
    page_header_field!(next_page: link, OFF_NEXT_PAGE);
    page_header_field!(space_prev: link, OFF_SPACE_PREV);
    page_header_field!(space_next: link, OFF_SPACE_NEXT);

    #[inline]
    pub fn page_id(&self) -> PageId {
        PageId::new(self.vol_no(), self.page_no())
    }

    #[inline]
    pub fn page_type(&self) -> Option<PageType> {
        PageType::from_u16(self.page_type_raw())
    }

    /// Free-space bucket the page is currently listed in
    #[inline]
    pub fn bucket(&self) -> Option<u8> {
        match self.buf[OFF_BUCKET] {
            NO_BUCKET => None,
            b => Some(b),
        }
    }

    #[inline]
    pub fn set_bucket(&mut self, bucket: Option<u8>) {
        self.buf[OFF_BUCKET] = bucket.unwrap_or(NO_BUCKET);
    }

    /// End of the data area, i.e. where the slot array begins
    #[inline]
    pub fn data_area_end(&self) -> usize {
        DATA_AREA_SIZE - self.n_slots() as usize * SLOT_SIZE
    }

    /// Bytes between the data high-water mark and the slot array
    #[inline]
    pub fn contiguous_free(&self) -> usize {
        self.data_area_end().saturating_sub(self.free() as usize)
    }

    /// Contiguous free bytes plus fragmented bytes reclaimable by compaction
    #[inline]
    pub fn total_free(&self) -> usize {
        self.contiguous_free() + self.unused() as usize
    }

    #[inline]
    fn slot_pos(slot_no: SlotNo) -> usize {
        PAGE_SIZE - (slot_no as usize + 1) * SLOT_SIZE
    }

    /// Read a slot, rejecting indexes past the slot array
    pub fn slot(&self, slot_no: SlotNo) -> OmResult<Slot> {
        if slot_no >= self.n_slots() {
            return Err(OmError::BadSlot { page: self.page_id(), slot_no });
        }
        let pos = Self::slot_pos(slot_no);
        let offset = u16::from_le_bytes([self.buf[pos], self.buf[pos + 1]]);
        let unique = Unique::from_le_bytes([
            self.buf[pos + 2], self.buf[pos + 3], self.buf[pos + 4], self.buf[pos + 5],
        ]);
        Ok(Slot {
            offset: if offset == EMPTY_SLOT { None } else { Some(offset) },
            unique,
        })
    }

    fn write_slot(&mut self, slot_no: SlotNo, slot: Slot) {
        let pos = Self::slot_pos(slot_no);
        let offset = slot.offset.unwrap_or(EMPTY_SLOT);
        self.buf[pos..pos + 2].copy_from_slice(&offset.to_le_bytes());
        self.buf[pos + 2..pos + SLOT_SIZE].copy_from_slice(&slot.unique.to_le_bytes());
    }

    /// Decode the object header stored at a data-area offset
    fn header_at(&self, offset: u16) -> OmResult<ObjectHeader> {
        let start = offset as usize;
        if start + OBJECT_HEADER_SIZE > self.free() as usize {
            return Err(OmError::corrupted(
                self.page_id(),
                format!("object offset {} past high-water mark {}", offset, self.free()),
            ));
        }
        let pos = PAGE_HEADER_SIZE + start;
        let mut raw = [0u8; OBJECT_HEADER_SIZE];
        raw.copy_from_slice(&self.buf[pos..pos + OBJECT_HEADER_SIZE]);
        let header = ObjectHeader::decode(&raw);
        if start + header.stored_size() > self.free() as usize {
            return Err(OmError::corrupted(
                self.page_id(),
                format!("object at offset {} overruns the data area", offset),
            ));
        }
        Ok(header)
    }

    /// Header of a live object, None when the slot is empty
    pub fn live_header(&self, slot_no: SlotNo) -> OmResult<Option<(Unique, ObjectHeader)>> {
        let slot = self.slot(slot_no)?;
        match slot.offset {
            Some(offset) => Ok(Some((slot.unique, self.header_at(offset)?))),
            None => Ok(None),
        }
    }

    /// Header and body of the object `oid` names on this page.
    /// Fails with ObjectNotFound when the slot is empty or was reused.
    pub fn object(&self, oid: &ObjectId) -> OmResult<(ObjectHeader, &[u8])> {
        let (header, body) = self.locate(oid)?;
        Ok((header, &self.buf[body..body + header.length as usize]))
    }

    /// Overwrite bytes of a live object's body in place
    pub fn write_object(&mut self, oid: &ObjectId, start: usize, data: &[u8]) -> OmResult<()> {
        let (header, body) = self.locate(oid)?;
        if start + data.len() > header.length as usize {
            return Err(OmError::BadLength);
        }
        self.buf[body + start..body + start + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Header of the object `oid` names and the buffer position of its body
    fn locate(&self, oid: &ObjectId) -> OmResult<(ObjectHeader, usize)> {
        if oid.page_id() != self.page_id() || oid.slot_no >= self.n_slots() {
            return Err(OmError::ObjectNotFound(*oid));
        }
        let slot = self.slot(oid.slot_no)?;
        let offset = match slot.offset {
            Some(offset) if slot.unique == oid.unique => offset,
            _ => return Err(OmError::ObjectNotFound(*oid)),
        };
        let header = self.header_at(offset)?;
        Ok((header, PAGE_HEADER_SIZE + offset as usize + OBJECT_HEADER_SIZE))
    }

    /// Place an object at the high-water mark. The lowest empty slot is
    /// reused under a fresh unique tag; a slot is appended only when none is
    /// empty. Compacts first when only fragmented space is left.
    /// Return None when the page cannot hold the object.
    pub fn insert_object(&mut self, tag: u16, data: &[u8]) -> Option<(SlotNo, Unique)> {
        if data.len() > MAX_OBJECT_LENGTH {
            return None;
        }
        let reused = self.first_empty_slot();
        let header = ObjectHeader::new(tag, data.len());
        let needed = header.stored_size() + if reused.is_some() { 0 } else { SLOT_SIZE };
        if needed > self.total_free() {
            return None;
        }
        if needed > self.contiguous_free() {
            self.compact();
        }

        let offset = self.free();
        let pos = PAGE_HEADER_SIZE + offset as usize;
        self.buf[pos..pos + OBJECT_HEADER_SIZE].copy_from_slice(&header.encode());
        let body = pos + OBJECT_HEADER_SIZE;
        self.buf[body..body + data.len()].copy_from_slice(data);
        self.buf[body + data.len()..pos + header.stored_size()].fill(0);
        self.set_free(offset + header.stored_size() as u16);

        let slot_no = match reused {
            Some(slot_no) => slot_no,
            None => {
                let slot_no = self.n_slots();
                self.set_n_slots(slot_no + 1);
                slot_no
            }
        };
        let unique = self.unique();
        self.set_unique(unique.wrapping_add(1));
        self.write_slot(slot_no, Slot { offset: Some(offset), unique });

        Some((slot_no, unique))
    }

    fn first_empty_slot(&self) -> Option<SlotNo> {
        (0..self.n_slots()).find(|&slot_no| {
            let pos = Self::slot_pos(slot_no);
            u16::from_le_bytes([self.buf[pos], self.buf[pos + 1]]) == EMPTY_SLOT
        })
    }

    /// Empty a slot and account for the space it held.
    ///
    /// The highest slot shrinks the slot array by one, and its bytes pull the
    /// high-water mark back when the object ends there. Any other slot
    /// leaves a hole, and bytes not at the high-water mark go to `unused`.
    /// Return the number of bytes reclaimed.
    pub fn destroy_slot(&mut self, slot_no: SlotNo) -> OmResult<usize> {
        let slot = self.slot(slot_no)?;
        let offset = slot.offset.ok_or(OmError::ObjectNotFound(
            ObjectId::new(self.page_id(), slot_no, slot.unique),
        ))?;
        let reclaimed = self.header_at(offset)?.stored_size();
        self.write_slot(slot_no, Slot { offset: None, unique: slot.unique });

        let at_edge = offset as usize + reclaimed == self.free() as usize;
        if slot_no == self.n_slots() - 1 {
            self.set_n_slots(slot_no);
        }
        if slot_no == self.n_slots() && at_edge {
            self.set_free(offset);
        } else {
            self.set_unused(self.unused() + reclaimed as u16);
        }
        Ok(reclaimed)
    }

    /// Number of slots holding an object
    pub fn live_count(&self) -> usize {
        (0..self.n_slots())
            .filter(|&slot_no| {
                let pos = Self::slot_pos(slot_no);
                u16::from_le_bytes([self.buf[pos], self.buf[pos + 1]]) != EMPTY_SLOT
            })
            .count()
    }

    /// Move live objects together in slot order so that all free space is
    /// contiguous
    pub fn compact(&mut self) {
        let mut packed = Vec::with_capacity(self.free() as usize);
        let mut moved = Vec::new();
        for slot_no in 0..self.n_slots() {
            let pos = Self::slot_pos(slot_no);
            let offset = u16::from_le_bytes([self.buf[pos], self.buf[pos + 1]]);
            if offset == EMPTY_SLOT {
                continue;
            }
            let start = PAGE_HEADER_SIZE + offset as usize;
            let mut raw = [0u8; OBJECT_HEADER_SIZE];
            raw.copy_from_slice(&self.buf[start..start + OBJECT_HEADER_SIZE]);
            let size = ObjectHeader::decode(&raw).stored_size();
            moved.push((slot_no, packed.len() as u16));
            packed.extend_from_slice(&self.buf[start..start + size]);
        }

        let start = PAGE_HEADER_SIZE;
        self.buf[start..start + packed.len()].copy_from_slice(&packed);
        for (slot_no, offset) in moved {
            let pos = Self::slot_pos(slot_no);
            self.buf[pos..pos + 2].copy_from_slice(&offset.to_le_bytes());
        }
        debug!(
            "compacted page {}: reclaimed {} fragmented bytes",
            self.page_id(),
            self.unused()
        );
        self.set_free(packed.len() as u16);
        self.set_unused(0);
    }

    /// Highest occupied slot strictly below `before` (or anywhere when None)
    pub fn last_occupied_before(&self, before: Option<SlotNo>) -> OmResult<Option<SlotNo>> {
        let upper = before.map_or(self.n_slots(), |b| b.min(self.n_slots()));
        for slot_no in (0..upper).rev() {
            if !self.slot(slot_no)?.is_empty() {
                return Ok(Some(slot_no));
            }
        }
        Ok(None)
    }

    /// Lowest occupied slot strictly above `after` (or anywhere when None)
    pub fn first_occupied_after(&self, after: Option<SlotNo>) -> OmResult<Option<SlotNo>> {
        let lower = after.map_or(0, |a| a.saturating_add(1));
        for slot_no in lower..self.n_slots() {
            if !self.slot(slot_no)?.is_empty() {
                return Ok(Some(slot_no));
            }
        }
        Ok(None)
    }
}

impl Page for SlottedPage {

    fn new(id: PageId) -> Self {
        SlottedPage::init(id, 0, PageType::Data)
    }

    fn serialize(&self) -> [u8; PAGE_SIZE] {
        *self.buf
    }

    fn deserialize(buf: &[u8; PAGE_SIZE]) -> Option<Self> {
        let page = SlottedPage { buf: Box::new(*buf) };
        page.page_type()?;
        let slot_bytes = page.n_slots() as usize * SLOT_SIZE;
        if slot_bytes + page.free() as usize > DATA_AREA_SIZE || page.unused() > page.free() {
            return None;
        }
        Some(page)
    }

    #[inline]
    fn get_id(&self) -> PageId {
        self.page_id()
    }

    #[inline]
    fn get_free_space(&self) -> usize {
        self.total_free()
    }

    /// No slot holds an object, though emptied slots may remain
    #[inline]
    fn is_empty(&self) -> bool {
        self.live_count() == 0
    }
}

/*
Unit tests
*/
