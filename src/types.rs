use std::fmt;
use serde::{Deserialize, Serialize};

// global constants
pub const PAGE_SIZE: usize = 4096;
pub const ALIGNMENT: usize = 4;
pub const N_BUCKETS: usize = 5;

pub const CATALOG_FILE: &str = "catalog.json";
pub const DATA_FILE: &str = "volume.dat";
pub const MAP_FILE: &str = "volume.map";

pub const DEFAULT_BUFFERPOOL_SIZE: usize = 64;
pub const DEFAULT_BUCKET_THRESHOLDS_PCT: [u8; N_BUCKETS] = [10, 20, 30, 40, 50];

// global types
pub type VolNo = u16;
pub type PageNo = u32;
pub type SlotNo = u16;
pub type Unique = u32;
pub type FileNo = u32;

/// Round an object length up to the storage alignment boundary
#[inline]
pub const fn aligned_length(len: usize) -> usize {
    (len + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId {
    pub vol_no: VolNo,
    pub page_no: PageNo,
}

impl PageId {
    pub const fn new(vol_no: VolNo, page_no: PageNo) -> Self {
        PageId { vol_no, page_no }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.vol_no, self.page_no)
    }
}

/// Identity of an object: its page, slot and the uniqueness tag the slot had
/// when the object was placed. Page number 0 is never allocated, so an id
/// addressing page 0 is the nil identity.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    pub vol_no: VolNo,
    pub page_no: PageNo,
    pub slot_no: SlotNo,
    pub unique: Unique,
}

impl ObjectId {
    pub const fn new(page: PageId, slot_no: SlotNo, unique: Unique) -> Self {
        ObjectId { vol_no: page.vol_no, page_no: page.page_no, slot_no, unique }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        PageId::new(self.vol_no, self.page_no)
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.page_no == 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}#{}", self.vol_no, self.page_no, self.slot_no, self.unique)
    }
}

/// Physical identity of a data file: its volume and first page
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileId {
    pub vol_no: VolNo,
    pub first_page: PageNo,
}

/// Header stored in front of every object in a page's data area
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectHeader {
    pub properties: u16,
    pub tag: u16,
    pub length: u32,
}

pub const OBJECT_HEADER_SIZE: usize = 8;

impl ObjectHeader {
    pub fn new(tag: u16, length: usize) -> Self {
        ObjectHeader { properties: 0, tag, length: length as u32 }
    }

    pub fn encode(&self) -> [u8; OBJECT_HEADER_SIZE] {
        let mut buf = [0u8; OBJECT_HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.properties.to_le_bytes());
        buf[2..4].copy_from_slice(&self.tag.to_le_bytes());
        buf[4..8].copy_from_slice(&self.length.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; OBJECT_HEADER_SIZE]) -> Self {
        ObjectHeader {
            properties: u16::from_le_bytes([buf[0], buf[1]]),
            tag: u16::from_le_bytes([buf[2], buf[3]]),
            length: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        }
    }

    /// Bytes the object occupies in the data area, header included
    #[inline]
    pub fn stored_size(&self) -> usize {
        OBJECT_HEADER_SIZE + aligned_length(self.length as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_length() {
        assert_eq!(aligned_length(0), 0);
        assert_eq!(aligned_length(1), 4);
        assert_eq!(aligned_length(4), 4);
        assert_eq!(aligned_length(13), 16);
    }

    #[test]
    fn test_nil_object_id() {
        assert!(ObjectId::default().is_nil());
        assert!(!ObjectId::new(PageId::new(1, 3), 0, 1).is_nil());
    }

    #[test]
    fn test_object_header_stored_size() {
        let hdr = ObjectHeader::new(7, 13);
        assert_eq!(hdr.stored_size(), OBJECT_HEADER_SIZE + 16);
        assert_eq!(ObjectHeader::decode(&hdr.encode()), hdr);
    }
}
