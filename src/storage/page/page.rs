use crate::types::{PAGE_SIZE, PageId};

pub trait Page: Send + Sync {

    /// Create a new empty page with given ID
    fn new(id: PageId) -> Self;

    /// Serialize page to byte array
    fn serialize(&self) -> [u8; PAGE_SIZE];

    /// Deserialize page from byte array
    /// Return None if the bytes do not hold a well-formed page
    fn deserialize(buf: &[u8; PAGE_SIZE]) -> Option<Self> where Self: Sized;

    /// Return page id
    fn get_id(&self) -> PageId;

    /// Return the amount of free space in page
    /// Fragmented space of destroyed objects is counted as free
    fn get_free_space(&self) -> usize;

    /// Return whether page is empty
    fn is_empty(&self) -> bool;
}
