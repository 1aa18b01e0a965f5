use std::io;
use thiserror::Error;
use crate::types::{ObjectId, PageId, PageNo, SlotNo, VolNo};

/// Result type for object manager operations
pub type OmResult<T> = Result<T, OmError>;

#[derive(Debug, Error)]
pub enum OmError {
    #[error("bad catalog object identity")]
    BadCatalogObject,

    #[error("bad object identity")]
    BadObjectId,

    #[error("object does not belong to the given file")]
    BadFileId,

    #[error("object {0} not found")]
    ObjectNotFound(ObjectId),

    #[error("slot {slot_no} is out of range on page {page}")]
    BadSlot { page: PageId, slot_no: SlotNo },

    #[error("object of {length} bytes exceeds the {max} bytes a page can hold")]
    ObjectTooLarge { length: usize, max: usize },

    #[error("requested range is outside the object")]
    BadLength,

    #[error("file {0} already exists")]
    FileExists(String),

    #[error("file {0} does not exist")]
    FileNotFound(String),

    #[error("page {0} could not be read")]
    PageNotFound(PageId),

    #[error("volume {0} is not mounted")]
    BadVolume(VolNo),

    #[error("no free frames available, all {capacity} frames are pinned")]
    NoFreeFrames { capacity: usize },

    #[error("page {0} is still fixed")]
    PageFixed(PageId),

    #[error("deallocation pool is exhausted")]
    PoolExhausted,

    #[error("page {0} is already free")]
    DoubleFree(PageNo),

    #[error("page {page} is corrupted: {reason}")]
    Corrupted { page: PageId, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl OmError {
    pub fn corrupted(page: PageId, reason: impl Into<String>) -> Self {
        OmError::Corrupted { page, reason: reason.into() }
    }

    /// True when the error is caused by the arguments of the call rather than
    /// by the environment (I/O, buffer or allocation failures)
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            OmError::BadCatalogObject
                | OmError::BadObjectId
                | OmError::BadFileId
                | OmError::ObjectNotFound(_)
                | OmError::BadSlot { .. }
                | OmError::ObjectTooLarge { .. }
                | OmError::BadLength
                | OmError::FileExists(_)
                | OmError::FileNotFound(_)
        )
    }
}

impl From<serde_json::Error> for OmError {
    fn from(e: serde_json::Error) -> Self {
        OmError::Config(e.to_string())
    }
}
