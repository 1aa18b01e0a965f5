pub mod types;
pub mod error;
pub mod macros;
pub mod storage;
pub mod om;

pub use error::{OmError, OmResult};
pub use om::ObjectManager;
pub use storage::{StorageConfig, StorageEngine};
pub use storage::dealloc_list::{DeallocElem, DeallocList};
pub use types::{ObjectHeader, ObjectId, PageId};
