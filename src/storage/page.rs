pub mod page;
pub mod slotted_page;
pub mod alloc_map_page;

pub use page::Page;
pub use slotted_page::{PageType, Slot, SlottedPage};
