pub mod reorder;
pub mod summary;
pub mod timeline;
