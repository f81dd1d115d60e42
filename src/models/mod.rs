//! Data models for storage events and the paths they refer to.

mod blob_ref;
mod event;
mod file_path;

pub use blob_ref::*;
pub use event::*;
pub use file_path::*;
