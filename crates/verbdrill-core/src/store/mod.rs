//! Record store backends.
//!
//! [`MemoryStore`] keeps everything behind one lock, which is what makes the
//! attempt upsert atomic. [`FileStore`] runs the same mutations against a
//! JSON file reloaded under an advisory file lock on every call, which makes
//! the upsert atomic across processes too.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::{MemoryStore, StoreSnapshot};
