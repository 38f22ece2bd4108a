//! Persistence for prompts, message snapshots and drafts.

pub mod documents;
pub mod json_file;
pub mod traits;

pub use documents::{StoreLocations, TriageStore};
pub use json_file::JsonFileStore;
pub use traits::KeyedStore;
