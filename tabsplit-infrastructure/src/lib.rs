#![warn(clippy::uninlined_format_args)]

pub mod file_store;
pub mod snapshot;

pub use file_store::JsonFileStore;
pub use snapshot::SnapshotError;
