//! On-disk layer for quiver collections.
//!
//! A collection directory holds three files:
//!
//! - `MANIFEST` - JSON naming the collection and its current generation
//! - `collection.snap` - bincode snapshot of schema and documents at that generation
//! - `wal.log` - checksummed DML records written since the snapshot
//!
//! Opening a directory loads the snapshot and replays the log on top of it.

pub mod collection;
pub mod snapshot;
pub mod wal;

pub use collection::StoredCollection;
pub use snapshot::{Manifest, Snapshot};
pub use wal::{WalRecord, WriteAheadLog};

use quiver_core::Error;
use std::fmt::Display;

pub(crate) fn internal<E: Display>(context: impl Into<String>) -> impl FnOnce(E) -> Error {
    let context = context.into();
    move |e| Error::Internal(format!("{}: {}", context, e))
}
