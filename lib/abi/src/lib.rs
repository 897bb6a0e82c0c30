//! # quiver-abi
//!
//! C-callable surface over the quiver collection engine.
//!
//! Every type crossing the boundary is an opaque handle or a `#[repr(C)]`
//! struct, every fallible call returns a [`QuiverStatus`], and every array
//! result comes with its own release function. The matching header lives in
//! `include/quiver.h`.
//!
//! Ownership follows three rules:
//!
//! - Handles created by a `*_new` function belong to the caller and are
//!   released with the matching `*_free`.
//! - Strings returned by single-value accessors are owned by the handle and
//!   stay valid until the handle is released or mutated.
//! - Strings inside arrays, maps, group results and statuses are independent
//!   copies released with their container.
//!
//! Query results are borrowed views over engine documents; mutating one
//! copies it first. Fetch and group-by results are owned copies.

pub mod array;
pub mod collection;
pub mod doc;
pub mod handle;
pub mod options;
pub mod params;
pub mod query;
pub mod runtime;
pub mod schema;
pub mod status;

pub use array::QuiverStringArray;
pub use collection::{QuiverCollection, QuiverCollectionStats};
pub use doc::{QuiverDoc, QuiverDocList, QuiverDocMap, QuiverWriteResults};
pub use handle::Handle;
pub use options::{QuiverCollectionOptions, QuiverCreateIndexOptions, QuiverOptimizeOptions};
pub use params::{QuiverIndexParams, QuiverQueryParams};
pub use query::{QuiverGroupByVectorQuery, QuiverGroupResult, QuiverGroupResults, QuiverVectorQuery};
pub use schema::{QuiverCollectionSchema, QuiverFieldSchema};
pub use status::QuiverStatus;
