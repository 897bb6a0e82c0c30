//! # quiver
//!
//! An embeddable vector document store with a stable C ABI.
//!
//! Collections hold schema-typed documents: a primary key, scalar fields,
//! dense or sparse vectors and arrays. They answer top-k vector queries,
//! group-by queries and key lookups, and live in a directory made of a
//! snapshot and a write-ahead log.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quiver::prelude::*;
//!
//! let mut schema = CollectionSchema::new("articles");
//! schema
//!     .add_field(FieldSchema::with_dimension("emb", DataType::VectorFp32, 3))
//!     .unwrap();
//! schema.add_field(FieldSchema::new("title", DataType::String)).unwrap();
//!
//! let collection =
//!     StoredCollection::create_and_open("./data/articles", schema, CollectionOptions::default())
//!         .unwrap();
//!
//! let mut doc = Doc::new("a1");
//! doc.set("emb", vec![0.1f32, 0.2, 0.3]);
//! doc.set("title", "hello");
//! let results = collection.insert(vec![doc]).unwrap();
//! assert!(results[0].is_ok());
//!
//! let query = VectorQuery::new("emb").with_vector(vec![0.1, 0.2, 0.3]).with_topk(5);
//! let hits = collection.query(&query).unwrap();
//! ```
//!
//! ## Crate Structure
//!
//! - `quiver-core` - documents, schema, parameters and the in-memory engine
//! - `quiver-storage` - durable collections (snapshot, manifest, WAL)
//! - `quiver-abi` - the C ABI (`cdylib`/`staticlib`) and `quiver.h`

pub use quiver_core::{
    registry, CollectionOptions, CollectionSchema, CollectionStats, CreateIndexOptions, DataType,
    Doc, Error, FieldSchema, GroupByVectorQuery, GroupResult, IndexParams, IndexType, MetricType,
    OptimizeOptions, Operator, QuantizeType, QueryParams, QueryVector, Result, SparseVector,
    StatusCode, Value, VectorQuery,
};

pub use quiver_storage::StoredCollection;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CollectionOptions, CollectionSchema, DataType, Doc, Error, FieldSchema,
        GroupByVectorQuery, IndexParams, MetricType, QuantizeType, QueryParams, Result,
        StoredCollection, Value, VectorQuery,
    };
}
