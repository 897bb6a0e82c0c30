//! # quiver Core
//!
//! Core library for the quiver document store.
//!
//! This crate provides the domain model shared by the storage layer and the
//! C ABI, plus the in-memory collection engine:
//!
//! - [`Value`] / [`Doc`] - tagged field values and schema-loose documents
//! - [`FieldSchema`] / [`CollectionSchema`] - typed field declarations
//! - [`IndexParams`] / [`QueryParams`] - closed index and query parameter variants
//! - [`VectorQuery`] / [`GroupByVectorQuery`] - search requests
//! - [`Collection`] - exact-scan engine with per-row batch results
//! - [`Filter`] - scalar filter expressions
//!
//! ## Example
//!
//! ```rust
//! use quiver_core::{Collection, CollectionSchema, DataType, Doc, FieldSchema, VectorQuery};
//!
//! let mut schema = CollectionSchema::new("articles");
//! schema.add_field(FieldSchema::with_dimension("emb", DataType::VectorFp32, 3)).unwrap();
//! schema.add_field(FieldSchema::new("title", DataType::String)).unwrap();
//! let collection = Collection::new(schema).unwrap();
//!
//! let mut doc = Doc::new("a1");
//! doc.set("emb", vec![1.0f32, 0.0, 0.0]);
//! doc.set("title", "hello");
//! let batch = collection.insert(vec![doc]);
//! assert!(batch.results[0].is_ok());
//!
//! let query = VectorQuery::new("emb").with_vector(vec![1.0, 0.0, 0.0]).with_topk(5);
//! let hits = collection.query(&query).unwrap();
//! assert_eq!(hits[0].pk(), "a1");
//! ```

pub mod coerce;
pub mod collection;
pub mod distance;
pub mod doc;
pub mod error;
pub mod filter;
pub mod options;
pub mod params;
pub mod query;
pub mod registry;
pub mod schema;
pub mod types;
pub mod value;

pub use collection::{Collection, Mutation, WriteBatch};
pub use doc::Doc;
pub use error::{Error, Result, StatusCode};
pub use filter::{Filter, FilterCondition};
pub use options::{CollectionOptions, CollectionStats, CreateIndexOptions, OptimizeOptions};
pub use params::{IndexParams, QueryParams};
pub use query::{GroupByVectorQuery, GroupResult, QueryVector, VectorQuery};
pub use registry::RegistryKind;
pub use schema::{CollectionSchema, FieldSchema};
pub use types::{DataType, IndexType, MetricType, Operator, QuantizeType};
pub use value::{FromValue, SparseVector, Value};
