use crate::{Doc, QueryParams, SparseVector};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOPK: usize = 10;
pub const DEFAULT_GROUP_COUNT: usize = 2;
pub const DEFAULT_GROUP_TOPK: usize = 3;

/// Query vector, dense or sparse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryVector {
    Dense(Vec<f32>),
    Sparse(SparseVector),
}

/// Nearest-neighbour request against one vector field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorQuery {
    pub field_name: String,
    pub topk: usize,
    pub filter: Option<String>,
    pub include_vector: bool,
    pub include_doc_id: bool,
    /// Scalar fields to return. `None` returns every scalar field.
    pub output_fields: Option<Vec<String>>,
    pub query_params: Option<QueryParams>,
    pub vector: Option<QueryVector>,
}

impl VectorQuery {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            topk: DEFAULT_TOPK,
            filter: None,
            include_vector: false,
            include_doc_id: false,
            output_fields: None,
            query_params: None,
            vector: None,
        }
    }

    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(QueryVector::Dense(vector));
        self
    }

    pub fn with_sparse_vector(mut self, vector: SparseVector) -> Self {
        self.vector = Some(QueryVector::Sparse(vector));
        self
    }

    pub fn with_topk(mut self, topk: usize) -> Self {
        self.topk = topk;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Vector query whose hits are bucketed by the value of a scalar field.
/// The inner query's `topk` is not used: `group_count` bounds the number of
/// groups and `group_topk` the documents per group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupByVectorQuery {
    pub query: VectorQuery,
    pub group_by_field: String,
    pub group_count: usize,
    pub group_topk: usize,
}

impl GroupByVectorQuery {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            query: VectorQuery::new(field_name),
            group_by_field: String::new(),
            group_count: DEFAULT_GROUP_COUNT,
            group_topk: DEFAULT_GROUP_TOPK,
        }
    }

    pub fn with_group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by_field = field.into();
        self
    }
}

/// One group of a group-by result, documents ordered by descending score.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupResult {
    pub group_value: String,
    pub docs: Vec<Doc>,
}
