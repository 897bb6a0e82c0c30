use crate::coerce::{coerce_value, convert_scalar, literal_value};
use crate::distance;
use crate::filter::{parse_literal, Filter};
use crate::query::{GroupByVectorQuery, GroupResult, QueryVector, VectorQuery};
use crate::{
    CollectionSchema, CreateIndexOptions, DataType, Doc, Error, FieldSchema, IndexParams,
    MetricType, OptimizeOptions, Operator, QuantizeType, Result, Value,
};
use ordered_float::OrderedFloat;
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

type DocMap = HashMap<String, Arc<Doc>, ahash::RandomState>;

/// A change applied to the document set, in the form the write-ahead log
/// records it. `Put` always carries the complete stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    Put(Doc),
    Delete(String),
}

/// Outcome of a DML batch: one result per input row, in input order, plus
/// the mutations that were applied.
#[derive(Debug, Default)]
pub struct WriteBatch {
    pub results: Vec<Result<()>>,
    pub mutations: Vec<Mutation>,
}

impl WriteBatch {
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }
}

struct State {
    schema: CollectionSchema,
    docs: DocMap,
    next_doc_id: u64,
}

/// In-memory document collection with exact-scan vector search.
///
/// Reads take a shared lock and may run concurrently. Stored documents are
/// reference counted so results can be handed out without copying.
pub struct Collection {
    state: RwLock<State>,
}

impl Collection {
    pub fn new(schema: CollectionSchema) -> Result<Self> {
        schema.validate()?;
        Ok(Self::restore(schema, 1, Vec::new()))
    }

    /// Rebuild a collection from previously exported state.
    pub fn restore(schema: CollectionSchema, next_doc_id: u64, docs: Vec<Doc>) -> Self {
        let mut map = DocMap::default();
        let mut next = next_doc_id.max(1);
        for doc in docs {
            next = next.max(doc.doc_id() + 1);
            map.insert(doc.pk().to_string(), Arc::new(doc));
        }
        Self {
            state: RwLock::new(State {
                schema,
                docs: map,
                next_doc_id: next,
            }),
        }
    }

    pub fn name(&self) -> String {
        self.state.read().schema.name().to_string()
    }

    pub fn schema(&self) -> CollectionSchema {
        self.state.read().schema.clone()
    }

    pub fn count(&self) -> usize {
        self.state.read().docs.len()
    }

    pub fn next_doc_id(&self) -> u64 {
        self.state.read().next_doc_id
    }

    pub fn get(&self, pk: &str) -> Option<Arc<Doc>> {
        self.state.read().docs.get(pk).cloned()
    }

    /// Schema, id counter and stored documents ordered by doc id.
    pub fn export(&self) -> (CollectionSchema, u64, Vec<Arc<Doc>>) {
        let state = self.state.read();
        let mut docs: Vec<Arc<Doc>> = state.docs.values().cloned().collect();
        docs.sort_by_key(|d| d.doc_id());
        (state.schema.clone(), state.next_doc_id, docs)
    }

    /// Re-apply logged mutations, as done during recovery.
    pub fn apply(&self, mutations: Vec<Mutation>) {
        let mut state = self.state.write();
        for mutation in mutations {
            match mutation {
                Mutation::Put(doc) => {
                    state.next_doc_id = state.next_doc_id.max(doc.doc_id() + 1);
                    state.docs.insert(doc.pk().to_string(), Arc::new(doc));
                }
                Mutation::Delete(pk) => {
                    state.docs.remove(&pk);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // DML
    // ------------------------------------------------------------------

    /// Apply one write mode to a batch. Rows are independent: a failing row
    /// never prevents the others from being applied.
    pub fn write(&self, op: Operator, docs: Vec<Doc>) -> WriteBatch {
        let mut state = self.state.write();
        let mut batch = WriteBatch {
            results: Vec::with_capacity(docs.len()),
            mutations: Vec::new(),
        };
        for doc in docs {
            let result = match op {
                Operator::Insert => state.insert(doc, false),
                Operator::Upsert => state.insert(doc, true),
                Operator::Update => state.update(doc),
                Operator::Delete => state.delete(doc.pk()),
            };
            match result {
                Ok(mutation) => {
                    batch.mutations.push(mutation);
                    batch.results.push(Ok(()));
                }
                Err(e) => batch.results.push(Err(e)),
            }
        }
        debug!(
            "{} batch on '{}': {}/{} rows applied",
            op.name(),
            state.schema.name(),
            batch.mutations.len(),
            batch.results.len()
        );
        batch
    }

    pub fn insert(&self, docs: Vec<Doc>) -> WriteBatch {
        self.write(Operator::Insert, docs)
    }

    pub fn upsert(&self, docs: Vec<Doc>) -> WriteBatch {
        self.write(Operator::Upsert, docs)
    }

    pub fn update(&self, docs: Vec<Doc>) -> WriteBatch {
        self.write(Operator::Update, docs)
    }

    pub fn delete<S: AsRef<str>>(&self, pks: &[S]) -> WriteBatch {
        let docs = pks.iter().map(|pk| Doc::new(pk.as_ref())).collect();
        self.write(Operator::Delete, docs)
    }

    /// Delete every document matching `expr`; returns the applied deletions.
    pub fn delete_by_filter(&self, expr: &str) -> Result<Vec<Mutation>> {
        let mut state = self.state.write();
        let filter = Filter::compile(expr, &state.schema)?;
        let doomed: Vec<String> = state
            .docs
            .par_iter()
            .filter(|(_, doc)| filter.matches(doc))
            .map(|(pk, _)| pk.clone())
            .collect();
        for pk in &doomed {
            state.docs.remove(pk);
        }
        debug!("delete_by_filter on '{}' removed {} docs", state.schema.name(), doomed.len());
        Ok(doomed.into_iter().map(Mutation::Delete).collect())
    }

    // ------------------------------------------------------------------
    // DQL
    // ------------------------------------------------------------------

    /// Top-k documents by descending score. Ties are broken by primary key.
    pub fn query(&self, query: &VectorQuery) -> Result<Vec<Arc<Doc>>> {
        let state = self.state.read();
        let plan = Plan::new(&state.schema, query)?;
        if query.topk == 0 {
            return Err(Error::InvalidArgument("topk must be positive".to_string()));
        }

        let scored = plan.score_all(&state.docs);
        let mut heap = BinaryHeap::with_capacity(query.topk.min(scored.len()) + 1);
        for (idx, (score, doc)) in scored.iter().enumerate() {
            heap.push((Reverse(OrderedFloat(*score)), doc.pk(), idx));
            if heap.len() > query.topk {
                heap.pop();
            }
        }
        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|(_, _, idx)| {
                let (score, doc) = scored[idx];
                Arc::new(plan.project(doc, score, query))
            })
            .collect())
    }

    /// Hits bucketed by the value of `group_by_field`. Groups are ordered by
    /// their best hit. Documents without a group value are skipped.
    pub fn group_by_query(&self, query: &GroupByVectorQuery) -> Result<Vec<GroupResult>> {
        let state = self.state.read();
        let plan = Plan::new(&state.schema, &query.query)?;
        let group_field = state.schema.field(&query.group_by_field).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "group by field '{}' does not exist",
                query.group_by_field
            ))
        })?;
        if !group_field.data_type.is_scalar() {
            return Err(Error::InvalidArgument(format!(
                "group by field '{}' must be a scalar field",
                query.group_by_field
            )));
        }
        if query.group_count == 0 || query.group_topk == 0 {
            return Err(Error::InvalidArgument(
                "group_count and group_topk must be positive".to_string(),
            ));
        }

        let mut scored = plan.score_all(&state.docs);
        scored.sort_by(|a, b| {
            OrderedFloat(b.0)
                .cmp(&OrderedFloat(a.0))
                .then_with(|| a.1.pk().cmp(b.1.pk()))
        });

        let mut groups: Vec<GroupResult> = Vec::new();
        let mut slots: HashMap<String, usize, ahash::RandomState> = HashMap::default();
        for (score, doc) in scored {
            let Some(value) = doc.get(&query.group_by_field) else {
                continue;
            };
            let key = value.to_string();
            let slot = match slots.get(&key) {
                Some(slot) => *slot,
                None if groups.len() < query.group_count => {
                    groups.push(GroupResult {
                        group_value: key.clone(),
                        docs: Vec::new(),
                    });
                    slots.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
                None => continue,
            };
            let group = &mut groups[slot];
            if group.docs.len() < query.group_topk {
                group.docs.push(plan.project(doc, score, &query.query));
            }
        }
        Ok(groups)
    }

    /// Stored documents for the keys that exist, in first-request order.
    pub fn fetch<S: AsRef<str>>(&self, pks: &[S]) -> Vec<(String, Arc<Doc>)> {
        let state = self.state.read();
        let mut seen = HashSet::with_capacity(pks.len());
        pks.iter()
            .map(AsRef::as_ref)
            .filter(|pk| seen.insert(*pk))
            .filter_map(|pk| state.docs.get(pk).map(|d| (pk.to_string(), d.clone())))
            .collect()
    }

    // ------------------------------------------------------------------
    // DDL
    // ------------------------------------------------------------------

    pub fn create_index(
        &self,
        column: &str,
        params: IndexParams,
        options: CreateIndexOptions,
    ) -> Result<()> {
        let mut state = self.state.write();
        let field = state
            .schema
            .field(column)
            .ok_or_else(|| Error::NotFound(format!("column '{}' does not exist", column)))?
            .clone();
        params.validate_for(column, field.data_type)?;

        // Every stored value must be indexable before the index is recorded.
        let docs: Vec<&Arc<Doc>> = state.docs.values().collect();
        let invalid = with_workers(options.concurrency, || {
            docs.par_iter()
                .filter(|doc| match doc.value(column) {
                    Some(v) => coerce_value(&field, v.clone()).is_err(),
                    None => false,
                })
                .count()
        })?;
        if invalid > 0 {
            return Err(Error::FailedPrecondition(format!(
                "{} documents hold values that cannot be indexed on '{}'",
                invalid, column
            )));
        }

        debug!("Building {} index on '{}'", params.index_type().name(), column);
        if let Some(f) = state.schema.field_mut(column) {
            f.index_params = Some(params);
        }
        Ok(())
    }

    pub fn drop_index(&self, column: &str) -> Result<()> {
        let mut state = self.state.write();
        let field = state
            .schema
            .field_mut(column)
            .ok_or_else(|| Error::NotFound(format!("column '{}' does not exist", column)))?;
        if field.index_params.take().is_none() {
            return Err(Error::NotFound(format!("column '{}' has no index", column)));
        }
        Ok(())
    }

    /// Add a scalar column. An empty expression fills null (the column must
    /// be nullable); otherwise the expression is a literal fill value.
    pub fn add_column(&self, field: FieldSchema, expression: &str) -> Result<()> {
        let mut state = self.state.write();
        if state.schema.has_field(&field.name) {
            return Err(Error::AlreadyExists(format!(
                "column '{}' already exists",
                field.name
            )));
        }
        if field.is_vector() {
            return Err(Error::NotSupported(format!(
                "cannot add vector column '{}' to an existing collection",
                field.name
            )));
        }
        field.validate()?;

        let fill = if expression.trim().is_empty() {
            if !field.nullable {
                return Err(Error::InvalidArgument(format!(
                    "column '{}' is not nullable and needs a fill expression",
                    field.name
                )));
            }
            Value::Null
        } else {
            let literal = parse_literal(expression)?;
            literal_value(&literal, field.data_type).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "expression '{}' is not a valid {} value",
                    expression, field.data_type
                ))
            })?
        };

        for doc in state.docs.values_mut() {
            Arc::make_mut(doc).set(field.name.clone(), fill.clone());
        }
        state.schema.add_field(field)
    }

    pub fn drop_column(&self, name: &str) -> Result<()> {
        let mut state = self.state.write();
        let field = state
            .schema
            .field(name)
            .ok_or_else(|| Error::NotFound(format!("column '{}' does not exist", name)))?;
        if field.is_vector() {
            return Err(Error::NotSupported(format!(
                "cannot drop vector column '{}'",
                name
            )));
        }
        for doc in state.docs.values_mut() {
            if doc.has(name) {
                Arc::make_mut(doc).remove(name);
            }
        }
        state.schema.remove_field(name);
        Ok(())
    }

    /// Rename a column, replace its declaration, or both. When both are
    /// given the rename applies first and the new declaration must carry the
    /// new name. Either every document converts or nothing changes.
    pub fn alter_column(
        &self,
        name: &str,
        rename: Option<&str>,
        new_schema: Option<FieldSchema>,
    ) -> Result<()> {
        let rename = rename.filter(|r| !r.is_empty());
        if rename.is_none() && new_schema.is_none() {
            return Err(Error::InvalidArgument(format!(
                "alter of column '{}' needs a new name or a new schema",
                name
            )));
        }

        let mut state = self.state.write();
        let current = state
            .schema
            .field(name)
            .ok_or_else(|| Error::NotFound(format!("column '{}' does not exist", name)))?
            .clone();
        let target = rename.unwrap_or(name);
        if target != name && state.schema.has_field(target) {
            return Err(Error::AlreadyExists(format!("column '{}' already exists", target)));
        }

        let next = match new_schema {
            Some(schema) => {
                if schema.name != target {
                    return Err(Error::InvalidArgument(format!(
                        "new schema for '{}' is named '{}', expected '{}'",
                        name, schema.name, target
                    )));
                }
                schema.validate()?;
                schema
            }
            None => FieldSchema {
                name: target.to_string(),
                ..current.clone()
            },
        };

        if (current.is_vector() || next.is_vector())
            && (current.data_type != next.data_type || current.dimension != next.dimension)
        {
            return Err(Error::NotSupported(format!(
                "cannot change the type of vector column '{}'",
                name
            )));
        }

        // Convert first so a failure leaves the collection untouched.
        let rewrite = target != name || current.data_type != next.data_type;
        let mut converted: Vec<(String, Option<Value>)> = Vec::new();
        for (pk, doc) in state.docs.iter() {
            let value = doc.value(name);
            if value.map_or(true, Value::is_null) && !next.nullable {
                return Err(Error::FailedPrecondition(format!(
                    "column '{}' cannot become non-nullable, document '{}' has no value",
                    name, pk
                )));
            }
            if !rewrite {
                continue;
            }
            let new_value = match value {
                Some(v) if current.data_type != next.data_type => {
                    Some(convert_scalar(v, next.data_type).ok_or_else(|| {
                        Error::InvalidArgument(format!(
                            "value {} of document '{}' cannot convert to {}",
                            v, pk, next.data_type
                        ))
                    })?)
                }
                other => other.cloned(),
            };
            converted.push((pk.clone(), new_value));
        }

        for (pk, value) in converted {
            if let Some(doc) = state.docs.get_mut(&pk) {
                let doc = Arc::make_mut(doc);
                doc.remove(name);
                if let Some(value) = value {
                    doc.set(target.to_string(), value);
                }
            }
        }
        if let Some(field) = state.schema.field_mut(name) {
            *field = next;
        }
        Ok(())
    }

    /// Re-check every stored document against the schema and compact memory.
    pub fn optimize(&self, options: OptimizeOptions) -> Result<()> {
        let mut state = self.state.write();
        let schema = &state.schema;
        let docs: Vec<&Arc<Doc>> = state.docs.values().collect();
        let invalid = with_workers(options.concurrency, || {
            docs.par_iter()
                .filter(|doc| {
                    doc.fields().any(|(name, value)| match schema.field(name) {
                        Some(field) => coerce_value(field, value.clone()).is_err(),
                        None => true,
                    })
                })
                .count()
        })?;
        if invalid > 0 {
            return Err(Error::Internal(format!(
                "{} stored documents do not match the schema",
                invalid
            )));
        }
        state.docs.shrink_to_fit();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------

    /// Estimated heap bytes held by stored documents.
    pub fn memory_usage(&self) -> u64 {
        let state = self.state.read();
        state
            .docs
            .iter()
            .map(|(pk, doc)| pk.capacity() + std::mem::size_of::<Doc>() + doc.heap_size())
            .sum::<usize>() as u64
    }

    /// Structured description of the collection for stats reporting.
    pub fn describe(&self) -> serde_json::Value {
        let memory_usage = self.memory_usage();
        let state = self.state.read();
        let fields: Vec<serde_json::Value> = state
            .schema
            .fields()
            .iter()
            .map(|f| {
                serde_json::json!({
                    "name": f.name,
                    "data_type": f.data_type.name(),
                    "nullable": f.nullable,
                    "dimension": f.dimension,
                    "index": f.index_params.as_ref().map(|p| p.index_type().name()),
                })
            })
            .collect();
        serde_json::json!({
            "name": state.schema.name(),
            "doc_count": state.docs.len(),
            "memory_usage": memory_usage,
            "fields": fields,
        })
    }
}

impl State {
    fn validate_row(&self, doc: Doc, partial: bool) -> Result<Doc> {
        if doc.pk().is_empty() {
            return Err(Error::InvalidArgument("document primary key is empty".to_string()));
        }
        let mut doc = doc;
        let mut checked = Vec::with_capacity(doc.field_count());
        for (name, value) in doc.fields_mut().drain() {
            let field = self.schema.field(&name).ok_or_else(|| {
                Error::InvalidArgument(format!("field '{}' is not in the schema", name))
            })?;
            checked.push((name, coerce_value(field, value)?));
        }
        if !partial {
            if let Some(missing) = self
                .schema
                .fields()
                .iter()
                .find(|f| !f.nullable && !checked.iter().any(|(n, _)| *n == f.name))
            {
                return Err(Error::InvalidArgument(format!(
                    "document '{}' is missing required field '{}'",
                    doc.pk(),
                    missing.name
                )));
            }
        }
        for (name, value) in checked {
            doc.set(name, value);
        }
        Ok(doc)
    }

    fn insert(&mut self, doc: Doc, replace: bool) -> Result<Mutation> {
        let mut doc = self.validate_row(doc, false)?;
        let doc_id = match self.docs.get(doc.pk()) {
            Some(_) if !replace => {
                return Err(Error::AlreadyExists(format!(
                    "document '{}' already exists",
                    doc.pk()
                )))
            }
            Some(existing) => existing.doc_id(),
            None => {
                let id = self.next_doc_id;
                self.next_doc_id += 1;
                id
            }
        };
        doc.set_doc_id(doc_id);
        doc.set_score(0.0);
        self.docs.insert(doc.pk().to_string(), Arc::new(doc.clone()));
        Ok(Mutation::Put(doc))
    }

    fn update(&mut self, doc: Doc) -> Result<Mutation> {
        let changes = self.validate_row(doc, true)?;
        let stored = self.docs.get_mut(changes.pk()).ok_or_else(|| {
            Error::NotFound(format!("document '{}' does not exist", changes.pk()))
        })?;
        let merged = Arc::make_mut(stored);
        for (name, value) in changes.fields() {
            merged.set(name, value.clone());
        }
        Ok(Mutation::Put(merged.clone()))
    }

    fn delete(&mut self, pk: &str) -> Result<Mutation> {
        if pk.is_empty() {
            return Err(Error::InvalidArgument("document primary key is empty".to_string()));
        }
        match self.docs.remove(pk) {
            Some(_) => Ok(Mutation::Delete(pk.to_string())),
            None => Err(Error::NotFound(format!("document '{}' does not exist", pk))),
        }
    }
}

/// Validated query against one vector field.
struct Plan<'a> {
    field: &'a FieldSchema,
    metric: MetricType,
    query: PreparedVector,
    filter: Option<Filter>,
    schema: &'a CollectionSchema,
}

enum PreparedVector {
    Dense(Vec<f32>),
    Bits32(Vec<i32>),
    Bits64(Vec<i64>),
    Sparse(crate::SparseVector),
}

impl<'a> Plan<'a> {
    fn new(schema: &'a CollectionSchema, query: &VectorQuery) -> Result<Self> {
        let field = schema.field(&query.field_name).ok_or_else(|| {
            Error::InvalidArgument(format!("query field '{}' does not exist", query.field_name))
        })?;
        if !field.is_vector() {
            return Err(Error::InvalidArgument(format!(
                "query field '{}' is not a vector field",
                field.name
            )));
        }

        let default_index = IndexParams::flat(MetricType::Ip, QuantizeType::Undefined);
        let index = field.index_params.as_ref().unwrap_or(&default_index);
        if let Some(params) = &query.query_params {
            params.validate_against(&field.name, index)?;
        }
        let metric = index.metric().unwrap_or(MetricType::Ip);

        let prepared = match (&query.vector, field.data_type) {
            (None, _) => {
                return Err(Error::InvalidArgument("query vector is not set".to_string()))
            }
            (Some(QueryVector::Sparse(v)), t) if t.is_sparse_vector() => {
                PreparedVector::Sparse(v.clone())
            }
            (Some(QueryVector::Dense(v)), t) if t.is_dense_vector() => {
                if v.len() != field.dimension as usize {
                    return Err(Error::InvalidArgument(format!(
                        "query vector has dimension {}, field '{}' has {}",
                        v.len(),
                        field.name,
                        field.dimension
                    )));
                }
                match t {
                    DataType::VectorBinary32 => PreparedVector::Bits32(pack_bits32(v)),
                    DataType::VectorBinary64 => PreparedVector::Bits64(pack_bits64(v)),
                    _ => PreparedVector::Dense(v.clone()),
                }
            }
            (Some(_), _) => {
                return Err(Error::InvalidArgument(format!(
                    "query vector kind does not match field '{}' of type {}",
                    field.name, field.data_type
                )))
            }
        };

        if let Some(outputs) = &query.output_fields {
            if let Some(unknown) = outputs.iter().find(|f| !schema.has_field(f)) {
                return Err(Error::InvalidArgument(format!(
                    "output field '{}' does not exist",
                    unknown
                )));
            }
        }
        let filter = match query.filter.as_deref().map(str::trim) {
            Some(expr) if !expr.is_empty() => Some(Filter::compile(expr, schema)?),
            _ => None,
        };

        Ok(Self {
            field,
            metric,
            query: prepared,
            filter,
            schema,
        })
    }

    fn score(&self, doc: &Doc) -> Option<f32> {
        let value = doc.get(&self.field.name)?;
        let score = match (&self.query, value) {
            (PreparedVector::Dense(q), Value::VectorFp32(v)) => distance::score_dense(self.metric, q, v),
            (PreparedVector::Dense(q), Value::VectorFp64(v)) => {
                let v: Vec<f32> = v.iter().map(|x| *x as f32).collect();
                distance::score_dense(self.metric, q, &v)
            }
            (PreparedVector::Dense(q), Value::VectorInt8(v)) => {
                let v: Vec<f32> = v.iter().map(|x| *x as f32).collect();
                distance::score_dense(self.metric, q, &v)
            }
            (PreparedVector::Dense(q), Value::VectorInt16(v)) => {
                let v: Vec<f32> = v.iter().map(|x| *x as f32).collect();
                distance::score_dense(self.metric, q, &v)
            }
            (PreparedVector::Bits32(q), Value::VectorInt32(v)) => distance::score_binary32(q, v),
            (PreparedVector::Bits64(q), Value::VectorInt64(v)) => distance::score_binary64(q, v),
            (PreparedVector::Sparse(q), Value::SparseFp32(v)) => distance::score_sparse(self.metric, q, v),
            _ => return None,
        };
        Some(score)
    }

    fn score_all<'d>(&self, docs: &'d DocMap) -> Vec<(f32, &'d Doc)> {
        docs.par_iter()
            .filter(|(_, doc)| self.filter.as_ref().map_or(true, |f| f.matches(doc)))
            .filter_map(|(_, doc)| self.score(doc).map(|s| (s, &**doc)))
            .collect()
    }

    fn project(&self, doc: &Doc, score: f32, query: &VectorQuery) -> Doc {
        let mut out = doc.clone();
        out.set_score(score);
        if !query.include_doc_id {
            out.set_doc_id(0);
        }
        out.retain_fields(|name, _| match self.schema.field(name) {
            Some(f) if f.is_vector() => query.include_vector,
            Some(_) => query
                .output_fields
                .as_ref()
                .map_or(true, |allowed| allowed.iter().any(|a| a == name)),
            None => false,
        });
        out
    }
}

fn pack_bits32(v: &[f32]) -> Vec<i32> {
    v.chunks(32)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u32, |acc, (i, x)| if *x != 0.0 { acc | (1 << i) } else { acc }) as i32
        })
        .collect()
}

fn pack_bits64(v: &[f32]) -> Vec<i64> {
    v.chunks(64)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u64, |acc, (i, x)| if *x != 0.0 { acc | (1 << i) } else { acc }) as i64
        })
        .collect()
}

/// Run `f` on a dedicated pool of `concurrency` workers, or on the global
/// pool when `concurrency` is 0.
fn with_workers<R: Send>(concurrency: u32, f: impl FnOnce() -> R + Send) -> Result<R> {
    if concurrency == 0 {
        return Ok(f());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency as usize)
        .build()
        .map_err(|e| Error::Internal(format!("failed to start worker pool: {}", e)))?;
    Ok(pool.install(f))
}
