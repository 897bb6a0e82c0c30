use crate::array::{from_raw_parts, into_raw_parts};
use crate::doc::{QuiverDoc, QuiverDocList};
use crate::handle::{arg_mut, arg_slice, arg_str, guard, guard_or, into_raw_string, opt_str};
use crate::params::QuiverQueryParams;
use crate::status::QuiverStatus;
use quiver_core::{GroupByVectorQuery, GroupResult, QueryVector, Result, SparseVector, VectorQuery};
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::ptr;

pub struct QuiverVectorQuery(pub(crate) VectorQuery);
pub struct QuiverGroupByVectorQuery(pub(crate) GroupByVectorQuery);

// Setters shared by plain and group-by queries.
trait QueryHandle {
    fn query_mut(&mut self) -> &mut VectorQuery;
}

impl QueryHandle for QuiverVectorQuery {
    fn query_mut(&mut self) -> &mut VectorQuery {
        &mut self.0
    }
}

impl QueryHandle for QuiverGroupByVectorQuery {
    fn query_mut(&mut self) -> &mut VectorQuery {
        &mut self.0.query
    }
}

unsafe fn update<Q: QueryHandle>(query: *mut Q, f: impl FnOnce(&mut VectorQuery)) {
    if let Some(q) = query.as_mut() {
        f(q.query_mut());
    }
}

unsafe fn set_filter<Q: QueryHandle>(query: *mut Q, filter: *const c_char) -> QuiverStatus {
    guard(|| {
        let query = arg_mut(query, "query")?;
        query.query_mut().filter = opt_str(filter, "filter")?.map(str::to_string);
        Ok(())
    })
}

unsafe fn set_output_fields<Q: QueryHandle>(
    query: *mut Q,
    fields: *const *const c_char,
    count: usize,
) -> QuiverStatus {
    guard(|| {
        let query = arg_mut(query, "query")?;
        let names = if fields.is_null() {
            None
        } else {
            Some(
                arg_slice(fields, count, "fields")?
                    .iter()
                    .map(|f| arg_str(*f, "field name").map(str::to_string))
                    .collect::<Result<Vec<_>>>()?,
            )
        };
        query.query_mut().output_fields = names;
        Ok(())
    })
}

unsafe fn set_query_params<Q: QueryHandle>(query: *mut Q, params: *const QuiverQueryParams) {
    let params = params.as_ref().map(|p| *p.params());
    update(query, |q| q.query_params = params);
}

unsafe fn set_vector_fp32<Q: QueryHandle>(query: *mut Q, data: *const f32, len: usize) -> QuiverStatus {
    guard(|| {
        let query = arg_mut(query, "query")?;
        let data = arg_slice(data, len, "data")?;
        query.query_mut().vector = Some(QueryVector::Dense(data.to_vec()));
        Ok(())
    })
}

unsafe fn set_sparse_vector_fp32<Q: QueryHandle>(
    query: *mut Q,
    indices: *const u32,
    indices_count: usize,
    values: *const f32,
    values_count: usize,
) -> QuiverStatus {
    guard(|| {
        let query = arg_mut(query, "query")?;
        let indices = arg_slice(indices, indices_count, "indices")?;
        let values = arg_slice(values, values_count, "values")?;
        let sparse = SparseVector::new(indices.to_vec(), values.to_vec())?;
        query.query_mut().vector = Some(QueryVector::Sparse(sparse));
        Ok(())
    })
}

unsafe fn new_field_query<T>(field_name: *const c_char, build: impl FnOnce(&str) -> T) -> *mut T {
    guard_or(ptr::null_mut(), || match arg_str(field_name, "field name") {
        Ok(name) => Box::into_raw(Box::new(build(name))),
        Err(_) => ptr::null_mut(),
    })
}

// ----------------------------------------------------------------------
// Vector query
// ----------------------------------------------------------------------

/// New query on `field_name` with topk 10. Null for a null or non-UTF-8 name.
///
/// # Safety
/// `field_name` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn quiver_vector_query_new(field_name: *const c_char) -> *mut QuiverVectorQuery {
    new_field_query(field_name, |name| QuiverVectorQuery(VectorQuery::new(name)))
}

/// # Safety
/// `query` must be null or a handle from this library released once.
#[no_mangle]
pub unsafe extern "C" fn quiver_vector_query_free(query: *mut QuiverVectorQuery) {
    if !query.is_null() {
        drop(Box::from_raw(query));
    }
}

/// Negative values are kept as 0, which the engine rejects.
///
/// # Safety
/// `query` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_vector_query_set_topk(query: *mut QuiverVectorQuery, topk: c_int) {
    update(query, |q| q.topk = usize::try_from(topk).unwrap_or(0));
}

/// Null clears the filter. A filter that is not UTF-8 leaves the query
/// unchanged and returns `INVALID_ARGUMENT`.
///
/// # Safety
/// `query` must be null or a live handle; `filter` null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn quiver_vector_query_set_filter(
    query: *mut QuiverVectorQuery,
    filter: *const c_char,
) -> QuiverStatus {
    set_filter(query, filter)
}

/// # Safety
/// `query` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_vector_query_set_include_vector(query: *mut QuiverVectorQuery, include: bool) {
    update(query, |q| q.include_vector = include);
}

/// # Safety
/// `query` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_vector_query_set_include_doc_id(query: *mut QuiverVectorQuery, include: bool) {
    update(query, |q| q.include_doc_id = include);
}

/// Restrict returned scalar fields. A null `fields` returns every field.
///
/// # Safety
/// `fields` must be null or point to `count` NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn quiver_vector_query_set_output_fields(
    query: *mut QuiverVectorQuery,
    fields: *const *const c_char,
    count: usize,
) -> QuiverStatus {
    set_output_fields(query, fields, count)
}

/// Attach a copy of `params`; null detaches.
///
/// # Safety
/// `query` must be null or a live handle; `params` null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_vector_query_set_query_params(
    query: *mut QuiverVectorQuery,
    params: *const QuiverQueryParams,
) {
    set_query_params(query, params)
}

/// # Safety
/// `data` must point to `len` floats.
#[no_mangle]
pub unsafe extern "C" fn quiver_vector_query_set_vector_fp32(
    query: *mut QuiverVectorQuery,
    data: *const f32,
    len: usize,
) -> QuiverStatus {
    set_vector_fp32(query, data, len)
}

/// Counts must match.
///
/// # Safety
/// `indices` and `values` must point to the given number of elements.
#[no_mangle]
pub unsafe extern "C" fn quiver_vector_query_set_sparse_vector_fp32(
    query: *mut QuiverVectorQuery,
    indices: *const u32,
    indices_count: usize,
    values: *const f32,
    values_count: usize,
) -> QuiverStatus {
    set_sparse_vector_fp32(query, indices, indices_count, values, values_count)
}

// ----------------------------------------------------------------------
// Group-by query
// ----------------------------------------------------------------------

/// New group-by query on `field_name`: 2 groups of up to 3 documents.
///
/// # Safety
/// `field_name` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn quiver_group_by_vector_query_new(field_name: *const c_char) -> *mut QuiverGroupByVectorQuery {
    new_field_query(field_name, |name| {
        QuiverGroupByVectorQuery(GroupByVectorQuery::new(name))
    })
}

/// # Safety
/// `query` must be null or a handle from this library released once.
#[no_mangle]
pub unsafe extern "C" fn quiver_group_by_vector_query_free(query: *mut QuiverGroupByVectorQuery) {
    if !query.is_null() {
        drop(Box::from_raw(query));
    }
}

/// # Safety
/// `query` must be null or a live handle; `field_name` NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn quiver_group_by_vector_query_set_group_by_field(
    query: *mut QuiverGroupByVectorQuery,
    field_name: *const c_char,
) -> QuiverStatus {
    guard(|| {
        let query = arg_mut(query, "query")?;
        query.0.group_by_field = arg_str(field_name, "field name")?.to_string();
        Ok(())
    })
}

/// # Safety
/// `query` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_group_by_vector_query_set_group_count(query: *mut QuiverGroupByVectorQuery, count: u32) {
    if let Some(q) = query.as_mut() {
        q.0.group_count = count as usize;
    }
}

/// # Safety
/// `query` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_group_by_vector_query_set_group_topk(query: *mut QuiverGroupByVectorQuery, topk: u32) {
    if let Some(q) = query.as_mut() {
        q.0.group_topk = topk as usize;
    }
}

/// # Safety
/// `query` must be null or a live handle; `filter` null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn quiver_group_by_vector_query_set_filter(
    query: *mut QuiverGroupByVectorQuery,
    filter: *const c_char,
) -> QuiverStatus {
    set_filter(query, filter)
}

/// # Safety
/// `query` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_group_by_vector_query_set_include_vector(
    query: *mut QuiverGroupByVectorQuery,
    include: bool,
) {
    update(query, |q| q.include_vector = include);
}

/// # Safety
/// `query` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_group_by_vector_query_set_include_doc_id(
    query: *mut QuiverGroupByVectorQuery,
    include: bool,
) {
    update(query, |q| q.include_doc_id = include);
}

/// # Safety
/// `fields` must be null or point to `count` NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn quiver_group_by_vector_query_set_output_fields(
    query: *mut QuiverGroupByVectorQuery,
    fields: *const *const c_char,
    count: usize,
) -> QuiverStatus {
    set_output_fields(query, fields, count)
}

/// # Safety
/// `query` must be null or a live handle; `params` null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_group_by_vector_query_set_query_params(
    query: *mut QuiverGroupByVectorQuery,
    params: *const QuiverQueryParams,
) {
    set_query_params(query, params)
}

/// # Safety
/// `data` must point to `len` floats.
#[no_mangle]
pub unsafe extern "C" fn quiver_group_by_vector_query_set_vector_fp32(
    query: *mut QuiverGroupByVectorQuery,
    data: *const f32,
    len: usize,
) -> QuiverStatus {
    set_vector_fp32(query, data, len)
}

/// # Safety
/// `indices` and `values` must point to the given number of elements.
#[no_mangle]
pub unsafe extern "C" fn quiver_group_by_vector_query_set_sparse_vector_fp32(
    query: *mut QuiverGroupByVectorQuery,
    indices: *const u32,
    indices_count: usize,
    values: *const f32,
    values_count: usize,
) -> QuiverStatus {
    set_sparse_vector_fp32(query, indices, indices_count, values, values_count)
}

// ----------------------------------------------------------------------
// Group results
// ----------------------------------------------------------------------

#[repr(C)]
#[derive(Debug)]
pub struct QuiverGroupResult {
    pub group_by_value: *mut c_char,
    pub docs: QuiverDocList,
}

/// Groups in order of their best score. Documents are owned copies.
#[repr(C)]
#[derive(Debug)]
pub struct QuiverGroupResults {
    pub groups: *mut QuiverGroupResult,
    pub count: usize,
}

impl QuiverGroupResults {
    pub(crate) fn from_groups(groups: Vec<GroupResult>) -> Self {
        let groups: Vec<QuiverGroupResult> = groups
            .into_iter()
            .map(|g| QuiverGroupResult {
                group_by_value: into_raw_string(&g.group_value),
                docs: QuiverDocList::from_docs(g.docs.into_iter().map(QuiverDoc::owned).collect()),
            })
            .collect();
        let (groups, count) = into_raw_parts(groups);
        Self { groups, count }
    }

    /// # Safety
    /// The results must be live.
    pub unsafe fn as_slice(&self) -> &[QuiverGroupResult] {
        if self.groups.is_null() {
            return &[];
        }
        std::slice::from_raw_parts(self.groups, self.count)
    }
}

/// # Safety
/// `results` must be null, zeroed, or live results from this library.
#[no_mangle]
pub unsafe extern "C" fn quiver_group_results_free(results: *mut QuiverGroupResults) {
    let Some(results) = results.as_mut() else {
        return;
    };
    for mut group in from_raw_parts(results.groups, results.count) {
        if !group.group_by_value.is_null() {
            drop(CString::from_raw(group.group_by_value));
        }
        crate::doc::quiver_doc_list_free(&mut group.docs);
    }
    results.groups = ptr::null_mut();
    results.count = 0;
}
