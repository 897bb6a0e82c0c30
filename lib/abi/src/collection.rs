use crate::doc::{QuiverDoc, QuiverDocList, QuiverDocMap, QuiverWriteResults};
use crate::handle::{arg_ref, arg_slice, arg_str, c_string, guard, guard_or, into_raw_string, opt_str, write_out};
use crate::options::{QuiverCollectionOptions, QuiverCreateIndexOptions, QuiverOptimizeOptions};
use crate::params::QuiverIndexParams;
use crate::query::{QuiverGroupByVectorQuery, QuiverGroupResults, QuiverVectorQuery};
use crate::schema::{QuiverCollectionSchema, QuiverFieldSchema};
use crate::status::QuiverStatus;
use quiver_core::{CollectionOptions, Doc, Error, Operator, Result};
use quiver_storage::StoredCollection;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;
use tracing::debug;

/// Open collection handle.
pub struct QuiverCollection {
    inner: StoredCollection,
    path: CString,
}

impl QuiverCollection {
    fn new(inner: StoredCollection) -> Self {
        let path = c_string(&inner.path().to_string_lossy());
        Self { inner, path }
    }

    pub fn collection(&self) -> &StoredCollection {
        &self.inner
    }
}

/// Statistics snapshot, released with `quiver_collection_stats_free`.
#[repr(C)]
#[derive(Debug)]
pub struct QuiverCollectionStats {
    pub doc_count: u64,
    pub memory_usage: u64,
    pub json_details: *mut c_char,
}

unsafe fn collection<'a>(ptr: *const QuiverCollection) -> Result<&'a StoredCollection> {
    arg_ref(ptr, "collection").map(|c| &c.inner)
}

unsafe fn collection_options(options: *const QuiverCollectionOptions) -> CollectionOptions {
    options.as_ref().map(|o| o.options().clone()).unwrap_or_default()
}

// Runs a constructor body and reports through `out_status` when given.
unsafe fn open_with(
    out_status: *mut QuiverStatus,
    f: impl FnOnce() -> Result<StoredCollection>,
) -> *mut QuiverCollection {
    let mut handle = ptr::null_mut();
    let status = guard(|| {
        handle = Box::into_raw(Box::new(QuiverCollection::new(f()?)));
        Ok(())
    });
    match out_status.as_mut() {
        Some(out) => *out = status,
        None => {
            let mut status = status;
            status.release();
        }
    }
    handle
}

// ----------------------------------------------------------------------
// Lifecycle
// ----------------------------------------------------------------------

/// Create a collection at `path` and open it. Returns null on failure with
/// the reason in `out_status` (which may be null).
///
/// # Safety
/// `path` must be a NUL-terminated string; `schema` a live handle; `options`
/// null (defaults) or a live handle; `out_status` null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_create_and_open(
    path: *const c_char,
    schema: *const QuiverCollectionSchema,
    options: *const QuiverCollectionOptions,
    out_status: *mut QuiverStatus,
) -> *mut QuiverCollection {
    open_with(out_status, || {
        let path = arg_str(path, "path")?;
        let schema = arg_ref(schema, "schema")?.schema().clone();
        StoredCollection::create_and_open(path, schema, collection_options(options))
    })
}

/// Open an existing collection. Returns null on failure.
///
/// # Safety
/// As for [`quiver_collection_create_and_open`].
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_open(
    path: *const c_char,
    options: *const QuiverCollectionOptions,
    out_status: *mut QuiverStatus,
) -> *mut QuiverCollection {
    open_with(out_status, || {
        let path = arg_str(path, "path")?;
        StoredCollection::open(path, collection_options(options))
    })
}

/// Release the handle. Buffered writes are written out; storage remains.
///
/// # Safety
/// `collection` must be null or a handle from this library released once,
/// with no call on it in progress.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_destroy(collection: *mut QuiverCollection) {
    if !collection.is_null() {
        guard_or((), || drop(Box::from_raw(collection)));
    }
}

/// Erase the collection's storage. The handle must still be released with
/// `quiver_collection_destroy`; every other call on it fails with
/// `FAILED_PRECONDITION`.
///
/// # Safety
/// `collection` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_destroy_storage(collection: *mut QuiverCollection) -> QuiverStatus {
    guard(|| self::collection(collection)?.destroy())
}

/// # Safety
/// `collection` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_flush(collection: *mut QuiverCollection) -> QuiverStatus {
    guard(|| self::collection(collection)?.flush())
}

// ----------------------------------------------------------------------
// Properties
// ----------------------------------------------------------------------

/// Storage path, owned by the handle.
///
/// # Safety
/// `collection` must be a live handle; `out_path` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_path(
    collection: *const QuiverCollection,
    out_path: *mut *const c_char,
) -> QuiverStatus {
    guard(|| {
        let handle = arg_ref(collection, "collection")?;
        handle.inner.schema()?;
        write_out(out_path, handle.path.as_ptr(), "out_path")
    })
}

/// Owned copy of the current schema.
///
/// # Safety
/// `collection` must be a live handle; `out_schema` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_schema(
    collection: *const QuiverCollection,
    out_schema: *mut *mut QuiverCollectionSchema,
) -> QuiverStatus {
    guard(|| {
        let schema = self::collection(collection)?.schema()?;
        if out_schema.is_null() {
            return Err(Error::InvalidArgument("out_schema is null".to_string()));
        }
        out_schema.write(QuiverCollectionSchema::new(schema).into_raw());
        Ok(())
    })
}

/// Owned copy of the options the collection was opened with.
///
/// # Safety
/// `collection` must be a live handle; `out_options` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_options(
    collection: *const QuiverCollection,
    out_options: *mut *mut QuiverCollectionOptions,
) -> QuiverStatus {
    guard(|| {
        let c = self::collection(collection)?;
        c.schema()?;
        if out_options.is_null() {
            return Err(Error::InvalidArgument("out_options is null".to_string()));
        }
        out_options.write(QuiverCollectionOptions::into_raw(c.options().clone()));
        Ok(())
    })
}

/// # Safety
/// `collection` must be a live handle; `out_stats` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_stats(
    collection: *const QuiverCollection,
    out_stats: *mut *mut QuiverCollectionStats,
) -> QuiverStatus {
    guard(|| {
        let stats = self::collection(collection)?.stats()?;
        if out_stats.is_null() {
            return Err(Error::InvalidArgument("out_stats is null".to_string()));
        }
        out_stats.write(Box::into_raw(Box::new(QuiverCollectionStats {
            doc_count: stats.doc_count,
            memory_usage: stats.memory_usage,
            json_details: into_raw_string(&stats.json_details),
        })));
        Ok(())
    })
}

/// # Safety
/// `stats` must be null or a value from `quiver_collection_stats` released once.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_stats_free(stats: *mut QuiverCollectionStats) {
    if stats.is_null() {
        return;
    }
    let stats = Box::from_raw(stats);
    if !stats.json_details.is_null() {
        drop(CString::from_raw(stats.json_details));
    }
}

// ----------------------------------------------------------------------
// DDL
// ----------------------------------------------------------------------

/// # Safety
/// `collection` and `params` must be live handles; `options` null or live.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_create_index(
    collection: *mut QuiverCollection,
    column: *const c_char,
    params: *const QuiverIndexParams,
    options: *const QuiverCreateIndexOptions,
) -> QuiverStatus {
    guard(|| {
        let c = self::collection(collection)?;
        let column = arg_str(column, "column")?;
        let params = arg_ref(params, "index params")?.params().clone();
        let options = options.as_ref().map(|o| o.0).unwrap_or_default();
        c.create_index(column, params, options)
    })
}

/// # Safety
/// `collection` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_drop_index(
    collection: *mut QuiverCollection,
    column: *const c_char,
) -> QuiverStatus {
    guard(|| self::collection(collection)?.drop_index(arg_str(column, "column")?))
}

/// # Safety
/// `collection` must be a live handle; `options` null or live.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_optimize(
    collection: *mut QuiverCollection,
    options: *const QuiverOptimizeOptions,
) -> QuiverStatus {
    guard(|| {
        let options = options.as_ref().map(|o| o.0).unwrap_or_default();
        self::collection(collection)?.optimize(options)
    })
}

/// Add a column filled from `expression`; null or empty fills null.
///
/// # Safety
/// `collection` and `column_schema` must be live handles.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_add_column(
    collection: *mut QuiverCollection,
    column_schema: *const QuiverFieldSchema,
    expression: *const c_char,
) -> QuiverStatus {
    guard(|| {
        let c = self::collection(collection)?;
        let field = arg_ref(column_schema, "column schema")?.field().clone();
        let expression = opt_str(expression, "expression")?.unwrap_or("");
        c.add_column(field, expression)
    })
}

/// # Safety
/// `collection` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_drop_column(
    collection: *mut QuiverCollection,
    column: *const c_char,
) -> QuiverStatus {
    guard(|| self::collection(collection)?.drop_column(arg_str(column, "column")?))
}

/// Rename a column, replace its declaration, or both. With both, the rename
/// applies first and `new_column_schema` must carry the new name.
///
/// # Safety
/// `collection` must be a live handle; `rename` and `new_column_schema` may
/// be null.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_alter_column(
    collection: *mut QuiverCollection,
    column: *const c_char,
    rename: *const c_char,
    new_column_schema: *const QuiverFieldSchema,
) -> QuiverStatus {
    guard(|| {
        let c = self::collection(collection)?;
        let column = arg_str(column, "column")?;
        let rename = opt_str(rename, "rename")?;
        let new_schema = new_column_schema.as_ref().map(|f| f.field().clone());
        c.alter_column(column, rename, new_schema)
    })
}

// ----------------------------------------------------------------------
// DML
// ----------------------------------------------------------------------

// Rows with a null or malformed slot get their own INVALID_ARGUMENT status;
// the rest run as one batch and their results are merged back in place.
fn merge_rows<T>(
    rows: Vec<Result<T>>,
    run: impl FnOnce(Vec<T>) -> Result<Vec<Result<()>>>,
) -> Result<Vec<Result<()>>> {
    let mut results: Vec<Option<Result<()>>> = Vec::with_capacity(rows.len());
    let mut valid = Vec::new();
    for row in rows {
        match row {
            Ok(item) => {
                valid.push(item);
                results.push(None);
            }
            Err(e) => results.push(Some(Err(e))),
        }
    }
    let mut engine = run(valid)?.into_iter();
    Ok(results
        .into_iter()
        .map(|slot| match slot {
            Some(r) => r,
            None => engine
                .next()
                .unwrap_or_else(|| Err(Error::Internal("missing row result".to_string()))),
        })
        .collect())
}

unsafe fn write_docs(
    collection: *mut QuiverCollection,
    op: Operator,
    docs: *const *const QuiverDoc,
    count: usize,
    out_results: *mut QuiverWriteResults,
) -> QuiverStatus {
    guard(|| {
        let c = self::collection(collection)?;
        if count == 0 {
            return Err(Error::InvalidArgument("document batch is empty".to_string()));
        }
        if out_results.is_null() {
            return Err(Error::InvalidArgument("out_results is null".to_string()));
        }
        let rows: Vec<Result<Doc>> = arg_slice(docs, count, "docs")?
            .iter()
            .enumerate()
            .map(|(i, d)| {
                d.as_ref()
                    .map(QuiverDoc::to_doc)
                    .ok_or_else(|| Error::InvalidArgument(format!("document {} is null", i)))
            })
            .collect();
        let results = merge_rows(rows, |docs| c.write(op, docs))?;
        debug!("{} batch of {} rows", op.name(), results.len());
        out_results.write(QuiverWriteResults::from_results(results));
        Ok(())
    })
}

/// # Safety
/// `docs` must point to `count` document handles (null entries allowed);
/// `out_results` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_insert(
    collection: *mut QuiverCollection,
    docs: *const *const QuiverDoc,
    count: usize,
    out_results: *mut QuiverWriteResults,
) -> QuiverStatus {
    write_docs(collection, Operator::Insert, docs, count, out_results)
}

/// # Safety
/// As for [`quiver_collection_insert`].
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_upsert(
    collection: *mut QuiverCollection,
    docs: *const *const QuiverDoc,
    count: usize,
    out_results: *mut QuiverWriteResults,
) -> QuiverStatus {
    write_docs(collection, Operator::Upsert, docs, count, out_results)
}

/// # Safety
/// As for [`quiver_collection_insert`].
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_update(
    collection: *mut QuiverCollection,
    docs: *const *const QuiverDoc,
    count: usize,
    out_results: *mut QuiverWriteResults,
) -> QuiverStatus {
    write_docs(collection, Operator::Update, docs, count, out_results)
}

/// Operator-tagged write. DELETE removes each document's pk.
///
/// # Safety
/// As for [`quiver_collection_insert`].
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_write(
    collection: *mut QuiverCollection,
    operator: u32,
    docs: *const *const QuiverDoc,
    count: usize,
    out_results: *mut QuiverWriteResults,
) -> QuiverStatus {
    match Operator::try_from(operator) {
        Ok(op) => write_docs(collection, op, docs, count, out_results),
        Err(e) => QuiverStatus::from_error(&e),
    }
}

/// # Safety
/// `pks` must point to `count` strings (null entries allowed); `out_results`
/// must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_delete(
    collection: *mut QuiverCollection,
    pks: *const *const c_char,
    count: usize,
    out_results: *mut QuiverWriteResults,
) -> QuiverStatus {
    guard(|| {
        let c = self::collection(collection)?;
        if count == 0 {
            return Err(Error::InvalidArgument("key batch is empty".to_string()));
        }
        if out_results.is_null() {
            return Err(Error::InvalidArgument("out_results is null".to_string()));
        }
        let rows: Vec<Result<&str>> = arg_slice(pks, count, "pks")?
            .iter()
            .map(|pk| arg_str(*pk, "pk"))
            .collect();
        let results = merge_rows(rows, |pks| c.delete(&pks))?;
        out_results.write(QuiverWriteResults::from_results(results));
        Ok(())
    })
}

/// # Safety
/// `collection` must be a live handle; `filter` NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_delete_by_filter(
    collection: *mut QuiverCollection,
    filter: *const c_char,
) -> QuiverStatus {
    guard(|| self::collection(collection)?.delete_by_filter(arg_str(filter, "filter")?))
}

// ----------------------------------------------------------------------
// DQL
// ----------------------------------------------------------------------

/// Top documents by descending score. Result documents are borrowed
/// wrappers over engine data.
///
/// # Safety
/// `collection` and `query` must be live handles; `out_results` valid for
/// writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_query(
    collection: *const QuiverCollection,
    query: *const QuiverVectorQuery,
    out_results: *mut QuiverDocList,
) -> QuiverStatus {
    guard(|| {
        let c = self::collection(collection)?;
        let query = arg_ref(query, "query")?;
        if out_results.is_null() {
            return Err(Error::InvalidArgument("out_results is null".to_string()));
        }
        let hits = c.query(&query.0)?;
        let docs = hits.into_iter().map(QuiverDoc::borrowed).collect();
        out_results.write(QuiverDocList::from_docs(docs));
        Ok(())
    })
}

/// Grouped results; every document is an owned copy.
///
/// # Safety
/// `collection` and `query` must be live handles; `out_results` valid for
/// writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_group_by_query(
    collection: *const QuiverCollection,
    query: *const QuiverGroupByVectorQuery,
    out_results: *mut QuiverGroupResults,
) -> QuiverStatus {
    guard(|| {
        let c = self::collection(collection)?;
        let query = arg_ref(query, "query")?;
        if out_results.is_null() {
            return Err(Error::InvalidArgument("out_results is null".to_string()));
        }
        let groups = c.group_by_query(&query.0)?;
        out_results.write(QuiverGroupResults::from_groups(groups));
        Ok(())
    })
}

/// Documents for the keys that exist, in first-request order. Every
/// document is an owned copy.
///
/// # Safety
/// `pks` must point to `count` NUL-terminated strings; `out_results` valid
/// for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_fetch(
    collection: *const QuiverCollection,
    pks: *const *const c_char,
    count: usize,
    out_results: *mut QuiverDocMap,
) -> QuiverStatus {
    guard(|| {
        let c = self::collection(collection)?;
        if out_results.is_null() {
            return Err(Error::InvalidArgument("out_results is null".to_string()));
        }
        let keys = arg_slice(pks, count, "pks")?
            .iter()
            .map(|pk| arg_str(*pk, "pk"))
            .collect::<Result<Vec<_>>>()?;
        let entries = c
            .fetch(&keys)?
            .into_iter()
            .map(|(pk, doc)| (pk, Doc::clone(&doc)))
            .collect();
        out_results.write(QuiverDocMap::from_entries(entries));
        Ok(())
    })
}
