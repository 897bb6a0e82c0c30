use crate::array::{from_raw_parts, into_raw_parts, QuiverStringArray};
use crate::handle::{arg_mut, arg_ref, arg_slice, arg_str, c_string, guard, guard_or, into_raw_string, Handle};
use crate::status::QuiverStatus;
use parking_lot::Mutex;
use quiver_core::{DataType, Doc, FromValue, Result, SparseVector, Value};
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::sync::Arc;

/// Document handle.
///
/// Strings handed out by the pk and string getters live in `strings` and
/// stay valid until the document is mutated or released.
pub struct QuiverDoc {
    inner: Handle<Doc>,
    pk: Mutex<Option<CString>>,
    strings: Mutex<HashMap<String, CString>>,
}

impl QuiverDoc {
    pub fn owned(doc: Doc) -> Self {
        Self::wrap(Handle::owned(doc))
    }

    pub fn borrowed(doc: Arc<Doc>) -> Self {
        Self::wrap(Handle::borrowed(doc))
    }

    fn wrap(inner: Handle<Doc>) -> Self {
        Self {
            inner,
            pk: Mutex::new(None),
            strings: Mutex::new(HashMap::new()),
        }
    }

    pub fn doc(&self) -> &Doc {
        self.inner.get()
    }

    pub fn is_owned(&self) -> bool {
        self.inner.is_owned()
    }

    pub(crate) fn to_doc(&self) -> Doc {
        self.inner.to_owned_value()
    }

    fn doc_mut(&mut self) -> &mut Doc {
        self.pk.get_mut().take();
        self.strings.get_mut().clear();
        self.inner.make_mut()
    }

    fn pk_ptr(&self) -> *const c_char {
        let mut pk = self.pk.lock();
        pk.get_or_insert_with(|| c_string(self.doc().pk())).as_ptr()
    }

    fn string_ptr(&self, field: &str, value: &str) -> *const c_char {
        let mut strings = self.strings.lock();
        strings
            .entry(field.to_string())
            .or_insert_with(|| c_string(value))
            .as_ptr()
    }

    pub(crate) fn into_raw(self) -> *mut QuiverDoc {
        Box::into_raw(Box::new(self))
    }
}

// ----------------------------------------------------------------------
// Lifecycle and metadata
// ----------------------------------------------------------------------

/// New empty, exclusively owned document.
#[no_mangle]
pub extern "C" fn quiver_doc_new() -> *mut QuiverDoc {
    QuiverDoc::owned(Doc::default()).into_raw()
}

/// Release a document handle. For a borrowed document only the wrapper is
/// released.
///
/// # Safety
/// `doc` must be null or a handle from this library released exactly once.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_free(doc: *mut QuiverDoc) {
    if !doc.is_null() {
        drop(Box::from_raw(doc));
    }
}

/// Owned deep copy of any document handle.
///
/// # Safety
/// `doc` must be null or a live document handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_clone(doc: *const QuiverDoc) -> *mut QuiverDoc {
    guard_or(ptr::null_mut(), || match doc.as_ref() {
        Some(doc) => QuiverDoc::owned(doc.to_doc()).into_raw(),
        None => ptr::null_mut(),
    })
}

/// # Safety
/// `doc` must be null or a live document handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_is_owned(doc: *const QuiverDoc) -> bool {
    doc.as_ref().map_or(false, QuiverDoc::is_owned)
}

/// # Safety
/// `doc` must be a live document handle; `pk` a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_set_pk(doc: *mut QuiverDoc, pk: *const c_char) -> QuiverStatus {
    guard(|| {
        let doc = arg_mut(doc, "doc")?;
        let pk = arg_str(pk, "pk")?;
        doc.doc_mut().set_pk(pk);
        Ok(())
    })
}

/// Primary key, valid until the document is mutated or released. Null for
/// a null handle.
///
/// # Safety
/// `doc` must be null or a live document handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_pk(doc: *const QuiverDoc) -> *const c_char {
    guard_or(ptr::null(), || doc.as_ref().map_or(ptr::null(), QuiverDoc::pk_ptr))
}

/// # Safety
/// `doc` must be null or a live document handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_set_score(doc: *mut QuiverDoc, score: f32) {
    if let Some(doc) = doc.as_mut() {
        doc.doc_mut().set_score(score);
    }
}

/// # Safety
/// `doc` must be null or a live document handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_score(doc: *const QuiverDoc) -> f32 {
    doc.as_ref().map_or(0.0, |d| d.doc().score())
}

/// # Safety
/// `doc` must be null or a live document handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_set_doc_id(doc: *mut QuiverDoc, doc_id: u64) {
    if let Some(doc) = doc.as_mut() {
        doc.doc_mut().set_doc_id(doc_id);
    }
}

/// # Safety
/// `doc` must be null or a live document handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_doc_id(doc: *const QuiverDoc) -> u64 {
    doc.as_ref().map_or(0, |d| d.doc().doc_id())
}

// ----------------------------------------------------------------------
// Setters
// ----------------------------------------------------------------------

unsafe fn set_field(
    doc: *mut QuiverDoc,
    field: *const c_char,
    value: impl FnOnce() -> Result<Value>,
) -> QuiverStatus {
    guard(|| {
        let doc = arg_mut(doc, "doc")?;
        let field = arg_str(field, "field")?;
        let value = value()?;
        doc.doc_mut().set(field, value);
        Ok(())
    })
}

macro_rules! scalar_setters {
    ($($name:ident: $ty:ty),* $(,)?) => {$(
        /// Set a scalar field, replacing any previous value and type.
        ///
        /// # Safety
        /// `doc` must be a live document handle; `field` a NUL-terminated string.
        #[no_mangle]
        pub unsafe extern "C" fn $name(
            doc: *mut QuiverDoc,
            field: *const c_char,
            value: $ty,
        ) -> QuiverStatus {
            set_field(doc, field, || Ok(Value::from(value)))
        }
    )*};
}

scalar_setters! {
    quiver_doc_set_bool: bool,
    quiver_doc_set_int32: i32,
    quiver_doc_set_int64: i64,
    quiver_doc_set_uint32: u32,
    quiver_doc_set_uint64: u64,
    quiver_doc_set_float: f32,
    quiver_doc_set_double: f64,
}

macro_rules! slice_setters {
    ($($name:ident: $ty:ty => $variant:path),* $(,)?) => {$(
        /// Set a vector or array field from `len` elements at `data`.
        ///
        /// # Safety
        /// `doc` must be a live document handle; `field` a NUL-terminated
        /// string; `data` must point to `len` elements or be null with `len == 0`.
        #[no_mangle]
        pub unsafe extern "C" fn $name(
            doc: *mut QuiverDoc,
            field: *const c_char,
            data: *const $ty,
            len: usize,
        ) -> QuiverStatus {
            set_field(doc, field, || Ok($variant(arg_slice(data, len, "data")?.to_vec())))
        }
    )*};
}

slice_setters! {
    quiver_doc_set_vector_fp32: f32 => Value::VectorFp32,
    quiver_doc_set_vector_fp64: f64 => Value::VectorFp64,
    quiver_doc_set_vector_int8: i8 => Value::VectorInt8,
    quiver_doc_set_vector_int16: i16 => Value::VectorInt16,
    quiver_doc_set_vector_int32: i32 => Value::VectorInt32,
    quiver_doc_set_vector_int64: i64 => Value::VectorInt64,
    quiver_doc_set_array_int32: i32 => Value::ArrayInt32,
    quiver_doc_set_array_int64: i64 => Value::ArrayInt64,
    quiver_doc_set_array_float: f32 => Value::ArrayFloat,
    quiver_doc_set_array_double: f64 => Value::ArrayDouble,
}

/// # Safety
/// `doc` must be a live document handle; `field` and `value` NUL-terminated
/// strings.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_set_string(
    doc: *mut QuiverDoc,
    field: *const c_char,
    value: *const c_char,
) -> QuiverStatus {
    set_field(doc, field, || Ok(Value::String(arg_str(value, "value")?.to_string())))
}

/// # Safety
/// `data` must point to `len` NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_set_array_string(
    doc: *mut QuiverDoc,
    field: *const c_char,
    data: *const *const c_char,
    len: usize,
) -> QuiverStatus {
    set_field(doc, field, || {
        let items = arg_slice(data, len, "data")?
            .iter()
            .map(|s| arg_str(*s, "array element").map(str::to_string))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::ArrayString(items))
    })
}

/// Set a sparse vector from parallel index and value arrays. The counts
/// must match.
///
/// # Safety
/// `indices` and `values` must point to the given number of elements.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_set_sparse_vector_fp32(
    doc: *mut QuiverDoc,
    field: *const c_char,
    indices: *const u32,
    indices_count: usize,
    values: *const f32,
    values_count: usize,
) -> QuiverStatus {
    set_field(doc, field, || {
        let indices = arg_slice(indices, indices_count, "indices")?;
        let values = arg_slice(values, values_count, "values")?;
        Ok(Value::SparseFp32(SparseVector::new(indices.to_vec(), values.to_vec())?))
    })
}

/// Mark a field present but null.
///
/// # Safety
/// `doc` must be a live document handle; `field` a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_set_null(doc: *mut QuiverDoc, field: *const c_char) -> QuiverStatus {
    set_field(doc, field, || Ok(Value::Null))
}

/// Remove a field entirely. Returns whether it existed.
///
/// # Safety
/// `doc` must be null or a live document handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_remove(doc: *mut QuiverDoc, field: *const c_char) -> bool {
    guard_or(false, || {
        let (Ok(doc), Ok(field)) = (arg_mut(doc, "doc"), arg_str(field, "field")) else {
            return false;
        };
        if !doc.doc().has(field) {
            return false;
        }
        doc.doc_mut().remove(field).is_some()
    })
}

// ----------------------------------------------------------------------
// Getters
// ----------------------------------------------------------------------

// Runs `f` with the stored value of `field` (null included) or returns
// `fallback` for a null handle, bad field name, or absent field.
unsafe fn with_value<R>(
    doc: *const QuiverDoc,
    field: *const c_char,
    fallback: R,
    f: impl FnOnce(&QuiverDoc, &str, &Value) -> R,
) -> R {
    let (Ok(doc), Ok(field)) = (arg_ref(doc, "doc"), arg_str(field, "field")) else {
        return fallback;
    };
    match doc.doc().value(field) {
        Some(value) => f(doc, field, value),
        None => fallback,
    }
}

unsafe fn get_scalar<T>(doc: *const QuiverDoc, field: *const c_char, out: *mut T) -> bool
where
    T: for<'a> FromValue<'a>,
{
    if out.is_null() {
        return false;
    }
    guard_or(false, || {
        with_value(doc, field, false, |_, _, value| match T::from_value(value) {
            Some(v) => {
                out.write(v);
                true
            }
            None => false,
        })
    })
}

unsafe fn copy_out<T: Copy>(src: &[T], out: *mut T, capacity: usize) -> usize {
    if !out.is_null() {
        let n = src.len().min(capacity);
        ptr::copy_nonoverlapping(src.as_ptr(), out, n);
    }
    src.len()
}

macro_rules! scalar_getters {
    ($($name:ident: $ty:ty),* $(,)?) => {$(
        /// Read a scalar field. Returns `false` when the field is absent,
        /// null, or holds another type; `out` is untouched then.
        ///
        /// # Safety
        /// `doc` must be a live document handle; `out` valid for writes.
        #[no_mangle]
        pub unsafe extern "C" fn $name(
            doc: *const QuiverDoc,
            field: *const c_char,
            out: *mut $ty,
        ) -> bool {
            get_scalar::<$ty>(doc, field, out)
        }
    )*};
}

scalar_getters! {
    quiver_doc_get_bool: bool,
    quiver_doc_get_int32: i32,
    quiver_doc_get_int64: i64,
    quiver_doc_get_uint32: u32,
    quiver_doc_get_uint64: u64,
    quiver_doc_get_float: f32,
    quiver_doc_get_double: f64,
}

macro_rules! slice_getters {
    ($($name:ident: $ty:ty => $accessor:ident),* $(,)?) => {$(
        /// Copy up to `capacity` elements into `out` and return the true
        /// element count (0 when absent or of another type). A null `out`
        /// queries the size.
        ///
        /// # Safety
        /// `doc` must be a live document handle; a non-null `out` must be
        /// valid for `capacity` writes.
        #[no_mangle]
        pub unsafe extern "C" fn $name(
            doc: *const QuiverDoc,
            field: *const c_char,
            out: *mut $ty,
            capacity: usize,
        ) -> usize {
            guard_or(0, || {
                with_value(doc, field, 0, |_, _, value| match value.$accessor() {
                    Some(items) => copy_out(items, out, capacity),
                    None => 0,
                })
            })
        }
    )*};
}

slice_getters! {
    quiver_doc_get_vector_fp32: f32 => as_vector_fp32,
    quiver_doc_get_vector_fp64: f64 => as_vector_fp64,
    quiver_doc_get_vector_int8: i8 => as_vector_int8,
    quiver_doc_get_vector_int16: i16 => as_vector_int16,
    quiver_doc_get_vector_int32: i32 => as_vector_int32,
    quiver_doc_get_vector_int64: i64 => as_vector_int64,
    quiver_doc_get_array_int32: i32 => as_array_int32,
    quiver_doc_get_array_int64: i64 => as_array_int64,
    quiver_doc_get_array_float: f32 => as_array_float,
    quiver_doc_get_array_double: f64 => as_array_double,
}

/// Read a string field. The pointer stays valid until the document is
/// mutated or released.
///
/// # Safety
/// `doc` must be a live document handle; `out` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_get_string(
    doc: *const QuiverDoc,
    field: *const c_char,
    out: *mut *const c_char,
) -> bool {
    if out.is_null() {
        return false;
    }
    guard_or(false, || {
        with_value(doc, field, false, |doc, name, value| match value.as_str() {
            Some(s) => {
                out.write(doc.string_ptr(name, s));
                true
            }
            None => false,
        })
    })
}

/// Read a string array field as an owned array, released with
/// `quiver_string_array_free`.
///
/// # Safety
/// `doc` must be a live document handle; `out` valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_get_array_string(
    doc: *const QuiverDoc,
    field: *const c_char,
    out: *mut QuiverStringArray,
) -> bool {
    if out.is_null() {
        return false;
    }
    guard_or(false, || {
        with_value(doc, field, false, |_, _, value| match value.as_array_string() {
            Some(items) => {
                out.write(QuiverStringArray::from_strings(items));
                true
            }
            None => false,
        })
    })
}

/// Copy up to `capacity` index/value pairs and return the true pair count.
///
/// # Safety
/// Non-null `out_indices` and `out_values` must each be valid for
/// `capacity` writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_get_sparse_vector_fp32(
    doc: *const QuiverDoc,
    field: *const c_char,
    out_indices: *mut u32,
    out_values: *mut f32,
    capacity: usize,
) -> usize {
    guard_or(0, || {
        with_value(doc, field, 0, |_, _, value| match value.as_sparse() {
            Some(sparse) => {
                copy_out(sparse.indices(), out_indices, capacity);
                copy_out(sparse.values(), out_values, capacity)
            }
            None => 0,
        })
    })
}

/// Wire tag of the value stored in `field`; `UNDEFINED` (0) when absent or
/// null.
///
/// # Safety
/// `doc` must be null or a live document handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_get_field_type(doc: *const QuiverDoc, field: *const c_char) -> u32 {
    with_value(doc, field, DataType::Undefined.as_u32(), |_, _, value| {
        value.data_type().as_u32()
    })
}

// ----------------------------------------------------------------------
// Predicates and introspection
// ----------------------------------------------------------------------

unsafe fn predicate(doc: *const QuiverDoc, field: *const c_char, f: impl Fn(&Doc, &str) -> bool) -> bool {
    match (arg_ref(doc, "doc"), arg_str(field, "field")) {
        (Ok(doc), Ok(field)) => f(doc.doc(), field),
        _ => false,
    }
}

/// Field entry exists, null included.
///
/// # Safety
/// `doc` must be null or a live document handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_has(doc: *const QuiverDoc, field: *const c_char) -> bool {
    predicate(doc, field, Doc::has)
}

/// # Safety
/// `doc` must be null or a live document handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_has_value(doc: *const QuiverDoc, field: *const c_char) -> bool {
    predicate(doc, field, Doc::has_value)
}

/// # Safety
/// `doc` must be null or a live document handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_is_null(doc: *const QuiverDoc, field: *const c_char) -> bool {
    predicate(doc, field, Doc::is_null)
}

/// # Safety
/// `doc` must be null or a live document handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_field_names(doc: *const QuiverDoc) -> QuiverStringArray {
    guard_or(QuiverStringArray::empty(), || match doc.as_ref() {
        Some(doc) => QuiverStringArray::from_strings(&doc.doc().field_names()),
        None => QuiverStringArray::empty(),
    })
}

/// # Safety
/// `doc` must be null or a live document handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_field_count(doc: *const QuiverDoc) -> usize {
    doc.as_ref().map_or(0, |d| d.doc().field_count())
}

/// JSON rendering of the document, released with `quiver_string_free`.
///
/// # Safety
/// `doc` must be null or a live document handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_to_json(doc: *const QuiverDoc) -> *mut c_char {
    guard_or(ptr::null_mut(), || match doc.as_ref() {
        Some(doc) => match serde_json::to_string(&doc.doc().to_json()) {
            Ok(json) => into_raw_string(&json),
            Err(_) => ptr::null_mut(),
        },
        None => ptr::null_mut(),
    })
}

// ----------------------------------------------------------------------
// Result containers
// ----------------------------------------------------------------------

/// Query results. Each element is a separate handle; release them through
/// the list or one by one, never both.
#[repr(C)]
#[derive(Debug)]
pub struct QuiverDocList {
    pub docs: *mut *mut QuiverDoc,
    pub count: usize,
}

impl QuiverDocList {
    pub(crate) fn from_docs(docs: Vec<QuiverDoc>) -> Self {
        let raw: Vec<*mut QuiverDoc> = docs.into_iter().map(QuiverDoc::into_raw).collect();
        let (docs, count) = into_raw_parts(raw);
        Self { docs, count }
    }

    /// # Safety
    /// The list must be live.
    pub unsafe fn as_slice(&self) -> &[*mut QuiverDoc] {
        if self.docs.is_null() {
            return &[];
        }
        std::slice::from_raw_parts(self.docs, self.count)
    }

    unsafe fn release(&mut self) {
        for doc in from_raw_parts(self.docs, self.count) {
            quiver_doc_free(doc);
        }
        self.docs = ptr::null_mut();
        self.count = 0;
    }
}

/// # Safety
/// `list` must be null, zeroed, or a live list from this library.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_list_free(list: *mut QuiverDocList) {
    if let Some(list) = list.as_mut() {
        list.release();
    }
}

/// One status per input row, in input order.
#[repr(C)]
#[derive(Debug)]
pub struct QuiverWriteResults {
    pub statuses: *mut QuiverStatus,
    pub count: usize,
}

impl QuiverWriteResults {
    pub(crate) fn from_results(results: Vec<Result<()>>) -> Self {
        let statuses: Vec<QuiverStatus> = results.into_iter().map(QuiverStatus::from_result).collect();
        let (statuses, count) = into_raw_parts(statuses);
        Self { statuses, count }
    }

    /// # Safety
    /// The results must be live.
    pub unsafe fn as_slice(&self) -> &[QuiverStatus] {
        if self.statuses.is_null() {
            return &[];
        }
        std::slice::from_raw_parts(self.statuses, self.count)
    }
}

/// # Safety
/// `results` must be null, zeroed, or live results from this library.
#[no_mangle]
pub unsafe extern "C" fn quiver_write_results_free(results: *mut QuiverWriteResults) {
    let Some(results) = results.as_mut() else {
        return;
    };
    for mut status in from_raw_parts(results.statuses, results.count) {
        status.release();
    }
    results.statuses = ptr::null_mut();
    results.count = 0;
}

/// Fetch results: parallel `keys` and owned `docs`.
#[repr(C)]
#[derive(Debug)]
pub struct QuiverDocMap {
    pub keys: *mut *mut c_char,
    pub docs: *mut *mut QuiverDoc,
    pub count: usize,
}

impl QuiverDocMap {
    pub(crate) fn from_entries(entries: Vec<(String, Doc)>) -> Self {
        let (keys, docs): (Vec<*mut c_char>, Vec<*mut QuiverDoc>) = entries
            .into_iter()
            .map(|(k, d)| (into_raw_string(&k), QuiverDoc::owned(d).into_raw()))
            .unzip();
        let (keys, count) = into_raw_parts(keys);
        let (docs, _) = into_raw_parts(docs);
        Self { keys, docs, count }
    }

    /// # Safety
    /// The map must be live.
    pub unsafe fn entries(&self) -> Vec<(String, *mut QuiverDoc)> {
        if self.count == 0 {
            return Vec::new();
        }
        let keys = std::slice::from_raw_parts(self.keys, self.count);
        let docs = std::slice::from_raw_parts(self.docs, self.count);
        keys.iter()
            .zip(docs)
            .map(|(k, d)| (CStr::from_ptr(*k).to_string_lossy().into_owned(), *d))
            .collect()
    }
}

/// # Safety
/// `map` must be null, zeroed, or a live map from this library.
#[no_mangle]
pub unsafe extern "C" fn quiver_doc_map_free(map: *mut QuiverDocMap) {
    let Some(map) = map.as_mut() else {
        return;
    };
    for key in from_raw_parts(map.keys, map.count) {
        if !key.is_null() {
            drop(CString::from_raw(key));
        }
    }
    for doc in from_raw_parts(map.docs, map.count) {
        quiver_doc_free(doc);
    }
    map.keys = ptr::null_mut();
    map.docs = ptr::null_mut();
    map.count = 0;
}
