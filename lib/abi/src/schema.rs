use crate::array::QuiverStringArray;
use crate::handle::{arg_mut, arg_ref, arg_str, c_string, guard, guard_or};
use crate::params::QuiverIndexParams;
use crate::status::QuiverStatus;
use quiver_core::{CollectionSchema, DataType, FieldSchema, IndexType};
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Field declaration handle. Always exclusively owned.
pub struct QuiverFieldSchema {
    inner: FieldSchema,
    name: CString,
}

impl QuiverFieldSchema {
    pub(crate) fn new(inner: FieldSchema) -> Self {
        let name = c_string(&inner.name);
        Self { inner, name }
    }

    pub fn field(&self) -> &FieldSchema {
        &self.inner
    }

    fn into_raw(self) -> *mut QuiverFieldSchema {
        Box::into_raw(Box::new(self))
    }
}

/// Collection schema handle. Always exclusively owned; collection accessors
/// return copies.
pub struct QuiverCollectionSchema {
    inner: CollectionSchema,
    name: CString,
}

impl QuiverCollectionSchema {
    pub(crate) fn new(inner: CollectionSchema) -> Self {
        let name = c_string(inner.name());
        Self { inner, name }
    }

    pub fn schema(&self) -> &CollectionSchema {
        &self.inner
    }

    pub(crate) fn into_raw(self) -> *mut QuiverCollectionSchema {
        Box::into_raw(Box::new(self))
    }
}

// ----------------------------------------------------------------------
// Field schema
// ----------------------------------------------------------------------

/// Returns null when `name` is null or not UTF-8. Unknown type tags read as
/// `UNDEFINED` and are rejected when the schema is used.
///
/// # Safety
/// `name` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn quiver_field_schema_new(name: *const c_char, data_type: u32) -> *mut QuiverFieldSchema {
    quiver_field_schema_new_with_dimension(name, data_type, 0)
}

/// # Safety
/// `name` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn quiver_field_schema_new_with_dimension(
    name: *const c_char,
    data_type: u32,
    dimension: u32,
) -> *mut QuiverFieldSchema {
    guard_or(ptr::null_mut(), || match arg_str(name, "name") {
        Ok(name) => {
            let field = FieldSchema::with_dimension(name, DataType::from_u32(data_type), dimension);
            QuiverFieldSchema::new(field).into_raw()
        }
        Err(_) => ptr::null_mut(),
    })
}

/// # Safety
/// `schema` must be null or a handle from this library released once.
#[no_mangle]
pub unsafe extern "C" fn quiver_field_schema_free(schema: *mut QuiverFieldSchema) {
    if !schema.is_null() {
        drop(Box::from_raw(schema));
    }
}

/// # Safety
/// `schema` must be null or a live field schema handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_field_schema_set_nullable(schema: *mut QuiverFieldSchema, nullable: bool) {
    if let Some(schema) = schema.as_mut() {
        schema.inner.nullable = nullable;
    }
}

/// # Safety
/// `schema` must be null or a live field schema handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_field_schema_set_dimension(schema: *mut QuiverFieldSchema, dimension: u32) {
    if let Some(schema) = schema.as_mut() {
        schema.inner.dimension = dimension;
    }
}

/// Attach a copy of `params`; null detaches any index.
///
/// # Safety
/// `schema` must be null or a live field schema handle; `params` null or a
/// live index params handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_field_schema_set_index_params(
    schema: *mut QuiverFieldSchema,
    params: *const QuiverIndexParams,
) {
    if let Some(schema) = schema.as_mut() {
        schema.inner.index_params = params.as_ref().map(|p| p.params().clone());
    }
}

/// Name owned by the handle.
///
/// # Safety
/// `schema` must be null or a live field schema handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_field_schema_name(schema: *const QuiverFieldSchema) -> *const c_char {
    schema.as_ref().map_or(ptr::null(), |s| s.name.as_ptr())
}

/// # Safety
/// `schema` must be null or a live field schema handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_field_schema_data_type(schema: *const QuiverFieldSchema) -> u32 {
    schema
        .as_ref()
        .map_or(DataType::Undefined.as_u32(), |s| s.inner.data_type.as_u32())
}

/// # Safety
/// `schema` must be null or a live field schema handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_field_schema_nullable(schema: *const QuiverFieldSchema) -> bool {
    schema.as_ref().map_or(false, |s| s.inner.nullable)
}

/// # Safety
/// `schema` must be null or a live field schema handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_field_schema_dimension(schema: *const QuiverFieldSchema) -> u32 {
    schema.as_ref().map_or(0, |s| s.inner.dimension)
}

/// Type of the attached index, `UNDEFINED` when there is none.
///
/// # Safety
/// `schema` must be null or a live field schema handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_field_schema_index_type(schema: *const QuiverFieldSchema) -> u32 {
    schema
        .as_ref()
        .and_then(|s| s.inner.index_params.as_ref())
        .map_or(IndexType::Undefined.as_u32(), |p| p.index_type().as_u32())
}

// ----------------------------------------------------------------------
// Collection schema
// ----------------------------------------------------------------------

/// # Safety
/// `name` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_schema_new(name: *const c_char) -> *mut QuiverCollectionSchema {
    guard_or(ptr::null_mut(), || match arg_str(name, "name") {
        Ok(name) => QuiverCollectionSchema::new(CollectionSchema::new(name)).into_raw(),
        Err(_) => ptr::null_mut(),
    })
}

/// # Safety
/// `schema` must be null or a handle from this library released once.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_schema_free(schema: *mut QuiverCollectionSchema) {
    if !schema.is_null() {
        drop(Box::from_raw(schema));
    }
}

/// Append a copy of `field`. The caller keeps ownership of `field`.
///
/// # Safety
/// Both handles must be live.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_schema_add_field(
    schema: *mut QuiverCollectionSchema,
    field: *const QuiverFieldSchema,
) -> QuiverStatus {
    guard(|| {
        let schema = arg_mut(schema, "schema")?;
        let field = arg_ref(field, "field")?;
        schema.inner.add_field(field.inner.clone())
    })
}

/// Attach a copy of `params` to an existing column.
///
/// # Safety
/// Both handles must be live; `column` a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_schema_add_index(
    schema: *mut QuiverCollectionSchema,
    column: *const c_char,
    params: *const QuiverIndexParams,
) -> QuiverStatus {
    guard(|| {
        let schema = arg_mut(schema, "schema")?;
        let column = arg_str(column, "column")?;
        let params = arg_ref(params, "index params")?;
        schema.inner.add_index(column, params.params().clone())
    })
}

/// # Safety
/// `schema` must be null or a live collection schema handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_schema_name(schema: *const QuiverCollectionSchema) -> *const c_char {
    schema.as_ref().map_or(ptr::null(), |s| s.name.as_ptr())
}

/// All field names in declaration order.
///
/// # Safety
/// `schema` must be null or a live collection schema handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_schema_field_names(
    schema: *const QuiverCollectionSchema,
) -> QuiverStringArray {
    match schema.as_ref() {
        Some(s) => QuiverStringArray::from_strings(&s.inner.field_names()),
        None => QuiverStringArray::empty(),
    }
}

/// Dense and sparse vector field names in declaration order.
///
/// # Safety
/// `schema` must be null or a live collection schema handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_schema_vector_field_names(
    schema: *const QuiverCollectionSchema,
) -> QuiverStringArray {
    match schema.as_ref() {
        Some(s) => QuiverStringArray::from_strings(&s.inner.vector_field_names()),
        None => QuiverStringArray::empty(),
    }
}

/// # Safety
/// `schema` must be null or a live collection schema handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_schema_has_field(
    schema: *const QuiverCollectionSchema,
    name: *const c_char,
) -> bool {
    match (schema.as_ref(), arg_str(name, "name")) {
        (Some(s), Ok(name)) => s.inner.has_field(name),
        _ => false,
    }
}

/// Owned copy of one field declaration, or null when absent.
///
/// # Safety
/// `schema` must be null or a live collection schema handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_schema_field(
    schema: *const QuiverCollectionSchema,
    name: *const c_char,
) -> *mut QuiverFieldSchema {
    guard_or(ptr::null_mut(), || match (schema.as_ref(), arg_str(name, "name")) {
        (Some(s), Ok(name)) => s
            .inner
            .field(name)
            .map_or(ptr::null_mut(), |f| QuiverFieldSchema::new(f.clone()).into_raw()),
        _ => ptr::null_mut(),
    })
}

/// # Safety
/// `schema` must be null or a live collection schema handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_schema_field_count(schema: *const QuiverCollectionSchema) -> usize {
    schema.as_ref().map_or(0, |s| s.inner.fields().len())
}
