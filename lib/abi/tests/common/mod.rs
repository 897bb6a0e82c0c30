#![allow(dead_code)]

use quiver_abi::collection::*;
use quiver_abi::doc::*;
use quiver_abi::params::*;
use quiver_abi::schema::*;
use quiver_abi::status::*;
use quiver_abi::{QuiverCollection, QuiverCollectionSchema, QuiverDoc, QuiverStatus};
use quiver_core::{DataType, MetricType, QuantizeType, StatusCode};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;

pub fn cstr(s: &str) -> CString {
    CString::new(s).unwrap()
}

pub unsafe fn read_str(ptr: *const c_char) -> String {
    assert!(!ptr.is_null());
    CStr::from_ptr(ptr).to_str().unwrap().to_string()
}

/// Take the code out of a status and release it.
pub fn code(mut status: QuiverStatus) -> StatusCode {
    let code = status.status_code();
    unsafe { quiver_status_free(&mut status) };
    code
}

pub fn assert_ok(status: QuiverStatus) {
    let message = unsafe { status.message_str().map(str::to_string) };
    assert_eq!(code(status), StatusCode::Ok, "{:?}", message);
}

/// `articles`: emb VECTOR_FP32(3) with an L2 HNSW index, category STRING,
/// views INT64 nullable.
pub unsafe fn articles_schema() -> *mut QuiverCollectionSchema {
    let schema = quiver_collection_schema_new(cstr("articles").as_ptr());

    let emb = quiver_field_schema_new_with_dimension(cstr("emb").as_ptr(), DataType::VectorFp32.as_u32(), 3);
    let hnsw = quiver_index_params_new_hnsw(16, 100, MetricType::L2.as_u32(), QuantizeType::Undefined.as_u32());
    quiver_field_schema_set_index_params(emb, hnsw);
    quiver_index_params_free(hnsw);
    assert_ok(quiver_collection_schema_add_field(schema, emb));
    quiver_field_schema_free(emb);

    let category = quiver_field_schema_new(cstr("category").as_ptr(), DataType::String.as_u32());
    assert_ok(quiver_collection_schema_add_field(schema, category));
    quiver_field_schema_free(category);

    let views = quiver_field_schema_new(cstr("views").as_ptr(), DataType::Int64.as_u32());
    quiver_field_schema_set_nullable(views, true);
    assert_ok(quiver_collection_schema_add_field(schema, views));
    quiver_field_schema_free(views);

    schema
}

pub unsafe fn article(pk: &str, emb: [f32; 3], category: &str) -> *mut QuiverDoc {
    let doc = quiver_doc_new();
    assert_ok(quiver_doc_set_pk(doc, cstr(pk).as_ptr()));
    assert_ok(quiver_doc_set_vector_fp32(doc, cstr("emb").as_ptr(), emb.as_ptr(), emb.len()));
    assert_ok(quiver_doc_set_string(doc, cstr("category").as_ptr(), cstr(category).as_ptr()));
    doc
}

pub unsafe fn create(path: &Path) -> *mut QuiverCollection {
    let schema = articles_schema();
    let mut status = QuiverStatus::ok();
    let path = cstr(path.to_str().unwrap());
    let collection = quiver_collection_create_and_open(path.as_ptr(), schema, ptr::null(), &mut status);
    quiver_collection_schema_free(schema);
    assert_ok(status);
    assert!(!collection.is_null());
    collection
}

/// Insert the docs and release them; returns the per-row codes.
pub unsafe fn insert(collection: *mut QuiverCollection, docs: Vec<*mut QuiverDoc>) -> Vec<StatusCode> {
    let ptrs: Vec<*const QuiverDoc> = docs.iter().map(|d| *d as *const QuiverDoc).collect();
    let mut results = QuiverWriteResults {
        statuses: ptr::null_mut(),
        count: 0,
    };
    assert_ok(quiver_collection_insert(collection, ptrs.as_ptr(), ptrs.len(), &mut results));
    let codes = results.as_slice().iter().map(|s| s.status_code()).collect();
    quiver_write_results_free(&mut results);
    for doc in docs {
        quiver_doc_free(doc);
    }
    codes
}

/// Collection with articles a..e along the first axis.
pub unsafe fn seeded(path: &Path) -> *mut QuiverCollection {
    let collection = create(path);
    let codes = insert(
        collection,
        vec![
            article("a", [0.0, 0.0, 0.0], "x"),
            article("b", [1.0, 0.0, 0.0], "x"),
            article("c", [2.0, 0.0, 0.0], "y"),
            article("d", [3.0, 0.0, 0.0], "y"),
            article("e", [4.0, 0.0, 0.0], "z"),
        ],
    );
    assert!(codes.iter().all(|c| *c == StatusCode::Ok));
    collection
}
