// Document, schema and status behaviour through the C surface.
mod common;

use common::*;
use quiver_abi::array::*;
use quiver_abi::doc::*;
use quiver_abi::params::*;
use quiver_abi::schema::*;
use quiver_abi::status::*;
use quiver_abi::QuiverStringArray;
use quiver_core::{DataType, IndexType, MetricType, StatusCode};
use std::ptr;

#[test]
fn test_status_ok_allocates_nothing() {
    let mut status = quiver_status_ok();
    assert!(status.message.is_null());
    unsafe {
        assert!(quiver_status_is_ok(&status));
        quiver_status_free(&mut status);
        quiver_status_free(&mut status);
        assert!(!quiver_status_is_ok(ptr::null()));
    }
}

#[test]
fn test_scalar_round_trip() {
    unsafe {
        let doc = quiver_doc_new();
        let f = |name: &str| cstr(name);
        assert_ok(quiver_doc_set_pk(doc, cstr("k1").as_ptr()));
        assert_ok(quiver_doc_set_bool(doc, f("flag").as_ptr(), true));
        assert_ok(quiver_doc_set_int32(doc, f("i32").as_ptr(), -7));
        assert_ok(quiver_doc_set_uint64(doc, f("u64").as_ptr(), u64::MAX));
        assert_ok(quiver_doc_set_double(doc, f("d").as_ptr(), 2.5));
        assert_ok(quiver_doc_set_string(doc, f("title").as_ptr(), cstr("hello").as_ptr()));

        assert_eq!(read_str(quiver_doc_pk(doc)), "k1");
        let mut flag = false;
        assert!(quiver_doc_get_bool(doc, f("flag").as_ptr(), &mut flag));
        assert!(flag);
        let mut i = 0i32;
        assert!(quiver_doc_get_int32(doc, f("i32").as_ptr(), &mut i));
        assert_eq!(i, -7);
        let mut u = 0u64;
        assert!(quiver_doc_get_uint64(doc, f("u64").as_ptr(), &mut u));
        assert_eq!(u, u64::MAX);
        let mut d = 0f64;
        assert!(quiver_doc_get_double(doc, f("d").as_ptr(), &mut d));
        assert_eq!(d, 2.5);

        let mut title = ptr::null();
        assert!(quiver_doc_get_string(doc, f("title").as_ptr(), &mut title));
        assert_eq!(read_str(title), "hello");

        // Wrong type leaves the out value alone.
        let mut untouched = 42i32;
        assert!(!quiver_doc_get_int32(doc, f("title").as_ptr(), &mut untouched));
        assert_eq!(untouched, 42);
        assert!(!quiver_doc_get_int32(doc, f("missing").as_ptr(), &mut untouched));

        assert_eq!(quiver_doc_get_field_type(doc, f("title").as_ptr()), DataType::String.as_u32());
        assert_eq!(quiver_doc_get_field_type(doc, f("u64").as_ptr()), DataType::UInt64.as_u32());
        assert_eq!(quiver_doc_field_count(doc), 5);
        quiver_doc_free(doc);
    }
}

#[test]
fn test_null_predicates() {
    unsafe {
        let doc = quiver_doc_new();
        let views = cstr("views");
        let other = cstr("other");
        assert_ok(quiver_doc_set_null(doc, views.as_ptr()));
        assert!(quiver_doc_has(doc, views.as_ptr()));
        assert!(!quiver_doc_has_value(doc, views.as_ptr()));
        assert!(quiver_doc_is_null(doc, views.as_ptr()));
        assert_eq!(quiver_doc_get_field_type(doc, views.as_ptr()), DataType::Undefined.as_u32());

        assert!(!quiver_doc_has(doc, other.as_ptr()));
        assert!(!quiver_doc_is_null(doc, other.as_ptr()));

        assert!(quiver_doc_remove(doc, views.as_ptr()));
        assert!(!quiver_doc_remove(doc, views.as_ptr()));
        assert!(!quiver_doc_has(doc, views.as_ptr()));
        quiver_doc_free(doc);
    }
}

#[test]
fn test_vector_getter_reports_full_length() {
    unsafe {
        let doc = quiver_doc_new();
        let emb = cstr("emb");
        let data = [1.0f32, 2.0, 3.0, 4.0];
        assert_ok(quiver_doc_set_vector_fp32(doc, emb.as_ptr(), data.as_ptr(), data.len()));

        assert_eq!(quiver_doc_get_vector_fp32(doc, emb.as_ptr(), ptr::null_mut(), 0), 4);
        let mut out = [0.0f32; 2];
        assert_eq!(quiver_doc_get_vector_fp32(doc, emb.as_ptr(), out.as_mut_ptr(), out.len()), 4);
        assert_eq!(out, [1.0, 2.0]);

        let mut wrong = [0.0f64; 4];
        assert_eq!(quiver_doc_get_vector_fp64(doc, emb.as_ptr(), wrong.as_mut_ptr(), 4), 0);
        quiver_doc_free(doc);
    }
}

#[test]
fn test_sparse_and_string_arrays() {
    unsafe {
        let doc = quiver_doc_new();
        let sp = cstr("sp");
        let indices = [3u32, 9];
        let values = [0.5f32, 1.5];
        assert_ok(quiver_doc_set_sparse_vector_fp32(doc, sp.as_ptr(), indices.as_ptr(), 2, values.as_ptr(), 2));
        let status = quiver_doc_set_sparse_vector_fp32(doc, sp.as_ptr(), indices.as_ptr(), 2, values.as_ptr(), 1);
        assert_eq!(code(status), StatusCode::InvalidArgument);

        let mut out_i = [0u32; 2];
        let mut out_v = [0f32; 2];
        assert_eq!(quiver_doc_get_sparse_vector_fp32(doc, sp.as_ptr(), out_i.as_mut_ptr(), out_v.as_mut_ptr(), 2), 2);
        assert_eq!(out_i, indices);
        assert_eq!(out_v, values);

        let tags = cstr("tags");
        let items = [cstr("red"), cstr("blue")];
        let ptrs: Vec<_> = items.iter().map(|s| s.as_ptr()).collect();
        assert_ok(quiver_doc_set_array_string(doc, tags.as_ptr(), ptrs.as_ptr(), ptrs.len()));
        let mut array = QuiverStringArray::empty();
        assert!(quiver_doc_get_array_string(doc, tags.as_ptr(), &mut array));
        assert_eq!(array.to_vec(), vec!["red", "blue"]);
        quiver_string_array_free(&mut array);
        assert!(array.strings.is_null());
        assert_eq!(array.count, 0);
        quiver_string_array_free(&mut array);
        quiver_doc_free(doc);
    }
}

#[test]
fn test_null_arguments_are_rejected() {
    unsafe {
        let status = quiver_doc_set_pk(ptr::null_mut(), cstr("x").as_ptr());
        assert_eq!(code(status), StatusCode::InvalidArgument);

        let doc = quiver_doc_new();
        let status = quiver_doc_set_string(doc, ptr::null(), cstr("v").as_ptr());
        assert_eq!(code(status), StatusCode::InvalidArgument);
        let status = quiver_doc_set_vector_fp32(doc, cstr("emb").as_ptr(), ptr::null(), 3);
        assert_eq!(code(status), StatusCode::InvalidArgument);
        assert!(quiver_doc_pk(ptr::null()).is_null());
        assert_eq!(quiver_doc_field_count(doc), 0);
        quiver_doc_free(doc);
        quiver_doc_free(ptr::null_mut());
    }
}

#[test]
fn test_clone_and_json() {
    unsafe {
        let doc = article("a", [1.0, 0.0, 0.0], "x");
        let copy = quiver_doc_clone(doc);
        assert!(quiver_doc_is_owned(copy));
        assert_ok(quiver_doc_set_string(copy, cstr("category").as_ptr(), cstr("changed").as_ptr()));

        let mut category = ptr::null();
        assert!(quiver_doc_get_string(doc, cstr("category").as_ptr(), &mut category));
        assert_eq!(read_str(category), "x");

        let json = quiver_doc_to_json(copy);
        let value: serde_json::Value = serde_json::from_str(&read_str(json)).unwrap();
        quiver_string_free(json);
        assert_eq!(value["pk"], "a");
        assert_eq!(value["fields"]["category"], "changed");

        let mut names = quiver_doc_field_names(doc);
        assert_eq!(names.to_vec(), vec!["category", "emb"]);
        quiver_string_array_free(&mut names);
        quiver_doc_free(copy);
        quiver_doc_free(doc);
    }
}

#[test]
fn test_schema_rejects_duplicate_field() {
    unsafe {
        let schema = articles_schema();
        assert_eq!(read_str(quiver_collection_schema_name(schema)), "articles");
        assert_eq!(quiver_collection_schema_field_count(schema), 3);

        let dup = quiver_field_schema_new(cstr("category").as_ptr(), DataType::Int32.as_u32());
        assert_eq!(code(quiver_collection_schema_add_field(schema, dup)), StatusCode::AlreadyExists);
        quiver_field_schema_free(dup);
        assert_eq!(quiver_collection_schema_field_count(schema), 3);

        let mut vectors = quiver_collection_schema_vector_field_names(schema);
        assert_eq!(vectors.to_vec(), vec!["emb"]);
        quiver_string_array_free(&mut vectors);

        let emb = quiver_collection_schema_field(schema, cstr("emb").as_ptr());
        assert!(!emb.is_null());
        assert_eq!(quiver_field_schema_dimension(emb), 3);
        assert_eq!(quiver_field_schema_index_type(emb), IndexType::Hnsw.as_u32());
        quiver_field_schema_free(emb);

        assert!(quiver_collection_schema_field(schema, cstr("nope").as_ptr()).is_null());
        assert!(!quiver_collection_schema_has_field(schema, cstr("nope").as_ptr()));

        let flat = quiver_index_params_new_flat(MetricType::Cosine.as_u32(), 0);
        let status = quiver_collection_schema_add_index(schema, cstr("nope").as_ptr(), flat);
        assert_eq!(code(status), StatusCode::NotFound);
        quiver_index_params_free(flat);
        quiver_collection_schema_free(schema);
    }
}

#[test]
fn test_narrow_scalars_round_trip() {
    unsafe {
        let doc = quiver_doc_new();
        let count = cstr("count");
        let ratio = cstr("ratio");
        assert_ok(quiver_doc_set_uint32(doc, count.as_ptr(), u32::MAX));
        assert_ok(quiver_doc_set_float(doc, ratio.as_ptr(), -0.125));

        let mut u = 0u32;
        assert!(quiver_doc_get_uint32(doc, count.as_ptr(), &mut u));
        assert_eq!(u, u32::MAX);
        let mut f = 0f32;
        assert!(quiver_doc_get_float(doc, ratio.as_ptr(), &mut f));
        assert_eq!(f, -0.125);

        assert_eq!(quiver_doc_get_field_type(doc, count.as_ptr()), DataType::UInt32.as_u32());
        assert_eq!(quiver_doc_get_field_type(doc, ratio.as_ptr()), DataType::Float.as_u32());
        // uint32 is not readable as uint64 and float is not readable as double.
        let mut wide = 0u64;
        assert!(!quiver_doc_get_uint64(doc, count.as_ptr(), &mut wide));
        let mut double = 0f64;
        assert!(!quiver_doc_get_double(doc, ratio.as_ptr(), &mut double));
        quiver_doc_free(doc);
    }
}

macro_rules! slice_round_trip {
    ($doc:expr, $field:expr, $set:ident, $get:ident, $data:expr, $ty:ty, $data_type:expr) => {{
        let field = cstr($field);
        let data: Vec<$ty> = $data;
        assert_ok($set($doc, field.as_ptr(), data.as_ptr(), data.len()));
        assert_eq!($get($doc, field.as_ptr(), ptr::null_mut(), 0), data.len());
        let mut out: Vec<$ty> = vec![Default::default(); data.len()];
        assert_eq!($get($doc, field.as_ptr(), out.as_mut_ptr(), out.len()), data.len());
        assert_eq!(out, data);
        assert_eq!(quiver_doc_get_field_type($doc, field.as_ptr()), $data_type.as_u32());
    }};
}

#[test]
fn test_vectors_and_arrays_round_trip() {
    unsafe {
        let doc = quiver_doc_new();
        slice_round_trip!(doc, "fp64", quiver_doc_set_vector_fp64, quiver_doc_get_vector_fp64,
            vec![1.5, -2.25, 1e300], f64, DataType::VectorFp64);
        slice_round_trip!(doc, "i8", quiver_doc_set_vector_int8, quiver_doc_get_vector_int8,
            vec![i8::MIN, 0, 7, i8::MAX], i8, DataType::VectorInt8);
        slice_round_trip!(doc, "i16", quiver_doc_set_vector_int16, quiver_doc_get_vector_int16,
            vec![i16::MIN, -1, i16::MAX], i16, DataType::VectorInt16);
        slice_round_trip!(doc, "bits32", quiver_doc_set_vector_int32, quiver_doc_get_vector_int32,
            vec![0b1011, -1], i32, DataType::VectorBinary32);
        slice_round_trip!(doc, "bits64", quiver_doc_set_vector_int64, quiver_doc_get_vector_int64,
            vec![i64::MIN, 3], i64, DataType::VectorBinary64);
        slice_round_trip!(doc, "tags", quiver_doc_set_array_int32, quiver_doc_get_array_int32,
            vec![4, 5, 6], i32, DataType::ArrayInt32);
        slice_round_trip!(doc, "ids", quiver_doc_set_array_int64, quiver_doc_get_array_int64,
            vec![i64::MAX], i64, DataType::ArrayInt64);
        slice_round_trip!(doc, "weights", quiver_doc_set_array_float, quiver_doc_get_array_float,
            vec![0.5, 0.25], f32, DataType::ArrayFloat);
        slice_round_trip!(doc, "prices", quiver_doc_set_array_double, quiver_doc_get_array_double,
            vec![9.99, 0.01, 100.0], f64, DataType::ArrayDouble);
        assert_eq!(quiver_doc_field_count(doc), 9);

        // Arrays and vectors of the same element type stay distinct.
        let tags = cstr("tags");
        assert_eq!(quiver_doc_get_vector_int32(doc, tags.as_ptr(), ptr::null_mut(), 0), 0);
        let empty: Vec<i32> = Vec::new();
        assert_ok(quiver_doc_set_array_int32(doc, tags.as_ptr(), empty.as_ptr(), 0));
        assert_eq!(quiver_doc_get_array_int32(doc, tags.as_ptr(), ptr::null_mut(), 0), 0);
        assert_eq!(quiver_doc_get_field_type(doc, tags.as_ptr()), DataType::ArrayInt32.as_u32());
        quiver_doc_free(doc);
    }
}
