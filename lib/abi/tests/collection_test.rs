// Collection lifecycle, DML, DQL and DDL through the C surface.
mod common;

use common::*;
use quiver_abi::collection::*;
use quiver_abi::doc::*;
use quiver_abi::options::*;
use quiver_abi::params::*;
use quiver_abi::query::*;
use quiver_abi::schema::*;
use quiver_abi::{QuiverCollection, QuiverDoc, QuiverStatus};
use quiver_core::{DataType, Operator, StatusCode};
use std::ffi::CString;
use std::ptr;
use tempfile::TempDir;

fn empty_results() -> QuiverWriteResults {
    QuiverWriteResults {
        statuses: ptr::null_mut(),
        count: 0,
    }
}

unsafe fn query_pks(collection: *const QuiverCollection, query: *const QuiverVectorQuery) -> Vec<String> {
    let mut list = QuiverDocList {
        docs: ptr::null_mut(),
        count: 0,
    };
    assert_ok(quiver_collection_query(collection, query, &mut list));
    let pks = list.as_slice().iter().map(|d| read_str(quiver_doc_pk(*d))).collect();
    quiver_doc_list_free(&mut list);
    pks
}

unsafe fn vector_query(vector: [f32; 3], topk: i32) -> *mut QuiverVectorQuery {
    let query = quiver_vector_query_new(cstr("emb").as_ptr());
    assert_ok(quiver_vector_query_set_vector_fp32(query, vector.as_ptr(), vector.len()));
    quiver_vector_query_set_topk(query, topk);
    query
}

unsafe fn doc_count(collection: *const QuiverCollection) -> u64 {
    let mut stats = ptr::null_mut();
    assert_ok(quiver_collection_stats(collection, &mut stats));
    let count = (*stats).doc_count;
    quiver_collection_stats_free(stats);
    count
}

#[test]
fn test_create_open_and_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("articles");
    unsafe {
        let collection = seeded(&path);

        let mut out_path = ptr::null();
        assert_ok(quiver_collection_path(collection, &mut out_path));
        assert_eq!(read_str(out_path), path.to_str().unwrap());

        let mut schema = ptr::null_mut();
        assert_ok(quiver_collection_schema(collection, &mut schema));
        assert_eq!(read_str(quiver_collection_schema_name(schema)), "articles");
        quiver_collection_schema_free(schema);

        let mut options = ptr::null_mut();
        assert_ok(quiver_collection_options(collection, &mut options));
        assert!(!quiver_collection_options_read_only(options));
        quiver_collection_options_free(options);

        assert_ok(quiver_collection_flush(collection));
        quiver_collection_destroy(collection);

        let c_path = CString::new(path.to_str().unwrap()).unwrap();
        let mut status = QuiverStatus::ok();
        let reopened = quiver_collection_open(c_path.as_ptr(), ptr::null(), &mut status);
        assert_ok(status);
        assert_eq!(doc_count(reopened), 5);
        quiver_collection_destroy(reopened);
    }
}

#[test]
fn test_create_existing_and_open_missing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("articles");
    unsafe {
        let collection = create(&path);
        quiver_collection_destroy(collection);

        let schema = articles_schema();
        let c_path = CString::new(path.to_str().unwrap()).unwrap();
        let mut status = QuiverStatus::ok();
        let again = quiver_collection_create_and_open(c_path.as_ptr(), schema, ptr::null(), &mut status);
        assert!(again.is_null());
        assert_eq!(code(status), StatusCode::AlreadyExists);
        quiver_collection_schema_free(schema);

        let missing = CString::new(dir.path().join("missing").to_str().unwrap()).unwrap();
        let mut status = QuiverStatus::ok();
        let none = quiver_collection_open(missing.as_ptr(), ptr::null(), &mut status);
        assert!(none.is_null());
        assert_eq!(code(status), StatusCode::NotFound);

        // A null status pointer is allowed.
        assert!(quiver_collection_open(missing.as_ptr(), ptr::null(), ptr::null_mut()).is_null());
    }
}

#[test]
fn test_partial_batch_failure() {
    let dir = TempDir::new().unwrap();
    unsafe {
        let collection = create(&dir.path().join("c"));
        let bad = quiver_doc_new();
        assert_ok(quiver_doc_set_pk(bad, cstr("bad").as_ptr()));
        let short = [1.0f32, 2.0];
        assert_ok(quiver_doc_set_vector_fp32(bad, cstr("emb").as_ptr(), short.as_ptr(), 2));
        assert_ok(quiver_doc_set_string(bad, cstr("category").as_ptr(), cstr("x").as_ptr()));

        let good1 = article("g1", [1.0, 1.0, 1.0], "x");
        let good2 = article("g2", [0.0, 1.0, 0.0], "y");
        let docs: Vec<*const QuiverDoc> = vec![good1 as *const QuiverDoc, ptr::null(), bad as *const QuiverDoc, good2 as *const QuiverDoc];
        let mut results = empty_results();
        assert_ok(quiver_collection_insert(collection, docs.as_ptr(), docs.len(), &mut results));

        let codes: Vec<StatusCode> = results.as_slice().iter().map(|s| s.status_code()).collect();
        assert_eq!(
            codes,
            vec![StatusCode::Ok, StatusCode::InvalidArgument, StatusCode::InvalidArgument, StatusCode::Ok]
        );
        assert!(!results.as_slice()[2].message.is_null());
        quiver_write_results_free(&mut results);
        assert!(results.statuses.is_null());
        assert_eq!(doc_count(collection), 2);

        let mut results = empty_results();
        let status = quiver_collection_insert(collection, docs.as_ptr(), 0, &mut results);
        assert_eq!(code(status), StatusCode::InvalidArgument);

        for doc in [good1, bad, good2] {
            quiver_doc_free(doc);
        }
        quiver_collection_destroy(collection);
    }
}

#[test]
fn test_write_operator_tags() {
    let dir = TempDir::new().unwrap();
    unsafe {
        let collection = seeded(&dir.path().join("c"));
        let doc = article("a", [9.0, 9.0, 9.0], "q");
        let docs = [doc as *const QuiverDoc];

        let mut results = empty_results();
        assert_ok(quiver_collection_write(collection, Operator::Insert.as_u32(), docs.as_ptr(), 1, &mut results));
        assert_eq!(results.as_slice()[0].status_code(), StatusCode::AlreadyExists);
        quiver_write_results_free(&mut results);

        assert_ok(quiver_collection_write(collection, Operator::Upsert.as_u32(), docs.as_ptr(), 1, &mut results));
        assert!(results.as_slice()[0].is_ok());
        quiver_write_results_free(&mut results);

        let status = quiver_collection_write(collection, 9, docs.as_ptr(), 1, &mut results);
        assert_eq!(code(status), StatusCode::InvalidArgument);

        assert_ok(quiver_collection_write(collection, Operator::Delete.as_u32(), docs.as_ptr(), 1, &mut results));
        assert!(results.as_slice()[0].is_ok());
        quiver_write_results_free(&mut results);
        assert_eq!(doc_count(collection), 4);

        quiver_doc_free(doc);
        quiver_collection_destroy(collection);
    }
}

#[test]
fn test_update_and_delete() {
    let dir = TempDir::new().unwrap();
    unsafe {
        let collection = seeded(&dir.path().join("c"));
        let patch = quiver_doc_new();
        assert_ok(quiver_doc_set_pk(patch, cstr("b").as_ptr()));
        assert_ok(quiver_doc_set_int64(patch, cstr("views").as_ptr(), 10));
        let docs = [patch as *const QuiverDoc];
        let mut results = empty_results();
        assert_ok(quiver_collection_update(collection, docs.as_ptr(), 1, &mut results));
        assert!(results.as_slice()[0].is_ok());
        quiver_write_results_free(&mut results);
        quiver_doc_free(patch);

        let keys = [cstr("a"), cstr("nope")];
        let mut pks: Vec<*const std::os::raw::c_char> = keys.iter().map(|k| k.as_ptr()).collect();
        pks.push(ptr::null());
        assert_ok(quiver_collection_delete(collection, pks.as_ptr(), pks.len(), &mut results));
        let codes: Vec<StatusCode> = results.as_slice().iter().map(|s| s.status_code()).collect();
        assert_eq!(codes, vec![StatusCode::Ok, StatusCode::NotFound, StatusCode::InvalidArgument]);
        quiver_write_results_free(&mut results);

        assert_ok(quiver_collection_delete_by_filter(collection, cstr("category = 'y'").as_ptr()));
        assert_eq!(doc_count(collection), 2);

        let fetched_key = [cstr("b")];
        let fetch_pks: Vec<_> = fetched_key.iter().map(|k| k.as_ptr()).collect();
        let mut map = QuiverDocMap {
            keys: ptr::null_mut(),
            docs: ptr::null_mut(),
            count: 0,
        };
        assert_ok(quiver_collection_fetch(collection, fetch_pks.as_ptr(), 1, &mut map));
        let entries = map.entries();
        let mut views = 0i64;
        assert!(quiver_doc_get_int64(entries[0].1, cstr("views").as_ptr(), &mut views));
        assert_eq!(views, 10);
        quiver_doc_map_free(&mut map);
        quiver_collection_destroy(collection);
    }
}

#[test]
fn test_query_orders_and_bounds() {
    let dir = TempDir::new().unwrap();
    unsafe {
        let collection = seeded(&dir.path().join("c"));

        let query = vector_query([2.1, 0.0, 0.0], 3);
        assert_eq!(query_pks(collection, query), vec!["c", "d", "b"]);
        quiver_vector_query_set_topk(query, 100);
        assert_eq!(query_pks(collection, query).len(), 5);

        assert_ok(quiver_vector_query_set_filter(query, cstr("category = 'y'").as_ptr()));
        assert_eq!(query_pks(collection, query), vec!["c", "d"]);

        let not_utf8 = [0xffu8, 0xfe, 0x00];
        let status = quiver_vector_query_set_filter(query, not_utf8.as_ptr() as *const std::os::raw::c_char);
        assert_eq!(code(status), StatusCode::InvalidArgument);
        assert_eq!(query_pks(collection, query), vec!["c", "d"]);
        assert_eq!(
            code(quiver_vector_query_set_filter(ptr::null_mut(), ptr::null())),
            StatusCode::InvalidArgument
        );

        let mut list = QuiverDocList {
            docs: ptr::null_mut(),
            count: 0,
        };
        quiver_vector_query_set_topk(query, 0);
        let status = quiver_collection_query(collection, query, &mut list);
        assert_eq!(code(status), StatusCode::InvalidArgument);
        assert!(list.docs.is_null());
        quiver_vector_query_free(query);

        let wrong_dim = quiver_vector_query_new(cstr("emb").as_ptr());
        let v = [1.0f32, 2.0];
        assert_ok(quiver_vector_query_set_vector_fp32(wrong_dim, v.as_ptr(), 2));
        assert_eq!(code(quiver_collection_query(collection, wrong_dim, &mut list)), StatusCode::InvalidArgument);
        quiver_vector_query_free(wrong_dim);
        quiver_collection_destroy(collection);
    }
}

#[test]
fn test_query_topk_larger_than_collection() {
    let dir = TempDir::new().unwrap();
    unsafe {
        let collection = seeded(&dir.path().join("c"));
        let query = vector_query([0.0, 0.0, 0.0], i32::MAX);
        assert_eq!(query_pks(collection, query), vec!["a", "b", "c", "d", "e"]);

        let group = quiver_group_by_vector_query_new(cstr("emb").as_ptr());
        let v = [0.0f32, 0.0, 0.0];
        assert_ok(quiver_group_by_vector_query_set_vector_fp32(group, v.as_ptr(), 3));
        assert_ok(quiver_group_by_vector_query_set_group_by_field(group, cstr("category").as_ptr()));
        quiver_group_by_vector_query_set_group_count(group, u32::MAX);
        quiver_group_by_vector_query_set_group_topk(group, u32::MAX);
        let mut results = QuiverGroupResults {
            groups: ptr::null_mut(),
            count: 0,
        };
        assert_ok(quiver_collection_group_by_query(collection, group, &mut results));
        assert_eq!(results.count, 3);
        quiver_group_results_free(&mut results);

        quiver_group_by_vector_query_free(group);
        quiver_vector_query_free(query);
        quiver_collection_destroy(collection);
    }
}

#[test]
fn test_query_results_are_independent() {
    let dir = TempDir::new().unwrap();
    unsafe {
        let collection = seeded(&dir.path().join("c"));
        let query = vector_query([0.0, 0.0, 0.0], 2);
        let mut list = QuiverDocList {
            docs: ptr::null_mut(),
            count: 0,
        };
        assert_ok(quiver_collection_query(collection, query, &mut list));
        assert_eq!(list.count, 2);

        let first = list.as_slice()[0];
        assert!(!quiver_doc_is_owned(first));
        assert!(quiver_doc_score(first) >= quiver_doc_score(list.as_slice()[1]));
        assert_ok(quiver_doc_set_string(first, cstr("category").as_ptr(), cstr("edited").as_ptr()));
        assert!(quiver_doc_is_owned(first));

        let kept = quiver_doc_clone(first);
        quiver_doc_list_free(&mut list);
        quiver_doc_list_free(&mut list);
        assert_eq!(read_str(quiver_doc_pk(kept)), "a");
        quiver_doc_free(kept);

        assert_eq!(query_pks(collection, query), vec!["a", "b"]);
        let key = [cstr("a")];
        let pks: Vec<_> = key.iter().map(|k| k.as_ptr()).collect();
        let mut map = QuiverDocMap {
            keys: ptr::null_mut(),
            docs: ptr::null_mut(),
            count: 0,
        };
        assert_ok(quiver_collection_fetch(collection, pks.as_ptr(), 1, &mut map));
        let mut category = ptr::null();
        assert!(quiver_doc_get_string(map.entries()[0].1, cstr("category").as_ptr(), &mut category));
        assert_eq!(read_str(category), "x");
        quiver_doc_map_free(&mut map);

        quiver_vector_query_free(query);
        quiver_collection_destroy(collection);
    }
}

#[test]
fn test_group_by_query() {
    let dir = TempDir::new().unwrap();
    unsafe {
        let collection = seeded(&dir.path().join("c"));
        let query = quiver_group_by_vector_query_new(cstr("emb").as_ptr());
        let v = [0.0f32, 0.0, 0.0];
        assert_ok(quiver_group_by_vector_query_set_vector_fp32(query, v.as_ptr(), 3));
        assert_ok(quiver_group_by_vector_query_set_group_by_field(query, cstr("category").as_ptr()));
        quiver_group_by_vector_query_set_group_count(query, 2);
        quiver_group_by_vector_query_set_group_topk(query, 1);

        let mut results = QuiverGroupResults {
            groups: ptr::null_mut(),
            count: 0,
        };
        assert_ok(quiver_collection_group_by_query(collection, query, &mut results));
        let groups = results.as_slice();
        assert_eq!(groups.len(), 2);
        assert_eq!(read_str(groups[0].group_by_value), "x");
        assert_eq!(groups[0].docs.count, 1);
        let top = groups[0].docs.as_slice()[0];
        assert!(quiver_doc_is_owned(top));
        assert_eq!(read_str(quiver_doc_pk(top)), "a");
        assert_eq!(read_str(groups[1].group_by_value), "y");
        quiver_group_results_free(&mut results);
        assert!(results.groups.is_null());

        quiver_group_by_vector_query_set_group_count(query, 3);
        quiver_group_by_vector_query_set_group_topk(query, 2);
        assert_ok(quiver_collection_group_by_query(collection, query, &mut results));
        let groups = results.as_slice();
        let layout: Vec<(String, Vec<String>)> = groups
            .iter()
            .map(|g| {
                let pks = g.docs.as_slice().iter().map(|d| read_str(quiver_doc_pk(*d))).collect();
                (read_str(g.group_by_value), pks)
            })
            .collect();
        assert_eq!(
            layout,
            vec![
                ("x".to_string(), vec!["a".to_string(), "b".to_string()]),
                ("y".to_string(), vec!["c".to_string(), "d".to_string()]),
                ("z".to_string(), vec!["e".to_string()]),
            ]
        );
        for group in groups {
            let docs = group.docs.as_slice();
            assert!(docs.len() <= 2);
            assert!(docs.windows(2).all(|w| quiver_doc_score(w[0]) >= quiver_doc_score(w[1])));
        }
        quiver_group_results_free(&mut results);

        quiver_group_by_vector_query_set_group_count(query, 0);
        let status = quiver_collection_group_by_query(collection, query, &mut results);
        assert_eq!(code(status), StatusCode::InvalidArgument);

        quiver_group_by_vector_query_free(query);
        quiver_collection_destroy(collection);
    }
}

#[test]
fn test_fetch_existing_keys_only() {
    let dir = TempDir::new().unwrap();
    unsafe {
        let collection = seeded(&dir.path().join("c"));
        let keys = [cstr("c"), cstr("missing"), cstr("a")];
        let pks: Vec<_> = keys.iter().map(|k| k.as_ptr()).collect();
        let mut map = QuiverDocMap {
            keys: ptr::null_mut(),
            docs: ptr::null_mut(),
            count: 0,
        };
        assert_ok(quiver_collection_fetch(collection, pks.as_ptr(), pks.len(), &mut map));
        let keys: Vec<String> = map.entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["c", "a"]);
        assert!(quiver_doc_is_owned(map.entries()[0].1));
        quiver_doc_map_free(&mut map);
        assert_eq!(map.count, 0);

        let with_null = [ptr::null()];
        let status = quiver_collection_fetch(collection, with_null.as_ptr(), 1, &mut map);
        assert_eq!(code(status), StatusCode::InvalidArgument);
        quiver_collection_destroy(collection);
    }
}

#[test]
fn test_column_and_index_ddl() {
    let dir = TempDir::new().unwrap();
    unsafe {
        let collection = seeded(&dir.path().join("c"));

        let invert = quiver_index_params_new_invert(false);
        assert_ok(quiver_collection_create_index(collection, cstr("category").as_ptr(), invert, ptr::null()));
        let status = quiver_collection_create_index(collection, cstr("nope").as_ptr(), invert, ptr::null());
        assert_eq!(code(status), StatusCode::NotFound);
        quiver_index_params_free(invert);
        assert_ok(quiver_collection_drop_index(collection, cstr("category").as_ptr()));
        assert_eq!(code(quiver_collection_drop_index(collection, cstr("category").as_ptr())), StatusCode::NotFound);

        let rank = quiver_field_schema_new(cstr("rank").as_ptr(), DataType::Int32.as_u32());
        quiver_field_schema_set_nullable(rank, true);
        assert_ok(quiver_collection_add_column(collection, rank, ptr::null()));
        assert_eq!(code(quiver_collection_add_column(collection, rank, ptr::null())), StatusCode::AlreadyExists);
        quiver_field_schema_free(rank);

        assert_ok(quiver_collection_alter_column(collection, cstr("rank").as_ptr(), cstr("position").as_ptr(), ptr::null()));
        let status = quiver_collection_alter_column(collection, cstr("position").as_ptr(), ptr::null(), ptr::null());
        assert_eq!(code(status), StatusCode::InvalidArgument);

        let mut schema = ptr::null_mut();
        assert_ok(quiver_collection_schema(collection, &mut schema));
        assert!(quiver_collection_schema_has_field(schema, cstr("position").as_ptr()));
        assert!(!quiver_collection_schema_has_field(schema, cstr("rank").as_ptr()));
        quiver_collection_schema_free(schema);

        assert_ok(quiver_collection_drop_column(collection, cstr("position").as_ptr()));
        assert_eq!(code(quiver_collection_drop_column(collection, cstr("emb").as_ptr())), StatusCode::NotSupported);

        let options = quiver_optimize_options_new();
        quiver_optimize_options_set_concurrency(options, 2);
        assert_ok(quiver_collection_optimize(collection, options));
        quiver_optimize_options_free(options);
        assert_eq!(doc_count(collection), 5);
        quiver_collection_destroy(collection);
    }
}

#[test]
fn test_read_only_rejects_mutations() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("c");
    unsafe {
        quiver_collection_destroy(seeded(&path));

        let options = quiver_collection_options_new();
        quiver_collection_options_set_read_only(options, true);
        let c_path = CString::new(path.to_str().unwrap()).unwrap();
        let mut status = QuiverStatus::ok();
        let collection = quiver_collection_open(c_path.as_ptr(), options, &mut status);
        quiver_collection_options_free(options);
        assert_ok(status);

        let doc = article("f", [5.0, 0.0, 0.0], "z");
        let docs = [doc as *const QuiverDoc];
        let mut results = empty_results();
        let status = quiver_collection_insert(collection, docs.as_ptr(), 1, &mut results);
        assert_eq!(code(status), StatusCode::PermissionDenied);
        assert!(results.statuses.is_null());
        quiver_doc_free(doc);

        assert_eq!(code(quiver_collection_destroy_storage(collection)), StatusCode::PermissionDenied);
        assert_ok(quiver_collection_flush(collection));
        assert_eq!(doc_count(collection), 5);
        quiver_collection_destroy(collection);
    }
}

#[test]
fn test_destroy_storage() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("c");
    unsafe {
        let collection = seeded(&path);
        assert_ok(quiver_collection_destroy_storage(collection));
        assert!(!path.exists());

        let query = vector_query([0.0, 0.0, 0.0], 1);
        let mut list = QuiverDocList {
            docs: ptr::null_mut(),
            count: 0,
        };
        assert_eq!(code(quiver_collection_query(collection, query, &mut list)), StatusCode::FailedPrecondition);
        assert_eq!(code(quiver_collection_flush(collection)), StatusCode::FailedPrecondition);
        let mut stats = ptr::null_mut();
        assert_eq!(code(quiver_collection_stats(collection, &mut stats)), StatusCode::FailedPrecondition);
        assert!(stats.is_null());
        quiver_vector_query_free(query);
        quiver_collection_destroy(collection);
    }
}
