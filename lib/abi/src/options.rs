use quiver_core::{CollectionOptions, CreateIndexOptions, OptimizeOptions};
use std::os::raw::c_int;

pub struct QuiverCollectionOptions(pub(crate) CollectionOptions);
pub struct QuiverCreateIndexOptions(pub(crate) CreateIndexOptions);
pub struct QuiverOptimizeOptions(pub(crate) OptimizeOptions);

impl QuiverCollectionOptions {
    pub fn options(&self) -> &CollectionOptions {
        &self.0
    }

    pub(crate) fn into_raw(options: CollectionOptions) -> *mut QuiverCollectionOptions {
        Box::into_raw(Box::new(QuiverCollectionOptions(options)))
    }
}

fn concurrency(value: c_int) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

// ----------------------------------------------------------------------
// Collection options
// ----------------------------------------------------------------------

/// Defaults: writable, mmap enabled, 64 MiB write buffer.
#[no_mangle]
pub extern "C" fn quiver_collection_options_new() -> *mut QuiverCollectionOptions {
    QuiverCollectionOptions::into_raw(CollectionOptions::default())
}

/// # Safety
/// `options` must be null or a handle from this library released once.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_options_free(options: *mut QuiverCollectionOptions) {
    if !options.is_null() {
        drop(Box::from_raw(options));
    }
}

/// # Safety
/// `options` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_options_set_read_only(options: *mut QuiverCollectionOptions, read_only: bool) {
    if let Some(o) = options.as_mut() {
        o.0.read_only = read_only;
    }
}

/// # Safety
/// `options` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_options_read_only(options: *const QuiverCollectionOptions) -> bool {
    options.as_ref().map_or(false, |o| o.0.read_only)
}

/// # Safety
/// `options` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_options_set_enable_mmap(
    options: *mut QuiverCollectionOptions,
    enable_mmap: bool,
) {
    if let Some(o) = options.as_mut() {
        o.0.enable_mmap = enable_mmap;
    }
}

/// # Safety
/// `options` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_options_enable_mmap(options: *const QuiverCollectionOptions) -> bool {
    options.as_ref().map_or(false, |o| o.0.enable_mmap)
}

/// # Safety
/// `options` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_options_set_max_buffer_size(
    options: *mut QuiverCollectionOptions,
    max_buffer_size: u64,
) {
    if let Some(o) = options.as_mut() {
        o.0.max_buffer_size = max_buffer_size;
    }
}

/// # Safety
/// `options` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_collection_options_max_buffer_size(options: *const QuiverCollectionOptions) -> u64 {
    options.as_ref().map_or(0, |o| o.0.max_buffer_size)
}

// ----------------------------------------------------------------------
// Create-index and optimize options
// ----------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn quiver_create_index_options_new() -> *mut QuiverCreateIndexOptions {
    Box::into_raw(Box::new(QuiverCreateIndexOptions(CreateIndexOptions::default())))
}

/// # Safety
/// `options` must be null or a handle from this library released once.
#[no_mangle]
pub unsafe extern "C" fn quiver_create_index_options_free(options: *mut QuiverCreateIndexOptions) {
    if !options.is_null() {
        drop(Box::from_raw(options));
    }
}

/// Worker count for the build; 0 or negative lets the engine choose.
///
/// # Safety
/// `options` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_create_index_options_set_concurrency(
    options: *mut QuiverCreateIndexOptions,
    value: c_int,
) {
    if let Some(o) = options.as_mut() {
        o.0.concurrency = concurrency(value);
    }
}

/// # Safety
/// `options` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_create_index_options_concurrency(options: *const QuiverCreateIndexOptions) -> u32 {
    options.as_ref().map_or(0, |o| o.0.concurrency)
}

#[no_mangle]
pub extern "C" fn quiver_optimize_options_new() -> *mut QuiverOptimizeOptions {
    Box::into_raw(Box::new(QuiverOptimizeOptions(OptimizeOptions::default())))
}

/// # Safety
/// `options` must be null or a handle from this library released once.
#[no_mangle]
pub unsafe extern "C" fn quiver_optimize_options_free(options: *mut QuiverOptimizeOptions) {
    if !options.is_null() {
        drop(Box::from_raw(options));
    }
}

/// # Safety
/// `options` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_optimize_options_set_concurrency(options: *mut QuiverOptimizeOptions, value: c_int) {
    if let Some(o) = options.as_mut() {
        o.0.concurrency = concurrency(value);
    }
}

/// # Safety
/// `options` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_optimize_options_concurrency(options: *const QuiverOptimizeOptions) -> u32 {
    options.as_ref().map_or(0, |o| o.0.concurrency)
}
