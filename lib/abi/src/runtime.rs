// Process-level entry points: registry listings, logging and the worker pool.
use crate::handle::{c_string, guard_or};
use quiver_core::registry::{self, RegistryKind};
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::sync::OnceLock;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, Registry};

/// NUL-terminated names plus the pointer array handed to callers.
struct NameList {
    _names: Vec<CString>,
    ptrs: Vec<*const c_char>,
}

// The pointers target the heap buffers of `_names`, which are never mutated
// or dropped once the list is published.
unsafe impl Send for NameList {}
unsafe impl Sync for NameList {}

impl NameList {
    fn load(kind: RegistryKind) -> Self {
        let names: Vec<CString> = registry::registered(kind).iter().map(|n| c_string(n)).collect();
        let ptrs = names.iter().map(|n| n.as_ptr()).collect();
        tracing::debug!("Cached {} registered {} names", names.len(), kind.name());
        Self { _names: names, ptrs }
    }
}

static NAME_LISTS: [OnceLock<NameList>; 4] = [OnceLock::new(), OnceLock::new(), OnceLock::new(), OnceLock::new()];

fn names(kind: RegistryKind) -> &'static NameList {
    let slot = match kind {
        RegistryKind::Metric => 0,
        RegistryKind::Builder => 1,
        RegistryKind::Searcher => 2,
        RegistryKind::Streamer => 3,
    };
    NAME_LISTS[slot].get_or_init(|| NameList::load(kind))
}

unsafe fn list_registered(kind: RegistryKind, out: *mut *const *const c_char) -> c_int {
    guard_or(-1, || {
        let list = names(kind);
        if !out.is_null() {
            out.write(if list.ptrs.is_empty() { std::ptr::null() } else { list.ptrs.as_ptr() });
        }
        c_int::try_from(list.ptrs.len()).unwrap_or(c_int::MAX)
    })
}

/// Populate the registry listings. Safe to call more than once.
#[no_mangle]
pub extern "C" fn quiver_init() -> bool {
    guard_or(false, || {
        for kind in RegistryKind::ALL {
            names(kind);
        }
        true
    })
}

/// Names of the registered distance metrics. The array and its strings are
/// owned by the library and live for the rest of the process.
///
/// The listing is captured on first use: names registered afterwards do not
/// appear in it.
///
/// # Safety
/// `out` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_list_registered_metrics(out: *mut *const *const c_char) -> c_int {
    list_registered(RegistryKind::Metric, out)
}

/// Index builder names. Same lifetime and staleness as the metric listing.
///
/// # Safety
/// `out` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_list_registered_builders(out: *mut *const *const c_char) -> c_int {
    list_registered(RegistryKind::Builder, out)
}

/// # Safety
/// `out` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_list_registered_searchers(out: *mut *const *const c_char) -> c_int {
    list_registered(RegistryKind::Searcher, out)
}

/// # Safety
/// `out` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_list_registered_streamers(out: *mut *const *const c_char) -> c_int {
    list_registered(RegistryKind::Streamer, out)
}

pub(crate) fn level_filter(level: c_int) -> LevelFilter {
    match level {
        c_int::MIN..=0 => LevelFilter::TRACE,
        1 => LevelFilter::DEBUG,
        2 => LevelFilter::INFO,
        3 => LevelFilter::WARN,
        4 => LevelFilter::ERROR,
        _ => LevelFilter::OFF,
    }
}

static LOG_FILTER: OnceLock<reload::Handle<LevelFilter, Registry>> = OnceLock::new();

/// Set the library log level: 0 trace, 1 debug, 2 info, 3 warn, 4 error,
/// 5 or more off. The first call installs a stderr subscriber unless the
/// host already installed one.
#[no_mangle]
pub extern "C" fn quiver_set_log_level(level: c_int) {
    let filter = level_filter(level);
    guard_or((), || {
        let handle = LOG_FILTER.get_or_init(|| {
            let (layer, handle) = reload::Layer::new(filter);
            let installed = tracing_subscriber::registry()
                .with(layer)
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init();
            if installed.is_err() {
                warn!("A global subscriber is already set; quiver log level is not applied");
            }
            handle
        });
        if let Err(e) = handle.reload(filter) {
            warn!("Failed to change log level: {}", e);
        }
    })
}

/// Size the worker pool used for scans and index builds. 0 picks one
/// thread per core. Only the first call takes effect; returns whether
/// this call did.
#[no_mangle]
pub extern "C" fn quiver_set_thread_pool_size(size: usize) -> bool {
    guard_or(false, || {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("quiver-worker-{}", i))
            .build_global()
        {
            Ok(()) => {
                info!("Worker pool started with {} threads", rayon::current_num_threads());
                true
            }
            Err(e) => {
                warn!("Worker pool already initialized: {}", e);
                false
            }
        }
    })
}

/// Library version, a static string.
#[no_mangle]
pub extern "C" fn quiver_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr().cast()
}
