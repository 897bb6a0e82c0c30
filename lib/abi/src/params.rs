use quiver_core::{IndexParams, IndexType, MetricType, QuantizeType, QueryParams};
use std::os::raw::c_int;

/// Index parameter handle holding one closed variant.
pub struct QuiverIndexParams(IndexParams);

impl QuiverIndexParams {
    pub fn params(&self) -> &IndexParams {
        &self.0
    }

    fn into_raw(params: IndexParams) -> *mut QuiverIndexParams {
        Box::into_raw(Box::new(QuiverIndexParams(params)))
    }
}

/// Query parameter handle holding one closed variant.
pub struct QuiverQueryParams(QueryParams);

impl QuiverQueryParams {
    pub fn params(&self) -> &QueryParams {
        &self.0
    }

    fn into_raw(params: QueryParams) -> *mut QuiverQueryParams {
        Box::into_raw(Box::new(QuiverQueryParams(params)))
    }
}

// Negative counts are kept as 0 so the engine rejects them on use.
fn count(value: c_int) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

// ----------------------------------------------------------------------
// Index params
// ----------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn quiver_index_params_new_hnsw(
    m: c_int,
    ef_construction: c_int,
    metric: u32,
    quantize: u32,
) -> *mut QuiverIndexParams {
    QuiverIndexParams::into_raw(IndexParams::hnsw(
        MetricType::from_u32(metric),
        count(m),
        count(ef_construction),
        QuantizeType::from_u32(quantize),
    ))
}

#[no_mangle]
pub extern "C" fn quiver_index_params_new_ivf(
    n_list: c_int,
    n_iters: c_int,
    use_soar: bool,
    metric: u32,
    quantize: u32,
) -> *mut QuiverIndexParams {
    QuiverIndexParams::into_raw(IndexParams::ivf(
        MetricType::from_u32(metric),
        count(n_list),
        count(n_iters),
        use_soar,
        QuantizeType::from_u32(quantize),
    ))
}

#[no_mangle]
pub extern "C" fn quiver_index_params_new_flat(metric: u32, quantize: u32) -> *mut QuiverIndexParams {
    QuiverIndexParams::into_raw(IndexParams::flat(
        MetricType::from_u32(metric),
        QuantizeType::from_u32(quantize),
    ))
}

#[no_mangle]
pub extern "C" fn quiver_index_params_new_invert(enable_range_optimization: bool) -> *mut QuiverIndexParams {
    QuiverIndexParams::into_raw(IndexParams::invert(enable_range_optimization))
}

/// # Safety
/// `params` must be null or a handle from this library released once.
#[no_mangle]
pub unsafe extern "C" fn quiver_index_params_free(params: *mut QuiverIndexParams) {
    if !params.is_null() {
        drop(Box::from_raw(params));
    }
}

/// Which variant the handle holds.
///
/// # Safety
/// `params` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_index_params_type(params: *const QuiverIndexParams) -> u32 {
    params
        .as_ref()
        .map_or(IndexType::Undefined.as_u32(), |p| p.0.index_type().as_u32())
}

/// Metric of a vector index; `UNDEFINED` for INVERT.
///
/// # Safety
/// `params` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_index_params_metric(params: *const QuiverIndexParams) -> u32 {
    params
        .as_ref()
        .and_then(|p| p.0.metric())
        .unwrap_or(MetricType::Undefined)
        .as_u32()
}

/// # Safety
/// `params` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_index_params_quantize(params: *const QuiverIndexParams) -> u32 {
    params
        .as_ref()
        .and_then(|p| p.0.quantize())
        .unwrap_or(QuantizeType::Undefined)
        .as_u32()
}

/// HNSW tunables. Returns `false` for any other variant.
///
/// # Safety
/// `params` must be null or a live handle; non-null outs valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_index_params_get_hnsw(
    params: *const QuiverIndexParams,
    out_m: *mut u32,
    out_ef_construction: *mut u32,
) -> bool {
    match params.as_ref().map(|p| &p.0) {
        Some(IndexParams::Hnsw { m, ef_construction, .. }) => {
            put(out_m, *m);
            put(out_ef_construction, *ef_construction);
            true
        }
        _ => false,
    }
}

/// IVF tunables. Returns `false` for any other variant.
///
/// # Safety
/// `params` must be null or a live handle; non-null outs valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_index_params_get_ivf(
    params: *const QuiverIndexParams,
    out_n_list: *mut u32,
    out_n_iters: *mut u32,
    out_use_soar: *mut bool,
) -> bool {
    match params.as_ref().map(|p| &p.0) {
        Some(IndexParams::Ivf { n_list, n_iters, use_soar, .. }) => {
            put(out_n_list, *n_list);
            put(out_n_iters, *n_iters);
            put(out_use_soar, *use_soar);
            true
        }
        _ => false,
    }
}

/// INVERT tunables. Returns `false` for any other variant.
///
/// # Safety
/// `params` must be null or a live handle; a non-null out valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_index_params_get_invert(
    params: *const QuiverIndexParams,
    out_enable_range_optimization: *mut bool,
) -> bool {
    match params.as_ref().map(|p| &p.0) {
        Some(IndexParams::Invert { enable_range_optimization }) => {
            put(out_enable_range_optimization, *enable_range_optimization);
            true
        }
        _ => false,
    }
}

unsafe fn put<T>(out: *mut T, value: T) {
    if !out.is_null() {
        out.write(value);
    }
}

// ----------------------------------------------------------------------
// Query params
// ----------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn quiver_query_params_new_hnsw(ef_search: c_int) -> *mut QuiverQueryParams {
    QuiverQueryParams::into_raw(QueryParams::hnsw(count(ef_search)))
}

#[no_mangle]
pub extern "C" fn quiver_query_params_new_ivf(nprobe: c_int) -> *mut QuiverQueryParams {
    QuiverQueryParams::into_raw(QueryParams::ivf(count(nprobe)))
}

/// # Safety
/// `params` must be null or a handle from this library released once.
#[no_mangle]
pub unsafe extern "C" fn quiver_query_params_free(params: *mut QuiverQueryParams) {
    if !params.is_null() {
        drop(Box::from_raw(params));
    }
}

/// # Safety
/// `params` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn quiver_query_params_type(params: *const QuiverQueryParams) -> u32 {
    params
        .as_ref()
        .map_or(IndexType::Undefined.as_u32(), |p| p.0.index_type().as_u32())
}

/// # Safety
/// `params` must be null or a live handle; a non-null out valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_query_params_get_hnsw(
    params: *const QuiverQueryParams,
    out_ef_search: *mut u32,
) -> bool {
    match params.as_ref().map(|p| p.0) {
        Some(QueryParams::Hnsw { ef_search }) => {
            put(out_ef_search, ef_search);
            true
        }
        _ => false,
    }
}

/// # Safety
/// `params` must be null or a live handle; a non-null out valid for writes.
#[no_mangle]
pub unsafe extern "C" fn quiver_query_params_get_ivf(
    params: *const QuiverQueryParams,
    out_nprobe: *mut u32,
) -> bool {
    match params.as_ref().map(|p| p.0) {
        Some(QueryParams::Ivf { nprobe }) => {
            put(out_nprobe, nprobe);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_accessors() {
        unsafe {
            let hnsw = quiver_index_params_new_hnsw(16, 200, MetricType::Cosine.as_u32(), 0);
            assert_eq!(quiver_index_params_type(hnsw), IndexType::Hnsw.as_u32());
            assert_eq!(quiver_index_params_metric(hnsw), MetricType::Cosine.as_u32());

            let (mut m, mut ef) = (0u32, 0u32);
            assert!(quiver_index_params_get_hnsw(hnsw, &mut m, &mut ef));
            assert_eq!((m, ef), (16, 200));

            let mut n_list = 7u32;
            assert!(!quiver_index_params_get_ivf(hnsw, &mut n_list, std::ptr::null_mut(), std::ptr::null_mut()));
            assert_eq!(n_list, 7);
            quiver_index_params_free(hnsw);

            let invert = quiver_index_params_new_invert(true);
            assert_eq!(quiver_index_params_metric(invert), MetricType::Undefined.as_u32());
            let mut range = false;
            assert!(quiver_index_params_get_invert(invert, &mut range));
            assert!(range);
            quiver_index_params_free(invert);
        }
    }

    #[test]
    fn test_negative_counts_become_zero() {
        unsafe {
            let q = quiver_query_params_new_ivf(-3);
            let mut nprobe = 1u32;
            assert!(quiver_query_params_get_ivf(q, &mut nprobe));
            assert_eq!(nprobe, 0);
            assert!(!quiver_query_params_get_hnsw(q, &mut nprobe));
            quiver_query_params_free(q);
        }
    }
}
