// Ownership tags and argument plumbing shared by every extern function.
use crate::status::QuiverStatus;
use quiver_core::{Error, Result};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Who owns the value behind a handle.
///
/// `Owned` values were built by the caller or copied for it. `Borrowed`
/// values share the engine's reference-counted storage; releasing the
/// handle drops only this reference.
#[derive(Debug, Clone)]
pub enum Handle<T> {
    Owned(Box<T>),
    Borrowed(Arc<T>),
}

impl<T: Clone> Handle<T> {
    pub fn owned(value: T) -> Self {
        Handle::Owned(Box::new(value))
    }

    pub fn borrowed(value: Arc<T>) -> Self {
        Handle::Borrowed(value)
    }

    pub fn get(&self) -> &T {
        match self {
            Handle::Owned(v) => v,
            Handle::Borrowed(v) => v,
        }
    }

    /// Mutable access. A borrowed value is copied first so engine data is
    /// never written through a result handle.
    pub fn make_mut(&mut self) -> &mut T {
        if let Handle::Borrowed(shared) = self {
            *self = Handle::Owned(Box::new(T::clone(shared)));
        }
        match self {
            Handle::Owned(v) => v,
            Handle::Borrowed(_) => unreachable!("borrowed handle was just replaced"),
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Handle::Owned(_))
    }

    pub fn to_owned_value(&self) -> T {
        self.get().clone()
    }
}

/// Build a C string, dropping interior NUL bytes.
pub(crate) fn c_string(s: &str) -> CString {
    match CString::new(s) {
        Ok(c) => c,
        Err(e) => {
            let mut bytes = e.into_vec();
            bytes.retain(|b| *b != 0);
            CString::new(bytes).unwrap_or_default()
        }
    }
}

pub(crate) fn into_raw_string(s: &str) -> *mut c_char {
    c_string(s).into_raw()
}

/// Borrow a required string argument.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn arg_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(Error::InvalidArgument(format!("{} is null", what)));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| Error::InvalidArgument(format!("{} is not valid UTF-8", what)))
}

/// Borrow an optional string argument; null means absent.
///
/// # Safety
/// As for [`arg_str`].
pub(crate) unsafe fn opt_str<'a>(ptr: *const c_char, what: &str) -> Result<Option<&'a str>> {
    if ptr.is_null() {
        return Ok(None);
    }
    arg_str(ptr, what).map(Some)
}

/// Borrow a `(pointer, len)` buffer. A null pointer is only allowed with
/// `len == 0`.
///
/// # Safety
/// A non-null `ptr` must point to `len` initialized values.
pub(crate) unsafe fn arg_slice<'a, T>(ptr: *const T, len: usize, what: &str) -> Result<&'a [T]> {
    if ptr.is_null() {
        if len == 0 {
            return Ok(&[]);
        }
        return Err(Error::InvalidArgument(format!(
            "{} is null but length is {}",
            what, len
        )));
    }
    Ok(std::slice::from_raw_parts(ptr, len))
}

/// Borrow the object behind a handle argument.
///
/// # Safety
/// A non-null `ptr` must point to a live `T`.
pub(crate) unsafe fn arg_ref<'a, T>(ptr: *const T, what: &str) -> Result<&'a T> {
    ptr.as_ref()
        .ok_or_else(|| Error::InvalidArgument(format!("{} is null", what)))
}

/// # Safety
/// A non-null `ptr` must point to a live `T` not aliased elsewhere.
pub(crate) unsafe fn arg_mut<'a, T>(ptr: *mut T, what: &str) -> Result<&'a mut T> {
    ptr.as_mut()
        .ok_or_else(|| Error::InvalidArgument(format!("{} is null", what)))
}

/// Store `value` through an out-parameter.
///
/// # Safety
/// `out` must be valid for writes.
pub(crate) unsafe fn write_out<T>(out: *mut T, value: T, what: &str) -> Result<()> {
    if out.is_null() {
        return Err(Error::InvalidArgument(format!("{} is null", what)));
    }
    out.write(value);
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run a status-returning body. Errors become a status; a panic becomes
/// `INTERNAL_ERROR` instead of unwinding into the caller.
pub(crate) fn guard(f: impl FnOnce() -> Result<()>) -> QuiverStatus {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => QuiverStatus::from_result(result),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!("Panic caught at the C boundary: {}", message);
            QuiverStatus::from_error(&Error::Internal(format!("panic: {}", message)))
        }
    }
}

/// Run a body that reports failure through a sentinel value.
pub(crate) fn guard_or<R>(fallback: R, f: impl FnOnce() -> R) -> R {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(payload) => {
            tracing::error!(
                "Panic caught at the C boundary: {}",
                panic_message(payload.as_ref())
            );
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_core::{Doc, StatusCode};

    #[test]
    fn test_make_mut_copies_borrowed() {
        let shared = Arc::new(Doc::new("a"));
        let mut handle = Handle::borrowed(shared.clone());
        assert!(!handle.is_owned());
        handle.make_mut().set_pk("b");
        assert!(handle.is_owned());
        assert_eq!(shared.pk(), "a");
        assert_eq!(handle.get().pk(), "b");
    }

    #[test]
    fn test_c_string_strips_nul() {
        assert_eq!(c_string("a\0b").to_str().unwrap(), "ab");
    }

    #[test]
    fn test_arg_slice_null() {
        let empty: &[f32] = unsafe { arg_slice(std::ptr::null(), 0, "data") }.unwrap();
        assert!(empty.is_empty());
        let err = unsafe { arg_slice::<f32>(std::ptr::null(), 3, "data") }.unwrap_err();
        assert_eq!(err.code(), StatusCode::InvalidArgument);
    }

    #[test]
    fn test_guard_catches_panic() {
        let mut status = guard(|| panic!("boom"));
        assert_eq!(status.code, StatusCode::InternalError.as_u32());
        unsafe { crate::status::quiver_status_free(&mut status) };
    }
}
