// {pointer, count} results and their release functions.
use crate::handle::into_raw_string;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Hand a vector's storage to the caller as `(pointer, count)`. Empty
/// vectors become `(NULL, 0)`.
pub(crate) fn into_raw_parts<T>(items: Vec<T>) -> (*mut T, usize) {
    if items.is_empty() {
        return (ptr::null_mut(), 0);
    }
    let boxed = items.into_boxed_slice();
    let count = boxed.len();
    (Box::into_raw(boxed) as *mut T, count)
}

/// Take back storage produced by [`into_raw_parts`].
///
/// # Safety
/// `(ptr, count)` must come from `into_raw_parts` and not have been taken back.
pub(crate) unsafe fn from_raw_parts<T>(ptr: *mut T, count: usize) -> Vec<T> {
    if ptr.is_null() {
        return Vec::new();
    }
    Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, count)).into_vec()
}

#[repr(C)]
#[derive(Debug)]
pub struct QuiverStringArray {
    pub strings: *mut *mut c_char,
    pub count: usize,
}

impl QuiverStringArray {
    pub fn empty() -> Self {
        Self {
            strings: ptr::null_mut(),
            count: 0,
        }
    }

    pub fn from_strings<S: AsRef<str>>(items: &[S]) -> Self {
        let raw: Vec<*mut c_char> = items.iter().map(|s| into_raw_string(s.as_ref())).collect();
        let (strings, count) = into_raw_parts(raw);
        Self { strings, count }
    }

    /// Copy the strings back out, for tests and Rust callers.
    ///
    /// # Safety
    /// The array must be live and produced by this library.
    pub unsafe fn to_vec(&self) -> Vec<String> {
        if self.strings.is_null() {
            return Vec::new();
        }
        std::slice::from_raw_parts(self.strings, self.count)
            .iter()
            .map(|s| std::ffi::CStr::from_ptr(*s).to_string_lossy().into_owned())
            .collect()
    }
}

/// Release every string, then the array, and zero the value.
///
/// # Safety
/// `array` must be null or point to an array returned by this library that
/// has not been released yet. A zeroed array is accepted.
#[no_mangle]
pub unsafe extern "C" fn quiver_string_array_free(array: *mut QuiverStringArray) {
    let Some(array) = array.as_mut() else {
        return;
    };
    for s in from_raw_parts(array.strings, array.count) {
        if !s.is_null() {
            drop(CString::from_raw(s));
        }
    }
    array.strings = ptr::null_mut();
    array.count = 0;
}

/// Release a single string returned by this library, such as
/// `quiver_doc_to_json` output.
///
/// # Safety
/// `s` must be null or a string allocated by this library, released once.
#[no_mangle]
pub unsafe extern "C" fn quiver_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_array_release_zeroes() {
        let mut array = QuiverStringArray::from_strings(&["a", "bc"]);
        assert_eq!(array.count, 2);
        assert_eq!(unsafe { array.to_vec() }, vec!["a", "bc"]);
        unsafe {
            quiver_string_array_free(&mut array);
            assert!(array.strings.is_null());
            assert_eq!(array.count, 0);
            quiver_string_array_free(&mut array);
        }
    }

    #[test]
    fn test_empty_is_null() {
        let array = QuiverStringArray::from_strings::<&str>(&[]);
        assert!(array.strings.is_null());
        assert_eq!(array.count, 0);
    }
}
