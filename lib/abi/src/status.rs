use crate::handle::into_raw_string;
use quiver_core::{Error, Result, StatusCode};
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Result of every fallible call. `message` is null on success and
/// otherwise owned by the holder until [`quiver_status_free`].
#[repr(C)]
#[derive(Debug)]
pub struct QuiverStatus {
    pub code: u32,
    pub message: *mut c_char,
}

impl QuiverStatus {
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok.as_u32(),
            message: ptr::null_mut(),
        }
    }

    pub fn from_error(error: &Error) -> Self {
        Self {
            code: error.code().as_u32(),
            message: into_raw_string(error.message()),
        }
    }

    pub fn from_result(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::from_error(&e),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok.as_u32()
    }

    /// Code as the engine enum; unknown codes read as `Unknown`.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u32(self.code).unwrap_or(StatusCode::Unknown)
    }

    /// # Safety
    /// `message` must be null or a live string from this library.
    pub unsafe fn message_str(&self) -> Option<&str> {
        if self.message.is_null() {
            return None;
        }
        std::ffi::CStr::from_ptr(self.message).to_str().ok()
    }

    /// Release the message in place.
    ///
    /// # Safety
    /// `message` must be null or a string allocated by this library and not
    /// yet released.
    pub unsafe fn release(&mut self) {
        if !self.message.is_null() {
            drop(CString::from_raw(self.message));
            self.message = ptr::null_mut();
        }
    }
}

/// Canonical success status. Allocates nothing.
#[no_mangle]
pub extern "C" fn quiver_status_ok() -> QuiverStatus {
    QuiverStatus::ok()
}

/// # Safety
/// `status` must be null or point to a valid `QuiverStatus`.
#[no_mangle]
pub unsafe extern "C" fn quiver_status_is_ok(status: *const QuiverStatus) -> bool {
    status.as_ref().map_or(false, QuiverStatus::is_ok)
}

/// Release the status message and null it out.
///
/// # Safety
/// `status` must be null or point to a status returned by this library whose
/// message has not been released yet.
#[no_mangle]
pub unsafe extern "C" fn quiver_status_free(status: *mut QuiverStatus) {
    if let Some(status) = status.as_mut() {
        status.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_has_no_message() {
        let status = quiver_status_ok();
        assert!(status.message.is_null());
        assert!(unsafe { quiver_status_is_ok(&status) });
    }

    #[test]
    fn test_error_message_round_trip() {
        let mut status = QuiverStatus::from_error(&Error::NotFound("no such pk".into()));
        assert_eq!(status.status_code(), StatusCode::NotFound);
        assert_eq!(unsafe { status.message_str() }, Some("no such pk"));
        unsafe {
            quiver_status_free(&mut status);
            assert!(status.message.is_null());
            // Freeing again is a no-op once the message is nulled.
            quiver_status_free(&mut status);
        }
    }
}
