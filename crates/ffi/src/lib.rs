//! C ABI surface for managed hosts
//!
//! Exposes the capture core as a flat, exception-free API for P/Invoke.
//! Strings cross the boundary as null-terminated UTF-16; results are the
//! stable wire codes of [`capture_wgc::CaptureError`]. Panics never unwind
//! across the boundary: every entry point catches them and reports 99.
//!
//! Memory contract: a buffer returned by [`CaptureScreenToMemory`] is
//! owned by the caller and must be handed back to [`FreeBuffer`] exactly
//! once. Passing it twice is undefined behavior.

use capture_wgc::{describe_code, CaptureError, CaptureOptions, SUCCESS_CODE, WIRE_CODES};
use once_cell::sync::Lazy;
use std::alloc::{alloc, dealloc, Layout};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::ptr;

const VERSION_STRING: &str = concat!(
    "SnapCap v",
    env!("CARGO_PKG_VERSION"),
    " - Windows Graphics Capture API"
);

/// Bytes reserved in front of an exported buffer to remember its length,
/// so `FreeBuffer` can rebuild the allocation layout from the pointer
/// alone.
const BUFFER_HEADER: usize = std::mem::size_of::<usize>();

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

static VERSION_W: Lazy<Vec<u16>> = Lazy::new(|| wide(VERSION_STRING));
static DEFAULT_DESCRIPTION_W: Lazy<Vec<u16>> = Lazy::new(|| wide(describe_code(99)));
static DESCRIPTIONS_W: Lazy<BTreeMap<i32, Vec<u16>>> = Lazy::new(|| {
    WIRE_CODES
        .iter()
        .map(|&code| (code, wide(describe_code(code))))
        .collect()
});

/// Read a null-terminated UTF-16 string into a path. Null and empty both
/// come back as `None`.
///
/// # Safety
/// `ptr` must be null or point at a null-terminated UTF-16 string.
unsafe fn wide_to_path(ptr: *const u16) -> Option<PathBuf> {
    if ptr.is_null() {
        return None;
    }
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    if len == 0 {
        return None;
    }
    let slice = std::slice::from_raw_parts(ptr, len);
    Some(PathBuf::from(OsString::from_wide(slice)))
}

/// Move PNG bytes into a caller-owned allocation, length header in front.
fn export_buffer(bytes: &[u8]) -> *mut u8 {
    let Ok(layout) = Layout::from_size_align(
        BUFFER_HEADER + bytes.len(),
        std::mem::align_of::<usize>(),
    ) else {
        return ptr::null_mut();
    };
    unsafe {
        let base = alloc(layout);
        if base.is_null() {
            return ptr::null_mut();
        }
        (base as *mut usize).write(bytes.len());
        let data = base.add(BUFFER_HEADER);
        ptr::copy_nonoverlapping(bytes.as_ptr(), data, bytes.len());
        data
    }
}

fn run_guarded(f: impl FnOnce() -> i32) -> i32 {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| CaptureError::Unknown.code())
}

/// Capture the primary monitor to `output_path` with the default options
/// (border and cursor hidden).
#[no_mangle]
pub extern "C" fn CaptureScreen(output_path: *const u16) -> i32 {
    CaptureScreenWithOptions(output_path, 1, 1)
}

/// Capture the primary monitor to `output_path`. Nonzero `hide_border` /
/// `hide_cursor` hide the capture border and the mouse cursor.
#[no_mangle]
pub extern "C" fn CaptureScreenWithOptions(
    output_path: *const u16,
    hide_border: i32,
    hide_cursor: i32,
) -> i32 {
    let Some(path) = (unsafe { wide_to_path(output_path) }) else {
        return CaptureError::InvalidParameter.code();
    };
    let options = CaptureOptions {
        hide_border: hide_border != 0,
        hide_cursor: hide_cursor != 0,
    };
    run_guarded(|| match capture_wgc::capture_to_file(&path, options) {
        Ok(()) => SUCCESS_CODE,
        Err(e) => e.code(),
    })
}

/// Capture the primary monitor into a caller-owned PNG buffer.
///
/// On success `*out_buffer` and `*out_size` describe the buffer and the
/// caller must release it with [`FreeBuffer`]. On any failure both are
/// zeroed and nothing needs releasing.
#[no_mangle]
pub extern "C" fn CaptureScreenToMemory(
    out_buffer: *mut *mut u8,
    out_size: *mut u32,
    hide_border: i32,
    hide_cursor: i32,
) -> i32 {
    if out_buffer.is_null() || out_size.is_null() {
        return CaptureError::InvalidParameter.code();
    }
    unsafe {
        *out_buffer = ptr::null_mut();
        *out_size = 0;
    }
    let options = CaptureOptions {
        hide_border: hide_border != 0,
        hide_cursor: hide_cursor != 0,
    };
    run_guarded(|| match capture_wgc::capture_to_memory(options) {
        Ok(bytes) => {
            let exported = export_buffer(&bytes);
            if exported.is_null() {
                return CaptureError::Unknown.code();
            }
            unsafe {
                *out_buffer = exported;
                *out_size = bytes.len() as u32;
            }
            SUCCESS_CODE
        }
        Err(e) => e.code(),
    })
}

/// Release a buffer returned by [`CaptureScreenToMemory`]. Null is a
/// no-op. Must be called at most once per buffer.
#[no_mangle]
pub extern "C" fn FreeBuffer(buffer: *mut u8) {
    if buffer.is_null() {
        return;
    }
    unsafe {
        let base = buffer.sub(BUFFER_HEADER);
        let len = (base as *const usize).read();
        let layout = Layout::from_size_align_unchecked(
            BUFFER_HEADER + len,
            std::mem::align_of::<usize>(),
        );
        dealloc(base, layout);
    }
}

/// Static description for a wire code; defined default text for values
/// outside the known set. The returned pointer stays valid for the
/// process lifetime and must not be freed.
#[no_mangle]
pub extern "C" fn GetErrorDescription(code: i32) -> *const u16 {
    DESCRIPTIONS_W
        .get(&code)
        .unwrap_or(&DEFAULT_DESCRIPTION_W)
        .as_ptr()
}

/// Static identification string, same lifetime rules as
/// [`GetErrorDescription`].
#[no_mangle]
pub extern "C" fn GetLibraryVersion() -> *const u16 {
    VERSION_W.as_ptr()
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn wide_len(mut p: *const u16) -> usize {
        let mut n = 0;
        while *p != 0 {
            n += 1;
            p = p.add(1);
        }
        n
    }

    #[test]
    fn null_and_empty_paths_rejected() {
        assert_eq!(CaptureScreen(ptr::null()), 97);
        let empty: [u16; 1] = [0];
        assert_eq!(CaptureScreenWithOptions(empty.as_ptr(), 1, 1), 97);
    }

    #[test]
    fn null_out_pointers_rejected() {
        let mut size = 0u32;
        assert_eq!(
            CaptureScreenToMemory(ptr::null_mut(), &mut size, 1, 1),
            97
        );
        let mut buf: *mut u8 = ptr::null_mut();
        assert_eq!(CaptureScreenToMemory(&mut buf, ptr::null_mut(), 1, 1), 97);
    }

    #[test]
    fn descriptions_are_total_and_non_empty() {
        for code in WIRE_CODES {
            let p = GetErrorDescription(code);
            assert!(!p.is_null());
            assert!(unsafe { wide_len(p) } > 0);
        }
        // Undefined value falls back to the default text.
        let undefined = GetErrorDescription(42);
        let default = GetErrorDescription(99);
        let (a, b) = unsafe {
            (
                std::slice::from_raw_parts(undefined, wide_len(undefined)),
                std::slice::from_raw_parts(default, wide_len(default)),
            )
        };
        assert_eq!(a, b);
    }

    #[test]
    fn version_string_is_stable() {
        let p = GetLibraryVersion();
        let s = unsafe { String::from_utf16(std::slice::from_raw_parts(p, wide_len(p))) };
        assert!(s.unwrap().starts_with("SnapCap v"));
    }

    #[test]
    fn free_buffer_handles_null() {
        FreeBuffer(ptr::null_mut());
    }

    #[test]
    fn exported_buffer_round_trips_through_free() {
        let bytes = vec![0x89u8, 0x50, 0x4E, 0x47];
        let p = export_buffer(&bytes);
        assert!(!p.is_null());
        let copied = unsafe { std::slice::from_raw_parts(p, bytes.len()).to_vec() };
        assert_eq!(copied, bytes);
        FreeBuffer(p);
    }

    #[test]
    fn wide_path_round_trip() {
        let encoded = wide("C:\\temp\\shot.png");
        let path = unsafe { wide_to_path(encoded.as_ptr()) }.unwrap();
        assert_eq!(path, PathBuf::from("C:\\temp\\shot.png"));
    }
}
