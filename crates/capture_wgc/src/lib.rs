//! Windows Graphics Capture module for SnapCap
//!
//! Captures a single frame of the primary monitor using the WGC API and
//! encodes it as PNG. Each capture call sets up its own device, capture
//! item, frame pool and session, and tears everything down before
//! returning.

pub mod capture;
pub mod d3d11;
pub mod frame;
pub mod monitor;

pub use capture::{capture_to_file, capture_to_memory, CaptureOptions};
pub use d3d11::D3D11Device;
pub use frame::RawFrame;

use thiserror::Error;

/// Closed error taxonomy for the capture pipeline.
///
/// Every public operation maps its failure to exactly one of these; no
/// other error type crosses the crate boundary. The wire values returned
/// by [`CaptureError::code`] are stable and shared with the FFI surface.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    #[error("failed to initialize capture system")]
    InitializationFailed,

    #[error("failed to create capture item for monitor")]
    CaptureItemCreationFailed,

    #[error("failed to start capture session")]
    CaptureSessionFailed,

    #[error("failed to process captured texture")]
    TextureProcessingFailed,

    #[error("failed to save screenshot")]
    FileSaveFailed,

    #[error("timeout waiting for frame capture")]
    TimeoutError,

    #[error("invalid parameter")]
    InvalidParameter,

    #[error("not implemented")]
    NotImplemented,

    #[error("unknown error")]
    Unknown,
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// Wire value reported for a successful operation.
pub const SUCCESS_CODE: i32 = 0;

/// All wire values a capture operation can report, success included.
pub const WIRE_CODES: [i32; 10] = [0, 1, 2, 3, 4, 5, 6, 97, 98, 99];

impl CaptureError {
    /// Stable wire value for this error. Must not change: managed callers
    /// switch on the raw integer.
    pub const fn code(self) -> i32 {
        match self {
            CaptureError::InitializationFailed => 1,
            CaptureError::CaptureItemCreationFailed => 2,
            CaptureError::CaptureSessionFailed => 3,
            CaptureError::TextureProcessingFailed => 4,
            CaptureError::FileSaveFailed => 5,
            CaptureError::TimeoutError => 6,
            CaptureError::InvalidParameter => 97,
            CaptureError::NotImplemented => 98,
            CaptureError::Unknown => 99,
        }
    }
}

/// Human-readable description for a wire value. Total: values outside the
/// known set get the default text rather than an error.
pub fn describe_code(code: i32) -> &'static str {
    match code {
        0 => "Operation completed successfully",
        1 => "Failed to initialize capture system",
        2 => "Failed to create capture item for monitor",
        3 => "Failed to start capture session",
        4 => "Failed to process captured texture",
        5 => "Failed to save screenshot to file",
        6 => "Timeout waiting for frame capture",
        97 => "Invalid parameter provided",
        98 => "Feature not yet implemented",
        _ => "Unknown error occurred",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_stable() {
        assert_eq!(CaptureError::InitializationFailed.code(), 1);
        assert_eq!(CaptureError::CaptureItemCreationFailed.code(), 2);
        assert_eq!(CaptureError::CaptureSessionFailed.code(), 3);
        assert_eq!(CaptureError::TextureProcessingFailed.code(), 4);
        assert_eq!(CaptureError::FileSaveFailed.code(), 5);
        assert_eq!(CaptureError::TimeoutError.code(), 6);
        assert_eq!(CaptureError::InvalidParameter.code(), 97);
        assert_eq!(CaptureError::NotImplemented.code(), 98);
        assert_eq!(CaptureError::Unknown.code(), 99);
        assert_eq!(SUCCESS_CODE, 0);
    }

    #[test]
    fn describe_code_is_total() {
        for code in WIRE_CODES {
            assert!(!describe_code(code).is_empty());
        }
        // Values outside the known set fall back to the default text.
        assert_eq!(describe_code(42), describe_code(99));
        assert_eq!(describe_code(-1), describe_code(99));
    }

    #[test]
    fn wire_codes_cover_every_variant() {
        let variants = [
            CaptureError::InitializationFailed,
            CaptureError::CaptureItemCreationFailed,
            CaptureError::CaptureSessionFailed,
            CaptureError::TextureProcessingFailed,
            CaptureError::FileSaveFailed,
            CaptureError::TimeoutError,
            CaptureError::InvalidParameter,
            CaptureError::NotImplemented,
            CaptureError::Unknown,
        ];
        for v in variants {
            assert!(WIRE_CODES.contains(&v.code()));
        }
    }
}
