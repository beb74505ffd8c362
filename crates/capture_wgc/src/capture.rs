//! Single-shot capture orchestration
//!
//! Sequences device setup, capture item resolution, frame pool/session
//! construction, and the bounded wait for the one frame this pipeline is
//! built to deliver. WGC hands frames to a callback; the public functions
//! here bridge that to a plain synchronous return.
//!
//! The waiter does not block on the condition variable alone: frame
//! delivery for a same-thread frame pool rides on Win32 message dispatch,
//! so the wait loop drains the thread's message queue between timed flag
//! checks. A pure blocking wait could starve the callback.

use crate::{frame, monitor, CaptureError, CaptureResult, D3D11Device, RawFrame};
use parking_lot::{Condvar, Mutex};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use windows::{
    core::IInspectable,
    Foundation::TypedEventHandler,
    Graphics::Capture::{Direct3D11CaptureFrame, Direct3D11CaptureFramePool},
    Graphics::DirectX::DirectXPixelFormat,
    Win32::System::WinRT::{RoInitialize, RO_INIT_SINGLETHREADED},
    Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE,
    },
};

/// Wall-clock budget for frame delivery.
const FRAME_TIMEOUT: Duration = Duration::from_secs(10);
/// Cadence of the flag re-check / message pump interleave.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Capture session options. Both toggles are best-effort: a platform that
/// does not support one keeps its default and the capture proceeds.
#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
    pub hide_border: bool,
    pub hide_cursor: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            hide_border: true,
            hide_cursor: true,
        }
    }
}

/// Where the encoded PNG goes.
enum OutputSink {
    File(PathBuf),
    Memory,
}

/// Handshake between the frame callback and the waiting caller. The only
/// state the two execution contexts share.
#[derive(Default)]
struct Completion {
    state: Mutex<CompletionState>,
    signal: Condvar,
}

#[derive(Default)]
struct CompletionState {
    done: bool,
    outcome: Option<CaptureResult<Option<Vec<u8>>>>,
}

impl Completion {
    fn is_done(&self) -> bool {
        self.state.lock().done
    }

    /// Record the first outcome and wake the waiter. Later frames are
    /// ignored; exactly one is consumed per invocation.
    fn complete(&self, outcome: CaptureResult<Option<Vec<u8>>>) {
        let mut state = self.state.lock();
        if state.done {
            return;
        }
        state.outcome = Some(outcome);
        state.done = true;
        self.signal.notify_one();
    }

    /// Wait for completion under a wall-clock budget, draining the calling
    /// thread's message queue between timed checks.
    fn wait(&self, timeout: Duration) -> CaptureResult<Option<Vec<u8>>> {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut state = self.state.lock();
                if state.done {
                    return state.outcome.take().unwrap_or(Err(CaptureError::Unknown));
                }
            }
            if Instant::now() >= deadline {
                error!("no frame received within {:?}", timeout);
                return Err(CaptureError::TimeoutError);
            }

            pump_pending_messages();

            let mut state = self.state.lock();
            if !state.done {
                self.signal.wait_for(&mut state, POLL_INTERVAL);
            }
        }
    }
}

/// Capture the primary monitor and write a PNG to `path`.
///
/// An empty path is rejected up front, before any device or session is
/// acquired.
pub fn capture_to_file(path: &Path, options: CaptureOptions) -> CaptureResult<()> {
    if path.as_os_str().is_empty() {
        return Err(CaptureError::InvalidParameter);
    }
    run_capture(OutputSink::File(path.to_path_buf()), options).map(|_| ())
}

/// Capture the primary monitor and return the PNG bytes.
pub fn capture_to_memory(options: CaptureOptions) -> CaptureResult<Vec<u8>> {
    run_capture(OutputSink::Memory, options)?.ok_or(CaptureError::Unknown)
}

/// One full pass of the capture state machine. Every resource acquired
/// here is released before this returns; nothing is cached across calls.
fn run_capture(sink: OutputSink, options: CaptureOptions) -> CaptureResult<Option<Vec<u8>>> {
    init_apartment();

    info!("initializing capture system");
    let device = D3D11Device::new().map_err(|e| {
        error!("device creation failed: {e}");
        CaptureError::InitializationFailed
    })?;

    let item = monitor::create_capture_item(monitor::primary_monitor()).map_err(|e| {
        error!("capture item creation failed: {e}");
        CaptureError::CaptureItemCreationFailed
    })?;
    let size = item.Size().map_err(|e| {
        error!("capture item size query failed: {e}");
        CaptureError::CaptureItemCreationFailed
    })?;
    info!("capture item created ({}x{})", size.Width, size.Height);

    // Single-slot pool: this pipeline consumes exactly one frame.
    let pool = Direct3D11CaptureFramePool::Create(
        device.d3d_device(),
        DirectXPixelFormat::B8G8R8A8UIntNormalized,
        1,
        size,
    )
    .map_err(|e| {
        error!("frame pool creation failed: {e}");
        CaptureError::CaptureSessionFailed
    })?;

    let session = pool.CreateCaptureSession(&item).map_err(|e| {
        error!("capture session creation failed: {e}");
        CaptureError::CaptureSessionFailed
    })?;

    // Both toggles are capability probes, not hard requirements.
    if options.hide_cursor {
        if let Err(e) = session.SetIsCursorCaptureEnabled(false) {
            info!("cursor toggle unsupported, capturing with default: {e}");
        }
    }
    if options.hide_border {
        if let Err(e) = session.SetIsBorderRequired(false) {
            info!("border toggle unsupported on this Windows build: {e}");
        }
    }

    let completion = Arc::new(Completion::default());
    let handler_completion = Arc::clone(&completion);
    let handler_device = device.clone();

    let registered = pool.FrameArrived(&TypedEventHandler::new(
        move |pool_ref: &Option<Direct3D11CaptureFramePool>, _: &Option<IInspectable>| {
            let Some(pool_ref) = pool_ref else {
                return Ok(());
            };
            if handler_completion.is_done() {
                return Ok(());
            }
            let frame = match pool_ref.TryGetNextFrame() {
                Ok(f) => f,
                Err(e) => {
                    error!("no frame available: {e}");
                    return Ok(());
                }
            };
            // Materialization and encoding run here, in the callback's
            // execution context; the waiter only observes the outcome.
            let outcome = process_frame(&handler_device, &frame, &sink);
            handler_completion.complete(outcome);
            Ok(())
        },
    ));

    let result = match registered {
        Err(e) => {
            error!("frame handler registration failed: {e}");
            Err(CaptureError::CaptureSessionFailed)
        }
        Ok(_token) => match session.StartCapture() {
            Err(e) => {
                error!("StartCapture failed: {e}");
                Err(CaptureError::CaptureSessionFailed)
            }
            Ok(()) => {
                info!("capture session started, waiting for frame");
                completion.wait(FRAME_TIMEOUT)
            }
        },
    };

    // Mandatory release, on every path: success, failure and timeout.
    if let Err(e) = session.Close() {
        error!("session close failed: {e}");
    }
    if let Err(e) = pool.Close() {
        error!("frame pool close failed: {e}");
    }

    if result.is_ok() {
        info!("capture completed");
    }
    result
}

/// Materialize the delivered frame and push it through the encoder.
fn process_frame(
    device: &D3D11Device,
    frame: &Direct3D11CaptureFrame,
    sink: &OutputSink,
) -> CaptureResult<Option<Vec<u8>>> {
    let surface = frame.Surface().map_err(|e| {
        error!("frame surface unavailable: {e}");
        CaptureError::TextureProcessingFailed
    })?;

    let raw: RawFrame = frame::materialize(device, &surface).map_err(|e| {
        error!("frame readback failed: {e}");
        CaptureError::TextureProcessingFailed
    })?;

    match sink {
        OutputSink::File(path) => {
            encode::write_png(&raw.data, raw.width, raw.height, path)
                .map(|_| None)
                .map_err(|e| {
                    error!("saving screenshot failed: {e}");
                    CaptureError::FileSaveFailed
                })
        }
        OutputSink::Memory => encode::encode_png(&raw.data, raw.width, raw.height)
            .map(Some)
            .map_err(|e| {
                error!("encoding screenshot failed: {e}");
                CaptureError::FileSaveFailed
            }),
    }
}

/// WGC needs an initialized apartment on the calling thread. A thread that
/// already has one (either mode) is fine.
fn init_apartment() {
    unsafe {
        let _ = RoInitialize(RO_INIT_SINGLETHREADED);
    }
}

/// Non-blocking drain of the calling thread's Win32 message queue.
fn pump_pending_messages() {
    unsafe {
        let mut msg = MSG::default();
        while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}
