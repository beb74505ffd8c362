//! Primary monitor resolution

use windows::{
    core::Result,
    Graphics::Capture::GraphicsCaptureItem,
    Win32::Foundation::POINT,
    Win32::Graphics::Gdi::{MonitorFromPoint, HMONITOR, MONITOR_DEFAULTTOPRIMARY},
    Win32::System::WinRT::Graphics::Capture::IGraphicsCaptureItemInterop,
};

/// Monitor containing the origin of the virtual desktop.
pub fn primary_monitor() -> HMONITOR {
    unsafe { MonitorFromPoint(POINT { x: 0, y: 0 }, MONITOR_DEFAULTTOPRIMARY) }
}

/// Build a capture item for a monitor via the interop factory.
///
/// Fails if Graphics Capture is unavailable, e.g. disabled by policy.
pub fn create_capture_item(monitor: HMONITOR) -> Result<GraphicsCaptureItem> {
    unsafe {
        let interop: IGraphicsCaptureItemInterop =
            windows::core::factory::<GraphicsCaptureItem, IGraphicsCaptureItemInterop>()?;
        interop.CreateForMonitor(monitor)
    }
}
