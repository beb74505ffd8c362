//! D3D11 device management

use windows::{
    core::{Interface, Result},
    Graphics::DirectX::Direct3D11::IDirect3DDevice,
    Win32::Graphics::{
        Direct3D::{
            D3D_DRIVER_TYPE_HARDWARE, D3D_FEATURE_LEVEL, D3D_FEATURE_LEVEL_10_0,
            D3D_FEATURE_LEVEL_10_1, D3D_FEATURE_LEVEL_11_0, D3D_FEATURE_LEVEL_11_1,
            D3D_FEATURE_LEVEL_9_1, D3D_FEATURE_LEVEL_9_2, D3D_FEATURE_LEVEL_9_3,
        },
        Direct3D11::{
            D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext,
            D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_SDK_VERSION,
        },
        Dxgi::IDXGIDevice,
    },
    Win32::System::WinRT::Direct3D11::{
        CreateDirect3D11DeviceFromDXGIDevice, IDirect3DDxgiInterfaceAccess,
    },
};

/// Feature levels to request, most capable first. The runtime grants the
/// first one the adapter supports.
const FEATURE_LEVELS: [D3D_FEATURE_LEVEL; 7] = [
    D3D_FEATURE_LEVEL_11_1,
    D3D_FEATURE_LEVEL_11_0,
    D3D_FEATURE_LEVEL_10_1,
    D3D_FEATURE_LEVEL_10_0,
    D3D_FEATURE_LEVEL_9_3,
    D3D_FEATURE_LEVEL_9_2,
    D3D_FEATURE_LEVEL_9_1,
];

/// D3D11 device wrapper
///
/// Holds the raw device/context pair plus the WinRT `IDirect3DDevice` view
/// over the same device that the frame pool requires. No second device is
/// created by the wrap.
pub struct D3D11Device {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    d3d_device: IDirect3DDevice,
}

impl D3D11Device {
    /// Create a hardware device with BGRA support.
    pub fn new() -> Result<Self> {
        unsafe {
            let mut device: Option<ID3D11Device> = None;
            let mut context: Option<ID3D11DeviceContext> = None;
            let mut granted = D3D_FEATURE_LEVEL::default();

            D3D11CreateDevice(
                None,
                D3D_DRIVER_TYPE_HARDWARE,
                None,
                D3D11_CREATE_DEVICE_BGRA_SUPPORT,
                Some(&FEATURE_LEVELS),
                D3D11_SDK_VERSION,
                Some(&mut device),
                Some(&mut granted),
                Some(&mut context),
            )?;

            let device = device.unwrap();
            let context = context.unwrap();
            tracing::info!("D3D11 device created (feature level {:#x})", granted.0);

            // Get IDirect3DDevice for WGC
            let dxgi_device: IDXGIDevice = device.cast()?;
            let inspectable = CreateDirect3D11DeviceFromDXGIDevice(&dxgi_device)?;
            let d3d_device: IDirect3DDevice = inspectable.cast()?;

            Ok(Self {
                device,
                context,
                d3d_device,
            })
        }
    }

    /// Get the D3D11 device
    pub fn device(&self) -> &ID3D11Device {
        &self.device
    }

    /// Get the device context
    pub fn context(&self) -> &ID3D11DeviceContext {
        &self.context
    }

    /// Get the WinRT Direct3D device
    pub fn d3d_device(&self) -> &IDirect3DDevice {
        &self.d3d_device
    }

    /// Get the underlying D3D11 interface from a WinRT surface wrapper
    pub fn get_dxgi_interface<T: Interface>(wrapper: &impl Interface) -> Result<T> {
        unsafe {
            let access: IDirect3DDxgiInterfaceAccess = wrapper.cast()?;
            access.GetInterface()
        }
    }
}

// SAFETY: D3D11 devices created without D3D11_CREATE_DEVICE_SINGLETHREADED
// are free-threaded, and the WinRT view wraps the same device; the frame
// handler requires its captures to be Send.
unsafe impl Send for D3D11Device {}

impl Clone for D3D11Device {
    fn clone(&self) -> Self {
        Self {
            device: self.device.clone(),
            context: self.context.clone(),
            d3d_device: self.d3d_device.clone(),
        }
    }
}
