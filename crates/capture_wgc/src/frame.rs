//! GPU frame readback
//!
//! A delivered frame lives in GPU memory. To get at the pixels we negotiate
//! the `ID3D11Texture2D` behind the WinRT surface, blit it into a staging
//! texture the CPU may read, map that, and copy the rows out.

use crate::D3D11Device;
use windows::{
    core::Result,
    Graphics::DirectX::Direct3D11::IDirect3DSurface,
    Win32::Graphics::Direct3D11::{
        ID3D11Texture2D, D3D11_CPU_ACCESS_READ, D3D11_MAPPED_SUBRESOURCE, D3D11_MAP_READ,
        D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING,
    },
};

/// Pixels of one captured frame, tightly packed BGRA8 rows.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Copy a GPU-resident frame surface into CPU memory.
///
/// Blocking: the `Map` call synchronizes with the GPU copy. The returned
/// buffer owns its pixels, so the caller may release the frame object as
/// soon as this returns.
pub fn materialize(device: &D3D11Device, surface: &IDirect3DSurface) -> Result<RawFrame> {
    unsafe {
        let texture: ID3D11Texture2D = D3D11Device::get_dxgi_interface(surface)?;

        let mut desc = D3D11_TEXTURE2D_DESC::default();
        texture.GetDesc(&mut desc);
        let (width, height) = (desc.Width, desc.Height);
        tracing::info!("processing frame texture ({}x{})", width, height);

        // Staging copy: same size/format, CPU read access, no GPU binding
        desc.Usage = D3D11_USAGE_STAGING;
        desc.CPUAccessFlags = D3D11_CPU_ACCESS_READ.0 as u32;
        desc.BindFlags = 0;
        desc.MiscFlags = 0;

        let mut staging: Option<ID3D11Texture2D> = None;
        device.device().CreateTexture2D(&desc, None, Some(&mut staging))?;
        let staging = staging.unwrap();

        device.context().CopyResource(&staging, &texture);

        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        device
            .context()
            .Map(&staging, 0, D3D11_MAP_READ, 0, Some(&mut mapped))?;

        // Rows may carry padding (RowPitch >= width * 4); copy them tight.
        let row_pitch = mapped.RowPitch as usize;
        let row_bytes = width as usize * 4;
        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for y in 0..height as usize {
            let src = std::slice::from_raw_parts(
                (mapped.pData as *const u8).add(y * row_pitch),
                row_bytes,
            );
            data.extend_from_slice(src);
        }

        device.context().Unmap(&staging, 0);

        Ok(RawFrame {
            width,
            height,
            data,
        })
    }
}
