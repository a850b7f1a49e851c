//! Device, queue and the on-screen target.

use std::sync::Arc;

use winit::window::Window;

use crate::error::RenderError;

/// Format of the owned screen texture of a headless context.
pub const HEADLESS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

enum Screen {
    Window {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Headless {
        texture: wgpu::Texture,
    },
}

/// What to do after the swap chain refused a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// The surface was reconfigured; rendering resumes next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Unrecoverable, usually out of memory.
    Fatal,
}

/// Acquired screen image of one frame.
pub(crate) struct ScreenImage {
    surface_texture: Option<wgpu::SurfaceTexture>,
    pub view: wgpu::TextureView,
}

impl ScreenImage {
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}

/// wgpu device and queue plus the screen they draw to.
///
/// The screen is either a window surface or, for headless use, an owned texture.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    screen: Screen,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
}

impl GpuContext {
    /// Creates a context presenting to `window`.
    ///
    /// Picks a non-sRGB surface format when one is offered, so blending and filtering
    /// operate on the stored values the way a default GL framebuffer does.
    pub fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::Device(format!("failed to create surface: {e}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|e| RenderError::Device(format!("no suitable GPU adapter: {e}")))?;
        let (device, queue) = request_device(&adapter)?;

        let caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&caps.formats)
            .ok_or_else(|| RenderError::Device("surface reports no formats".to_string()))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!(
            "gpu context ready: {} ({:?}), surface {format:?}",
            adapter.get_info().name,
            adapter.get_info().backend
        );

        Ok(Self {
            device,
            queue,
            width: config.width,
            height: config.height,
            screen: Screen::Window { surface, config },
            format,
        })
    }

    /// Creates a context whose screen is an owned `width × height` texture.
    pub fn headless(width: u32, height: u32) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| RenderError::Device(format!("no suitable GPU adapter: {e}")))?;
        let (device, queue) = request_device(&adapter)?;

        let (width, height) = (width.max(1), height.max(1));
        let texture = screen_texture(&device, width, height);
        Ok(Self {
            device,
            queue,
            screen: Screen::Headless { texture },
            format: HEADLESS_FORMAT,
            width,
            height,
        })
    }

    /// Resizes the screen. Zero sizes are ignored, as happens while minimized.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
        match &mut self.screen {
            Screen::Window { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(&self.device, config);
            }
            Screen::Headless { texture } => {
                *texture = screen_texture(&self.device, width, height);
            }
        }
    }

    /// Color format of the screen and of every frame.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Copies the headless screen back to the CPU as RGBA8, bottom row first.
    ///
    /// Fails for window surfaces, which cannot be read after presentation.
    pub fn read_screen_rgba8(&self) -> Result<Vec<u8>, RenderError> {
        let Screen::Headless { texture } = &self.screen else {
            return Err(RenderError::Device(
                "only a headless screen can be read back".to_string(),
            ));
        };
        let (width, height) = (self.width, self.height);
        let padded_row = padded_bytes_per_row(width);

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Screen Readback"),
            size: padded_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Screen Readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| RenderError::Device(format!("failed to wait for readback: {e}")))?;
        rx.recv()
            .map_err(|_| RenderError::Device("readback was cancelled".to_string()))?
            .map_err(|e| RenderError::Device(format!("failed to map readback: {e}")))?;

        let mapped = slice.get_mapped_range();
        let rgba = unpad_rows_bottom_up(&mapped, width, height, padded_row);
        drop(mapped);
        staging.unmap();
        Ok(rgba)
    }

    /// Acquires the screen image for a new frame.
    ///
    /// `Ok(None)` means the frame must be skipped.
    pub(crate) fn acquire(&mut self) -> Result<Option<ScreenImage>, RenderError> {
        let result = match &self.screen {
            Screen::Headless { texture } => {
                return Ok(Some(ScreenImage {
                    surface_texture: None,
                    view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
                }));
            }
            Screen::Window { surface, .. } => surface.get_current_texture(),
        };

        match result {
            Ok(frame) => {
                let view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(Some(ScreenImage {
                    surface_texture: Some(frame),
                    view,
                }))
            }
            Err(err) => match self.handle_surface_error(&err) {
                SurfaceErrorAction::Fatal => Err(RenderError::Surface(err.to_string())),
                action => {
                    log::debug!("skipping frame after surface error {err:?}: {action:?}");
                    Ok(None)
                }
            },
        }
    }

    /// Converts a swap chain error into an action, reconfiguring when that helps.
    pub fn handle_surface_error(&mut self, err: &wgpu::SurfaceError) -> SurfaceErrorAction {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                if let Screen::Window { surface, config } = &self.screen {
                    surface.configure(&self.device, config);
                }
                SurfaceErrorAction::Reconfigured
            }
            wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
            wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => {
                SurfaceErrorAction::SkipFrame
            }
        }
    }
}

fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue), RenderError> {
    pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("blurpass device"),
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::default(),
        memory_hints: Default::default(),
        trace: Default::default(),
        experimental_features: Default::default(),
    }))
    .map_err(|e| RenderError::Device(format!("failed to create device: {e}")))
}

fn screen_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Headless Screen"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: HEADLESS_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

/// Row pitch of an RGBA8 copy, padded to the copy alignment.
fn padded_bytes_per_row(width: u32) -> u32 {
    (width * 4).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

/// Strips row padding and reorders top-down texture rows bottom row first.
fn unpad_rows_bottom_up(data: &[u8], width: u32, height: u32, padded_row: u32) -> Vec<u8> {
    let row = width as usize * 4;
    let mut rgba = Vec::with_capacity(row * height as usize);
    for y in (0..height as usize).rev() {
        let start = y * padded_row as usize;
        rgba.extend_from_slice(&data[start..start + row]);
    }
    rgba
}

/// Prefers a linear 8-bit format, falling back to whatever the surface lists first.
pub(crate) fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
) -> Option<wgpu::TextureFormat> {
    let preferred = [
        wgpu::TextureFormat::Bgra8Unorm,
        wgpu::TextureFormat::Rgba8Unorm,
    ];
    preferred
        .into_iter()
        .find(|f| formats.contains(f))
        .or_else(|| formats.iter().find(|f| !f.is_srgb()).copied())
        .or_else(|| formats.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat;

    #[test]
    fn linear_formats_win_over_srgb() {
        let formats = [TextureFormat::Bgra8UnormSrgb, TextureFormat::Bgra8Unorm];
        assert_eq!(choose_surface_format(&formats), Some(TextureFormat::Bgra8Unorm));

        let formats = [TextureFormat::Rgba8UnormSrgb, TextureFormat::Rgba16Float];
        assert_eq!(choose_surface_format(&formats), Some(TextureFormat::Rgba16Float));
    }

    #[test]
    fn readback_rows_are_aligned() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
    }

    #[test]
    fn readback_drops_padding_and_flips_rows() {
        let padded = padded_bytes_per_row(2) as usize;
        let mut data = vec![0xee; padded * 3];
        for y in 0..3 {
            for byte in 0..8 {
                data[y * padded + byte] = (y * 10 + byte) as u8;
            }
        }

        let rgba = unpad_rows_bottom_up(&data, 2, 3, padded as u32);
        assert_eq!(rgba.len(), 2 * 3 * 4);
        assert_eq!(&rgba[..8], &[20, 21, 22, 23, 24, 25, 26, 27]);
        assert_eq!(&rgba[16..], &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert!(!rgba.contains(&0xee));
    }

    #[test]
    fn srgb_only_surfaces_still_get_a_format() {
        let formats = [TextureFormat::Bgra8UnormSrgb];
        assert_eq!(choose_surface_format(&formats), Some(TextureFormat::Bgra8UnormSrgb));
        assert_eq!(choose_surface_format(&[]), None);
    }
}
