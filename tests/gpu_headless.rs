//! Blur through wgpu into an offscreen screen. Skipped when no adapter is available.

use blurpass::{
    AppConfig, Backend, BlurApp, FrameStatus, FramebufferStatus, GpuBackend, RenderError,
    SurfaceInfo, TextureData,
};

fn headless(width: u32, height: u32) -> Option<GpuBackend> {
    match GpuBackend::headless(width, height) {
        Ok(backend) => Some(backend),
        Err(err) => {
            eprintln!("skipping, no GPU: {err}");
            None
        }
    }
}

#[test]
fn constant_image_reads_back_unchanged() {
    let Some(backend) = headless(9, 5) else {
        return;
    };
    let image = TextureData::solid_rgb(9, 5, [120, 60, 30]);
    let mut app = BlurApp::init(
        backend,
        SurfaceInfo::new(9, 5, 1.0),
        &image,
        &AppConfig::new().radius(3.0),
    )
    .unwrap();
    assert_eq!(app.render().unwrap(), FrameStatus::Rendered);

    let rgba = app.shutdown().read_screen_rgba8().unwrap();
    assert_eq!(rgba.len(), 9 * 5 * 4);
    for (i, pixel) in rgba.chunks_exact(4).enumerate() {
        for (c, expected) in [120u8, 60, 30, 255].into_iter().enumerate() {
            assert!(
                pixel[c].abs_diff(expected) <= 2,
                "pixel {i} channel {c}: {}",
                pixel[c]
            );
        }
    }
}

#[test]
fn oversized_frame_is_unsupported() {
    let Some(mut backend) = headless(4, 4) else {
        return;
    };
    let max = backend.context().device.limits().max_texture_dimension_2d;

    let result = backend.create_frame(max + 1, 4);
    assert!(matches!(
        result,
        Err(RenderError::FramebufferIncomplete {
            status: FramebufferStatus::Unsupported
        })
    ));
    assert!(backend.create_frame(4, 4).is_ok());
}
