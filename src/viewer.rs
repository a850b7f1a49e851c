//! Windowed viewer driving [`BlurApp`] with [`GpuBackend`].
//!
//! Keys: Space toggles between the blurred and the original image, Up and Down
//! change the radius, Escape quits.

use std::sync::Arc;

use anyhow::Context;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::app::{AppConfig, BlurApp};
use crate::backend::GpuBackend;
use crate::error::RenderError;
use crate::executor::FrameStatus;
use crate::texture::TextureData;
use crate::viewport::SurfaceInfo;

/// Radius change per Up/Down press.
pub const RADIUS_STEP: f32 = 0.5;

/// Opens a window showing `image` and runs until it is closed.
pub fn run(image: TextureData, config: AppConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut viewer = Viewer::Pending {
        image,
        config,
        error: None,
    };
    event_loop
        .run_app(&mut viewer)
        .context("event loop terminated abnormally")?;

    match viewer {
        Viewer::Failed(err) => Err(err),
        Viewer::Pending {
            error: Some(err), ..
        } => Err(err),
        Viewer::Running { app, .. } => {
            app.shutdown();
            Ok(())
        }
        _ => Ok(()),
    }
}

enum Viewer {
    Pending {
        image: TextureData,
        config: AppConfig,
        error: Option<anyhow::Error>,
    },
    Running {
        window: Arc<Window>,
        app: BlurApp<GpuBackend>,
    },
    Failed(anyhow::Error),
}

impl Viewer {
    fn start(
        event_loop: &ActiveEventLoop,
        image: &TextureData,
        config: &AppConfig,
    ) -> anyhow::Result<(Arc<Window>, BlurApp<GpuBackend>)> {
        let attributes = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(LogicalSize::new(config.width, config.height));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("failed to create window")?,
        );

        let backend = GpuBackend::new(window.clone()).context("failed to initialize wgpu")?;
        let app = BlurApp::init(backend, surface_info(&window), image, config)
            .context("failed to create blur resources")?;
        Ok((window, app))
    }
}

/// Backbuffer size and density of `window`.
fn surface_info(window: &Window) -> SurfaceInfo {
    let size = window.inner_size();
    SurfaceInfo::from_physical(size.width, size.height, window.scale_factor() as f32)
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Viewer::Pending { image, config, error } = self else {
            return;
        };
        match Viewer::start(event_loop, image, config) {
            Ok((window, app)) => {
                window.request_redraw();
                *self = Viewer::Running { window, app };
            }
            Err(err) => {
                log::error!("{err:#}");
                *error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Viewer::Running { window, app } = self else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                app.resize(surface_info(window));
                window.request_redraw();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                let effect = app.effect_mut();
                match code {
                    KeyCode::Space => {
                        let mode = effect.mode().toggled();
                        log::info!("showing {mode:?}");
                        effect.set_mode(mode);
                    }
                    KeyCode::ArrowUp => effect.set_radius(effect.radius() + RADIUS_STEP),
                    KeyCode::ArrowDown => effect.set_radius(effect.radius() - RADIUS_STEP),
                    KeyCode::Escape => event_loop.exit(),
                    _ => return,
                }
                window.request_redraw();
            }
            WindowEvent::RedrawRequested => match app.render() {
                Ok(FrameStatus::Rendered) => {}
                Ok(FrameStatus::Skipped) => window.request_redraw(),
                Err(err @ RenderError::Surface(_)) => {
                    log::error!("{err}");
                    let err = anyhow::Error::new(err).context("rendering stopped");
                    *self = Viewer::Failed(err);
                    event_loop.exit();
                }
                Err(err) => log::error!("frame failed: {err}"),
            },
            _ => {}
        }
    }
}
