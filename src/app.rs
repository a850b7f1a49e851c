//! Host-facing lifecycle of the blur over any [`Backend`].
//!
//! The host owns the window (or none at all) and drives [`BlurApp`]:
//!
//! ```no_run
//! use blurpass::{AppConfig, BlurApp, SoftwareBackend, SurfaceInfo, TextureData};
//! use blurpass::blur::software::shader_library;
//!
//! let image = TextureData::solid_rgb(64, 64, [200, 40, 40]);
//! let surface = SurfaceInfo::new(64, 64, 1.0);
//! let backend = SoftwareBackend::new(shader_library(), 64, 64);
//!
//! let mut app = BlurApp::init(backend, surface, &image, &AppConfig::new())?;
//! app.render()?;
//! let backend = app.shutdown();
//! # Ok::<(), blurpass::RenderError>(())
//! ```

use crate::backend::Backend;
use crate::blur::{BlurEffect, BlurMode, BlurSettings};
use crate::error::RenderError;
use crate::executor::{DEFAULT_CLEAR_COLOR, FrameStatus, PassExecutor};
use crate::registry::Registry;
use crate::texture::TextureData;
use crate::viewport::SurfaceInfo;

/// Window and effect configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub blur: BlurSettings,
    pub clear_color: [f32; 4],
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Blur".to_string(),
            width: 800,
            height: 600,
            blur: BlurSettings::default(),
            clear_color: DEFAULT_CLEAR_COLOR,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn radius(mut self, radius: f32) -> Self {
        self.blur.radius = radius;
        self
    }

    /// Number of taps per side, center included.
    pub fn kernel(mut self, kernel: usize) -> Self {
        self.blur.kernel = kernel;
        self
    }

    pub fn mode(mut self, mode: BlurMode) -> Self {
        self.blur.mode = mode;
        self
    }

    pub fn clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }
}

/// The registry, the executor and the blur, wired together.
pub struct BlurApp<B: Backend> {
    registry: Registry<B>,
    executor: PassExecutor,
    effect: BlurEffect,
    surface: SurfaceInfo,
}

impl<B: Backend> BlurApp<B> {
    /// Creates every resource the blur needs.
    ///
    /// Fails on the first shader or framebuffer error; nothing is retried.
    pub fn init(
        backend: B,
        surface: SurfaceInfo,
        image: &TextureData,
        config: &AppConfig,
    ) -> Result<Self, RenderError> {
        let mut registry = Registry::new(backend);
        let viewport = surface.screen_viewport();
        registry.backend_mut().resize(viewport.width, viewport.height);

        let effect = BlurEffect::new(&mut registry, image, config.blur)?;
        let executor = PassExecutor::new().with_clear_color(config.clear_color);

        Ok(Self {
            registry,
            executor,
            effect,
            surface,
        })
    }

    /// Applies a new window size or pixel density.
    pub fn resize(&mut self, surface: SurfaceInfo) {
        self.surface = surface;
        let viewport = surface.screen_viewport();
        log::debug!("screen resized to {}x{}", viewport.width, viewport.height);
        self.registry
            .backend_mut()
            .resize(viewport.width, viewport.height);
    }

    pub fn surface(&self) -> SurfaceInfo {
        self.surface
    }

    pub fn effect(&self) -> &BlurEffect {
        &self.effect
    }

    pub fn effect_mut(&mut self) -> &mut BlurEffect {
        &mut self.effect
    }

    pub fn registry(&self) -> &Registry<B> {
        &self.registry
    }

    /// Queues and executes this frame's passes without presenting.
    pub fn submit_frame(&mut self) -> Result<FrameStatus, RenderError> {
        self.effect.submit(&mut self.executor);
        self.executor.flush(&mut self.registry, &self.surface)
    }

    pub fn present(&mut self) {
        self.registry.backend_mut().present();
    }

    /// [`submit_frame`](Self::submit_frame), then [`present`](Self::present) unless
    /// the frame was skipped.
    pub fn render(&mut self) -> Result<FrameStatus, RenderError> {
        let status = self.submit_frame()?;
        if status == FrameStatus::Rendered {
            self.present();
        }
        Ok(status)
    }

    /// Destroys every resource and returns the backend.
    pub fn shutdown(self) -> B {
        self.registry.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::blur::software::shader_library;

    fn app(config: &AppConfig) -> BlurApp<SoftwareBackend> {
        let image = TextureData::solid_rgb(8, 4, [255, 0, 0]);
        let backend = SoftwareBackend::new(shader_library(), 1, 1);
        BlurApp::init(backend, SurfaceInfo::new(8, 4, 1.0), &image, config).unwrap()
    }

    #[test]
    fn config_builder_sets_blur_settings() {
        let config = AppConfig::new()
            .title("t")
            .size(10, 20)
            .radius(2.5)
            .kernel(7)
            .mode(BlurMode::Original);
        assert_eq!(config.title, "t");
        assert_eq!((config.width, config.height), (10, 20));
        assert_eq!(config.blur.radius, 2.5);
        assert_eq!(config.blur.kernel, 7);
        assert_eq!(config.blur.mode, BlurMode::Original);
        assert_eq!(config.clear_color, DEFAULT_CLEAR_COLOR);
    }

    #[test]
    fn init_sizes_the_screen_to_the_surface() {
        let mut app = app(&AppConfig::new());
        assert_eq!(app.registry().backend().screen().width(), 8);

        app.resize(SurfaceInfo::new(8, 4, 2.0));
        assert_eq!(app.registry().backend().screen().width(), 16);
        assert_eq!(app.registry().backend().screen().height(), 8);
    }

    #[test]
    fn render_and_shutdown_release_everything() {
        let mut app = app(&AppConfig::new().kernel(3));
        assert_eq!(app.render().unwrap(), FrameStatus::Rendered);
        assert_eq!(app.effect().kernel(), 3);

        let backend = app.shutdown();
        assert_eq!(backend.live_objects(), 0);
    }
}
