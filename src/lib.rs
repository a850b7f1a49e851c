//! # blurpass
//!
//! **A two-pass separable Gaussian blur on a small, handle-based render pass engine.**
//!
//! The engine core has three parts:
//!
//! - [`Registry`] owns every driver object behind typed [`handle`]s and destroys them
//!   in reverse creation order at shutdown.
//! - [`RenderPass`] describes one bind-and-draw operation declaratively.
//! - [`PassExecutor`] runs queued passes in a fixed binding order.
//!
//! [`blur::BlurEffect`] composes a horizontal pass into an off-screen frame and a
//! vertical pass from that frame to the screen. [`BlurApp`] wires everything
//! together for a host.
//!
//! Drivers sit behind the [`Backend`] trait: [`GpuBackend`] renders with wgpu,
//! [`SoftwareBackend`] rasterizes on the CPU.
//!
//! ## Quick Start
//!
//! ```no_run
//! use blurpass::{AppConfig, TextureData};
//!
//! fn main() -> anyhow::Result<()> {
//!     let image = TextureData::decode("photo.png")?;
//!     let config = AppConfig::new().size(image.width, image.height).radius(3.0);
//!     blurpass::viewer::run(image, config)
//! }
//! ```

mod app;
pub mod backend;
mod binding;
pub mod blur;
mod error;
mod executor;
pub mod handle;
pub mod logging;
mod pass;
mod registry;
pub mod texture;
pub mod viewer;
mod viewport;

pub use app::{AppConfig, BlurApp};
pub use backend::{Backend, GpuBackend, ProgramDesc, SoftwareBackend};
pub use binding::{AttributeId, BindingSlot, BindingTable, UniformId};
pub use error::{FramebufferStatus, RenderError, ShaderStage};
pub use executor::{DEFAULT_CLEAR_COLOR, FrameStatus, PassExecutor};
pub use handle::{FrameHandle, MeshHandle, ProgramHandle, TextureHandle};
pub use pass::{RenderPass, Target};
pub use registry::Registry;
pub use texture::{PixelFormat, TextureData};
pub use viewport::{SurfaceInfo, Viewport};
