//! Two-pass separable Gaussian blur.
//!
//! The horizontal program reads the source texture and writes an off-screen frame the
//! size of the image; the vertical program reads that frame and writes the screen.
//! Both passes share one full-screen quad and sample with clamp-to-edge addressing.
//!
//! The kernel is computed per fragment from the `uRadius` uniform and the `KERNEL`
//! define:
//!
//! ```text
//! weight[i] = exp(-(i² / (2·radius²)))        i in [0, KERNEL)
//! sum       = weight[0] + 2·Σ weight[i≥1]
//! ```
//!
//! and every weight is divided by `sum`, so the mirrored kernel adds up to one.

pub mod shaders;
pub mod software;

use crate::backend::{Backend, ProgramDesc};
use crate::binding::{AttributeId, BindingTable, UniformId};
use crate::error::RenderError;
use crate::executor::PassExecutor;
use crate::handle::{FrameHandle, MeshHandle, ProgramHandle, TextureHandle};
use crate::pass::{RenderPass, Target};
use crate::registry::Registry;
use crate::texture::TextureData;

use shaders::{
    BLUR_FRAGMENT, BLUR_UNIFORMS, GLSL_VERSION, IMAGE_FRAGMENT, IMAGE_UNIFORMS, QUAD_ATTRIBUTES,
    QUAD_POSITIONS, QUAD_TEXCOORDS, QUAD_VERTEX, QUAD_VERTEX_COUNT,
};

pub const DEFAULT_KERNEL: usize = 11;
pub const DEFAULT_RADIUS: f32 = 5.0;
/// Smallest radius [`BlurEffect::set_radius`] accepts; blurs at this size are the
/// identity for any practical kernel.
pub const MIN_RADIUS: f32 = 1e-4;

/// Texture unit both passes sample from.
const TEXTURE_UNIT: u32 = 0;

/// Normalized one-sided Gaussian kernel, as evaluated by the blur shaders.
///
/// `weights[0]` is the center tap; `weights[i]` applies to both `+i` and `-i`. A
/// radius that is not positive yields the identity kernel.
pub fn gaussian_weights(radius: f32, taps: usize) -> Vec<f32> {
    if taps == 0 {
        return Vec::new();
    }

    let x = 2.0 * radius * radius;
    let mut weights = vec![0.0; taps];
    if x.is_nan() || x <= 0.0 {
        weights[0] = 1.0;
        return weights;
    }

    for (i, w) in weights.iter_mut().enumerate() {
        *w = (-((i * i) as f32 / x)).exp();
    }
    let sum = weights[0] + 2.0 * weights[1..].iter().sum::<f32>();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// What the effect puts on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlurMode {
    #[default]
    Blurred,
    /// The source image, drawn by the passthrough program.
    Original,
}

impl BlurMode {
    pub fn toggled(self) -> Self {
        match self {
            BlurMode::Blurred => BlurMode::Original,
            BlurMode::Original => BlurMode::Blurred,
        }
    }
}

/// Tunables of the effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurSettings {
    pub radius: f32,
    /// Taps on each side of the center, including the center itself.
    pub kernel: usize,
    pub mode: BlurMode,
}

impl Default for BlurSettings {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            kernel: DEFAULT_KERNEL,
            mode: BlurMode::Blurred,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct QuadBindings {
    texture: UniformId,
    position: AttributeId,
    texcoord: AttributeId,
}

#[derive(Debug, Clone, Copy)]
struct BlurBindings {
    quad: QuadBindings,
    width: UniformId,
    height: UniformId,
    radius: UniformId,
}

fn uniform(table: &BindingTable, program: &str, name: &str) -> Result<UniformId, RenderError> {
    table
        .uniform(name)
        .ok_or_else(|| RenderError::link(program, format!("uniform '{name}' was not requested")))
}

fn attribute(table: &BindingTable, program: &str, name: &str) -> Result<AttributeId, RenderError> {
    table
        .attribute(name)
        .ok_or_else(|| RenderError::link(program, format!("attribute '{name}' was not requested")))
}

impl QuadBindings {
    fn resolve(table: &BindingTable, program: &str) -> Result<Self, RenderError> {
        Ok(Self {
            texture: uniform(table, program, "uTexture")?,
            position: attribute(table, program, "aPosition")?,
            texcoord: attribute(table, program, "aTexture")?,
        })
    }
}

impl BlurBindings {
    fn resolve(table: &BindingTable, program: &str) -> Result<Self, RenderError> {
        Ok(Self {
            quad: QuadBindings::resolve(table, program)?,
            width: uniform(table, program, "uWidth")?,
            height: uniform(table, program, "uHeight")?,
            radius: uniform(table, program, "uRadius")?,
        })
    }
}

/// Program description of one blur direction.
pub fn blur_program_desc(name: &'static str, direction: &str, kernel: usize) -> ProgramDesc<'static> {
    ProgramDesc::new(name, QUAD_VERTEX, BLUR_FRAGMENT)
        .with_define(GLSL_VERSION)
        .with_define(format!("#define {direction}\n"))
        .with_define(format!("#define KERNEL {kernel}\n"))
        .with_uniforms(&BLUR_UNIFORMS)
        .with_attributes(&QUAD_ATTRIBUTES)
}

/// Program description of the passthrough image program.
pub fn image_program_desc() -> ProgramDesc<'static> {
    ProgramDesc::new("ShaderImage", QUAD_VERTEX, IMAGE_FRAGMENT)
        .with_define(GLSL_VERSION)
        .with_uniforms(&IMAGE_UNIFORMS)
        .with_attributes(&QUAD_ATTRIBUTES)
}

/// Resources and per-frame state of the blur.
#[derive(Debug)]
pub struct BlurEffect {
    image: ProgramHandle,
    horizontal: ProgramHandle,
    vertical: ProgramHandle,
    image_bindings: QuadBindings,
    horizontal_bindings: BlurBindings,
    vertical_bindings: BlurBindings,
    frame: FrameHandle,
    frame_texture: TextureHandle,
    source: TextureHandle,
    positions: MeshHandle,
    texcoords: MeshHandle,
    width: u32,
    height: u32,
    kernel: usize,
    radius: f32,
    mode: BlurMode,
}

impl BlurEffect {
    /// Creates the three programs, the intermediate frame, the quad and the source
    /// texture.
    pub fn new<B: Backend>(
        registry: &mut Registry<B>,
        image: &TextureData,
        settings: BlurSettings,
    ) -> Result<Self, RenderError> {
        let image_program = registry.create_program(&image_program_desc())?;
        let horizontal = registry.create_program(&blur_program_desc(
            "HorizontalBlur",
            "HORIZONTAL",
            settings.kernel,
        ))?;
        let vertical = registry.create_program(&blur_program_desc(
            "VerticalBlur",
            "VERTICAL",
            settings.kernel,
        ))?;

        let image_bindings =
            QuadBindings::resolve(registry.binding_table(image_program), "ShaderImage")?;
        let horizontal_bindings =
            BlurBindings::resolve(registry.binding_table(horizontal), "HorizontalBlur")?;
        let vertical_bindings =
            BlurBindings::resolve(registry.binding_table(vertical), "VerticalBlur")?;

        let frame = registry.create_frame(image.width, image.height)?;
        let positions = registry.create_mesh(3, QUAD_VERTEX_COUNT, &QUAD_POSITIONS);
        let texcoords = registry.create_mesh(2, QUAD_VERTEX_COUNT, &QUAD_TEXCOORDS);
        let source = registry.create_texture(image);

        log::info!(
            "blur ready: {}x{} image, kernel {}, radius {}",
            image.width,
            image.height,
            settings.kernel,
            settings.radius
        );

        Ok(Self {
            image: image_program,
            horizontal,
            vertical,
            image_bindings,
            horizontal_bindings,
            vertical_bindings,
            frame,
            frame_texture: registry.frame_texture(frame),
            source,
            positions,
            texcoords,
            width: image.width,
            height: image.height,
            kernel: settings.kernel,
            radius: settings.radius.max(MIN_RADIUS),
            mode: settings.mode,
        })
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Sets the radius used from the next frame on, clamped to [`MIN_RADIUS`].
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.max(MIN_RADIUS);
        log::debug!("blur radius {}", self.radius);
    }

    pub fn kernel(&self) -> usize {
        self.kernel
    }

    pub fn mode(&self) -> BlurMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: BlurMode) {
        self.mode = mode;
    }

    /// Intermediate frame the horizontal pass writes.
    pub fn frame(&self) -> FrameHandle {
        self.frame
    }

    /// Texture holding the source image.
    pub fn source(&self) -> TextureHandle {
        self.source
    }

    fn quad(&self, pass: RenderPass, bindings: &QuadBindings) -> RenderPass {
        pass.texture_unit(TEXTURE_UNIT)
            .uniform_i32(bindings.texture, TEXTURE_UNIT as i32)
            .attribute(bindings.position, self.positions)
            .attribute(bindings.texcoord, self.texcoords)
            .vertices(QUAD_VERTEX_COUNT)
    }

    fn blur_pass(
        &self,
        target: Target,
        program: ProgramHandle,
        texture: TextureHandle,
        bindings: &BlurBindings,
    ) -> RenderPass {
        let pass = RenderPass::new(target, program, texture)
            .uniform_i32(bindings.width, self.width as i32)
            .uniform_i32(bindings.height, self.height as i32)
            .uniform_f32(bindings.radius, self.radius);
        self.quad(pass, &bindings.quad)
    }

    /// Passes that draw one frame in the current mode.
    pub fn passes(&self) -> Vec<RenderPass> {
        match self.mode {
            BlurMode::Blurred => vec![
                self.blur_pass(
                    Target::Frame(self.frame),
                    self.horizontal,
                    self.source,
                    &self.horizontal_bindings,
                ),
                self.blur_pass(
                    Target::Screen,
                    self.vertical,
                    self.frame_texture,
                    &self.vertical_bindings,
                ),
            ],
            BlurMode::Original => vec![self.quad(
                RenderPass::new(Target::Screen, self.image, self.source),
                &self.image_bindings,
            )],
        }
    }

    /// Queues this frame's passes.
    pub fn submit(&self, executor: &mut PassExecutor) {
        for pass in self.passes() {
            executor.submit(pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_kernel_matches_reference_values() {
        let weights = gaussian_weights(DEFAULT_RADIUS, DEFAULT_KERNEL);
        assert_eq!(weights.len(), 11);
        assert!((weights[0] - 0.0827).abs() < 5e-4);
        assert!((weights[10] - 0.0112).abs() < 5e-4);
    }

    #[test]
    fn tiny_radius_is_the_identity() {
        let weights = gaussian_weights(MIN_RADIUS, DEFAULT_KERNEL);
        assert_eq!(weights[0], 1.0);
        assert!(weights[1..].iter().all(|&w| w == 0.0));
        assert_eq!(gaussian_weights(0.0, 3), vec![1.0, 0.0, 0.0]);
        assert!(gaussian_weights(1.0, 0).is_empty());
    }

    #[test]
    fn mode_toggles() {
        assert_eq!(BlurMode::Blurred.toggled(), BlurMode::Original);
        assert_eq!(BlurMode::Original.toggled().toggled(), BlurMode::Original);
    }

    #[test]
    fn program_defines_carry_direction_and_kernel() {
        let desc = blur_program_desc("HorizontalBlur", "HORIZONTAL", 7);
        assert_eq!(
            desc.defines,
            vec!["#version 450\n", "#define HORIZONTAL\n", "#define KERNEL 7\n"]
        );
        assert_eq!(desc.uniforms, &BLUR_UNIFORMS);
    }

    proptest! {
        #[test]
        fn kernel_is_normalized_and_decreasing(radius in 0.01f32..100.0, taps in 1usize..32) {
            let weights = gaussian_weights(radius, taps);
            prop_assert_eq!(weights.len(), taps);
            prop_assert!(weights.iter().all(|&w| w >= 0.0));
            prop_assert!(weights.windows(2).all(|w| w[0] >= w[1]));

            let total = weights[0] + 2.0 * weights[1..].iter().sum::<f32>();
            prop_assert!((total - 1.0).abs() < 1e-5, "total {}", total);
        }
    }
}
