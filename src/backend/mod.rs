//! The graphics driver seam.
//!
//! The [`Registry`](crate::Registry) and [`PassExecutor`](crate::PassExecutor) speak to
//! the driver through [`Backend`], a deliberately small, GL-shaped state machine:
//! create objects, bind a target, use a program, bind a texture, poke uniforms, enable
//! attributes, draw. Driver object ids are associated `Copy` types so the core never
//! handles raw driver values.
//!
//! Two implementations ship:
//! - [`GpuBackend`]: wgpu, with GLSL compiled and reflected by naga.
//! - [`SoftwareBackend`]: a deterministic CPU rasterizer used for headless output and
//!   pixel-level tests.

pub mod gpu;
#[cfg(test)]
pub(crate) mod recording;
pub mod software;

pub use gpu::GpuBackend;
pub use software::SoftwareBackend;

use std::fmt;

use crate::binding::{BindingSlot, BindingTable};
use crate::error::{RenderError, ShaderStage};
use crate::texture::TextureData;
use crate::viewport::Viewport;

/// Description of a shader program to compile and link.
///
/// `defines` are prepended verbatim, in order, to both stages, so each entry should be
/// a complete line such as `"#define KERNEL 11\n"`. The first entry is typically the
/// `#version` directive.
#[derive(Debug, Clone)]
pub struct ProgramDesc<'a> {
    pub name: &'a str,
    pub vertex: &'a str,
    pub fragment: &'a str,
    pub defines: Vec<String>,
    pub uniforms: &'a [&'a str],
    pub attributes: &'a [&'a str],
}

impl<'a> ProgramDesc<'a> {
    pub fn new(name: &'a str, vertex: &'a str, fragment: &'a str) -> Self {
        Self {
            name,
            vertex,
            fragment,
            defines: Vec::new(),
            uniforms: &[],
            attributes: &[],
        }
    }

    /// Appends a preprocessor line.
    pub fn with_define(mut self, define: impl Into<String>) -> Self {
        self.defines.push(define.into());
        self
    }

    pub fn with_uniforms(mut self, uniforms: &'a [&'a str]) -> Self {
        self.uniforms = uniforms;
        self
    }

    pub fn with_attributes(mut self, attributes: &'a [&'a str]) -> Self {
        self.attributes = attributes;
        self
    }

    /// Raw source of one stage, without defines.
    pub fn source(&self, stage: ShaderStage) -> &'a str {
        match stage {
            ShaderStage::Vertex => self.vertex,
            ShaderStage::Fragment => self.fragment,
        }
    }

    /// Source of one stage with every define prepended.
    pub fn preprocessed(&self, stage: ShaderStage) -> String {
        let mut text: String = self.defines.concat();
        text.push_str(self.source(stage));
        text
    }
}

/// A graphics driver the render core can create resources on and draw with.
///
/// Binding calls mutate driver state exactly like their GL counterparts: the state they
/// set persists until overwritten. Writing a uniform or enabling an attribute through
/// [`BindingSlot::INVALID`] must be a silent no-op.
pub trait Backend {
    type Program: Copy + fmt::Debug;
    type Framebuffer: Copy + fmt::Debug;
    type Buffer: Copy + fmt::Debug;
    type Texture: Copy + fmt::Debug;

    /// Compiles and links a program, resolving the requested names to slots.
    fn compile_program(
        &mut self,
        desc: &ProgramDesc<'_>,
    ) -> Result<(Self::Program, BindingTable), RenderError>;

    /// Creates an off-screen color target and the texture backing it.
    fn create_frame(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<(Self::Framebuffer, Self::Texture), RenderError>;

    /// Uploads `count × dimensions` floats.
    fn create_buffer(&mut self, dimensions: u32, count: u32, data: &[f32]) -> Self::Buffer;

    /// Uploads pixels with a full mip chain.
    fn create_texture(&mut self, data: &TextureData) -> Self::Texture;

    /// Resizes the on-screen target to `width × height` physical pixels.
    fn resize(&mut self, width: u32, height: u32);

    /// Prepares a new frame whose screen target is cleared to `clear`.
    ///
    /// Returns `Ok(false)` when the frame has to be skipped, for example because the
    /// swap chain timed out.
    fn begin_frame(&mut self, clear: [f32; 4]) -> Result<bool, RenderError>;

    /// Binds a frame, or the screen for `None`, and sets the viewport.
    fn bind_target(&mut self, target: Option<Self::Framebuffer>, viewport: Viewport);

    fn use_program(&mut self, program: Self::Program);

    fn bind_texture(&mut self, unit: u32, texture: Self::Texture);

    /// Writes an int uniform of the program in use.
    fn set_uniform_i32(&mut self, slot: BindingSlot, value: i32);

    /// Writes a float uniform of the program in use.
    fn set_uniform_f32(&mut self, slot: BindingSlot, value: f32);

    /// Sources an attribute from tightly packed floats of `buffer`.
    fn enable_attribute(&mut self, slot: BindingSlot, buffer: Self::Buffer, dimensions: u32);

    fn disable_attribute(&mut self, slot: BindingSlot);

    /// Draws a triangle list with the current state.
    fn draw_triangles(&mut self, vertex_count: u32);

    /// Shows the screen target.
    fn present(&mut self);

    fn destroy_program(&mut self, program: Self::Program);
    fn destroy_frame(&mut self, framebuffer: Self::Framebuffer);
    fn destroy_buffer(&mut self, buffer: Self::Buffer);
    fn destroy_texture(&mut self, texture: Self::Texture);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defines_precede_the_source_in_order() {
        let desc = ProgramDesc::new("Blur", "void main() {}\n", "frag\n")
            .with_define("#version 450\n")
            .with_define("#define KERNEL 11\n");

        assert_eq!(
            desc.preprocessed(ShaderStage::Vertex),
            "#version 450\n#define KERNEL 11\nvoid main() {}\n"
        );
        assert!(desc.preprocessed(ShaderStage::Fragment).ends_with("frag\n"));
    }
}
