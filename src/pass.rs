//! Declarative description of one draw.

use crate::binding::{AttributeId, UniformId};
use crate::handle::{FrameHandle, MeshHandle, ProgramHandle, TextureHandle};

/// Where a pass draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The window's default framebuffer.
    Screen,
    /// An off-screen frame.
    Frame(FrameHandle),
}

/// One bind-and-draw operation, built once and consumed by
/// [`PassExecutor::submit`](crate::PassExecutor::submit).
///
/// Uniform and attribute ids come from the [`BindingTable`](crate::BindingTable) of
/// the pass's program.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPass {
    target: Target,
    program: ProgramHandle,
    texture: TextureHandle,
    texture_unit: u32,
    int_uniforms: Vec<(UniformId, i32)>,
    float_uniforms: Vec<(UniformId, f32)>,
    attributes: Vec<(AttributeId, MeshHandle)>,
    vertex_count: u32,
}

impl RenderPass {
    /// Starts a pass drawing `program` into `target` with `texture` on unit 0.
    pub fn new(target: Target, program: ProgramHandle, texture: TextureHandle) -> Self {
        Self {
            target,
            program,
            texture,
            texture_unit: 0,
            int_uniforms: Vec::new(),
            float_uniforms: Vec::new(),
            attributes: Vec::new(),
            vertex_count: 0,
        }
    }

    pub fn texture_unit(mut self, unit: u32) -> Self {
        self.texture_unit = unit;
        self
    }

    pub fn uniform_i32(mut self, uniform: UniformId, value: i32) -> Self {
        self.int_uniforms.push((uniform, value));
        self
    }

    pub fn uniform_f32(mut self, uniform: UniformId, value: f32) -> Self {
        self.float_uniforms.push((uniform, value));
        self
    }

    /// Sources `attribute` from `mesh`.
    pub fn attribute(mut self, attribute: AttributeId, mesh: MeshHandle) -> Self {
        self.attributes.push((attribute, mesh));
        self
    }

    /// Number of vertices to draw as a triangle list.
    pub fn vertices(mut self, count: u32) -> Self {
        self.vertex_count = count;
        self
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    pub fn unit(&self) -> u32 {
        self.texture_unit
    }

    pub fn int_uniforms(&self) -> &[(UniformId, i32)] {
        &self.int_uniforms
    }

    pub fn float_uniforms(&self) -> &[(UniformId, f32)] {
        &self.float_uniforms
    }

    pub fn attributes(&self) -> &[(AttributeId, MeshHandle)] {
        &self.attributes
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}
