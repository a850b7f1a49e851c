//! A backend that records every driver call, for tests of the core.

use super::{Backend, ProgramDesc};
use crate::binding::{BindingSlot, BindingTable};
use crate::error::{FramebufferStatus, RenderError};
use crate::texture::TextureData;
use crate::viewport::Viewport;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CompileProgram(String),
    CreateFrame(u32, u32),
    CreateBuffer(u32, u32),
    CreateTexture(u32, u32),
    Resize(u32, u32),
    BeginFrame([f32; 4]),
    BindTarget(Option<u32>, Viewport),
    UseProgram(u32),
    BindTexture(u32, u32),
    UniformI32(BindingSlot, i32),
    UniformF32(BindingSlot, f32),
    EnableAttribute(BindingSlot, u32, u32),
    DisableAttribute(BindingSlot),
    Draw(u32),
    Present,
    DestroyProgram(u32),
    DestroyFrame(u32),
    DestroyBuffer(u32),
    DestroyTexture(u32),
}

/// Resolves a requested name to its position in `active_uniforms` or
/// `active_attributes`; anything else gets the invalid slot.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<Call>,
    pub active_uniforms: Vec<&'static str>,
    pub active_attributes: Vec<&'static str>,
    pub skip_frames: bool,
    next_id: u32,
}

impl RecordingBackend {
    pub fn new(active_uniforms: &[&'static str], active_attributes: &[&'static str]) -> Self {
        Self {
            active_uniforms: active_uniforms.to_vec(),
            active_attributes: active_attributes.to_vec(),
            ..Self::default()
        }
    }

    fn id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Calls recorded since frame setup, i.e. after the last `BeginFrame`.
    pub fn frame_calls(&self) -> &[Call] {
        let start = self
            .calls
            .iter()
            .rposition(|c| matches!(c, Call::BeginFrame(_)))
            .map_or(0, |i| i + 1);
        &self.calls[start..]
    }
}

impl Backend for RecordingBackend {
    type Program = u32;
    type Framebuffer = u32;
    type Buffer = u32;
    type Texture = u32;

    fn compile_program(&mut self, desc: &ProgramDesc<'_>) -> Result<(u32, BindingTable), RenderError> {
        self.calls.push(Call::CompileProgram(desc.name.to_string()));
        let slot = |active: &[&str], name: &str| {
            BindingSlot::from(active.iter().position(|&a| a == name).map(|i| i as u32))
        };
        let table = BindingTable::resolve(
            desc.uniforms,
            desc.attributes,
            |name| slot(&self.active_uniforms, name),
            |name| slot(&self.active_attributes, name),
        );
        Ok((self.id(), table))
    }

    fn create_frame(&mut self, width: u32, height: u32) -> Result<(u32, u32), RenderError> {
        self.calls.push(Call::CreateFrame(width, height));
        if width == 0 || height == 0 {
            return Err(RenderError::FramebufferIncomplete {
                status: FramebufferStatus::IncompleteAttachment,
            });
        }
        Ok((self.id(), self.id()))
    }

    fn create_buffer(&mut self, dimensions: u32, count: u32, _data: &[f32]) -> u32 {
        self.calls.push(Call::CreateBuffer(dimensions, count));
        self.id()
    }

    fn create_texture(&mut self, data: &TextureData) -> u32 {
        self.calls.push(Call::CreateTexture(data.width, data.height));
        self.id()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.calls.push(Call::Resize(width, height));
    }

    fn begin_frame(&mut self, clear: [f32; 4]) -> Result<bool, RenderError> {
        self.calls.push(Call::BeginFrame(clear));
        Ok(!self.skip_frames)
    }

    fn bind_target(&mut self, target: Option<u32>, viewport: Viewport) {
        self.calls.push(Call::BindTarget(target, viewport));
    }

    fn use_program(&mut self, program: u32) {
        self.calls.push(Call::UseProgram(program));
    }

    fn bind_texture(&mut self, unit: u32, texture: u32) {
        self.calls.push(Call::BindTexture(unit, texture));
    }

    fn set_uniform_i32(&mut self, slot: BindingSlot, value: i32) {
        self.calls.push(Call::UniformI32(slot, value));
    }

    fn set_uniform_f32(&mut self, slot: BindingSlot, value: f32) {
        self.calls.push(Call::UniformF32(slot, value));
    }

    fn enable_attribute(&mut self, slot: BindingSlot, buffer: u32, dimensions: u32) {
        self.calls.push(Call::EnableAttribute(slot, buffer, dimensions));
    }

    fn disable_attribute(&mut self, slot: BindingSlot) {
        self.calls.push(Call::DisableAttribute(slot));
    }

    fn draw_triangles(&mut self, vertex_count: u32) {
        self.calls.push(Call::Draw(vertex_count));
    }

    fn present(&mut self) {
        self.calls.push(Call::Present);
    }

    fn destroy_program(&mut self, program: u32) {
        self.calls.push(Call::DestroyProgram(program));
    }

    fn destroy_frame(&mut self, framebuffer: u32) {
        self.calls.push(Call::DestroyFrame(framebuffer));
    }

    fn destroy_buffer(&mut self, buffer: u32) {
        self.calls.push(Call::DestroyBuffer(buffer));
    }

    fn destroy_texture(&mut self, texture: u32) {
        self.calls.push(Call::DestroyTexture(texture));
    }
}
