//! Ordered execution of queued render passes.
//!
//! Each pass runs the same fixed sequence of driver calls:
//!
//! 1. bind the target and set its viewport
//! 2. use the program
//! 3. bind the texture to the requested unit
//! 4. write int uniforms, then float uniforms
//! 5. enable every attribute binding
//! 6. draw
//! 7. disable every attribute the program declared
//!
//! Passes run strictly in submission order, so a pass reading a frame's texture sees
//! everything earlier passes drew into that frame.

use std::mem;

use crate::backend::Backend;
use crate::error::RenderError;
use crate::pass::{RenderPass, Target};
use crate::registry::Registry;
use crate::viewport::{SurfaceInfo, Viewport};

/// Screen clear color applied at the start of every frame.
pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.1, 0.1, 0.1, 1.0];

/// Outcome of [`PassExecutor::flush`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Every queued pass was executed.
    Rendered,
    /// The driver could not provide a frame; the queued passes were dropped.
    Skipped,
}

/// Per-frame queue of render passes.
#[derive(Debug)]
pub struct PassExecutor {
    queue: Vec<RenderPass>,
    clear_color: [f32; 4],
}

impl Default for PassExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PassExecutor {
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            clear_color: DEFAULT_CLEAR_COLOR,
        }
    }

    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Queues a pass for the next [`flush`](Self::flush).
    pub fn submit(&mut self, pass: RenderPass) {
        self.queue.push(pass);
    }

    /// Number of queued passes.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Executes every queued pass in submission order and empties the queue.
    ///
    /// # Panics
    ///
    /// Panics if a pass references a handle `registry` did not issue.
    pub fn flush<B: Backend>(
        &mut self,
        registry: &mut Registry<B>,
        surface: &SurfaceInfo,
    ) -> Result<FrameStatus, RenderError> {
        let passes = mem::take(&mut self.queue);

        if !registry.backend_mut().begin_frame(self.clear_color)? {
            log::debug!("frame skipped, dropping {} passes", passes.len());
            return Ok(FrameStatus::Skipped);
        }

        for pass in &passes {
            execute(registry, surface, pass);
        }
        Ok(FrameStatus::Rendered)
    }
}

fn execute<B: Backend>(registry: &mut Registry<B>, surface: &SurfaceInfo, pass: &RenderPass) {
    let program = registry.program(pass.program());
    let program_id = program.id;
    log::trace!(
        "pass '{}' -> {:?}, {} vertices",
        program.name,
        pass.target(),
        pass.vertex_count()
    );

    let (framebuffer, viewport) = match pass.target() {
        Target::Frame(frame) => {
            let entry = registry.frame(frame);
            (Some(entry.id), Viewport::new(entry.width, entry.height))
        }
        Target::Screen => (None, surface.screen_viewport()),
    };
    let texture = registry.texture_id(pass.texture());

    registry.backend_mut().bind_target(framebuffer, viewport);
    registry.backend_mut().use_program(program_id);
    registry.backend_mut().bind_texture(pass.unit(), texture);

    for &(uniform, value) in pass.int_uniforms() {
        let slot = registry.binding_table(pass.program()).uniform_slot(uniform);
        registry.backend_mut().set_uniform_i32(slot, value);
    }
    for &(uniform, value) in pass.float_uniforms() {
        let slot = registry.binding_table(pass.program()).uniform_slot(uniform);
        registry.backend_mut().set_uniform_f32(slot, value);
    }

    for &(attribute, mesh) in pass.attributes() {
        let slot = registry.binding_table(pass.program()).attribute_slot(attribute);
        let mesh = registry.mesh(mesh);
        let (buffer, dimensions) = (mesh.id, mesh.dimensions);
        registry.backend_mut().enable_attribute(slot, buffer, dimensions);
    }

    registry.backend_mut().draw_triangles(pass.vertex_count());

    let declared: Vec<_> = registry
        .binding_table(pass.program())
        .attribute_slots()
        .collect();
    for slot in declared {
        registry.backend_mut().disable_attribute(slot);
    }
}
