//! Deterministic CPU implementation of [`Backend`].
//!
//! Every target is a float RGBA [`Surface`] with a bottom-left origin, so frames read
//! back with exactly the orientation of uploaded textures. Textures sample only their
//! base level; the mip chain matters for minification on the GPU, and every draw this
//! crate issues maps texels one to one.

mod raster;
mod shader;

pub use raster::{Samplers, Surface};
pub use shader::{
    Defines, ProgramFactory, ShaderLibrary, ShaderProgram, UniformDecl, UniformKind, UniformValue,
    Uniforms, VertexOut,
};

use glam::Vec4;

use super::{Backend, ProgramDesc};
use crate::binding::{BindingSlot, BindingTable};
use crate::error::{FramebufferStatus, RenderError};
use crate::texture::TextureData;
use crate::viewport::Viewport;

/// Largest frame edge accepted by default, matching wgpu's default limit.
pub const DEFAULT_MAX_DIMENSION: u32 = 8192;

const TEXTURE_UNITS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(usize);

struct ProgramState {
    shader: Box<dyn ShaderProgram>,
    uniforms: Vec<UniformValue>,
}

struct VertexBuffer {
    dimensions: u32,
    data: Vec<f32>,
}

impl VertexBuffer {
    fn read(&self, vertex: usize, dimensions: u32) -> Vec4 {
        let mut value = Vec4::W;
        let stride = self.dimensions as usize;
        for c in 0..dimensions.min(4) as usize {
            value[c] = self.data.get(vertex * stride + c).copied().unwrap_or(0.0);
        }
        value
    }
}

#[derive(Default)]
struct DrawState {
    target: Option<FramebufferId>,
    viewport: Viewport,
    program: Option<ProgramId>,
    textures: [Option<TextureId>; TEXTURE_UNITS],
    attributes: Vec<Option<(BufferId, u32)>>,
}

/// CPU rasterizer implementing the driver seam.
pub struct SoftwareBackend {
    library: ShaderLibrary,
    programs: Vec<Option<ProgramState>>,
    surfaces: Vec<Option<Surface>>,
    framebuffers: Vec<Option<TextureId>>,
    buffers: Vec<Option<VertexBuffer>>,
    screen: Surface,
    max_dimension: u32,
    state: DrawState,
}

impl SoftwareBackend {
    /// Creates a backend with a `width × height` screen that can compile the programs
    /// registered in `library`.
    pub fn new(library: ShaderLibrary, width: u32, height: u32) -> Self {
        Self {
            library,
            programs: Vec::new(),
            surfaces: Vec::new(),
            framebuffers: Vec::new(),
            buffers: Vec::new(),
            screen: Surface::new(width, height),
            max_dimension: DEFAULT_MAX_DIMENSION,
            state: DrawState::default(),
        }
    }

    /// Overrides the largest accepted frame edge.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// The on-screen target.
    pub fn screen(&self) -> &Surface {
        &self.screen
    }

    /// Screen contents as RGBA8, bottom row first.
    pub fn read_screen_rgba8(&self) -> Vec<u8> {
        self.screen.to_rgba8()
    }

    /// Contents of a texture or frame attachment, if it is still alive.
    pub fn texture(&self, texture: TextureId) -> Option<&Surface> {
        self.surfaces.get(texture.0)?.as_ref()
    }

    /// Number of live objects across every kind.
    pub fn live_objects(&self) -> usize {
        self.programs.iter().flatten().count()
            + self.surfaces.iter().flatten().count()
            + self.framebuffers.iter().flatten().count()
            + self.buffers.iter().flatten().count()
    }

    fn current_uniform(&mut self, slot: BindingSlot) -> Option<&mut UniformValue> {
        let index = slot.index()?;
        let program = self.state.program?;
        self.programs.get_mut(program.0)?.as_mut()?.uniforms.get_mut(index)
    }

    fn take_target(&mut self) -> Option<Surface> {
        match self.state.target {
            None => Some(std::mem::take(&mut self.screen)),
            Some(framebuffer) => {
                let texture = self.framebuffers.get(framebuffer.0).copied().flatten()?;
                self.surfaces.get_mut(texture.0)?.take()
            }
        }
    }

    fn restore_target(&mut self, surface: Surface) {
        match self.state.target.and_then(|fb| self.framebuffers[fb.0]) {
            None => self.screen = surface,
            Some(texture) => self.surfaces[texture.0] = Some(surface),
        }
    }
}

impl Backend for SoftwareBackend {
    type Program = ProgramId;
    type Framebuffer = FramebufferId;
    type Buffer = BufferId;
    type Texture = TextureId;

    fn compile_program(
        &mut self,
        desc: &ProgramDesc<'_>,
    ) -> Result<(ProgramId, BindingTable), RenderError> {
        let shader = self.library.instantiate(desc)?;

        let table = BindingTable::resolve(
            desc.uniforms,
            desc.attributes,
            |name| {
                let index = shader.uniforms().iter().position(|u| u.name == name);
                BindingSlot::from(index.map(|i| i as u32))
            },
            |name| {
                let index = shader.attributes().iter().position(|&a| a == name);
                BindingSlot::from(index.map(|i| i as u32))
            },
        );

        let uniforms = shader.uniforms().iter().map(|u| u.kind.zero()).collect();
        self.programs.push(Some(ProgramState { shader, uniforms }));
        Ok((ProgramId(self.programs.len() - 1), table))
    }

    fn create_frame(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<(FramebufferId, TextureId), RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::FramebufferIncomplete {
                status: FramebufferStatus::IncompleteAttachment,
            });
        }
        if width > self.max_dimension || height > self.max_dimension {
            return Err(RenderError::FramebufferIncomplete {
                status: FramebufferStatus::Unsupported,
            });
        }

        self.surfaces.push(Some(Surface::new(width, height)));
        let texture = TextureId(self.surfaces.len() - 1);
        self.framebuffers.push(Some(texture));
        Ok((FramebufferId(self.framebuffers.len() - 1), texture))
    }

    fn create_buffer(&mut self, dimensions: u32, count: u32, data: &[f32]) -> BufferId {
        let len = (dimensions as usize * count as usize).min(data.len());
        self.buffers.push(Some(VertexBuffer {
            dimensions,
            data: data[..len].to_vec(),
        }));
        BufferId(self.buffers.len() - 1)
    }

    fn create_texture(&mut self, data: &TextureData) -> TextureId {
        let surface = Surface::from_rgba8(data.width, data.height, &data.to_rgba8());
        self.surfaces.push(Some(surface));
        TextureId(self.surfaces.len() - 1)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.screen = Surface::new(width, height);
    }

    fn begin_frame(&mut self, clear: [f32; 4]) -> Result<bool, RenderError> {
        self.screen.fill(Vec4::from_array(clear));
        Ok(true)
    }

    fn bind_target(&mut self, target: Option<FramebufferId>, viewport: Viewport) {
        self.state.target = target;
        self.state.viewport = viewport;
    }

    fn use_program(&mut self, program: ProgramId) {
        self.state.program = Some(program);
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        match self.state.textures.get_mut(unit as usize) {
            Some(bound) => *bound = Some(texture),
            None => log::warn!("texture unit {unit} out of range, ignoring bind"),
        }
    }

    fn set_uniform_i32(&mut self, slot: BindingSlot, value: i32) {
        match self.current_uniform(slot) {
            Some(UniformValue::Int(v)) => *v = value,
            Some(UniformValue::Float(_)) => log::debug!("int write to float uniform {slot:?} ignored"),
            None => {}
        }
    }

    fn set_uniform_f32(&mut self, slot: BindingSlot, value: f32) {
        match self.current_uniform(slot) {
            Some(UniformValue::Float(v)) => *v = value,
            Some(UniformValue::Int(_)) => log::debug!("float write to int uniform {slot:?} ignored"),
            None => {}
        }
    }

    fn enable_attribute(&mut self, slot: BindingSlot, buffer: BufferId, dimensions: u32) {
        let Some(index) = slot.index() else {
            return;
        };
        let attributes = &mut self.state.attributes;
        if attributes.len() <= index {
            attributes.resize(index + 1, None);
        }
        attributes[index] = Some((buffer, dimensions));
    }

    fn disable_attribute(&mut self, slot: BindingSlot) {
        if let Some(bound) = slot.index().and_then(|i| self.state.attributes.get_mut(i)) {
            *bound = None;
        }
    }

    fn draw_triangles(&mut self, vertex_count: u32) {
        let Some(program) = self.state.program else {
            log::warn!("draw without a program in use");
            return;
        };
        let Some(mut target) = self.take_target() else {
            log::warn!("draw into a destroyed frame");
            return;
        };
        let Some(state) = self.programs.get_mut(program.0).and_then(Option::as_mut) else {
            log::warn!("draw with destroyed program {program:?}");
            self.restore_target(target);
            return;
        };
        state.shader.prepare(&Uniforms::new(&state.uniforms));
        let shader = &*state.shader;

        let vertices: Vec<VertexOut> = (0..vertex_count as usize)
            .map(|vertex| {
                let attributes: Vec<Vec4> = (0..shader.attributes().len())
                    .map(|slot| {
                        match self.state.attributes.get(slot).copied().flatten() {
                            Some((buffer, dims)) => self
                                .buffers
                                .get(buffer.0)
                                .and_then(Option::as_ref)
                                .map_or(Vec4::W, |b| b.read(vertex, dims)),
                            None => Vec4::W,
                        }
                    })
                    .collect();
                shader.vertex(&attributes)
            })
            .collect();

        let samplers = Samplers::new(
            self.state
                .textures
                .iter()
                .map(|bound| bound.and_then(|t| self.surfaces.get(t.0)?.as_ref()))
                .collect(),
        );

        let viewport = self.state.viewport.clamped_to(target.width(), target.height());
        for triangle in vertices.chunks_exact(3) {
            raster::rasterize(&mut target, viewport, triangle, |varying| {
                shader.fragment(&samplers, varying)
            });
        }

        self.restore_target(target);
    }

    fn present(&mut self) {
        log::trace!("software frame presented");
    }

    fn destroy_program(&mut self, program: ProgramId) {
        if let Some(slot) = self.programs.get_mut(program.0) {
            *slot = None;
        }
        if self.state.program == Some(program) {
            self.state.program = None;
        }
    }

    fn destroy_frame(&mut self, framebuffer: FramebufferId) {
        if let Some(slot) = self.framebuffers.get_mut(framebuffer.0) {
            *slot = None;
        }
        if self.state.target == Some(framebuffer) {
            self.state.target = None;
        }
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        if let Some(slot) = self.buffers.get_mut(buffer.0) {
            *slot = None;
        }
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if let Some(slot) = self.surfaces.get_mut(texture.0) {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShaderStage;
    use glam::Vec2;

    /// Writes `uTint × uScale` into every covered pixel, modulated by texture unit 0.
    struct Tint {
        tint: Vec4,
    }

    const TINT_UNIFORMS: [UniformDecl; 2] = [UniformDecl::float("uScale"), UniformDecl::int("uOn")];

    impl ShaderProgram for Tint {
        fn uniforms(&self) -> &[UniformDecl] {
            &TINT_UNIFORMS
        }

        fn attributes(&self) -> &[&'static str] {
            &["aPosition", "aTexture"]
        }

        fn prepare(&mut self, uniforms: &Uniforms<'_>) {
            let on = if uniforms.int(1) != 0 { 1.0 } else { 0.0 };
            self.tint = Vec4::splat(uniforms.float(0) * on).with_w(1.0);
        }

        fn vertex(&self, attributes: &[Vec4]) -> VertexOut {
            VertexOut {
                position: attributes[0],
                varying: attributes[1],
            }
        }

        fn fragment(&self, samplers: &Samplers<'_>, varying: Vec4) -> Vec4 {
            samplers.sample(0, Vec2::new(varying.x, varying.y)) * self.tint
        }
    }

    fn tint(_: &Defines) -> Result<Box<dyn ShaderProgram>, (ShaderStage, String)> {
        Ok(Box::new(Tint { tint: Vec4::ONE }))
    }

    const POSITIONS: [f32; 18] = [
        -1.0, -1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0, //
        -1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0,
    ];
    const TEXCOORDS: [f32; 12] = [0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0];

    fn backend() -> (SoftwareBackend, ProgramId, BindingTable) {
        let mut backend = SoftwareBackend::new(ShaderLibrary::new().with("v", "f", tint), 2, 2);
        let desc = ProgramDesc::new("Tint", "v", "f")
            .with_uniforms(&["uTexture", "uScale", "uOn"])
            .with_attributes(&["aPosition", "aTexture"]);
        let (program, table) = backend.compile_program(&desc).unwrap();
        (backend, program, table)
    }

    fn draw_quad(backend: &mut SoftwareBackend, table: &BindingTable, texture: TextureId) {
        let positions = backend.create_buffer(3, 6, &POSITIONS);
        let texcoords = backend.create_buffer(2, 6, &TEXCOORDS);
        let position = table.attribute_slot(table.attribute("aPosition").unwrap());
        let texcoord = table.attribute_slot(table.attribute("aTexture").unwrap());

        backend.bind_texture(0, texture);
        backend.enable_attribute(position, positions, 3);
        backend.enable_attribute(texcoord, texcoords, 2);
        backend.draw_triangles(6);
        backend.disable_attribute(position);
        backend.disable_attribute(texcoord);
    }

    #[test]
    fn names_resolve_to_declaration_order() {
        let (_, _, table) = backend();
        let slot = |name| table.uniform_slot(table.uniform(name).unwrap());
        assert_eq!(slot("uScale"), BindingSlot::new(0));
        assert_eq!(slot("uOn"), BindingSlot::new(1));
        assert_eq!(slot("uTexture"), BindingSlot::INVALID);
    }

    #[test]
    fn quad_draws_through_uniforms_and_texture() {
        let (mut backend, program, table) = backend();
        let texture = backend.create_texture(&TextureData::solid_rgb(2, 2, [255, 255, 255]));
        let scale = table.uniform_slot(table.uniform("uScale").unwrap());
        let on = table.uniform_slot(table.uniform("uOn").unwrap());

        backend.begin_frame([0.0, 0.0, 0.0, 1.0]).unwrap();
        backend.bind_target(None, Viewport::new(2, 2));
        backend.use_program(program);
        backend.set_uniform_i32(BindingSlot::INVALID, 0);
        backend.set_uniform_i32(on, 1);
        backend.set_uniform_f32(scale, 0.5);
        draw_quad(&mut backend, &table, texture);

        for texel in backend.screen().texels() {
            assert!((texel.x - 0.5).abs() < 1e-6);
            assert_eq!(texel.w, 1.0);
        }
    }

    #[test]
    fn mismatched_uniform_writes_are_ignored() {
        let (mut backend, program, table) = backend();
        let texture = backend.create_texture(&TextureData::solid_rgb(2, 2, [255, 255, 255]));
        let scale = table.uniform_slot(table.uniform("uScale").unwrap());
        let on = table.uniform_slot(table.uniform("uOn").unwrap());

        backend.begin_frame([0.0; 4]).unwrap();
        backend.bind_target(None, Viewport::new(2, 2));
        backend.use_program(program);
        backend.set_uniform_i32(on, 1);
        backend.set_uniform_i32(scale, 1);
        draw_quad(&mut backend, &table, texture);

        // uScale still holds its default of 0.
        assert!(backend.screen().texels().iter().all(|t| t.x == 0.0));
    }

    #[test]
    fn frames_render_and_sample_back() {
        let (mut backend, program, table) = backend();
        let texture = backend.create_texture(&TextureData::solid_rgb(2, 2, [255, 0, 0]));
        let (frame, frame_texture) = backend.create_frame(2, 2).unwrap();
        let scale = table.uniform_slot(table.uniform("uScale").unwrap());
        let on = table.uniform_slot(table.uniform("uOn").unwrap());

        backend.begin_frame([0.0; 4]).unwrap();
        backend.use_program(program);
        backend.set_uniform_i32(on, 1);
        backend.set_uniform_f32(scale, 1.0);

        backend.bind_target(Some(frame), Viewport::new(2, 2));
        draw_quad(&mut backend, &table, texture);
        backend.bind_target(None, Viewport::new(2, 2));
        draw_quad(&mut backend, &table, frame_texture);

        let frame_contents = backend.texture(frame_texture).unwrap();
        assert_eq!(frame_contents.texel(1, 1), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(backend.screen().texel(0, 0), Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn incomplete_frames_are_rejected() {
        let mut backend = SoftwareBackend::new(ShaderLibrary::new(), 1, 1).with_max_dimension(64);
        assert!(matches!(
            backend.create_frame(0, 16),
            Err(RenderError::FramebufferIncomplete {
                status: FramebufferStatus::IncompleteAttachment
            })
        ));
        assert!(matches!(
            backend.create_frame(65, 16),
            Err(RenderError::FramebufferIncomplete {
                status: FramebufferStatus::Unsupported
            })
        ));
    }

    #[test]
    fn destroyed_objects_are_released() {
        let (mut backend, program, _) = backend();
        let buffer = backend.create_buffer(2, 1, &[0.0, 1.0]);
        let (frame, texture) = backend.create_frame(4, 4).unwrap();
        assert_eq!(backend.live_objects(), 4);

        backend.destroy_frame(frame);
        backend.destroy_texture(texture);
        backend.destroy_buffer(buffer);
        backend.destroy_program(program);
        assert_eq!(backend.live_objects(), 0);
    }
}
