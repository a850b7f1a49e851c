//! Owner of every GPU resource, addressed by typed handles.

use crate::backend::{Backend, ProgramDesc};
use crate::binding::BindingTable;
use crate::error::RenderError;
use crate::handle::{
    Arena, Frame, FrameHandle, Mesh, MeshHandle, Program, ProgramHandle, Texture, TextureHandle,
};
use crate::texture::TextureData;

pub(crate) struct ProgramEntry<B: Backend> {
    pub name: String,
    pub id: B::Program,
    pub bindings: BindingTable,
}

pub(crate) struct FrameEntry<B: Backend> {
    pub width: u32,
    pub height: u32,
    pub id: B::Framebuffer,
    pub texture: TextureHandle,
}

pub(crate) struct MeshEntry<B: Backend> {
    pub dimensions: u32,
    pub id: B::Buffer,
}

pub(crate) struct TextureEntry<B: Backend> {
    pub id: B::Texture,
    /// Frame whose color attachment this is, if any.
    pub frame: Option<FrameHandle>,
}

/// Resources in creation order, for teardown.
#[derive(Debug, Clone, Copy)]
enum Created {
    Program(ProgramHandle),
    Frame(FrameHandle),
    Mesh(MeshHandle),
    Texture(TextureHandle),
}

/// Creates GPU resources through a [`Backend`] and owns them until
/// [`shutdown`](Self::shutdown).
///
/// Handles returned by the registry are dense per kind and never reused. Passing a
/// handle this registry did not issue to any accessor panics.
pub struct Registry<B: Backend> {
    backend: B,
    programs: Arena<Program, ProgramEntry<B>>,
    frames: Arena<Frame, FrameEntry<B>>,
    meshes: Arena<Mesh, MeshEntry<B>>,
    textures: Arena<Texture, TextureEntry<B>>,
    created: Vec<Created>,
}

impl<B: Backend> Registry<B> {
    /// Creates an empty registry on top of a driver.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            programs: Arena::new(),
            frames: Arena::new(),
            meshes: Arena::new(),
            textures: Arena::new(),
            created: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Compiles a program and resolves the uniform and attribute names it requests.
    ///
    /// # Errors
    ///
    /// [`RenderError::ShaderCompile`] or [`RenderError::ProgramLink`] with the driver
    /// log. Names the driver cannot find are not errors; they resolve to
    /// [`BindingSlot::INVALID`](crate::BindingSlot::INVALID).
    pub fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramHandle, RenderError> {
        let (id, bindings) = self.backend.compile_program(desc)?;

        for (name, slot) in bindings.uniforms().chain(bindings.attributes()) {
            if !slot.is_valid() {
                log::debug!("program '{}': '{}' is not active", desc.name, name);
            }
        }

        let handle = self.programs.insert(ProgramEntry {
            name: desc.name.to_string(),
            id,
            bindings,
        });
        self.created.push(Created::Program(handle));
        log::info!("program '{}' ready as {:?}", desc.name, handle);
        Ok(handle)
    }

    /// Creates an off-screen color target of exactly `width × height` pixels.
    ///
    /// # Errors
    ///
    /// [`RenderError::FramebufferIncomplete`] if the driver cannot complete the target.
    pub fn create_frame(&mut self, width: u32, height: u32) -> Result<FrameHandle, RenderError> {
        let (id, texture_id) = self.backend.create_frame(width, height)?;

        let handle = self.frames.next_handle();
        let texture = self.textures.insert(TextureEntry {
            id: texture_id,
            frame: Some(handle),
        });
        self.frames.insert(FrameEntry {
            width,
            height,
            id,
            texture,
        });

        self.created.push(Created::Frame(handle));
        log::info!("frame {:?}: {}x{}, color attachment {:?}", handle, width, height, texture);
        Ok(handle)
    }

    /// Uploads `vertex_count × dimensions` floats as a vertex attribute buffer.
    ///
    /// `data` is trusted to hold that many floats; extra values are ignored.
    pub fn create_mesh(&mut self, dimensions: u32, vertex_count: u32, data: &[f32]) -> MeshHandle {
        let id = self.backend.create_buffer(dimensions, vertex_count, data);
        let handle = self.meshes.insert(MeshEntry { dimensions, id });
        self.created.push(Created::Mesh(handle));
        log::debug!("mesh {:?}: {} vertices of {} floats", handle, vertex_count, dimensions);
        handle
    }

    /// Uploads pixels with mipmaps, linear filtering and clamp-to-edge wrapping.
    pub fn create_texture(&mut self, data: &TextureData) -> TextureHandle {
        let id = self.backend.create_texture(data);
        let handle = self.textures.insert(TextureEntry { id, frame: None });
        self.created.push(Created::Texture(handle));
        log::debug!(
            "texture {:?}: {}x{}x{}",
            handle,
            data.width,
            data.height,
            data.channels
        );
        handle
    }

    /// Texture backed by the color attachment of `frame`.
    pub fn frame_texture(&self, frame: FrameHandle) -> TextureHandle {
        self.frames[frame].texture
    }

    /// Size of `frame` in pixels.
    pub fn frame_size(&self, frame: FrameHandle) -> (u32, u32) {
        let entry = &self.frames[frame];
        (entry.width, entry.height)
    }

    /// Binding table produced when `program` was linked.
    pub fn binding_table(&self, program: ProgramHandle) -> &BindingTable {
        &self.programs[program].bindings
    }

    pub fn program_name(&self, program: ProgramHandle) -> &str {
        &self.programs[program].name
    }

    /// Frame `texture` is the attachment of, if it is one.
    pub fn texture_frame(&self, texture: TextureHandle) -> Option<FrameHandle> {
        self.textures[texture].frame
    }

    /// Driver id of a texture, for inspecting backend-side contents.
    pub fn texture_id(&self, texture: TextureHandle) -> B::Texture {
        self.textures[texture].id
    }

    pub(crate) fn program(&self, program: ProgramHandle) -> &ProgramEntry<B> {
        &self.programs[program]
    }

    pub(crate) fn frame(&self, frame: FrameHandle) -> &FrameEntry<B> {
        &self.frames[frame]
    }

    pub(crate) fn mesh(&self, mesh: MeshHandle) -> &MeshEntry<B> {
        &self.meshes[mesh]
    }

    /// Destroys every resource in reverse creation order and returns the driver.
    pub fn shutdown(mut self) -> B {
        log::info!("releasing {} resources", self.created.len());
        for created in self.created.iter().rev() {
            match *created {
                Created::Program(handle) => {
                    self.backend.destroy_program(self.programs[handle].id);
                }
                Created::Frame(handle) => {
                    let frame = &self.frames[handle];
                    self.backend.destroy_frame(frame.id);
                    self.backend.destroy_texture(self.textures[frame.texture].id);
                }
                Created::Mesh(handle) => self.backend.destroy_buffer(self.meshes[handle].id),
                Created::Texture(handle) => self.backend.destroy_texture(self.textures[handle].id),
            }
            log::trace!("released {created:?}");
        }
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::{Call, RecordingBackend};
    use crate::binding::BindingSlot;

    fn registry() -> Registry<RecordingBackend> {
        Registry::new(RecordingBackend::new(&["uWidth", "uRadius"], &["aPosition"]))
    }

    #[test]
    fn mesh_handles_increase_strictly() {
        let mut registry = registry();
        let meshes: Vec<_> = (0..4)
            .map(|i| registry.create_mesh(2, i, &[0.0; 8]))
            .collect();
        assert!(meshes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn frame_texture_is_distinct_from_user_textures() {
        let mut registry = registry();
        let image = TextureData::solid_rgb(2, 2, [0, 0, 0]);
        let before = registry.create_texture(&image);
        let frame = registry.create_frame(8, 4).unwrap();
        let after = registry.create_texture(&image);

        let attachment = registry.frame_texture(frame);
        assert_ne!(attachment, before);
        assert_ne!(attachment, after);
        assert_eq!(registry.texture_frame(attachment), Some(frame));
        assert_eq!(registry.texture_frame(before), None);
        assert_eq!(registry.frame_size(frame), (8, 4));
    }

    #[test]
    fn incomplete_frame_is_an_error_and_registers_nothing() {
        let mut registry = registry();
        let err = registry.create_frame(0, 4).unwrap_err();
        assert!(matches!(err, RenderError::FramebufferIncomplete { .. }));

        let frame = registry.create_frame(1, 1).unwrap();
        assert_eq!(frame.index(), 0);
    }

    #[test]
    fn program_bindings_follow_request_order() {
        let mut registry = registry();
        let desc = ProgramDesc::new("Blur", "v", "f")
            .with_uniforms(&["uTexture", "uWidth", "uRadius"])
            .with_attributes(&["aPosition", "aTexture"]);
        let program = registry.create_program(&desc).unwrap();
        let table = registry.binding_table(program);

        let slots: Vec<_> = table.uniforms().map(|(_, slot)| slot).collect();
        assert_eq!(
            slots,
            vec![BindingSlot::INVALID, BindingSlot::new(0), BindingSlot::new(1)]
        );
        assert_eq!(
            table.attribute_slots().collect::<Vec<_>>(),
            vec![BindingSlot::new(0), BindingSlot::INVALID]
        );
        assert_eq!(registry.program_name(program), "Blur");
    }

    #[test]
    fn shutdown_releases_in_reverse_creation_order() {
        let mut registry = registry();
        let program = registry
            .create_program(&ProgramDesc::new("Image", "v", "f"))
            .unwrap();
        let frame = registry.create_frame(4, 4).unwrap();
        let mesh = registry.create_mesh(3, 6, &[0.0; 18]);
        let texture = registry.create_texture(&TextureData::solid_rgb(1, 1, [1, 2, 3]));

        let frame_id = registry.frame(frame).id;
        let attachment_id = registry.texture_id(registry.frame_texture(frame));
        let mesh_id = registry.mesh(mesh).id;
        let texture_id = registry.texture_id(texture);
        let program_id = registry.program(program).id;

        let backend = registry.shutdown();
        let released: Vec<_> = backend
            .calls
            .iter()
            .skip_while(|c| !matches!(c, Call::DestroyTexture(_)))
            .cloned()
            .collect();
        assert_eq!(
            released,
            vec![
                Call::DestroyTexture(texture_id),
                Call::DestroyBuffer(mesh_id),
                Call::DestroyFrame(frame_id),
                Call::DestroyTexture(attachment_id),
                Call::DestroyProgram(program_id),
            ]
        );
    }

    #[test]
    #[should_panic]
    fn foreign_frame_handle_panics() {
        let mut owner = registry();
        let frame = owner.create_frame(4, 4).unwrap();

        registry().frame_texture(frame);
    }
}
