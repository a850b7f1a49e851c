//! wgpu implementation of [`Backend`].
//!
//! GLSL is compiled and reflected by naga, so uniform and attribute names resolve
//! to slots exactly like a GL driver would report them. Each program owns two
//! pipelines: one for the screen and one for frames. The frame variant is built with
//! `FLIP_TARGET_Y`, which keeps frame textures bottom-row first like every uploaded
//! image.
//!
//! Every draw is its own render pass and queue submission. Uniform staging is
//! uploaded right before the submission, so successive passes of one program each see
//! their own values.

mod context;
mod reflect;

pub use context::{GpuContext, SurfaceErrorAction, HEADLESS_FORMAT};

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use self::reflect::{FieldKind, ProgramLayout, ResourceKind, VertexInput};
use super::{Backend, ProgramDesc};
use crate::binding::{BindingSlot, BindingTable};
use crate::error::{FramebufferStatus, RenderError};
use crate::texture::{mip_chain, TextureData};
use crate::viewport::Viewport;

const TEXTURE_UNITS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(usize);

struct UniformBlock {
    binding: u32,
    staging: Vec<u8>,
    buffer: wgpu::Buffer,
}

struct GpuProgram {
    name: String,
    layout: ProgramLayout,
    bind_group_layout: wgpu::BindGroupLayout,
    screen_pipeline: wgpu::RenderPipeline,
    frame_pipeline: wgpu::RenderPipeline,
    blocks: Vec<UniformBlock>,
}

impl GpuProgram {
    fn write_uniform(&mut self, slot: BindingSlot, kind: FieldKind, bytes: &[u8]) {
        let Some(field) = slot.index().and_then(|i| self.layout.fields.get(i)) else {
            return;
        };
        if field.kind != kind {
            log::debug!(
                "{kind:?} write to {:?} uniform '{}' ignored",
                field.kind,
                field.name
            );
            return;
        }
        let Some(block) = self.blocks.iter_mut().find(|b| b.binding == field.binding) else {
            return;
        };
        let start = field.offset as usize;
        block.staging[start..start + bytes.len()].copy_from_slice(bytes);
    }
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct VertexBuffer {
    buffer: wgpu::Buffer,
    dimensions: u32,
}

struct CurrentFrame {
    screen: context::ScreenImage,
    clear: wgpu::Color,
    cleared: bool,
}

#[derive(Default)]
struct DrawState {
    target: Option<FramebufferId>,
    viewport: Viewport,
    program: Option<ProgramId>,
    textures: [Option<TextureId>; TEXTURE_UNITS],
    /// Indexed by attribute location.
    attributes: Vec<Option<(BufferId, u32)>>,
}

type BindGroupKey = (ProgramId, Vec<Option<TextureId>>);

/// Renders through wgpu onto a window surface or a headless texture.
pub struct GpuBackend {
    context: GpuContext,
    sampler: wgpu::Sampler,
    fallback: GpuTexture,
    programs: Vec<Option<GpuProgram>>,
    textures: Vec<Option<GpuTexture>>,
    framebuffers: Vec<Option<TextureId>>,
    buffers: Vec<Option<VertexBuffer>>,
    bind_groups: HashMap<BindGroupKey, wgpu::BindGroup>,
    frame: Option<CurrentFrame>,
    state: DrawState,
}

impl GpuBackend {
    /// Creates a backend presenting to `window`.
    pub fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        Ok(Self::with_context(GpuContext::new(window)?))
    }

    /// Creates a backend drawing into an owned `width × height` texture.
    pub fn headless(width: u32, height: u32) -> Result<Self, RenderError> {
        Ok(Self::with_context(GpuContext::headless(width, height)?))
    }

    pub fn with_context(context: GpuContext) -> Self {
        let sampler = context.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Pass Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let fallback = upload_rgba8(&context, "Unbound Texture", 1, 1, vec![0, 0, 0, 255]);

        Self {
            context,
            sampler,
            fallback,
            programs: Vec::new(),
            textures: Vec::new(),
            framebuffers: Vec::new(),
            buffers: Vec::new(),
            bind_groups: HashMap::new(),
            frame: None,
            state: DrawState::default(),
        }
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Headless screen contents as RGBA8, bottom row first.
    pub fn read_screen_rgba8(&self) -> Result<Vec<u8>, RenderError> {
        self.context.read_screen_rgba8()
    }

    fn create_pipeline(
        &self,
        name: &str,
        layout: &wgpu::PipelineLayout,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
        inputs: &[VertexInput],
    ) -> wgpu::RenderPipeline {
        let attributes: Vec<[wgpu::VertexAttribute; 1]> = inputs
            .iter()
            .map(|input| {
                [wgpu::VertexAttribute {
                    format: float_format(input.components),
                    offset: 0,
                    shader_location: input.location,
                }]
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = inputs
            .iter()
            .zip(&attributes)
            .map(|(input, attributes)| wgpu::VertexBufferLayout {
                array_stride: u64::from(input.components) * 4,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        self.context
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(name),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: vertex,
                    entry_point: Some("main"),
                    buffers: &buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: fragment,
                    entry_point: Some("main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.context.format(),
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
    }

    fn texture_units(&self, program: &GpuProgram) -> Vec<Option<TextureId>> {
        program
            .layout
            .texture_bindings()
            .enumerate()
            .map(|(unit, _)| self.state.textures.get(unit).copied().flatten())
            .collect()
    }

    /// Makes sure a bind group for the program in use and the bound textures is cached.
    fn prepare_bind_group(&mut self, program_id: ProgramId) -> Option<BindGroupKey> {
        let program = self.programs.get(program_id.0)?.as_ref()?;
        let key = (program_id, self.texture_units(program));
        if self.bind_groups.contains_key(&key) {
            return Some(key);
        }

        let mut units = key.1.iter();
        let mut entries = Vec::with_capacity(program.layout.resources.len());
        for resource in &program.layout.resources {
            let resource_binding = match resource.kind {
                ResourceKind::Uniform { .. } => program
                    .blocks
                    .iter()
                    .find(|b| b.binding == resource.binding)?
                    .buffer
                    .as_entire_binding(),
                ResourceKind::Texture => {
                    let texture = units
                        .next()
                        .copied()
                        .flatten()
                        .and_then(|t| self.textures.get(t.0)?.as_ref())
                        .unwrap_or(&self.fallback);
                    wgpu::BindingResource::TextureView(&texture.view)
                }
                ResourceKind::Sampler => wgpu::BindingResource::Sampler(&self.sampler),
            };
            entries.push(wgpu::BindGroupEntry {
                binding: resource.binding,
                resource: resource_binding,
            });
        }

        let group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(program.name.as_str()),
                layout: &program.bind_group_layout,
                entries: &entries,
            });
        self.bind_groups.insert(key.clone(), group);
        Some(key)
    }

    fn frame_texture(&self, framebuffer: FramebufferId) -> Option<&GpuTexture> {
        let texture = self.framebuffers.get(framebuffer.0).copied().flatten()?;
        self.textures.get(texture.0)?.as_ref()
    }

    fn clear_screen(&mut self) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Screen Clear"),
            });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Screen Clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.screen.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(frame.clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        frame.cleared = true;
        self.context.queue.submit(Some(encoder.finish()));
    }
}

impl Backend for GpuBackend {
    type Program = ProgramId;
    type Framebuffer = FramebufferId;
    type Buffer = BufferId;
    type Texture = TextureId;

    fn compile_program(
        &mut self,
        desc: &ProgramDesc<'_>,
    ) -> Result<(ProgramId, BindingTable), RenderError> {
        let compiled = reflect::compile_program(desc)?;
        let layout = compiled.layout;
        let device = &self.context.device;

        let entries: Vec<wgpu::BindGroupLayoutEntry> = layout
            .resources
            .iter()
            .map(|resource| wgpu::BindGroupLayoutEntry {
                binding: resource.binding,
                visibility: resource.visibility,
                ty: match resource.kind {
                    ResourceKind::Uniform { .. } => wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    ResourceKind::Texture => wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    ResourceKind::Sampler => {
                        wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
                    }
                },
                count: None,
            })
            .collect();

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(desc.name),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.name),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let module = |module: naga::Module| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(desc.name),
                source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
            })
        };
        let vertex = module(compiled.vertex);
        let flipped_vertex = module(compiled.flipped_vertex);
        let fragment = module(compiled.fragment);

        let screen_pipeline =
            self.create_pipeline(desc.name, &pipeline_layout, &vertex, &fragment, &layout.inputs);
        let frame_pipeline = self.create_pipeline(
            desc.name,
            &pipeline_layout,
            &flipped_vertex,
            &fragment,
            &layout.inputs,
        );
        if let Some(err) = pollster::block_on(self.context.device.pop_error_scope()) {
            return Err(RenderError::link(desc.name, err.to_string()));
        }

        let blocks = layout
            .resources
            .iter()
            .filter_map(|resource| match resource.kind {
                ResourceKind::Uniform { size } => Some((resource.binding, size)),
                _ => None,
            })
            .map(|(binding, size)| {
                let size = (size as usize).max(1).next_multiple_of(16);
                UniformBlock {
                    binding,
                    staging: vec![0; size],
                    buffer: self.context.device.create_buffer(&wgpu::BufferDescriptor {
                        label: Some(desc.name),
                        size: size as u64,
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                        mapped_at_creation: false,
                    }),
                }
            })
            .collect();

        let table = BindingTable::resolve(
            desc.uniforms,
            desc.attributes,
            |name| layout.uniform_slot(name),
            |name| layout.attribute_slot(name),
        );

        self.programs.push(Some(GpuProgram {
            name: desc.name.to_string(),
            layout,
            bind_group_layout,
            screen_pipeline,
            frame_pipeline,
            blocks,
        }));
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

        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Frame"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.context.format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            log::warn!("frame {width}x{height} rejected: {err}");
            return Err(RenderError::FramebufferIncomplete {
                status: FramebufferStatus::Unsupported,
            });
        }
        self.textures.push(Some(GpuTexture { texture, view }));
        let texture = TextureId(self.textures.len() - 1);
        self.framebuffers.push(Some(texture));
        Ok((FramebufferId(self.framebuffers.len() - 1), texture))
    }

    fn create_buffer(&mut self, dimensions: u32, count: u32, data: &[f32]) -> BufferId {
        let len = (dimensions as usize * count as usize).min(data.len());
        let buffer = self
            .context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Attribute"),
                contents: bytemuck::cast_slice(&data[..len]),
                usage: wgpu::BufferUsages::VERTEX,
            });
        self.buffers.push(Some(VertexBuffer { buffer, dimensions }));
        BufferId(self.buffers.len() - 1)
    }

    fn create_texture(&mut self, data: &TextureData) -> TextureId {
        let max = self.context.device.limits().max_texture_dimension_2d;
        let texture = if data.width == 0 || data.height == 0 || data.width.max(data.height) > max {
            log::warn!(
                "cannot upload a {}x{} texture, substituting black",
                data.width,
                data.height
            );
            upload_rgba8(&self.context, "Texture", 1, 1, vec![0, 0, 0, 255])
        } else {
            upload_rgba8(&self.context, "Texture", data.width, data.height, data.to_rgba8())
        };
        self.textures.push(Some(texture));
        TextureId(self.textures.len() - 1)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
    }

    fn begin_frame(&mut self, clear: [f32; 4]) -> Result<bool, RenderError> {
        if let Some(stale) = self.frame.take() {
            stale.screen.present();
        }
        let Some(screen) = self.context.acquire()? else {
            return Ok(false);
        };
        let [r, g, b, a] = clear.map(f64::from);
        self.frame = Some(CurrentFrame {
            screen,
            clear: wgpu::Color { r, g, b, a },
            cleared: false,
        });
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
        if let Some(program) = self.current_program_mut() {
            program.write_uniform(slot, FieldKind::Int, bytemuck::bytes_of(&value));
        }
    }

    fn set_uniform_f32(&mut self, slot: BindingSlot, value: f32) {
        if let Some(program) = self.current_program_mut() {
            program.write_uniform(slot, FieldKind::Float, bytemuck::bytes_of(&value));
        }
    }

    fn enable_attribute(&mut self, slot: BindingSlot, buffer: BufferId, dimensions: u32) {
        let Some(location) = slot.index() else {
            return;
        };
        let attributes = &mut self.state.attributes;
        if attributes.len() <= location {
            attributes.resize(location + 1, None);
        }
        attributes[location] = Some((buffer, dimensions));
    }

    fn disable_attribute(&mut self, slot: BindingSlot) {
        if let Some(bound) = slot.index().and_then(|i| self.state.attributes.get_mut(i)) {
            *bound = None;
        }
    }

    fn draw_triangles(&mut self, vertex_count: u32) {
        let Some(program_id) = self.state.program else {
            log::warn!("draw without a program in use");
            return;
        };
        let Some(key) = self.prepare_bind_group(program_id) else {
            log::warn!("draw with destroyed program {program_id:?}");
            return;
        };

        let load = match (self.state.target, self.frame.as_mut()) {
            (Some(_), _) => wgpu::LoadOp::Load,
            (None, Some(frame)) if frame.cleared => wgpu::LoadOp::Load,
            (None, Some(frame)) => {
                frame.cleared = true;
                wgpu::LoadOp::Clear(frame.clear)
            }
            (None, None) => {
                log::warn!("screen draw outside of a frame");
                return;
            }
        };

        let Some(program) = self.programs[program_id.0].as_ref() else {
            return;
        };
        for block in &program.blocks {
            self.context.queue.write_buffer(&block.buffer, 0, &block.staging);
        }

        let mut vertex_buffers = Vec::with_capacity(program.layout.inputs.len());
        for input in &program.layout.inputs {
            let bound = self
                .state
                .attributes
                .get(input.location as usize)
                .copied()
                .flatten();
            let Some((buffer, dimensions)) = bound else {
                log::warn!(
                    "attribute '{}' of '{}' is not enabled, skipping draw",
                    input.name,
                    program.name
                );
                return;
            };
            let Some(vertex_buffer) = self.buffers.get(buffer.0).and_then(Option::as_ref) else {
                log::warn!("draw with destroyed buffer {buffer:?}");
                return;
            };
            if dimensions != input.components || vertex_buffer.dimensions != dimensions {
                log::warn!(
                    "attribute '{}' expects {} components, buffer has {dimensions}",
                    input.name,
                    input.components
                );
            }
            vertex_buffers.push(&vertex_buffer.buffer);
        }

        let (view, pipeline, (width, height)) = match self.state.target {
            None => match &self.frame {
                Some(frame) => (
                    &frame.screen.view,
                    &program.screen_pipeline,
                    (self.context.width(), self.context.height()),
                ),
                None => return,
            },
            Some(framebuffer) => match self.frame_texture(framebuffer) {
                Some(frame) => (
                    &frame.view,
                    &program.frame_pipeline,
                    (frame.texture.width(), frame.texture.height()),
                ),
                None => {
                    log::warn!("draw into destroyed frame {framebuffer:?}");
                    return;
                }
            },
        };
        let viewport = self.state.viewport.clamped_to(width, height);
        if viewport.width == 0 || viewport.height == 0 {
            return;
        }
        // GL viewports are anchored bottom-left; frame contents are already flipped.
        let y = if self.state.target.is_none() {
            height - viewport.height
        } else {
            0
        };
        let Some(bind_group) = self.bind_groups.get(&key) else {
            return;
        };

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(program.name.as_str()),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(program.name.as_str()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            for (index, buffer) in vertex_buffers.iter().enumerate() {
                pass.set_vertex_buffer(index as u32, buffer.slice(..));
            }
            pass.set_viewport(
                0.0,
                y as f32,
                viewport.width as f32,
                viewport.height as f32,
                0.0,
                1.0,
            );
            pass.draw(0..vertex_count, 0..1);
        }
        self.context.queue.submit(Some(encoder.finish()));
    }

    fn present(&mut self) {
        if self.frame.as_ref().is_some_and(|f| !f.cleared) {
            self.clear_screen();
        }
        if let Some(frame) = self.frame.take() {
            frame.screen.present();
        }
    }

    fn destroy_program(&mut self, program: ProgramId) {
        if let Some(slot) = self.programs.get_mut(program.0) {
            *slot = None;
        }
        self.bind_groups.retain(|(p, _), _| *p != program);
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
        if let Some(slot) = self.textures.get_mut(texture.0) {
            *slot = None;
        }
        self.bind_groups
            .retain(|(_, units), _| !units.contains(&Some(texture)));
    }
}

impl GpuBackend {
    fn current_program_mut(&mut self) -> Option<&mut GpuProgram> {
        let program = self.state.program?;
        self.programs.get_mut(program.0)?.as_mut()
    }
}

fn float_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

/// Uploads RGBA8 pixels, bottom row first, with a full mip chain.
fn upload_rgba8(
    context: &GpuContext,
    label: &str,
    width: u32,
    height: u32,
    rgba: Vec<u8>,
) -> GpuTexture {
    let levels = mip_chain(width, height, rgba);
    let bytes: Vec<u8> = levels.iter().flat_map(|l| l.rgba.iter().copied()).collect();
    let texture = context.device.create_texture_with_data(
        &context.queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &bytes,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture { texture, view }
}
