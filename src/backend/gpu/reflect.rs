//! GLSL compilation and interface reflection through naga.
//!
//! Nothing here touches a device, so every check runs on machines without a GPU.

use naga::front::glsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, ImageClass, ImageDimension, Module, ScalarKind, TypeInner};

use crate::backend::ProgramDesc;
use crate::binding::BindingSlot;
use crate::error::{RenderError, ShaderStage};

/// Appended to the vertex stage of the pipeline variant that renders into frames.
pub(crate) const FLIP_TARGET_Y: &str = "#define FLIP_TARGET_Y\n";

/// Parses and validates one stage.
pub(crate) fn compile_stage(
    name: &str,
    stage: ShaderStage,
    source: &str,
) -> Result<Module, RenderError> {
    let naga_stage = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let module = glsl::Frontend::default()
        .parse(&glsl::Options::from(naga_stage), source)
        .map_err(|e| RenderError::compile(stage, name, e.emit_to_string(source)))?;

    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| RenderError::compile(stage, name, e.emit_to_string(source)))?;
    Ok(module)
}

/// Compiled stages of one program.
pub(crate) struct CompiledProgram {
    pub vertex: Module,
    /// Vertex stage built with [`FLIP_TARGET_Y`].
    pub flipped_vertex: Module,
    pub fragment: Module,
    pub layout: ProgramLayout,
}

/// Compiles both stages and the flipped vertex variant, then links them.
pub(crate) fn compile_program(desc: &ProgramDesc<'_>) -> Result<CompiledProgram, RenderError> {
    let vertex_src = desc.preprocessed(ShaderStage::Vertex);
    let vertex = compile_stage(desc.name, ShaderStage::Vertex, &vertex_src)?;
    let fragment_src = desc.preprocessed(ShaderStage::Fragment);
    let fragment = compile_stage(desc.name, ShaderStage::Fragment, &fragment_src)?;

    let layout = ProgramLayout::link(desc.name, &vertex, &fragment)?;

    let flipped_src = desc
        .clone()
        .with_define(FLIP_TARGET_Y)
        .preprocessed(ShaderStage::Vertex);
    let flipped_vertex = compile_stage(desc.name, ShaderStage::Vertex, &flipped_src)?;

    Ok(CompiledProgram {
        vertex,
        flipped_vertex,
        fragment,
        layout,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Int,
    Float,
}

/// A scalar member of a uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformField {
    pub name: String,
    pub binding: u32,
    pub offset: u32,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResourceKind {
    /// Uniform block of `size` bytes.
    Uniform { size: u32 },
    Texture,
    Sampler,
}

/// One entry of the program's bind group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Resource {
    pub binding: u32,
    pub kind: ResourceKind,
    pub visibility: wgpu::ShaderStages,
}

/// A float vertex input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VertexInput {
    pub name: String,
    pub location: u32,
    pub components: u32,
}

/// Everything the backend needs to know about a linked program's interface.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProgramLayout {
    /// Sorted by binding.
    pub resources: Vec<Resource>,
    /// Uniform slot `i` addresses `fields[i]`.
    pub fields: Vec<UniformField>,
    /// Sorted by location.
    pub inputs: Vec<VertexInput>,
}

impl ProgramLayout {
    /// Reflects both stages and checks that they fit together.
    pub fn link(name: &str, vertex: &Module, fragment: &Module) -> Result<Self, RenderError> {
        let mut layout = ProgramLayout::default();
        layout.add_resources(name, vertex, wgpu::ShaderStages::VERTEX)?;
        layout.add_resources(name, fragment, wgpu::ShaderStages::FRAGMENT)?;
        layout.resources.sort_by_key(|r| r.binding);

        let entry = entry_point(name, vertex, naga::ShaderStage::Vertex)?;
        for argument in &entry.function.arguments {
            let Some(Binding::Location { location, .. }) = argument.binding else {
                continue;
            };
            let input_name = argument.name.clone().unwrap_or_default();
            let components = match vertex.types[argument.ty].inner {
                TypeInner::Scalar(s) if s.kind == ScalarKind::Float => 1,
                TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float => {
                    size as u32
                }
                _ => {
                    return Err(RenderError::link(
                        name,
                        format!("attribute '{input_name}' is not a float scalar or vector"),
                    ));
                }
            };
            layout.inputs.push(VertexInput {
                name: input_name,
                location,
                components,
            });
        }
        layout.inputs.sort_by_key(|i| i.location);

        let outputs = output_locations(vertex, entry);
        let fragment_entry = entry_point(name, fragment, naga::ShaderStage::Fragment)?;
        for argument in &fragment_entry.function.arguments {
            if let Some(Binding::Location { location, .. }) = argument.binding {
                if !outputs.contains(&location) {
                    return Err(RenderError::link(
                        name,
                        format!(
                            "fragment input '{}' at location {location} is not written by the vertex shader",
                            argument.name.as_deref().unwrap_or("?")
                        ),
                    ));
                }
            }
        }

        Ok(layout)
    }

    /// Slot of a scalar uniform block member, or [`BindingSlot::INVALID`] for anything
    /// else, including texture and sampler names.
    pub fn uniform_slot(&self, name: &str) -> BindingSlot {
        let index = self.fields.iter().position(|f| f.name == name);
        BindingSlot::from(index.map(|i| i as u32))
    }

    /// Location of a vertex input.
    pub fn attribute_slot(&self, name: &str) -> BindingSlot {
        let input = self.inputs.iter().find(|i| i.name == name);
        BindingSlot::from(input.map(|i| i.location))
    }

    /// Texture bindings in binding order; the n-th reads texture unit n.
    pub fn texture_bindings(&self) -> impl Iterator<Item = u32> + '_ {
        self.resources
            .iter()
            .filter(|r| r.kind == ResourceKind::Texture)
            .map(|r| r.binding)
    }

    fn add_resources(
        &mut self,
        name: &str,
        module: &Module,
        stage: wgpu::ShaderStages,
    ) -> Result<(), RenderError> {
        for (_, global) in module.global_variables.iter() {
            let Some(binding) = &global.binding else {
                continue;
            };
            if binding.group != 0 {
                return Err(RenderError::link(
                    name,
                    format!("binding {} uses set {}; only set 0 is supported", binding.binding, binding.group),
                ));
            }

            let kind = match (global.space, &module.types[global.ty].inner) {
                (AddressSpace::Uniform, TypeInner::Struct { members, span }) => {
                    for member in members {
                        let kind = match module.types[member.ty].inner {
                            TypeInner::Scalar(s) if s.kind == ScalarKind::Sint => FieldKind::Int,
                            TypeInner::Scalar(s) if s.kind == ScalarKind::Float => FieldKind::Float,
                            _ => continue,
                        };
                        let Some(member_name) = &member.name else {
                            continue;
                        };
                        if self.fields.iter().any(|f| &f.name == member_name) {
                            continue;
                        }
                        self.fields.push(UniformField {
                            name: member_name.clone(),
                            binding: binding.binding,
                            offset: member.offset,
                            kind,
                        });
                    }
                    ResourceKind::Uniform { size: *span }
                }
                (
                    AddressSpace::Handle,
                    TypeInner::Image {
                        dim: ImageDimension::D2,
                        arrayed: false,
                        class: ImageClass::Sampled { multi: false, .. },
                    },
                ) => ResourceKind::Texture,
                (AddressSpace::Handle, TypeInner::Sampler { comparison: false }) => {
                    ResourceKind::Sampler
                }
                _ => {
                    return Err(RenderError::link(
                        name,
                        format!(
                            "binding {} has a type this backend cannot bind",
                            binding.binding
                        ),
                    ));
                }
            };

            match self.resources.iter_mut().find(|r| r.binding == binding.binding) {
                Some(existing) if existing.kind == kind => existing.visibility |= stage,
                Some(_) => {
                    return Err(RenderError::link(
                        name,
                        format!(
                            "binding {} is declared with different types in the two stages",
                            binding.binding
                        ),
                    ));
                }
                None => self.resources.push(Resource {
                    binding: binding.binding,
                    kind,
                    visibility: stage,
                }),
            }
        }
        Ok(())
    }
}

fn entry_point<'m>(
    name: &str,
    module: &'m Module,
    stage: naga::ShaderStage,
) -> Result<&'m naga::EntryPoint, RenderError> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage)
        .ok_or_else(|| RenderError::link(name, format!("no {stage:?} entry point")))
}

fn output_locations(module: &Module, entry: &naga::EntryPoint) -> Vec<u32> {
    let Some(result) = &entry.function.result else {
        return Vec::new();
    };
    if let Some(Binding::Location { location, .. }) = result.binding {
        return vec![location];
    }
    match &module.types[result.ty].inner {
        TypeInner::Struct { members, .. } => members
            .iter()
            .filter_map(|m| match m.binding {
                Some(Binding::Location { location, .. }) => Some(location),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blur::shaders::{GLSL_VERSION, QUAD_VERTEX};
    use crate::blur::{blur_program_desc, image_program_desc};

    #[test]
    fn blur_programs_compile_and_reflect() {
        let compiled = compile_program(&blur_program_desc("HorizontalBlur", "HORIZONTAL", 11))
            .unwrap();
        let layout = &compiled.layout;

        assert_eq!(layout.uniform_slot("uWidth"), BindingSlot::new(0));
        assert_eq!(layout.uniform_slot("uHeight"), BindingSlot::new(1));
        assert_eq!(layout.uniform_slot("uRadius"), BindingSlot::new(2));
        assert_eq!(layout.uniform_slot("uTexture"), BindingSlot::INVALID);
        assert_eq!(layout.fields[2].kind, FieldKind::Float);
        assert_eq!(layout.fields[1].offset, 4);

        assert_eq!(layout.attribute_slot("aPosition"), BindingSlot::new(0));
        assert_eq!(layout.attribute_slot("aTexture"), BindingSlot::new(1));
        assert_eq!(layout.inputs[0].components, 3);
        assert_eq!(layout.inputs[1].components, 2);

        let kinds: Vec<_> = layout.resources.iter().map(|r| (r.binding, r.kind)).collect();
        assert!(matches!(kinds[0], (0, ResourceKind::Uniform { size }) if size >= 12));
        assert_eq!(kinds[1], (1, ResourceKind::Texture));
        assert_eq!(kinds[2], (2, ResourceKind::Sampler));
        assert_eq!(layout.texture_bindings().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn image_program_has_no_uniform_block() {
        let compiled = compile_program(&image_program_desc()).unwrap();
        assert!(compiled.layout.fields.is_empty());
        assert_eq!(compiled.layout.resources.len(), 2);
    }

    #[test]
    fn missing_kernel_is_a_fragment_error() {
        let mut desc = blur_program_desc("VerticalBlur", "VERTICAL", 11);
        desc.defines.pop();
        match compile_program(&desc) {
            Err(RenderError::ShaderCompile { stage, name, .. }) => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(name, "VerticalBlur");
            }
            other => panic!("expected a compile error, got {:?}", other.err()),
        }
    }

    #[test]
    fn unmatched_fragment_input_fails_to_link() {
        const FRAGMENT: &str = r#"
layout(location = 3) in vec2 vOther;
layout(location = 0) out vec4 fragColor;
void main() {
    fragColor = vec4(vOther, 0.0, 1.0);
}
"#;
        let desc = ProgramDesc::new("Broken", QUAD_VERTEX, FRAGMENT).with_define(GLSL_VERSION);
        assert!(matches!(
            compile_program(&desc),
            Err(RenderError::ProgramLink { .. })
        ));
    }
}
