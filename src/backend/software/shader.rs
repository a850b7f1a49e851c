//! CPU shader programs and the library that maps shader sources onto them.
//!
//! The software backend cannot execute GLSL. Instead every program source pair a
//! caller may compile is registered in a [`ShaderLibrary`] together with a factory
//! that builds an equivalent [`ShaderProgram`] from the pass defines. Compiling a
//! [`ProgramDesc`] then goes through the exact same registry path as on the GPU.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use glam::Vec4;

use super::raster::Samplers;
use crate::backend::ProgramDesc;
use crate::error::{RenderError, ShaderStage};

/// Scalar type of a CPU program uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Int,
    Float,
}

/// Current value of a uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
}

impl UniformKind {
    /// Value a uniform holds before anything is written to it.
    pub fn zero(self) -> UniformValue {
        match self {
            UniformKind::Int => UniformValue::Int(0),
            UniformKind::Float => UniformValue::Float(0.0),
        }
    }
}

/// A uniform declared by a CPU program. Its slot is its position in
/// [`ShaderProgram::uniforms`].
#[derive(Debug, Clone, Copy)]
pub struct UniformDecl {
    pub name: &'static str,
    pub kind: UniformKind,
}

impl UniformDecl {
    pub const fn int(name: &'static str) -> Self {
        Self {
            name,
            kind: UniformKind::Int,
        }
    }

    pub const fn float(name: &'static str) -> Self {
        Self {
            name,
            kind: UniformKind::Float,
        }
    }
}

/// Read access to a program's uniform values by slot.
#[derive(Debug, Clone, Copy)]
pub struct Uniforms<'a> {
    values: &'a [UniformValue],
}

impl<'a> Uniforms<'a> {
    pub fn new(values: &'a [UniformValue]) -> Self {
        Self { values }
    }

    /// Int value at `slot`, or 0 if the slot holds no int.
    pub fn int(&self, slot: usize) -> i32 {
        match self.values.get(slot) {
            Some(UniformValue::Int(v)) => *v,
            _ => 0,
        }
    }

    /// Float value at `slot`, or 0.0 if the slot holds no float.
    pub fn float(&self, slot: usize) -> f32 {
        match self.values.get(slot) {
            Some(UniformValue::Float(v)) => *v,
            _ => 0.0,
        }
    }
}

/// Output of the vertex stage: clip-space position plus one vec4 of varyings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexOut {
    pub position: Vec4,
    pub varying: Vec4,
}

/// A vertex/fragment pair executed on the CPU.
pub trait ShaderProgram {
    /// Declared uniforms, in slot order.
    fn uniforms(&self) -> &[UniformDecl];

    /// Declared vertex attribute names, in slot order.
    fn attributes(&self) -> &[&'static str];

    /// Called once per draw with the current uniform values.
    fn prepare(&mut self, _uniforms: &Uniforms<'_>) {}

    /// Runs the vertex stage. `attributes` holds one vec4 per declared attribute;
    /// missing components read as `(0, 0, 0, 1)`.
    fn vertex(&self, attributes: &[Vec4]) -> VertexOut;

    /// Runs the fragment stage with the interpolated varyings.
    fn fragment(&self, samplers: &Samplers<'_>, varying: Vec4) -> Vec4;
}

/// Preprocessor symbols parsed from `#define` lines.
#[derive(Debug, Clone, Default)]
pub struct Defines {
    values: HashMap<String, String>,
}

impl Defines {
    /// Collects every `#define NAME [VALUE]` line. Other directives are ignored.
    pub fn parse<S: AsRef<str>>(chunks: &[S]) -> Self {
        let mut values = HashMap::new();
        for line in chunks.iter().flat_map(|chunk| chunk.as_ref().lines()) {
            let Some(rest) = line.trim().strip_prefix("#define") else {
                continue;
            };
            let mut parts = rest.trim().splitn(2, char::is_whitespace);
            if let Some(name) = parts.next().filter(|n| !n.is_empty()) {
                let value = parts.next().unwrap_or("").trim();
                values.insert(name.to_string(), value.to_string());
            }
        }
        Self { values }
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Parses the value of a define, producing a compiler-style message on failure.
    pub fn value<T>(&self, name: &str) -> Result<T, String>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self
            .values
            .get(name)
            .ok_or_else(|| format!("'{name}' : undeclared identifier"))?;
        raw.parse()
            .map_err(|err| format!("'{name}' : invalid value '{raw}': {err}"))
    }
}

/// Builds a CPU program from the defines of a program description, or returns the
/// failing stage with a log.
pub type ProgramFactory = fn(&Defines) -> Result<Box<dyn ShaderProgram>, (ShaderStage, String)>;

/// CPU implementations keyed by their `(vertex, fragment)` source text.
#[derive(Default)]
pub struct ShaderLibrary {
    programs: HashMap<(String, String), ProgramFactory>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the CPU implementation of a source pair.
    pub fn register(&mut self, vertex: &str, fragment: &str, factory: ProgramFactory) {
        self.programs
            .insert((vertex.to_string(), fragment.to_string()), factory);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, vertex: &str, fragment: &str, factory: ProgramFactory) -> Self {
        self.register(vertex, fragment, factory);
        self
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Builds the program described by `desc`.
    pub fn instantiate(&self, desc: &ProgramDesc<'_>) -> Result<Box<dyn ShaderProgram>, RenderError> {
        let key = (desc.vertex.to_string(), desc.fragment.to_string());
        let factory = self.programs.get(&key).ok_or_else(|| {
            RenderError::link(desc.name, "no software implementation registered for these sources")
        })?;

        let defines = Defines::parse(&desc.defines);
        factory(&defines).map_err(|(stage, log)| RenderError::compile(stage, desc.name, log))
    }
}

impl fmt::Debug for ShaderLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderLibrary")
            .field("programs", &self.programs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Solid;

    impl ShaderProgram for Solid {
        fn uniforms(&self) -> &[UniformDecl] {
            &[]
        }

        fn attributes(&self) -> &[&'static str] {
            &["aPosition"]
        }

        fn vertex(&self, attributes: &[Vec4]) -> VertexOut {
            VertexOut {
                position: attributes[0],
                varying: Vec4::ZERO,
            }
        }

        fn fragment(&self, _samplers: &Samplers<'_>, _varying: Vec4) -> Vec4 {
            Vec4::ONE
        }
    }

    fn solid(defines: &Defines) -> Result<Box<dyn ShaderProgram>, (ShaderStage, String)> {
        if defines.is_defined("BROKEN") {
            return Err((ShaderStage::Fragment, "syntax error".into()));
        }
        Ok(Box::new(Solid))
    }

    #[test]
    fn defines_parse_names_and_values() {
        let defines = Defines::parse(&["#version 450\n", "#define HORIZONTAL\n", "#define KERNEL 11\n"]);
        assert!(defines.is_defined("HORIZONTAL"));
        assert!(!defines.is_defined("VERTICAL"));
        assert_eq!(defines.value::<usize>("KERNEL"), Ok(11));
    }

    #[test]
    fn missing_define_reads_like_a_compiler_error() {
        let defines = Defines::parse(&["#define HORIZONTAL\n"]);
        let err = defines.value::<usize>("KERNEL").unwrap_err();
        assert!(err.contains("KERNEL"));
        assert!(defines.value::<usize>("HORIZONTAL").is_err());
    }

    #[test]
    fn unregistered_sources_fail_to_link() {
        let library = ShaderLibrary::new().with("v", "f", solid);
        let desc = ProgramDesc::new("Other", "v", "g");
        assert!(matches!(
            library.instantiate(&desc),
            Err(RenderError::ProgramLink { .. })
        ));
    }

    #[test]
    fn factory_errors_carry_the_stage() {
        let library = ShaderLibrary::new().with("v", "f", solid);
        let desc = ProgramDesc::new("Solid", "v", "f").with_define("#define BROKEN\n");
        match library.instantiate(&desc) {
            Err(RenderError::ShaderCompile { stage, name, .. }) => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(name, "Solid");
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn uniforms_read_zero_on_kind_mismatch() {
        let values = [UniformValue::Int(4), UniformValue::Float(2.5)];
        let uniforms = Uniforms::new(&values);
        assert_eq!(uniforms.int(0), 4);
        assert_eq!(uniforms.float(0), 0.0);
        assert_eq!(uniforms.float(1), 2.5);
        assert_eq!(uniforms.int(7), 0);
    }
}
