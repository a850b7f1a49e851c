//! CPU versions of the blur programs for [`SoftwareBackend`](crate::SoftwareBackend).

use glam::{Vec2, Vec4, Vec4Swizzles};

use super::gaussian_weights;
use super::shaders::{BLUR_FRAGMENT, IMAGE_FRAGMENT, QUAD_ATTRIBUTES, QUAD_VERTEX};
use crate::backend::software::{
    Defines, Samplers, ShaderLibrary, ShaderProgram, UniformDecl, Uniforms, VertexOut,
};
use crate::error::ShaderStage;

const BLUR_UNIFORM_DECLS: [UniformDecl; 3] = [
    UniformDecl::int("uWidth"),
    UniformDecl::int("uHeight"),
    UniformDecl::float("uRadius"),
];

/// Library able to compile every program the blur effect creates.
pub fn shader_library() -> ShaderLibrary {
    ShaderLibrary::new()
        .with(QUAD_VERTEX, IMAGE_FRAGMENT, image_program)
        .with(QUAD_VERTEX, BLUR_FRAGMENT, blur_program)
}

fn quad_vertex(attributes: &[Vec4]) -> VertexOut {
    VertexOut {
        position: attributes[0].xyz().extend(1.0),
        varying: attributes[1],
    }
}

struct ImageProgram;

impl ShaderProgram for ImageProgram {
    fn uniforms(&self) -> &[UniformDecl] {
        &[]
    }

    fn attributes(&self) -> &[&'static str] {
        &QUAD_ATTRIBUTES
    }

    fn vertex(&self, attributes: &[Vec4]) -> VertexOut {
        quad_vertex(attributes)
    }

    fn fragment(&self, samplers: &Samplers<'_>, varying: Vec4) -> Vec4 {
        samplers.sample(0, varying.xy()).xyz().extend(1.0)
    }
}

fn image_program(_: &Defines) -> Result<Box<dyn ShaderProgram>, (ShaderStage, String)> {
    Ok(Box::new(ImageProgram))
}

struct BlurProgram {
    axis: Vec2,
    kernel: usize,
    weights: Vec<f32>,
    step: Vec2,
}

impl ShaderProgram for BlurProgram {
    fn uniforms(&self) -> &[UniformDecl] {
        &BLUR_UNIFORM_DECLS
    }

    fn attributes(&self) -> &[&'static str] {
        &QUAD_ATTRIBUTES
    }

    fn prepare(&mut self, uniforms: &Uniforms<'_>) {
        let size = Vec2::new(uniforms.int(0).max(1) as f32, uniforms.int(1).max(1) as f32);
        self.step = self.axis / size;
        self.weights = gaussian_weights(uniforms.float(2), self.kernel);
    }

    fn vertex(&self, attributes: &[Vec4]) -> VertexOut {
        quad_vertex(attributes)
    }

    fn fragment(&self, samplers: &Samplers<'_>, varying: Vec4) -> Vec4 {
        let uv = varying.xy();
        let mut result = samplers.sample(0, uv).xyz() * self.weights[0];
        for (i, &w) in self.weights.iter().enumerate().skip(1) {
            let offset = self.step * i as f32;
            result += samplers.sample(0, uv + offset).xyz() * w;
            result += samplers.sample(0, uv - offset).xyz() * w;
        }
        result.extend(1.0)
    }
}

fn blur_program(defines: &Defines) -> Result<Box<dyn ShaderProgram>, (ShaderStage, String)> {
    let kernel: usize = defines
        .value("KERNEL")
        .map_err(|log| (ShaderStage::Fragment, log))?;
    if kernel == 0 {
        return Err((
            ShaderStage::Fragment,
            "'weight' : array size must be a positive integer".to_string(),
        ));
    }

    let axis = if defines.is_defined("HORIZONTAL") {
        Vec2::X
    } else {
        Vec2::Y
    };
    Ok(Box::new(BlurProgram {
        axis,
        kernel,
        weights: vec![1.0],
        step: Vec2::ZERO,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::software::UniformValue;

    fn defines(lines: &[&str]) -> Defines {
        Defines::parse(lines)
    }

    #[test]
    fn kernel_define_is_required() {
        let err = blur_program(&defines(&["#define HORIZONTAL\n"])).err().unwrap();
        assert_eq!(err.0, ShaderStage::Fragment);
        assert!(err.1.contains("KERNEL"));

        assert!(blur_program(&defines(&["#define KERNEL 0\n"])).is_err());
    }

    #[test]
    fn direction_follows_the_defines() {
        let mut horizontal = BlurProgram {
            axis: Vec2::X,
            kernel: 3,
            weights: Vec::new(),
            step: Vec2::ZERO,
        };
        let values = [
            UniformValue::Int(4),
            UniformValue::Int(2),
            UniformValue::Float(1.0),
        ];
        horizontal.prepare(&Uniforms::new(&values));
        assert_eq!(horizontal.step, Vec2::new(0.25, 0.0));
        assert_eq!(horizontal.weights.len(), 3);

        let vertical = blur_program(&defines(&["#define VERTICAL\n", "#define KERNEL 5\n"]));
        assert!(vertical.is_ok());
    }
}
