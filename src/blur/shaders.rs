//! GLSL sources of the blur pipeline.
//!
//! Sources are Vulkan-flavoured GLSL 450 without a `#version` line; the version and the
//! pass defines are prepended when a program is created. Samplers use separate
//! `texture2D` and `sampler` bindings so the same text compiles through naga.

/// First define of every program.
pub const GLSL_VERSION: &str = "#version 450\n";

/// Full-screen quad vertex stage shared by all programs.
///
/// With `FLIP_TARGET_Y` defined the quad is mirrored vertically, which keeps the
/// bottom-left origin when rendering into a texture on APIs whose framebuffer origin
/// is the top-left corner.
pub const QUAD_VERTEX: &str = r#"
layout(location = 0) in vec3 aPosition;
layout(location = 1) in vec2 aTexture;
layout(location = 0) out vec2 vTexture;

void main() {
#ifdef FLIP_TARGET_Y
    gl_Position = vec4(aPosition.x, -aPosition.y, aPosition.z, 1.0);
#else
    gl_Position = vec4(aPosition.x, aPosition.y, aPosition.z, 1.0);
#endif
    vTexture = aTexture;
}
"#;

/// Draws the bound texture unchanged.
pub const IMAGE_FRAGMENT: &str = r#"
layout(location = 0) in vec2 vTexture;
layout(location = 0) out vec4 fragColor;

layout(set = 0, binding = 1) uniform texture2D uTexture;
layout(set = 0, binding = 2) uniform sampler uSampler;

void main() {
    fragColor = vec4(texture(sampler2D(uTexture, uSampler), vTexture).rgb, 1.0);
}
"#;

/// One direction of the separable Gaussian. Requires `KERNEL` and either
/// `HORIZONTAL` or `VERTICAL`; anything but `HORIZONTAL` blurs along y.
pub const BLUR_FRAGMENT: &str = r#"
layout(location = 0) in vec2 vTexture;
layout(location = 0) out vec4 fragColor;

layout(set = 0, binding = 0) uniform BlurUniforms {
    int uWidth;
    int uHeight;
    float uRadius;
};
layout(set = 0, binding = 1) uniform texture2D uTexture;
layout(set = 0, binding = 2) uniform sampler uSampler;

void main() {
    vec2 texOffset = vec2(1.0) / vec2(float(uWidth), float(uHeight));

    float weight[KERNEL];
    float x = 2.0 * uRadius * uRadius;
    float sum = 0.0;
    for (int i = 0; i < KERNEL; i++) {
        weight[i] = exp(-(float(i * i) / x));
        sum += weight[i];
    }
    for (int i = 1; i < KERNEL; i++) {
        sum += weight[i];
    }

#ifdef HORIZONTAL
    vec2 dir = vec2(texOffset.x, 0.0);
#else
    vec2 dir = vec2(0.0, texOffset.y);
#endif

    vec3 result = textureLod(sampler2D(uTexture, uSampler), vTexture, 0.0).rgb * (weight[0] / sum);
    for (int i = 1; i < KERNEL; i++) {
        float w = weight[i] / sum;
        vec2 offset = dir * float(i);
        result += textureLod(sampler2D(uTexture, uSampler), vTexture + offset, 0.0).rgb * w;
        result += textureLod(sampler2D(uTexture, uSampler), vTexture - offset, 0.0).rgb * w;
    }

    fragColor = vec4(result, 1.0);
}
"#;

/// Uniforms the image program is asked for.
pub const IMAGE_UNIFORMS: [&str; 1] = ["uTexture"];

/// Uniforms the blur programs are asked for, in this order.
pub const BLUR_UNIFORMS: [&str; 4] = ["uTexture", "uWidth", "uHeight", "uRadius"];

/// Vertex attributes of every program.
pub const QUAD_ATTRIBUTES: [&str; 2] = ["aPosition", "aTexture"];

/// Two counter-clockwise triangles covering clip space.
pub const QUAD_POSITIONS: [f32; 18] = [
    -1.0, -1.0, 0.0, //
    1.0, 1.0, 0.0, //
    -1.0, 1.0, 0.0, //
    -1.0, -1.0, 0.0, //
    1.0, -1.0, 0.0, //
    1.0, 1.0, 0.0,
];

/// Texture coordinates matching [`QUAD_POSITIONS`].
pub const QUAD_TEXCOORDS: [f32; 12] = [
    0.0, 0.0, //
    1.0, 1.0, //
    0.0, 1.0, //
    0.0, 0.0, //
    1.0, 0.0, //
    1.0, 1.0,
];

pub const QUAD_VERTEX_COUNT: u32 = 6;
