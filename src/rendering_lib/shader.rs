// src/rendering_lib/shader.rs

pub const WGSL_SHADER_SOURCE: &str = r#"
struct DrawUniform {
    view_model: mat4x4<f32>,
    projection: mat4x4<f32>,
    factor: f32,
}

@group(0) @binding(0)
var<uniform> draw: DrawUniform;

@group(1) @binding(0)
var t_diffuse: texture_2d<f32>;
@group(1) @binding(1)
var s_diffuse: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) texcoord: vec2<f32>,
    @location(2) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) texcoord: vec2<f32>,
}

@vertex
fn vs_main(model: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.texcoord = model.texcoord;
    out.clip_position = draw.projection * draw.view_model * vec4<f32>(model.position, 1.0);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let texture_color = textureSample(t_diffuse, s_diffuse, in.texcoord);
    // The factor brightens portal faces; clamp so saturated texels stay put.
    let rgb = min(texture_color.rgb * draw.factor, vec3<f32>(1.0));
    return vec4<f32>(rgb, texture_color.a);
}

// Fullscreen triangle on the far plane; drawn with depth compare Always and
// depth writes on, it resets the depth buffer without interrupting the pass.
@vertex
fn vs_depth_clear(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let x = f32(i32(index / 2u) * 4 - 1);
    let y = f32(i32(index & 1u) * 4 - 1);
    return vec4<f32>(x, y, 1.0, 1.0);
}

@fragment
fn fs_depth_clear() -> @location(0) vec4<f32> {
    return vec4<f32>(0.0);
}
"#;
