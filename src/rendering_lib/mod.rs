// src/rendering_lib/mod.rs

pub mod pass_builder;
pub mod renderer;
pub mod shader;
pub mod vertex;

pub use pass_builder::{DrawCmd, FrameBuilder, PassKind, MAX_RECURSION_LEVEL};
pub use renderer::Renderer;
pub use shader::WGSL_SHADER_SOURCE;
pub use vertex::Vertex;
