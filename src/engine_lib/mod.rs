// src/engine_lib/mod.rs

pub mod camera;
pub mod controller;
pub mod math;
pub mod physics;
pub mod portal;
pub mod scene_builder;
pub mod scene_types;

pub use camera::Camera;
pub use controller::PlayerController;
pub use scene_builder::{NodeKind, NodeSpec, SceneBuildError, SceneSpec};
pub use scene_types::{Aabb, CameraLens, Mesh, Node, NodeId, Scene, TextureData};
