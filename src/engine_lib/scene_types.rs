// src/engine_lib/scene_types.rs

use glam::{EulerRot, Mat4, Quat, Vec3};

// Type aliases for arena indices
pub type NodeId = usize;
pub type MeshId = usize;
pub type TextureId = usize;

// Axis-aligned bounding box in node-local space. The world-space box is this
// box translated by the node's world position; rotation is deliberately
// ignored for bounding purposes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn translated(&self, offset: Vec3) -> Aabb {
        Aabb {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

// CPU-side mesh data, uploaded once by the renderer.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub vertices: Vec<[f32; 3]>,
    pub texcoords: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u16>,
}

// RGBA8 pixel data.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Clone, Copy, Debug)]
pub struct CameraLens {
    pub fov_y_rad: f32,
    pub znear: f32,
    pub zfar: f32,
}

// A scene node. Instead of an inheritance chain (Node -> Model -> Portal and
// friends) every node is one record with optional capability fields; code
// dispatches on capability presence, e.g. `portal_destination.is_some()`.
#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,

    pub translation: Vec3,
    pub rotation: Vec3, // Euler XYZ, radians
    pub scale: Vec3,
    pub world_transform: Mat4,

    pub aabb: Option<Aabb>,
    pub velocity: Option<Vec3>,
    pub mesh: Option<MeshId>,
    pub texture: Option<TextureId>,
    pub portal_destination: Option<NodeId>,
    pub camera: Option<CameraLens>,
    pub is_checkpoint: bool,
    pub is_player: bool,

    // Transient collision state, cleared by physics at the start of each
    // moving node's step.
    pub collision_bottom: bool,
    pub collision_side: bool,
    pub closest_wall: Vec3,
    pub checkpoint: Option<Vec3>,
    pub checkpoint_rot: Option<Vec3>,
}

impl Node {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            children: Vec::new(),
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            world_transform: Mat4::IDENTITY,
            aabb: None,
            velocity: None,
            mesh: None,
            texture: None,
            portal_destination: None,
            camera: None,
            is_checkpoint: false,
            is_player: false,
            collision_bottom: false,
            collision_side: false,
            closest_wall: Vec3::ZERO,
            checkpoint: None,
            checkpoint_rot: None,
        }
    }

    pub fn rotation_quat(&self) -> Quat {
        Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        )
    }

    pub fn local_transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation_quat(), self.translation)
    }

    pub fn is_portal(&self) -> bool {
        self.portal_destination.is_some()
    }

    pub fn clear_collision_state(&mut self) {
        self.collision_bottom = false;
        self.collision_side = false;
        self.closest_wall = Vec3::ZERO;
    }
}

// Node arena with insertion order preserved (the collision scan order and
// portal pairing both depend on declaration order).
#[derive(Debug)]
pub struct Scene {
    pub nodes: Vec<Node>,
    pub portals: Vec<NodeId>,
    pub meshes: Vec<Mesh>,
    pub textures: Vec<TextureData>,
    pub active_camera: NodeId,
    pub player: NodeId,
}

impl Scene {
    // Recomputes the world transform of `root` and all of its descendants
    // from the translation/rotation chain. Must be called after any transform
    // mutation before physics or rendering reads the world matrix.
    pub fn refresh_world_transform(&mut self, root: NodeId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let parent_world = match self.nodes[id].parent {
                Some(p) => self.nodes[p].world_transform,
                None => Mat4::IDENTITY,
            };
            self.nodes[id].world_transform = parent_world * self.nodes[id].local_transform();
            stack.extend(self.nodes[id].children.iter().copied());
        }
    }

    pub fn refresh_all_world_transforms(&mut self) {
        let roots: Vec<NodeId> = (0..self.nodes.len())
            .filter(|&id| self.nodes[id].parent.is_none())
            .collect();
        for root in roots {
            self.refresh_world_transform(root);
        }
    }

    pub fn world_translation(&self, id: NodeId) -> Vec3 {
        self.nodes[id].world_transform.w_axis.truncate()
    }

    pub fn root_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).filter(move |&id| self.nodes[id].parent.is_none())
    }
}
