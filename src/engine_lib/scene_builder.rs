// src/engine_lib/scene_builder.rs
//
// Declarative scene construction. A SceneSpec lists meshes, textures, and an
// ordered tree of node descriptors; build() flattens it into the node arena,
// wires the portal pairs, and validates the result. Portal pairing follows
// declaration order: the first two portals link to each other, the next two
// link to each other.

use glam::Vec3;
use thiserror::Error;

use crate::engine_lib::scene_types::{
    Aabb, CameraLens, Mesh, MeshId, Node, NodeId, Scene, TextureData, TextureId,
};

pub const REQUIRED_PORTAL_COUNT: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Empty,
    Model,
    Portal,
    Camera,
    Player,
    Checkpoint,
}

#[derive(Clone, Debug)]
pub struct NodeSpec {
    pub name: String,
    pub kind: NodeKind,
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub mesh: Option<MeshId>,
    pub texture: Option<TextureId>,
    pub aabb: Option<Aabb>,
    pub lens: Option<CameraLens>,
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new(name: &str, kind: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            mesh: None,
            texture: None,
            aabb: None,
            lens: None,
            children: Vec::new(),
        }
    }

    pub fn at(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn rotated(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scaled(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_mesh(mut self, mesh: MeshId, texture: TextureId) -> Self {
        self.mesh = Some(mesh);
        self.texture = Some(texture);
        self
    }

    pub fn with_aabb(mut self, aabb: Aabb) -> Self {
        self.aabb = Some(aabb);
        self
    }

    pub fn with_lens(mut self, lens: CameraLens) -> Self {
        self.lens = Some(lens);
        self
    }

    pub fn with_child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Clone, Debug)]
pub struct SceneSpec {
    pub meshes: Vec<Mesh>,
    pub textures: Vec<TextureData>,
    pub nodes: Vec<NodeSpec>,
}

#[derive(Debug, Error)]
pub enum SceneBuildError {
    #[error("scene must declare exactly {REQUIRED_PORTAL_COUNT} portals, found {found}")]
    PortalCount { found: usize },
    #[error("portal '{name}' has no mesh; a portal needs a surface to derive its normal from")]
    PortalWithoutMesh { name: String },
    #[error("node '{name}' references mesh {mesh} but only {available} meshes are declared")]
    MeshOutOfRange {
        name: String,
        mesh: MeshId,
        available: usize,
    },
    #[error("node '{name}' references texture {texture} but only {available} textures are declared")]
    TextureOutOfRange {
        name: String,
        texture: TextureId,
        available: usize,
    },
    #[error("scene has no camera node")]
    MissingCamera,
    #[error("scene has no player node")]
    MissingPlayer,
}

impl SceneSpec {
    pub fn build(self) -> Result<Scene, SceneBuildError> {
        let mut nodes: Vec<Node> = Vec::new();
        let mut portals: Vec<NodeId> = Vec::new();
        let mut camera: Option<NodeId> = None;
        let mut player: Option<NodeId> = None;

        for spec in &self.nodes {
            flatten(spec, None, &mut nodes, &mut portals, &mut camera, &mut player)?;
        }

        for node in &nodes {
            if let Some(mesh) = node.mesh {
                if mesh >= self.meshes.len() {
                    return Err(SceneBuildError::MeshOutOfRange {
                        name: node.name.clone(),
                        mesh,
                        available: self.meshes.len(),
                    });
                }
            }
            if let Some(texture) = node.texture {
                if texture >= self.textures.len() {
                    return Err(SceneBuildError::TextureOutOfRange {
                        name: node.name.clone(),
                        texture,
                        available: self.textures.len(),
                    });
                }
            }
        }

        if portals.len() != REQUIRED_PORTAL_COUNT {
            return Err(SceneBuildError::PortalCount {
                found: portals.len(),
            });
        }
        // Declaration-order pairing, wired bidirectionally and immutable
        // from here on.
        for pair in portals.chunks_exact(2) {
            nodes[pair[0]].portal_destination = Some(pair[1]);
            nodes[pair[1]].portal_destination = Some(pair[0]);
        }

        let active_camera = camera.ok_or(SceneBuildError::MissingCamera)?;
        let player = player.ok_or(SceneBuildError::MissingPlayer)?;

        let mut scene = Scene {
            nodes,
            portals,
            meshes: self.meshes,
            textures: self.textures,
            active_camera,
            player,
        };
        scene.refresh_all_world_transforms();
        log::info!(
            "scene built: {} nodes, {} portals, {} meshes, {} textures",
            scene.nodes.len(),
            scene.portals.len(),
            scene.meshes.len(),
            scene.textures.len()
        );
        Ok(scene)
    }
}

// Depth-first flatten; a parent always lands in the arena before its
// children, so declaration order is preserved for the physics scan and the
// portal pairing.
fn flatten(
    spec: &NodeSpec,
    parent: Option<NodeId>,
    nodes: &mut Vec<Node>,
    portals: &mut Vec<NodeId>,
    camera: &mut Option<NodeId>,
    player: &mut Option<NodeId>,
) -> Result<NodeId, SceneBuildError> {
    let id = nodes.len();

    let mut node = Node::named(&spec.name);
    node.parent = parent;
    node.translation = spec.translation;
    node.rotation = spec.rotation;
    node.scale = spec.scale;
    node.mesh = spec.mesh;
    node.texture = spec.texture;
    node.aabb = spec.aabb;
    node.camera = spec.lens;

    match spec.kind {
        NodeKind::Portal => {
            if spec.mesh.is_none() {
                return Err(SceneBuildError::PortalWithoutMesh {
                    name: spec.name.clone(),
                });
            }
            portals.push(id);
        }
        NodeKind::Camera => {
            if camera.is_none() {
                *camera = Some(id);
            }
        }
        NodeKind::Player => {
            node.is_player = true;
            node.velocity = Some(Vec3::ZERO);
            if player.is_none() {
                *player = Some(id);
            }
        }
        NodeKind::Checkpoint => {
            node.is_checkpoint = true;
        }
        NodeKind::Empty | NodeKind::Model => {}
    }

    nodes.push(node);

    for child in &spec.children {
        let child_id = flatten(child, Some(id), nodes, portals, camera, player)?;
        nodes[id].children.push(child_id);
    }
    Ok(id)
}
