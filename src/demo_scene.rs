// src/demo_scene.rs
//
// A self-contained demo level: two open-topped rooms thirty units apart,
// joined by two portal pairs. Pair one links the north wall of room one to
// the south wall of room two; pair two links the east wall of room one to
// the west wall of room two. Room two holds a checkpoint platform. All
// meshes and textures are generated procedurally.

use glam::Vec3;

use crate::engine_lib::scene_builder::{NodeKind, NodeSpec, SceneBuildError, SceneSpec};
use crate::engine_lib::scene_types::{Aabb, CameraLens, Mesh, Scene, TextureData};

pub const PLAYER_SPAWN: Vec3 = Vec3::new(0.0, 1.4, 3.0);
pub const PLAYER_SPAWN_YAW: f32 = 0.0;

const MESH_CUBE: usize = 0;
const MESH_PORTAL_QUAD: usize = 1;

const TEX_FLOOR: usize = 0;
const TEX_WALL: usize = 1;
const TEX_PORTAL: usize = 2;
const TEX_CHECKPOINT: usize = 3;
const TEX_CRATE: usize = 4;

// Unit cube centered at the origin, one quad per face so normals stay flat.
fn cube_mesh() -> Mesh {
    let h = 0.5;
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        // +z
        ([0.0, 0.0, 1.0], [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]]),
        // -z
        ([0.0, 0.0, -1.0], [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]]),
        // +x
        ([1.0, 0.0, 0.0], [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]]),
        // -x
        ([-1.0, 0.0, 0.0], [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]]),
        // +y
        ([0.0, 1.0, 0.0], [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]]),
        // -y
        ([0.0, -1.0, 0.0], [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]]),
    ];

    let mut mesh = Mesh {
        vertices: Vec::with_capacity(24),
        texcoords: Vec::with_capacity(24),
        normals: Vec::with_capacity(24),
        indices: Vec::with_capacity(36),
    };
    let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
    for (normal, corners) in faces {
        let base = mesh.vertices.len() as u16;
        for (corner, uv) in corners.iter().zip(uvs.iter()) {
            mesh.vertices.push(*corner);
            mesh.texcoords.push(*uv);
            mesh.normals.push(normal);
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

// 2x2 doorway quad in the xy plane, outward normal +z.
fn portal_quad_mesh() -> Mesh {
    Mesh {
        vertices: vec![[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0]],
        texcoords: vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 4],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

fn checker_texture(size: u32, a: [u8; 4], b: [u8; 4]) -> TextureData {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let cell = ((x / 4) + (y / 4)) % 2 == 0;
            pixels.extend_from_slice(if cell { &a } else { &b });
        }
    }
    TextureData {
        width: size,
        height: size,
        pixels,
    }
}

// Soft radial falloff toward the rim, semi-transparent so the portal face
// tints the view through it rather than hiding it.
fn portal_texture(size: u32) -> TextureData {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    let center = (size as f32 - 1.0) / 2.0;
    for y in 0..size {
        for x in 0..size {
            let dx = (x as f32 - center) / center;
            let dy = (y as f32 - center) / center;
            let r = (dx * dx + dy * dy).sqrt().min(1.0);
            let rim = (r * r * 255.0) as u8;
            pixels.extend_from_slice(&[rim / 3, rim / 2, rim, 90]);
        }
    }
    TextureData {
        width: size,
        height: size,
        pixels,
    }
}

fn wall(name: &str, pos: Vec3, scale: Vec3) -> NodeSpec {
    let half = scale / 2.0;
    NodeSpec::new(name, NodeKind::Model)
        .at(pos)
        .scaled(scale)
        .with_mesh(MESH_CUBE, TEX_WALL)
        .with_aabb(Aabb::new(-half, half))
}

fn floor(name: &str, pos: Vec3, scale: Vec3) -> NodeSpec {
    let half = scale / 2.0;
    NodeSpec::new(name, NodeKind::Model)
        .at(pos)
        .scaled(scale)
        .with_mesh(MESH_CUBE, TEX_FLOOR)
        .with_aabb(Aabb::new(-half, half))
}

// Portal silhouettes are 2x2 quads; the box is thin along the facing axis so
// the crossing triggers just in front of the wall behind it.
fn portal(name: &str, pos: Vec3, yaw: f32) -> NodeSpec {
    let thin = 0.25;
    let aabb = if yaw.abs() < 1e-3 || (yaw.abs() - std::f32::consts::PI).abs() < 1e-3 {
        Aabb::new(Vec3::new(-1.0, -1.0, -thin), Vec3::new(1.0, 1.0, thin))
    } else {
        Aabb::new(Vec3::new(-thin, -1.0, -1.0), Vec3::new(thin, 1.0, 1.0))
    };
    NodeSpec::new(name, NodeKind::Portal)
        .at(pos)
        .rotated(Vec3::new(0.0, yaw, 0.0))
        .with_mesh(MESH_PORTAL_QUAD, TEX_PORTAL)
        .with_aabb(aabb)
}

fn room(prefix: &str, center: Vec3) -> Vec<NodeSpec> {
    let name = |part: &str| format!("{}-{}", prefix, part);
    vec![
        floor(&name("floor"), center + Vec3::new(0.0, -0.5, 0.0), Vec3::new(10.0, 1.0, 10.0)),
        wall(&name("wall-north"), center + Vec3::new(0.0, 1.5, -5.0), Vec3::new(10.0, 3.0, 1.0)),
        wall(&name("wall-south"), center + Vec3::new(0.0, 1.5, 5.0), Vec3::new(10.0, 3.0, 1.0)),
        wall(&name("wall-east"), center + Vec3::new(5.0, 1.5, 0.0), Vec3::new(1.0, 3.0, 10.0)),
        wall(&name("wall-west"), center + Vec3::new(-5.0, 1.5, 0.0), Vec3::new(1.0, 3.0, 10.0)),
    ]
}

pub fn create_demo_scene() -> Result<Scene, SceneBuildError> {
    let room2_center = Vec3::new(30.0, 0.0, 0.0);
    let half_pi = std::f32::consts::FRAC_PI_2;

    let mut nodes = Vec::new();
    nodes.extend(room("room1", Vec3::ZERO));
    nodes.extend(room("room2", room2_center));

    // Pair one: room1 north wall <-> room2 south wall. Both normals point
    // into their rooms, so a straight walk-through keeps its heading.
    nodes.push(portal("portal-blue-a", Vec3::new(0.0, 1.2, -4.4), 0.0));
    nodes.push(portal(
        "portal-blue-b",
        room2_center + Vec3::new(0.0, 1.2, 4.4),
        std::f32::consts::PI,
    ));
    // Pair two: room1 east wall <-> room2 west wall.
    nodes.push(portal("portal-amber-a", Vec3::new(4.4, 1.2, 0.0), -half_pi));
    nodes.push(portal(
        "portal-amber-b",
        room2_center + Vec3::new(-4.4, 1.2, 0.0),
        half_pi,
    ));

    // Checkpoint platform in room two; landing on it updates the respawn
    // pose.
    nodes.push(
        NodeSpec::new("checkpoint", NodeKind::Checkpoint)
            .at(room2_center + Vec3::new(3.0, 0.25, 3.0))
            .scaled(Vec3::new(2.0, 0.5, 2.0))
            .with_mesh(MESH_CUBE, TEX_CHECKPOINT)
            .with_aabb(Aabb::new(
                Vec3::new(-1.0, -0.25, -1.0),
                Vec3::new(1.0, 0.25, 1.0),
            )),
    );

    for (i, pos) in [
        Vec3::new(-2.5, 0.5, -2.0),
        Vec3::new(2.0, 0.5, 2.5),
        room2_center + Vec3::new(-2.0, 0.5, -2.5),
    ]
    .into_iter()
    .enumerate()
    {
        nodes.push(
            NodeSpec::new(&format!("crate-{}", i), NodeKind::Model)
                .at(pos)
                .with_mesh(MESH_CUBE, TEX_CRATE)
                .with_aabb(Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5))),
        );
    }

    // The camera rides as a child at head height; pitch is applied there,
    // yaw on the player itself.
    nodes.push(
        NodeSpec::new("player", NodeKind::Player)
            .at(PLAYER_SPAWN)
            .rotated(Vec3::new(0.0, PLAYER_SPAWN_YAW, 0.0))
            .with_aabb(Aabb::new(
                Vec3::new(-0.4, -0.9, -0.4),
                Vec3::new(0.4, 0.9, 0.4),
            ))
            .with_child(
                NodeSpec::new("camera", NodeKind::Camera)
                    .at(Vec3::new(0.0, 0.7, 0.0))
                    .with_lens(CameraLens {
                        fov_y_rad: 75.0f32.to_radians(),
                        znear: 0.1,
                        zfar: 200.0,
                    }),
            ),
    );

    SceneSpec {
        meshes: vec![cube_mesh(), portal_quad_mesh()],
        textures: vec![
            checker_texture(32, [70, 120, 70, 255], [50, 90, 50, 255]),
            checker_texture(32, [150, 150, 160, 255], [120, 120, 135, 255]),
            portal_texture(64),
            checker_texture(16, [220, 180, 40, 255], [180, 140, 20, 255]),
            checker_texture(16, [160, 110, 60, 255], [130, 85, 45, 255]),
        ],
        nodes,
    }
    .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::portal::surface_normal;

    #[test]
    fn demo_scene_builds() {
        let scene = create_demo_scene().unwrap();
        assert_eq!(scene.portals.len(), 4);
        assert!(scene.nodes[scene.player].is_player);
        assert!(scene.nodes[scene.active_camera].camera.is_some());
    }

    #[test]
    fn portal_normals_point_into_their_rooms() {
        let scene = create_demo_scene().unwrap();
        let normals: Vec<Vec3> = scene
            .portals
            .iter()
            .map(|&p| surface_normal(&scene, p))
            .collect();
        assert!((normals[0] - Vec3::Z).length() < 1e-5);
        assert!((normals[1] - Vec3::NEG_Z).length() < 1e-5);
        assert!((normals[2] - Vec3::NEG_X).length() < 1e-5);
        assert!((normals[3] - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn straight_walk_through_pair_one_keeps_heading() {
        let mut scene = create_demo_scene().unwrap();
        let player = scene.player;
        let entry = scene.portals[0];

        scene.nodes[player].translation = Vec3::new(0.0, 1.4, -4.0);
        scene.nodes[player].velocity = Some(Vec3::new(0.0, 0.0, -2.0));
        scene.refresh_world_transform(player);
        crate::engine_lib::portal::teleport(&mut scene, player, entry);

        // Lands just inside room two's south wall, still heading -z.
        let pos = scene.nodes[player].translation;
        assert!((pos.x - 30.0).abs() < 0.1, "got {:?}", pos);
        assert!(pos.z < 4.5 && pos.z > 3.0, "got {:?}", pos);
        let vel = scene.nodes[player].velocity.unwrap();
        assert!((vel - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-4);
    }

    #[test]
    fn cube_mesh_is_watertight_quads() {
        let mesh = cube_mesh();
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.normals.len(), 24);
        assert_eq!(mesh.texcoords.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < 24));
    }

    #[test]
    fn textures_are_rgba8_sized() {
        let scene = create_demo_scene().unwrap();
        for texture in &scene.textures {
            assert_eq!(
                texture.pixels.len(),
                (texture.width * texture.height * 4) as usize
            );
        }
    }
}
