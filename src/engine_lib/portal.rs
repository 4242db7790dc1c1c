// src/engine_lib/portal.rs
//
// Portal pairing semantics: the outward surface normal, the teleport that
// carries a moving node (and its velocity and yaw) to the paired portal, and
// the virtual-camera transform the recursive renderer looks through.

use glam::{Mat4, Quat, Vec3};

use crate::engine_lib::math::{compose4, wrap_yaw};
use crate::engine_lib::scene_types::{NodeId, Scene};

// Slightly overshoot the seam on exit so the same crossing does not
// re-trigger on the next physics step.
pub const SEAM_PUSH_FACTOR: f32 = 1.2;

// Outward normal of the portal surface: the mesh's first vertex normal
// rotated by the node's current rotation. A portal without a mesh or with a
// zero-length normal yields a zero vector; consumers treat that as a valid
// degenerate input rather than an error.
pub fn surface_normal(scene: &Scene, portal: NodeId) -> Vec3 {
    let node = &scene.nodes[portal];
    let local = match node.mesh.and_then(|m| scene.meshes[m].normals.first().copied()) {
        Some(n) => Vec3::from(n),
        None => return Vec3::ZERO,
    };
    (node.rotation_quat() * local).normalize_or_zero()
}

// Yaw rotation that aligns the entry portal's facing with the destination
// portal's facing. The entry normal is negated first: from the player's
// perspective walking in, the portal faces them, and using the raw outward
// normal would flip the exit by 180 degrees.
pub fn alignment_yaw(entry_outward_normal: Vec3, dest_outward_normal: Vec3) -> f32 {
    let entry = -entry_outward_normal;
    let dot = entry.dot(dest_outward_normal).clamp(-1.0, 1.0);
    let mut direction = 1.0;
    if entry.cross(dest_outward_normal).y < 0.0 {
        direction = -1.0;
    }
    direction * dot.acos()
}

// Carries `moving` through `portal` to its paired destination: rotated and
// seam-scaled position offset, rotated velocity, yaw adjusted and wrapped.
// Pitch/roll and the vertical velocity component are left untouched.
pub fn teleport(scene: &mut Scene, moving: NodeId, portal: NodeId) {
    let dest = match scene.nodes[portal].portal_destination {
        Some(d) => d,
        None => return,
    };

    let angle = alignment_yaw(surface_normal(scene, portal), surface_normal(scene, dest));
    let q = Quat::from_rotation_y(angle);

    let to_portal = scene.nodes[portal].translation - scene.nodes[moving].translation;
    let offset = q * to_portal * SEAM_PUSH_FACTOR;
    scene.nodes[moving].translation = scene.nodes[dest].translation + offset;

    if let Some(v) = scene.nodes[moving].velocity {
        scene.nodes[moving].velocity = Some(q * v);
    }
    let yaw = scene.nodes[moving].rotation.y + angle;
    scene.nodes[moving].rotation.y = wrap_yaw(yaw);

    scene.refresh_world_transform(moving);
    log::debug!(
        "teleport: {} -> {} (yaw {:+.3} rad)",
        scene.nodes[portal].name,
        scene.nodes[dest].name,
        angle
    );
}

// The 180-degree yaw flip composed into every portal view: the far side of a
// portal is seen facing opposite to its surface normal.
pub fn yaw_flip() -> Mat4 {
    Mat4::from_rotation_y(std::f32::consts::PI)
}

// View transform for looking through `portal` from a camera whose current
// view matrix is `view`. Reading left to right in application order: a world
// point is mapped into the destination portal's local frame, flipped around,
// re-planted at the entry portal, and then viewed by the current camera.
pub fn portal_view(view: &Mat4, portal_world: &Mat4, dest_world: &Mat4) -> Mat4 {
    compose4(&dest_world.inverse(), &yaw_flip(), portal_world, view)
}

// Near-plane distance for the clipped projection: the distance between the
// destination portal and the virtual camera implied by `portal_view`, so
// geometry behind the destination surface is cut away instead of leaking
// into the window.
pub fn clipped_near_distance(scene: &Scene, dest: NodeId, dest_view: &Mat4) -> f32 {
    let inverse_view = dest_view.inverse();
    let virtual_camera_pos = inverse_view.w_axis.truncate();
    scene.world_translation(dest).distance(virtual_camera_pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::scene_types::{Mesh, Node, Scene};

    fn quad_mesh(normal: [f32; 3]) -> Mesh {
        Mesh {
            vertices: vec![[0.0; 3]; 4],
            texcoords: vec![[0.0; 2]; 4],
            normals: vec![normal; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    // Portal a at origin facing +z, portal b 10 units down the corridor
    // facing -z, player between them. Node 2 is the player.
    fn corridor_scene() -> Scene {
        let mut a = Node::named("portal-a");
        a.mesh = Some(0);
        a.portal_destination = Some(1);

        let mut b = Node::named("portal-b");
        b.translation = Vec3::new(0.0, 0.0, 10.0);
        b.mesh = Some(1);
        b.portal_destination = Some(0);

        let mut player = Node::named("player");
        player.translation = Vec3::new(0.0, 0.0, -0.5);
        player.velocity = Some(Vec3::new(0.0, 0.0, 1.0));
        player.is_player = true;

        let mut scene = Scene {
            nodes: vec![a, b, player],
            portals: vec![0, 1],
            meshes: vec![quad_mesh([0.0, 0.0, 1.0]), quad_mesh([0.0, 0.0, -1.0])],
            textures: vec![],
            active_camera: 2,
            player: 2,
        };
        scene.refresh_all_world_transforms();
        scene
    }

    #[test]
    fn antiparallel_normals_give_zero_yaw() {
        let scene = corridor_scene();
        let angle = alignment_yaw(surface_normal(&scene, 0), surface_normal(&scene, 1));
        assert!(angle.abs() < 1e-6, "got {}", angle);
    }

    #[test]
    fn straight_corridor_crossing() {
        let mut scene = corridor_scene();
        teleport(&mut scene, 2, 0);

        // offset = (a - player) * 1.2 = (0,0,0.6); lands past portal b.
        let pos = scene.nodes[2].translation;
        assert!((pos - Vec3::new(0.0, 0.0, 10.6)).length() < 1e-5, "got {:?}", pos);
        // Antiparallel normals: velocity and yaw unchanged.
        let vel = scene.nodes[2].velocity.unwrap();
        assert!((vel - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-6);
        assert!(scene.nodes[2].rotation.y.abs() < 1e-6);
    }

    #[test]
    fn perpendicular_portals_turn_velocity() {
        let mut scene = corridor_scene();
        // Re-aim portal b along +x.
        scene.meshes[1].normals = vec![[1.0, 0.0, 0.0]; 4];

        let angle = alignment_yaw(surface_normal(&scene, 0), surface_normal(&scene, 1));
        assert!((angle + std::f32::consts::FRAC_PI_2).abs() < 1e-5, "got {}", angle);

        teleport(&mut scene, 2, 0);
        // Forward motion along +z continues along -x, opposite the exit
        // portal's outward normal.
        let vel = scene.nodes[2].velocity.unwrap();
        assert!((vel - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5, "got {:?}", vel);
        assert!((scene.nodes[2].rotation.y - angle).abs() < 1e-6);
    }

    #[test]
    fn round_trip_returns_near_start() {
        let mut scene = corridor_scene();
        scene.nodes[2].translation = Vec3::new(0.0, 0.0, -1.0);
        scene.refresh_world_transform(2);

        teleport(&mut scene, 2, 0);
        teleport(&mut scene, 2, 1);

        // Each crossing scales the node-to-portal offset by 1.2, so the
        // round trip lands at 1.2^2 times the starting distance from a.
        let pos = scene.nodes[2].translation;
        assert!((pos - Vec3::new(0.0, 0.0, -1.44)).length() < 1e-4, "got {:?}", pos);
        assert!(scene.nodes[2].rotation.y.abs() < 1e-5);
        let vel = scene.nodes[2].velocity.unwrap();
        assert!((vel - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn missing_mesh_yields_degenerate_normal() {
        let mut scene = corridor_scene();
        scene.nodes[0].mesh = None;
        assert_eq!(surface_normal(&scene, 0), Vec3::ZERO);
        // acos is clamped, so even a degenerate normal cannot produce NaN.
        let angle = alignment_yaw(Vec3::ZERO, surface_normal(&scene, 1));
        assert!(angle.is_finite());
    }

    #[test]
    fn portal_view_flips_and_relocates() {
        let scene = corridor_scene();
        let view = Mat4::IDENTITY;
        let dest_view = portal_view(
            &view,
            &scene.nodes[0].world_transform,
            &scene.nodes[1].world_transform,
        );

        // A point one unit behind the destination portal (z = 11) should
        // appear one unit in front of the entry portal after the flip.
        let p = dest_view.transform_point3(Vec3::new(0.0, 0.0, 11.0));
        assert!((p - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-4, "got {:?}", p);
    }

    #[test]
    fn clipped_near_distance_matches_virtual_camera() {
        let scene = corridor_scene();
        // Camera 3 units before the entry portal.
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0)).inverse();
        let dest_view = portal_view(
            &view,
            &scene.nodes[0].world_transform,
            &scene.nodes[1].world_transform,
        );
        let near = clipped_near_distance(&scene, 1, &dest_view);
        assert!((near - 3.0).abs() < 1e-4, "got {}", near);
    }
}
