// src/engine_lib/physics.rs
//
// Per-frame motion integration and collision resolution. One physics step
// advances every node with a velocity, then scans it against every other
// node in declaration order (O(n^2) pairwise; fine at this scene size).
// Portal overlaps hand off to the teleport; everything else is resolved with
// a single-axis minimum-translation push.

use glam::Vec3;

use crate::engine_lib::portal;
use crate::engine_lib::scene_types::{Aabb, NodeId, Scene};

pub fn update(scene: &mut Scene, dt: f32) {
    let count = scene.nodes.len();
    for id in 0..count {
        let velocity = match scene.nodes[id].velocity {
            Some(v) => v,
            None => continue,
        };
        scene.nodes[id].clear_collision_state();
        scene.nodes[id].translation += velocity * dt;
        scene.refresh_world_transform(id);

        for other in 0..count {
            if other != id {
                resolve_collision(scene, id, other);
            }
        }
    }
}

// Strict `>` on both sides: intervals that exactly touch count as
// overlapping. The MTV then resolves them with a zero-length push, which is
// the policy the rest of the engine depends on.
pub fn interval_overlap(min1: f32, max1: f32, min2: f32, max2: f32) -> bool {
    !(min1 > max2 || min2 > max1)
}

pub fn aabb_overlap(a: &Aabb, b: &Aabb) -> bool {
    interval_overlap(a.min.x, a.max.x, b.min.x, b.max.x)
        && interval_overlap(a.min.y, a.max.y, b.min.y, b.max.y)
        && interval_overlap(a.min.z, a.max.z, b.min.z, b.max.z)
}

// Minimum-translation vector separating box `a` from box `b` along a single
// axis. The six candidates are checked in a fixed order (+x, +y, +z, -x,
// -y, -z) with a strict `<`, so on equal depths the earlier candidate wins.
// That tie-break order is observed behavior callers rely on; keep it.
pub fn minimal_push(a: &Aabb, b: &Aabb) -> Vec3 {
    let diff_a = b.max - a.min; // positive-direction push-out depths
    let diff_b = a.max - b.min; // negative-direction push-out depths

    let candidates = [
        (diff_a.x, Vec3::X),
        (diff_a.y, Vec3::Y),
        (diff_a.z, Vec3::Z),
        (diff_b.x, Vec3::NEG_X),
        (diff_b.y, Vec3::NEG_Y),
        (diff_b.z, Vec3::NEG_Z),
    ];

    let mut min_depth = f32::INFINITY;
    let mut push = Vec3::ZERO;
    for (depth, direction) in candidates {
        if depth >= 0.0 && depth < min_depth {
            min_depth = depth;
            push = direction * depth;
        }
    }
    push
}

fn resolve_collision(scene: &mut Scene, moving: NodeId, other: NodeId) {
    let (box_m, box_o) = match (scene.nodes[moving].aabb, scene.nodes[other].aabb) {
        (Some(a), Some(b)) => (a, b),
        _ => return,
    };

    // Bounding boxes in world space, translated by the global position.
    let world_m = box_m.translated(scene.world_translation(moving));
    let world_o = box_o.translated(scene.world_translation(other));

    if !aabb_overlap(&world_m, &world_o) {
        return;
    }

    // Portal crossings teleport instead of pushing out; nothing further is
    // resolved against this pair this frame.
    if scene.nodes[other].is_portal() {
        portal::teleport(scene, moving, other);
        return;
    }

    let push = minimal_push(&world_m, &world_o);

    if push.y > 0.0 {
        // Something below pushed the node up: it is resting on a surface.
        scene.nodes[moving].collision_bottom = true;
        if scene.nodes[other].is_checkpoint {
            scene.nodes[moving].checkpoint = Some(scene.nodes[other].translation + Vec3::Y);
            scene.nodes[moving].checkpoint_rot = Some(scene.nodes[other].rotation);
        }
    } else {
        scene.nodes[moving].collision_side = true;
        scene.nodes[moving].closest_wall = push;
    }

    scene.nodes[moving].translation += push;
    scene.refresh_world_transform(moving);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::scene_types::{Mesh, Node, Scene};

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5))
    }

    fn scene_with(nodes: Vec<Node>) -> Scene {
        let portals = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_portal())
            .map(|(i, _)| i)
            .collect();
        let mut scene = Scene {
            nodes,
            portals,
            meshes: vec![Mesh {
                vertices: vec![[0.0; 3]; 4],
                texcoords: vec![[0.0; 2]; 4],
                normals: vec![[0.0, 0.0, 1.0]; 4],
                indices: vec![0, 1, 2, 0, 2, 3],
            }],
            textures: vec![],
            active_camera: 0,
            player: 0,
        };
        scene.refresh_all_world_transforms();
        scene
    }

    #[test]
    fn interval_overlap_boundary_touching_counts() {
        assert!(interval_overlap(0.0, 1.0, 1.0, 2.0)); // max1 == min2
        assert!(interval_overlap(1.0, 2.0, 0.0, 1.0));
        assert!(!interval_overlap(0.0, 1.0, 1.0 + 1e-6, 2.0));
    }

    #[test]
    fn aabb_overlap_requires_all_three_axes() {
        let a = unit_box();
        for axis in 0..3 {
            let mut offset = Vec3::ZERO;
            offset[axis] = 2.0;
            assert!(!aabb_overlap(&a, &a.translated(offset)), "axis {}", axis);
            offset[axis] = 0.9;
            assert!(aabb_overlap(&a, &a.translated(offset)), "axis {}", axis);
        }
    }

    #[test]
    fn minimal_push_separates_exactly() {
        let a = unit_box().translated(Vec3::new(0.8, 0.2, 0.1));
        let b = unit_box();
        let push = minimal_push(&a, &b);
        // Smallest escape is +x: depth = b.max.x - a.min.x = 0.2.
        assert!((push - Vec3::new(0.2, 0.0, 0.0)).length() < 1e-6, "got {:?}", push);

        // Applying the push leaves exactly zero overlap on the chosen axis.
        let separated = a.translated(push);
        assert!((separated.min.x - b.max.x).abs() < 1e-6);
    }

    #[test]
    fn tie_break_prefers_earlier_candidate() {
        // Equal penetration along +x and -y; +x is declared first and wins.
        let b = unit_box();
        let a = Aabb::new(Vec3::new(0.3, -1.3, -0.5), Vec3::new(1.3, -0.3, 0.5));
        // +x depth = 0.5 - 0.3 = 0.2; -y depth = a.max.y - b.min.y = 0.2.
        let push = minimal_push(&a, &b);
        assert!((push - Vec3::new(0.2, 0.0, 0.0)).length() < 1e-6, "got {:?}", push);
    }

    #[test]
    fn resting_on_platform_sets_collision_bottom() {
        let mut player = Node::named("player");
        player.translation = Vec3::new(0.0, 1.0, 0.0);
        player.aabb = Some(unit_box());
        player.velocity = Some(Vec3::new(0.0, -2.0, 0.0));

        let mut platform = Node::named("platform");
        platform.aabb = Some(unit_box());

        let mut scene = scene_with(vec![player, platform]);
        update(&mut scene, 0.1);

        assert!(scene.nodes[0].collision_bottom);
        assert!(!scene.nodes[0].collision_side);
        // Settled with zero residual vertical overlap: bottom of the player
        // box sits exactly on top of the platform box.
        let y = scene.nodes[0].translation.y;
        assert!((y - 1.0).abs() < 1e-6, "got {}", y);
    }

    #[test]
    fn side_collision_records_closest_wall() {
        let mut player = Node::named("player");
        player.translation = Vec3::new(0.9, 0.0, 0.0);
        player.aabb = Some(unit_box());
        player.velocity = Some(Vec3::new(-1.0, 0.0, 0.0));

        let mut wall = Node::named("wall");
        wall.aabb = Some(unit_box());

        let mut scene = scene_with(vec![player, wall]);
        update(&mut scene, 0.1);

        assert!(scene.nodes[0].collision_side);
        assert!(!scene.nodes[0].collision_bottom);
        // Pushed back out along +x.
        assert!(scene.nodes[0].closest_wall.x > 0.0);
        assert!((scene.nodes[0].translation.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn checkpoint_rest_snapshots_respawn_pose() {
        let mut player = Node::named("player");
        player.translation = Vec3::new(0.0, 0.95, 0.0);
        player.aabb = Some(unit_box());
        player.velocity = Some(Vec3::new(0.0, -1.0, 0.0));

        let mut checkpoint = Node::named("checkpoint");
        checkpoint.aabb = Some(unit_box());
        checkpoint.is_checkpoint = true;
        checkpoint.rotation = Vec3::new(0.0, 0.4, 0.0);

        let mut scene = scene_with(vec![player, checkpoint]);
        update(&mut scene, 0.01);

        assert!(scene.nodes[0].collision_bottom);
        // Snapshot is the checkpoint's translation offset one unit up.
        assert_eq!(scene.nodes[0].checkpoint, Some(Vec3::new(0.0, 1.0, 0.0)));
        assert_eq!(scene.nodes[0].checkpoint_rot, Some(Vec3::new(0.0, 0.4, 0.0)));
    }

    #[test]
    fn portal_overlap_teleports_instead_of_pushing() {
        let mut player = Node::named("player");
        player.translation = Vec3::new(0.0, 0.0, -1.1);
        player.aabb = Some(unit_box());
        player.velocity = Some(Vec3::new(0.0, 0.0, 1.0));

        let mut entry = Node::named("portal-a");
        entry.aabb = Some(unit_box());
        entry.mesh = Some(0);
        entry.portal_destination = Some(2);

        let mut exit = Node::named("portal-b");
        exit.translation = Vec3::new(0.0, 0.0, 12.0);
        exit.mesh = Some(0);
        exit.rotation = Vec3::new(0.0, std::f32::consts::PI, 0.0);
        exit.portal_destination = Some(1);

        let mut scene = scene_with(vec![player, entry, exit]);
        update(&mut scene, 0.1);

        // The player ends up on the far side of the exit portal rather than
        // being pushed back out of the entry portal.
        assert!(scene.nodes[0].translation.z > 12.0);
        assert!(!scene.nodes[0].collision_side);
    }

    #[test]
    fn multiple_overlaps_resolved_in_declaration_order() {
        // Player overlapping two obstacles at once; the first declared one
        // is resolved first and the second sees the already-pushed position.
        let mut player = Node::named("player");
        player.translation = Vec3::new(0.85, 0.0, 0.0);
        player.aabb = Some(unit_box());
        player.velocity = Some(Vec3::ZERO);

        let mut near = Node::named("near");
        near.aabb = Some(unit_box());

        let mut far = Node::named("far");
        far.translation = Vec3::new(2.0, 0.0, 0.0);
        far.aabb = Some(unit_box());

        let mut scene = scene_with(vec![player, near, far]);
        update(&mut scene, 0.1);

        // `near` pushed the player to x = 1.0; that position exactly touches
        // `far` (min 1.5 vs player max 1.5), which resolves with a
        // zero-length push and leaves the player in place.
        assert!((scene.nodes[0].translation.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn velocity_advances_translation_before_resolution() {
        let mut mover = Node::named("mover");
        mover.velocity = Some(Vec3::new(2.0, 0.0, 0.0));
        mover.aabb = Some(unit_box());

        let mut scene = scene_with(vec![mover]);
        update(&mut scene, 0.5);
        assert!((scene.nodes[0].translation.x - 1.0).abs() < 1e-6);
        // World transform refreshed after integration.
        assert!((scene.world_translation(0).x - 1.0).abs() < 1e-6);
    }
}
