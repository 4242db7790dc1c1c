// src/rendering_lib/pass_builder.rs
//
// Recursive portal pass recording. Instead of mutating pipeline state while
// walking the portal graph, a FrameBuilder records a flat list of draw
// commands; the renderer replays them in order inside one render pass,
// switching between a fixed set of pipelines and stencil reference values.
// The stencil aspect of the depth attachment is the recursion mask: a pixel's
// stencil value is the recursion level its content belongs to.

use glam::Mat4;

use crate::engine_lib::camera::Camera;
use crate::engine_lib::portal;
use crate::engine_lib::scene_types::{MeshId, NodeId, Scene, TextureId};

pub const MAX_RECURSION_LEVEL: u32 = 2;

// One pipeline per distinct buffer-write configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassKind {
    // Portal silhouette, color/depth off; stencil NotEqual(ref) with
    // increment-on-fail, so pixels tagged exactly `ref` become `ref + 1`.
    MaskCarve,
    // Same geometry with decrement-on-fail against NotEqual(ref), undoing
    // the matching carve.
    MaskUnwind,
    // Fullscreen far-plane quad, depth write forced; resets the depth buffer
    // mid-pass (no mesh attached).
    DepthClear,
    // Portal geometry into depth only, compare Always; keeps level-local
    // scene content from overdrawing window interiors.
    DepthStamp,
    // Whole scene at the recursion floor: stencil Equal(ref), depth Less.
    SceneDeepest,
    // Portal face material: stencil Equal(ref), depth Always, pulsing factor.
    PortalFace,
    // Level-local scene content: stencil pass where ref <= stored tag,
    // depth Less.
    Scene,
}

#[derive(Clone, Copy, Debug)]
pub struct DrawCmd {
    pub kind: PassKind,
    pub node: Option<NodeId>,
    pub mesh: Option<MeshId>,
    pub texture: Option<TextureId>,
    pub stencil_ref: u32,
    pub view_model: Mat4,
    pub projection: Mat4,
    pub factor: f32,
}

pub struct FrameBuilder<'a> {
    scene: &'a Scene,
    camera: Camera,
    portal_factor: f32,
    commands: Vec<DrawCmd>,
}

impl<'a> FrameBuilder<'a> {
    // Brightness multiplier for portal faces, swinging around 1.
    pub fn portal_pulse(time_secs: f32) -> f32 {
        time_secs.sin() / 6.0 + 1.0
    }

    pub fn record(scene: &'a Scene, camera: Camera, view: Mat4, time_secs: f32) -> Vec<DrawCmd> {
        let mut builder = FrameBuilder {
            scene,
            camera,
            portal_factor: Self::portal_pulse(time_secs),
            commands: Vec::new(),
        };
        builder.render_level(&camera.projection(), &view, 0);
        builder.commands
    }

    fn render_level(&mut self, projection: &Mat4, view: &Mat4, level: u32) {
        let portals = self.scene.portals.clone();
        for &portal_id in &portals {
            let dest = match self.scene.nodes[portal_id].portal_destination {
                Some(d) => d,
                None => continue,
            };
            let portal_world = self.scene.nodes[portal_id].world_transform;
            let dest_world = self.scene.nodes[dest].world_transform;

            // 1. Carve the window: tag the silhouette with level + 1.
            self.push_node(PassKind::MaskCarve, portal_id, *view * portal_world, *projection, level, 1.0);

            // 2. Virtual camera behind the destination portal, near plane
            // pushed out to its surface.
            let dest_view = portal::portal_view(view, &portal_world, &dest_world);
            let near = portal::clipped_near_distance(self.scene, dest, &dest_view);
            let clipped = self.camera.clipped_projection(near);

            // 3. Deepest first; the floor draws the scene once through the
            // final virtual camera, restricted to the freshly carved tag.
            if level < MAX_RECURSION_LEVEL {
                self.render_level(&clipped, &dest_view, level + 1);
            } else {
                self.push_depth_clear();
                self.draw_scene(PassKind::SceneDeepest, &clipped, &dest_view, level + 1);
            }

            // 4. Unwind the carve so sibling portals at this level see the
            // mask exactly as it was before step 1.
            self.push_node(PassKind::MaskUnwind, portal_id, *view * portal_world, *projection, level + 1, 1.0);
        }

        // The recursion above wrote depth through other cameras; start this
        // level's depth from scratch, then stamp the portal surfaces so
        // geometry behind a window cannot occlude its content.
        self.push_depth_clear();
        for &portal_id in &portals {
            let portal_world = self.scene.nodes[portal_id].world_transform;
            self.push_node(PassKind::DepthStamp, portal_id, *view * portal_world, *projection, level, 1.0);
        }

        for &portal_id in &portals {
            let portal_world = self.scene.nodes[portal_id].world_transform;
            self.push_node(
                PassKind::PortalFace,
                portal_id,
                *view * portal_world,
                *projection,
                level,
                self.portal_factor,
            );
        }

        self.draw_scene(PassKind::Scene, projection, view, level);
    }

    // Non-portal scene content through `view`, walking each root with an
    // explicit saved-transform stack.
    fn draw_scene(&mut self, kind: PassKind, projection: &Mat4, view: &Mat4, stencil_ref: u32) {
        let roots: Vec<NodeId> = self.scene.root_ids().collect();
        for root in roots {
            let mut stack: Vec<(NodeId, Mat4)> = vec![(root, *view)];
            while let Some((id, parent_matrix)) = stack.pop() {
                let matrix = parent_matrix * self.scene.nodes[id].local_transform();
                if !self.scene.nodes[id].is_portal() {
                    self.push_node(kind, id, matrix, *projection, stencil_ref, 1.0);
                }
                for &child in &self.scene.nodes[id].children {
                    stack.push((child, matrix));
                }
            }
        }
    }

    fn push_node(
        &mut self,
        kind: PassKind,
        node: NodeId,
        view_model: Mat4,
        projection: Mat4,
        stencil_ref: u32,
        factor: f32,
    ) {
        let mesh = self.scene.nodes[node].mesh;
        if mesh.is_none() {
            return;
        }
        self.commands.push(DrawCmd {
            kind,
            node: Some(node),
            mesh,
            texture: self.scene.nodes[node].texture,
            stencil_ref,
            view_model,
            projection,
            factor,
        });
    }

    fn push_depth_clear(&mut self) {
        self.commands.push(DrawCmd {
            kind: PassKind::DepthClear,
            node: None,
            mesh: None,
            texture: None,
            stencil_ref: 0,
            view_model: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            factor: 1.0,
        });
    }
}
