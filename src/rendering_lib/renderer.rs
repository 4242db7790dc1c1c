// src/rendering_lib/renderer.rs
//
// GPU side of the portal renderer. The recursion itself lives in
// pass_builder; this module owns the fixed pipeline set (one per
// buffer-write configuration), the mesh/texture uploads, and the replay of a
// recorded command list inside a single render pass over a
// Depth24PlusStencil8 attachment.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::pass_builder::{DrawCmd, FrameBuilder, PassKind};
use super::shader::WGSL_SHADER_SOURCE;
use super::vertex::Vertex;
use crate::engine_lib::camera::Camera;
use crate::engine_lib::scene_types::{Mesh, Scene};

pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

// One uniform slot per draw command, bound with a dynamic offset. 256 is the
// common minimum uniform-offset alignment.
const UNIFORM_SLOT_SIZE: u64 = 256;
const INITIAL_UNIFORM_SLOTS: u64 = 1024;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct DrawUniform {
    view_model: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    factor: f32,
    _padding: [f32; 3],
}

impl DrawUniform {
    fn from_cmd(cmd: &DrawCmd) -> Self {
        Self {
            view_model: cmd.view_model.to_cols_array_2d(),
            projection: cmd.projection.to_cols_array_2d(),
            factor: cmd.factor,
            _padding: [0.0; 3],
        }
    }
}

struct GpuModel {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

// Interleaves the mesh's parallel attribute arrays into the vertex layout.
fn interleave(mesh: &Mesh) -> Vec<Vertex> {
    mesh.vertices
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            Vertex::new(
                position,
                mesh.texcoords.get(i).copied().unwrap_or([0.0, 0.0]),
                mesh.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
            )
        })
        .collect()
}

// u16 index data must be padded to a 4-byte multiple for the upload.
fn padded_indices(indices: &[u16]) -> Vec<u16> {
    let mut padded = indices.to_vec();
    if padded.len() % 2 == 1 {
        padded.push(0);
    }
    padded
}

struct Pipelines {
    mask_carve: wgpu::RenderPipeline,
    mask_unwind: wgpu::RenderPipeline,
    depth_clear: wgpu::RenderPipeline,
    depth_stamp: wgpu::RenderPipeline,
    scene_deepest: wgpu::RenderPipeline,
    portal_face: wgpu::RenderPipeline,
    scene: wgpu::RenderPipeline,
}

impl Pipelines {
    fn for_kind(&self, kind: PassKind) -> &wgpu::RenderPipeline {
        match kind {
            PassKind::MaskCarve => &self.mask_carve,
            PassKind::MaskUnwind => &self.mask_unwind,
            PassKind::DepthClear => &self.depth_clear,
            PassKind::DepthStamp => &self.depth_stamp,
            PassKind::SceneDeepest => &self.scene_deepest,
            PassKind::PortalFace => &self.portal_face,
            PassKind::Scene => &self.scene,
        }
    }
}

struct PipelineSpec {
    label: &'static str,
    vs_entry: &'static str,
    has_vertex_buffer: bool,
    color_writes: wgpu::ColorWrites,
    depth_compare: wgpu::CompareFunction,
    depth_write: bool,
    stencil_compare: wgpu::CompareFunction,
    stencil_fail_op: wgpu::StencilOperation,
    stencil_write_mask: u32,
}

pub struct Renderer {
    pipelines: Pipelines,

    uniform_buffer: wgpu::Buffer,
    uniform_slots: u64,
    uniform_bind_group: wgpu::BindGroup,
    uniform_layout: wgpu::BindGroupLayout,

    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    models: Vec<GpuModel>,
    textures: Vec<wgpu::BindGroup>,
    fallback_texture: wgpu::BindGroup,

    depth_view: wgpu::TextureView,
}

impl Renderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Portal Renderer Shader Module"),
            source: wgpu::ShaderSource::Wgsl(WGSL_SHADER_SOURCE.into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<DrawUniform>() as u64
                    ),
                },
                count: None,
            }],
            label: Some("draw_uniform_bind_group_layout"),
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("texture_bind_group_layout"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Portal Renderer Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let vertex_layout = [Vertex::desc()];
        let build = |spec: PipelineSpec| -> wgpu::RenderPipeline {
            let stencil_face = wgpu::StencilFaceState {
                compare: spec.stencil_compare,
                fail_op: spec.stencil_fail_op,
                depth_fail_op: wgpu::StencilOperation::Keep,
                pass_op: wgpu::StencilOperation::Keep,
            };
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(spec.label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader_module,
                    entry_point: spec.vs_entry,
                    buffers: if spec.has_vertex_buffer {
                        &vertex_layout
                    } else {
                        &[]
                    },
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader_module,
                    entry_point: if spec.has_vertex_buffer {
                        "fs_main"
                    } else {
                        "fs_depth_clear"
                    },
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: spec.color_writes,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_STENCIL_FORMAT,
                    depth_write_enabled: spec.depth_write,
                    depth_compare: spec.depth_compare,
                    stencil: wgpu::StencilState {
                        front: stencil_face,
                        back: stencil_face,
                        read_mask: 0xFF,
                        write_mask: spec.stencil_write_mask,
                    },
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
            })
        };

        // The mask carve/unwind trick: NotEqual(ref) fails exactly where the
        // stored tag equals ref, and the fail op bumps the tag there.
        let pipelines = Pipelines {
            mask_carve: build(PipelineSpec {
                label: "mask carve",
                vs_entry: "vs_main",
                has_vertex_buffer: true,
                color_writes: wgpu::ColorWrites::empty(),
                depth_compare: wgpu::CompareFunction::Always,
                depth_write: false,
                stencil_compare: wgpu::CompareFunction::NotEqual,
                stencil_fail_op: wgpu::StencilOperation::IncrementClamp,
                stencil_write_mask: 0xFF,
            }),
            mask_unwind: build(PipelineSpec {
                label: "mask unwind",
                vs_entry: "vs_main",
                has_vertex_buffer: true,
                color_writes: wgpu::ColorWrites::empty(),
                depth_compare: wgpu::CompareFunction::Always,
                depth_write: false,
                stencil_compare: wgpu::CompareFunction::NotEqual,
                stencil_fail_op: wgpu::StencilOperation::DecrementClamp,
                stencil_write_mask: 0xFF,
            }),
            depth_clear: build(PipelineSpec {
                label: "depth clear",
                vs_entry: "vs_depth_clear",
                has_vertex_buffer: false,
                color_writes: wgpu::ColorWrites::empty(),
                depth_compare: wgpu::CompareFunction::Always,
                depth_write: true,
                stencil_compare: wgpu::CompareFunction::Always,
                stencil_fail_op: wgpu::StencilOperation::Keep,
                stencil_write_mask: 0,
            }),
            depth_stamp: build(PipelineSpec {
                label: "depth stamp",
                vs_entry: "vs_main",
                has_vertex_buffer: true,
                color_writes: wgpu::ColorWrites::empty(),
                depth_compare: wgpu::CompareFunction::Always,
                depth_write: true,
                stencil_compare: wgpu::CompareFunction::Always,
                stencil_fail_op: wgpu::StencilOperation::Keep,
                stencil_write_mask: 0,
            }),
            scene_deepest: build(PipelineSpec {
                label: "scene deepest",
                vs_entry: "vs_main",
                has_vertex_buffer: true,
                color_writes: wgpu::ColorWrites::ALL,
                depth_compare: wgpu::CompareFunction::Less,
                depth_write: true,
                stencil_compare: wgpu::CompareFunction::Equal,
                stencil_fail_op: wgpu::StencilOperation::Keep,
                stencil_write_mask: 0,
            }),
            portal_face: build(PipelineSpec {
                label: "portal face",
                vs_entry: "vs_main",
                has_vertex_buffer: true,
                color_writes: wgpu::ColorWrites::ALL,
                depth_compare: wgpu::CompareFunction::Always,
                depth_write: true,
                stencil_compare: wgpu::CompareFunction::Equal,
                stencil_fail_op: wgpu::StencilOperation::Keep,
                stencil_write_mask: 0,
            }),
            scene: build(PipelineSpec {
                label: "scene",
                vs_entry: "vs_main",
                has_vertex_buffer: true,
                color_writes: wgpu::ColorWrites::ALL,
                depth_compare: wgpu::CompareFunction::Less,
                depth_write: true,
                // Passes where reference <= stored tag: content at this
                // level stays out of deeper windows.
                stencil_compare: wgpu::CompareFunction::LessEqual,
                stencil_fail_op: wgpu::StencilOperation::Keep,
                stencil_write_mask: 0,
            }),
        };

        let uniform_slots = INITIAL_UNIFORM_SLOTS;
        let uniform_buffer = Self::create_uniform_buffer(device, uniform_slots);
        let uniform_bind_group =
            Self::create_uniform_bind_group(device, &uniform_layout, &uniform_buffer);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("scene texture sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let fallback_texture =
            Self::upload_texture(device, queue, &texture_layout, &sampler, 1, 1, &[255; 4]);

        let depth_view = Self::create_depth_view(device, width, height);

        Self {
            pipelines,
            uniform_buffer,
            uniform_slots,
            uniform_bind_group,
            uniform_layout,
            texture_layout,
            sampler,
            models: Vec::new(),
            textures: Vec::new(),
            fallback_texture,
            depth_view,
        }
    }

    fn create_uniform_buffer(device: &wgpu::Device, slots: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniform Buffer"),
            size: slots * UNIFORM_SLOT_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_uniform_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64),
                }),
            }],
            label: Some("draw_uniform_bind_group"),
        })
    }

    fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Stencil Texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_STENCIL_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn upload_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> wgpu::BindGroup {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("scene texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some("scene_texture_bind_group"),
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_view = Self::create_depth_view(device, width, height);
    }

    // Uploads every mesh and texture of the scene once, before the first
    // frame. Indexed by the scene's MeshId/TextureId.
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene) {
        self.models = scene
            .meshes
            .iter()
            .map(|mesh| {
                let vertices = interleave(mesh);
                let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Mesh Vertex Buffer"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Mesh Index Buffer"),
                    contents: bytemuck::cast_slice(&padded_indices(&mesh.indices)),
                    usage: wgpu::BufferUsages::INDEX,
                });
                GpuModel {
                    vertex_buffer,
                    index_buffer,
                    index_count: mesh.indices.len() as u32,
                }
            })
            .collect();

        self.textures = scene
            .textures
            .iter()
            .map(|t| {
                Self::upload_texture(
                    device,
                    queue,
                    &self.texture_layout,
                    &self.sampler,
                    t.width,
                    t.height,
                    &t.pixels,
                )
            })
            .collect();

        log::info!(
            "uploaded {} meshes and {} textures",
            self.models.len(),
            self.textures.len()
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render_scene(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        output_view: &wgpu::TextureView,
        scene: &Scene,
        camera: &Camera,
        time_secs: f32,
        clear_color: wgpu::Color,
    ) {
        let view = Camera::view_matrix(&scene.nodes[scene.active_camera].world_transform);
        let commands = FrameBuilder::record(scene, *camera, view, time_secs);
        if commands.is_empty() {
            return;
        }

        if commands.len() as u64 > self.uniform_slots {
            let wanted = (commands.len() as u64).next_power_of_two();
            log::warn!(
                "draw command count {} exceeds {} uniform slots, growing to {}",
                commands.len(),
                self.uniform_slots,
                wanted
            );
            self.uniform_slots = wanted;
            self.uniform_buffer = Self::create_uniform_buffer(device, wanted);
            self.uniform_bind_group =
                Self::create_uniform_bind_group(device, &self.uniform_layout, &self.uniform_buffer);
        }

        let mut uniform_bytes = vec![0u8; commands.len() * UNIFORM_SLOT_SIZE as usize];
        for (i, cmd) in commands.iter().enumerate() {
            let slot = i * UNIFORM_SLOT_SIZE as usize;
            let uniform = DrawUniform::from_cmd(cmd);
            let src = bytemuck::bytes_of(&uniform);
            uniform_bytes[slot..slot + src.len()].copy_from_slice(src);
        }
        queue.write_buffer(&self.uniform_buffer, 0, &uniform_bytes);

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Portal Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        for (i, cmd) in commands.iter().enumerate() {
            let offset = (i as u64 * UNIFORM_SLOT_SIZE) as u32;
            render_pass.set_pipeline(self.pipelines.for_kind(cmd.kind));
            render_pass.set_stencil_reference(cmd.stencil_ref);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);

            match cmd.mesh {
                Some(mesh) => {
                    let model = match self.models.get(mesh) {
                        Some(m) => m,
                        None => {
                            log::warn!("draw references mesh {} with no GPU upload", mesh);
                            continue;
                        }
                    };
                    let texture = cmd
                        .texture
                        .and_then(|t| self.textures.get(t))
                        .unwrap_or(&self.fallback_texture);
                    render_pass.set_bind_group(1, texture, &[]);
                    render_pass.set_vertex_buffer(0, model.vertex_buffer.slice(..));
                    render_pass
                        .set_index_buffer(model.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                    render_pass.draw_indexed(0..model.index_count, 0, 0..1);
                }
                None => {
                    // Fullscreen depth clear; the bind group is unused but
                    // the layout still requires it.
                    render_pass.set_bind_group(1, &self.fallback_texture, &[]);
                    render_pass.draw(0..3, 0..1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    #[test]
    fn draw_uniform_fits_one_slot() {
        assert!(std::mem::size_of::<DrawUniform>() as u64 <= UNIFORM_SLOT_SIZE);
        // Dynamic offsets must be slot-aligned.
        assert_eq!(UNIFORM_SLOT_SIZE % 256, 0);
    }

    #[test]
    fn interleave_zips_parallel_arrays() {
        let mesh = Mesh {
            vertices: vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            texcoords: vec![[0.5, 0.5]],
            normals: vec![[0.0, 0.0, 1.0], [0.0, 1.0, 0.0]],
            indices: vec![0, 1, 0],
        };
        let vertices = interleave(&mesh);
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[0].position, [1.0, 2.0, 3.0]);
        assert_eq!(vertices[0].texcoord, [0.5, 0.5]);
        // Missing texcoord falls back to zero instead of panicking.
        assert_eq!(vertices[1].texcoord, [0.0, 0.0]);
        assert_eq!(vertices[1].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn odd_index_counts_are_padded() {
        assert_eq!(padded_indices(&[0, 1, 2]).len(), 4);
        assert_eq!(padded_indices(&[0, 1, 2, 2, 3, 0]).len(), 6);
    }

    #[test]
    fn uniform_layout_matches_shader_struct() {
        let cmd = DrawCmd {
            kind: PassKind::Scene,
            node: None,
            mesh: None,
            texture: None,
            stencil_ref: 0,
            view_model: Mat4::from_translation(glam::Vec3::X),
            projection: Mat4::IDENTITY,
            factor: 0.5,
        };
        let uniform = DrawUniform::from_cmd(&cmd);
        // Column-major: the translation column is the fourth.
        assert_eq!(uniform.view_model[3][0], 1.0);
        assert_eq!(uniform.factor, 0.5);
    }
}
