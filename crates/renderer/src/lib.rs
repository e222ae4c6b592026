pub mod camera;
pub mod culling;
pub mod indirect;
pub mod mesh;

use crossbeam_channel::Receiver;
use glam::Vec3;
use types::{SimulationBounds, SimulationEvent};
use wgpu::util::DeviceExt;

use camera::{Camera, CameraUniform};
use culling::Frustum;
use indirect::DrawArgs;
use mesh::MeshVertex;

const AGENTS_RENDER_WGSL: &str = include_str!("../../../shaders/agents_render.wgsl");

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const DEFAULT_AGENT_SCALE: Vec3 = Vec3::new(0.2, 0.3, 0.6);
/// Agents are steered back softly, so they stray a little outside the volume.
const DRAW_BOUNDS_MARGIN: f32 = 2.0;

/// What the renderer knows about the simulation, updated from coordinator
/// events only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawState {
    pub draw_bounds: SimulationBounds,
    /// Set when the agent buffer was replaced and the bind group and
    /// indirect args must be rebuilt.
    pub stale: bool,
}

impl DrawState {
    pub fn new(bounds: SimulationBounds) -> Self {
        Self {
            draw_bounds: bounds,
            stale: true,
        }
    }

    pub fn apply(&mut self, event: SimulationEvent) {
        match event {
            SimulationEvent::AgentCountChanged { .. } => self.stale = true,
            SimulationEvent::BoundsChanged(bounds) => self.draw_bounds = bounds,
        }
    }

    pub fn cull_box(&self) -> (Vec3, Vec3) {
        let margin = Vec3::splat(DRAW_BOUNDS_MARGIN);
        (self.draw_bounds.min() - margin, self.draw_bounds.max() + margin)
    }
}

/// Instanced, indirect drawing of every agent straight from the agent buffer.
pub struct AgentRenderer {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: Option<wgpu::BindGroup>,
    camera_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    indirect_buffer: wgpu::Buffer,
    depth_view: wgpu::TextureView,
    events: Receiver<SimulationEvent>,
    state: DrawState,
    agent_count: u32,
    pub agent_scale: Vec3,
    pub max_speed: f32,
}

impl AgentRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_config: &wgpu::SurfaceConfiguration,
        bounds: SimulationBounds,
        events: Receiver<SimulationEvent>,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("agents_render"),
            source: wgpu::ShaderSource::Wgsl(AGENTS_RENDER_WGSL.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("agents_render_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("agents_render_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("agents_render_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[MeshVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("agents_camera_uniform"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let (vertices, indices) = mesh::pyramid();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("agent_mesh_vb"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("agent_mesh_ib"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let indirect_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("agents_indirect"),
            contents: DrawArgs::for_agents(indices.len() as u32, 0).as_bytes(),
            usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
        });

        let depth_view = create_depth_view(device, surface_config.width, surface_config.height);

        Self {
            pipeline,
            bind_group_layout,
            bind_group: None,
            camera_buffer,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            indirect_buffer,
            depth_view,
            events,
            state: DrawState::new(bounds),
            agent_count: 0,
            agent_scale: DEFAULT_AGENT_SCALE,
            max_speed: 10.0,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_view = create_depth_view(device, width, height);
    }

    /// Drains pending simulation events. After an agent count change the
    /// indirect args and bind group are rebuilt from `agent_buffer`.
    pub fn sync(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        agent_buffer: Option<&wgpu::Buffer>,
        agent_count: u32,
    ) {
        for event in self.events.try_iter() {
            self.state.apply(event);
        }
        if !self.state.stale {
            return;
        }
        let Some(agent_buffer) = agent_buffer else {
            self.bind_group = None;
            return;
        };

        queue.write_buffer(
            &self.indirect_buffer,
            0,
            DrawArgs::for_agents(self.index_count, agent_count).as_bytes(),
        );
        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("agents_render_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: agent_buffer.as_entire_binding(),
                },
            ],
        }));
        self.agent_count = agent_count;
        self.state.stale = false;
        tracing::debug!(agent_count, "agent draw rebuilt");
    }

    pub fn draw_state(&self) -> &DrawState {
        &self.state
    }

    /// Clears the target and draws the flock unless it is empty, unbound or
    /// entirely outside the view. Returns whether agents were drawn.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        queue: &wgpu::Queue,
        camera: &Camera,
    ) -> bool {
        let uniform = camera.uniform(self.agent_scale, self.max_speed);
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniform));

        let (min, max) = self.state.cull_box();
        let visible = Frustum::from_view_proj(&camera.view_projection()).intersects_aabb(min, max);

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("agents_render_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.02,
                        g: 0.02,
                        b: 0.04,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let Some(bind_group) = self.bind_group.as_ref() else {
            return false;
        };
        if self.agent_count == 0 || !visible {
            return false;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed_indirect(&self.indirect_buffer, 0);
        true
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("agents_depth"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_shader_validates() {
        let module = naga::front::wgsl::parse_str(AGENTS_RENDER_WGSL)
            .unwrap_or_else(|e| panic!("{}", e.emit_to_string(AGENTS_RENDER_WGSL)));
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        if let Err(e) = validator.validate(&module) {
            panic!("validation failed: {e:?}");
        }
        let names: Vec<_> = module.entry_points.iter().map(|ep| ep.name.as_str()).collect();
        assert!(names.contains(&"vs_main") && names.contains(&"fs_main"));
    }

    #[test]
    fn count_change_marks_bindings_stale() {
        let mut state = DrawState::new(SimulationBounds::default());
        state.stale = false;
        state.apply(SimulationEvent::AgentCountChanged {
            previous: 10,
            current: 20,
        });
        assert!(state.stale);
        assert_eq!(state.draw_bounds, SimulationBounds::default());
    }

    #[test]
    fn bounds_change_moves_cull_box_only() {
        let mut state = DrawState::new(SimulationBounds::default());
        state.stale = false;
        let moved = SimulationBounds::new(Vec3::new(10.0, 0.0, 0.0), Vec3::splat(4.0));
        state.apply(SimulationEvent::BoundsChanged(moved));
        assert!(!state.stale);
        let (min, max) = state.cull_box();
        assert_eq!(min, Vec3::new(6.0, -4.0, -4.0));
        assert_eq!(max, Vec3::new(14.0, 4.0, 4.0));
    }

    #[test]
    fn events_drain_in_order() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let first = SimulationBounds::new(Vec3::ONE, Vec3::splat(2.0));
        let second = SimulationBounds::new(Vec3::ZERO, Vec3::splat(3.0));
        tx.send(SimulationEvent::BoundsChanged(first)).unwrap();
        tx.send(SimulationEvent::BoundsChanged(second)).unwrap();
        let mut state = DrawState::new(SimulationBounds::default());
        for event in rx.try_iter() {
            state.apply(event);
        }
        assert_eq!(state.draw_bounds, second);
    }
}
