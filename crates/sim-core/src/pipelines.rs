use crate::backend::{BufferSlot, INTEGRATE_KERNEL, STEERING_KERNEL};

pub(crate) const COMMON_WGSL: &str = include_str!("../../../shaders/common.wgsl");
pub(crate) const STEERING_WGSL: &str = include_str!("../../../shaders/steering.wgsl");
pub(crate) const INTEGRATE_WGSL: &str = include_str!("../../../shaders/integrate.wgsl");

/// Binding 0 of every kernel is the params uniform; buffer slots follow.
pub(crate) const PARAMS_BINDING: u32 = 0;

pub(crate) fn steering_source() -> String {
    format!("{}\n{}", COMMON_WGSL, STEERING_WGSL)
}

pub(crate) fn integrate_source() -> String {
    format!("{}\n{}", COMMON_WGSL, INTEGRATE_WGSL)
}

/// Storage bindings per kernel: (slot, binding, read_only).
const STEERING_SLOTS: &[(BufferSlot, u32, bool)] = &[
    (BufferSlot::Agents, 1, true),
    (BufferSlot::Forces, 2, false),
    (BufferSlot::Obstacles, 3, true),
];

const INTEGRATE_SLOTS: &[(BufferSlot, u32, bool)] = &[
    (BufferSlot::Agents, 1, false),
    (BufferSlot::Forces, 2, true),
];

/// Reads the declared `@workgroup_size` x dimension of `entry_point`.
///
/// WGSL fixes the workgroup size at shader-compile time, so this is the
/// value the driver will launch with.
pub fn reflect_workgroup_size(source: &str, entry_point: &str) -> Result<u32, String> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| format!("WGSL parse error: {}", e.emit_to_string(source)))?;
    module
        .entry_points
        .iter()
        .find(|ep| ep.name == entry_point)
        .map(|ep| ep.workgroup_size[0])
        .ok_or_else(|| format!("entry point '{entry_point}' not found"))
}

pub struct KernelPipeline {
    pub name: &'static str,
    pub pipeline: wgpu::ComputePipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub workgroup_size: u32,
    pub slots: &'static [(BufferSlot, u32, bool)],
}

impl KernelPipeline {
    fn new(
        device: &wgpu::Device,
        name: &'static str,
        source: String,
        slots: &'static [(BufferSlot, u32, bool)],
    ) -> Result<Self, String> {
        let workgroup_size = reflect_workgroup_size(&source, name)?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let mut entries = vec![
            // binding 0: sim params uniform
            wgpu::BindGroupLayoutEntry {
                binding: PARAMS_BINDING,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ];
        for &(_, binding, read_only) in slots {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{name}_bgl")),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{name}_pl")),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{name}_pipeline")),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some(name),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            name,
            pipeline,
            bind_group_layout,
            workgroup_size,
            slots,
        })
    }

    pub fn binding_for(&self, slot: BufferSlot) -> Option<u32> {
        self.slots
            .iter()
            .find(|(s, _, _)| *s == slot)
            .map(|(_, binding, _)| *binding)
    }
}

pub struct BoidPipelines {
    pub steering: KernelPipeline,
    pub integrate: KernelPipeline,
}

impl BoidPipelines {
    pub fn new(device: &wgpu::Device) -> Result<Self, String> {
        let steering = KernelPipeline::new(device, STEERING_KERNEL, steering_source(), STEERING_SLOTS)?;
        let integrate =
            KernelPipeline::new(device, INTEGRATE_KERNEL, integrate_source(), INTEGRATE_SLOTS)?;
        Ok(Self {
            steering,
            integrate,
        })
    }
}
