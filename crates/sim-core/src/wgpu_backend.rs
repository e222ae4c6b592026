use std::collections::HashMap;

use types::SimParams;

use crate::backend::{AllocationError, BufferSlot, ComputeBackend, KernelId, INTEGRATE_KERNEL, STEERING_KERNEL};
use crate::error::SimError;
use crate::pipelines::{BoidPipelines, KernelPipeline, PARAMS_BINDING};

const STEERING_ID: KernelId = KernelId(0);
const INTEGRATE_ID: KernelId = KernelId(1);

#[derive(Default)]
struct KernelBindings {
    buffers: HashMap<BufferSlot, wgpu::Buffer>,
    bind_group: Option<wgpu::BindGroup>,
}

/// [`ComputeBackend`] on a wgpu device.
///
/// Dispatches are recorded into one command encoder per tick, one compute
/// pass each, and handed to the queue on [`ComputeBackend::submit`]. Bind
/// groups are rebuilt lazily after any binding changes.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipelines: BoidPipelines,
    params: wgpu::Buffer,
    bindings: [KernelBindings; 2],
    encoder: Option<wgpu::CommandEncoder>,
}

impl WgpuBackend {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Self, SimError> {
        let pipelines = BoidPipelines::new(device).map_err(SimError::Shader)?;
        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sim_params"),
            size: std::mem::size_of::<SimParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        tracing::info!(
            steering_workgroup = pipelines.steering.workgroup_size,
            integrate_workgroup = pipelines.integrate.workgroup_size,
            "compute pipelines ready"
        );
        Ok(Self {
            device: device.clone(),
            queue: queue.clone(),
            pipelines,
            params,
            bindings: Default::default(),
            encoder: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn params_buffer(&self) -> &wgpu::Buffer {
        &self.params
    }
}

fn kernel_pipeline(pipelines: &BoidPipelines, kernel: KernelId) -> &KernelPipeline {
    match kernel {
        STEERING_ID => &pipelines.steering,
        INTEGRATE_ID => &pipelines.integrate,
        other => panic!("kernel id {other:?} was not issued by this backend"),
    }
}

fn build_bind_group(
    device: &wgpu::Device,
    kernel: &KernelPipeline,
    params: &wgpu::Buffer,
    buffers: &HashMap<BufferSlot, wgpu::Buffer>,
) -> Option<wgpu::BindGroup> {
    let mut entries = vec![wgpu::BindGroupEntry {
        binding: PARAMS_BINDING,
        resource: params.as_entire_binding(),
    }];
    for &(slot, binding, _) in kernel.slots {
        let buffer = buffers.get(&slot)?;
        entries.push(wgpu::BindGroupEntry {
            binding,
            resource: buffer.as_entire_binding(),
        });
    }
    Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{}_bg", kernel.name)),
        layout: &kernel.bind_group_layout,
        entries: &entries,
    }))
}

impl ComputeBackend for WgpuBackend {
    type Buffer = wgpu::Buffer;

    fn find_kernel(&self, name: &str) -> Option<KernelId> {
        match name {
            STEERING_KERNEL => Some(STEERING_ID),
            INTEGRATE_KERNEL => Some(INTEGRATE_ID),
            _ => None,
        }
    }

    fn thread_group_size(&self, kernel: KernelId) -> u32 {
        kernel_pipeline(&self.pipelines, kernel).workgroup_size
    }

    fn create_buffer(&mut self, label: &'static str, size: u64) -> Result<wgpu::Buffer, AllocationError> {
        if size == 0 {
            return Err(AllocationError::ZeroSize { label });
        }
        let limits = self.device.limits();
        let limit = limits
            .max_buffer_size
            .min(limits.max_storage_buffer_binding_size as u64);
        if size > limit {
            return Err(AllocationError::ExceedsLimit {
                label,
                requested: size,
                limit,
            });
        }
        Ok(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }))
    }

    fn release_buffer(&mut self, buffer: wgpu::Buffer) {
        // Cached bind groups may still reference it.
        for bindings in &mut self.bindings {
            bindings.bind_group = None;
        }
        buffer.destroy();
    }

    fn write_buffer(&mut self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer, offset, data);
    }

    fn bind_buffer(&mut self, kernel: KernelId, slot: BufferSlot, buffer: &wgpu::Buffer) {
        if kernel_pipeline(&self.pipelines, kernel).binding_for(slot).is_none() {
            tracing::trace!(slot = slot.name(), "kernel does not read slot, binding ignored");
            return;
        }
        let bindings = &mut self.bindings[kernel.0 as usize];
        bindings.buffers.insert(slot, buffer.clone());
        bindings.bind_group = None;
    }

    fn set_params(&mut self, params: &SimParams) {
        self.queue.write_buffer(&self.params, 0, params.to_bytes());
    }

    fn dispatch(&mut self, kernel: KernelId, groups: [u32; 3]) {
        let pipeline = kernel_pipeline(&self.pipelines, kernel);
        let bindings = &mut self.bindings[kernel.0 as usize];
        if bindings.bind_group.is_none() {
            bindings.bind_group =
                build_bind_group(&self.device, pipeline, &self.params, &bindings.buffers);
        }
        let Some(bind_group) = bindings.bind_group.as_ref() else {
            tracing::error!(kernel = pipeline.name, "dispatch skipped: buffer slots not bound");
            return;
        };

        let device = &self.device;
        let encoder = self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("boids_tick_encoder"),
            })
        });
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(pipeline.name),
            timestamp_writes: None,
        });
        pass.set_pipeline(&pipeline.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(groups[0], groups[1], groups[2]);
    }

    fn submit(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
    }
}
