//! The compute capability the coordinator drives.
//!
//! Everything the coordinator needs from the GPU goes through
//! [`ComputeBackend`]: kernel lookup, thread-group size queries, buffer
//! lifetime, bindings, parameter upload and dispatch. [`crate::WgpuBackend`]
//! is the production implementation.

use thiserror::Error;
use types::SimParams;

/// Entry point of the steering-force kernel.
pub const STEERING_KERNEL: &str = "compute_steering_forces";
/// Entry point of the integration kernel.
pub const INTEGRATE_KERNEL: &str = "integrate_agents";

/// Opaque kernel identity handed out by [`ComputeBackend::find_kernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelId(pub u32);

/// Named buffer slots shared by both kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferSlot {
    Agents,
    Forces,
    Obstacles,
}

impl BufferSlot {
    pub fn name(self) -> &'static str {
        match self {
            BufferSlot::Agents => "agents",
            BufferSlot::Forces => "forces",
            BufferSlot::Obstacles => "obstacles",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("{label}: zero-sized buffer requested")]
    ZeroSize { label: &'static str },
    #[error("{label}: {requested} bytes exceeds device limit of {limit} bytes")]
    ExceedsLimit {
        label: &'static str,
        requested: u64,
        limit: u64,
    },
}

pub trait ComputeBackend {
    type Buffer;

    fn find_kernel(&self, name: &str) -> Option<KernelId>;

    /// Invocations per workgroup along x, as declared by the kernel.
    fn thread_group_size(&self, kernel: KernelId) -> u32;

    fn create_buffer(
        &mut self,
        label: &'static str,
        size: u64,
    ) -> Result<Self::Buffer, AllocationError>;

    fn release_buffer(&mut self, buffer: Self::Buffer);

    fn write_buffer(&mut self, buffer: &Self::Buffer, offset: u64, data: &[u8]);

    fn bind_buffer(&mut self, kernel: KernelId, slot: BufferSlot, buffer: &Self::Buffer);

    fn set_params(&mut self, params: &SimParams);

    /// Records a dispatch. Dispatches execute in recording order.
    fn dispatch(&mut self, kernel: KernelId, groups: [u32; 3]);

    /// Hands recorded dispatches to the device queue.
    fn submit(&mut self);
}
