pub mod backend;
pub mod buffers;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod obstacles;
pub mod pipelines;
pub mod seed;
pub mod tick;
pub mod wgpu_backend;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{AllocationError, BufferSlot, ComputeBackend, KernelId};
pub use buffers::BufferManager;
pub use coordinator::{CoordinatorState, SimulationCoordinator};
pub use dispatch::DispatchPlan;
pub use error::SimError;
pub use obstacles::{Obstacle, ObstacleHandle, ObstacleTracker};
pub use tick::TickOutcome;
pub use wgpu_backend::WgpuBackend;
