//! Owns the GPU-resident flock and keeps its buffers, bindings and dispatch
//! plan in step with the requested [`SimulationConfig`].

use crossbeam_channel::{Receiver, Sender};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use types::{ObstacleDescriptor, SimulationBounds, SimulationConfig, SimulationEvent};

use crate::backend::{ComputeBackend, KernelId, INTEGRATE_KERNEL, STEERING_KERNEL};
use crate::buffers::BufferManager;
use crate::dispatch::DispatchPlan;
use crate::error::SimError;
use crate::obstacles::{ObstacleHandle, ObstacleTracker};

const DEFAULT_SEED: u64 = 0x5eed_b01d;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Uninitialized,
    Ready,
    Reconfiguring,
    Released,
}

/// Kernel identities and their grids for the applied agent count.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BoundKernels {
    pub(crate) steering: KernelId,
    pub(crate) integrate: KernelId,
    pub(crate) steering_plan: DispatchPlan,
    pub(crate) integrate_plan: DispatchPlan,
}

impl BoundKernels {
    fn find<B: ComputeBackend>(backend: &B, agent_count: u32) -> Result<Self, SimError> {
        let steering = backend
            .find_kernel(STEERING_KERNEL)
            .ok_or(SimError::MissingKernel(STEERING_KERNEL))?;
        let integrate = backend
            .find_kernel(INTEGRATE_KERNEL)
            .ok_or(SimError::MissingKernel(INTEGRATE_KERNEL))?;
        Ok(Self {
            steering,
            integrate,
            steering_plan: DispatchPlan::new(agent_count, backend.thread_group_size(steering)),
            integrate_plan: DispatchPlan::new(agent_count, backend.thread_group_size(integrate)),
        })
    }

    fn replan<B: ComputeBackend>(&mut self, backend: &B, agent_count: u32) {
        self.steering_plan = DispatchPlan::new(agent_count, backend.thread_group_size(self.steering));
        self.integrate_plan =
            DispatchPlan::new(agent_count, backend.thread_group_size(self.integrate));
    }
}

/// Drives the two flocking kernels over GPU-resident agent buffers.
///
/// The requested configuration is freely mutable through
/// [`SimulationCoordinator::config_mut`]; each [`tick`](Self::tick) compares
/// it with what was last applied. An agent count change reallocates and
/// reseeds the buffers and publishes [`SimulationEvent::AgentCountChanged`];
/// a bounds change only publishes [`SimulationEvent::BoundsChanged`].
///
/// # Panics
/// Every operation panics once the coordinator is
/// [`Released`](CoordinatorState::Released).
pub struct SimulationCoordinator<B: ComputeBackend> {
    pub(crate) backend: Option<B>,
    pub(crate) config: SimulationConfig,
    pub(crate) state: CoordinatorState,
    pub(crate) buffers: BufferManager<B::Buffer>,
    pub(crate) obstacles: ObstacleTracker,
    pub(crate) kernels: Option<BoundKernels>,
    pub(crate) applied_agent_count: u32,
    pub(crate) applied_bounds: SimulationBounds,
    pub(crate) warned_missing_backend: bool,
    rng: StdRng,
    subscribers: Vec<Sender<SimulationEvent>>,
}

impl<B: ComputeBackend> SimulationCoordinator<B> {
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_seed(config, DEFAULT_SEED)
    }

    /// `seed` drives every agent seeding this coordinator performs.
    pub fn with_seed(config: SimulationConfig, seed: u64) -> Self {
        let applied_bounds = config.bounds();
        Self {
            backend: None,
            config,
            state: CoordinatorState::Uninitialized,
            buffers: BufferManager::new(),
            obstacles: ObstacleTracker::new(),
            kernels: None,
            applied_agent_count: 0,
            applied_bounds,
            warned_missing_backend: false,
            rng: StdRng::seed_from_u64(seed),
            subscribers: Vec::new(),
        }
    }

    /// Binds (or replaces) the compute backend. Buffers owned through a
    /// previous backend are released and the coordinator initializes again
    /// on the next tick.
    pub fn bind_backend(&mut self, backend: B) {
        self.assert_live("bind_backend");
        if let Some(mut old) = self.backend.take() {
            self.buffers.release(&mut old);
        }
        self.backend = Some(backend);
        self.kernels = None;
        self.state = CoordinatorState::Uninitialized;
        self.warned_missing_backend = false;
        // Fresh buffers need the whole mirror.
        self.obstacles.mark_dirty();
    }

    /// Allocates and seeds buffers, binds them and plans both dispatches.
    ///
    /// Does nothing when already initialized or when no backend is bound.
    /// On error the coordinator stays `Uninitialized`.
    pub fn initialize(&mut self) -> Result<(), SimError> {
        self.assert_live("initialize");
        if self.state != CoordinatorState::Uninitialized {
            return Ok(());
        }
        self.config.validate()?;
        let Some(backend) = self.backend.as_mut() else {
            self.warn_missing_backend();
            return Ok(());
        };

        let agent_count = self.config.agent_count;
        let kernels = BoundKernels::find(backend, agent_count)?;
        let reinitializing = self.buffers.generation() > 0;

        self.buffers
            .allocate(backend, agent_count, self.obstacles.len())?;
        self.buffers.seed(backend, &mut self.rng);
        self.obstacles.mark_dirty();
        let buffers = &self.buffers;
        self.obstacles
            .commit_if_dirty(|mirror| buffers.upload_obstacles(backend, mirror));
        self.buffers
            .bind_all(backend, kernels.steering, kernels.integrate);

        let previous = self.applied_agent_count;
        self.kernels = Some(kernels);
        self.applied_agent_count = agent_count;
        self.state = CoordinatorState::Ready;
        tracing::info!(
            agent_count,
            obstacles = self.obstacles.len(),
            groups = kernels.steering_plan.group_count,
            "simulation initialized"
        );
        if reinitializing {
            self.emit(SimulationEvent::AgentCountChanged {
                previous,
                current: agent_count,
            });
        }
        Ok(())
    }

    /// Requests `agent_count` agents and applies it right away.
    ///
    /// An unchanged count does nothing. An invalid one is rejected before
    /// any buffer is touched. A failed reallocation leaves the coordinator
    /// `Released`.
    pub fn reconfigure(&mut self, agent_count: u32) -> Result<(), SimError> {
        self.assert_live("reconfigure");
        let mut requested = self.config.clone();
        requested.agent_count = agent_count;
        requested.validate()?;
        self.config.agent_count = agent_count;
        match self.state {
            CoordinatorState::Uninitialized => self.initialize(),
            _ => self.apply_agent_count(),
        }
    }

    pub(crate) fn apply_agent_count(&mut self) -> Result<(), SimError> {
        let previous = self.applied_agent_count;
        let current = self.config.agent_count;
        if previous == current {
            return Ok(());
        }
        self.config.validate()?;
        let (Some(backend), Some(kernels)) = (self.backend.as_mut(), self.kernels.as_mut()) else {
            return Ok(());
        };

        self.state = CoordinatorState::Reconfiguring;
        self.buffers.release(backend);
        if let Err(e) = self
            .buffers
            .allocate(backend, current, self.obstacles.len())
        {
            tracing::error!(previous, current, error = %e, "agent buffer reallocation failed");
            self.kernels = None;
            self.state = CoordinatorState::Released;
            return Err(e.into());
        }
        self.buffers.seed(backend, &mut self.rng);
        self.obstacles.mark_dirty();
        let buffers = &self.buffers;
        self.obstacles
            .commit_if_dirty(|mirror| buffers.upload_obstacles(backend, mirror));
        self.buffers
            .bind_all(backend, kernels.steering, kernels.integrate);
        kernels.replan(backend, current);

        self.applied_agent_count = current;
        self.state = CoordinatorState::Ready;
        tracing::info!(previous, current, "agent count applied");
        self.emit(SimulationEvent::AgentCountChanged { previous, current });
        Ok(())
    }

    /// Publishes `BoundsChanged` if the requested bounds differ exactly from
    /// the applied ones.
    pub(crate) fn detect_bounds_change(&mut self) -> bool {
        let requested = self.config.bounds();
        if requested == self.applied_bounds {
            return false;
        }
        self.emit(SimulationEvent::BoundsChanged(requested));
        self.applied_bounds = requested;
        true
    }

    /// Replaces the obstacle buffer if registrations outgrew it and uploads
    /// the mirror into the new one.
    pub(crate) fn ensure_obstacle_capacity(&mut self) -> Result<(), SimError> {
        let (Some(backend), Some(kernels)) = (self.backend.as_mut(), self.kernels.as_ref()) else {
            return Ok(());
        };
        if !self.buffers.grow_obstacles(backend, self.obstacles.len())? {
            return Ok(());
        }
        self.buffers.bind_obstacles(backend, kernels.steering);
        self.obstacles.mark_dirty();
        let buffers = &self.buffers;
        self.obstacles
            .commit_if_dirty(|mirror| buffers.upload_obstacles(backend, mirror));
        Ok(())
    }

    pub(crate) fn commit_obstacles(&mut self) -> bool {
        let Some(backend) = self.backend.as_mut() else {
            return false;
        };
        if !self.buffers.is_allocated() {
            return false;
        }
        let buffers = &self.buffers;
        self.obstacles
            .commit_if_dirty(|mirror| buffers.upload_obstacles(backend, mirror))
    }

    /// Registers an obstacle. Before initialization it is part of the first
    /// allocation; afterwards the obstacle buffer grows on the next tick.
    pub fn register_obstacle(&mut self, radius: f32, position: Vec3) -> ObstacleHandle {
        self.assert_live("register_obstacle");
        self.obstacles.register(radius, position)
    }

    /// Records an obstacle change; the GPU copy is refreshed after the next
    /// tick's dispatches.
    ///
    /// # Panics
    /// If `handle` is out of range.
    pub fn report_obstacle_change(&mut self, handle: ObstacleHandle, radius: f32, position: Vec3) {
        self.assert_live("report_obstacle_change");
        self.obstacles.report_change(handle, radius, position);
    }

    pub fn obstacle(&self, handle: ObstacleHandle) -> Option<&ObstacleDescriptor> {
        self.obstacles.get(handle)
    }

    pub fn obstacle_count(&self) -> u32 {
        self.obstacles.len()
    }

    /// Explicit teardown. Every later call panics.
    pub fn release(&mut self) {
        self.assert_live("release");
        if let Some(backend) = self.backend.as_mut() {
            self.buffers.release(backend);
        }
        self.kernels = None;
        self.state = CoordinatorState::Released;
        tracing::info!("simulation released");
    }

    /// A receiver for every event published from now on.
    pub fn subscribe(&mut self) -> Receiver<SimulationEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: SimulationEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    pub(crate) fn warn_missing_backend(&mut self) {
        if !self.warned_missing_backend {
            tracing::warn!("no compute backend bound; simulation ticks are skipped");
            self.warned_missing_backend = true;
        }
    }

    pub(crate) fn assert_live(&self, op: &str) {
        assert!(
            self.state != CoordinatorState::Released,
            "{op} called on a released simulation coordinator"
        );
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Requested configuration. Changes are applied on the next tick.
    pub fn config_mut(&mut self) -> &mut SimulationConfig {
        self.assert_live("config_mut");
        &mut self.config
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Agent count the current buffers were allocated for.
    pub fn agent_count(&self) -> u32 {
        self.applied_agent_count
    }

    /// Bounds last published through [`SimulationEvent::BoundsChanged`], or
    /// the construction bounds before any change was published.
    pub fn bounds(&self) -> SimulationBounds {
        self.applied_bounds
    }

    pub fn agent_buffer(&self) -> Option<&B::Buffer> {
        self.buffers.agent_buffer()
    }

    /// Grid of the steering dispatch.
    pub fn dispatch_plan(&self) -> Option<DispatchPlan> {
        self.kernels.map(|k| k.steering_plan)
    }

    pub fn buffer_generation(&self) -> u64 {
        self.buffers.generation()
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }
}

impl<B: ComputeBackend> Drop for SimulationCoordinator<B> {
    fn drop(&mut self) {
        if self.state == CoordinatorState::Released {
            return;
        }
        if let Some(backend) = self.backend.as_mut() {
            self.buffers.release(backend);
        }
    }
}
