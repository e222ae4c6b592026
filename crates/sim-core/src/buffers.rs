use rand::Rng;
use types::{ObstacleDescriptor, AGENT_STRIDE, FORCE_STRIDE, OBSTACLE_STRIDE};

use crate::backend::{AllocationError, BufferSlot, ComputeBackend, KernelId};
use crate::seed::{seed_agents, zeroed_forces};

/// The three GPU buffers one agent count needs.
pub struct AgentBuffers<Buf> {
    pub agents: Buf,
    pub forces: Buf,
    pub obstacles: Buf,
    pub agent_count: u32,
    pub obstacle_capacity: u32,
}

/// Owns the agent, force and obstacle buffers for the current configuration.
///
/// Buffers are released before they are reallocated; calling
/// [`BufferManager::allocate`] while a set is live is a bug in the caller.
/// No CPU copy of agent state is kept.
pub struct BufferManager<Buf> {
    set: Option<AgentBuffers<Buf>>,
    generation: u64,
}

impl<Buf> Default for BufferManager<Buf> {
    fn default() -> Self {
        Self {
            set: None,
            generation: 0,
        }
    }
}

impl<Buf> BufferManager<Buf> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates agent and force buffers for `agent_count` and an obstacle
    /// buffer for at least one obstacle.
    ///
    /// # Panics
    /// If buffers are already allocated.
    pub fn allocate<B>(
        &mut self,
        backend: &mut B,
        agent_count: u32,
        obstacle_count: u32,
    ) -> Result<(), AllocationError>
    where
        B: ComputeBackend<Buffer = Buf>,
    {
        assert!(
            self.set.is_none(),
            "buffers allocated twice; release() must come first"
        );
        let obstacle_capacity = obstacle_count.max(1);

        let agents = backend.create_buffer("agents", agent_count as u64 * AGENT_STRIDE)?;
        let forces = match backend.create_buffer("forces", agent_count as u64 * FORCE_STRIDE) {
            Ok(buf) => buf,
            Err(e) => {
                backend.release_buffer(agents);
                return Err(e);
            }
        };
        let obstacles =
            match backend.create_buffer("obstacles", obstacle_capacity as u64 * OBSTACLE_STRIDE) {
                Ok(buf) => buf,
                Err(e) => {
                    backend.release_buffer(agents);
                    backend.release_buffer(forces);
                    return Err(e);
                }
            };

        self.generation += 1;
        tracing::info!(
            agent_count,
            obstacle_capacity,
            generation = self.generation,
            "agent buffers allocated"
        );
        self.set = Some(AgentBuffers {
            agents,
            forces,
            obstacles,
            agent_count,
            obstacle_capacity,
        });
        Ok(())
    }

    /// Releases all three buffers. Does nothing when nothing is allocated.
    pub fn release<B>(&mut self, backend: &mut B)
    where
        B: ComputeBackend<Buffer = Buf>,
    {
        if let Some(set) = self.set.take() {
            backend.release_buffer(set.agents);
            backend.release_buffer(set.forces);
            backend.release_buffer(set.obstacles);
            tracing::debug!(generation = self.generation, "agent buffers released");
        }
    }

    /// Uploads a fresh random flock and zeroed forces. The staging vectors
    /// are dropped before returning.
    ///
    /// # Panics
    /// If nothing is allocated.
    pub fn seed<B, R>(&self, backend: &mut B, rng: &mut R)
    where
        B: ComputeBackend<Buffer = Buf>,
        R: Rng,
    {
        let set = self.live("seed");
        let agents = seed_agents(rng, set.agent_count);
        backend.write_buffer(&set.agents, 0, bytemuck::cast_slice(&agents));
        let forces = zeroed_forces(set.agent_count);
        backend.write_buffer(&set.forces, 0, bytemuck::cast_slice(&forces));
    }

    /// # Panics
    /// If nothing is allocated or `mirror` does not fit the obstacle buffer.
    pub fn upload_obstacles<B>(&self, backend: &mut B, mirror: &[ObstacleDescriptor])
    where
        B: ComputeBackend<Buffer = Buf>,
    {
        let set = self.live("upload_obstacles");
        assert!(
            mirror.len() <= set.obstacle_capacity as usize,
            "{} obstacles do not fit a buffer of {}",
            mirror.len(),
            set.obstacle_capacity
        );
        if !mirror.is_empty() {
            backend.write_buffer(&set.obstacles, 0, bytemuck::cast_slice(mirror));
        }
    }

    /// Replaces the obstacle buffer when `count` no longer fits. Returns
    /// whether a new buffer was created; the caller must rebind and upload.
    /// The old buffer survives a failed allocation.
    pub fn grow_obstacles<B>(&mut self, backend: &mut B, count: u32) -> Result<bool, AllocationError>
    where
        B: ComputeBackend<Buffer = Buf>,
    {
        let Some(set) = self.set.as_mut() else {
            panic!("grow_obstacles called with no buffers allocated");
        };
        if count <= set.obstacle_capacity {
            return Ok(false);
        }
        let capacity = count.max(set.obstacle_capacity * 2);
        let grown = backend.create_buffer("obstacles", capacity as u64 * OBSTACLE_STRIDE)?;
        let old = std::mem::replace(&mut set.obstacles, grown);
        backend.release_buffer(old);
        tracing::debug!(
            from = set.obstacle_capacity,
            to = capacity,
            "obstacle buffer grown"
        );
        set.obstacle_capacity = capacity;
        Ok(true)
    }

    /// Binds every buffer to the slots the two kernels read.
    pub fn bind_all<B>(&self, backend: &mut B, steering: KernelId, integrate: KernelId)
    where
        B: ComputeBackend<Buffer = Buf>,
    {
        let set = self.live("bind_all");
        backend.bind_buffer(steering, BufferSlot::Agents, &set.agents);
        backend.bind_buffer(steering, BufferSlot::Forces, &set.forces);
        backend.bind_buffer(steering, BufferSlot::Obstacles, &set.obstacles);
        backend.bind_buffer(integrate, BufferSlot::Agents, &set.agents);
        backend.bind_buffer(integrate, BufferSlot::Forces, &set.forces);
    }

    pub fn bind_obstacles<B>(&self, backend: &mut B, steering: KernelId)
    where
        B: ComputeBackend<Buffer = Buf>,
    {
        let set = self.live("bind_obstacles");
        backend.bind_buffer(steering, BufferSlot::Obstacles, &set.obstacles);
    }

    fn live(&self, op: &str) -> &AgentBuffers<Buf> {
        match self.set.as_ref() {
            Some(set) => set,
            None => panic!("{op} called with no buffers allocated"),
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.set.is_some()
    }

    pub fn buffers(&self) -> Option<&AgentBuffers<Buf>> {
        self.set.as_ref()
    }

    pub fn agent_buffer(&self) -> Option<&Buf> {
        self.set.as_ref().map(|s| &s.agents)
    }

    pub fn obstacle_capacity(&self) -> u32 {
        self.set.as_ref().map_or(0, |s| s.obstacle_capacity)
    }

    /// Bumped on every successful [`BufferManager::allocate`].
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
