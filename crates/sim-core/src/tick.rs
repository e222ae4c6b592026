use types::SimParams;

use crate::backend::ComputeBackend;
use crate::coordinator::{CoordinatorState, SimulationCoordinator};
use crate::dispatch::DispatchPlan;
use crate::error::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No backend bound; nothing ran.
    Skipped,
    /// Both kernels were dispatched with the steering grid shown.
    Dispatched(DispatchPlan),
}

impl<B: ComputeBackend> SimulationCoordinator<B> {
    /// Advances the flock by `delta_time` seconds.
    ///
    /// Order: apply agent count, publish bounds change, upload params,
    /// dispatch steering, dispatch integration, submit, commit obstacles.
    ///
    /// # Panics
    /// If the coordinator was released.
    pub fn tick(&mut self, delta_time: f32) -> Result<TickOutcome, SimError> {
        self.assert_live("tick");
        if self.backend.is_none() {
            self.warn_missing_backend();
            return Ok(TickOutcome::Skipped);
        }
        if self.state == CoordinatorState::Uninitialized {
            self.initialize()?;
        }
        self.config.validate()?;

        // 1. Agent count
        self.apply_agent_count()?;
        // 2. Bounds
        self.detect_bounds_change();
        self.ensure_obstacle_capacity()?;

        let (Some(backend), Some(kernels)) = (self.backend.as_mut(), self.kernels) else {
            return Ok(TickOutcome::Skipped);
        };

        // 3. Params; obstacles the GPU buffer does not hold yet are not counted
        let mut params =
            SimParams::from_config(&self.config, self.obstacles.committed_len(), delta_time);
        // Kernel index guard must match the allocated buffer length
        params.agent_count = self.applied_agent_count;
        backend.set_params(&params);

        // 4. + 5. Steering strictly before integration
        backend.dispatch(kernels.steering, kernels.steering_plan.groups());
        backend.dispatch(kernels.integrate, kernels.integrate_plan.groups());
        backend.submit();

        // 6. Lands before the next tick's submission
        self.commit_obstacles();

        Ok(TickOutcome::Dispatched(kernels.steering_plan))
    }
}
