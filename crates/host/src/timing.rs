/// Longest step handed to the simulation. A tab that was in the background
/// reports a huge frame delta; integrating it would fling agents away.
pub const MAX_STEP_DT: f32 = 0.1;
/// Step used for a single step while paused.
pub const SINGLE_STEP_DT: f32 = 1.0 / 60.0;

pub struct FrameTiming {
    pub frame_count: u64,
    pub last_dt: f32,
    pub paused: bool,
    pub single_step: bool,
    pub time_scale: f32,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTiming {
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            last_dt: 0.0,
            paused: false,
            single_step: false,
            time_scale: 1.0,
        }
    }

    /// Returns the simulation step for this frame, or `None` if no tick
    /// should run.
    pub fn step_dt(&mut self, dt: f32) -> Option<f32> {
        self.frame_count += 1;
        self.last_dt = dt;

        if self.single_step {
            self.single_step = false;
            return Some(SINGLE_STEP_DT);
        }
        if self.paused || !dt.is_finite() || dt <= 0.0 {
            return None;
        }
        Some(dt.min(MAX_STEP_DT) * self.time_scale)
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn request_single_step(&mut self) {
        self.single_step = true;
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.clamp(0.0, 4.0);
    }
}
