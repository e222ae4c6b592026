use bytemuck::{Pod, Zeroable};

use crate::SimulationConfig;

/// Per-tick kernel parameters, uploaded as one uniform buffer.
///
/// Field order mirrors the `SimParams` struct in `shaders/common.wgsl`. Vectors are
/// padded to 16 bytes; total size is 80 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SimParams {
    pub agent_count: u32,
    pub obstacle_count: u32,
    pub delta_time: f32,
    pub max_speed: f32,
    pub cohesion_radius: f32,
    pub alignment_radius: f32,
    pub separation_radius: f32,
    pub max_steering_force: f32,
    pub cohesion_weight: f32,
    pub alignment_weight: f32,
    pub separation_weight: f32,
    pub obstacle_avoidance_weight: f32,
    pub bounds_center: [f32; 3],
    pub bounds_avoid_weight: f32,
    pub bounds_dimensions: [f32; 3],
    pub _pad: f32,
}

impl SimParams {
    pub fn from_config(
        config: &SimulationConfig,
        obstacle_count: u32,
        delta_time: f32,
    ) -> Self {
        Self {
            agent_count: config.agent_count,
            obstacle_count,
            delta_time,
            max_speed: config.max_speed,
            cohesion_radius: config.radii.cohesion,
            alignment_radius: config.radii.alignment,
            separation_radius: config.radii.separation,
            max_steering_force: config.max_steering_force,
            cohesion_weight: config.weights.cohesion,
            alignment_weight: config.weights.alignment,
            separation_weight: config.weights.separation,
            obstacle_avoidance_weight: config.obstacle_avoidance_weight,
            bounds_center: config.bounds_center.to_array(),
            bounds_avoid_weight: config.bounds_avoid_weight,
            bounds_dimensions: config.bounds_dimensions.to_array(),
            _pad: 0.0,
        }
    }

    pub fn to_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Default for SimParams {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default(), 0, 0.0)
    }
}
