use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SimulationBounds;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("agent_count must be at least 1")]
    ZeroAgents,
    #[error("{field} must be finite and non-negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("bounds {field} must be finite")]
    NonFiniteBounds { field: &'static str },
    #[error("failed to parse simulation config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Neighbourhood radius per flocking behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorRadii {
    pub cohesion: f32,
    pub alignment: f32,
    pub separation: f32,
}

impl Default for BehaviorRadii {
    fn default() -> Self {
        Self {
            cohesion: 1.0,
            alignment: 1.0,
            separation: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorWeights {
    pub cohesion: f32,
    pub alignment: f32,
    pub separation: f32,
}

impl Default for BehaviorWeights {
    fn default() -> Self {
        Self {
            cohesion: 0.5,
            alignment: 0.5,
            separation: 0.5,
        }
    }
}

/// Requested simulation configuration. Every field may change between ticks;
/// only `agent_count` forces buffer reallocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub agent_count: u32,
    pub radii: BehaviorRadii,
    pub weights: BehaviorWeights,
    pub max_speed: f32,
    pub max_steering_force: f32,
    pub obstacle_avoidance_weight: f32,
    pub bounds_center: Vec3,
    pub bounds_dimensions: Vec3,
    pub bounds_avoid_weight: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            agent_count: 5000,
            radii: BehaviorRadii::default(),
            weights: BehaviorWeights::default(),
            max_speed: 10.0,
            max_steering_force: 1.0,
            obstacle_avoidance_weight: 5.0,
            bounds_center: Vec3::ZERO,
            bounds_dimensions: Vec3::splat(32.0),
            bounds_avoid_weight: 10.0,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> String {
        // Plain data with no maps or non-string keys; serialization cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn bounds(&self) -> SimulationBounds {
        SimulationBounds::new(self.bounds_center, self.bounds_dimensions)
    }

    pub fn set_bounds(&mut self, bounds: SimulationBounds) {
        self.bounds_center = bounds.center;
        self.bounds_dimensions = bounds.dimensions;
    }

    /// Checks everything the kernels assume about their inputs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent_count == 0 {
            return Err(ConfigError::ZeroAgents);
        }
        let scalars = [
            ("radii.cohesion", self.radii.cohesion),
            ("radii.alignment", self.radii.alignment),
            ("radii.separation", self.radii.separation),
            ("weights.cohesion", self.weights.cohesion),
            ("weights.alignment", self.weights.alignment),
            ("weights.separation", self.weights.separation),
            ("max_speed", self.max_speed),
            ("max_steering_force", self.max_steering_force),
            ("obstacle_avoidance_weight", self.obstacle_avoidance_weight),
            ("bounds_avoid_weight", self.bounds_avoid_weight),
        ];
        for (field, value) in scalars {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }
        if !self.bounds_center.is_finite() {
            return Err(ConfigError::NonFiniteBounds { field: "center" });
        }
        if !self.bounds_dimensions.is_finite() {
            return Err(ConfigError::NonFiniteBounds { field: "dimensions" });
        }
        Ok(())
    }
}
