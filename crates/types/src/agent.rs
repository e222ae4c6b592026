use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// One boid as stored in the agent buffer: 32 bytes = 8 × f32.
///
/// Each `vec3<f32>` is followed by a pad word so the layout matches the
/// 16-byte alignment WGSL gives `vec3` inside storage arrays.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AgentState {
    pub velocity: [f32; 3],
    pub _pad0: f32,
    pub position: [f32; 3],
    pub _pad1: f32,
}

impl AgentState {
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self {
            velocity: velocity.to_array(),
            _pad0: 0.0,
            position: position.to_array(),
            _pad1: 0.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn velocity(&self) -> Vec3 {
        Vec3::from_array(self.velocity)
    }
}

/// Per-agent steering force written by the force kernel, read by integration.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ForceScratch {
    pub force: [f32; 3],
    pub _pad: f32,
}

/// Spherical obstacle. Position comes first so the struct packs into 16 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObstacleDescriptor {
    pub position: [f32; 3],
    pub radius: f32,
}

impl ObstacleDescriptor {
    pub fn new(radius: f32, position: Vec3) -> Self {
        Self {
            position: position.to_array(),
            radius,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

pub const AGENT_STRIDE: u64 = std::mem::size_of::<AgentState>() as u64;
pub const FORCE_STRIDE: u64 = std::mem::size_of::<ForceScratch>() as u64;
pub const OBSTACLE_STRIDE: u64 = std::mem::size_of::<ObstacleDescriptor>() as u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_match_wgsl_layout() {
        assert_eq!(AGENT_STRIDE, 32);
        assert_eq!(FORCE_STRIDE, 16);
        assert_eq!(OBSTACLE_STRIDE, 16);
    }

    #[test]
    fn agent_fields_land_at_wgsl_offsets() {
        let a = AgentState::new(Vec3::new(4.0, 5.0, 6.0), Vec3::new(1.0, 2.0, 3.0));
        let words: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&a));
        assert_eq!(&words[0..3], &[1.0, 2.0, 3.0]);
        assert_eq!(&words[4..7], &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn obstacle_radius_is_last_word() {
        let o = ObstacleDescriptor::new(2.5, Vec3::new(1.0, 0.0, -1.0));
        let words: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&o));
        assert_eq!(words, &[1.0, 0.0, -1.0, 2.5]);
    }
}
