use bytemuck::Zeroable;
use glam::Vec3;
use rand::Rng;
use types::{AgentState, ForceScratch};

pub const POSITION_SCALE: f32 = 1.0;
pub const VELOCITY_SCALE: f32 = 0.1;

/// Uniform sample inside the unit sphere, by rejection.
pub fn inside_unit_sphere<R: Rng>(rng: &mut R) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
        );
        if v.length_squared() <= 1.0 {
            return v;
        }
    }
}

pub fn seed_agents<R: Rng>(rng: &mut R, count: u32) -> Vec<AgentState> {
    (0..count)
        .map(|_| {
            let position = inside_unit_sphere(rng) * POSITION_SCALE;
            let velocity = inside_unit_sphere(rng) * VELOCITY_SCALE;
            AgentState::new(position, velocity)
        })
        .collect()
}

pub fn zeroed_forces(count: u32) -> Vec<ForceScratch> {
    vec![ForceScratch::zeroed(); count as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn agents_land_inside_scaled_spheres() {
        let mut rng = StdRng::seed_from_u64(7);
        let agents = seed_agents(&mut rng, 500);
        assert_eq!(agents.len(), 500);
        for a in &agents {
            assert!(a.position().length() <= POSITION_SCALE + 1e-5);
            assert!(a.velocity().length() <= VELOCITY_SCALE + 1e-5);
        }
    }

    #[test]
    fn same_seed_same_flock() {
        let a = seed_agents(&mut StdRng::seed_from_u64(42), 16);
        let b = seed_agents(&mut StdRng::seed_from_u64(42), 16);
        assert_eq!(a, b);
    }

    #[test]
    fn forces_start_at_zero() {
        let f = zeroed_forces(4);
        assert!(f.iter().all(|f| f.force == [0.0; 3]));
    }
}
