use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned simulation volume.
///
/// Equality is exact: any change to a component, however small, counts as a
/// new bounds value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationBounds {
    pub center: Vec3,
    pub dimensions: Vec3,
}

impl SimulationBounds {
    pub fn new(center: Vec3, dimensions: Vec3) -> Self {
        Self { center, dimensions }
    }

    pub fn half_extents(&self) -> Vec3 {
        self.dimensions * 0.5
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.half_extents()
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.half_extents()
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min()).all() && p.cmple(self.max()).all()
    }

    /// The eight corners, used for frustum tests.
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min(), self.max());
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }
}

impl Default for SimulationBounds {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            dimensions: Vec3::splat(32.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_max_straddle_center() {
        let b = SimulationBounds::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 6.0, 8.0));
        assert_eq!(b.min(), Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(b.max(), Vec3::new(3.0, 5.0, 7.0));
        assert!(b.contains(Vec3::new(1.0, 2.0, 3.0)));
        assert!(!b.contains(Vec3::new(3.5, 2.0, 3.0)));
    }

    #[test]
    fn equality_is_exact() {
        let a = SimulationBounds::default();
        let mut b = a;
        b.center.x += f32::EPSILON;
        assert_ne!(a, b);
    }
}
