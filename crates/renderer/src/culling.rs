use glam::{Mat4, Vec3, Vec4};

/// Six clip planes pulled out of a view-projection matrix (0..1 depth).
/// Each plane is `xyz·p + w >= 0` on the inside.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    pub fn from_view_proj(m: &Mat4) -> Self {
        let r0 = m.row(0);
        let r1 = m.row(1);
        let r2 = m.row(2);
        let r3 = m.row(3);
        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2].map(|p| {
            let len = p.truncate().length();
            if len > 0.0 {
                p / len
            } else {
                p
            }
        });
        Self { planes }
    }

    /// Conservative box test: false only when the box is fully outside one plane.
    pub fn intersects_aabb(&self, min: Vec3, max: Vec3) -> bool {
        self.planes.iter().all(|plane| {
            let n = plane.truncate();
            // Corner furthest along the plane normal
            let p = Vec3::select(n.cmpge(Vec3::ZERO), max, min);
            n.dot(p) + plane.w >= 0.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looking_down_negative_z() -> Frustum {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 1.0, 0.1, 50.0);
        Frustum::from_view_proj(&(proj * view))
    }

    #[test]
    fn box_in_front_is_visible() {
        let f = looking_down_negative_z();
        assert!(f.intersects_aabb(Vec3::splat(-1.0), Vec3::splat(1.0)));
    }

    #[test]
    fn box_behind_camera_is_culled() {
        let f = looking_down_negative_z();
        assert!(!f.intersects_aabb(Vec3::new(-1.0, -1.0, 20.0), Vec3::new(1.0, 1.0, 22.0)));
    }

    #[test]
    fn box_off_to_the_side_is_culled() {
        let f = looking_down_negative_z();
        assert!(!f.intersects_aabb(Vec3::new(40.0, -1.0, -1.0), Vec3::new(42.0, 1.0, 1.0)));
    }

    #[test]
    fn box_straddling_a_plane_is_kept() {
        let f = looking_down_negative_z();
        assert!(f.intersects_aabb(Vec3::new(-100.0, -1.0, -1.0), Vec3::new(0.0, 1.0, 1.0)));
    }

    #[test]
    fn box_past_far_plane_is_culled() {
        let f = looking_down_negative_z();
        assert!(!f.intersects_aabb(Vec3::new(-1.0, -1.0, -80.0), Vec3::new(1.0, 1.0, -70.0)));
    }
}
