use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use types::SimulationBounds;

/// Uniform read by `agents_render.wgsl`: view-projection, then per-instance
/// scale in xyz and the speed that maps to the hottest tint in w.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub scale: [f32; 4],
}

/// Orbit camera around the centre of the simulation volume.
pub struct Camera {
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub target: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(bounds: &SimulationBounds) -> Self {
        let mut camera = Self {
            distance: 1.0,
            yaw: 0.6,
            pitch: 0.35,
            target: Vec3::ZERO,
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        };
        camera.frame(bounds);
        camera
    }

    /// Points at the volume centre from far enough away to see all of it.
    pub fn frame(&mut self, bounds: &SimulationBounds) {
        let radius = bounds.half_extents().length().max(1.0);
        self.target = bounds.center;
        self.distance = radius * 2.2;
        self.far = radius * 8.0;
    }

    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * 0.005;
        self.pitch = (self.pitch + dy * 0.005).clamp(-1.5, 1.5);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance * (1.0 - delta * 0.001)).clamp(1.0, self.far * 0.9);
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        let eye = self.eye_position();
        let forward = (self.target - eye).normalize();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward).normalize();
        let scale = self.distance * 0.002;
        self.target += right * (-dx * scale) + up * (dy * scale);
    }

    pub fn eye_position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    pub fn view_projection(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye_position(), self.target, Vec3::Y);
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far);
        proj * view
    }

    pub fn uniform(&self, agent_scale: Vec3, max_speed: f32) -> CameraUniform {
        CameraUniform {
            view_proj: self.view_projection().to_cols_array_2d(),
            scale: agent_scale.extend(max_speed).to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_the_volume() {
        let bounds = SimulationBounds::new(Vec3::new(5.0, 0.0, 0.0), Vec3::splat(32.0));
        let camera = Camera::new(&bounds);
        assert_eq!(camera.target, bounds.center);
        let eye_distance = camera.eye_position().distance(bounds.center);
        assert!((eye_distance - camera.distance).abs() < 1e-3);
        assert!(camera.distance > bounds.half_extents().length());
        assert!(camera.far > camera.distance * 2.0);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::new(&SimulationBounds::default());
        camera.orbit(0.0, 10_000.0);
        assert_eq!(camera.pitch, 1.5);
        camera.orbit(0.0, -100_000.0);
        assert_eq!(camera.pitch, -1.5);
    }

    #[test]
    fn zoom_stays_in_front_of_far_plane() {
        let mut camera = Camera::new(&SimulationBounds::default());
        camera.zoom(-1.0e6);
        assert!(camera.distance < camera.far);
        camera.zoom(1.0e6);
        assert_eq!(camera.distance, 1.0);
    }

    #[test]
    fn uniform_packs_scale_and_speed() {
        let camera = Camera::new(&SimulationBounds::default());
        let u = camera.uniform(Vec3::new(0.2, 0.3, 0.6), 10.0);
        assert_eq!(u.scale, [0.2, 0.3, 0.6, 10.0]);
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
    }
}
