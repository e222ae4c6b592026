use glam::Vec3;
use types::ObstacleDescriptor;

use crate::backend::ComputeBackend;
use crate::coordinator::SimulationCoordinator;

/// Stable index into the obstacle buffer, handed out at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObstacleHandle(u32);

impl ObstacleHandle {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// CPU mirror of the obstacle buffer.
///
/// Changes land in the mirror immediately and mark it dirty; the GPU copy is
/// refreshed by one full upload in [`ObstacleTracker::commit_if_dirty`], no
/// matter how many changes came in since the last commit.
#[derive(Debug, Default)]
pub struct ObstacleTracker {
    mirror: Vec<ObstacleDescriptor>,
    dirty: bool,
    committed_len: u32,
}

impl ObstacleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, radius: f32, position: Vec3) -> ObstacleHandle {
        let handle = ObstacleHandle(self.mirror.len() as u32);
        self.mirror.push(ObstacleDescriptor::new(radius, position));
        self.dirty = true;
        handle
    }

    /// # Panics
    /// If `handle` was not issued by this tracker.
    pub fn report_change(&mut self, handle: ObstacleHandle, radius: f32, position: Vec3) {
        let len = self.mirror.len();
        let Some(slot) = self.mirror.get_mut(handle.0 as usize) else {
            panic!("obstacle handle {} out of range (registered: {len})", handle.0);
        };
        *slot = ObstacleDescriptor::new(radius, position);
        self.dirty = true;
    }

    /// Hands the whole mirror to `upload` if anything changed, then clears
    /// the dirty flag. Returns whether an upload happened.
    pub fn commit_if_dirty(&mut self, upload: impl FnOnce(&[ObstacleDescriptor])) -> bool {
        if !self.dirty {
            return false;
        }
        upload(&self.mirror);
        self.dirty = false;
        self.committed_len = self.mirror.len() as u32;
        tracing::debug!(count = self.committed_len, "obstacles committed");
        true
    }

    /// Forces the next commit, e.g. after the GPU buffer was replaced.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get(&self, handle: ObstacleHandle) -> Option<&ObstacleDescriptor> {
        self.mirror.get(handle.0 as usize)
    }

    pub fn len(&self) -> u32 {
        self.mirror.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.mirror.is_empty()
    }

    /// Obstacles the GPU buffer holds valid data for.
    pub fn committed_len(&self) -> u32 {
        self.committed_len
    }
}

/// A scene obstacle that pushes its own changes to the coordinator.
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub radius: f32,
    pub position: Vec3,
    handle: ObstacleHandle,
    last_radius: f32,
    last_position: Vec3,
}

impl Obstacle {
    pub fn spawn<B: ComputeBackend>(
        coordinator: &mut SimulationCoordinator<B>,
        radius: f32,
        position: Vec3,
    ) -> Self {
        let handle = coordinator.register_obstacle(radius, position);
        Self {
            radius,
            position,
            handle,
            last_radius: radius,
            last_position: position,
        }
    }

    pub fn handle(&self) -> ObstacleHandle {
        self.handle
    }

    /// Reports the obstacle if its radius or position moved since the last
    /// report. Returns whether a report was made.
    pub fn sync<B: ComputeBackend>(&mut self, coordinator: &mut SimulationCoordinator<B>) -> bool {
        if self.radius == self.last_radius && self.position == self.last_position {
            return false;
        }
        coordinator.report_obstacle_change(self.handle, self.radius, self.position);
        self.last_radius = self.radius;
        self.last_position = self.position;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_sequential_indices() {
        let mut tracker = ObstacleTracker::new();
        let a = tracker.register(1.0, Vec3::ZERO);
        let b = tracker.register(2.0, Vec3::X);
        assert_eq!((a.index(), b.index()), (0, 1));
        assert_eq!(tracker.get(b).unwrap().radius, 2.0);
    }

    #[test]
    fn many_changes_coalesce_into_one_upload() {
        let mut tracker = ObstacleTracker::new();
        let handles: Vec<_> = (0..4).map(|i| tracker.register(1.0, Vec3::splat(i as f32))).collect();
        tracker.commit_if_dirty(|_| {});

        for step in 0..5 {
            tracker.report_change(handles[1], 1.5, Vec3::splat(step as f32));
            tracker.report_change(handles[3], 0.5, Vec3::Y * step as f32);
        }

        let mut uploads = Vec::new();
        assert!(tracker.commit_if_dirty(|m| uploads.push(m.to_vec())));
        assert!(!tracker.commit_if_dirty(|m| uploads.push(m.to_vec())));
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].len(), 4);
        assert_eq!(uploads[0][1].position(), Vec3::splat(4.0));
        assert_eq!(uploads[0][3].radius, 0.5);
    }

    #[test]
    fn clean_tracker_skips_upload() {
        let mut tracker = ObstacleTracker::new();
        assert!(!tracker.commit_if_dirty(|_| panic!("nothing to upload")));
        assert_eq!(tracker.committed_len(), 0);
    }

    #[test]
    fn mark_dirty_forces_reupload() {
        let mut tracker = ObstacleTracker::new();
        tracker.register(1.0, Vec3::ZERO);
        tracker.commit_if_dirty(|_| {});
        tracker.mark_dirty();
        assert!(tracker.commit_if_dirty(|m| assert_eq!(m.len(), 1)));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn foreign_handle_panics() {
        let mut other = ObstacleTracker::new();
        other.register(1.0, Vec3::ZERO);
        other.register(1.0, Vec3::ZERO);
        let foreign = other.register(1.0, Vec3::ZERO);

        let mut tracker = ObstacleTracker::new();
        tracker.register(1.0, Vec3::ZERO);
        tracker.report_change(foreign, 2.0, Vec3::ONE);
    }
}
