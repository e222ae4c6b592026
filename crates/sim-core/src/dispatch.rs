/// Workgroup grid for one kernel at one agent count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPlan {
    pub thread_group_size: u32,
    pub group_count: u32,
}

impl DispatchPlan {
    /// Rounds up so the last partial group still covers the tail agents.
    /// Kernels bounds-check their index against `agent_count`.
    ///
    /// # Panics
    /// If `thread_group_size` is zero.
    pub fn new(agent_count: u32, thread_group_size: u32) -> Self {
        assert!(thread_group_size > 0, "thread group size must be non-zero");
        let group_count = agent_count.div_ceil(thread_group_size).max(1);
        tracing::debug!(agent_count, thread_group_size, group_count, "dispatch planned");
        Self {
            thread_group_size,
            group_count,
        }
    }

    pub fn groups(&self) -> [u32; 3] {
        [self.group_count, 1, 1]
    }

    pub fn invocations(&self) -> u64 {
        self.group_count as u64 * self.thread_group_size as u64
    }
}

pub fn plan(agent_count: u32, thread_group_size: u32) -> u32 {
    DispatchPlan::new(agent_count, thread_group_size).group_count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_partial_groups() {
        assert_eq!(plan(5000, 256), 20);
        assert_eq!(plan(5120, 256), 20);
        assert_eq!(plan(5121, 256), 21);
    }

    #[test]
    fn tiny_counts_get_one_group() {
        assert_eq!(plan(1, 256), 1);
        assert_eq!(plan(255, 256), 1);
        assert_eq!(plan(0, 64), 1);
    }

    #[test]
    fn every_agent_covered_without_spare_group() {
        for group in [1u32, 7, 32, 64, 100, 256, 1024] {
            for count in (1u32..3000).step_by(37).chain([u32::MAX]) {
                let p = DispatchPlan::new(count, group);
                assert!(p.invocations() >= count as u64, "{count}/{group}");
                assert!(((p.group_count - 1) as u64) * (group as u64) < count as u64, "{count}/{group}");
            }
        }
    }

    #[test]
    fn groups_are_one_dimensional() {
        assert_eq!(DispatchPlan::new(600, 256).groups(), [3, 1, 1]);
    }

    #[test]
    #[should_panic(expected = "thread group size")]
    fn zero_group_size_panics() {
        DispatchPlan::new(10, 0);
    }
}
