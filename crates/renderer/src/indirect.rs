use bytemuck::{Pod, Zeroable};

/// Arguments of `draw_indexed_indirect`, in the order the GPU reads them.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

pub const DRAW_ARGS_SIZE: u64 = std::mem::size_of::<DrawArgs>() as u64;

impl DrawArgs {
    /// One instance per agent over the whole mesh.
    pub fn for_agents(index_count: u32, agent_count: u32) -> Self {
        Self {
            index_count,
            instance_count: agent_count,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
