use bytemuck::{Pod, Zeroable};
use glam::Vec3;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Square-based pyramid in unit space, apex along +Z (the agent's heading).
/// Faces are flat shaded, so each face has its own vertices.
pub fn pyramid() -> (Vec<MeshVertex>, Vec<u16>) {
    let apex = Vec3::new(0.0, 0.0, 0.5);
    let base = [
        Vec3::new(-0.5, -0.5, -0.5),
        Vec3::new(0.5, -0.5, -0.5),
        Vec3::new(0.5, 0.5, -0.5),
        Vec3::new(-0.5, 0.5, -0.5),
    ];

    let mut vertices = Vec::with_capacity(16);
    let mut indices = Vec::with_capacity(18);

    for i in 0..4 {
        let a = base[i];
        let b = base[(i + 1) % 4];
        let normal = (b - a).cross(apex - a).normalize();
        let first = vertices.len() as u16;
        for p in [a, b, apex] {
            vertices.push(MeshVertex {
                position: p.to_array(),
                normal: normal.to_array(),
            });
        }
        indices.extend_from_slice(&[first, first + 1, first + 2]);
    }

    let first = vertices.len() as u16;
    for p in base.iter().rev() {
        vertices.push(MeshVertex {
            position: p.to_array(),
            normal: [0.0, 0.0, -1.0],
        });
    }
    indices.extend_from_slice(&[first, first + 1, first + 2, first, first + 2, first + 3]);

    (vertices, indices)
}
