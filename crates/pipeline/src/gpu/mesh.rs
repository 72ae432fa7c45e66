use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

impl Vertex {
    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        }
    }
}

pub(crate) const TORUS_DIAMETER: f32 = 1.0;
pub(crate) const TORUS_THICKNESS: f32 = 0.333;
pub(crate) const TORUS_TESSELLATION: u32 = 32;

/// Torus around the Y axis: `tessellation + 1` rings of `tessellation + 1`
/// tube vertices each, quads wrapped with two triangles apiece.
pub(crate) fn torus(diameter: f32, thickness: f32, tessellation: u32) -> (Vec<Vertex>, Vec<u16>) {
    assert!(tessellation >= 3, "torus needs at least 3 segments");
    let stride = tessellation + 1;
    let ring_radius = diameter / 2.0;
    let tube_radius = thickness / 2.0;

    let mut vertices = Vec::with_capacity((stride * stride) as usize);
    let mut indices = Vec::with_capacity((stride * stride * 6) as usize);

    for i in 0..=tessellation {
        let outer_angle =
            i as f32 * std::f32::consts::TAU / tessellation as f32 - std::f32::consts::FRAC_PI_2;
        let (sin_outer, cos_outer) = outer_angle.sin_cos();

        for j in 0..=tessellation {
            let inner_angle =
                j as f32 * std::f32::consts::TAU / tessellation as f32 + std::f32::consts::PI;
            let (dy, dx) = inner_angle.sin_cos();

            // Tube cross-section sits in the ring plane, then swings around Y.
            let ring_x = dx * tube_radius + ring_radius;
            let ring_y = dy * tube_radius;
            vertices.push(Vertex {
                position: [ring_x * cos_outer, ring_y, -ring_x * sin_outer],
                normal: [dx * cos_outer, dy, -dx * sin_outer],
            });

            let next_i = (i + 1) % stride;
            let next_j = (j + 1) % stride;
            indices.push((i * stride + j) as u16);
            indices.push((i * stride + next_j) as u16);
            indices.push((next_i * stride + j) as u16);

            indices.push((i * stride + next_j) as u16);
            indices.push((next_i * stride + next_j) as u16);
            indices.push((next_i * stride + j) as u16);
        }
    }

    (vertices, indices)
}

pub(crate) struct TorusMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl TorusMesh {
    pub(crate) fn create(device: &wgpu::Device) -> Self {
        let (vertices, indices) = torus(TORUS_DIAMETER, TORUS_THICKNESS, TORUS_TESSELLATION);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("torus vertex buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("torus index buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_and_index_counts_follow_the_tessellation() {
        let (vertices, indices) = torus(1.0, 0.333, 8);
        assert_eq!(vertices.len(), 9 * 9);
        assert_eq!(indices.len(), 9 * 9 * 6);
    }

    #[test]
    fn every_index_points_at_a_vertex() {
        let (vertices, indices) = torus(1.0, 0.333, 16);
        let count = vertices.len() as u16;
        assert!(indices.iter().all(|&index| index < count));
    }

    #[test]
    fn vertices_lie_on_the_torus_shell() {
        let ring_radius = 0.5;
        let tube_radius = 0.333 / 2.0;
        let (vertices, _) = torus(1.0, 0.333, 12);
        for vertex in &vertices {
            let [x, y, z] = vertex.position;
            let ring_distance = (x * x + z * z).sqrt() - ring_radius;
            let shell = (ring_distance * ring_distance + y * y).sqrt();
            assert!(
                (shell - tube_radius).abs() < 1e-5,
                "vertex {:?} is off the shell",
                vertex.position
            );
        }
    }

    #[test]
    fn normals_are_unit_length() {
        let (vertices, _) = torus(1.0, 0.333, 12);
        for vertex in &vertices {
            let [x, y, z] = vertex.normal;
            let length = (x * x + y * y + z * z).sqrt();
            assert!((length - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn default_tessellation_fits_sixteen_bit_indices() {
        let (vertices, _) = torus(TORUS_DIAMETER, TORUS_THICKNESS, TORUS_TESSELLATION);
        assert!(vertices.len() <= usize::from(u16::MAX));
    }
}
