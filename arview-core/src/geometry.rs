/// Geometry primitives shared by model templates, the reticle and the renderers
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            normal: Vector3::new(nx, ny, nz),
        }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Face normal from the winding order; zero for degenerate faces
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let normal = (v1 - v0).cross(&(v2 - v0));
        normal.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros)
    }
}

/// Axis-aligned bounds of a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Bounds {
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }
}

/// A triangle soup. Templates, the reticle and the placeholder model all use it.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.triangles.len() * 3
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let mut vertices = self.triangles.iter().flat_map(|t| t.vertices.iter());
        let first = vertices.next()?.position;
        let (min, max) = vertices.fold((first, first), |(min, max), v| {
            (
                Point3::from(min.coords.inf(&v.position.coords)),
                Point3::from(max.coords.sup(&v.position.coords)),
            )
        });
        Some(Bounds { min, max })
    }

    /// Apply an affine transform to every position; normals use the inverse transpose.
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Self {
        let linear: Matrix3<f32> = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = linear
            .try_inverse()
            .map(|m| m.transpose())
            .unwrap_or(linear);

        let transform_vertex = |v: &Vertex| Vertex {
            position: matrix.transform_point(&v.position),
            normal: (normal_matrix * v.normal)
                .try_normalize(f32::EPSILON)
                .unwrap_or(v.normal),
        };

        Self {
            triangles: self
                .triangles
                .iter()
                .map(|t| {
                    Triangle::new(
                        transform_vertex(&t.vertices[0]),
                        transform_vertex(&t.vertices[1]),
                        transform_vertex(&t.vertices[2]),
                    )
                })
                .collect(),
        }
    }

    /// Uniformly scaled copy
    pub fn scaled(&self, factor: f32) -> Self {
        self.transformed(&Matrix4::new_scaling(factor))
    }

    /// Flattened xyz positions, three vertices per triangle
    pub fn positions(&self) -> Vec<f32> {
        self.triangles
            .iter()
            .flat_map(|t| t.vertices.iter())
            .flat_map(|v| [v.position.x, v.position.y, v.position.z])
            .collect()
    }

    /// Flattened xyz normals, matching `positions`
    pub fn normals(&self) -> Vec<f32> {
        self.triangles
            .iter()
            .flat_map(|t| t.vertices.iter())
            .flat_map(|v| [v.normal.x, v.normal.y, v.normal.z])
            .collect()
    }

    /// Flat ring in the XZ plane facing +Y, used as the hit-test reticle
    pub fn ring(inner_radius: f32, outer_radius: f32, segments: usize) -> Self {
        let segments = segments.max(3);
        let mut mesh = Self::with_capacity(segments * 2);
        let step = std::f32::consts::TAU / segments as f32;

        for i in 0..segments {
            let (s0, c0) = (i as f32 * step).sin_cos();
            let (s1, c1) = ((i + 1) as f32 * step).sin_cos();

            let inner0 = Vertex::new(inner_radius * c0, 0.0, inner_radius * s0, 0.0, 1.0, 0.0);
            let outer0 = Vertex::new(outer_radius * c0, 0.0, outer_radius * s0, 0.0, 1.0, 0.0);
            let inner1 = Vertex::new(inner_radius * c1, 0.0, inner_radius * s1, 0.0, 1.0, 0.0);
            let outer1 = Vertex::new(outer_radius * c1, 0.0, outer_radius * s1, 0.0, 1.0, 0.0);

            // Counter-clockwise seen from above
            mesh.add_triangle(Triangle::new(inner0, outer1, outer0));
            mesh.add_triangle(Triangle::new(inner0, inner1, outer1));
        }

        mesh
    }

    /// Axis-aligned cube centred on the origin
    pub fn cube(size: f32) -> Self {
        let half = size / 2.0;
        let mut mesh = Self::with_capacity(12);

        // (normal, four corners counter-clockwise seen from outside)
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, 0.0, 1.0], [[-half, -half, half], [half, -half, half], [half, half, half], [-half, half, half]]),
            ([0.0, 0.0, -1.0], [[half, -half, -half], [-half, -half, -half], [-half, half, -half], [half, half, -half]]),
            ([0.0, 1.0, 0.0], [[-half, half, half], [half, half, half], [half, half, -half], [-half, half, -half]]),
            ([0.0, -1.0, 0.0], [[-half, -half, -half], [half, -half, -half], [half, -half, half], [-half, -half, half]]),
            ([1.0, 0.0, 0.0], [[half, -half, half], [half, -half, -half], [half, half, -half], [half, half, half]]),
            ([-1.0, 0.0, 0.0], [[-half, -half, -half], [-half, -half, half], [-half, half, half], [-half, half, -half]]),
        ];

        for ([nx, ny, nz], corners) in faces {
            let v = corners.map(|[x, y, z]| Vertex::new(x, y, z, nx, ny, nz));
            mesh.add_triangle(Triangle::new(v[0], v[1], v[2]));
            mesh.add_triangle(Triangle::new(v[0], v[2], v[3]));
        }

        mesh
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cube_faces_point_outwards() {
        let cube = Mesh::cube(2.0);
        assert_eq!(cube.triangles.len(), 12);
        for triangle in &cube.triangles {
            let declared = triangle.vertices[0].normal;
            assert_relative_eq!(triangle.calculate_normal(), declared, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_ring_lies_flat() {
        let ring = Mesh::ring(0.15, 0.2, 32);
        assert_eq!(ring.triangles.len(), 64);
        let bounds = ring.bounds().unwrap();
        assert_relative_eq!(bounds.size().y, 0.0);
        assert_relative_eq!(bounds.max.x, 0.2, epsilon = 1e-6);
        for triangle in &ring.triangles {
            assert!(triangle.calculate_normal().y > 0.99);
        }
    }

    #[test]
    fn test_scaled_shrinks_bounds() {
        let half = Mesh::cube(1.0).scaled(0.5);
        let size = half.bounds().unwrap().size();
        assert_relative_eq!(size, Vector3::new(0.5, 0.5, 0.5), epsilon = 1e-6);
    }

    #[test]
    fn test_flattened_buffers_match() {
        let cube = Mesh::cube(1.0);
        assert_eq!(cube.positions().len(), cube.vertex_count() * 3);
        assert_eq!(cube.normals().len(), cube.positions().len());
    }

    #[test]
    fn test_empty_mesh_has_no_bounds() {
        assert!(Mesh::new().bounds().is_none());
        assert!(Mesh::default().is_empty());
    }
}
