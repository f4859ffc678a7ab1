//! Triangle mesh geometry.
//!
//! Meshes are stored indexed, with optional per-vertex normals and UVs.
//! The tracer never walks mesh data itself: it only asks for the attributes
//! of one primitive at the barycentric position a ray-cast engine reported.

use re_math::{Aabb, Vec2, Vec3};

/// A mesh consisting of vertex positions, optional normals and UVs, and
/// triangle indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional - call `ensure_normals` before tracing)
    pub normals: Option<Vec<Vec3>>,

    /// UV coordinates (optional - one [u, v] per vertex)
    pub uvs: Option<Vec<[f32; 2]>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Index into the owning scene's material table
    pub material_id: usize,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        Self::new_with_uvs(positions, indices, normals, None)
    }

    /// Create a new mesh with UV coordinates.
    pub fn new_with_uvs(
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        normals: Option<Vec<Vec3>>,
        uvs: Option<Vec<[f32; 2]>>,
    ) -> Self {
        let bounds = Self::compute_bounds(&positions);
        Self {
            positions,
            normals,
            uvs,
            indices,
            material_id: 0,
            bounds,
        }
    }

    /// Assign the material used by every triangle of this mesh.
    pub fn with_material(mut self, material_id: usize) -> Self {
        self.material_id = material_id;
        self
    }

    /// Unit square in the XZ plane facing +Y, scaled by `half_extent`.
    ///
    /// UVs span [0, 1] over the square.
    pub fn plane(half_extent: f32) -> Self {
        let h = half_extent;
        let positions = vec![
            Vec3::new(-h, 0.0, -h),
            Vec3::new(-h, 0.0, h),
            Vec3::new(h, 0.0, h),
            Vec3::new(h, 0.0, -h),
        ];
        let normals = vec![Vec3::Y; 4];
        let uvs = vec![[0.0, 1.0], [0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];
        Self::new_with_uvs(positions, vec![0, 1, 2, 0, 2, 3], Some(normals), Some(uvs))
    }

    /// Axis-aligned cube centred on the origin with flat per-face normals.
    pub fn cube(half_extent: f32) -> Self {
        let h = half_extent;
        // (normal, tangent u, tangent v) per face, counter-clockwise seen from outside
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, tu, tv) in faces {
            let base = positions.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                positions.push((normal + tu * su + tv * sv) * h);
                normals.push(normal);
                uvs.push([(su + 1.0) * 0.5, (sv + 1.0) * 0.5]);
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::new_with_uvs(positions, indices, Some(normals), Some(uvs))
    }

    /// Compute axis-aligned bounding box from positions.
    fn compute_bounds(positions: &[Vec3]) -> Aabb {
        positions
            .iter()
            .fold(Aabb::EMPTY, |acc, p| Aabb::surrounding(&acc, &Aabb::from_points(*p, *p)))
    }

    /// Compute smooth vertex normals by averaging face normals.
    ///
    /// Faces are counter-clockwise when seen from the side the normal
    /// points to.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let p0 = self.positions[i0];
            let face_normal = (self.positions[i1] - p0).cross(self.positions[i2] - p0);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }

        self.normals = Some(normals);
    }

    /// Ensure the mesh has one normal per vertex, computing them if necessary.
    pub fn ensure_normals(&mut self) {
        let vertex_count = self.positions.len();
        match &self.normals {
            Some(normals) if normals.len() == vertex_count => {}
            Some(normals) => {
                log::debug!(
                    "Normals array length ({}) doesn't match vertex count ({}), computing smooth normals",
                    normals.len(),
                    vertex_count
                );
                self.compute_normals();
            }
            None => self.compute_normals(),
        }
    }

    /// Vertex indices of triangle `primitive`.
    #[inline]
    fn triangle_indices(&self, primitive: u32) -> [usize; 3] {
        let base = primitive as usize * 3;
        [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ]
    }

    /// Object-space corners of triangle `primitive`.
    pub fn triangle(&self, primitive: u32) -> [Vec3; 3] {
        let [i0, i1, i2] = self.triangle_indices(primitive);
        [self.positions[i0], self.positions[i1], self.positions[i2]]
    }

    /// Object-space normal interpolated at barycentric `(u, v)`.
    ///
    /// Barycentrics follow the `(1-u-v)·v0 + u·v1 + v·v2` convention. The
    /// result is not normalized. Meshes without normals fall back to the
    /// geometric face normal.
    pub fn normal_at(&self, primitive: u32, u: f32, v: f32) -> Vec3 {
        let [i0, i1, i2] = self.triangle_indices(primitive);
        match &self.normals {
            Some(n) => n[i0] * (1.0 - u - v) + n[i1] * u + n[i2] * v,
            None => {
                let [p0, p1, p2] = self.triangle(primitive);
                (p1 - p0).cross(p2 - p0)
            }
        }
    }

    /// Texture coordinate interpolated at barycentric `(u, v)`.
    ///
    /// Meshes without UVs map every point to (0, 0).
    pub fn tex_coord_at(&self, primitive: u32, u: f32, v: f32) -> Vec2 {
        let Some(uvs) = &self.uvs else {
            return Vec2::ZERO;
        };
        let [i0, i1, i2] = self.triangle_indices(primitive);
        Vec2::from(uvs[i0]) * (1.0 - u - v) + Vec2::from(uvs[i1]) * u + Vec2::from(uvs[i2]) * v
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_triangle() -> Mesh {
        Mesh::new_with_uvs(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![0, 1, 2],
            Some(vec![Vec3::Z, Vec3::X, Vec3::Y]),
            Some(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
        )
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = single_triangle();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.material_id, 0);
        assert_eq!(mesh.bounds.centroid().z, 0.0);
    }

    #[test]
    fn test_barycentric_corners() {
        let mesh = single_triangle();

        assert_eq!(mesh.normal_at(0, 0.0, 0.0), Vec3::Z);
        assert_eq!(mesh.normal_at(0, 1.0, 0.0), Vec3::X);
        assert_eq!(mesh.normal_at(0, 0.0, 1.0), Vec3::Y);

        assert_eq!(mesh.tex_coord_at(0, 1.0, 0.0), Vec2::new(1.0, 0.0));
        assert_eq!(mesh.tex_coord_at(0, 0.0, 1.0), Vec2::new(0.0, 1.0));
    }

    #[test]
    fn test_barycentric_interior() {
        let mesh = single_triangle();
        let uv = mesh.tex_coord_at(0, 0.25, 0.5);

        assert!((uv - Vec2::new(0.25, 0.5)).length() < 1e-6);
    }

    #[test]
    fn test_missing_attributes_fall_back() {
        let mesh = Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2], None);

        // Counter-clockwise in XY plane faces +Z
        assert!(mesh.normal_at(0, 0.3, 0.3).normalize().abs_diff_eq(Vec3::Z, 1e-6));
        assert_eq!(mesh.tex_coord_at(0, 0.3, 0.3), Vec2::ZERO);
    }

    #[test]
    fn test_compute_normals_ccw() {
        let mut mesh = Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2], None);
        mesh.ensure_normals();

        let normals = mesh.normals.as_ref().unwrap();
        for normal in normals {
            assert!((normal.z - 1.0).abs() < 0.001);
        }
    }

    #[test]
    fn test_plane_faces_up() {
        let plane = Mesh::plane(2.0);

        assert_eq!(plane.triangle_count(), 2);
        for prim in 0..2 {
            let [p0, p1, p2] = plane.triangle(prim);
            let geometric = (p1 - p0).cross(p2 - p0).normalize();
            assert!(geometric.abs_diff_eq(Vec3::Y, 1e-6));
        }
    }

    #[test]
    fn test_cube_winding_matches_normals() {
        let cube = Mesh::cube(1.0);

        assert_eq!(cube.triangle_count(), 12);
        assert_eq!(cube.vertex_count(), 24);
        for prim in 0..12 {
            let [p0, p1, p2] = cube.triangle(prim);
            let geometric = (p1 - p0).cross(p2 - p0).normalize();
            let shading = cube.normal_at(prim, 0.2, 0.2);
            assert!(geometric.abs_diff_eq(shading, 1e-5), "face {prim}");
        }
        assert!((cube.bounds.max - Vec3::ONE).length() < 1e-3);
    }
}
