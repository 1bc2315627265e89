//! Convex polyhedron representation and builders (block, cylinder, hull).

use serde::{Deserialize, Serialize};

use crate::math::{Mat3, Vec3, EPSILON};

/// An immutable convex polyhedron: vertices, faces, face normals, and a
/// deduplicated set of unique edge directions, used directly by the SAT
/// narrow phase and precomputed for the body's mass-property
/// derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Convex {
    /// Ordered vertex positions, in the shape's own local frame.
    pub vertices: Vec<Vec3>,
    /// Faces as CCW (seen from outside) vertex-index lists.
    pub faces: Vec<Vec<usize>>,
    /// Outward unit normal for each face, parallel to `faces`.
    pub face_normals: Vec<Vec3>,
    /// Deduplicated unique edge direction vectors (unit length), used as SAT
    /// candidate axes via `edge_a x edge_b`.
    pub unique_edges: Vec<Vec3>,
    /// Volume of the hull, computed by tetrahedral decomposition about the
    /// local origin (divergence theorem — correct regardless of whether the
    /// origin lies inside the hull).
    pub volume: f64,
    /// Centroid of the hull, in the shape's own local frame.
    pub centroid: Vec3,
    /// Inertia tensor about `centroid`, for unit mass. Scaled by the body's
    /// mass-property derivation when building a dynamic body.
    pub unit_mass_inertia: Mat3,
}

impl Convex {
    /// Builds a convex hull from explicit geometry, deriving volume,
    /// centroid, unique edges, and an **approximate** unit-mass inertia
    /// tensor from the hull's own AABB — exact closed forms are reserved for
    /// the dedicated `block`/`cylinder` builders below.
    ///
    /// `faces` are vertex-index lists, CCW as seen from outside; `normals`
    /// are the outward unit normal per face, parallel to `faces`. Both must
    /// already be consistent — this constructor does not auto-orient them.
    pub fn unsafe_hull(vertices: Vec<Vec3>, faces: Vec<Vec<usize>>, normals: Vec<Vec3>) -> Self {
        let (volume, centroid) = tetrahedral_volume_and_centroid(&vertices, &faces);
        let unique_edges = collect_unique_edges(&vertices, &faces);
        let unit_mass_inertia = approximate_box_inertia(&vertices, centroid);

        Self {
            vertices,
            faces,
            face_normals: normals,
            unique_edges,
            volume,
            centroid,
            unit_mass_inertia,
        }
    }

    /// A rectangular block with the given half-extents, centered at the
    /// local origin. Faces are CCW, outward normals are axis-aligned, and
    /// the inertia tensor is the exact closed-form box formula (not the
    /// AABB approximation — a box's own AABB already equals its geometry).
    pub fn block(half_extents: Vec3) -> Self {
        let (hx, hy, hz) = (half_extents.x, half_extents.y, half_extents.z);
        let vertices = vec![
            Vec3::new(-hx, -hy, -hz),
            Vec3::new(hx, -hy, -hz),
            Vec3::new(hx, hy, -hz),
            Vec3::new(-hx, hy, -hz),
            Vec3::new(-hx, -hy, hz),
            Vec3::new(hx, -hy, hz),
            Vec3::new(hx, hy, hz),
            Vec3::new(-hx, hy, hz),
        ];
        let faces = vec![
            vec![0, 3, 2, 1], // -z
            vec![4, 5, 6, 7], // +z
            vec![0, 1, 5, 4], // -y
            vec![2, 3, 7, 6], // +y
            vec![0, 4, 7, 3], // -x
            vec![1, 2, 6, 5], // +x
        ];
        let face_normals = vec![
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
        ];
        let unique_edges = vec![Vec3::x(), Vec3::y(), Vec3::z()];

        let w = 2.0 * hx;
        let h = 2.0 * hy;
        let d = 2.0 * hz;
        let unit_mass_inertia = Mat3::from_diagonal(&Vec3::new(
            (h * h + d * d) / 12.0,
            (w * w + d * d) / 12.0,
            (w * w + h * h) / 12.0,
        ));

        Self {
            volume: w * h * d,
            centroid: Vec3::zeros(),
            vertices,
            faces,
            face_normals,
            unique_edges,
            unit_mass_inertia,
        }
    }

    /// A solid cylinder of the given radius and half-height, axis along
    /// local `+z`, approximated as a `segments`-sided prism for SAT
    /// purposes, but carrying the *exact* closed-form solid-cylinder inertia
    /// tensor rather than the prism's own.
    pub fn cylinder(radius: f64, half_height: f64, segments: usize) -> Self {
        let segments = segments.max(3);
        let mut vertices = Vec::with_capacity(segments * 2);
        for i in 0..segments {
            let theta = 2.0 * std::f64::consts::PI * i as f64 / segments as f64;
            let (x, y) = (radius * theta.cos(), radius * theta.sin());
            vertices.push(Vec3::new(x, y, -half_height));
        }
        for i in 0..segments {
            let theta = 2.0 * std::f64::consts::PI * i as f64 / segments as f64;
            let (x, y) = (radius * theta.cos(), radius * theta.sin());
            vertices.push(Vec3::new(x, y, half_height));
        }

        let mut faces = Vec::with_capacity(segments + 2);
        let mut face_normals = Vec::with_capacity(segments + 2);

        // Side quads.
        for i in 0..segments {
            let j = (i + 1) % segments;
            faces.push(vec![i, j, segments + j, segments + i]);
            let theta = 2.0 * std::f64::consts::PI * (i as f64 + 0.5) / segments as f64;
            face_normals.push(Vec3::new(theta.cos(), theta.sin(), 0.0));
        }

        // Bottom cap (-z), CCW seen from outside (looking up the -z axis
        // means CW in xy, so reverse the index order).
        let bottom: Vec<usize> = (0..segments).rev().collect();
        faces.push(bottom);
        face_normals.push(Vec3::new(0.0, 0.0, -1.0));

        // Top cap (+z).
        let top: Vec<usize> = (segments..2 * segments).collect();
        faces.push(top);
        face_normals.push(Vec3::new(0.0, 0.0, 1.0));

        let unique_edges = collect_unique_edges(&vertices, &faces);

        let r2 = radius * radius;
        let h2 = (2.0 * half_height) * (2.0 * half_height);
        let unit_mass_inertia = Mat3::from_diagonal(&Vec3::new(
            (3.0 * r2 + h2) / 12.0,
            (3.0 * r2 + h2) / 12.0,
            r2 / 2.0,
        ));

        Self {
            volume: std::f64::consts::PI * r2 * (2.0 * half_height),
            centroid: Vec3::zeros(),
            vertices,
            faces,
            face_normals,
            unique_edges,
            unit_mass_inertia,
        }
    }

    /// Projects the hull onto `axis`, returning `(min, max)` of
    /// `dot(axis, vertex)` over all vertices — the SAT support query.
    pub fn project(&self, axis: Vec3) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in &self.vertices {
            let d = v.dot(&axis);
            min = min.min(d);
            max = max.max(d);
        }
        (min, max)
    }
}

fn tetrahedral_volume_and_centroid(vertices: &[Vec3], faces: &[Vec<usize>]) -> (f64, Vec3) {
    let mut volume = 0.0;
    let mut weighted_centroid = Vec3::zeros();

    for face in faces {
        if face.len() < 3 {
            continue;
        }
        let p0 = vertices[face[0]];
        for i in 1..face.len() - 1 {
            let p1 = vertices[face[i]];
            let p2 = vertices[face[i + 1]];
            let tetra_volume = p0.dot(&p1.cross(&p2)) / 6.0;
            let tetra_centroid = (p0 + p1 + p2) / 4.0;
            volume += tetra_volume;
            weighted_centroid += tetra_centroid * tetra_volume;
        }
    }

    if volume.abs() < EPSILON {
        // Degenerate (zero-volume) hull: fall back to the vertex average so
        // downstream code still has a usable reference point.
        let centroid = if vertices.is_empty() {
            Vec3::zeros()
        } else {
            vertices.iter().fold(Vec3::zeros(), |acc, v| acc + v) / vertices.len() as f64
        };
        return (0.0, centroid);
    }

    (volume.abs(), weighted_centroid / volume)
}

fn approximate_box_inertia(vertices: &[Vec3], centroid: Vec3) -> Mat3 {
    if vertices.is_empty() {
        return Mat3::zeros();
    }
    let mut min = vertices[0] - centroid;
    let mut max = vertices[0] - centroid;
    for v in vertices {
        let local = v - centroid;
        min = min.zip_map(&local, f64::min);
        max = max.zip_map(&local, f64::max);
    }
    let extent = max - min;
    Mat3::from_diagonal(&Vec3::new(
        (extent.y * extent.y + extent.z * extent.z) / 12.0,
        (extent.x * extent.x + extent.z * extent.z) / 12.0,
        (extent.x * extent.x + extent.y * extent.y) / 12.0,
    ))
}

fn collect_unique_edges(vertices: &[Vec3], faces: &[Vec<usize>]) -> Vec<Vec3> {
    let mut edges: Vec<Vec3> = Vec::new();

    for face in faces {
        let n = face.len();
        for i in 0..n {
            let a = vertices[face[i]];
            let b = vertices[face[(i + 1) % n]];
            let dir = b - a;
            if dir.norm() < EPSILON {
                continue;
            }
            let mut dir = dir.normalize();
            // Canonicalize sign so antiparallel duplicates collapse.
            if dir.x < -EPSILON
                || (dir.x.abs() < EPSILON && dir.y < -EPSILON)
                || (dir.x.abs() < EPSILON && dir.y.abs() < EPSILON && dir.z < 0.0)
            {
                dir = -dir;
            }

            let is_duplicate = edges
                .iter()
                .any(|e| (e.dot(&dir)).abs() > 1.0 - EPSILON);
            if !is_duplicate {
                edges.push(dir);
            }
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn block_volume_matches_dimensions() {
        let block = Convex::block(Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(block.volume, 8.0 * 6.0, epsilon = 1e-9);
    }

    #[test]
    fn block_has_three_unique_edge_directions() {
        let block = Convex::block(Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(block.unique_edges.len(), 3);
    }

    #[test]
    fn block_face_normals_are_outward_unit_vectors() {
        let block = Convex::block(Vec3::new(1.0, 1.0, 1.0));
        for n in &block.face_normals {
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn cylinder_volume_matches_closed_form() {
        let cyl = Convex::cylinder(2.0, 1.5, 32);
        let expected = std::f64::consts::PI * 4.0 * 3.0;
        assert_relative_eq!(cyl.volume, expected, epsilon = 1e-2);
    }

    #[test]
    fn cylinder_inertia_is_closed_form_not_prism_approx() {
        let cyl = Convex::cylinder(1.0, 1.0, 16);
        assert_relative_eq!(cyl.unit_mass_inertia[(2, 2)], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn tetrahedral_decomposition_handles_degenerate_hull() {
        let degenerate = Convex::unsafe_hull(
            vec![Vec3::zeros(), Vec3::zeros(), Vec3::zeros()],
            vec![vec![0, 1, 2]],
            vec![Vec3::z()],
        );
        assert_eq!(degenerate.volume, 0.0);
    }
}
