//! Shape variants attached to bodies, and the convex polyhedron they share.

mod convex;

pub use convex::Convex;

use crate::math::{Transform3d, Vec3};

/// A single collidable surface attached to a body, in the body's own
/// coordinates (or compound-shape-local coordinates via `local_transform`).
#[derive(Debug, Clone)]
pub struct Shape {
    pub kind: ShapeKind,
    /// Pose of this shape relative to the body it belongs to. Identity for
    /// single-shape bodies; non-identity for compound bodies.
    pub local_transform: Transform3d,
}

/// The geometric variant a [`Shape`] carries.
#[derive(Debug, Clone)]
pub enum ShapeKind {
    /// An infinite half-space with outward unit normal `+z` in the shape's
    /// own local frame. Does not collide with other planes, and cannot be
    /// part of a dynamic body.
    Plane,
    /// A convex polyhedron: block, cylinder, or user-supplied hull.
    Convex(Convex),
    /// A sphere of the given radius, centered at the shape's local origin.
    Sphere(f64),
    /// A zero-size point. Particles never collide with other particles.
    Particle,
}

impl Shape {
    pub fn plane() -> Self {
        Self {
            kind: ShapeKind::Plane,
            local_transform: Transform3d::identity(),
        }
    }

    pub fn sphere(radius: f64) -> Self {
        Self {
            kind: ShapeKind::Sphere(radius.max(0.0)),
            local_transform: Transform3d::identity(),
        }
    }

    pub fn block(half_extents: Vec3) -> Self {
        Self {
            kind: ShapeKind::Convex(Convex::block(half_extents)),
            local_transform: Transform3d::identity(),
        }
    }

    pub fn cylinder(radius: f64, half_height: f64) -> Self {
        Self {
            kind: ShapeKind::Convex(Convex::cylinder(radius, half_height, 16)),
            local_transform: Transform3d::identity(),
        }
    }

    /// Builds a shape from a user-supplied convex hull. Its inertia is only
    /// an AABB approximation — use [`Self::cylinder`]/[`Self::block`]
    /// when the closed form is available.
    pub fn unsafe_convex(convex: Convex) -> Self {
        Self {
            kind: ShapeKind::Convex(convex),
            local_transform: Transform3d::identity(),
        }
    }

    pub fn particle() -> Self {
        Self {
            kind: ShapeKind::Particle,
            local_transform: Transform3d::identity(),
        }
    }

    pub fn with_local_transform(mut self, transform: Transform3d) -> Self {
        self.local_transform = transform;
        self
    }

    /// The shape's own local-frame volume, or `0.0` for planes/particles
    /// (they contribute no mass or inertia).
    pub fn volume(&self) -> f64 {
        match &self.kind {
            ShapeKind::Convex(c) => c.volume,
            ShapeKind::Sphere(r) => (4.0 / 3.0) * std::f64::consts::PI * r.powi(3),
            ShapeKind::Plane | ShapeKind::Particle => 0.0,
        }
    }

    /// The shape's own local-frame centroid (relative to `local_transform`'s
    /// origin, before composing with it).
    pub fn local_centroid(&self) -> Vec3 {
        match &self.kind {
            ShapeKind::Convex(c) => c.centroid,
            ShapeKind::Sphere(_) | ShapeKind::Plane | ShapeKind::Particle => Vec3::zeros(),
        }
    }

    /// Inertia tensor about the shape's own centroid, for unit mass.
    pub fn unit_mass_inertia(&self) -> crate::math::Mat3 {
        match &self.kind {
            ShapeKind::Convex(c) => c.unit_mass_inertia,
            ShapeKind::Sphere(r) => {
                let i = 0.4 * r * r;
                crate::math::Mat3::from_diagonal(&Vec3::new(i, i, i))
            }
            ShapeKind::Plane | ShapeKind::Particle => crate::math::Mat3::zeros(),
        }
    }

    pub fn is_plane(&self) -> bool {
        matches!(self.kind, ShapeKind::Plane)
    }

    pub fn is_particle(&self) -> bool {
        matches!(self.kind, ShapeKind::Particle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_has_zero_volume_and_inertia() {
        let plane = Shape::plane();
        assert_eq!(plane.volume(), 0.0);
        assert_eq!(plane.unit_mass_inertia(), crate::math::Mat3::zeros());
    }

    #[test]
    fn sphere_volume_matches_closed_form() {
        let sphere = Shape::sphere(2.0);
        let expected = (4.0 / 3.0) * std::f64::consts::PI * 8.0;
        assert!((sphere.volume() - expected).abs() < 1e-9);
    }
}
