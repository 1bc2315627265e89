//! The pose type used for bodies, shapes, and compound offsets.

use serde::{Deserialize, Serialize};

use super::{Mat3, Quat, Vec3};

/// A rigid pose: an origin point plus an orientation, with the orientation's
/// 3x3 rotation matrix cached alongside the quaternion so hot paths (narrow
/// phase, solver) never recompute trig from the quaternion components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3d {
    /// Origin of this frame, expressed in the parent frame.
    pub position: Vec3,
    /// Orientation of this frame relative to the parent frame.
    pub orientation: Quat,
    /// Cached `orientation.to_rotation_matrix()`, recomputed only when
    /// `orientation` changes.
    #[serde(skip)]
    rotation: Mat3,
}

impl Transform3d {
    /// Identity transform: origin at zero, no rotation.
    pub fn identity() -> Self {
        Self {
            position: Vec3::zeros(),
            orientation: Quat::identity(),
            rotation: Mat3::identity(),
        }
    }

    /// Builds a transform from a position and orientation, caching the
    /// rotation matrix.
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        let rotation = *orientation.to_rotation_matrix().matrix();
        Self {
            position,
            orientation,
            rotation,
        }
    }

    /// Sets the orientation and refreshes the cached rotation matrix.
    pub fn set_orientation(&mut self, orientation: Quat) {
        self.rotation = *orientation.to_rotation_matrix().matrix();
        self.orientation = orientation;
    }

    /// The cached rotation matrix for this transform's orientation.
    pub fn rotation_matrix(&self) -> &Mat3 {
        &self.rotation
    }

    /// Transforms a point from this frame into the parent frame:
    /// `parent_point = position + rotation * local_point`.
    pub fn point_place_in(&self, local_point: Vec3) -> Vec3 {
        self.position + self.rotation * local_point
    }

    /// Transforms a direction (no translation) from this frame into the
    /// parent frame.
    pub fn direction_place_in(&self, local_direction: Vec3) -> Vec3 {
        self.rotation * local_direction
    }

    /// Transforms a point from the parent frame into this frame.
    pub fn point_relative_to(&self, parent_point: Vec3) -> Vec3 {
        self.rotation.transpose() * (parent_point - self.position)
    }

    /// Transforms a direction from the parent frame into this frame.
    pub fn direction_relative_to(&self, parent_direction: Vec3) -> Vec3 {
        self.rotation.transpose() * parent_direction
    }

    /// The inverse transform: maps parent-frame points/directions back into
    /// this frame as if this frame were the new parent.
    pub fn inverse(&self) -> Self {
        let inv_orientation = self.orientation.inverse();
        let inv_position = inv_orientation * (-self.position);
        Self::new(inv_position, inv_orientation)
    }

    /// Composes `self` with `other`, producing the transform that places
    /// `other`'s frame inside `self`'s parent frame (`self` is applied to
    /// `other`'s origin and orientation).
    ///
    /// `self.place_in(parent)` is `parent` expressed as if `self` were the
    /// new coordinate origin: equivalent to `parent.compose(self)`.
    pub fn place_in(&self, parent: &Transform3d) -> Self {
        let position = parent.point_place_in(self.position);
        let orientation = parent.orientation * self.orientation;
        Self::new(position, orientation)
    }

    /// The inverse of [`place_in`](Self::place_in): expresses `self`
    /// (currently in the same frame as `parent`) relative to `parent`.
    pub fn relative_to(&self, parent: &Transform3d) -> Self {
        let orientation = parent.orientation.inverse() * self.orientation;
        let position = parent.point_relative_to(self.position);
        Self::new(position, orientation)
    }
}

impl Default for Transform3d {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_round_trips() {
        let t = Transform3d::identity();
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_relative_eq!(t.point_place_in(p), p);
    }

    #[test]
    fn place_in_then_relative_to_is_identity() {
        let parent = Transform3d::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_axis_angle(&Vec3::z_axis(), std::f64::consts::FRAC_PI_4),
        );
        let child = Transform3d::new(
            Vec3::new(0.5, -0.5, 2.0),
            Quat::from_axis_angle(&Vec3::x_axis(), 0.3),
        );

        let placed = child.place_in(&parent);
        let recovered = placed.relative_to(&parent);

        assert_relative_eq!(recovered.position, child.position, epsilon = 1e-10);
        assert_relative_eq!(
            recovered.orientation.into_inner().coords,
            child.orientation.into_inner().coords,
            epsilon = 1e-10
        );
    }

    #[test]
    fn inverse_undoes_transform() {
        let t = Transform3d::new(
            Vec3::new(3.0, -1.0, 2.0),
            Quat::from_axis_angle(&Vec3::y_axis(), 1.2),
        );
        let p = Vec3::new(4.0, 5.0, 6.0);
        let world = t.point_place_in(p);
        let back = t.inverse().point_place_in(world);
        assert_relative_eq!(back, p, epsilon = 1e-9);
    }

    #[test]
    fn rotation_matrix_matches_quaternion() {
        let q = Quat::from_axis_angle(&Vec3::z_axis(), 0.77);
        let t = Transform3d::new(Vec3::zeros(), q);
        let v = Vec3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(t.rotation_matrix() * v, q * v, epsilon = 1e-12);
    }
}
