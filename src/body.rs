//! Rigid body state: shapes, mass properties, velocity, and pose.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::math::{Mat3, Quat, Transform3d, Vec3};
use crate::shapes::Shape;

/// Stable identifier for a body inside a [`crate::world::World`]. Reused
/// after removal via the world's free list, never reused while the body it
/// names is still alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub(crate) u32);

impl BodyId {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl From<u32> for BodyId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

/// Surface properties used by the solver to combine contact response
/// between a pair of bodies (averaged).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Material {
    pub friction: f64,
    pub bounciness: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.3,
            bounciness: 0.3,
        }
    }
}

/// Whether a body participates in integration and collision response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Static,
    Dynamic(f64),
}

/// A rigid body: shapes, pose, velocity, and the mass properties derived
/// from its shapes.
///
/// `T` is arbitrary user data carried alongside the body (the renderer's
/// mesh handle, a gameplay tag, …) — the engine never reads it.
#[derive(Debug, Clone)]
pub struct Body<T = ()> {
    id: BodyId,
    pub data: T,

    shapes: Vec<Shape>,
    /// `shapes[i]`'s pose in world coordinates, kept in sync with
    /// `transform3d` and `center_of_mass_transform3d` on every pose change.
    world_shapes: Vec<Transform3d>,

    mass: f64,
    inv_mass: f64,

    velocity: Vec3,
    angular_velocity: Vec3,
    force: Vec3,
    torque: Vec3,

    linear_damping: f64,
    angular_damping: f64,
    material: Material,

    /// World pose of the center of mass.
    transform3d: Transform3d,
    /// Center of mass expressed relative to the user's original body
    /// origin — the offset every shape was re-expressed against during
    /// mass-property derivation.
    center_of_mass_transform3d: Transform3d,

    inv_inertia_body: Mat3,
    inv_inertia_world: Mat3,
}

impl<T> Body<T> {
    /// Builds a body carrying a single block shape, centered at the body's
    /// origin. Not yet part of any world — [`crate::world::World::add`]
    /// assigns its real id.
    pub fn block(half_extents: Vec3, data: T) -> Self {
        Self::new(BodyId(0), vec![Shape::block(half_extents)], data)
    }

    /// Builds a body carrying a single sphere shape.
    pub fn sphere(radius: f64, data: T) -> Self {
        Self::new(BodyId(0), vec![Shape::sphere(radius)], data)
    }

    /// Builds a body carrying a single cylinder shape (axis along local
    /// `+z`), with closed-form cylinder inertia.
    pub fn cylinder(radius: f64, half_height: f64, data: T) -> Self {
        Self::new(BodyId(0), vec![Shape::cylinder(radius, half_height)], data)
    }

    /// Builds a body carrying a single plane shape. Remains static even if
    /// `with_behavior(Dynamic(_))` is later applied.
    pub fn plane(data: T) -> Self {
        Self::new(BodyId(0), vec![Shape::plane()], data)
    }

    /// Builds a body carrying a single particle shape. Remains static even
    /// if declared dynamic.
    pub fn particle(data: T) -> Self {
        Self::new(BodyId(0), vec![Shape::particle()], data)
    }

    /// Builds a compound body from an arbitrary set of shapes, each already
    /// positioned via [`Shape::with_local_transform`].
    pub fn compound(shapes: Vec<Shape>, data: T) -> Self {
        Self::new(BodyId(0), shapes, data)
    }

    pub(crate) fn new(id: BodyId, shapes: Vec<Shape>, data: T) -> Self {
        let mut body = Self {
            id,
            data,
            shapes,
            world_shapes: Vec::new(),
            mass: 0.0,
            inv_mass: 0.0,
            velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            force: Vec3::zeros(),
            torque: Vec3::zeros(),
            linear_damping: 0.01,
            angular_damping: 0.01,
            material: Material::default(),
            transform3d: Transform3d::identity(),
            center_of_mass_transform3d: Transform3d::identity(),
            inv_inertia_body: Mat3::zeros(),
            inv_inertia_world: Mat3::zeros(),
        };
        body.rebuild_world_shapes();
        body
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    /// Assigns this body's stable id — called once by
    /// [`crate::world::World::add`] when the body is inserted.
    pub(crate) fn set_id(&mut self, id: BodyId) {
        self.id = id;
    }

    /// Applies the body's world-space inverse inertia tensor to `vector`
    /// (e.g. a torque, yielding an angular acceleration).
    pub fn transform_with_inverse_inertia(&self, vector: Vec3) -> Vec3 {
        self.inv_inertia_world * vector
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Shape poses, in world coordinates, parallel to [`Self::shapes`].
    pub fn world_shapes(&self) -> &[Transform3d] {
        &self.world_shapes
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn inv_mass(&self) -> f64 {
        self.inv_mass
    }

    pub fn is_static(&self) -> bool {
        self.mass == 0.0
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    pub fn force(&self) -> Vec3 {
        self.force
    }

    pub fn torque(&self) -> Vec3 {
        self.torque
    }

    pub fn material(&self) -> Material {
        self.material
    }

    pub fn damping(&self) -> (f64, f64) {
        (self.linear_damping, self.angular_damping)
    }

    pub fn inv_inertia_world(&self) -> Mat3 {
        self.inv_inertia_world
    }

    /// World pose of the center of mass.
    pub fn transform3d(&self) -> Transform3d {
        self.transform3d
    }

    /// The body's pose in the user's original coordinate system — the
    /// center-of-mass offset removed.
    pub fn frame(&self) -> Transform3d {
        self.center_of_mass_transform3d.inverse().place_in(&self.transform3d)
    }

    pub fn origin_point(&self) -> Vec3 {
        self.frame().position
    }

    pub fn center_of_mass(&self) -> Vec3 {
        self.transform3d.position
    }

    /// World-space velocity of the material point currently at `point`.
    pub fn velocity_at(&self, point: Vec3) -> Vec3 {
        let r = point - self.transform3d.position;
        self.velocity + self.angular_velocity.cross(&r)
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_damping(mut self, linear: f64, angular: f64) -> Self {
        self.linear_damping = linear.clamp(0.0, 1.0);
        self.angular_damping = angular.clamp(0.0, 1.0);
        self
    }

    pub fn with_data(mut self, data: T) -> Self {
        self.data = data;
        self
    }

    /// Declares the body's behavior. A plane-only or shape-less body
    /// declared `Dynamic` is a no-op — it remains static.
    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        match behavior {
            Behavior::Static => self.set_static(),
            Behavior::Dynamic(mass) => self.set_dynamic(mass),
        }
        self
    }

    fn set_static(&mut self) {
        self.mass = 0.0;
        self.inv_mass = 0.0;
        self.inv_inertia_body = Mat3::zeros();
        self.inv_inertia_world = Mat3::zeros();
    }

    fn set_dynamic(&mut self, mass: f64) {
        if !mass.is_finite() || mass <= 0.0 {
            trace!(body = self.id.0, mass, "non-finite or non-positive mass, treating as static");
            self.set_static();
            return;
        }
        if self.shapes.is_empty() || self.shapes.iter().all(|s| s.is_plane() || s.is_particle()) {
            trace!(body = self.id.0, "dynamic behavior requested on a plane/particle-only body, ignored");
            self.set_static();
            return;
        }

        let derived = derive_mass_properties(&self.shapes, mass);
        match derived.inv_inertia_body() {
            Some(inv_inertia_body) => {
                // Preserve the body's current user-facing origin/orientation
                // across the COM offset changing.
                let origin_frame = self.frame();
                self.mass = mass;
                self.inv_mass = 1.0 / mass;
                self.center_of_mass_transform3d = Transform3d::new(derived.center_of_mass, Quat::identity());
                self.inv_inertia_body = inv_inertia_body;
                self.set_origin(origin_frame.position, origin_frame.orientation);
            }
            None => {
                trace!(body = self.id.0, "singular inertia tensor, treating as static");
                self.set_static();
            }
        }
    }

    pub fn move_to(mut self, position: Vec3) -> Self {
        let orientation = self.frame().orientation;
        self.set_origin(position, orientation);
        self
    }

    pub fn rotate_around(mut self, orientation: Quat) -> Self {
        let origin = self.origin_point();
        self.set_origin(origin, orientation);
        self
    }

    pub fn translate_by(mut self, delta: Vec3) -> Self {
        let origin = self.origin_point() + delta;
        let orientation = self.frame().orientation;
        self.set_origin(origin, orientation);
        self
    }

    fn set_origin(&mut self, origin: Vec3, orientation: Quat) {
        let user_frame = Transform3d::new(origin, orientation);
        self.transform3d = self.center_of_mass_transform3d.place_in(&user_frame);
        self.recompute_world_inertia();
        self.rebuild_world_shapes();
    }

    /// Accumulates a force applied at the center of mass, consumed on the
    /// next integration step.
    pub fn apply_force(&mut self, force: Vec3) {
        if self.is_static() {
            return;
        }
        self.force += force;
    }

    /// Accumulates a force applied at a world-space point, consumed on the
    /// next integration step.
    pub fn apply_force_at(&mut self, force: Vec3, point: Vec3) {
        if self.is_static() {
            return;
        }
        self.force += force;
        let r = point - self.transform3d.position;
        self.torque += r.cross(&force);
    }

    /// Immediately changes velocity/angular velocity by an impulse applied
    /// at a world-space point.
    pub fn apply_impulse(&mut self, impulse: Vec3, point: Vec3) {
        if self.is_static() {
            return;
        }
        self.velocity += impulse * self.inv_mass;
        let r = point - self.transform3d.position;
        self.angular_velocity += self.inv_inertia_world * r.cross(&impulse);
    }

    pub(crate) fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    pub(crate) fn set_angular_velocity(&mut self, angular_velocity: Vec3) {
        self.angular_velocity = angular_velocity;
    }

    pub(crate) fn clear_forces(&mut self) {
        self.force = Vec3::zeros();
        self.torque = Vec3::zeros();
    }

    /// Applies this step's accumulated force/torque to velocity/ω (the
    /// explicit half of semi-implicit Euler, run after the constraint
    /// solve has already adjusted velocities).
    pub(crate) fn integrate_forces(&mut self, dt: f64) {
        if self.is_static() {
            return;
        }
        self.velocity += self.force * (self.inv_mass * dt);
        self.angular_velocity += self.inv_inertia_world * (self.torque * dt);
    }

    /// Exponential velocity decay, normalised so `linear_damping`/
    /// `angular_damping` read as a per-second fraction.
    pub(crate) fn apply_damping(&mut self, dt: f64) {
        if self.is_static() {
            return;
        }
        let steps = dt * 60.0;
        self.velocity *= (1.0 - self.linear_damping).powf(steps);
        self.angular_velocity *= (1.0 - self.angular_damping).powf(steps);
    }

    /// Integrates pose by one semi-implicit Euler step and refreshes
    /// derived world-space state. Velocity/ω are assumed already updated by
    /// the solver, force integration, and damping passes.
    pub(crate) fn integrate_pose(&mut self, dt: f64) {
        if self.is_static() {
            return;
        }
        self.transform3d.position += self.velocity * dt;

        let omega = self.angular_velocity;
        let q = self.transform3d.orientation.into_inner();
        let omega_quat = nalgebra::Quaternion::new(0.0, omega.x, omega.y, omega.z);
        // `angular_velocity` is world-frame everywhere else (world-frame
        // inverse inertia, `velocity_at`'s `ω × r`), so the quaternion
        // derivative is the world-frame form `0.5 * ω_quat * q`, not `q *
        // ω_quat`.
        let dq = (omega_quat * q) * 0.5;
        let new_quat = nalgebra::Quaternion::new(
            q.w + dq.w * dt,
            q.i + dq.i * dt,
            q.j + dq.j * dt,
            q.k + dq.k * dt,
        );
        self.transform3d
            .set_orientation(Quat::from_quaternion(new_quat));

        self.recompute_world_inertia();
        self.rebuild_world_shapes();
    }

    fn recompute_world_inertia(&mut self) {
        if self.is_static() {
            self.inv_inertia_world = Mat3::zeros();
            return;
        }
        let r = *self.transform3d.rotation_matrix();
        self.inv_inertia_world = r * self.inv_inertia_body * r.transpose();
    }

    fn rebuild_world_shapes(&mut self) {
        // Shapes are stored in the user's original body-local coordinates,
        // not COM-relative, so they compose with the user-origin frame
        // rather than `transform3d` (which poses the center of mass).
        let origin_frame = self.frame();
        self.world_shapes = self
            .shapes
            .iter()
            .map(|s| s.local_transform.place_in(&origin_frame))
            .collect();
    }
}

/// The result of [`derive_mass_properties`]: a candidate center of mass and
/// combined inertia tensor, not yet inverted.
struct MassProperties {
    center_of_mass: Vec3,
    inertia: Mat3,
}

impl MassProperties {
    fn inv_inertia_body(&self) -> Option<Mat3> {
        self.inertia.try_inverse()
    }
}

/// Volume-weighted center of mass and parallel-axis-summed inertia tensor
/// for a set of shapes, each contributing `shape.volume() / total_volume *
/// mass` (the mass-property derivation).
fn derive_mass_properties(shapes: &[Shape], mass: f64) -> MassProperties {
    let total_volume: f64 = shapes.iter().map(Shape::volume).sum();

    if total_volume <= 0.0 {
        // No shape contributes volume (e.g. a body made only of spheres of
        // radius 0) — fall back to an even split with no offset, matching
        // the "degenerate geometry contributes no inertia" rule while
        // still producing an invertible (identity-scaled) tensor.
        return MassProperties {
            center_of_mass: Vec3::zeros(),
            inertia: Mat3::identity() * mass,
        };
    }

    let center_of_mass = shapes
        .iter()
        .map(|s| {
            let world_centroid = s.local_transform.point_place_in(s.local_centroid());
            world_centroid * s.volume()
        })
        .fold(Vec3::zeros(), |acc, v| acc + v)
        / total_volume;

    let inertia = shapes.iter().fold(Mat3::zeros(), |acc, s| {
        let shape_mass = mass * (s.volume() / total_volume);
        if shape_mass <= 0.0 {
            return acc;
        }
        let shape_centroid_world = s.local_transform.point_place_in(s.local_centroid());
        let offset = shape_centroid_world - center_of_mass;
        let local_inertia = s.unit_mass_inertia() * shape_mass;
        acc + local_inertia + parallel_axis_shift(shape_mass, offset)
    });

    MassProperties {
        center_of_mass,
        inertia,
    }
}

/// `I_shifted = I + m * (|r|^2 * Id - r r^T)`, the parallel axis theorem for
/// a point mass offset by `r` from the reference axis.
fn parallel_axis_shift(mass: f64, r: Vec3) -> Mat3 {
    let r2 = r.norm_squared();
    let outer = r * r.transpose();
    Mat3::identity() * (mass * r2) - outer * mass
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_body(shapes: Vec<Shape>) -> Body<()> {
        Body::new(BodyId(0), shapes, ())
    }

    #[test]
    fn static_body_has_zero_inverse_mass_and_inertia() {
        let body = test_body(vec![Shape::sphere(1.0)]);
        assert_eq!(body.inv_mass(), 0.0);
        assert_eq!(body.inv_inertia_world(), Mat3::zeros());
    }

    #[test]
    fn dynamic_sphere_matches_closed_form_inertia() {
        let body = test_body(vec![Shape::sphere(2.0)]).with_behavior(Behavior::Dynamic(5.0));
        assert_relative_eq!(body.mass(), 5.0);
        let expected = 1.0 / (0.4 * 5.0 * 4.0);
        assert_relative_eq!(body.inv_inertia_world()[(0, 0)], expected, epsilon = 1e-9);
    }

    #[test]
    fn plane_only_body_cannot_become_dynamic() {
        let body = test_body(vec![Shape::plane()]).with_behavior(Behavior::Dynamic(10.0));
        assert!(body.is_static());
    }

    #[test]
    fn non_finite_mass_is_treated_as_static() {
        let body = test_body(vec![Shape::sphere(1.0)]).with_behavior(Behavior::Dynamic(f64::NAN));
        assert!(body.is_static());
    }

    #[test]
    fn apply_impulse_on_static_body_is_noop() {
        let mut body = test_body(vec![Shape::sphere(1.0)]);
        body.apply_impulse(Vec3::new(10.0, 0.0, 0.0), Vec3::zeros());
        assert_eq!(body.velocity(), Vec3::zeros());
    }

    #[test]
    fn apply_impulse_changes_velocity_by_impulse_over_mass() {
        let mut body = test_body(vec![Shape::sphere(1.0)]).with_behavior(Behavior::Dynamic(2.0));
        body.apply_impulse(Vec3::new(10.0, 0.0, 0.0), body.center_of_mass());
        assert_relative_eq!(body.velocity().x, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn velocity_at_includes_angular_contribution() {
        let mut body = test_body(vec![Shape::sphere(1.0)]).with_behavior(Behavior::Dynamic(1.0));
        body.set_angular_velocity(Vec3::new(0.0, 0.0, 1.0));
        let point = body.center_of_mass() + Vec3::new(1.0, 0.0, 0.0);
        let v = body.velocity_at(point);
        assert_relative_eq!(v, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }
}
