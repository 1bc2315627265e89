//! Math primitives shared by every module: vectors, matrices, quaternions,
//! and the [`Transform3d`] pose type built from them.
//!
//! Vectors, matrices and quaternions are not reinvented here — they are thin
//! aliases over `nalgebra` types, which already give us exact-unit-norm
//! quaternions ([`UnitQuaternion`](nalgebra::UnitQuaternion)) and checked
//! matrix inversion for free.

mod transform;

pub use transform::Transform3d;

/// Three dimensional vector: positions, velocities, normals, forces.
pub type Vec3 = nalgebra::Vector3<f64>;

/// A 3x3 matrix: inertia tensors, cached rotation matrices.
pub type Mat3 = nalgebra::Matrix3<f64>;

/// A unit quaternion representing an orientation.
pub type Quat = nalgebra::UnitQuaternion<f64>;

/// Precision epsilon used throughout collision and constraint code for
/// degenerate-direction and denominator checks.
pub const EPSILON: f64 = 1e-6;

/// Builds an orthonormal tangent basis `(t1, t2)` perpendicular to a unit
/// normal, using the standard Frisvad-style branch to avoid the near-parallel
/// singularity of a naive `cross(n, x_axis)`.
pub fn tangent_basis(n: Vec3) -> (Vec3, Vec3) {
    let t1 = if n.x.abs() < 0.9 {
        Vec3::x().cross(&n)
    } else {
        Vec3::y().cross(&n)
    };
    let t1 = t1.normalize();
    let t2 = n.cross(&t1).normalize();
    (t1, t2)
}
