//! An impulse-based 3D rigid body physics engine: broad and narrow phase
//! collision detection, a Sequential Impulses (SPOOK) constraint solver for
//! contacts/friction/joints, and a semi-implicit Euler integrator.
//!
//! Modelled on the formulation used by Cannon.js and Bullet. Continuous
//! collision detection, deformable bodies, and GJK/EPA convex overlap are
//! explicitly out of scope — convex-convex uses the Separating Axis
//! Theorem only, and contacts never warm-start across steps.
//!
//! # Example
//!
//! ```
//! use rigid3d::prelude::*;
//!
//! let mut world: World<()> = World::empty().with_gravity(9.81, Vec3::new(0.0, 0.0, -1.0));
//!
//! world.add(Body::plane(()));
//! world.add(
//!     Body::sphere(0.5, ())
//!         .with_behavior(Behavior::Dynamic(1.0))
//!         .move_to(Vec3::new(0.0, 0.0, 5.0)),
//! );
//!
//! for _ in 0..60 {
//!     world.simulate(1.0 / 60.0);
//! }
//! ```
//!
//! # Pipeline
//!
//! Per [`World::simulate`]: broad phase ([`collision::broad_phase`]) finds
//! AABB-overlapping body pairs; narrow phase
//! ([`collision::narrow_phase`]) turns each pair into a [`collision::ContactGroup`];
//! [`constraint::Constraint`]s declared on the world are lowered into
//! [`solver::equation::SpookEquation`] rows alongside the contact
//! equations; [`solver`] runs Sequential Impulses to convergence; and
//! [`integrator`] applies gravity, damping, and semi-implicit Euler
//! integration in the fixed order the engine specifies.

#![warn(missing_docs)]
#![allow(clippy::too_many_arguments)]

pub mod body;
pub mod collision;
pub mod config;
pub mod constraint;
pub mod error;
pub mod integrator;
pub mod math;
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod raycast;
pub mod shapes;
pub mod solver;
pub mod world;

/// Convenient imports for building and stepping a [`world::World`].
pub mod prelude {
    pub use crate::body::{Behavior, Body, BodyId, Material};
    pub use crate::collision::{Contact, ContactGroup};
    pub use crate::config::{CollisionConfig, EngineConfig, SolverConfig};
    pub use crate::constraint::Constraint;
    pub use crate::error::{PhysicsError, PhysicsResult};
    pub use crate::math::{Mat3, Quat, Transform3d, Vec3};
    pub use crate::raycast::{Ray, RayHit};
    pub use crate::shapes::{Convex, Shape};
    pub use crate::world::World;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn end_to_end_free_fall_and_raycast() {
        let mut world: World<()> = World::empty().with_gravity(9.81, Vec3::new(0.0, 0.0, -1.0));
        world.add(Body::plane(()));
        let id = world.add(
            Body::sphere(0.5, ())
                .with_behavior(Behavior::Dynamic(1.0))
                .move_to(Vec3::new(0.0, 0.0, 5.0)),
        );

        for _ in 0..120 {
            world.simulate(1.0 / 60.0);
        }

        // After two seconds the sphere should have settled onto the plane
        // rather than falling through or flying off.
        let body = world.body(id).unwrap();
        assert!(body.center_of_mass().z > 0.0);
        assert!(body.center_of_mass().z < 5.0);

        let hit = world
            .raycast(Vec3::new(0.0, 0.0, 20.0), Vec3::new(0.0, 0.0, -1.0))
            .expect("downward ray should hit either the sphere or the plane");
        assert!(hit.normal.z > 0.0);
    }

    #[test]
    fn two_body_point_to_point_constraint_holds_separation() {
        let mut world: World<()> = World::empty();
        let a = world.add(Body::sphere(0.5, ()).with_behavior(Behavior::Dynamic(1.0)));
        let b = world.add(
            Body::sphere(0.5, ())
                .with_behavior(Behavior::Dynamic(1.0))
                .move_to(Vec3::new(2.0, 0.0, 0.0)),
        );
        world.constrain(
            a,
            b,
            Constraint::point_to_point(Vec3::new(1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)),
        );

        for _ in 0..30 {
            world.simulate(1.0 / 60.0);
        }

        let body_a = world.body(a).unwrap();
        let body_b = world.body(b).unwrap();
        let pivot_a = body_a.frame().point_place_in(Vec3::new(1.0, 0.0, 0.0));
        let pivot_b = body_b.frame().point_place_in(Vec3::new(-1.0, 0.0, 0.0));
        assert!((pivot_a - pivot_b).norm() < 0.1);
    }
}
