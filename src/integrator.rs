//! Per-step orchestration: gravity, solve, damping, pose integration, and
//! derived-state refresh, in a fixed order.

use crate::body::Body;
use crate::collision::ContactGroup;
use crate::config::SolverConfig;
use crate::constraint::Constraint;
use crate::math::Vec3;
use crate::solver;

/// Runs one full physics step over `bodies`, given this step's contact
/// manifolds and lowered joint list. Returns the number of solver sweeps
/// performed (for `World::simulate`'s convergence diagnostic).
pub fn step<T>(
    bodies: &mut [Body<T>],
    groups: &[ContactGroup],
    constraints: &[(crate::body::BodyId, crate::body::BodyId, Constraint)],
    gravity: Vec3,
    config: &SolverConfig,
    dt: f64,
) -> usize {
    for body in bodies.iter_mut() {
        if body.is_static() {
            continue;
        }
        let mass = body.mass();
        body.apply_force(gravity * mass);
    }

    let iterations = solver::step(bodies, groups, constraints, gravity, config, dt);

    for body in bodies.iter_mut() {
        body.apply_damping(dt);
        body.integrate_forces(dt);
        body.integrate_pose(dt);
        body.clear_forces();
    }

    iterations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Behavior, BodyId};
    use crate::shapes::Shape;

    #[test]
    fn free_falling_body_gains_downward_velocity() {
        let mut body = Body::new(BodyId::from(0), vec![Shape::sphere(1.0)], ())
            .with_behavior(Behavior::Dynamic(1.0));
        let mut bodies = vec![body.clone()];
        let config = SolverConfig::default();
        let gravity = Vec3::new(0.0, 0.0, -9.81);
        let dt = 1.0 / 60.0;

        step(&mut bodies, &[], &[], gravity, &config, dt);

        assert!(bodies[0].velocity().z < 0.0);
        assert!(bodies[0].center_of_mass().z < 0.0);
        let _ = &mut body;
    }

    #[test]
    fn static_body_never_moves() {
        let mut body = Body::new(BodyId::from(0), vec![Shape::plane()], ());
        let mut bodies = vec![body.clone()];
        let before = bodies[0].transform3d();
        step(&mut bodies, &[], &[], Vec3::new(0.0, 0.0, -9.81), &SolverConfig::default(), 1.0 / 60.0);
        assert_eq!(bodies[0].transform3d(), before);
        let _ = &mut body;
    }
}
