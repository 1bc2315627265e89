//! Sequential Impulses solver orchestration: builds equations from contact
//! manifolds and lowered joints, runs the iterative sweep, writes results
//! back onto the real bodies.

pub mod equation;
pub mod sequential_impulse;

use tracing::debug;

use crate::body::{Body, BodyId};
use crate::collision::ContactGroup;
use crate::config::SolverConfig;
use crate::constraint::Constraint;
use crate::math::{tangent_basis, Vec3};
use equation::{external_term, velocity_error, JacobianRow, SpookEquation, SpookParams};
use sequential_impulse::SolverBuffer;

/// Clamp used for every contact normal equation.
const NORMAL_MAX_FORCE: f64 = 1e6;

/// Below this closing speed, a contact is treated as resting rather than a
/// fresh impact: restitution is not applied, so gravity's per-step velocity
/// doesn't get amplified by `(1 + restitution)` every frame and blow up a
/// body that should be settling.
const RESTITUTION_VELOCITY_THRESHOLD: f64 = 1.0;

/// Builds the normal equation plus the two friction equations for one
/// contact point.
fn build_contact_equations<T>(
    body1: &Body<T>,
    body2: &Body<T>,
    contact: &crate::collision::Contact,
    dt: f64,
    params: SpookParams,
    friction: f64,
    restitution: f64,
    gravity: Vec3,
) -> [SpookEquation; 3] {
    let n = contact.ni;
    let r1 = contact.pi - body1.center_of_mass();
    let r2 = contact.pj - body2.center_of_mass();

    let ja_n = JacobianRow::new(-n, -r1.cross(&n));
    let jb_n = JacobianRow::new(n, r2.cross(&n));

    let g = -contact.depth();
    let closing = velocity_error(&ja_n, &jb_n, body1, body2);
    // Restitution scales the pre-solve closing velocity so the sweep drives
    // the contact toward `-restitution * closing` rather than zero, but only
    // above the resting-contact threshold — below it `closing` is just the
    // gravity velocity picked up since the last step, not a real impact.
    let gdot0 = if closing < -RESTITUTION_VELOCITY_THRESHOLD {
        closing * (1.0 + restitution)
    } else {
        closing
    };
    let external_n = external_term(&ja_n, &jb_n, body1, body2);

    let normal_eq = SpookEquation::new(
        body1.id(),
        body2.id(),
        ja_n,
        jb_n,
        0.0,
        NORMAL_MAX_FORCE,
        g,
        gdot0,
        external_n,
        dt,
        params,
        body1.inv_mass(),
        body1.inv_inertia_world(),
        body2.inv_mass(),
        body2.inv_inertia_world(),
    );

    let mbar = {
        let sum = body1.inv_mass() + body2.inv_mass();
        if sum > 0.0 { 1.0 / sum } else { 0.0 }
    };
    // Friction's normal load isn't coupled to this sweep's normal lambda
    // (no warm-starting); approximate it from the gravitational load
    // each body contributes instead.
    let friction_limit = friction * mbar * gravity.norm();

    let (t1, t2) = tangent_basis(n);
    let friction_eq = |t: Vec3| {
        let ja = JacobianRow::new(-t, -r1.cross(&t));
        let jb = JacobianRow::new(t, r2.cross(&t));
        let gdot0 = velocity_error(&ja, &jb, body1, body2);
        let external = external_term(&ja, &jb, body1, body2);
        SpookEquation::new(
            body1.id(),
            body2.id(),
            ja,
            jb,
            -friction_limit,
            friction_limit,
            0.0,
            gdot0,
            external,
            dt,
            params,
            body1.inv_mass(),
            body1.inv_inertia_world(),
            body2.inv_mass(),
            body2.inv_inertia_world(),
        )
    };

    [normal_eq, friction_eq(t1), friction_eq(t2)]
}

fn find<'a, T>(bodies: &'a [Body<T>], id: BodyId) -> Option<&'a Body<T>> {
    bodies.iter().find(|b| b.id() == id)
}

/// Runs one full Sequential Impulses step: builds every contact and joint
/// equation in a fixed order (normals/frictions per contact group in
/// emission order, then joints in declaration order), solves to
/// convergence, and writes `velocity`/`angular_velocity` back onto
/// `bodies`. Returns the number of sweeps performed, for the caller's
/// convergence diagnostic.
pub fn step<T>(
    bodies: &mut [Body<T>],
    groups: &[ContactGroup],
    constraints: &[(BodyId, BodyId, Constraint)],
    gravity: Vec3,
    config: &SolverConfig,
    dt: f64,
) -> usize {
    let params = SpookParams::new(dt, config.spook_stiffness, config.spook_relaxation);

    let mut equations: Vec<SpookEquation> = Vec::new();

    {
        let bodies: &[Body<T>] = &*bodies;

        for group in groups {
            let Some(body1) = find(bodies, group.body1) else { continue };
            let Some(body2) = find(bodies, group.body2) else { continue };
            let friction = (body1.material().friction + body2.material().friction) * 0.5;
            let restitution = (body1.material().bounciness + body2.material().bounciness) * 0.5;
            for contact in &group.contacts {
                let built = build_contact_equations(body1, body2, contact, dt, params, friction, restitution, gravity);
                equations.extend(built);
            }
        }

        for (a, b, constraint) in constraints {
            let (Some(body1), Some(body2)) = (find(bodies, *a), find(bodies, *b)) else {
                continue;
            };
            equations.extend(constraint.lower(body1, body2, dt));
        }
    }

    let mut buffer = SolverBuffer::new(&*bodies);
    let iterations = sequential_impulse::solve(&mut buffer, &mut equations, config.max_iterations, config.tolerance);

    if iterations >= config.max_iterations {
        debug!(
            equations = equations.len(),
            iterations, "solver reached iteration budget without converging"
        );
    }

    for body in bodies.iter_mut() {
        if body.is_static() {
            continue;
        }
        let solved = buffer.get(body.id());
        body.set_velocity(solved.velocity);
        body.set_angular_velocity(solved.angular_velocity);
    }

    iterations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Behavior, BodyId};
    use crate::collision::Contact;
    use crate::shapes::Shape;

    fn dynamic_sphere(id: u32, at: Vec3) -> Body<()> {
        Body::new(BodyId::from(id), vec![Shape::sphere(1.0)], ())
            .with_behavior(Behavior::Dynamic(1.0))
            .move_to(at)
    }

    #[test]
    fn colliding_spheres_separate_after_solve() {
        let mut a = dynamic_sphere(0, Vec3::new(-0.9, 0.0, 0.0));
        let mut b = dynamic_sphere(1, Vec3::new(0.9, 0.0, 0.0));
        a.set_velocity(Vec3::new(3.0, 0.0, 0.0));
        b.set_velocity(Vec3::new(-3.0, 0.0, 0.0));

        let mut bodies = vec![a, b];
        let group = ContactGroup {
            body1: bodies[0].id(),
            body2: bodies[1].id(),
            contacts: vec![Contact {
                ni: Vec3::new(1.0, 0.0, 0.0),
                pi: Vec3::new(0.1, 0.0, 0.0),
                pj: Vec3::new(-0.1, 0.0, 0.0),
            }],
        };

        let config = SolverConfig::default();
        step(&mut bodies, &[group], &[], Vec3::new(0.0, 0.0, -9.81), &config, 1.0 / 60.0);

        assert!(bodies[0].velocity().x < 3.0);
        assert!(bodies[1].velocity().x > -3.0);
    }

    #[test]
    fn no_contacts_or_constraints_leaves_velocities_untouched() {
        let mut a = dynamic_sphere(0, Vec3::zeros());
        a.set_velocity(Vec3::new(1.0, 2.0, 3.0));
        let mut bodies = vec![a];
        let config = SolverConfig::default();
        step(&mut bodies, &[], &[], Vec3::zeros(), &config, 1.0 / 60.0);
        assert_eq!(bodies[0].velocity(), Vec3::new(1.0, 2.0, 3.0));
    }
}
