//! User-declared joints and their lowering into SPOOK equations in
//! center-of-mass coordinates.

use crate::body::Body;
use crate::math::{tangent_basis, Vec3};
use crate::solver::equation::{external_term, velocity_error, JacobianRow, SpookEquation, SpookParams};

/// Stiffness/relaxation shared by every joint equation: always bilateral,
/// `spook_stiffness = 1e7`, `spook_relaxation = 4`.
const JOINT_STIFFNESS: f64 = 1e7;
const JOINT_RELAXATION: f64 = 4.0;

/// A joint between two bodies, declared in the user's body-local
/// coordinates. Lowered to center-of-mass coordinates when equations are
/// built for a `simulate` step.
#[derive(Debug, Clone, Copy)]
pub enum Constraint {
    /// Locks a point on body1 to a point on body2: `pivot1`/`pivot2` are
    /// expressed in each body's original (pre-COM) local frame.
    PointToPoint { pivot1: Vec3, pivot2: Vec3 },
    /// Locks two axis origins together and the two axis directions to each
    /// other, leaving rotation about the shared axis free.
    Hinge {
        pivot1: Vec3,
        axis1: Vec3,
        pivot2: Vec3,
        axis2: Vec3,
    },
    /// Locks center-to-center distance to `length`.
    Distance { length: f64 },
}

impl Constraint {
    pub fn point_to_point(pivot1: Vec3, pivot2: Vec3) -> Self {
        Self::PointToPoint { pivot1, pivot2 }
    }

    pub fn hinge(pivot1: Vec3, axis1: Vec3, pivot2: Vec3, axis2: Vec3) -> Self {
        Self::Hinge {
            pivot1,
            axis1: axis1.normalize(),
            pivot2,
            axis2: axis2.normalize(),
        }
    }

    pub fn distance(length: f64) -> Self {
        Self::Distance { length }
    }

    /// Lowers this constraint into one or more SPOOK equations, in the
    /// order a single `PointToPoint`/`Hinge`/`Distance` declares them.
    pub fn lower<T>(&self, body1: &Body<T>, body2: &Body<T>, dt: f64) -> Vec<SpookEquation> {
        let params = SpookParams::new(dt, JOINT_STIFFNESS, JOINT_RELAXATION);
        match self {
            Constraint::PointToPoint { pivot1, pivot2 } => {
                point_to_point_equations(body1, body2, *pivot1, *pivot2, dt, params)
            }
            Constraint::Hinge {
                pivot1,
                axis1,
                pivot2,
                axis2,
            } => hinge_equations(body1, body2, *pivot1, *axis1, *pivot2, *axis2, dt, params),
            Constraint::Distance { length } => distance_equation(body1, body2, *length, dt, params),
        }
    }
}

/// Body-local pivot, minus the body's COM offset, rotated into world space
/// and left as an `r` vector from the center of mass.
fn com_relative_world_offset<T>(body: &Body<T>, body_local_point: Vec3) -> Vec3 {
    let origin_frame = body.frame();
    let world_point = origin_frame.point_place_in(body_local_point);
    world_point - body.center_of_mass()
}

fn build_equation<T>(
    body1: &Body<T>,
    body2: &Body<T>,
    ja: JacobianRow,
    jb: JacobianRow,
    g: f64,
    min_force: f64,
    max_force: f64,
    dt: f64,
    params: SpookParams,
) -> SpookEquation {
    let gdot0 = velocity_error(&ja, &jb, body1, body2);
    let external = external_term(&ja, &jb, body1, body2);
    SpookEquation::new(
        body1.id(),
        body2.id(),
        ja,
        jb,
        min_force,
        max_force,
        g,
        gdot0,
        external,
        dt,
        params,
        body1.inv_mass(),
        body1.inv_inertia_world(),
        body2.inv_mass(),
        body2.inv_inertia_world(),
    )
}

/// Three axis-aligned equations enforcing `(x1 + r1) - (x2 + r2) = 0`.
fn point_to_point_equations<T>(
    body1: &Body<T>,
    body2: &Body<T>,
    pivot1: Vec3,
    pivot2: Vec3,
    dt: f64,
    params: SpookParams,
) -> Vec<SpookEquation> {
    let r1 = com_relative_world_offset(body1, pivot1);
    let r2 = com_relative_world_offset(body2, pivot2);
    let world1 = body1.center_of_mass() + r1;
    let world2 = body2.center_of_mass() + r2;
    let error = world1 - world2;

    [Vec3::x(), Vec3::y(), Vec3::z()]
        .into_iter()
        .map(|e| {
            let ja = JacobianRow::new(-e, -r1.cross(&e));
            let jb = JacobianRow::new(e, r2.cross(&e));
            let g = error.dot(&e);
            build_equation(body1, body2, ja, jb, g, f64::NEG_INFINITY, f64::INFINITY, dt, params)
        })
        .collect()
}

/// A `PointToPoint` on the axis origins plus two rotational equations that
/// lock `axis1` to `axis2` while leaving rotation about the shared axis
/// free.
fn hinge_equations<T>(
    body1: &Body<T>,
    body2: &Body<T>,
    pivot1: Vec3,
    axis1: Vec3,
    pivot2: Vec3,
    axis2: Vec3,
    dt: f64,
    params: SpookParams,
) -> Vec<SpookEquation> {
    let mut equations = point_to_point_equations(body1, body2, pivot1, pivot2, dt, params);

    let world_axis1 = body1.frame().direction_place_in(axis1).normalize();
    let world_axis2 = body2.frame().direction_place_in(axis2).normalize();
    let (t1, t2) = tangent_basis(world_axis1);

    for tangent in [t1, t2] {
        let ja = JacobianRow::new(Vec3::zeros(), -tangent);
        let jb = JacobianRow::new(Vec3::zeros(), tangent);
        let g = world_axis1.cross(&world_axis2).dot(&tangent);
        equations.push(build_equation(
            body1,
            body2,
            ja,
            jb,
            g,
            f64::NEG_INFINITY,
            f64::INFINITY,
            dt,
            params,
        ));
    }

    equations
}

/// One equation enforcing `|x1 - x2| = length`.
fn distance_equation<T>(body1: &Body<T>, body2: &Body<T>, length: f64, dt: f64, params: SpookParams) -> Vec<SpookEquation> {
    let delta = body1.center_of_mass() - body2.center_of_mass();
    let dist = delta.norm();
    let normal = if dist > 1e-9 { delta / dist } else { Vec3::x() };

    let ja = JacobianRow::new(-normal, Vec3::zeros());
    let jb = JacobianRow::new(normal, Vec3::zeros());
    let g = dist - length;

    vec![build_equation(
        body1,
        body2,
        ja,
        jb,
        g,
        f64::NEG_INFINITY,
        f64::INFINITY,
        dt,
        params,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Behavior, BodyId};
    use crate::shapes::Shape;

    fn dynamic_sphere(id: u32, at: Vec3) -> Body<()> {
        Body::new(BodyId::from(id), vec![Shape::sphere(1.0)], ())
            .with_behavior(Behavior::Dynamic(1.0))
            .move_to(at)
    }

    #[test]
    fn distance_constraint_bias_matches_separation_error() {
        let a = dynamic_sphere(0, Vec3::new(-1.0, 0.0, 0.0));
        let b = dynamic_sphere(1, Vec3::new(1.0, 0.0, 0.0));
        let equations = Constraint::distance(3.0).lower(&a, &b, 1.0 / 60.0);
        assert_eq!(equations.len(), 1);
        // Separation is 2, target is 3: equation is unsatisfied.
        assert!(equations[0].lambda == 0.0);
    }

    #[test]
    fn point_to_point_yields_three_equations() {
        let a = dynamic_sphere(0, Vec3::zeros());
        let b = dynamic_sphere(1, Vec3::new(2.0, 0.0, 0.0));
        let equations = Constraint::point_to_point(Vec3::new(1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0))
            .lower(&a, &b, 1.0 / 60.0);
        assert_eq!(equations.len(), 3);
    }

    #[test]
    fn hinge_yields_five_equations() {
        let a = dynamic_sphere(0, Vec3::zeros());
        let b = dynamic_sphere(1, Vec3::new(2.0, 0.0, 0.0));
        let equations = Constraint::hinge(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::z(),
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::z(),
        )
        .lower(&a, &b, 1.0 / 60.0);
        assert_eq!(equations.len(), 5);
    }
}
