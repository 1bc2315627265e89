//! The SPOOK equation: a single bilateral or clamped constraint row solved
//! by one sweep of Sequential Impulses.

use crate::body::{Body, BodyId};
use crate::math::Vec3;

/// The linear/angular halves of a constraint's Jacobian row for one body.
#[derive(Debug, Clone, Copy)]
pub struct JacobianRow {
    pub linear: Vec3,
    pub angular: Vec3,
}

impl JacobianRow {
    pub fn new(linear: Vec3, angular: Vec3) -> Self {
        Self { linear, angular }
    }

    pub fn zero() -> Self {
        Self {
            linear: Vec3::zeros(),
            angular: Vec3::zeros(),
        }
    }
}

/// SPOOK stiffness/relaxation, resolved into the `a`, `b`, `eps` triple used
/// by every equation built this step.
#[derive(Debug, Clone, Copy)]
pub struct SpookParams {
    pub a: f64,
    pub b: f64,
    pub eps: f64,
}

impl SpookParams {
    pub fn new(dt: f64, stiffness: f64, relaxation: f64) -> Self {
        let denom = 1.0 + 4.0 * relaxation;
        Self {
            a: 4.0 / (dt * denom),
            b: 4.0 * relaxation / denom,
            eps: 4.0 / (dt * dt * stiffness * denom),
        }
    }
}

/// One row of the constraint system: `Ja·(v1,ω1) + Jb·(v2,ω2) = bias`
/// (clamped to `[min_force, max_force]`), solved iteratively against a
/// shared [`super::sequential_impulse::SolverBody`] pair.
pub struct SpookEquation {
    pub body1: BodyId,
    pub body2: BodyId,
    pub ja: JacobianRow,
    pub jb: JacobianRow,
    pub min_force: f64,
    pub max_force: f64,
    pub lambda: f64,

    rhs: f64,
    eps: f64,
    inv_eff_mass: f64,
}

impl SpookEquation {
    /// Builds an equation row.
    ///
    /// `g` is the position error, `gdot0` the velocity error measured
    /// before this step's solve begins, `external` the `G·invM·f` term
    /// contributed by forces already accumulated on the bodies this step.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        body1: BodyId,
        body2: BodyId,
        ja: JacobianRow,
        jb: JacobianRow,
        min_force: f64,
        max_force: f64,
        g: f64,
        gdot0: f64,
        external: f64,
        dt: f64,
        params: SpookParams,
        inv_mass1: f64,
        inv_inertia1: crate::math::Mat3,
        inv_mass2: f64,
        inv_inertia2: crate::math::Mat3,
    ) -> Self {
        // The mechanical term alone (no `eps`) decides whether this pair has
        // any effective mass at all: two infinite-mass bodies must produce
        // an equation that never updates, and folding `eps` into that check
        // would give them a tiny but nonzero effective mass instead.
        let mechanical = ja.linear.dot(&ja.linear) * inv_mass1
            + ja.angular.dot(&(inv_inertia1 * ja.angular))
            + jb.linear.dot(&jb.linear) * inv_mass2
            + jb.angular.dot(&(inv_inertia2 * jb.angular));

        let inv_eff_mass = if mechanical > 1e-12 { 1.0 / (mechanical + params.eps) } else { 0.0 };
        let rhs = -params.a * g - params.b * gdot0 - dt * external;

        Self {
            body1,
            body2,
            ja,
            jb,
            min_force,
            max_force,
            lambda: 0.0,
            rhs,
            eps: params.eps,
            inv_eff_mass,
        }
    }

    /// Performs one Sequential Impulses update given the current velocity
    /// state of both bodies, returning the impulse delta `Δλ` applied (used
    /// by the caller to accumulate into linear/angular velocity and to
    /// test the sweep's convergence).
    pub fn solve(&mut self, v1: Vec3, w1: Vec3, v2: Vec3, w2: Vec3) -> f64 {
        if self.inv_eff_mass == 0.0 {
            return 0.0;
        }
        let gw = self.ja.linear.dot(&v1)
            + self.ja.angular.dot(&w1)
            + self.jb.linear.dot(&v2)
            + self.jb.angular.dot(&w2);

        let delta_lambda_unclamped = self.inv_eff_mass * (self.rhs - gw - self.eps * self.lambda);
        let new_lambda = (self.lambda + delta_lambda_unclamped).clamp(self.min_force, self.max_force);
        let delta_lambda = new_lambda - self.lambda;
        self.lambda = new_lambda;
        delta_lambda
    }
}

/// `Ja·(v1,ω1) + Jb·(v2,ω2)` evaluated against a body's current velocity —
/// used both as the contact/joint "Ġ" bias term and, during solving, as the
/// raw constraint velocity `GW`.
pub fn velocity_error<T>(ja: &JacobianRow, jb: &JacobianRow, body1: &Body<T>, body2: &Body<T>) -> f64 {
    ja.linear.dot(&body1.velocity())
        + ja.angular.dot(&body1.angular_velocity())
        + jb.linear.dot(&body2.velocity())
        + jb.angular.dot(&body2.angular_velocity())
}

/// `G·invM·f`, the contribution already-accumulated forces/torques make to
/// this equation's velocity this step.
pub fn external_term<T>(ja: &JacobianRow, jb: &JacobianRow, body1: &Body<T>, body2: &Body<T>) -> f64 {
    ja.linear.dot(&(body1.force() * body1.inv_mass()))
        + ja.angular.dot(&(body1.inv_inertia_world() * body1.torque()))
        + jb.linear.dot(&(body2.force() * body2.inv_mass()))
        + jb.angular.dot(&(body2.inv_inertia_world() * body2.torque()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Mat3;
    use approx::assert_relative_eq;

    #[test]
    fn spook_params_match_closed_form() {
        let params = SpookParams::new(1.0 / 60.0, 1e7, 4.0);
        assert_relative_eq!(params.a, 4.0 / ((1.0 / 60.0) * 17.0), epsilon = 1e-9);
        assert_relative_eq!(params.b, 16.0 / 17.0, epsilon = 1e-9);
    }

    #[test]
    fn equation_with_infinite_mass_pair_never_updates() {
        let mut eq = SpookEquation::new(
            BodyId::from(0u32),
            BodyId::from(1u32),
            JacobianRow::new(Vec3::z(), Vec3::zeros()),
            JacobianRow::new(-Vec3::z(), Vec3::zeros()),
            0.0,
            1e6,
            -0.1,
            0.0,
            0.0,
            1.0 / 60.0,
            SpookParams::new(1.0 / 60.0, 1e7, 4.0),
            0.0,
            Mat3::zeros(),
            0.0,
            Mat3::zeros(),
        );
        let delta = eq.solve(Vec3::zeros(), Vec3::zeros(), Vec3::zeros(), Vec3::zeros());
        assert_eq!(delta, 0.0);
    }
}
