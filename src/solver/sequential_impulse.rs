//! The Sequential Impulses sweep: repeatedly solve every equation against a
//! shared scratch copy of body velocities until the accumulated impulse
//! change falls below tolerance or the iteration budget is spent.

use crate::body::{Body, BodyId};
use crate::math::{Mat3, Vec3};
use crate::solver::equation::SpookEquation;

/// Per-body scratch state the solver reads and writes every iteration.
/// Indexed directly by `BodyId` (stable ids make this a plain `Vec` slot
/// rather than a hash map).
#[derive(Debug, Clone, Copy)]
pub struct SolverBody {
    pub inv_mass: f64,
    pub inv_inertia_world: Mat3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl SolverBody {
    fn from_body<T>(body: &Body<T>) -> Self {
        Self {
            inv_mass: body.inv_mass(),
            inv_inertia_world: body.inv_inertia_world(),
            velocity: body.velocity(),
            angular_velocity: body.angular_velocity(),
        }
    }

    fn zero() -> Self {
        Self {
            inv_mass: 0.0,
            inv_inertia_world: Mat3::zeros(),
            velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
        }
    }
}

/// Scratch buffer of [`SolverBody`] slots, one per live body id, allocated
/// once per `simulate` call and indexed directly by `BodyId`.
pub struct SolverBuffer {
    slots: Vec<Option<SolverBody>>,
}

impl SolverBuffer {
    pub fn new<T>(bodies: &[Body<T>]) -> Self {
        let len = bodies.iter().map(|b| b.id().index() as usize + 1).max().unwrap_or(0);
        let mut slots = vec![None; len];
        for body in bodies {
            slots[body.id().index() as usize] = Some(SolverBody::from_body(body));
        }
        Self { slots }
    }

    pub fn get(&self, id: BodyId) -> SolverBody {
        self.slots
            .get(id.index() as usize)
            .and_then(|s| *s)
            .unwrap_or_else(SolverBody::zero)
    }

    fn get_mut(&mut self, id: BodyId) -> Option<&mut SolverBody> {
        self.slots.get_mut(id.index() as usize).and_then(|s| s.as_mut())
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &SolverBody)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (BodyId::from(i as u32), s)))
    }
}

/// Runs Sequential Impulses to convergence (or until `max_iterations` is
/// spent) over `equations`, mutating `buffer` in place. Returns the number
/// of sweeps actually performed, for the caller's convergence diagnostics.
pub fn solve(buffer: &mut SolverBuffer, equations: &mut [SpookEquation], max_iterations: usize, tolerance: f64) -> usize {
    if equations.is_empty() {
        return 0;
    }

    let mut iterations_used = 0;
    for iteration in 0..max_iterations {
        iterations_used = iteration + 1;
        let mut total_delta = 0.0_f64;

        for eq in equations.iter_mut() {
            let s1 = buffer.get(eq.body1);
            let s2 = buffer.get(eq.body2);

            let delta_lambda = eq.solve(s1.velocity, s1.angular_velocity, s2.velocity, s2.angular_velocity);
            if delta_lambda == 0.0 {
                continue;
            }
            total_delta += delta_lambda.abs();

            if let Some(s1) = buffer.get_mut(eq.body1) {
                s1.velocity += eq.ja.linear * (delta_lambda * s1.inv_mass);
                s1.angular_velocity += s1.inv_inertia_world * (eq.ja.angular * delta_lambda);
            }
            if let Some(s2) = buffer.get_mut(eq.body2) {
                s2.velocity += eq.jb.linear * (delta_lambda * s2.inv_mass);
                s2.angular_velocity += s2.inv_inertia_world * (eq.jb.angular * delta_lambda);
            }
        }

        if total_delta < tolerance {
            break;
        }
    }

    iterations_used
}
