//! The world: owns bodies and constraints, assigns stable ids, and drives
//! one `simulate` step end to end.

use tracing::debug;

use crate::body::{Body, BodyId};
use crate::collision::{broad_phase, narrow_phase, ContactGroup};
use crate::config::EngineConfig;
use crate::constraint::Constraint;
use crate::integrator;
use crate::math::Vec3;
use crate::raycast::{self, Ray, RayHit};

/// Owns every body and constraint in a simulation, plus the contact
/// manifolds and convergence diagnostics produced by the last `simulate`
/// call. Bodies are an id-indexed arena: `bodies[id.index()]` is `Some` for
/// every live body, `None` for a freed slot awaiting reuse.
pub struct World<T = ()> {
    bodies: Vec<Option<Body<T>>>,
    free_ids: Vec<BodyId>,
    next_body_id: u32,

    constraints: Vec<(BodyId, BodyId, Constraint)>,

    gravity: Vec3,
    config: EngineConfig,

    /// Contact manifolds produced by the last `simulate` call, exposed via
    /// [`Self::contacts`].
    contact_groups: Vec<ContactGroup>,
}

impl<T> World<T> {
    /// An empty world: no bodies, no gravity.
    pub fn empty() -> Self {
        Self {
            bodies: Vec::new(),
            free_ids: Vec::new(),
            next_body_id: 0,
            constraints: Vec::new(),
            gravity: Vec3::zeros(),
            config: EngineConfig::default(),
            contact_groups: Vec::new(),
        }
    }

    /// Builds a world with the given engine configuration instead of
    /// defaults — an ambient-stack addition that tunes solver
    /// iteration/tolerance and collision defaults without changing any
    /// physical semantics.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::empty()
        }
    }

    /// Sets gravity as `acceleration · direction`. `direction` is
    /// normalized; a zero vector leaves gravity at zero.
    pub fn with_gravity(mut self, acceleration: f64, direction: Vec3) -> Self {
        let norm = direction.norm();
        self.gravity = if norm > crate::math::EPSILON {
            direction * (acceleration / norm)
        } else {
            Vec3::zeros()
        };
        self
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Inserts `body`, assigning it a stable id (preferring a freed slot)
    /// and returning that id.
    pub fn add(&mut self, mut body: Body<T>) -> BodyId {
        let id = match self.free_ids.pop() {
            Some(id) => id,
            None => {
                let id = BodyId::from(self.next_body_id);
                self.next_body_id += 1;
                id
            }
        };
        body.set_id(id);

        let index = id.index() as usize;
        if index >= self.bodies.len() {
            self.bodies.resize_with(index + 1, || None);
        }
        debug!(body = id.index(), shapes = body.shapes().len(), "body added to world");
        self.bodies[index] = Some(body);
        id
    }

    /// Retains only the bodies for which `predicate` returns `true`; every
    /// removed body's id is pushed onto the free list, and any constraint
    /// referencing it is dropped.
    pub fn keep_if(&mut self, predicate: impl Fn(&Body<T>) -> bool) {
        let mut removed = Vec::new();
        for slot in self.bodies.iter_mut() {
            if let Some(body) = slot {
                if !predicate(body) {
                    removed.push(body.id());
                    *slot = None;
                }
            }
        }
        self.free_ids.extend(removed.iter().copied());
        if !removed.is_empty() {
            self.constraints
                .retain(|(a, b, _)| !removed.contains(a) && !removed.contains(b));
        }
    }

    /// Maps every live body through `update_fn` in place, preserving its id.
    pub fn update(&mut self, update_fn: impl Fn(Body<T>) -> Body<T>) {
        for slot in self.bodies.iter_mut() {
            if let Some(body) = slot.take() {
                let id = body.id();
                let mut updated = update_fn(body);
                updated.set_id(id);
                *slot = Some(updated);
            }
        }
    }

    pub fn bodies(&self) -> impl Iterator<Item = &Body<T>> {
        self.bodies.iter().filter_map(|b| b.as_ref())
    }

    pub fn body(&self, id: BodyId) -> Option<&Body<T>> {
        self.bodies.get(id.index() as usize)?.as_ref()
    }

    /// Appends a single constraint between two bodies directly.
    pub fn constrain(&mut self, a: BodyId, b: BodyId, constraint: Constraint) {
        self.constraints.push((a, b, constraint));
    }

    /// For every unordered pair of bodies where both pass `test`, calls
    /// `pair_fn(b1, b2)` and `pair_fn(b2, b1)`, appending every constraint
    /// either call returns. Existing constraints are preserved.
    pub fn constrain_if(
        &mut self,
        test: impl Fn(&Body<T>) -> bool,
        pair_fn: impl Fn(&Body<T>, &Body<T>) -> Option<Constraint>,
    ) {
        let candidates: Vec<BodyId> = self
            .bodies()
            .filter(|b| test(b))
            .map(Body::id)
            .collect();

        let mut new_constraints = Vec::new();
        for i in 0..candidates.len() {
            for j in (i + 1)..candidates.len() {
                let (a, b) = (candidates[i], candidates[j]);
                let (Some(body_a), Some(body_b)) = (self.body(a), self.body(b)) else {
                    continue;
                };
                if let Some(c) = pair_fn(body_a, body_b) {
                    new_constraints.push((a, b, c));
                }
                if let Some(c) = pair_fn(body_b, body_a) {
                    new_constraints.push((b, a, c));
                }
            }
        }
        self.constraints.extend(new_constraints);
    }

    /// The contact manifolds produced by the last `simulate` call.
    pub fn contacts(&self) -> &[ContactGroup] {
        &self.contact_groups
    }

    /// Runs one physics step: broad phase, narrow phase, constraint
    /// lowering, Sequential Impulses solve, integration. Never returns an
    /// error — degenerate input is clamped or ignored.
    pub fn simulate(&mut self, dt: f64) {
        let live_ids: Vec<usize> = self
            .bodies
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.as_ref().map(|_| i))
            .collect();

        // Compact the live bodies into a contiguous slice for the broad and
        // narrow phase, then scatter the results back by id.
        let mut live_bodies: Vec<Body<T>> = live_ids
            .iter()
            .map(|&i| self.bodies[i].take().expect("live id"))
            .collect();

        let candidate_pairs = broad_phase::candidate_pairs(&live_bodies);

        let mut groups = Vec::with_capacity(candidate_pairs.len());
        for (a, b) in candidate_pairs {
            let Some(body1) = live_bodies.iter().find(|body| body.id() == a) else {
                continue;
            };
            let Some(body2) = live_bodies.iter().find(|body| body.id() == b) else {
                continue;
            };
            if let Some(group) = narrow_phase::generate_contacts(body1, body2) {
                groups.push(group);
            }
        }

        let iterations = integrator::step(
            &mut live_bodies,
            &groups,
            &self.constraints,
            self.gravity,
            &self.config.solver,
            dt,
        );

        debug!(
            contact_groups = groups.len(),
            solver_iterations = iterations,
            dt,
            "simulate step complete"
        );

        for (index, body) in live_ids.into_iter().zip(live_bodies) {
            self.bodies[index] = Some(body);
        }

        self.contact_groups = groups;
    }

    /// Closest-hit ray query over every non-particle shape. Returns
    /// `None` for an empty world or one containing only particles.
    pub fn raycast(&self, from: Vec3, direction: Vec3) -> Option<RayHit> {
        let ray = Ray::new(from, direction);
        raycast::closest_hit(ray, self.bodies())
    }
}

impl<T> Default for World<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Behavior;
    use crate::shapes::Shape;

    #[test]
    fn add_assigns_sequential_ids() {
        let mut world: World<()> = World::empty();
        let a = world.add(Body::sphere(1.0, ()));
        let b = world.add(Body::sphere(1.0, ()));
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
    }

    #[test]
    fn removed_id_is_reused() {
        let mut world: World<()> = World::empty();
        let a = world.add(Body::sphere(1.0, ()));
        let _b = world.add(Body::sphere(1.0, ()));
        world.keep_if(|body| body.id() != a);
        let c = world.add(Body::sphere(1.0, ()));
        assert_eq!(c, a);
    }

    #[test]
    fn keep_if_drops_constraints_on_removed_bodies() {
        let mut world: World<()> = World::empty();
        let a = world.add(Body::sphere(1.0, ()).with_behavior(Behavior::Dynamic(1.0)));
        let b = world.add(Body::sphere(1.0, ()).with_behavior(Behavior::Dynamic(1.0)));
        world.constrain(a, b, Constraint::distance(2.0));
        world.keep_if(|body| body.id() != a);
        assert!(world.constraints.is_empty());
    }

    #[test]
    fn simulate_free_fall_matches_closed_form() {
        let mut world: World<()> = World::empty().with_gravity(10.0, Vec3::new(0.0, 0.0, -1.0));
        let id = world.add(
            Body::sphere(0.1, ())
                .with_behavior(Behavior::Dynamic(1.0))
                .move_to(Vec3::new(0.0, 0.0, 10.0)),
        );
        let dt = 1.0 / 60.0;
        world.simulate(dt);
        let body = world.body(id).unwrap();
        assert!((body.velocity().z - (-10.0 / 60.0)).abs() < 1e-9);
        let expected_z = 10.0 - 10.0 * dt * dt;
        assert!((body.center_of_mass().z - expected_z).abs() < 1e-6);
    }

    #[test]
    fn static_body_transform_is_unchanged_by_simulate() {
        let mut world: World<()> = World::empty().with_gravity(9.81, Vec3::new(0.0, 0.0, -1.0));
        let id = world.add(Body::plane(()));
        let before = world.body(id).unwrap().transform3d();
        world.simulate(1.0 / 60.0);
        assert_eq!(world.body(id).unwrap().transform3d(), before);
    }

    #[test]
    fn raycast_against_empty_world_is_none() {
        let world: World<()> = World::empty();
        assert!(world.raycast(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn raycast_finds_box() {
        let mut world: World<()> = World::empty();
        world.add(
            Body::block(Vec3::new(1.0, 1.0, 1.0), ())
                .with_behavior(Behavior::Dynamic(1.0))
                .move_to(Vec3::zeros()),
        );
        let hit = world
            .raycast(Vec3::new(10.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0))
            .expect("ray should hit box");
        assert!((hit.t - 9.0).abs() < 1e-6);
    }

    #[test]
    fn bodies_made_only_of_planes_cannot_become_dynamic_via_world() {
        let mut world: World<()> = World::empty();
        let id = world.add(Body::plane(()).with_behavior(Behavior::Dynamic(5.0)));
        assert!(world.body(id).unwrap().is_static());
        let _ = Shape::plane();
    }
}
