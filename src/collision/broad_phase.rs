//! Sweep-and-prune broad phase over body-level AABBs.

use crate::body::{Body, BodyId};
use crate::collision::Aabb;
use crate::shapes::ShapeKind;

/// One endpoint of a body's AABB projection onto the sweep axis.
struct Endpoint {
    value: f64,
    body_id: BodyId,
    is_min: bool,
}

/// Computes the union AABB over all of a body's world-space shapes. Returns
/// `None` for a body with no shapes (nothing to test against).
fn body_aabb<T>(body: &Body<T>) -> Option<Aabb> {
    let mut result: Option<Aabb> = None;
    for (shape, world_transform) in body.shapes().iter().zip(body.world_shapes()) {
        let shape_aabb = match &shape.kind {
            ShapeKind::Convex(c) => Aabb::from_points(
                c.vertices.iter().map(|v| world_transform.point_place_in(*v)),
            ),
            ShapeKind::Sphere(r) => Some(Aabb::sphere(world_transform.position, *r)),
            ShapeKind::Plane | ShapeKind::Particle => None,
        };
        if let Some(shape_aabb) = shape_aabb {
            result = Some(match result {
                Some(existing) => Aabb {
                    min: existing.min.zip_map(&shape_aabb.min, f64::min),
                    max: existing.max.zip_map(&shape_aabb.max, f64::max),
                },
                None => shape_aabb,
            });
        }
    }
    result
}

/// Produces candidate body pairs whose AABBs overlap, skipping pairs where
/// both bodies are static. Planes and particles have no finite AABB
/// here — their shape-level filtering happens in the narrow phase, which
/// still needs to test a plane's shapes against every AABB-bounded body.
pub fn candidate_pairs<T>(bodies: &[Body<T>]) -> Vec<(BodyId, BodyId)> {
    if bodies.len() < 2 {
        return Vec::new();
    }

    // Bodies made only of planes/particles have no AABB; they still need to
    // be tested against every other body (a plane's extent is effectively
    // infinite), so they're carried separately rather than sorted in.
    let mut bounded: Vec<(BodyId, Aabb)> = Vec::new();
    let mut unbounded: Vec<BodyId> = Vec::new();
    for body in bodies {
        match body_aabb(body) {
            Some(aabb) => bounded.push((body.id(), aabb)),
            None => unbounded.push(body.id()),
        }
    }

    let sort_axis = choose_axis(&bounded);

    let mut pairs = Vec::new();

    let mut endpoints: Vec<Endpoint> = Vec::with_capacity(bounded.len() * 2);
    for (id, aabb) in &bounded {
        endpoints.push(Endpoint {
            value: aabb.min[sort_axis],
            body_id: *id,
            is_min: true,
        });
        endpoints.push(Endpoint {
            value: aabb.max[sort_axis],
            body_id: *id,
            is_min: false,
        });
    }
    endpoints.sort_by(|a, b| a.value.partial_cmp(&b.value).unwrap());

    let mut active: Vec<BodyId> = Vec::new();
    for endpoint in &endpoints {
        if endpoint.is_min {
            for &other in &active {
                pairs.push(order_pair(endpoint.body_id, other));
            }
            active.push(endpoint.body_id);
        } else {
            active.retain(|id| *id != endpoint.body_id);
        }
    }

    let aabb_of = |id: BodyId| bounded.iter().find(|(b, _)| *b == id).map(|(_, a)| *a);
    pairs.retain(|(a, b)| match (aabb_of(*a), aabb_of(*b)) {
        (Some(aabb_a), Some(aabb_b)) => aabb_a.overlaps(&aabb_b),
        _ => false,
    });

    // Every unbounded body (plane/particle-only) is paired with every other
    // body, bounded or unbounded; the narrow phase resolves plane-plane and
    // particle-particle skips.
    for &u in &unbounded {
        for body in bodies {
            if body.id() != u {
                pairs.push(order_pair(u, body.id()));
            }
        }
    }

    let is_static = |id: BodyId| bodies.iter().find(|b| b.id() == id).is_some_and(Body::is_static);
    pairs.retain(|(a, b)| !(is_static(*a) && is_static(*b)));

    dedup_pairs(pairs)
}

fn order_pair(a: BodyId, b: BodyId) -> (BodyId, BodyId) {
    if a.index() <= b.index() {
        (a, b)
    } else {
        (b, a)
    }
}

fn dedup_pairs(mut pairs: Vec<(BodyId, BodyId)>) -> Vec<(BodyId, BodyId)> {
    pairs.sort_by_key(|(a, b)| (a.index(), b.index()));
    pairs.dedup();
    pairs
}

fn choose_axis(bounded: &[(BodyId, Aabb)]) -> usize {
    let centers: Vec<_> = bounded.iter().map(|(_, a)| a.center()).collect();
    if centers.is_empty() {
        return 0;
    }

    let mut variance = [0.0_f64; 3];
    for axis in 0..3 {
        let mean = centers.iter().map(|c| c[axis]).sum::<f64>() / centers.len() as f64;
        variance[axis] = centers.iter().map(|c| (c[axis] - mean).powi(2)).sum::<f64>() / centers.len() as f64;
    }

    if variance[0] >= variance[1] && variance[0] >= variance[2] {
        0
    } else if variance[1] >= variance[2] {
        1
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Behavior, BodyId as Id};
    use crate::shapes::Shape;

    fn body_at(id: u32, position: crate::math::Vec3) -> Body<()> {
        Body::new(Id(id), vec![Shape::sphere(1.0)], ())
            .with_behavior(Behavior::Dynamic(1.0))
            .move_to(position)
    }

    #[test]
    fn overlapping_spheres_produce_one_pair() {
        use crate::math::Vec3;
        let bodies = vec![
            body_at(0, Vec3::new(0.0, 0.0, 0.0)),
            body_at(1, Vec3::new(0.5, 0.0, 0.0)),
            body_at(2, Vec3::new(20.0, 0.0, 0.0)),
        ];
        let pairs = candidate_pairs(&bodies);
        assert_eq!(pairs, vec![(Id(0), Id(1))]);
    }

    #[test]
    fn two_static_bodies_never_pair() {
        use crate::math::Vec3;
        let a = Body::new(Id(0), vec![Shape::sphere(1.0)], ()).move_to(Vec3::zeros());
        let b = Body::new(Id(1), vec![Shape::sphere(1.0)], ()).move_to(Vec3::new(0.1, 0.0, 0.0));
        let pairs = candidate_pairs(&[a, b]);
        assert!(pairs.is_empty());
    }

    #[test]
    fn plane_pairs_with_every_body_regardless_of_distance() {
        use crate::math::Vec3;
        let plane = Body::new(Id(0), vec![Shape::plane()], ());
        let sphere = body_at(1, Vec3::new(1000.0, 0.0, 0.0));
        let pairs = candidate_pairs(&[plane, sphere]);
        assert_eq!(pairs, vec![(Id(0), Id(1))]);
    }
}
