//! Closest-hit ray query over every non-particle shape in the world.

use crate::body::{Body, BodyId};
use crate::math::{Transform3d, Vec3, EPSILON};
use crate::shapes::{Convex, Shape, ShapeKind};

/// A world-space ray: origin plus a unit direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub from: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(from: Vec3, direction: Vec3) -> Self {
        Self {
            from,
            direction: direction.normalize(),
        }
    }
}

/// The closest-hit result of a [`Ray`] against the world.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub body: BodyId,
    pub point: Vec3,
    pub normal: Vec3,
    pub t: f64,
}

/// Finds the closest hit of `ray` against every shape of every body,
/// skipping particles (they have no surface to hit). Bodies are visited in
/// the order they're stored; ties at equal `t` keep the first one found.
pub fn closest_hit<'a, T: 'a>(ray: Ray, bodies: impl IntoIterator<Item = &'a Body<T>>) -> Option<RayHit> {
    let mut best: Option<RayHit> = None;

    for body in bodies {
        for (shape, world_transform) in body.shapes().iter().zip(body.world_shapes()) {
            if let Some((t, normal)) = intersect_shape(ray, shape, world_transform) {
                let is_closer = match &best {
                    Some(b) => t < b.t,
                    None => true,
                };
                if is_closer {
                    best = Some(RayHit {
                        body: body.id(),
                        point: ray.from + ray.direction * t,
                        normal,
                        t,
                    });
                }
            }
        }
    }

    best
}

fn intersect_shape(ray: Ray, shape: &Shape, transform: &Transform3d) -> Option<(f64, Vec3)> {
    match &shape.kind {
        ShapeKind::Plane => intersect_plane(ray, transform),
        ShapeKind::Sphere(r) => intersect_sphere(ray, transform.position, *r),
        ShapeKind::Convex(c) => intersect_convex(ray, transform, c),
        ShapeKind::Particle => None,
    }
}

fn intersect_plane(ray: Ray, transform: &Transform3d) -> Option<(f64, Vec3)> {
    let normal = transform.direction_place_in(Vec3::z());
    let denom = ray.direction.dot(&normal);
    if denom.abs() < EPSILON {
        return None;
    }
    let t = (transform.position - ray.from).dot(&normal) / denom;
    if t < 0.0 {
        return None;
    }
    Some((t, normal))
}

fn intersect_sphere(ray: Ray, center: Vec3, radius: f64) -> Option<(f64, Vec3)> {
    let oc = ray.from - center;
    let b = oc.dot(&ray.direction);
    let c = oc.norm_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_disc = discriminant.sqrt();
    let t0 = -b - sqrt_disc;
    let t1 = -b + sqrt_disc;
    let t = if t0 >= 0.0 {
        t0
    } else if t1 >= 0.0 {
        t1
    } else {
        return None;
    };
    let hit = ray.from + ray.direction * t;
    let normal = (hit - center) / radius;
    Some((t, normal))
}

/// Slab test treating the convex hull as the intersection of the
/// half-spaces defined by its faces: for each face plane, clip the ray's
/// valid `t` interval, tracking which face was decisive at the near bound.
fn intersect_convex(ray: Ray, transform: &Transform3d, convex: &Convex) -> Option<(f64, Vec3)> {
    let mut t_near = f64::NEG_INFINITY;
    let mut t_far = f64::INFINITY;
    let mut near_normal = Vec3::z();

    for (face, local_normal) in convex.faces.iter().zip(&convex.face_normals) {
        let normal = transform.direction_place_in(*local_normal);
        let plane_point = transform.point_place_in(convex.vertices[face[0]]);

        let denom = ray.direction.dot(&normal);
        let dist_to_plane = (plane_point - ray.from).dot(&normal);

        if denom.abs() < EPSILON {
            // Ray parallel to this face: outside if it starts on the wrong
            // side of the half-space.
            if dist_to_plane < 0.0 {
                return None;
            }
            continue;
        }

        let t = dist_to_plane / denom;
        if denom < 0.0 {
            // Ray entering this half-space.
            if t > t_near {
                t_near = t;
                near_normal = normal;
            }
        } else if t < t_far {
            t_far = t;
        }

        if t_near > t_far {
            return None;
        }
    }

    if t_near > t_far || t_near < 0.0 {
        return None;
    }

    Some((t_near, near_normal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Behavior, BodyId as Id};

    #[test]
    fn ray_hits_sphere_from_outside() {
        let sphere = Body::new(Id(0), vec![Shape::sphere(1.0)], ())
            .with_behavior(Behavior::Dynamic(1.0))
            .move_to(Vec3::zeros());
        let ray = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        let hit = closest_hit(ray, &[sphere]).expect("ray should hit sphere");
        assert!((hit.t - 4.0).abs() < 1e-9);
        assert!((hit.normal - Vec3::new(1.0, 0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn ray_hits_axis_aligned_box_from_outside() {
        let bx = Body::new(Id(0), vec![Shape::block(Vec3::new(1.0, 1.0, 1.0))], ())
            .with_behavior(Behavior::Dynamic(1.0))
            .move_to(Vec3::zeros());
        let ray = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        let hit = closest_hit(ray, &[bx]).expect("ray should hit box");
        assert!((hit.t - 9.0).abs() < 1e-9);
        assert!((hit.normal - Vec3::new(1.0, 0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn ray_missing_every_body_returns_none() {
        let sphere = Body::new(Id(0), vec![Shape::sphere(1.0)], ())
            .with_behavior(Behavior::Dynamic(1.0))
            .move_to(Vec3::new(100.0, 0.0, 0.0));
        let ray = Ray::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        let bodies = [sphere];
        assert!(closest_hit(ray, &bodies).is_some());
        let ray_away = Ray::new(Vec3::zeros(), Vec3::new(0.0, 1.0, 0.0));
        assert!(closest_hit(ray_away, &bodies).is_none());
    }

    #[test]
    fn empty_world_never_hits() {
        let ray = Ray::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        let bodies: Vec<Body<()>> = Vec::new();
        assert!(closest_hit(ray, &bodies).is_none());
    }

    #[test]
    fn particles_are_never_hit() {
        let particle = Body::new(Id(0), vec![Shape::particle()], ());
        let ray = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(closest_hit(ray, &[particle]).is_none());
    }
}
