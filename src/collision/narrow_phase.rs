//! Narrow phase manifold generation for each supported shape pair.
//!
//! Convex-convex overlap uses the Separating Axis Theorem only — no
//! GJK/EPA. A degenerate or separating pair simply contributes zero
//! contacts; this module never errors.

use tracing::trace;

use crate::body::Body;
use crate::collision::{Aabb, Contact, ContactGroup};
use crate::math::{Transform3d, Vec3, EPSILON};
use crate::shapes::{Convex, Shape, ShapeKind};

/// Generates the contact manifold between two bodies, dispatching over
/// every world-space-AABB-overlapping shape pair they carry. Skips
/// (plane, plane) and (particle, particle).
pub fn generate_contacts<T>(body1: &Body<T>, body2: &Body<T>) -> Option<ContactGroup> {
    let mut contacts = Vec::new();

    for (s1, t1) in body1.shapes().iter().zip(body1.world_shapes()) {
        for (s2, t2) in body2.shapes().iter().zip(body2.world_shapes()) {
            if s1.is_plane() && s2.is_plane() {
                continue;
            }
            if s1.is_particle() && s2.is_particle() {
                continue;
            }
            if !shape_aabbs_overlap(s1, t1, s2, t2) {
                continue;
            }
            contacts.extend(dispatch_pair(s1, t1, s2, t2));
        }
    }

    if contacts.is_empty() {
        return None;
    }

    Some(ContactGroup {
        body1: body1.id(),
        body2: body2.id(),
        contacts,
    })
}

fn shape_aabb(shape: &Shape, transform: &Transform3d) -> Option<Aabb> {
    match &shape.kind {
        ShapeKind::Convex(c) => {
            Aabb::from_points(c.vertices.iter().map(|v| transform.point_place_in(*v)))
        }
        ShapeKind::Sphere(r) => Some(Aabb::sphere(transform.position, *r)),
        ShapeKind::Plane | ShapeKind::Particle => None,
    }
}

fn shape_aabbs_overlap(s1: &Shape, t1: &Transform3d, s2: &Shape, t2: &Transform3d) -> bool {
    match (shape_aabb(s1, t1), shape_aabb(s2, t2)) {
        (Some(a), Some(b)) => a.overlaps(&b),
        // A plane's extent is infinite; without a finite AABB it's always a
        // broad-phase candidate against a bounded shape.
        _ => true,
    }
}

fn dispatch_pair(s1: &Shape, t1: &Transform3d, s2: &Shape, t2: &Transform3d) -> Vec<Contact> {
    use ShapeKind::*;
    match (&s1.kind, &s2.kind) {
        (Plane, Sphere(r)) => plane_sphere(t1, t2, *r).into_iter().collect(),
        (Sphere(r), Plane) => plane_sphere(t2, t1, *r)
            .into_iter()
            .map(flip)
            .collect(),
        (Plane, Convex(c)) => plane_convex(t1, t2, c),
        (Convex(c), Plane) => plane_convex(t2, t1, c).into_iter().map(flip).collect(),
        (Sphere(r1), Sphere(r2)) => sphere_sphere(t1, *r1, t2, *r2).into_iter().collect(),
        (Sphere(r), Convex(c)) => sphere_convex(t1, *r, t2, c)
            .into_iter()
            .map(flip)
            .collect(),
        (Convex(c), Sphere(r)) => sphere_convex(t2, *r, t1, c).into_iter().collect(),
        (Convex(a), Convex(b)) => convex_convex(t1, a, t2, b),
        _ => Vec::new(),
    }
}

fn flip(c: Contact) -> Contact {
    Contact {
        ni: -c.ni,
        pi: c.pj,
        pj: c.pi,
    }
}

fn plane_sphere(plane: &Transform3d, sphere: &Transform3d, radius: f64) -> Option<Contact> {
    let normal = plane.direction_place_in(Vec3::z());
    let distance = (sphere.position - plane.position).dot(&normal);
    if distance > radius {
        return None;
    }
    let pi = sphere.position - normal * distance;
    let pj = sphere.position - normal * radius;
    Some(Contact { ni: normal, pi, pj })
}

fn plane_convex(plane: &Transform3d, convex_t: &Transform3d, convex: &Convex) -> Vec<Contact> {
    let normal = plane.direction_place_in(Vec3::z());
    let mut contacts = Vec::new();
    for v in &convex.vertices {
        let world_v = convex_t.point_place_in(*v);
        let distance = (world_v - plane.position).dot(&normal);
        if distance <= 0.0 {
            let pi = world_v - normal * distance;
            contacts.push(Contact {
                ni: normal,
                pi,
                pj: world_v,
            });
        }
    }
    contacts
}

fn sphere_sphere(t1: &Transform3d, r1: f64, t2: &Transform3d, r2: f64) -> Option<Contact> {
    let delta = t2.position - t1.position;
    let dist = delta.norm();
    if dist > r1 + r2 {
        return None;
    }
    let normal = if dist > EPSILON {
        delta / dist
    } else {
        Vec3::z()
    };
    // ni points out of body1; body1's surface is toward body2 here, so the
    // contact normal is the direction from c1 to c2.
    let ni = normal;
    Some(Contact {
        ni,
        pi: t1.position + ni * r1,
        pj: t2.position - ni * r2,
    })
}

fn sphere_convex(
    sphere_t: &Transform3d,
    radius: f64,
    convex_t: &Transform3d,
    convex: &Convex,
) -> Option<Contact> {
    let center = sphere_t.position;

    let mut best_point = None;
    let mut best_dist = f64::INFINITY;

    for (face, normal) in convex.faces.iter().zip(&convex.face_normals) {
        let world_vertices: Vec<Vec3> = face
            .iter()
            .map(|&i| convex_t.point_place_in(convex.vertices[i]))
            .collect();
        let world_normal = convex_t.direction_place_in(*normal);
        let closest = closest_point_on_polygon(&world_vertices, center, world_normal);
        let dist = (closest - center).norm();
        if dist < best_dist {
            best_dist = dist;
            best_point = Some(closest);
        }
    }

    let closest = best_point?;
    if best_dist > radius {
        return None;
    }

    let outward = if best_dist > EPSILON {
        (closest - center) / best_dist
    } else {
        Vec3::z()
    };
    // Outward here points from the sphere center toward the convex's
    // surface, i.e. into the convex — the contact normal out of body1 (the
    // sphere) matches `outward`.
    Some(Contact {
        ni: outward,
        pi: center + outward * radius,
        pj: closest,
    })
}

fn closest_point_on_polygon(vertices: &[Vec3], query: Vec3, normal: Vec3) -> Vec3 {
    let plane_point = vertices[0];
    let mut point = query - normal * (query - plane_point).dot(&normal);

    let n = vertices.len();
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let edge = b - a;
        let edge_normal = edge.cross(&normal);
        if (point - a).dot(&edge_normal) > 0.0 {
            point = closest_point_on_segment(a, b, point);
        }
    }
    point
}

fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < EPSILON {
        return a;
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}

struct Axis {
    direction: Vec3,
    from_face_a: Option<usize>,
    from_face_b: Option<usize>,
}

/// SAT convex-convex: finds the minimum-overlap separating axis over
/// face normals and edge-pair cross products, then clips the incident
/// hull's nearest face against the reference hull's side planes
/// (Sutherland-Hodgman) to build the full manifold.
fn convex_convex(ta: &Transform3d, a: &Convex, tb: &Transform3d, b: &Convex) -> Vec<Contact> {
    let world_vertices_a: Vec<Vec3> = a.vertices.iter().map(|v| ta.point_place_in(*v)).collect();
    let world_vertices_b: Vec<Vec3> = b.vertices.iter().map(|v| tb.point_place_in(*v)).collect();
    let world_normals_a: Vec<Vec3> = a
        .face_normals
        .iter()
        .map(|n| ta.direction_place_in(*n))
        .collect();
    let world_normals_b: Vec<Vec3> = b
        .face_normals
        .iter()
        .map(|n| tb.direction_place_in(*n))
        .collect();
    let world_edges_a: Vec<Vec3> = a
        .unique_edges
        .iter()
        .map(|e| ta.direction_place_in(*e))
        .collect();
    let world_edges_b: Vec<Vec3> = b
        .unique_edges
        .iter()
        .map(|e| tb.direction_place_in(*e))
        .collect();

    let mut candidate_axes = Vec::with_capacity(
        world_normals_a.len() + world_normals_b.len() + world_edges_a.len() * world_edges_b.len(),
    );
    for (i, n) in world_normals_a.iter().enumerate() {
        candidate_axes.push(Axis {
            direction: *n,
            from_face_a: Some(i),
            from_face_b: None,
        });
    }
    for (i, n) in world_normals_b.iter().enumerate() {
        candidate_axes.push(Axis {
            direction: *n,
            from_face_a: None,
            from_face_b: Some(i),
        });
    }
    for ea in &world_edges_a {
        for eb in &world_edges_b {
            let cross = ea.cross(eb);
            let len = cross.norm();
            if len < EPSILON {
                continue;
            }
            candidate_axes.push(Axis {
                direction: cross / len,
                from_face_a: None,
                from_face_b: None,
            });
        }
    }

    let mut min_overlap = f64::INFINITY;
    let mut mtv_axis = Vec3::z();
    let mut mtv_source: Option<&Axis> = None;

    for axis in &candidate_axes {
        let (min_a, max_a) = project(&world_vertices_a, axis.direction);
        let (min_b, max_b) = project(&world_vertices_b, axis.direction);
        if max_a < min_b || max_b < min_a {
            return Vec::new();
        }
        let overlap = (max_a.min(max_b)) - (min_a.max(min_b));
        if overlap < min_overlap {
            min_overlap = overlap;
            mtv_axis = axis.direction;
            mtv_source = Some(axis);
        }
    }

    let centroid_a = ta.point_place_in(a.centroid);
    let centroid_b = tb.point_place_in(b.centroid);
    if mtv_axis.dot(&(centroid_b - centroid_a)) < 0.0 {
        mtv_axis = -mtv_axis;
    }

    // Pick the reference hull: whichever face (own, not the axis source) is
    // most parallel to the MTV axis wins, falling back to the axis's own
    // source face when it came from a face test rather than an edge pair.
    let best_face_a = best_matching_face(&world_normals_a, mtv_axis);
    let best_face_b = best_matching_face(&world_normals_b, -mtv_axis);

    let a_is_reference = match mtv_source {
        Some(Axis { from_face_a: Some(_), .. }) => true,
        Some(Axis { from_face_b: Some(_), .. }) => false,
        _ => best_face_a.1 >= best_face_b.1,
    };

    let (ref_vertices, ref_faces, ref_normal, ref_face, inc_vertices, inc_face_normals, inc_faces) =
        if a_is_reference {
            (
                &world_vertices_a,
                &a.faces,
                mtv_axis,
                best_face_a.0,
                &world_vertices_b,
                &world_normals_b,
                &b.faces,
            )
        } else {
            (
                &world_vertices_b,
                &b.faces,
                -mtv_axis,
                best_face_b.0,
                &world_vertices_a,
                &world_normals_a,
                &a.faces,
            )
        };

    let ref_polygon: Vec<Vec3> = ref_faces[ref_face].iter().map(|&i| ref_vertices[i]).collect();

    let incident_face = best_matching_face(inc_face_normals, -ref_normal).0;
    let incident_polygon: Vec<Vec3> = inc_faces[incident_face]
        .iter()
        .map(|&i| inc_vertices[i])
        .collect();

    let clipped = clip_against_face(&incident_polygon, &ref_polygon, ref_normal);

    let ref_point = ref_polygon[0];
    let mut contacts = Vec::new();
    for v in clipped {
        let depth = (v - ref_point).dot(&ref_normal);
        if depth <= 0.0 {
            let on_reference = v - ref_normal * depth;
            let (pi, pj) = if a_is_reference {
                (on_reference, v)
            } else {
                (v, on_reference)
            };
            contacts.push(Contact {
                ni: mtv_axis,
                pi,
                pj,
            });
        }
    }

    if contacts.is_empty() {
        trace!("SAT overlap found but incident polygon clip produced no contacts");
    }

    contacts
}

fn project(vertices: &[Vec3], axis: Vec3) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in vertices {
        let d = v.dot(&axis);
        min = min.min(d);
        max = max.max(d);
    }
    (min, max)
}

fn best_matching_face(normals: &[Vec3], axis: Vec3) -> (usize, f64) {
    normals
        .iter()
        .enumerate()
        .map(|(i, n)| (i, n.dot(&axis)))
        .fold((0, f64::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best })
}

/// Sutherland-Hodgman clip of `subject` against the side planes built from
/// each edge of `clip_polygon` (extruded along `clip_normal`).
fn clip_against_face(subject: &[Vec3], clip_polygon: &[Vec3], clip_normal: Vec3) -> Vec<Vec3> {
    let mut output = subject.to_vec();
    let n = clip_polygon.len();

    for i in 0..n {
        if output.is_empty() {
            break;
        }
        let a = clip_polygon[i];
        let b = clip_polygon[(i + 1) % n];
        let edge = b - a;
        let side_normal = edge.cross(&clip_normal).normalize();

        let mut next = Vec::with_capacity(output.len());
        for j in 0..output.len() {
            let current = output[j];
            let prev = output[(j + output.len() - 1) % output.len()];

            let current_inside = (current - a).dot(&side_normal) <= 0.0;
            let prev_inside = (prev - a).dot(&side_normal) <= 0.0;

            if current_inside {
                if !prev_inside {
                    if let Some(p) = segment_plane_intersection(prev, current, a, side_normal) {
                        next.push(p);
                    }
                }
                next.push(current);
            } else if prev_inside {
                if let Some(p) = segment_plane_intersection(prev, current, a, side_normal) {
                    next.push(p);
                }
            }
        }
        output = next;
    }

    output
}

fn segment_plane_intersection(p0: Vec3, p1: Vec3, plane_point: Vec3, plane_normal: Vec3) -> Option<Vec3> {
    let d = p1 - p0;
    let denom = d.dot(&plane_normal);
    if denom.abs() < EPSILON {
        return None;
    }
    let t = (plane_point - p0).dot(&plane_normal) / denom;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }
    Some(p0 + d * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Behavior;
    use crate::body::BodyId as Id;

    fn dynamic_box(id: u32, half: Vec3, at: Vec3) -> Body<()> {
        Body::new(Id(id), vec![Shape::block(half)], ())
            .with_behavior(Behavior::Dynamic(1.0))
            .move_to(at)
    }

    #[test]
    fn separated_boxes_produce_no_contacts() {
        let a = dynamic_box(0, Vec3::new(0.5, 0.5, 0.5), Vec3::zeros());
        let b = dynamic_box(1, Vec3::new(0.5, 0.5, 0.5), Vec3::new(10.0, 0.0, 0.0));
        assert!(generate_contacts(&a, &b).is_none());
    }

    #[test]
    fn overlapping_boxes_produce_contacts_with_normal_toward_b() {
        let a = dynamic_box(0, Vec3::new(0.5, 0.5, 0.5), Vec3::zeros());
        let b = dynamic_box(1, Vec3::new(0.5, 0.5, 0.5), Vec3::new(0.8, 0.0, 0.0));
        let group = generate_contacts(&a, &b).expect("boxes overlap");
        assert!(!group.contacts.is_empty());
        for c in &group.contacts {
            assert!(c.ni.dot(&Vec3::new(1.0, 0.0, 0.0)) > 0.0);
        }
    }

    #[test]
    fn plane_sphere_contact_normal_is_plane_normal() {
        let plane = Body::new(Id(0), vec![Shape::plane()], ());
        let sphere = Body::new(Id(1), vec![Shape::sphere(1.0)], ())
            .with_behavior(Behavior::Dynamic(1.0))
            .move_to(Vec3::new(0.0, 0.0, 0.5));
        let group = generate_contacts(&plane, &sphere).expect("sphere touches plane");
        assert_eq!(group.contacts.len(), 1);
        assert!((group.contacts[0].ni - Vec3::z()).norm() < 1e-9);
    }

    #[test]
    fn sphere_sphere_separated_has_no_contact() {
        let a = Body::new(Id(0), vec![Shape::sphere(1.0)], ())
            .with_behavior(Behavior::Dynamic(1.0))
            .move_to(Vec3::new(-5.0, 0.0, 0.0));
        let b = Body::new(Id(1), vec![Shape::sphere(1.0)], ())
            .with_behavior(Behavior::Dynamic(1.0))
            .move_to(Vec3::new(5.0, 0.0, 0.0));
        assert!(generate_contacts(&a, &b).is_none());
    }
}
