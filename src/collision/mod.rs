//! Collision detection: broad phase pair enumeration and narrow phase
//! manifold generation.

pub mod broad_phase;
pub mod narrow_phase;

use serde::{Deserialize, Serialize};

use crate::body::BodyId;
use crate::math::Vec3;

/// Axis-aligned bounding box, in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Self {
            min: first,
            max: first,
        };
        for p in iter {
            aabb.min = aabb.min.zip_map(&p, f64::min);
            aabb.max = aabb.max.zip_map(&p, f64::max);
        }
        Some(aabb)
    }

    pub fn sphere(center: Vec3, radius: f64) -> Self {
        let r = Vec3::new(radius, radius, radius);
        Self {
            min: center - r,
            max: center + r,
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// A single contact point between two bodies, normal pointing out of
/// `body1` and into `body2`.
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    /// World-space unit normal, out of body1.
    pub ni: Vec3,
    /// World-space point on body1's surface.
    pub pi: Vec3,
    /// World-space point on body2's surface.
    pub pj: Vec3,
}

impl Contact {
    /// Penetration depth, positive when the surfaces overlap.
    pub fn depth(&self) -> f64 {
        (self.pi - self.pj).dot(&self.ni)
    }
}

/// All contacts generated between one ordered pair of bodies during a
/// single narrow-phase pass.
#[derive(Debug, Clone)]
pub struct ContactGroup {
    pub body1: BodyId,
    pub body2: BodyId,
    pub contacts: Vec<Contact>,
}

impl ContactGroup {
    pub fn bodies(&self) -> (BodyId, BodyId) {
        (self.body1, self.body2)
    }

    pub fn either(&self, id: BodyId) -> bool {
        self.body1 == id || self.body2 == id
    }

    pub fn both(&self, a: BodyId, b: BodyId) -> bool {
        (self.body1 == a && self.body2 == b) || (self.body1 == b && self.body2 == a)
    }

    pub fn points(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.iter()
    }

    /// Mean of all contact midpoints, for simple visualization/diagnostics.
    pub fn center_point(&self) -> Option<Vec3> {
        if self.contacts.is_empty() {
            return None;
        }
        let sum: Vec3 = self
            .contacts
            .iter()
            .map(|c| (c.pi + c.pj) * 0.5)
            .fold(Vec3::zeros(), |acc, v| acc + v);
        Some(sum / self.contacts.len() as f64)
    }
}
