//! Overlap Tests
//!
//! The runner only needs to know *whether* a hazard touches the player, not
//! how to resolve penetration. Shapes are spheres (player, pickups) and
//! axis-aligned boxes (obstacles); everything is centered on the entity's
//! position.

use serde::{Serialize, Deserialize};
use crate::math::Vec3;

/// Simple collision shapes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Collider {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
}

impl Collider {
    pub fn sphere(radius: f32) -> Self {
        Collider::Sphere { radius }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Collider::Box { half_extents }
    }
}

/// Closest point of an axis-aligned box to `point`
fn clamp_to_box(point: Vec3, center: Vec3, half: Vec3) -> Vec3 {
    Vec3::new(
        point.x.clamp(center.x - half.x, center.x + half.x),
        point.y.clamp(center.y - half.y, center.y + half.y),
        point.z.clamp(center.z - half.z, center.z + half.z),
    )
}

/// Do two shapes overlap? Touching counts as overlap.
pub fn overlaps(a_pos: Vec3, a: &Collider, b_pos: Vec3, b: &Collider) -> bool {
    match (a, b) {
        (Collider::Sphere { radius: ra }, Collider::Sphere { radius: rb }) => {
            let reach = ra + rb;
            let d = a_pos - b_pos;
            d.dot(d) <= reach * reach
        }
        (Collider::Box { half_extents: ha }, Collider::Box { half_extents: hb }) => {
            (a_pos.x - b_pos.x).abs() <= ha.x + hb.x
                && (a_pos.y - b_pos.y).abs() <= ha.y + hb.y
                && (a_pos.z - b_pos.z).abs() <= ha.z + hb.z
        }
        (Collider::Sphere { radius }, Collider::Box { half_extents }) => {
            let d = a_pos - clamp_to_box(a_pos, b_pos, *half_extents);
            d.dot(d) <= radius * radius
        }
        (Collider::Box { .. }, Collider::Sphere { .. }) => overlaps(b_pos, b, a_pos, a),
    }
}
