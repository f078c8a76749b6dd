//! Ray casting for the proximity sensors
//!
//! Static obstacles are sampled with a fixed-step march (the probe walks the
//! ray and tests containment), matching the resolution tradeoff of a stepped
//! sensor. Moving traffic boxes use an exact slab intersection.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::MAX_RAY_SAMPLES;
use crate::geom::Aabb;
use crate::heading_vector;

/// Result of casting one ray
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayHit {
    pub hit: bool,
    /// Distance to the blocking surface, or the max distance on a miss
    pub distance: f32,
}

impl RayHit {
    #[inline]
    pub fn miss(max_distance: f32) -> Self {
        Self {
            hit: false,
            distance: max_distance,
        }
    }

    #[inline]
    pub fn hit(distance: f32) -> Self {
        Self {
            hit: true,
            distance,
        }
    }

    /// Keep whichever reading is nearer; a hit beats a miss at equal range
    pub fn nearest(self, other: RayHit) -> RayHit {
        match (self.hit, other.hit) {
            (true, true) if other.distance < self.distance => other,
            (true, _) => self,
            (false, true) => other,
            (false, false) => self,
        }
    }
}

/// March a ray from `origin` along `angle` in steps of `step`
///
/// Leaving `world` counts as a hit (the edges are opaque walls), as does the
/// probe landing inside any obstacle. Obstacles thinner than one step can be
/// skipped. At most `MAX_RAY_SAMPLES` points are tested.
pub fn cast(
    origin: Vec2,
    angle: f32,
    max_distance: f32,
    step: f32,
    obstacles: &[Aabb],
    world: &Aabb,
) -> RayHit {
    let dir = heading_vector(angle);
    let step = step.max(f32::EPSILON);
    // Sample count is fixed up front; saturates for absurd ratios
    let samples = (max_distance / step).ceil().min(MAX_RAY_SAMPLES as f32) as u32;

    for i in 0..samples {
        let dist = i as f32 * step;
        if dist >= max_distance {
            break;
        }
        let p = origin + dir * dist;

        if !world.contains(p) {
            return RayHit::hit(dist);
        }
        if obstacles.iter().any(|b| b.contains(p)) {
            return RayHit::hit(dist);
        }
    }

    RayHit::miss(max_distance)
}

/// Exact ray/box intersection (slab method)
///
/// Returns the entry distance along the ray, or 0 when `origin` is already
/// inside. `None` if the box is missed or lies beyond `max_distance`.
pub fn cast_box(origin: Vec2, angle: f32, max_distance: f32, b: &Aabb) -> Option<f32> {
    if b.contains(origin) {
        return Some(0.0);
    }

    let dir = heading_vector(angle);
    let mut t_min = 0.0_f32;
    let mut t_max = max_distance;

    for axis in 0..2 {
        let (o, d, lo, hi) = (origin[axis], dir[axis], b.min[axis], b.max[axis]);
        if d.abs() < 1e-8 {
            // Parallel to this slab: must already be within it
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (mut t0, mut t1) = ((lo - o) * inv, (hi - o) * inv);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }

    Some(t_min)
}

/// Nearest exact hit over a set of boxes
pub fn cast_boxes<'a>(
    origin: Vec2,
    angle: f32,
    max_distance: f32,
    boxes: impl IntoIterator<Item = &'a Aabb>,
) -> RayHit {
    boxes
        .into_iter()
        .filter_map(|b| cast_box(origin, angle, max_distance, b))
        .fold(RayHit::miss(max_distance), |best, d| best.nearest(RayHit::hit(d)))
}
