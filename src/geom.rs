//! Planar geometry shared by the 2D and 3D variants
//!
//! The simulation runs entirely in a 2D plane. In the canvas variant that
//! plane is screen X/Y; in the 3D variant it is the Y-up ground plane (X/Z)
//! and [`Plane`] lifts planar points into world space for presentation.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::heading_vector;

/// Axis-aligned box in plane coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    #[inline]
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Canvas-style rectangle: top-left corner plus width and height
    #[inline]
    pub fn from_rect(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new(Vec2::new(x, y), Vec2::new(x + w, y + h))
    }

    /// Box centered on `center` with full extents `size`
    #[inline]
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self::new(center - half, center + half)
    }

    /// Inclusive point containment (faces count as inside)
    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Grow (or shrink, for negative `margin`) on every side
    #[inline]
    pub fn expanded(&self, margin: f32) -> Self {
        let e = Vec2::splat(margin);
        Self::new(self.min - e, self.max + e)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// True when min is strictly below max on both axes
    #[inline]
    pub fn is_proper(&self) -> bool {
        self.min.x < self.max.x && self.min.y < self.max.y
    }

    /// Clamp a point into the box shrunk by `margin`
    pub fn clamp_inside(&self, p: Vec2, margin: f32) -> Vec2 {
        let lo = self.min + Vec2::splat(margin);
        let hi = self.max - Vec2::splat(margin);
        // A margin wider than the box collapses to its center line
        Vec2::new(
            if lo.x <= hi.x { p.x.clamp(lo.x, hi.x) } else { self.center().x },
            if lo.y <= hi.y { p.y.clamp(lo.y, hi.y) } else { self.center().y },
        )
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y)
    }
}

/// Four corners of an oriented rectangle footprint
///
/// Order: front-left, front-right, rear-left, rear-right, where "left" is the
/// side toward negative relative angles.
pub fn footprint_corners(center: Vec2, heading: f32, half_length: f32, half_width: f32) -> [Vec2; 4] {
    let forward = heading_vector(heading);
    let right = forward.perp();
    let f = forward * half_length;
    let r = right * half_width;
    [center + f - r, center + f + r, center - f - r, center - f + r]
}

/// Which world plane the planar simulation maps onto
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Plane {
    /// 2D canvas: plane (x, y) is screen (x, y), y pointing down
    #[default]
    Xy,
    /// 3D Y-up world: plane (x, y) is ground (x, z), lifted by `ride_height`
    Xz { ride_height: f32 },
}

impl Plane {
    /// Lift a planar point into world space
    pub fn to_world(self, p: Vec2) -> Vec3 {
        match self {
            Plane::Xy => Vec3::new(p.x, p.y, 0.0),
            Plane::Xz { ride_height } => Vec3::new(p.x, ride_height, p.y),
        }
    }


    /// Rotation a renderer applies about the world "up" axis for a heading
    ///
    /// A Y-up scene rotates counter-clockwise seen from above, while plane
    /// headings grow from +X toward +Z, so the sign flips.
    pub fn world_yaw(self, heading: f32) -> f32 {
        match self {
            Plane::Xy => heading,
            Plane::Xz { .. } => -heading,
        }
    }

    /// World-space forward direction for a heading
    pub fn world_forward(self, heading: f32) -> Vec3 {
        let f = heading_vector(heading);
        match self {
            Plane::Xy => Vec3::new(f.x, f.y, 0.0),
            Plane::Xz { .. } => Vec3::new(f.x, 0.0, f.y),
        }
    }
}
