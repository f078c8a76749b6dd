//! Proximity sensor fan
//!
//! A pure function of vehicle pose and world geometry: calling it twice with
//! unchanged inputs yields identical readings.

use serde::{Deserialize, Serialize};

use super::raycast::{RayHit, cast, cast_boxes};
use super::vehicle::Vehicle;
use crate::geom::Aabb;
use crate::normalize_angle;

/// One ray's result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Absolute ray angle (heading + mount angle)
    pub angle: f32,
    pub hit: bool,
    /// Distance to the blocking surface, within [0, sensor_range]
    pub distance: f32,
}

/// Borrowed view of everything the sensors can see
#[derive(Debug, Clone, Copy)]
pub struct SensorArray<'a> {
    pub obstacles: &'a [Aabb],
    pub bounds: &'a Aabb,
    /// Boxes sensed with exact intersection (moving traffic)
    pub traffic: &'a [Aabb],
    /// March step for static obstacles
    pub ray_step: f32,
}

impl<'a> SensorArray<'a> {
    pub fn new(obstacles: &'a [Aabb], bounds: &'a Aabb, ray_step: f32) -> Self {
        Self {
            obstacles,
            bounds,
            traffic: &[],
            ray_step,
        }
    }

    pub fn with_traffic(mut self, traffic: &'a [Aabb]) -> Self {
        self.traffic = traffic;
        self
    }

    /// Read every mounted sensor, in mount order (most negative angle first)
    pub fn read_all(&self, vehicle: &Vehicle) -> Vec<SensorReading> {
        let range = vehicle.params.sensor_range;
        vehicle
            .params
            .sensor_angles
            .iter()
            .map(|&mount| {
                let angle = normalize_angle(vehicle.heading + mount);
                let mut hit = cast(vehicle.pos, angle, range, self.ray_step, self.obstacles, self.bounds);
                if !self.traffic.is_empty() {
                    // Only traffic in front of the static hit can block the ray
                    hit = hit.nearest(cast_boxes(vehicle.pos, angle, hit.distance, self.traffic));
                }
                reading(angle, hit)
            })
            .collect()
    }
}

fn reading(angle: f32, hit: RayHit) -> SensorReading {
    SensorReading {
        angle,
        hit: hit.hit,
        distance: hit.distance,
    }
}

/// Read all sensors against static obstacles only
pub fn read_all(vehicle: &Vehicle, obstacles: &[Aabb], bounds: &Aabb, ray_step: f32) -> Vec<SensorReading> {
    SensorArray::new(obstacles, bounds, ray_step).read_all(vehicle)
}
