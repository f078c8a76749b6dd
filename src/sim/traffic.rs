//! Scripted lane traffic with simple speed yielding
//!
//! Each car patrols one axis, wrapping at the ends of its lane. A car slows
//! toward a stop while another car (or the ego vehicle) is close ahead and
//! eases back to its cruise speed once the lane clears. There is no
//! negotiation beyond that.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::geom::Aabb;

/// Axis a traffic lane runs along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneAxis {
    X,
    /// Second plane axis (world Z in the 3D variant)
    Y,
}

impl LaneAxis {
    #[inline]
    fn unit(self) -> Vec2 {
        match self {
            LaneAxis::X => Vec2::X,
            LaneAxis::Y => Vec2::Y,
        }
    }

    #[inline]
    fn coord(self, p: Vec2) -> f32 {
        match self {
            LaneAxis::X => p.x,
            LaneAxis::Y => p.y,
        }
    }

    #[inline]
    fn set_coord(self, p: &mut Vec2, v: f32) {
        match self {
            LaneAxis::X => p.x = v,
            LaneAxis::Y => p.y = v,
        }
    }
}

/// Scenario description of one traffic car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSpec {
    pub start: Vec2,
    pub axis: LaneAxis,
    /// Signed cruise speed along the axis (units/s)
    pub speed: f32,
    /// Lane wraps from `lane_max` to `lane_min` and back
    pub lane_min: f32,
    pub lane_max: f32,
    #[serde(default = "default_half_length")]
    pub half_length: f32,
    #[serde(default = "default_half_width")]
    pub half_width: f32,
}

fn default_half_length() -> f32 {
    2.25
}

fn default_half_width() -> f32 {
    1.2
}

/// A live traffic car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficCar {
    pub id: u32,
    pub pos: Vec2,
    pub axis: LaneAxis,
    /// Current signed speed along the axis
    pub speed: f32,
    /// Speed returned to when the lane is clear
    pub cruise_speed: f32,
    pub lane_min: f32,
    pub lane_max: f32,
    pub half_length: f32,
    pub half_width: f32,
    /// Whether the car yielded on its last update
    pub yielding: bool,
}

impl TrafficCar {
    pub fn from_spec(id: u32, spec: &TrafficSpec) -> Self {
        Self {
            id,
            pos: spec.start,
            axis: spec.axis,
            speed: spec.speed,
            cruise_speed: spec.speed,
            lane_min: spec.lane_min,
            lane_max: spec.lane_max,
            half_length: spec.half_length,
            half_width: spec.half_width,
            yielding: false,
        }
    }

    /// Facing direction, fixed by the sign of the cruise speed
    pub fn forward(&self) -> Vec2 {
        if self.cruise_speed < 0.0 {
            -self.axis.unit()
        } else {
            self.axis.unit()
        }
    }

    /// Heading angle for presentation
    pub fn heading(&self) -> f32 {
        let f = self.forward();
        f.y.atan2(f.x)
    }

    pub fn bounds(&self) -> Aabb {
        let size = match self.axis {
            LaneAxis::X => Vec2::new(self.half_length, self.half_width),
            LaneAxis::Y => Vec2::new(self.half_width, self.half_length),
        } * 2.0;
        Aabb::from_center_size(self.pos, size)
    }

    /// True if `other` sits within `radius` and roughly straight ahead
    fn is_ahead(&self, other: Vec2, radius: f32) -> bool {
        let to_other = other - self.pos;
        to_other.length() < radius && self.forward().dot(to_other.normalize_or_zero()) > TRAFFIC_AHEAD_DOT
    }

    fn wrap(&mut self) {
        let c = self.axis.coord(self.pos);
        if c > self.lane_max {
            self.axis.set_coord(&mut self.pos, self.lane_min);
        } else if c < self.lane_min {
            self.axis.set_coord(&mut self.pos, self.lane_max);
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Advance all traffic by `dt`, yielding to cars and the ego vehicle ahead
pub fn update_traffic(cars: &mut [TrafficCar], ego: Vec2, dt: f32) {
    if dt <= 0.0 {
        return;
    }

    // Decide from a snapshot so update order doesn't matter
    let positions: Vec<(u32, Vec2)> = cars.iter().map(|c| (c.id, c.pos)).collect();

    for car in cars.iter_mut() {
        let blocked_by_traffic = positions
            .iter()
            .any(|&(id, pos)| id != car.id && car.is_ahead(pos, TRAFFIC_YIELD_RADIUS));
        let blocked_by_ego = car.is_ahead(ego, TRAFFIC_YIELD_RADIUS + TRAFFIC_EGO_EXTRA_RADIUS);

        car.yielding = blocked_by_traffic || blocked_by_ego;
        car.speed = if car.yielding {
            lerp(car.speed, 0.0, dt * TRAFFIC_BRAKE_RATE)
        } else {
            lerp(car.speed, car.cruise_speed, dt * TRAFFIC_RECOVER_RATE)
        };

        car.pos += car.axis.unit() * car.speed * dt;
        car.wrap();
    }
}

/// Sensor boxes for all cars, padded by the sensor margin
pub fn sensor_boxes(cars: &[TrafficCar]) -> Vec<Aabb> {
    cars.iter()
        .map(|c| c.bounds().expanded(TRAFFIC_SENSOR_MARGIN))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(start: Vec2, axis: LaneAxis, speed: f32) -> TrafficSpec {
        TrafficSpec {
            start,
            axis,
            speed,
            lane_min: -45.0,
            lane_max: 45.0,
            half_length: default_half_length(),
            half_width: default_half_width(),
        }
    }

    const FAR_EGO: Vec2 = Vec2::new(1000.0, 1000.0);

    #[test]
    fn test_cruise_and_wrap() {
        let mut cars = vec![TrafficCar::from_spec(1, &spec(Vec2::new(44.0, 25.0), LaneAxis::X, 8.0))];
        update_traffic(&mut cars, FAR_EGO, 0.25);
        // 44 + 2 = 46 > 45 wraps to the far end
        assert_eq!(cars[0].pos.x, -45.0);
        assert_eq!(cars[0].speed, 8.0);
        assert!(!cars[0].yielding);
    }

    #[test]
    fn test_negative_lane_faces_backward() {
        let car = TrafficCar::from_spec(1, &spec(Vec2::new(20.0, 25.0), LaneAxis::X, -6.0));
        assert_eq!(car.forward(), Vec2::NEG_X);
        let car = TrafficCar::from_spec(2, &spec(Vec2::new(45.0, 0.0), LaneAxis::Y, 5.0));
        assert_eq!(car.forward(), Vec2::Y);
        let b = car.bounds();
        assert!((b.size().y - 4.5).abs() < 1e-5);
    }

    #[test]
    fn test_yields_behind_slower_car_then_recovers() {
        let mut cars = vec![
            TrafficCar::from_spec(1, &spec(Vec2::new(0.0, 0.0), LaneAxis::X, 8.0)),
            TrafficCar::from_spec(2, &spec(Vec2::new(4.0, 0.0), LaneAxis::X, 0.0)),
        ];
        for _ in 0..30 {
            update_traffic(&mut cars, FAR_EGO, 1.0 / 60.0);
        }
        assert!(cars[0].yielding);
        assert!(cars[0].speed < 8.0);
        // The stationary car is not blocked by the one behind it
        assert!(!cars[1].yielding);

        // Blocker leaves the lane
        cars[1].pos = Vec2::new(0.0, 30.0);
        for _ in 0..240 {
            update_traffic(&mut cars, FAR_EGO, 1.0 / 60.0);
        }
        assert!(!cars[0].yielding);
        assert!(cars[0].speed > 7.5);
    }

    #[test]
    fn test_yields_to_ego_vehicle() {
        let mut cars = vec![TrafficCar::from_spec(1, &spec(Vec2::new(0.0, 0.0), LaneAxis::X, 8.0))];
        update_traffic(&mut cars, Vec2::new(7.0, 0.0), 0.1);
        assert!(cars[0].yielding);
        assert!(cars[0].speed < 8.0);

        // Ego beside, not ahead
        let mut cars = vec![TrafficCar::from_spec(1, &spec(Vec2::new(0.0, 0.0), LaneAxis::X, 8.0))];
        update_traffic(&mut cars, Vec2::new(0.0, 5.0), 0.1);
        assert!(!cars[0].yielding);
    }
}
