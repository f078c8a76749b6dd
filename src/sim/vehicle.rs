//! Vehicle state and kinematic integration

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::controller::ControlCommand;
use crate::error::ConfigError;
use crate::geom::{Aabb, footprint_corners};
use crate::{heading_vector, normalize_angle};

/// Fixed physical parameters of the driven vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleParams {
    /// Half of the body length along the heading (units)
    pub half_length: f32,
    /// Half of the body width across the heading (units)
    pub half_width: f32,
    /// Top forward speed (units/s)
    pub max_speed: f32,
    /// Throttle acceleration capacity (units/s²)
    pub accel: f32,
    /// Brake deceleration capacity (units/s²)
    pub brake: f32,
    /// Passive rolling friction (units/s²)
    pub friction: f32,
    /// Heading change at full turn input and full speed (rad/s)
    pub turn_rate: f32,
    /// Reverse speed cap as a fraction of `max_speed`
    pub reverse_factor: f32,
    /// Sensor ray length (units)
    pub sensor_range: f32,
    /// Sensor mount angles relative to heading, most negative first (rad)
    pub sensor_angles: Vec<f32>,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            half_length: 30.0,
            half_width: 16.0,
            max_speed: 150.0,
            accel: 240.0,
            brake: 350.0,
            friction: 80.0,
            turn_rate: 2.1,
            reverse_factor: crate::consts::REVERSE_FACTOR,
            sensor_range: 180.0,
            sensor_angles: vec![-0.7, -0.35, 0.0, 0.35, 0.7],
        }
    }
}

impl VehicleParams {
    /// Ground-plane sports car used by the 3D preset (meter-like units)
    pub fn ground_car() -> Self {
        Self {
            half_length: 3.0,
            half_width: 1.5,
            max_speed: 18.0,
            accel: 25.0,
            brake: 40.0,
            friction: 10.0,
            turn_rate: 1.8,
            reverse_factor: crate::consts::REVERSE_FACTOR,
            sensor_range: 22.0,
            sensor_angles: vec![-0.7, -0.35, 0.0, 0.35, 0.7],
        }
    }

    /// Reject non-physical parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("half_length", self.half_length)?;
        positive("half_width", self.half_width)?;
        positive("max_speed", self.max_speed)?;
        positive("sensor_range", self.sensor_range)?;
        non_negative("accel", self.accel)?;
        non_negative("brake", self.brake)?;
        non_negative("friction", self.friction)?;
        non_negative("turn_rate", self.turn_rate)?;

        finite("reverse_factor", self.reverse_factor)?;
        if !(0.0..=1.0).contains(&self.reverse_factor) {
            return Err(ConfigError::OutOfRange {
                name: "reverse_factor",
                value: self.reverse_factor,
                min: 0.0,
                max: 1.0,
            });
        }

        if self.sensor_angles.is_empty() {
            return Err(ConfigError::NoSensors);
        }
        for &a in &self.sensor_angles {
            finite("sensor_angle", a)?;
        }
        if self.sensor_angles.windows(2).any(|w| w[0] > w[1]) {
            return Err(ConfigError::UnsortedSensors);
        }
        Ok(())
    }
}

pub(crate) fn finite(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { name, value })
    }
}

pub(crate) fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

pub(crate) fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(name, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

/// The driven vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub pos: Vec2,
    /// Heading in radians, always within (-π, π]
    pub heading: f32,
    /// Signed speed, forward positive
    pub speed: f32,
    pub params: VehicleParams,
}

impl Vehicle {
    pub fn new(pos: Vec2, heading: f32, params: VehicleParams) -> Self {
        Self {
            pos,
            heading: normalize_angle(heading),
            speed: 0.0,
            params,
        }
    }

    #[inline]
    pub fn forward(&self) -> Vec2 {
        heading_vector(self.heading)
    }

    /// Footprint corners (front-left, front-right, rear-left, rear-right)
    pub fn corners(&self) -> [Vec2; 4] {
        footprint_corners(
            self.pos,
            self.heading,
            self.params.half_length,
            self.params.half_width,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.pos.is_finite() && self.heading.is_finite() && self.speed.is_finite()
    }

    /// Advance the vehicle by `dt` seconds under `cmd`
    ///
    /// The position ends clamped inside `bounds` shrunk by `edge_margin`.
    pub fn integrate(&mut self, cmd: &ControlCommand, dt: f32, bounds: &Aabb, edge_margin: f32) {
        if dt <= 0.0 {
            return;
        }
        let p = &self.params;

        self.speed += cmd.longitudinal * dt;

        // Friction opposes motion but never reverses it
        if self.speed > 0.0 {
            self.speed = (self.speed - p.friction * dt).max(0.0);
        } else if self.speed < 0.0 {
            self.speed = (self.speed + p.friction * dt).min(0.0);
        }

        self.speed = self
            .speed
            .clamp(-p.max_speed * p.reverse_factor, p.max_speed);

        // Turning authority scales with speed fraction
        let speed_frac = self.speed / p.max_speed;
        self.heading = normalize_angle(self.heading + cmd.turn * p.turn_rate * dt * speed_frac);

        self.pos += heading_vector(self.heading) * self.speed * dt;
        self.pos = bounds.clamp_inside(self.pos, edge_margin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> Aabb {
        Aabb::from_rect(0.0, 0.0, 900.0, 500.0)
    }

    fn car_at(x: f32, y: f32) -> Vehicle {
        Vehicle::new(Vec2::new(x, y), 0.0, VehicleParams::default())
    }

    #[test]
    fn test_integrate_zero_dt_is_noop() {
        let mut car = car_at(100.0, 250.0);
        car.speed = 80.0;
        let before = car.clone();
        let cmd = ControlCommand {
            longitudinal: 240.0,
            turn: 1.0,
        };
        car.integrate(&cmd, 0.0, &world(), 10.0);
        assert_eq!(car, before);
    }

    #[test]
    fn test_integrate_accelerates_forward() {
        let mut car = car_at(100.0, 250.0);
        let cmd = ControlCommand {
            longitudinal: 240.0,
            turn: 0.0,
        };
        car.integrate(&cmd, 0.1, &world(), 10.0);
        // 24 from throttle, 8 lost to friction
        assert!((car.speed - 16.0).abs() < 1e-4);
        assert!((car.pos.x - 101.6).abs() < 1e-3);
        assert_eq!(car.pos.y, 250.0);
    }

    #[test]
    fn test_friction_never_reverses() {
        let mut car = car_at(100.0, 250.0);
        car.speed = 2.0;
        car.integrate(&ControlCommand::default(), 0.5, &world(), 10.0);
        assert_eq!(car.speed, 0.0);

        car.speed = -2.0;
        car.integrate(&ControlCommand::default(), 0.5, &world(), 10.0);
        assert_eq!(car.speed, 0.0);
    }

    #[test]
    fn test_speed_clamped_forward_and_reverse() {
        let mut car = car_at(400.0, 250.0);
        let full = ControlCommand {
            longitudinal: 10_000.0,
            turn: 0.0,
        };
        car.integrate(&full, 1.0, &world(), 10.0);
        assert_eq!(car.speed, 150.0);

        let reverse = ControlCommand {
            longitudinal: -10_000.0,
            turn: 0.0,
        };
        car.integrate(&reverse, 1.0, &world(), 10.0);
        assert!((car.speed + 60.0).abs() < 1e-4);
    }

    #[test]
    fn test_no_turning_while_stationary() {
        let mut car = car_at(400.0, 250.0);
        let cmd = ControlCommand {
            longitudinal: 0.0,
            turn: 1.0,
        };
        car.integrate(&cmd, 0.5, &world(), 10.0);
        assert_eq!(car.heading, 0.0);
    }

    #[test]
    fn test_turn_scales_with_speed() {
        let mut slow = car_at(400.0, 250.0);
        slow.speed = 50.0;
        let mut fast = car_at(400.0, 250.0);
        fast.speed = 150.0;
        let cmd = ControlCommand {
            longitudinal: 0.0,
            turn: 1.0,
        };
        slow.integrate(&cmd, 0.05, &world(), 10.0);
        fast.integrate(&cmd, 0.05, &world(), 10.0);
        assert!(fast.heading > slow.heading);
        assert!(slow.heading > 0.0);
    }

    #[test]
    fn test_position_clamped_to_world() {
        let mut car = car_at(885.0, 250.0);
        car.speed = 150.0;
        let cmd = ControlCommand {
            longitudinal: 240.0,
            turn: 0.0,
        };
        car.integrate(&cmd, 0.5, &world(), 10.0);
        assert_eq!(car.pos.x, 890.0);
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        let mut p = VehicleParams::default();
        p.max_speed = 0.0;
        assert!(matches!(
            p.validate(),
            Err(ConfigError::NotPositive { name: "max_speed", .. })
        ));

        let mut p = VehicleParams::default();
        p.sensor_range = -5.0;
        assert!(p.validate().is_err());

        let mut p = VehicleParams::default();
        p.sensor_angles = vec![0.3, -0.3];
        assert_eq!(p.validate(), Err(ConfigError::UnsortedSensors));

        let mut p = VehicleParams::default();
        p.friction = f32::NAN;
        assert!(matches!(p.validate(), Err(ConfigError::NotFinite { .. })));

        assert!(VehicleParams::default().validate().is_ok());
        assert!(VehicleParams::ground_car().validate().is_ok());
    }
}
