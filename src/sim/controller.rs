//! Driving policies
//!
//! Exactly one policy is active per tick. Both turn the current situation
//! into a [`ControlCommand`] and hold no state between ticks.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::sensors::SensorReading;
use super::vehicle::{Vehicle, VehicleParams, non_negative, positive};
use crate::bearing_error;
use crate::error::ConfigError;

/// Control output consumed by the kinematic model
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    /// Requested acceleration (units/s², negative brakes or reverses)
    pub longitudinal: f32,
    /// Turn input, negative steers toward negative relative angles
    pub turn: f32,
}

/// Which policy drives the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveMode {
    Manual,
    #[default]
    Autonomous,
}

impl DriveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveMode::Manual => "manual",
            DriveMode::Autonomous => "autonomous",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "manual" => Some(DriveMode::Manual),
            "auto" | "autonomous" => Some(DriveMode::Autonomous),
            _ => None,
        }
    }
}

/// Currently held driving keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyState {
    pub forward: bool,
    pub brake: bool,
    pub left: bool,
    pub right: bool,
}

impl KeyState {
    /// Build from browser `KeyboardEvent.code` values; unknown codes are ignored
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keys = Self::default();
        for code in codes {
            match code.as_ref() {
                "KeyW" | "ArrowUp" => keys.forward = true,
                "KeyS" | "ArrowDown" => keys.brake = true,
                "KeyA" | "ArrowLeft" => keys.left = true,
                "KeyD" | "ArrowRight" => keys.right = true,
                _ => {}
            }
        }
        keys
    }
}

/// Tuning for the autonomous policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerGains {
    /// Turn input per radian of bearing error
    pub steer_gain: f32,
    /// Turn input per unit of left/right clearance difference
    pub avoid_gain: f32,
    /// Absolute bound on the autonomous turn input
    pub turn_limit: f32,
    /// Acceleration per unit/s of speed error (1/s)
    pub speed_gain: f32,
    /// Lowest fraction of max speed the danger ratio can demand
    pub danger_floor: f32,
}

impl Default for ControllerGains {
    fn default() -> Self {
        Self {
            steer_gain: 1.2,
            avoid_gain: 0.01,
            turn_limit: 1.5,
            speed_gain: 4.0,
            danger_floor: 0.2,
        }
    }
}

impl ControllerGains {
    /// Gains tuned for the meter-scale ground car
    pub fn ground_car() -> Self {
        Self {
            steer_gain: 1.4,
            avoid_gain: 0.05,
            turn_limit: 1.6,
            speed_gain: 8.0,
            danger_floor: 0.2,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("steer_gain", self.steer_gain)?;
        non_negative("avoid_gain", self.avoid_gain)?;
        positive("turn_limit", self.turn_limit)?;
        non_negative("speed_gain", self.speed_gain)?;
        if !(0.0..=1.0).contains(&self.danger_floor) {
            return Err(ConfigError::OutOfRange {
                name: "danger_floor",
                value: self.danger_floor,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}

/// Everything a policy may look at for one decision
#[derive(Debug, Clone, Copy)]
pub struct DecisionInputs<'a> {
    pub vehicle: &'a Vehicle,
    pub readings: &'a [SensorReading],
    pub goal: Vec2,
    pub keys: &'a KeyState,
}

/// The active driving policy
#[derive(Debug, Clone, PartialEq)]
pub enum Controller {
    Manual,
    Autonomous(ControllerGains),
}

impl Controller {
    pub fn for_mode(mode: DriveMode, gains: &ControllerGains) -> Self {
        match mode {
            DriveMode::Manual => Controller::Manual,
            DriveMode::Autonomous => Controller::Autonomous(gains.clone()),
        }
    }

    pub fn decide(&self, inputs: &DecisionInputs<'_>) -> ControlCommand {
        match self {
            Controller::Manual => manual_command(inputs.keys, &inputs.vehicle.params),
            Controller::Autonomous(gains) => {
                autonomous_command(inputs.vehicle, inputs.readings, inputs.goal, gains)
            }
        }
    }
}

/// Map held keys straight to a command
///
/// Throttle and brake stack when both are held; the kinematic clamp bounds
/// the result.
pub fn manual_command(keys: &KeyState, params: &VehicleParams) -> ControlCommand {
    let mut cmd = ControlCommand::default();
    if keys.forward {
        cmd.longitudinal += params.accel;
    }
    if keys.brake {
        cmd.longitudinal -= params.brake;
    }
    if keys.left {
        cmd.turn -= 1.0;
    }
    if keys.right {
        cmd.turn += 1.0;
    }
    cmd
}

/// Index of the sensor pointing most nearly straight ahead
pub fn center_sensor_index(angles: &[f32]) -> Option<usize> {
    angles
        .iter()
        .enumerate()
        .min_by(|a, b| {
            a.1.abs()
                .partial_cmp(&b.1.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
}

/// Goal-seeking steering blended with differential obstacle avoidance
///
/// Steering adds the bearing term and the clearance term with no priority
/// between them. Speed follows a danger-scaled target through a
/// proportional controller bounded by brake and throttle capacity.
pub fn autonomous_command(
    vehicle: &Vehicle,
    readings: &[SensorReading],
    goal: Vec2,
    gains: &ControllerGains,
) -> ControlCommand {
    let p = &vehicle.params;
    let bearing = bearing_error(vehicle.pos, vehicle.heading, goal);

    let avoid = match (readings.first(), readings.last()) {
        (Some(left), Some(right)) if left.hit || right.hit => {
            (right.distance - left.distance) * gains.avoid_gain
        }
        _ => 0.0,
    };

    let turn = (bearing * gains.steer_gain + avoid).clamp(-gains.turn_limit, gains.turn_limit);

    let danger = center_sensor_index(&p.sensor_angles)
        .and_then(|i| readings.get(i))
        .filter(|front| front.hit)
        .map(|front| front.distance / p.sensor_range)
        .unwrap_or(1.0);
    let desired_speed = p.max_speed * danger.clamp(gains.danger_floor, 1.0);

    let longitudinal = ((desired_speed - vehicle.speed) * gains.speed_gain).clamp(-p.brake, p.accel);

    ControlCommand { longitudinal, turn }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn reading(hit: bool, distance: f32) -> SensorReading {
        SensorReading {
            angle: 0.0,
            hit,
            distance,
        }
    }

    fn clear(range: f32) -> Vec<SensorReading> {
        (0..5).map(|_| reading(false, range)).collect()
    }

    #[test]
    fn test_key_codes() {
        let keys = KeyState::from_codes(["KeyW", "ArrowLeft", "Space"]);
        assert!(keys.forward && keys.left);
        assert!(!keys.brake && !keys.right);
    }

    #[test]
    fn test_manual_stacks_throttle_and_brake() {
        let params = VehicleParams::default();
        let keys = KeyState {
            forward: true,
            brake: true,
            left: true,
            right: false,
        };
        let cmd = manual_command(&keys, &params);
        assert_eq!(cmd.longitudinal, 240.0 - 350.0);
        assert_eq!(cmd.turn, -1.0);

        let both = KeyState {
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(manual_command(&both, &params).turn, 0.0);
    }

    #[test]
    fn test_autonomous_steers_toward_goal() {
        // Goal due +X, heading +Y
        let car = Vehicle::new(Vec2::ZERO, FRAC_PI_2, VehicleParams::default());
        let cmd = autonomous_command(&car, &clear(180.0), Vec2::new(500.0, 0.0), &ControllerGains::default());
        assert!(cmd.turn < 0.0);
        assert!(cmd.turn >= -1.5);
    }

    #[test]
    fn test_autonomous_avoids_closer_side() {
        let car = Vehicle::new(Vec2::ZERO, 0.0, VehicleParams::default());
        let mut readings = clear(180.0);
        // Left side obstructed: steer right (positive)
        readings[0] = reading(true, 40.0);
        let cmd = autonomous_command(&car, &readings, Vec2::new(500.0, 0.0), &ControllerGains::default());
        assert!((cmd.turn - 1.4).abs() < 1e-4);
    }

    #[test]
    fn test_autonomous_brakes_for_front_obstacle() {
        let gains = ControllerGains::default();
        let mut car = Vehicle::new(Vec2::ZERO, 0.0, VehicleParams::default());
        car.speed = 150.0;
        let mut readings = clear(180.0);
        readings[2] = reading(true, 18.0);
        let cmd = autonomous_command(&car, &readings, Vec2::new(500.0, 0.0), &gains);
        // Desired speed floors at 30, well below current
        assert_eq!(cmd.longitudinal, -350.0);

        let baseline = autonomous_command(&car, &clear(180.0), Vec2::new(500.0, 0.0), &gains);
        assert_eq!(baseline.longitudinal, 0.0);
    }

    #[test]
    fn test_center_sensor_index() {
        assert_eq!(center_sensor_index(&[-0.7, -0.35, 0.0, 0.35, 0.7]), Some(2));
        assert_eq!(center_sensor_index(&[-0.5, 0.1]), Some(1));
        assert_eq!(center_sensor_index(&[]), None);
    }

    #[test]
    fn test_controller_for_mode() {
        let gains = ControllerGains::default();
        assert_eq!(Controller::for_mode(DriveMode::Manual, &gains), Controller::Manual);
        assert!(matches!(
            Controller::for_mode(DriveMode::Autonomous, &gains),
            Controller::Autonomous(_)
        ));
        assert_eq!(DriveMode::from_str("Auto"), Some(DriveMode::Autonomous));
    }
}
