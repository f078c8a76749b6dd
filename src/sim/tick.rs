//! Frame step pipeline
//!
//! Each slice runs, in order: traffic → sensors → controller → kinematics →
//! collision/goal evaluation. A frame's delta is split into slices no longer
//! than `MAX_SUBSTEP_DT`.

use super::controller::DecisionInputs;
use super::evaluate::{Evaluation, EvaluationRules, evaluate};
use super::sensors::SensorArray;
use super::state::{Simulation, SimulationStatus, StepReport};
use super::traffic::{sensor_boxes, update_traffic};
use crate::consts::*;
use crate::error::StepError;

/// Split a frame delta into `(slices, slice_dt)`
///
/// Time beyond `MAX_SUBSTEPS` full slices is dropped.
pub fn plan_substeps(dt: f32) -> (u32, f32) {
    if dt <= 0.0 {
        return (0, 0.0);
    }
    let needed = (dt / MAX_SUBSTEP_DT).ceil().max(1.0) as u32;
    if needed <= MAX_SUBSTEPS {
        (needed, dt / needed as f32)
    } else {
        log::debug!(
            "Frame delta {:.3}s exceeds {} sub-steps; dropping {:.3}s",
            dt,
            MAX_SUBSTEPS,
            dt - MAX_SUBSTEPS as f32 * MAX_SUBSTEP_DT
        );
        (MAX_SUBSTEPS, MAX_SUBSTEP_DT)
    }
}

/// Advance a running simulation by one slice of `dt` seconds
pub fn tick(sim: &mut Simulation, dt: f32) -> Evaluation {
    update_traffic(&mut sim.traffic, sim.vehicle.pos, dt);

    let traffic_boxes = sensor_boxes(&sim.traffic);
    let readings = SensorArray::new(&sim.scenario.obstacles, &sim.scenario.bounds, sim.scenario.ray_step)
        .with_traffic(&traffic_boxes)
        .read_all(&sim.vehicle);

    let cmd = sim.controller.decide(&DecisionInputs {
        vehicle: &sim.vehicle,
        readings: &readings,
        goal: sim.scenario.goal.pos,
        keys: &sim.keys,
    });

    sim.vehicle
        .integrate(&cmd, dt, &sim.scenario.bounds, sim.scenario.edge_margin);
    sim.last_command = cmd;

    let rules = EvaluationRules {
        bounce_back: sim.scenario.bounce_back,
        arrival_margin: sim.scenario.arrival_margin,
        bounds: sim.scenario.bounds,
        edge_margin: sim.scenario.edge_margin,
    };
    let eval = evaluate(&mut sim.vehicle, &sim.scenario.obstacles, &sim.scenario.goal, &rules);

    if eval.collided {
        sim.collisions += 1;
        log::debug!(
            "Collision #{} with obstacle {:?} at ({:.1}, {:.1})",
            sim.collisions,
            eval.obstacle,
            sim.vehicle.pos.x,
            sim.vehicle.pos.y
        );
    }

    if eval.goal_reached {
        sim.status = SimulationStatus::GoalReached;
    }

    eval
}

impl Simulation {
    /// Advance by a caller-measured frame delta in milliseconds
    ///
    /// Outside `Running` nothing integrates, but the report still carries
    /// fresh sensor readings. A rejected frame leaves the state unchanged.
    pub fn step(&mut self, dt_millis: f64) -> Result<StepReport, StepError> {
        if !dt_millis.is_finite() {
            log::warn!("Rejected frame with non-finite delta {dt_millis}");
            return Err(StepError::NonFiniteDelta(dt_millis));
        }
        if dt_millis < 0.0 {
            log::warn!("Rejected frame with negative delta {dt_millis}");
            return Err(StepError::NegativeDelta(dt_millis));
        }
        if self.status != SimulationStatus::Running {
            return Ok(self.report(self.status));
        }

        let vehicle_before = self.vehicle.clone();
        let traffic_before = self.traffic.clone();
        let collisions_before = self.collisions;
        let command_before = self.last_command;

        let (slices, slice_dt) = plan_substeps((dt_millis / 1000.0) as f32);
        let mut collided = false;
        for _ in 0..slices {
            let eval = tick(self, slice_dt);
            collided |= eval.collided;
            // One collision per frame; arrival is terminal
            if eval.collided || eval.goal_reached {
                break;
            }
        }

        if !self.vehicle.is_finite() || self.traffic.iter().any(|t| !t.pos.is_finite()) {
            self.vehicle = vehicle_before;
            self.traffic = traffic_before;
            self.collisions = collisions_before;
            self.last_command = command_before;
            self.status = SimulationStatus::Running;
            log::warn!("Rejected frame: vehicle pose became non-finite");
            return Err(StepError::NonFinitePose);
        }

        self.elapsed_secs += dt_millis / 1000.0;

        let status = match self.status {
            SimulationStatus::GoalReached => {
                log::info!(
                    "Goal reached after {:.1}s with {} collisions",
                    self.elapsed_secs,
                    self.collisions
                );
                SimulationStatus::GoalReached
            }
            _ if collided => SimulationStatus::Collided,
            status => status,
        };
        Ok(self.report(status))
    }

    /// Advance to a monotonic frame timestamp in milliseconds
    ///
    /// The first timestamp after `start` or `reset` only sets the baseline.
    pub fn advance(&mut self, timestamp_ms: f64) -> Result<StepReport, StepError> {
        if !timestamp_ms.is_finite() {
            log::warn!("Rejected non-finite timestamp {timestamp_ms}");
            return Err(StepError::NonFiniteTimestamp(timestamp_ms));
        }
        if self.status != SimulationStatus::Running {
            return Ok(self.report(self.status));
        }

        let dt = match self.last_timestamp {
            None => 0.0,
            Some(previous) if timestamp_ms < previous => {
                log::warn!("Rejected timestamp {timestamp_ms} before {previous}");
                return Err(StepError::TimestampWentBackwards {
                    previous,
                    now: timestamp_ms,
                });
            }
            Some(previous) => timestamp_ms - previous,
        };

        let report = self.step(dt)?;
        self.last_timestamp = Some(timestamp_ms);
        Ok(report)
    }
}
