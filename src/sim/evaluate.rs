//! Collision and goal checks, run once per tick after integration
//!
//! The vehicle footprint is approximated by its four corners. Only the first
//! obstacle containing a corner is resolved in a tick.

use serde::{Deserialize, Serialize};

use super::vehicle::Vehicle;
use crate::consts::COLLISION_RESTITUTION;
use crate::geom::Aabb;
use crate::scenario::Goal;

/// Outcome of one evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub collided: bool,
    /// Index of the obstacle that was hit
    pub obstacle: Option<usize>,
    pub goal_reached: bool,
}

/// Response distances for this world's scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationRules {
    /// How far the vehicle is pushed back along its heading on impact
    pub bounce_back: f32,
    /// Slack added to the goal radius for arrival
    pub arrival_margin: f32,
    /// Drivable area the push-back may not leave
    pub bounds: Aabb,
    pub edge_margin: f32,
}

/// First obstacle containing any footprint corner
pub fn first_collision(vehicle: &Vehicle, obstacles: &[Aabb]) -> Option<usize> {
    let corners = vehicle.corners();
    obstacles
        .iter()
        .position(|ob| corners.iter().any(|&c| ob.contains(c)))
}

/// Check the vehicle against obstacles and the goal, applying the response
///
/// On collision the speed bounces (`speed *= -0.3`) and the vehicle is
/// nudged back opposite its heading, staying inside the bounds margin. On
/// arrival the speed is zeroed.
pub fn evaluate(vehicle: &mut Vehicle, obstacles: &[Aabb], goal: &Goal, rules: &EvaluationRules) -> Evaluation {
    let mut eval = Evaluation::default();

    if let Some(index) = first_collision(vehicle, obstacles) {
        vehicle.speed *= COLLISION_RESTITUTION;
        let pushed = vehicle.pos - vehicle.forward() * rules.bounce_back;
        vehicle.pos = rules.bounds.clamp_inside(pushed, rules.edge_margin);
        eval.collided = true;
        eval.obstacle = Some(index);
    }

    if vehicle.pos.distance(goal.pos) < goal.radius + rules.arrival_margin {
        vehicle.speed = 0.0;
        eval.goal_reached = true;
    }

    eval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::vehicle::VehicleParams;
    use glam::Vec2;

    const RULES: EvaluationRules = EvaluationRules {
        bounce_back: 10.0,
        arrival_margin: 8.0,
        bounds: Aabb {
            min: Vec2::ZERO,
            max: Vec2::new(900.0, 500.0),
        },
        edge_margin: 10.0,
    };

    fn far_goal() -> Goal {
        Goal {
            pos: Vec2::new(820.0, 250.0),
            radius: 16.0,
        }
    }

    #[test]
    fn test_corner_in_obstacle_collides() {
        let mut car = Vehicle::new(Vec2::new(100.0, 250.0), 0.0, VehicleParams::default());
        car.speed = 100.0;
        // Front bumper reaches x = 130
        let wall = Aabb::from_rect(125.0, 200.0, 20.0, 100.0);
        let eval = evaluate(&mut car, &[wall], &far_goal(), &RULES);
        assert!(eval.collided);
        assert_eq!(eval.obstacle, Some(0));
        assert!((car.speed + 30.0).abs() < 1e-4);
        assert!((car.pos.x - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_only_first_obstacle_resolved() {
        let mut car = Vehicle::new(Vec2::new(100.0, 250.0), 0.0, VehicleParams::default());
        car.speed = 100.0;
        let front = Aabb::from_rect(125.0, 200.0, 20.0, 100.0);
        let rear = Aabb::from_rect(60.0, 200.0, 15.0, 100.0);
        let eval = evaluate(&mut car, &[rear, front], &far_goal(), &RULES);
        assert_eq!(eval.obstacle, Some(0));
        // Single bounce, single nudge
        assert!((car.speed + 30.0).abs() < 1e-4);
        assert!((car.pos.x - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_push_back_stays_inside_margin() {
        // Nose into a box with the tail near the left edge
        let mut car = Vehicle::new(Vec2::new(40.0, 250.0), 0.0, VehicleParams::default());
        car.speed = 100.0;
        let wall = Aabb::from_rect(60.0, 200.0, 40.0, 100.0);
        let rules = EvaluationRules {
            bounce_back: 60.0,
            ..RULES
        };
        let eval = evaluate(&mut car, &[wall], &far_goal(), &rules);
        assert!(eval.collided);
        assert_eq!(car.pos, Vec2::new(10.0, 250.0));
    }

    #[test]
    fn test_clear_of_obstacles() {
        let mut car = Vehicle::new(Vec2::new(100.0, 250.0), 0.0, VehicleParams::default());
        let wall = Aabb::from_rect(260.0, 70.0, 60.0, 360.0);
        let eval = evaluate(&mut car, &[wall], &far_goal(), &RULES);
        assert!(!eval.collided && !eval.goal_reached);
    }

    #[test]
    fn test_vehicle_at_goal_arrives() {
        let goal = far_goal();
        let mut car = Vehicle::new(goal.pos, 0.0, VehicleParams::default());
        car.speed = 120.0;
        let eval = evaluate(&mut car, &[], &goal, &RULES);
        assert!(eval.goal_reached);
        assert_eq!(car.speed, 0.0);
    }

    #[test]
    fn test_arrival_margin_boundary() {
        let goal = far_goal();
        // 23.9 < 16 + 8
        let mut near = Vehicle::new(goal.pos - Vec2::new(23.9, 0.0), 0.0, VehicleParams::default());
        assert!(evaluate(&mut near, &[], &goal, &RULES).goal_reached);
        let mut far = Vehicle::new(goal.pos - Vec2::new(24.1, 0.0), 0.0, VehicleParams::default());
        assert!(!evaluate(&mut far, &[], &goal, &RULES).goal_reached);
    }
}
