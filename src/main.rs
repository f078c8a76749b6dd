//! Drive Sim entry point
//!
//! Native builds run a headless autopilot session and log the outcome. The
//! browser build is driven from JavaScript through `drive_sim::wasm`.
//!
//! Usage: `drive-sim [preset | scenario.json] [seconds]`

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use drive_sim::{DriveMode, Scenario, ScenarioError, Simulation, SimulationStatus, StepReport};

    /// Frame length of the headless loop (60 Hz)
    const FRAME_MS: f64 = 1000.0 / 60.0;
    const DEFAULT_TIME_LIMIT_SECS: f64 = 60.0;
    /// Log a progress line every this many frames
    const PROGRESS_EVERY: u64 = 120;

    fn load(arg: &str) -> Result<Scenario, ScenarioError> {
        match Scenario::preset(arg) {
            Some(scenario) => Ok(scenario),
            None => Scenario::load(arg),
        }
    }

    fn log_report(frame: u64, report: &StepReport) {
        log::info!(
            "frame {frame}: t={:.2}s pos=({:.1}, {:.1}) speed={:.1} goal_dist={:.1} collisions={}",
            report.metrics.elapsed_secs,
            report.pose.pos.x,
            report.pose.pos.y,
            report.pose.speed,
            report.metrics.distance_to_goal,
            report.metrics.collisions
        );
    }

    pub fn run() -> Result<SimulationStatus, Box<dyn std::error::Error>> {
        let mut args = std::env::args().skip(1);
        let scenario = load(args.next().as_deref().unwrap_or("canvas"))?;
        let time_limit = match args.next() {
            Some(secs) => secs.parse::<f64>()?,
            None => DEFAULT_TIME_LIMIT_SECS,
        };

        log::info!(
            "Running '{}' headless for up to {:.0}s ({} obstacles, {} traffic cars)",
            scenario.name,
            time_limit,
            scenario.obstacles.len(),
            scenario.traffic.len()
        );

        let mut sim = Simulation::new(scenario)?;
        sim.set_mode(DriveMode::Autonomous);
        sim.start();

        let mut frame = 0u64;
        let mut report = sim.report(sim.status());
        while sim.elapsed_secs() < time_limit {
            report = sim.step(FRAME_MS)?;
            frame += 1;
            if frame % PROGRESS_EVERY == 0 {
                log_report(frame, &report);
            }
            if report.status == SimulationStatus::GoalReached {
                break;
            }
        }

        log_report(frame, &report);
        let status = sim.status();
        match status {
            SimulationStatus::GoalReached => log::info!(
                "Goal reached in {:.2}s with {} collisions",
                sim.elapsed_secs(),
                sim.collisions()
            ),
            _ => log::warn!(
                "Time limit hit {:.1} units from the goal with {} collisions",
                sim.distance_to_goal(),
                sim.collisions()
            ),
        }
        Ok(status)
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Drive Sim (native) starting...");

    match headless::run() {
        Ok(drive_sim::SimulationStatus::GoalReached) => {}
        Ok(_) => std::process::exit(2),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_start in the library, this is just to satisfy the compiler
}
