// meridian_sim/src/prelude.rs

// --- Re-export the core contracts alongside the concrete collaborators ---
pub use meridian_core::prelude::*;

pub use crate::algorithms::{AllanAnalysis, FreeIntegration};
pub use crate::config::{load_motion_file, load_scenario, scenario_catalog, ScenarioConfig};
pub use crate::pathgen::WaypointTrajectoryGenerator;
pub use crate::plot::PlottersBackend;
pub use crate::sensors::StochasticSynthesizer;
