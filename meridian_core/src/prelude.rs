// meridian_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::abstractions::{
    InitialState, MobilityProfile, MotionCommand, MotionPlan, MotionType, ReferenceTrajectory,
    SamplingConfig, SensorSuite, SensorSynthesizer, TrajectoryGenerator,
};
pub use crate::algorithm::NavAlgorithm;
pub use crate::plot::ChartBackend;

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::binding::{AlgorithmAdapter, BindingPlan};
pub use crate::capability::{CapabilityRegistry, Category};
pub use crate::container::{ContainerRole, ContainerStore, DataContainer, Payload};
pub use crate::error::SimError;
pub use crate::plot::{ChartSeries, ChartSpec, PlotDispatcher};
pub use crate::types::{names, SampleData, SampleMatrix, TrialIndex};

// --- The Engine ---
pub use crate::engine::{OrchestrationEngine, RunControl, RunState, TrialSelector};
