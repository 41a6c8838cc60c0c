//! Monte-Carlo random walks of point particles ("sperm") inside cube, drop and
//! spot containers, with tangential sliding on wall contact and logging of
//! target ("egg") contacts.

pub mod collision;
pub mod cpu_state;
pub mod geometry;
pub mod simulation;
pub mod sink;
pub mod stepping;
pub mod trajectory;

pub use collision::{CollisionResolver, Resolution};
pub use geometry::{Container, EggRegion, IoStatus};
pub use simulation::{SimulationRun, SpermSimulation};
pub use sink::{persist_run, FileSink, MemorySink, PersistenceSink, RunId};
pub use stepping::{StepGenerator, StepMode};
pub use trajectory::Trajectory;
