pub mod config;
pub mod record;
pub mod sim_params;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{ConfigError, OutputFormat, SimulationConfig, ContainerConfig, MotionConfig, TargetConfig, RunConfig, OutputConfig};
pub use record::{ContactEvent, RunSummary};
pub use sim_params::{EggParams, HeadingMode, ResolverMode, ShapeKind, ShapeParams, SimParams};
pub use vecmath::Vec3;
