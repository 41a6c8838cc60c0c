use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vecmath::Vec3;

/// Container family named by the `shape` config field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Cube,
    Drop,
    Spot,
}

impl ShapeKind {
    pub const NAMES: &'static [&'static str] = &["cube", "drop", "spot"];

    /// Case-insensitive lookup; `None` for names outside [`ShapeKind::NAMES`].
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "cube" => Some(ShapeKind::Cube),
            "drop" => Some(ShapeKind::Drop),
            "spot" => Some(ShapeKind::Spot),
            _ => None,
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeKind::Cube => "cube",
            ShapeKind::Drop => "drop",
            ShapeKind::Spot => "spot",
        };
        f.write_str(name)
    }
}

/// Geometry parameters of the active container, angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShapeParams {
    /// Axis-aligned cube centred on the origin with half-width `radius`.
    Cube { radius: f64 },
    /// Spherical cap of a sphere of radius `radius` centred at (0, 0, radius·cos(angle)).
    Drop { radius: f64, angle: f64 },
    /// Smaller cap of the same family; `height` is carried for consumers only.
    Spot { radius: f64, angle: f64, height: f64 },
}

impl ShapeParams {
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeParams::Cube { .. } => ShapeKind::Cube,
            ShapeParams::Drop { .. } => ShapeKind::Drop,
            ShapeParams::Spot { .. } => ShapeKind::Spot,
        }
    }

    /// The container's own boundary radius (cube half-width or sphere radius).
    pub fn boundary_radius(&self) -> f64 {
        match *self {
            ShapeParams::Cube { radius } => radius,
            ShapeParams::Drop { radius, .. } => radius,
            ShapeParams::Spot { radius, .. } => radius,
        }
    }
}

/// Behaviour of the collision resolver when an iteration finds no boundary hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverMode {
    /// Return the raw displacement untouched, even after a partial slide.
    Legacy,
    /// Return the accumulated slide plus the remaining free motion, and
    /// cancel steps whose endpoint would lie outside the container.
    Corrected,
}

impl ResolverMode {
    pub const NAMES: &'static [&'static str] = &["legacy", "corrected"];

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "legacy" => Some(ResolverMode::Legacy),
            "corrected" => Some(ResolverMode::Corrected),
            _ => None,
        }
    }
}

/// Scale of the shared heading fed into free steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingMode {
    /// Particle 0's raw displacement, about `step_length` long; it starts as
    /// `step_length` along +x. Against a unit random draw this makes the walk
    /// only weakly persistent unless `deviation` is small.
    Raw,
    /// The same direction normalized to unit length; a zero displacement
    /// keeps the previous heading.
    Unit,
}

impl HeadingMode {
    pub const NAMES: &'static [&'static str] = &["raw", "unit"];

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "raw" => Some(HeadingMode::Raw),
            "unit" => Some(HeadingMode::Unit),
            _ => None,
        }
    }
}

/// Target ("egg") region. A `radius` of `None` reuses the container's boundary radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EggParams {
    pub center: Vec3,
    pub radius: Option<f64>,
}

/// Simulation parameters derived from the configuration, used frequently during simulation steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    // Container
    pub shape: ShapeParams,

    // Motion
    pub step_length: f64,
    pub deviation: f64,
    pub n_steps: usize,     // Trajectory length per particle, including the initial position
    pub n_particles: usize,
    pub seconds_per_step: f64,
    pub stick_steps: u32,   // Steps spent in surface-slide mode after a wall contact
    pub heading: HeadingMode,

    // Target
    pub egg: EggParams,

    // Run control
    pub resolver: ResolverMode,
    pub parallel: bool,
    pub seed: Option<u64>,
}
