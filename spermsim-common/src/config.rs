use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};
use std::f64::consts::{FRAC_PI_2, PI};
use std::path::Path;
use thiserror::Error;

use crate::sim_params::{EggParams, HeadingMode, ResolverMode, ShapeKind, ShapeParams, SimParams};
use crate::vecmath::Vec3;

/// Validation failure for a single configuration field.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid {field}: unknown value '{value}' (expected one of {allowed:?})")]
    UnknownValue {
        field: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("invalid {field}: must be finite and > 0, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("invalid {field}: {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("invalid {field}: must be at least 1")]
    Empty { field: &'static str },
}

impl ConfigError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::UnknownValue { field, .. }
            | ConfigError::NonPositive { field, .. }
            | ConfigError::OutOfRange { field, .. }
            | ConfigError::Empty { field } => field,
        }
    }
}

/// Trajectory dump encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Bincode,
    MessagePack,
}

impl OutputFormat {
    pub const NAMES: &'static [&'static str] = &["json", "bincode", "messagepack"];

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "bincode" => Some(OutputFormat::Bincode),
            "messagepack" | "msgpack" => Some(OutputFormat::MessagePack),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Bincode => "bin",
            OutputFormat::MessagePack => "msgpack",
        }
    }
}

// Container geometry, angles in radians
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct ContainerConfig {
    pub shape: String,
    pub radius: f64,
    #[serde(rename = "R")]
    pub drop_radius: f64,
    pub drop_angle: f64,
    #[serde(rename = "R_spot")]
    pub spot_radius: f64,
    pub theta_spot: f64,
    #[serde(rename = "H_spot")]
    pub spot_height: f64,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        ContainerConfig {
            shape: "cube".to_string(),
            radius: 1.0,
            drop_radius: 1.0,
            drop_angle: PI / 4.0,
            spot_radius: 0.1,
            theta_spot: PI / 6.0,
            spot_height: 0.1,
        }
    }
}

// Step generation and run length
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct MotionConfig {
    pub step_length: f64,
    pub n_simulation: u32,
    pub number_of_sperm: u32,
    pub deviation: f64,
    pub seconds_per_step: f64,
    pub stick_steps: u32,
    pub heading: String, // "raw" or "unit"
}

impl Default for MotionConfig {
    fn default() -> Self {
        MotionConfig {
            step_length: 0.01,
            n_simulation: 100,
            number_of_sperm: 1,
            deviation: 0.4,
            seconds_per_step: 4.0,
            stick_steps: 0,
            heading: "raw".to_string(),
        }
    }
}

// Target ("egg") region; an absent radius reuses the container radius
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct TargetConfig {
    pub egg_radius: Option<f64>,
    pub egg_center: [f64; 3],
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct RunConfig {
    pub seed: Option<u64>,
    pub parallel: bool,
    pub resolver: String, // "legacy" or "corrected"
    pub repeat: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            seed: None,
            parallel: false,
            resolver: "legacy".to_string(),
            repeat: 1,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: String,
    pub base_filename: String,
    pub format: String, // Trajectory format: "json", "bincode", "messagepack"
    pub save_trajectory: bool,
    pub save_contacts: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            directory: "output".to_string(),
            base_filename: "spermsim".to_string(),
            format: "json".to_string(),
            save_trajectory: true,
            save_contacts: true,
        }
    }
}

/// Main simulation configuration structure, loaded from a TOML file.
/// Every section and field is optional; missing values take the defaults above.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SimulationConfig {
    pub container: ContainerConfig,
    pub motion: MotionConfig,
    pub target: TargetConfig,
    pub run: RunConfig,
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads and validates the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read config file '{}'", path_ref.display()))?;
        let config = Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config file '{}'", path_ref.display()))?;
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(text).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Resolved container family. Fails on an unknown `shape`.
    pub fn shape_kind(&self) -> Result<ShapeKind, ConfigError> {
        ShapeKind::parse(&self.container.shape).ok_or_else(|| ConfigError::UnknownValue {
            field: "shape",
            value: self.container.shape.clone(),
            allowed: ShapeKind::NAMES,
        })
    }

    pub fn resolver_mode(&self) -> Result<ResolverMode, ConfigError> {
        ResolverMode::parse(&self.run.resolver).ok_or_else(|| ConfigError::UnknownValue {
            field: "resolver",
            value: self.run.resolver.clone(),
            allowed: ResolverMode::NAMES,
        })
    }

    pub fn heading_mode(&self) -> Result<HeadingMode, ConfigError> {
        HeadingMode::parse(&self.motion.heading).ok_or_else(|| ConfigError::UnknownValue {
            field: "heading",
            value: self.motion.heading.clone(),
            allowed: HeadingMode::NAMES,
        })
    }

    pub fn output_format(&self) -> Result<OutputFormat, ConfigError> {
        OutputFormat::parse(&self.output.format).ok_or_else(|| ConfigError::UnknownValue {
            field: "format",
            value: self.output.format.clone(),
            allowed: OutputFormat::NAMES,
        })
    }

    /// Checks every field eagerly; the first offending field is reported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shape_kind()?;

        let c = &self.container;
        positive("radius", c.radius)?;
        positive("R", c.drop_radius)?;
        positive("R_spot", c.spot_radius)?;
        positive("H_spot", c.spot_height)?;
        // Past a right angle the cap centre drops below the supporting plane
        in_range("drop_angle", c.drop_angle, f64::MIN_POSITIVE, FRAC_PI_2)?;
        in_range("theta_spot", c.theta_spot, f64::MIN_POSITIVE, FRAC_PI_2)?;

        let m = &self.motion;
        positive("step_length", m.step_length)?;
        positive("seconds_per_step", m.seconds_per_step)?;
        in_range("deviation", m.deviation, 0.0, 1.0)?;
        self.heading_mode()?;
        if m.n_simulation == 0 {
            return Err(ConfigError::Empty { field: "n_simulation" });
        }
        if m.number_of_sperm == 0 {
            return Err(ConfigError::Empty { field: "number_of_sperm" });
        }

        if let Some(r) = self.target.egg_radius {
            positive("egg_radius", r)?;
        }
        for &v in &self.target.egg_center {
            if !v.is_finite() {
                return Err(ConfigError::OutOfRange {
                    field: "egg_center",
                    value: v,
                    min: f64::MIN,
                    max: f64::MAX,
                });
            }
        }

        self.resolver_mode()?;
        if self.run.repeat == 0 {
            return Err(ConfigError::Empty { field: "repeat" });
        }
        self.output_format()?;
        Ok(())
    }

    /// Converts the configuration into simulation parameters used at runtime.
    pub fn get_sim_params(&self) -> Result<SimParams, ConfigError> {
        self.validate()?;
        let c = &self.container;

        let shape = match self.shape_kind()? {
            ShapeKind::Cube => ShapeParams::Cube { radius: c.radius },
            ShapeKind::Drop => ShapeParams::Drop { radius: c.drop_radius, angle: c.drop_angle },
            ShapeKind::Spot => ShapeParams::Spot {
                radius: c.spot_radius,
                angle: c.theta_spot,
                height: c.spot_height,
            },
        };

        Ok(SimParams {
            shape,
            step_length: self.motion.step_length,
            deviation: self.motion.deviation,
            n_steps: self.motion.n_simulation as usize,
            n_particles: self.motion.number_of_sperm as usize,
            seconds_per_step: self.motion.seconds_per_step,
            stick_steps: self.motion.stick_steps,
            heading: self.heading_mode()?,
            egg: EggParams {
                center: Vec3::from_array(self.target.egg_center),
                radius: self.target.egg_radius,
            },
            resolver: self.resolver_mode()?,
            parallel: self.run.parallel,
            seed: self.run.seed,
        })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn in_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, min, max })
    }
}
