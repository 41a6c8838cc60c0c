use serde::{Serialize, Deserialize};

use crate::vecmath::Vec3;

/// A step whose resulting position lies inside the target ("egg") region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactEvent {
    /// Index of the particle that made contact.
    pub sperm: usize,
    /// Step index at which the contact position was reached (never 0).
    pub step: usize,
    /// Elapsed time in seconds: `step * seconds_per_step`.
    pub t_sec: f64,
    pub position: Vec3,
}

impl ContactEvent {
    /// Flat `(sperm, step, t_sec, x, y, z)` row, the layout persisted by sinks.
    pub fn to_row(&self) -> (usize, usize, f64, f64, f64, f64) {
        (self.sperm, self.step, self.t_sec, self.position.x, self.position.y, self.position.z)
    }
}

/// Per-run summary written after the contact count is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub contact_count: usize,
}
