use rand::Rng;
use spermsim_common::{SimParams, Vec3};
use std::f64::consts::TAU;

/// Which rule produces the next raw displacement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepMode {
    /// Persistent random walk blending the heading with a fresh direction.
    Free,
    /// Particle adhered to a wall: move along the wall's tangent plane.
    Slide { inward_normal: Vec3 },
}

/// Produces raw displacements of exactly `step_length`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepGenerator {
    pub step_length: f64,
    /// 0 keeps the heading (ballistic), 1 ignores it (pure random walk).
    pub deviation: f64,
}

/// Isotropic unit vector from φ ~ U(0, 2π) and cos θ ~ U(-1, 1).
pub fn random_unit_vector<R: Rng>(rng: &mut R) -> Vec3 {
    let phi = rng.random_range(0.0..TAU);
    let cos_theta: f64 = rng.random_range(-1.0..=1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

impl StepGenerator {
    pub fn new(step_length: f64, deviation: f64) -> Self {
        Self { step_length, deviation }
    }

    pub fn from_params(params: &SimParams) -> Self {
        Self::new(params.step_length, params.deviation)
    }

    /// `heading` is the shared direction of the previous time step, either a
    /// raw displacement or a unit vector. Its length weighs it against the
    /// unit random draw.
    pub fn next_step<R: Rng>(&self, heading: Vec3, mode: StepMode, rng: &mut R) -> Vec3 {
        match mode {
            StepMode::Free => self.free_step(heading, rng),
            StepMode::Slide { inward_normal } => self.slide_step(heading, inward_normal),
        }
    }

    pub fn free_step<R: Rng>(&self, heading: Vec3, rng: &mut R) -> Vec3 {
        let random = random_unit_vector(rng);
        let blended = heading * (1.0 - self.deviation) + random * self.deviation;
        // Degenerate when the heading is zero at deviation 0, or cancels the draw
        let direction = blended.try_normalize().unwrap_or(random);
        direction * self.step_length
    }

    pub fn slide_step(&self, heading: Vec3, inward_normal: Vec3) -> Vec3 {
        let n = inward_normal.normalize_or_zero();
        let tangent = heading
            .reject_from(n)
            .try_normalize()
            .or_else(|| n.cross(Vec3::X).try_normalize())
            .or_else(|| n.cross(Vec3::Y).try_normalize())
            .unwrap_or(heading);
        tangent * self.step_length
    }
}
