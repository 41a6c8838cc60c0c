use serde::{Deserialize, Serialize};
use spermsim_common::Vec3;

/// Fixed-size (particle, step) -> position buffer, particle-major.
///
/// Allocated once per run; the engine writes each cell exactly once in
/// increasing step order and hands the buffer out read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    n_particles: usize,
    n_steps: usize,
    positions: Vec<Vec3>,
    /// Whether the collision resolver met a boundary on the step ending in this cell.
    clipped: Vec<bool>,
}

impl Trajectory {
    pub fn new(n_particles: usize, n_steps: usize) -> Self {
        let cells = n_particles * n_steps;
        Self {
            n_particles,
            n_steps,
            positions: vec![Vec3::zero(); cells],
            clipped: vec![false; cells],
        }
    }

    #[inline(always)]
    fn index(&self, particle: usize, step: usize) -> usize {
        debug_assert!(particle < self.n_particles && step < self.n_steps);
        particle * self.n_steps + step
    }

    pub(crate) fn set(&mut self, particle: usize, step: usize, position: Vec3, clipped: bool) {
        let idx = self.index(particle, step);
        self.positions[idx] = position;
        self.clipped[idx] = clipped;
    }

    pub fn n_particles(&self) -> usize {
        self.n_particles
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// `[particles, steps, 3]`, the dimensions of the nested export.
    pub fn shape(&self) -> [usize; 3] {
        [self.n_particles, self.n_steps, 3]
    }

    pub fn position(&self, particle: usize, step: usize) -> Vec3 {
        self.positions[self.index(particle, step)]
    }

    pub fn was_clipped(&self, particle: usize, step: usize) -> bool {
        self.clipped[self.index(particle, step)]
    }

    /// All positions of one particle in step order.
    pub fn particle(&self, particle: usize) -> &[Vec3] {
        let start = particle * self.n_steps;
        &self.positions[start..start + self.n_steps]
    }

    /// Distances between consecutive positions of one particle.
    pub fn step_lengths(&self, particle: usize) -> Vec<f64> {
        self.particle(particle)
            .windows(2)
            .map(|w| w[0].distance(w[1]))
            .collect()
    }

    /// Number of clipped steps across all particles.
    pub fn clipped_count(&self) -> usize {
        self.clipped.iter().filter(|&&c| c).count()
    }

    /// `[particle][step][xyz]` nesting, ready for plotting or serialization.
    pub fn to_nested(&self) -> Vec<Vec<[f64; 3]>> {
        (0..self.n_particles)
            .map(|i| self.particle(i).iter().map(|p| p.to_array()).collect())
            .collect()
    }
}
