use spermsim_common::Vec3;

use crate::stepping::StepMode;

/// Remaining surface-slide steps and the wall a particle is adhered to.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StickState {
    pub remaining: u32,
    pub inward_normal: Vec3,
}

impl StickState {
    pub fn mode(&self) -> StepMode {
        if self.remaining > 0 {
            StepMode::Slide { inward_normal: self.inward_normal }
        } else {
            StepMode::Free
        }
    }
}

/// Per-particle state vectors for the step being computed.
#[derive(Debug)]
pub struct CpuState {
    pub num_particles: usize,

    // Ping-pong position buffers
    // Read by every particle during a step
    pub positions_in: Vec<Vec3>,
    // Written once per particle, swapped in after the commit
    pub positions_out: Vec<Vec3>,
    // Whether the step producing positions_out met a wall
    pub clipped_out: Vec<bool>,

    // Updated in place; each particle only touches its own entry
    pub stick: Vec<StickState>,
}

impl CpuState {
    pub fn new(initial_positions: &[Vec3]) -> Self {
        let n = initial_positions.len();
        Self {
            num_particles: n,
            positions_in: initial_positions.to_vec(),
            positions_out: vec![Vec3::zero(); n],
            clipped_out: vec![false; n],
            stick: vec![StickState::default(); n],
        }
    }

    /// Realized displacement of `particle` over the step just computed.
    pub fn displacement(&self, particle: usize) -> Vec3 {
        self.positions_out[particle] - self.positions_in[particle]
    }

    /// Swaps the input and output position buffers.
    pub fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.positions_in, &mut self.positions_out);
    }
}
