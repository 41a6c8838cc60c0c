use crate::collision::CollisionResolver;
use crate::cpu_state::{CpuState, StickState};
use crate::geometry::{Container, EggRegion, IoStatus};
use crate::stepping::StepGenerator;
use crate::trajectory::Trajectory;
use anyhow::Result;
use log::{debug, info, trace};
use rand::prelude::*;
use rayon::prelude::*;
use spermsim_common::{ContactEvent, HeadingMode, SimParams, SimulationConfig, Vec3};


/// Everything a completed run produces.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub trajectory: Trajectory,
    /// Contacts in (step, particle) order.
    pub contacts: Vec<ContactEvent>,
    /// Seed the run's generator was created from.
    pub seed: u64,
}

/// The per-particle step rule, shared read-only by all particles of a run.
#[derive(Debug, Clone, Copy)]
struct Stepper {
    generator: StepGenerator,
    resolver: CollisionResolver,
    container: Container,
    stick_steps: u32,
}

impl Stepper {
    /// Generates, resolves and commits one step; returns the new position and
    /// whether the resolver met a wall.
    fn advance<R: Rng>(&self, pos: Vec3, stick: &mut StickState, heading: Vec3, rng: &mut R) -> (Vec3, bool) {
        let mode = stick.mode();
        stick.remaining = stick.remaining.saturating_sub(1);

        let raw = self.generator.next_step(heading, mode, rng);
        let resolution = self.resolver.resolve(pos, raw, &self.container);

        if let Some(normal) = resolution.wall_normal {
            if self.stick_steps > 0 {
                *stick = StickState { remaining: self.stick_steps, inward_normal: -normal };
            }
        }
        (pos + resolution.displacement, resolution.clipped())
    }
}

/// Runs sperm random walks inside one container.
pub struct SpermSimulation {
    params: SimParams,
    container: Container,
    egg: EggRegion,
    stepper: Stepper,
    /// Seed the run RNG was created from; also the base for per-particle RNGs in parallel mode.
    seed: u64,
    rng: StdRng,
}

impl SpermSimulation {
    /// Validates the configuration and binds the container strategy.
    pub fn new(config: &SimulationConfig) -> Result<Self> {
        let params = config.get_sim_params()?;
        Self::from_params(params)
    }

    pub fn from_params(params: SimParams) -> Result<Self> {
        if params.n_particles == 0 || params.n_steps == 0 {
            anyhow::bail!(
                "need at least one particle and one step (got {} x {})",
                params.n_particles,
                params.n_steps
            );
        }
        let container = Container::from_params(&params.shape);
        let egg = EggRegion::for_container(&params.shape, &params.egg);
        let stepper = Stepper {
            generator: StepGenerator::from_params(&params),
            resolver: CollisionResolver::from_params(&params),
            container,
            stick_steps: params.stick_steps,
        };

        let seed = params.seed.unwrap_or_else(|| rand::rng().random());
        debug!("Simulation seed: {} | container: {:?} | egg: {:?}", seed, container, egg);

        Ok(Self {
            params,
            container,
            egg,
            stepper,
            seed,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn egg(&self) -> &EggRegion {
        &self.egg
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Samples every particle's start inside the container, then runs.
    pub fn run(&mut self) -> Result<SimulationRun> {
        let initial = (0..self.params.n_particles)
            .map(|_| self.container.sample_point(&mut self.rng))
            .collect::<Result<Vec<_>>>()?;
        self.run_from(&initial)
    }

    /// Runs from explicit start positions, one per particle.
    pub fn run_from(&mut self, initial: &[Vec3]) -> Result<SimulationRun> {
        let n_particles = self.params.n_particles;
        let n_steps = self.params.n_steps;
        if initial.len() != n_particles {
            anyhow::bail!("expected {} initial positions, got {}", n_particles, initial.len());
        }
        for (i, &p) in initial.iter().enumerate() {
            if !p.is_finite() || self.container.classify(p, p) == IoStatus::Outside {
                anyhow::bail!("initial position {:?} of particle {} lies outside the {}", p, i, self.container.kind());
            }
        }

        info!(
            "Running {} particle(s) x {} steps in a {} ({}).",
            n_particles,
            n_steps,
            self.container.kind(),
            if self.params.parallel { "parallel" } else { "serial" }
        );

        let mut trajectory = Trajectory::new(n_particles, n_steps);
        for (i, &p) in initial.iter().enumerate() {
            trajectory.set(i, 0, p, false);
        }

        let mut state = CpuState::new(initial);
        let mut heading = initial_heading(self.params.heading, self.params.step_length);
        let mut contacts = Vec::new();

        for step in 1..n_steps {
            if self.params.parallel {
                self.advance_parallel(step, heading, &mut state);
            } else {
                self.advance_serial(heading, &mut state);
            }

            // Commit in particle order so contacts are reproducible in both modes
            for i in 0..n_particles {
                let pos = state.positions_out[i];
                trajectory.set(i, step, pos, state.clipped_out[i]);
                if self.egg.contains(pos) {
                    contacts.push(ContactEvent {
                        sperm: i,
                        step,
                        t_sec: step as f64 * self.params.seconds_per_step,
                        position: pos,
                    });
                }
            }

            heading = next_heading(self.params.heading, heading, state.displacement(0));
            state.swap_buffers();
            trace!("Step [{}/{}] heading {:?}", step, n_steps - 1, heading);
        }

        info!(
            "Run finished: {} contact(s), {} clipped step(s).",
            contacts.len(),
            trajectory.clipped_count()
        );

        Ok(SimulationRun { trajectory, contacts, seed: self.seed })
    }

    /// All particles draw from the run's single RNG, in particle order.
    fn advance_serial(&mut self, heading: Vec3, state: &mut CpuState) {
        for i in 0..state.num_particles {
            let (pos, clipped) = self.stepper.advance(state.positions_in[i], &mut state.stick[i], heading, &mut self.rng);
            state.positions_out[i] = pos;
            state.clipped_out[i] = clipped;
        }
    }

    /// One barrier step: every particle reads the same heading and its own
    /// RNG derived from (seed, step, particle).
    fn advance_parallel(&self, step: usize, heading: Vec3, state: &mut CpuState) {
        let stepper = self.stepper;
        let seed = self.seed;
        let num_particles = state.num_particles;
        let positions_in = &state.positions_in;

        state.positions_out
            .par_iter_mut()
            .zip(state.clipped_out.par_iter_mut())
            .zip(state.stick.par_iter_mut())
            .enumerate()
            .for_each(|(idx, ((pos_out, clipped_out), stick))| {
                let stream = (step as u64)
                    .wrapping_mul(num_particles as u64)
                    .wrapping_add(idx as u64);
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(stream));
                let (pos, clipped) = stepper.advance(positions_in[idx], stick, heading, &mut rng);
                *pos_out = pos;
                *clipped_out = clipped;
            });
    }
}

/// Heading every particle reads on the first step: +x, scaled like the
/// displacements that will replace it.
pub fn initial_heading(mode: HeadingMode, step_length: f64) -> Vec3 {
    match mode {
        HeadingMode::Raw => Vec3::X * step_length,
        HeadingMode::Unit => Vec3::X,
    }
}

/// Particle 0's realized displacement becomes everyone's next heading.
pub fn next_heading(mode: HeadingMode, previous: Vec3, displacement: Vec3) -> Vec3 {
    match mode {
        // A zero displacement leaves the next free steps to the random draw
        HeadingMode::Raw => displacement,
        HeadingMode::Unit => displacement.try_normalize().unwrap_or(previous),
    }
}
