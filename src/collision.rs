use spermsim_common::{ResolverMode, SimParams, Vec3};

use crate::geometry::{Container, IoStatus};

/// Slide iterations attempted before giving up on a step.
pub const MAX_ITERATIONS: usize = 3;

/// Outcome of clipping one raw displacement against the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub displacement: Vec3,
    /// Outward normal of the first boundary met, `None` for a free step.
    pub wall_normal: Option<Vec3>,
}

impl Resolution {
    pub fn clipped(&self) -> bool {
        self.wall_normal.is_some()
    }
}

/// Clips raw steps by sliding along the boundary instead of bouncing off it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResolver {
    pub step_length: f64,
    pub mode: ResolverMode,
}

impl CollisionResolver {
    pub fn new(step_length: f64, mode: ResolverMode) -> Self {
        Self { step_length, mode }
    }

    pub fn from_params(params: &SimParams) -> Self {
        Self::new(params.step_length, params.resolver)
    }

    /// Resolves the move `start -> start + raw`.
    ///
    /// Each iteration looks for a boundary hit at the original target. On a
    /// hit the remaining motion is projected onto the wall's tangent plane and
    /// the particle advances one full step along it; the remaining motion is
    /// then re-measured from the new position to the same target. A remaining
    /// motion (nearly) parallel to the normal ends the slide, as does running
    /// out of iterations.
    ///
    /// In [`ResolverMode::Legacy`] an iteration without a hit returns `raw`
    /// unchanged, discarding any slide already taken.
    pub fn resolve(&self, start: Vec3, raw: Vec3, container: &Container) -> Resolution {
        let target = start + raw;
        let mut p = start;
        let mut remaining = raw;
        let mut wall_normal = None;

        for _ in 0..MAX_ITERATIONS {
            let Some(n) = container.first_hit_normal(p, p + remaining) else {
                let displacement = match self.mode {
                    ResolverMode::Legacy => raw,
                    ResolverMode::Corrected => (p + remaining) - start,
                };
                return self.finish(start, displacement, wall_normal, container);
            };
            wall_normal.get_or_insert(n);

            let Some(direction) = remaining.reject_from(n).try_normalize() else {
                break;
            };
            p += direction * self.step_length;
            remaining = target - p;
        }

        self.finish(start, p - start, wall_normal, container)
    }

    fn finish(
        &self,
        start: Vec3,
        displacement: Vec3,
        wall_normal: Option<Vec3>,
        container: &Container,
    ) -> Resolution {
        let displacement = match self.mode {
            ResolverMode::Corrected
                if container.classify(start, start + displacement) == IoStatus::Outside =>
            {
                Vec3::zero()
            }
            _ => displacement,
        };
        Resolution { displacement, wall_normal }
    }
}
