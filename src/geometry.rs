use anyhow::Result;
use rand::distr::Uniform;
use rand::Rng;
use spermsim_common::{EggParams, ShapeKind, ShapeParams, Vec3};

/// Tolerance used by [`Container::classify`] to report `TempSurface`.
pub const SURFACE_TOL: f64 = 1e-9;
/// Slack used by [`Container::first_hit_normal`] when testing the boundary.
pub const HIT_TOL: f64 = 1e-12;
/// Cap on rejection-sampling draws before initial placement gives up.
const MAX_SAMPLE_ATTEMPTS: usize = 1_000_000;

/// Where a point lies relative to the active container boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStatus {
    Inside,
    TempSurface,
    Outside,
}

/// Axis-aligned cube centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cube {
    pub radius: f64, // Half-width
}

/// Sphere of `radius` centred at (0, 0, radius·cos(angle)) cut by the plane z = 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalCap {
    pub radius: f64,
    pub angle: f64,
}

/// Container variant resolved once from the configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Container {
    Cube(Cube),
    Drop(SphericalCap),
    Spot(SphericalCap),
}

impl Cube {
    pub fn classify(&self, p: Vec3) -> IoStatus {
        let r = self.radius;
        let abs = [p.x.abs(), p.y.abs(), p.z.abs()];
        if abs.iter().all(|&a| a < r) {
            IoStatus::Inside
        } else if abs.iter().any(|&a| (a - r).abs() <= SURFACE_TOL) {
            IoStatus::TempSurface
        } else {
            IoStatus::Outside
        }
    }

    /// Signed unit axis of the first face (x, y, z order) reached by `p`.
    pub fn first_hit_normal(&self, p: Vec3) -> Option<Vec3> {
        let r = self.radius;
        if p.max_abs() < r {
            return None;
        }
        (0..3)
            .find(|&axis| p[axis].abs() >= r - HIT_TOL)
            .map(|axis| Vec3::axis(axis, p[axis].signum()))
    }

    pub fn sample_point<R: Rng>(&self, rng: &mut R) -> Result<Vec3> {
        let dist = Uniform::new_inclusive(-self.radius, self.radius)?;
        Ok(Vec3::new(rng.sample(dist), rng.sample(dist), rng.sample(dist)))
    }
}

impl SphericalCap {
    pub fn center(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.radius * self.angle.cos())
    }

    pub fn classify(&self, p: Vec3) -> IoStatus {
        if p.z < 0.0 {
            return IoStatus::Outside;
        }
        let r_sq = self.radius * self.radius;
        let dist_sq = p.distance_squared(self.center());
        if dist_sq < r_sq - SURFACE_TOL {
            IoStatus::Inside
        } else if (dist_sq - r_sq).abs() <= SURFACE_TOL {
            IoStatus::TempSurface
        } else {
            IoStatus::Outside
        }
    }

    /// Supporting plane first, then the spherical wall (outward radial normal).
    pub fn first_hit_normal(&self, p: Vec3) -> Option<Vec3> {
        if p.z < 0.0 {
            return Some(-Vec3::Z);
        }
        let v = p - self.center();
        let dist = v.length();
        if dist >= self.radius - HIT_TOL {
            Some(v / dist)
        } else {
            None
        }
    }

    /// Rejection sampling inside the origin-centred ball, keeping the part
    /// above both the supporting plane and the cap's base height. The cap
    /// ball test only bites for obtuse angles, where the base lies below z = 0.
    pub fn sample_point<R: Rng>(&self, rng: &mut R) -> Result<Vec3> {
        let r = self.radius;
        let center = self.center();
        let dist = Uniform::new_inclusive(-r, r)?;
        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let p = Vec3::new(rng.sample(dist), rng.sample(dist), rng.sample(dist));
            if p.length_squared() <= r * r
                && p.z >= 0.0
                && p.z - center.z >= -SURFACE_TOL
                && p.distance_squared(center) <= r * r
            {
                return Ok(p);
            }
        }
        anyhow::bail!(
            "no interior point found after {} draws (R = {}, angle = {} rad)",
            MAX_SAMPLE_ATTEMPTS,
            r,
            self.angle
        )
    }
}

impl Container {
    pub fn from_params(shape: &ShapeParams) -> Self {
        match *shape {
            ShapeParams::Cube { radius } => Container::Cube(Cube { radius }),
            ShapeParams::Drop { radius, angle } => Container::Drop(SphericalCap { radius, angle }),
            // Spot height does not constrain the walk
            ShapeParams::Spot { radius, angle, .. } => Container::Spot(SphericalCap { radius, angle }),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Container::Cube(_) => ShapeKind::Cube,
            Container::Drop(_) => ShapeKind::Drop,
            Container::Spot(_) => ShapeKind::Spot,
        }
    }

    /// Classifies `p_after`; `_p_before` is accepted for call-site symmetry.
    pub fn classify(&self, _p_before: Vec3, p_after: Vec3) -> IoStatus {
        match self {
            Container::Cube(c) => c.classify(p_after),
            Container::Drop(cap) | Container::Spot(cap) => cap.classify(p_after),
        }
    }

    /// Outward unit normal of the boundary reached by `p_after`, if any.
    pub fn first_hit_normal(&self, _p_before: Vec3, p_after: Vec3) -> Option<Vec3> {
        match self {
            Container::Cube(c) => c.first_hit_normal(p_after),
            Container::Drop(cap) | Container::Spot(cap) => cap.first_hit_normal(p_after),
        }
    }

    pub fn sample_point<R: Rng>(&self, rng: &mut R) -> Result<Vec3> {
        match self {
            Container::Cube(c) => c.sample_point(rng),
            Container::Drop(cap) | Container::Spot(cap) => cap.sample_point(rng),
        }
    }
}

/// Target region tested after every committed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EggRegion {
    Box { center: Vec3, half_width: f64 },
    Ball { center: Vec3, radius: f64 },
}

impl EggRegion {
    /// Box for the cube, ball for drop and spot. Without an explicit radius the
    /// container's own boundary radius is reused, so for the cube every
    /// non-outside point counts as a contact.
    pub fn for_container(shape: &ShapeParams, egg: &EggParams) -> Self {
        let radius = egg.radius.unwrap_or_else(|| shape.boundary_radius());
        match shape {
            ShapeParams::Cube { .. } => EggRegion::Box { center: egg.center, half_width: radius },
            ShapeParams::Drop { .. } | ShapeParams::Spot { .. } => {
                EggRegion::Ball { center: egg.center, radius }
            }
        }
    }

    pub fn contains(&self, p: Vec3) -> bool {
        match *self {
            EggRegion::Box { center, half_width } => (p - center).max_abs() <= half_width,
            EggRegion::Ball { center, radius } => p.distance_squared(center) <= radius * radius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::f64::consts::PI;

    fn cube() -> Container {
        Container::from_params(&ShapeParams::Cube { radius: 1.0 })
    }

    fn unit_drop() -> Container {
        Container::from_params(&ShapeParams::Drop { radius: 1.0, angle: PI / 4.0 })
    }

    #[test]
    fn cube_classification_bands() {
        let c = cube();
        let o = Vec3::zero();
        assert_eq!(c.classify(o, Vec3::new(0.5, -0.9, 0.0)), IoStatus::Inside);
        assert_eq!(c.classify(o, Vec3::new(1.0, 0.0, 0.0)), IoStatus::TempSurface);
        assert_eq!(c.classify(o, Vec3::new(0.0, -1.0 - 5e-10, 0.0)), IoStatus::TempSurface);
        assert_eq!(c.classify(o, Vec3::new(0.0, 0.0, 1.5)), IoStatus::Outside);
        assert_eq!(c.classify(o, Vec3::new(1.0 + 1e-6, 0.0, 0.0)), IoStatus::Outside);
    }

    #[test]
    fn drop_classification_bands() {
        let d = unit_drop();
        let o = Vec3::zero();
        let zc = (PI / 4.0).cos();
        assert_eq!(d.classify(o, Vec3::new(0.0, 0.0, 0.2)), IoStatus::Inside);
        assert_eq!(d.classify(o, Vec3::new(0.0, 0.0, -0.01)), IoStatus::Outside);
        assert_eq!(d.classify(o, Vec3::new(0.0, 0.0, zc + 1.0)), IoStatus::TempSurface);
        assert_eq!(d.classify(o, Vec3::new(0.0, 0.0, zc + 1.5)), IoStatus::Outside);
    }

    #[test]
    fn spot_shares_the_cap_geometry() {
        let s = Container::from_params(&ShapeParams::Spot { radius: 1.0, angle: PI / 6.0, height: 1.0 });
        assert_eq!(s.kind(), ShapeKind::Spot);
        assert_eq!(s.classify(Vec3::zero(), Vec3::new(0.0, 0.0, 0.5)), IoStatus::Inside);
    }

    #[test]
    fn cube_normal_picks_first_axis_reached() {
        let c = cube();
        let o = Vec3::zero();
        assert_eq!(c.first_hit_normal(o, Vec3::new(0.3, 0.2, 0.0)), None);
        assert_eq!(c.first_hit_normal(o, Vec3::new(1.2, 0.3, 0.0)), Some(Vec3::X));
        assert_eq!(c.first_hit_normal(o, Vec3::new(-0.2, -1.5, 0.0)), Some(-Vec3::Y));
        // Both x and z are out; x wins.
        assert_eq!(c.first_hit_normal(o, Vec3::new(-1.1, 0.0, 1.3)), Some(-Vec3::X));
    }

    #[test]
    fn cap_normal_prefers_supporting_plane() {
        let d = unit_drop();
        let o = Vec3::zero();
        assert_eq!(d.first_hit_normal(o, Vec3::new(5.0, 0.0, -0.1)), Some(-Vec3::Z));
        assert_eq!(d.first_hit_normal(o, Vec3::new(0.0, 0.0, 0.5)), None);

        let zc = (PI / 4.0).cos();
        let n = d.first_hit_normal(o, Vec3::new(0.0, 1.2, zc)).unwrap();
        assert!((n - Vec3::Y).length() < 1e-12);
    }

    #[test]
    fn cube_samples_stay_in_bounds() {
        let c = Container::from_params(&ShapeParams::Cube { radius: 0.05 });
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let p = c.sample_point(&mut rng).unwrap();
            assert!(p.max_abs() <= 0.05);
            assert_ne!(c.classify(p, p), IoStatus::Outside);
        }
    }

    #[test]
    fn cap_samples_are_never_outside() {
        let mut rng = StdRng::seed_from_u64(11);
        for shape in [
            ShapeParams::Drop { radius: 1.0, angle: PI / 4.0 },
            ShapeParams::Drop { radius: 0.1, angle: 0.52 },
            ShapeParams::Spot { radius: 0.08, angle: PI / 6.0, height: 0.1 },
        ] {
            let c = Container::from_params(&shape);
            for _ in 0..1000 {
                let p = c.sample_point(&mut rng).unwrap();
                assert!(p.z >= 0.0);
                assert_ne!(c.classify(p, p), IoStatus::Outside, "{shape:?} sampled {p:?}");
            }
        }
    }

    #[test]
    fn obtuse_cap_samples_stay_in_the_cap_ball() {
        // Centre below the plane; the origin-ball and base tests alone accept
        // points outside the cap.
        let cap = Container::Drop(SphericalCap { radius: 1.0, angle: 2.0 });
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let p = cap.sample_point(&mut rng).unwrap();
            assert!(p.z >= 0.0);
            assert_ne!(cap.classify(p, p), IoStatus::Outside, "{p:?}");
        }
    }

    #[test]
    fn right_angle_cap_is_a_hemisphere() {
        let cap = Container::from_params(&ShapeParams::Drop { radius: 1.0, angle: PI / 2.0 });
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..1000 {
            let p = cap.sample_point(&mut rng).unwrap();
            assert_ne!(cap.classify(p, p), IoStatus::Outside, "{p:?}");
        }
    }

    #[test]
    fn egg_defaults_to_container_radius() {
        let egg = EggParams { center: Vec3::zero(), radius: None };
        let cube_egg = EggRegion::for_container(&ShapeParams::Cube { radius: 0.5 }, &egg);
        assert!(cube_egg.contains(Vec3::new(0.5, -0.5, 0.5)));
        assert!(!cube_egg.contains(Vec3::new(0.51, 0.0, 0.0)));

        let drop_egg = EggRegion::for_container(&ShapeParams::Drop { radius: 1.0, angle: PI / 4.0 }, &egg);
        // Origin-centred ball, not the cap centre.
        assert!(drop_egg.contains(Vec3::new(0.0, 0.0, 1.0)));
        assert!(!drop_egg.contains(Vec3::new(0.0, 0.0, 1.2)));
    }

    #[test]
    fn egg_radius_override_is_separate() {
        let egg = EggParams { center: Vec3::new(0.2, 0.0, 0.0), radius: Some(0.05) };
        let region = EggRegion::for_container(&ShapeParams::Spot { radius: 0.1, angle: 0.5, height: 0.1 }, &egg);
        assert!(region.contains(Vec3::new(0.23, 0.0, 0.0)));
        assert!(!region.contains(Vec3::zero()));
    }
}
