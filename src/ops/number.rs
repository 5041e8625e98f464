//! Numbers evolved on a range: uniform creation, gaussian mutation, and
//! inside ( interpolating ) / outside ( extrapolating ) crossover.

use crate::{
    material::Material,
    random::{chance, gaussian},
    spec::{ClampMode, NumberKind, NumberSpec, ScalingFns, ScalingRegistry},
};
use core::error::Error;
use rand::{Rng, RngCore};

/// Kernel for one number spec, working in scaled space throughout and
/// unscaling on the way out.
#[derive(Clone)]
pub struct NumberOps {
    lower_scaled: f64,
    upper_scaled: f64,
    sigma: f64,
    scaling: ScalingFns,
    kind: NumberKind,
    clamp: ClampMode,
    pub(super) cross_inside: u64,
}

impl NumberOps {
    pub(super) fn from_spec(
        spec: &NumberSpec,
        scalings: &ScalingRegistry,
        cross_inside: u64,
    ) -> Result<Self, Box<dyn Error>> {
        let scaling = scalings
            .get(&spec.scaling)
            .ok_or_else(|| format!("unknown scaling function {:?}", spec.scaling))?
            .clone();

        let lower_scaled = (scaling.scale)(spec.lower);
        let upper_scaled = (scaling.scale)(spec.upper);
        if !lower_scaled.is_finite() || !upper_scaled.is_finite() {
            return Err(format!(
                "range [{}, {}] does not scale under {:?}",
                spec.lower, spec.upper, spec.scaling
            )
            .into());
        }

        Ok(Self {
            lower_scaled,
            upper_scaled,
            sigma: spec
                .precision
                .unwrap_or((upper_scaled - lower_scaled) * 0.05),
            scaling,
            kind: spec.kind,
            clamp: spec.clamp,
            cross_inside,
        })
    }

    fn emit(&self, scaled: f64) -> Material {
        let unscaled = (self.scaling.unscale)(scaled);
        match self.kind {
            NumberKind::Float => Material::Float(unscaled),
            NumberKind::Int => Material::Int(unscaled.round() as i64),
        }
    }

    fn basis_scaled(&self, basis: &Material) -> Result<f64, Box<dyn Error>> {
        basis
            .as_f64()
            .map(|v| (self.scaling.scale)(v))
            .ok_or_else(|| format!("number suite cannot work on {}", basis.type_name()).into())
    }

    /// Uniform draw over the scaled range: inclusive lower, exclusive upper.
    pub fn create(&self, rng: &mut dyn RngCore) -> Material {
        let span = self.upper_scaled - self.lower_scaled;
        self.emit(self.lower_scaled + rng.random::<f64>() * span)
    }

    /// Perturb the basis by `N(0, 1) * sigma` in scaled space. Output only
    /// stays inside the range when the spec opted into clamping.
    pub fn mutate(&self, basis: &Material, rng: &mut dyn RngCore) -> Result<Material, Box<dyn Error>> {
        let mut scaled = self.basis_scaled(basis)? + gaussian(rng) * self.sigma;
        if self.clamp == ClampMode::Clamp {
            scaled = scaled.clamp(self.lower_scaled, self.upper_scaled);
        }
        Ok(self.emit(scaled))
    }

    pub fn crossover(
        &self,
        mommy: &Material,
        daddy: &Material,
        rng: &mut dyn RngCore,
    ) -> Result<Material, Box<dyn Error>> {
        let m = self.basis_scaled(mommy)?;
        let d = self.basis_scaled(daddy)?;

        let scaled = if chance(rng, self.cross_inside) {
            // convex combination: strictly between the parents
            m + rng.random::<f64>() * (d - m)
        } else {
            // extrapolate past the parent interval, toward whichever spec
            // bound has more room, staying on the range
            let (lo, hi) = if m <= d { (m, d) } else { (d, m) };
            let reach = rng.random::<f64>() * (hi - lo).max(self.sigma);
            let out = if self.upper_scaled - hi >= lo - self.lower_scaled {
                hi + reach
            } else {
                lo - reach
            };
            out.clamp(self.lower_scaled, self.upper_scaled)
        };

        Ok(self.emit(scaled))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::random::percent;
    use rand::{rngs::StdRng, SeedableRng};

    fn ops(spec: NumberSpec) -> NumberOps {
        NumberOps::from_spec(&spec, &ScalingRegistry::default(), percent(70)).unwrap()
    }

    #[test]
    fn test_create_in_range() {
        let ops = ops(NumberSpec::ranged(-2.0, 3.0));
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1_000 {
            let v = ops.create(&mut rng).as_f64().unwrap();
            assert!((-2.0..3.0).contains(&v), "{v} escaped range");
        }
    }

    #[test]
    fn test_int_kind_emits_ints() {
        let ops = ops(NumberSpec::int_ranged(1, 10));
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..200 {
            let v = ops.create(&mut rng);
            let v = v.as_i64().unwrap_or_else(|| panic!("not an int: {v:?}"));
            assert!((1..=10).contains(&v));
        }
    }

    #[test]
    fn test_mutate_unbounded_can_escape() {
        let ops = ops(NumberSpec {
            precision: Some(10.0),
            ..NumberSpec::ranged(0.0, 1.0)
        });
        let mut rng = StdRng::seed_from_u64(3);
        let escaped = (0..100).any(|_| {
            let v = ops.mutate(&Material::Float(0.5), &mut rng).unwrap();
            !(0.0..=1.0).contains(&v.as_f64().unwrap())
        });
        assert!(escaped, "sigma 10 never left [0, 1]");
    }

    #[test]
    fn test_mutate_clamped_stays_put() {
        let ops = ops(NumberSpec {
            precision: Some(10.0),
            ..NumberSpec::ranged(0.0, 1.0).with_clamp()
        });
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..500 {
            let v = ops.mutate(&Material::Float(0.5), &mut rng).unwrap();
            let v = v.as_f64().unwrap();
            assert!((0.0..=1.0).contains(&v), "{v} escaped clamp");
        }
    }

    #[test]
    fn test_inside_crossover_between_parents() {
        let mut ops = ops(NumberSpec::ranged(0.0, 100.0));
        ops.cross_inside = percent(100);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..500 {
            let v = ops
                .crossover(&Material::Float(20.0), &Material::Float(30.0), &mut rng)
                .unwrap()
                .as_f64()
                .unwrap();
            assert!((20.0..=30.0).contains(&v), "{v} outside parent interval");
        }
    }

    #[test]
    fn test_outside_crossover_escapes_interval() {
        let mut ops = ops(NumberSpec::ranged(0.0, 100.0));
        ops.cross_inside = 0;
        let mut rng = StdRng::seed_from_u64(6);
        let mut escaped = false;
        for _ in 0..500 {
            let v = ops
                .crossover(&Material::Float(20.0), &Material::Float(30.0), &mut rng)
                .unwrap()
                .as_f64()
                .unwrap();
            assert!((0.0..=100.0).contains(&v), "{v} escaped the spec range");
            escaped |= !(20.0..=30.0).contains(&v);
        }
        assert!(escaped, "outside crossover never left the parent interval");
    }

    #[test]
    fn test_log_scaling_draws_log_uniform() {
        let ops = NumberOps::from_spec(
            &NumberSpec {
                scaling: "log".into(),
                ..NumberSpec::ranged(1e-4, 1.0)
            },
            &ScalingRegistry::default(),
            percent(70),
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let below = (0..2_000)
            .filter(|_| ops.create(&mut rng).as_f64().unwrap() < 1e-2)
            .count();
        // log-uniform puts half the mass below the geometric midpoint
        assert!((800..1200).contains(&below), "not log-uniform: {below}");
    }

    #[test]
    fn test_log_scaling_refuses_nonpositive_range() {
        assert!(NumberOps::from_spec(
            &NumberSpec {
                scaling: "log".into(),
                ..NumberSpec::ranged(-1.0, 1.0)
            },
            &ScalingRegistry::default(),
            percent(70),
        )
        .is_err());
    }

    #[test]
    fn test_mutate_refuses_wrong_shape() {
        let ops = ops(NumberSpec::ranged(0.0, 1.0));
        let mut rng = StdRng::seed_from_u64(8);
        assert!(ops.mutate(&Material::Bool(true), &mut rng).is_err());
    }
}
