//! Randomness plumbing for reproduction: a small seedable rng, fixed-point
//! event probabilities, and the table controlling the operator mix.

use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};
use std::{
    fs::File,
    io::{self, Read},
};

pub const fn percent(x: u64) -> u64 {
    x * (u64::MAX / 100)
}

/// One roll against a fixed-point probability threshold.
pub fn chance(rng: &mut dyn RngCore, p: u64) -> bool {
    p > rng.next_u64()
}

/// A weighted coin for rates expressed as floats ( for example a spec's
/// per-field change rate ). Rates at or above 1.0 always pass.
pub fn chance_f64(rng: &mut dyn RngCore, rate: f64) -> bool {
    if rate >= 1.0 {
        true
    } else if rate <= 0.0 {
        false
    } else {
        chance(rng, (rate * u64::MAX as f64) as u64)
    }
}

/// Standard normal draw.
pub fn gaussian(rng: &mut dyn RngCore) -> f64 {
    StandardNormal.sample(&mut *rng)
}

/// How probable is any given [ReproductionEvent]. Updatable so a caller can
/// tune the operator mix without rebuilding the table.
pub trait Probabilities {
    type Update;
    fn probability(&self, evt: ReproductionEvent) -> u64;
    fn update(&mut self, stats: Self::Update);
}

pub trait Happens: RngCore + Probabilities {
    fn happens(&mut self, evt: ReproductionEvent) -> bool;
}

impl<T: RngCore + Probabilities> Happens for T {
    fn happens(&mut self, evt: ReproductionEvent) -> bool {
        self.probability(evt) > self.next_u64()
    }
}

macro_rules! prob_table {
    ($($evt:ident: $default:expr),+ $(,)?) => {
        ::paste::paste! {
            /// Events whose incidence is decided by a [Probabilities] table
            /// rather than by a spec-level rate.
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub enum ReproductionEvent {
                $($evt,)+
            }

            /// Fixed probability table with sane defaults.
            pub struct ProbStatic {
                $([<$evt:snake>]: u64,)+
            }

            impl Default for ProbStatic {
                fn default() -> Self {
                    Self {
                        $([<$evt:snake>]: $default,)+
                    }
                }
            }

            impl Probabilities for ProbStatic {
                type Update = (ReproductionEvent, u64);

                fn probability(&self, evt: ReproductionEvent) -> u64 {
                    match evt {
                        $(ReproductionEvent::$evt => self.[<$evt:snake>],)+
                    }
                }

                fn update(&mut self, (evt, v): Self::Update) {
                    match evt {
                        $(ReproductionEvent::$evt => self.[<$evt:snake>] = v,)+
                    }
                }
            }
        }
    };
}

prob_table! {
    // breed by crossover rather than mutation when two parents are available
    Crossover: percent(75),
    // number crossover interpolates ( binary-search ) vs extrapolates
    CrossInside: percent(70),
    // two-parent value pick takes mommy's side
    PickMommy: percent(50),
}

impl ProbStatic {
    pub fn with_overrides(mut self, updates: &[(ReproductionEvent, u64)]) -> Self {
        for update in updates {
            self.update(*update);
        }
        self
    }
}

pub struct WyRng {
    state: u64,
}

impl WyRng {
    pub fn seeded(state: u64) -> Self {
        Self { state }
    }
}

impl RngCore for WyRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    fn next_u64(&mut self) -> u64 {
        const WY_CONST_0: u64 = 0x2d35_8dcc_aa6c_78a5;
        const WY_CONST_1: u64 = 0x8bb8_4b93_962e_acc9;
        self.state = self.state.wrapping_add(WY_CONST_0);
        let t = u128::from(self.state) * u128::from(self.state ^ WY_CONST_1);
        (t as u64) ^ (t >> 64) as u64
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        let mut idx = 0;
        while idx < dst.len() {
            let lim = usize::min(8, dst.len() - idx);
            dst[idx..idx + lim].copy_from_slice(&self.next_u64().to_ne_bytes()[..lim]);
            idx += lim;
        }
    }
}

/// Bind a probability table to the rng whose rolls it judges, yielding one
/// value that is both an [RngCore] and a [Probabilities].
pub struct ProbBinding<P: Probabilities, R: RngCore> {
    p: P,
    r: R,
}

impl<P: Probabilities, R: RngCore> ProbBinding<P, R> {
    pub fn new(p: P, r: R) -> Self {
        Self { p, r }
    }

    #[allow(clippy::should_implement_trait)] // type signature is incompatible with trait Default
    pub fn default() -> ProbBinding<impl Probabilities, impl RngCore> {
        ProbBinding {
            p: ProbStatic::default(),
            r: default_rng(),
        }
    }
}

impl<P: Probabilities, R: RngCore> Probabilities for ProbBinding<P, R> {
    type Update = P::Update;

    fn probability(&self, evt: ReproductionEvent) -> u64 {
        self.p.probability(evt)
    }

    fn update(&mut self, stats: Self::Update) {
        self.p.update(stats);
    }
}

impl<P: Probabilities, R: RngCore> RngCore for ProbBinding<P, R> {
    fn next_u32(&mut self) -> u32 {
        self.r.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.r.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.r.fill_bytes(dest)
    }
}

pub fn seed_urandom() -> io::Result<u64> {
    let mut file = File::open("/dev/urandom")?;
    let mut buffer = [0u8; 8];
    file.read_exact(&mut buffer)?;
    Ok(u64::from_le_bytes(buffer))
}

pub fn default_rng() -> impl RngCore {
    WyRng::seeded(seed_urandom().unwrap_or(0x5eed))
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn assert_within_deviation(
        evt: ReproductionEvent,
        odds: f64,
        range: f64,
        happens: &mut impl Happens,
    ) {
        let samples = 10_000.;
        let expected = odds * samples;
        let max_deviation = expected * range;
        let incidence = (0..samples as usize)
            .filter(|_| happens.happens(evt))
            .count() as f64;
        assert!(
            (expected - incidence).abs() < max_deviation,
            "{evt:?}: {incidence} != {expected} ± {max_deviation}"
        );
    }

    #[test]
    fn test_deviation_defaults() {
        let mut p_bind = ProbBinding::new(
            ProbStatic::default(),
            WyRng::seeded(seed_urandom().unwrap()),
        );
        for (evt, odds) in [
            (ReproductionEvent::Crossover, 0.75),
            (ReproductionEvent::CrossInside, 0.70),
            (ReproductionEvent::PickMommy, 0.50),
        ] {
            assert_within_deviation(evt, odds, 0.33, &mut p_bind);
        }
    }

    #[test]
    fn test_overrides() {
        let p = ProbStatic::default().with_overrides(&[
            (ReproductionEvent::Crossover, 0),
            (ReproductionEvent::PickMommy, percent(100)),
        ]);
        assert_eq!(0, p.probability(ReproductionEvent::Crossover));
        assert_eq!(percent(100), p.probability(ReproductionEvent::PickMommy));
        assert_eq!(percent(70), p.probability(ReproductionEvent::CrossInside));
    }

    #[test]
    fn test_chance_f64_saturates() {
        let mut rng = WyRng::seeded(7);
        assert!((0..100).all(|_| chance_f64(&mut rng, 1.0)));
        assert!((0..100).all(|_| !chance_f64(&mut rng, 0.0)));
    }

    #[test]
    fn test_chance_f64_rate() {
        let mut rng = StdRng::seed_from_u64(11);
        let hits = (0..10_000).filter(|_| chance_f64(&mut rng, 0.3)).count();
        assert!((2_000..4_000).contains(&hits), "rate off: {hits}");
    }

    #[test]
    fn test_gaussian_moments() {
        let mut rng = StdRng::seed_from_u64(3);
        let n = 10_000;
        let draws: Vec<f64> = (0..n).map(|_| gaussian(&mut rng)).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.1, "var {var}");
    }

    #[test]
    fn test_wyrng_deterministic() {
        let mut a = WyRng::seeded(42);
        let mut b = WyRng::seeded(42);
        for _ in 0..64 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }
}
