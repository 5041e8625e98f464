//! Leaf operator kernels: booleans and finite value sets.

use crate::{material::Material, random::chance};
use core::error::Error;
use rand::{seq::IndexedRandom, Rng, RngCore};

/// Boolean genetic material. Creation is a fair coin, mutation is the
/// deterministic complement, crossover takes either parent's value.
#[derive(Debug, Clone)]
pub struct BoolOps {
    pub(super) pick_mommy: u64,
}

impl BoolOps {
    pub fn create(&self, rng: &mut dyn RngCore) -> Material {
        Material::Bool(rng.random())
    }

    pub fn mutate(&self, basis: &Material) -> Result<Material, Box<dyn Error>> {
        match basis {
            Material::Bool(b) => Ok(Material::Bool(!b)),
            other => Err(format!("boolean suite cannot mutate {}", other.type_name()).into()),
        }
    }

    pub fn crossover(
        &self,
        mommy: &Material,
        daddy: &Material,
        rng: &mut dyn RngCore,
    ) -> Result<Material, Box<dyn Error>> {
        for parent in [mommy, daddy] {
            if !matches!(parent, Material::Bool(_)) {
                return Err(
                    format!("boolean suite cannot cross over {}", parent.type_name()).into(),
                );
            }
        }
        Ok(if chance(rng, self.pick_mommy) {
            mommy.clone()
        } else {
            daddy.clone()
        })
    }
}

/// Pick-one-of-N enumerated values. There is no notion of a "nudge" for a
/// discrete unordered set, so mutation is simply re-creation.
#[derive(Debug, Clone)]
pub struct ValueSetOps {
    pub(super) choices: Vec<Material>,
    pub(super) pick_mommy: u64,
}

impl ValueSetOps {
    pub fn create(&self, rng: &mut dyn RngCore) -> Material {
        self.choices
            .choose(&mut *rng)
            .expect("value set validated non-empty")
            .clone()
    }

    pub fn mutate(&self, rng: &mut dyn RngCore) -> Material {
        self.create(rng)
    }

    pub fn crossover(&self, mommy: &Material, daddy: &Material, rng: &mut dyn RngCore) -> Material {
        if chance(rng, self.pick_mommy) {
            mommy.clone()
        } else {
            daddy.clone()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::random::percent;
    use rand::{rngs::StdRng, SeedableRng};

    fn bool_ops() -> BoolOps {
        BoolOps {
            pick_mommy: percent(50),
        }
    }

    #[test]
    fn test_bool_complement_involution() {
        let ops = bool_ops();
        for v in [true, false] {
            let basis = Material::Bool(v);
            let flipped = ops.mutate(&basis).unwrap();
            assert_ne!(basis, flipped);
            assert_eq!(basis, ops.mutate(&flipped).unwrap());
        }
    }

    #[test]
    fn test_bool_create_both_sides() {
        let ops = bool_ops();
        let mut rng = StdRng::seed_from_u64(1);
        let trues = (0..1_000)
            .filter(|_| ops.create(&mut rng) == Material::Bool(true))
            .count();
        assert!((300..700).contains(&trues), "biased coin: {trues}");
    }

    #[test]
    fn test_bool_mutate_refuses_wrong_shape() {
        assert!(bool_ops().mutate(&Material::Int(1)).is_err());
    }

    #[test]
    fn test_bool_crossover_picks_a_parent() {
        let ops = bool_ops();
        let mut rng = StdRng::seed_from_u64(2);
        let (m, d) = (Material::Bool(true), Material::Bool(false));
        let mut saw = [false, false];
        for _ in 0..100 {
            match ops.crossover(&m, &d, &mut rng).unwrap() {
                Material::Bool(true) => saw[0] = true,
                Material::Bool(false) => saw[1] = true,
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!([true, true], saw);
    }

    #[test]
    fn test_value_set_membership() {
        let ops = ValueSetOps {
            choices: vec!["relu".into(), "tanh".into(), "sigmoid".into()],
            pick_mommy: percent(50),
        };
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            assert!(ops.choices.contains(&ops.create(&mut rng)));
            assert!(ops.choices.contains(&ops.mutate(&mut rng)));
        }
        for _ in 0..50 {
            let child = ops.crossover(&"relu".into(), &"tanh".into(), &mut rng);
            assert!(child == "relu".into() || child == "tanh".into());
        }
    }
}
