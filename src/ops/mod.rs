//! Operator suites: the reproduction engine. A [Suite] is the
//! shape-isomorphic twin of a [ParamSpec] tree, one suite node per spec
//! node. Suites hold no material state; all randomness flows through the
//! rng handed into each call.

pub mod composite;
pub mod number;
pub mod primitive;

pub use composite::{ListOps, StructOps};
pub use number::NumberOps;
pub use primitive::{BoolOps, ValueSetOps};

use crate::{
    material::Material,
    metrics::Metrics,
    random::{Probabilities, ReproductionEvent},
    spec::{ParamSpec, ScalingRegistry},
};
use core::error::Error;
use rand::RngCore;
use std::sync::Arc;

/// One shape of genetic material, with the operator kernels able to
/// produce and alter it.
pub enum Suite {
    Boolean(BoolOps),
    ValueSet(ValueSetOps),
    Number(NumberOps),
    List(ListOps),
    Structure(StructOps),
    Void,
}

impl Suite {
    /// Build the suite tree for a validated spec tree. Event thresholds
    /// (parent pick, inside-vs-outside crossover) are baked in here from
    /// the probability table, so call sites only need an rng.
    pub fn from_spec(
        spec: &ParamSpec,
        scalings: &ScalingRegistry,
        probs: &impl Probabilities,
    ) -> Result<Self, Box<dyn Error>> {
        spec.validate(scalings)?;
        Self::build(spec, scalings, probs)
    }

    fn build(
        spec: &ParamSpec,
        scalings: &ScalingRegistry,
        probs: &impl Probabilities,
    ) -> Result<Self, Box<dyn Error>> {
        let pick_mommy = probs.probability(ReproductionEvent::PickMommy);
        Ok(match spec {
            ParamSpec::Boolean => Suite::Boolean(BoolOps { pick_mommy }),
            ParamSpec::ValueSet { choices } => Suite::ValueSet(ValueSetOps {
                choices: choices.clone(),
                pick_mommy,
            }),
            ParamSpec::Number(n) => Suite::Number(NumberOps::from_spec(
                n,
                scalings,
                probs.probability(ReproductionEvent::CrossInside),
            )?),
            ParamSpec::List {
                component,
                min_len,
                max_len,
                change_rate,
            } => Suite::List(ListOps {
                component: Box::new(Self::build(component, scalings, probs)?),
                min_len: *min_len,
                max_len: *max_len,
                change_rate: *change_rate,
            }),
            ParamSpec::Structure {
                fields,
                change_rate,
            } => Suite::Structure(StructOps {
                fields: fields
                    .iter()
                    .map(|(name, field)| {
                        Self::build(field, scalings, probs).map(|s| (name.clone(), s))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                change_rate: *change_rate,
            }),
            ParamSpec::Void => Suite::Void,
        })
    }

    /// Fresh material of this suite's shape, from no parents.
    pub fn create(&self, rng: &mut dyn RngCore) -> Material {
        match self {
            Suite::Boolean(ops) => ops.create(rng),
            Suite::ValueSet(ops) => ops.create(rng),
            Suite::Number(ops) => ops.create(rng),
            Suite::List(ops) => ops.create(rng),
            Suite::Structure(ops) => ops.create(rng),
            Suite::Void => Material::Null,
        }
    }

    /// A fresh child derived from one basis. The basis is never modified.
    /// Metrics ride along for operators that adapt to past fitness;
    /// primitive kernels ignore them.
    pub fn mutate(
        &self,
        basis: &Material,
        basis_metrics: Option<&Metrics>,
        rng: &mut dyn RngCore,
    ) -> Result<Material, Box<dyn Error>> {
        match self {
            Suite::Boolean(ops) => ops.mutate(basis),
            Suite::ValueSet(ops) => Ok(ops.mutate(rng)),
            Suite::Number(ops) => ops.mutate(basis, rng),
            Suite::List(ops) => ops.mutate(basis, basis_metrics, rng),
            Suite::Structure(ops) => ops.mutate(basis, basis_metrics, rng),
            Suite::Void => Ok(Material::Null),
        }
    }

    /// A fresh child derived from two parents.
    pub fn crossover(
        &self,
        mommy: &Material,
        daddy: &Material,
        mommy_metrics: Option<&Metrics>,
        daddy_metrics: Option<&Metrics>,
        rng: &mut dyn RngCore,
    ) -> Result<Material, Box<dyn Error>> {
        match self {
            Suite::Boolean(ops) => ops.crossover(mommy, daddy, rng),
            Suite::ValueSet(ops) => Ok(ops.crossover(mommy, daddy, rng)),
            Suite::Number(ops) => ops.crossover(mommy, daddy, rng),
            Suite::List(ops) => ops.crossover(mommy, daddy, mommy_metrics, daddy_metrics, rng),
            Suite::Structure(ops) => {
                ops.crossover(mommy, daddy, mommy_metrics, daddy_metrics, rng)
            }
            Suite::Void => Ok(Material::Null),
        }
    }
}

/// The generic reproduction contract: turn some parents (and optionally
/// their metrics) into children. Parents beyond [min_parents] are ignored;
/// fewer is an error.
pub trait GeneticOperator: Send + Sync {
    fn min_parents(&self) -> usize;

    fn max_offspring(&self) -> usize {
        1
    }

    fn create_from(
        &self,
        parents: &[&Material],
        parent_metrics: &[Option<&Metrics>],
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Material>, Box<dyn Error>>;
}

fn check_parents(op: &(impl GeneticOperator + ?Sized), parents: &[&Material]) -> Result<(), Box<dyn Error>> {
    if parents.len() < op.min_parents() {
        Err(format!(
            "operator needs {} parents, got {}",
            op.min_parents(),
            parents.len()
        )
        .into())
    } else {
        Ok(())
    }
}

/// Zero-parent operator over a suite.
pub struct Creator(pub Arc<Suite>);

impl GeneticOperator for Creator {
    fn min_parents(&self) -> usize {
        0
    }

    fn create_from(
        &self,
        _parents: &[&Material],
        _parent_metrics: &[Option<&Metrics>],
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Material>, Box<dyn Error>> {
        Ok(vec![self.0.create(rng)])
    }
}

/// One-parent operator over a suite.
pub struct Mutator(pub Arc<Suite>);

impl GeneticOperator for Mutator {
    fn min_parents(&self) -> usize {
        1
    }

    fn create_from(
        &self,
        parents: &[&Material],
        parent_metrics: &[Option<&Metrics>],
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Material>, Box<dyn Error>> {
        check_parents(self, parents)?;
        let child = self
            .0
            .mutate(parents[0], parent_metrics.first().copied().flatten(), rng)?;
        Ok(vec![child])
    }
}

/// Two-parent operator over a suite.
pub struct CrossoverOp(pub Arc<Suite>);

impl GeneticOperator for CrossoverOp {
    fn min_parents(&self) -> usize {
        2
    }

    fn create_from(
        &self,
        parents: &[&Material],
        parent_metrics: &[Option<&Metrics>],
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Material>, Box<dyn Error>> {
        check_parents(self, parents)?;
        let child = self.0.crossover(
            parents[0],
            parents[1],
            parent_metrics.first().copied().flatten(),
            parent_metrics.get(1).copied().flatten(),
            rng,
        )?;
        Ok(vec![child])
    }
}
