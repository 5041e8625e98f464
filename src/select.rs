//! Survivor selection and breeding-parent choice over a scored pool.

use crate::{
    individual::{Individual, Pool},
    metrics::Objective,
};
use rand::{seq::index, Rng, RngCore};
use std::sync::Arc;

/// Chooses survivors from a pool. May return the pool unchanged, empty, or
/// any subset, never anything the pool does not contain.
pub trait Selector: Send + Sync {
    fn select(&self, pool: &Pool, rng: &mut dyn RngCore) -> Vec<Arc<Individual>>;
}

/// Uniform pick of up to `count` members, without replacement.
pub struct RandomSelector {
    pub count: usize,
}

impl Selector for RandomSelector {
    fn select(&self, pool: &Pool, rng: &mut dyn RngCore) -> Vec<Arc<Individual>> {
        let members = pool.members();
        let amount = usize::min(self.count, members.len());
        index::sample(&mut *rng, members.len(), amount)
            .iter()
            .map(|i| Arc::clone(&members[i]))
            .collect()
    }
}

/// Single-objective sort: best `count` first, unevaluated members lose to
/// anyone with a measurement.
pub struct BestSelector {
    pub objective: Objective,
    pub count: usize,
}

impl Selector for BestSelector {
    fn select(&self, pool: &Pool, _rng: &mut dyn RngCore) -> Vec<Arc<Individual>> {
        let mut ranked: Vec<&Arc<Individual>> = pool.members().iter().collect();
        ranked.sort_by(|l, r| {
            let (l, r) = (l.objective(&self.objective), r.objective(&self.objective));
            if self.objective.better(l, r) {
                core::cmp::Ordering::Less
            } else if self.objective.better(r, l) {
                core::cmp::Ordering::Greater
            } else {
                core::cmp::Ordering::Equal
            }
        });
        ranked
            .into_iter()
            .take(self.count)
            .map(Arc::clone)
            .collect()
    }
}

/// Multi-objective sort: fewest dominators first, first objective as the
/// tie-break. An individual dominates another when it is at least as good
/// everywhere and strictly better somewhere.
pub struct DominationSelector {
    pub objectives: Vec<Objective>,
    pub count: usize,
}

impl DominationSelector {
    fn dominates(&self, l: &Individual, r: &Individual) -> bool {
        let mut strictly = false;
        for obj in &self.objectives {
            let (l_v, r_v) = (l.objective(obj), r.objective(obj));
            if obj.better(r_v, l_v) {
                return false;
            }
            strictly |= obj.better(l_v, r_v);
        }
        strictly
    }
}

impl Selector for DominationSelector {
    fn select(&self, pool: &Pool, _rng: &mut dyn RngCore) -> Vec<Arc<Individual>> {
        let members = pool.members();
        let mut ranked: Vec<(usize, &Arc<Individual>)> = members
            .iter()
            .map(|candidate| {
                let dominators = members
                    .iter()
                    .filter(|other| self.dominates(other, candidate))
                    .count();
                (dominators, candidate)
            })
            .collect();

        let tie_break = self.objectives.first();
        ranked.sort_by(|(l_dom, l), (r_dom, r)| {
            l_dom.cmp(r_dom).then_with(|| match tie_break {
                Some(obj) if obj.better(l.objective(obj), r.objective(obj)) => {
                    core::cmp::Ordering::Less
                }
                Some(obj) if obj.better(r.objective(obj), l.objective(obj)) => {
                    core::cmp::Ordering::Greater
                }
                _ => core::cmp::Ordering::Equal,
            })
        });

        ranked
            .into_iter()
            .take(self.count)
            .map(|(_, i)| Arc::clone(i))
            .collect()
    }
}

/// Fitness-weighted random parent choice. Scores are shifted so negative
/// fitness is handled, with a small epsilon so nobody's weight is zero;
/// a pool with no measurements at all degrades to a uniform pick.
pub struct ParentPicker {
    pub objective: Objective,
}

impl ParentPicker {
    fn weight_of(&self, individual: &Individual) -> Option<f64> {
        individual.objective(&self.objective).map(|v| {
            if self.objective.maximize {
                v
            } else {
                -v
            }
        })
    }

    pub fn pick<'a>(
        &self,
        members: &'a [Arc<Individual>],
        rng: &mut dyn RngCore,
    ) -> Option<&'a Arc<Individual>> {
        if members.is_empty() {
            return None;
        }

        let scores: Vec<Option<f64>> = members.iter().map(|i| self.weight_of(i)).collect();
        let shift = scores
            .iter()
            .flatten()
            .fold(f64::INFINITY, |acc, v| acc.min(*v));
        if !shift.is_finite() {
            // nobody evaluated yet
            return members.get(rng.random_range(0..members.len()));
        }

        let epsilon = 1e-6;
        let weights: Vec<f64> = scores
            .iter()
            .map(|s| s.map_or(epsilon, |v| v - shift + epsilon))
            .collect();

        let total: f64 = weights.iter().sum();
        let mut threshold = rng.random::<f64>() * total;
        for (i, w) in weights.iter().enumerate() {
            threshold -= w;
            if threshold <= 0.0 {
                return Some(&members[i]);
            }
        }
        members.last()
    }

    /// Two weighted picks, distinct whenever the pool allows it.
    pub fn pick_pair<'a>(
        &self,
        members: &'a [Arc<Individual>],
        rng: &mut dyn RngCore,
    ) -> Option<(&'a Arc<Individual>, &'a Arc<Individual>)> {
        if members.len() < 2 {
            return None;
        }

        let mommy = self.pick(members, rng)?;
        for _ in 0..8 {
            let daddy = self.pick(members, rng)?;
            if daddy.id() != mommy.id() {
                return Some((mommy, daddy));
            }
        }

        // weighted picking keeps landing on the same member; fall back to
        // a uniform pick among the others
        let others: Vec<&Arc<Individual>> =
            members.iter().filter(|i| i.id() != mommy.id()).collect();
        others
            .get(rng.random_range(0..others.len()))
            .map(|daddy| (mommy, *daddy))
    }
}
