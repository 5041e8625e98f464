//! Individuals and the de-duplicating pool that holds a generation.

use crate::{identity::Identity, material::Material, metrics::Metrics, Objective};
use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::{
    hash::{Hash, Hasher},
    sync::Arc,
};

/// Immutable bundle of genetic material, identity and whatever metrics
/// have been measured so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    pub material: Arc<Material>,
    pub identity: Identity,
    pub metrics: Option<Metrics>,
}

impl Individual {
    pub fn new(material: Material, identity: Identity) -> Self {
        Self {
            material: Arc::new(material),
            identity,
            metrics: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.identity.unique_id
    }

    /// The same individual carrying merged metrics. Material and identity
    /// are shared, not copied.
    pub fn with_metrics(&self, metrics: Metrics) -> Self {
        Self {
            material: Arc::clone(&self.material),
            identity: self.identity.clone(),
            metrics: Some(metrics),
        }
    }

    pub fn objective(&self, objective: &Objective) -> Option<f64> {
        self.metrics.as_ref().and_then(|m| m.objective(objective))
    }
}

// Identity semantics are by unique id, not by structural equality of the
// payload: two individuals with equal material are still two individuals.
impl PartialEq for Individual {
    fn eq(&self, other: &Self) -> bool {
        self.identity.unique_id == other.identity.unique_id
    }
}

impl Eq for Individual {}

impl Hash for Individual {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.unique_id.hash(state);
    }
}

/// An insertion-ordered collection of individuals, unique by id. Adding a
/// member that is already present is a no-op.
#[derive(Debug, Default, Clone)]
pub struct Pool {
    members: Vec<Arc<Individual>>,
    seen: FxHashSet<String>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, individual: Arc<Individual>) -> bool {
        if self.seen.insert(individual.id().to_string()) {
            self.members.push(individual);
            true
        } else {
            false
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Individual>> {
        self.members.iter()
    }

    pub fn members(&self) -> &[Arc<Individual>] {
        &self.members
    }

    /// Best member under an objective, if anyone has been evaluated.
    pub fn best(&self, objective: &Objective) -> Option<&Arc<Individual>> {
        self.members
            .iter()
            .filter(|i| i.objective(objective).is_some())
            .reduce(|best, challenger| {
                if objective.better(challenger.objective(objective), best.objective(objective)) {
                    challenger
                } else {
                    best
                }
            })
    }
}

impl FromIterator<Arc<Individual>> for Pool {
    fn from_iter<T: IntoIterator<Item = Arc<Individual>>>(iter: T) -> Self {
        let mut pool = Pool::new();
        for individual in iter {
            pool.add(individual);
        }
        pool
    }
}

impl<'a> IntoIterator for &'a Pool {
    type Item = &'a Arc<Individual>;
    type IntoIter = std::slice::Iter<'a, Arc<Individual>>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}
