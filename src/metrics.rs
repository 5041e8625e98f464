//! Evaluation measurements and the policies for folding fresh measurements
//! into whatever an individual already carries.

use crate::material::Material;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque measurement record produced by an evaluator. The core never
/// interprets entries beyond the named objectives a domain declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics(pub BTreeMap<String, Material>);

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Material>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.0.get(name)
    }

    /// Numeric read of one objective's metric, if present and numeric.
    pub fn objective(&self, objective: &Objective) -> Option<f64> {
        self.0.get(&objective.metric_name).and_then(Material::as_f64)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A domain's view into metrics: which key to read, and which direction
/// is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    pub metric_name: String,
    pub maximize: bool,
}

impl Objective {
    pub fn maximize(metric_name: impl Into<String>) -> Self {
        Self {
            metric_name: metric_name.into(),
            maximize: true,
        }
    }

    pub fn minimize(metric_name: impl Into<String>) -> Self {
        Self {
            metric_name: metric_name.into(),
            maximize: false,
        }
    }

    /// Is `l` better than `r` under this objective? Unevaluated loses.
    pub fn better(&self, l: Option<f64>, r: Option<f64>) -> bool {
        match (l, r) {
            (Some(l), Some(r)) => {
                if self.maximize {
                    l > r
                } else {
                    l < r
                }
            }
            (Some(_), None) => true,
            _ => false,
        }
    }
}

/// Policy for combining an individual's prior metrics with a fresh
/// evaluation.
pub trait MetricsMerger {
    fn merge(&self, prior: Option<&Metrics>, fresh: &Metrics) -> Metrics;
}

/// Fresh measurements win wholesale; prior values are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplacementMerger;

impl MetricsMerger for ReplacementMerger {
    fn merge(&self, _prior: Option<&Metrics>, fresh: &Metrics) -> Metrics {
        fresh.clone()
    }
}

/// Structural accumulation: dictionaries merge key by key, numbers add,
/// anything else is replaced by the fresh value. Keys only present in the
/// prior record survive.
#[derive(Debug, Default, Clone, Copy)]
pub struct AccumulatingMerger;

fn accumulate(prior: &Material, fresh: &Material) -> Material {
    match (prior, fresh) {
        (Material::Int(l), Material::Int(r)) => Material::Int(l + r),
        (l, r) => match (l.as_f64(), r.as_f64()) {
            (Some(l), Some(r)) => Material::Float(l + r),
            _ => match (l, r) {
                (Material::Dict(l), Material::Dict(r)) => {
                    let mut merged = l.clone();
                    for (k, fresh_v) in r {
                        let v = match l.get(k) {
                            Some(prior_v) => accumulate(prior_v, fresh_v),
                            None => fresh_v.clone(),
                        };
                        merged.insert(k.clone(), v);
                    }
                    Material::Dict(merged)
                }
                _ => r.clone(),
            },
        },
    }
}

impl MetricsMerger for AccumulatingMerger {
    fn merge(&self, prior: Option<&Metrics>, fresh: &Metrics) -> Metrics {
        match prior {
            None => fresh.clone(),
            Some(prior) => {
                let mut merged = prior.0.clone();
                for (k, fresh_v) in &fresh.0 {
                    let v = match prior.0.get(k) {
                        Some(prior_v) => accumulate(prior_v, fresh_v),
                        None => fresh_v.clone(),
                    };
                    merged.insert(k.clone(), v);
                }
                Metrics(merged)
            }
        }
    }
}
