//! Container kernels: homogeneous lists and heterogeneous structures.

use super::Suite;
use crate::{material::Material, metrics::Metrics, random::chance_f64};
use core::error::Error;
use rand::{Rng, RngCore};
use std::collections::BTreeMap;

/// Lists of one component shape, with bounded length.
pub struct ListOps {
    pub(super) component: Box<Suite>,
    pub(super) min_len: usize,
    pub(super) max_len: usize,
    pub(super) change_rate: f64,
}

impl ListOps {
    /// Pure creation: a fresh length in bounds, every component parent-free.
    pub fn create(&self, rng: &mut dyn RngCore) -> Material {
        let len = rng.random_range(self.min_len..=self.max_len);
        Material::List((0..len).map(|_| self.component.create(rng)).collect())
    }

    /// Same-length child; each position either mutates through the
    /// component suite or passes through unchanged.
    pub fn mutate(
        &self,
        basis: &Material,
        metrics: Option<&Metrics>,
        rng: &mut dyn RngCore,
    ) -> Result<Material, Box<dyn Error>> {
        let items = basis
            .as_list()
            .ok_or_else(|| format!("list suite cannot mutate {}", basis.type_name()))?;

        items
            .iter()
            .map(|item| {
                if chance_f64(rng, self.change_rate) {
                    self.component.mutate(item, metrics, rng)
                } else {
                    Ok(item.clone())
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Material::List)
    }

    /// Positional crossover over the overlap; positions past the shorter
    /// parent are dropped, not padded.
    pub fn crossover(
        &self,
        mommy: &Material,
        daddy: &Material,
        mommy_metrics: Option<&Metrics>,
        daddy_metrics: Option<&Metrics>,
        rng: &mut dyn RngCore,
    ) -> Result<Material, Box<dyn Error>> {
        let m = mommy
            .as_list()
            .ok_or_else(|| format!("list suite cannot cross over {}", mommy.type_name()))?;
        let d = daddy
            .as_list()
            .ok_or_else(|| format!("list suite cannot cross over {}", daddy.type_name()))?;

        m.iter()
            .zip(d.iter())
            .map(|(m_i, d_i)| {
                if chance_f64(rng, self.change_rate) {
                    self.component
                        .crossover(m_i, d_i, mommy_metrics, daddy_metrics, rng)
                } else {
                    Ok(m_i.clone())
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Material::List)
    }
}

/// Ordered named fields, each with its own child suite. Fields the spec
/// does not declare are never operated on: they pass through from the
/// primary parent when present, and stay absent otherwise.
pub struct StructOps {
    pub(super) fields: Vec<(String, Suite)>,
    pub(super) change_rate: f64,
}

impl StructOps {
    pub fn create(&self, rng: &mut dyn RngCore) -> Material {
        Material::Dict(
            self.fields
                .iter()
                .map(|(name, suite)| (name.clone(), suite.create(rng)))
                .collect(),
        )
    }

    pub fn mutate(
        &self,
        basis: &Material,
        metrics: Option<&Metrics>,
        rng: &mut dyn RngCore,
    ) -> Result<Material, Box<dyn Error>> {
        let dict = basis
            .as_dict()
            .ok_or_else(|| format!("structure suite cannot mutate {}", basis.type_name()))?;

        let mut child = self.passthrough(dict);
        for (name, suite) in &self.fields {
            let value = match dict.get(name) {
                // a declared field the parent never had is created fresh
                None => suite.create(rng),
                Some(value) if chance_f64(rng, self.change_rate) => {
                    suite.mutate(value, metrics, rng)?
                }
                Some(value) => value.clone(),
            };
            child.insert(name.clone(), value);
        }
        Ok(Material::Dict(child))
    }

    pub fn crossover(
        &self,
        mommy: &Material,
        daddy: &Material,
        mommy_metrics: Option<&Metrics>,
        daddy_metrics: Option<&Metrics>,
        rng: &mut dyn RngCore,
    ) -> Result<Material, Box<dyn Error>> {
        let m = mommy
            .as_dict()
            .ok_or_else(|| format!("structure suite cannot cross over {}", mommy.type_name()))?;
        let d = daddy
            .as_dict()
            .ok_or_else(|| format!("structure suite cannot cross over {}", daddy.type_name()))?;

        let mut child = self.passthrough(m);
        for (name, suite) in &self.fields {
            let value = match (m.get(name), d.get(name)) {
                (Some(m_v), Some(d_v)) if chance_f64(rng, self.change_rate) => {
                    suite.crossover(m_v, d_v, mommy_metrics, daddy_metrics, rng)?
                }
                (Some(m_v), _) => m_v.clone(),
                (None, Some(d_v)) => d_v.clone(),
                (None, None) => continue,
            };
            child.insert(name.clone(), value);
        }
        Ok(Material::Dict(child))
    }

    /// Undeclared fields of the primary parent, carried as-is.
    fn passthrough(&self, parent: &BTreeMap<String, Material>) -> BTreeMap<String, Material> {
        parent
            .iter()
            .filter(|(name, _)| !self.fields.iter().any(|(n, _)| n == *name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}
