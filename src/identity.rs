//! Per-individual provenance: ancestry, birth generation and unique ids.

use crate::material::Material;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

/// Shared generation counter, advanced once per generation by the
/// termination tree.
#[derive(Debug, Default, Clone)]
pub struct GenerationCounter(Arc<AtomicUsize>);

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(generation: usize) -> Self {
        Self(Arc::new(AtomicUsize::new(generation)))
    }

    pub fn current(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Advance by one generation, returning the new count.
    pub fn advance(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Provenance record attached to every individual.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub unique_id: String,
    pub domain_name: String,
    pub experiment_version: String,
    pub ancestor_ids: Vec<String>,
    pub ancestor_count: usize,
    pub birth_generation: usize,
    /// Domain-registered identity fields beyond the recognized set.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, Material>,
}

/// Hands out ids that never collide within one generator instance. Shared
/// by reference across threads; implementations synchronize internally.
pub trait UniqueIds: Send + Sync {
    fn next_id(&self, generation: usize) -> String;
}

/// Monotone counter ids. One atomic serves both the single-threaded and the
/// concurrent case.
#[derive(Debug, Default)]
pub struct SequentialIds(AtomicU64);

impl SequentialIds {
    pub fn starting_at(n: u64) -> Self {
        Self(AtomicU64::new(n))
    }
}

impl UniqueIds for SequentialIds {
    fn next_id(&self, _generation: usize) -> String {
        self.0.fetch_add(1, Ordering::SeqCst).to_string()
    }
}

/// 128-bit random hex ids.
pub struct RandomIds(Mutex<crate::random::WyRng>);

impl RandomIds {
    pub fn seeded(seed: u64) -> Self {
        Self(Mutex::new(crate::random::WyRng::seeded(seed)))
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::seeded(crate::random::seed_urandom().unwrap_or(0x5eed))
    }
}

impl UniqueIds for RandomIds {
    fn next_id(&self, _generation: usize) -> String {
        use rand::RngCore;
        let mut rng = self.0.lock().unwrap();
        format!("{:016x}{:016x}", rng.next_u64(), rng.next_u64())
    }
}

/// Ids unique within a generation, prefixed by it: `"<gen>.<n>"`. The
/// sequence resets whenever the generation moves on. Generation (high 32
/// bits) and sequence (low 32) live in one atomic so the reset and the
/// claim of a sequence number are a single compare-exchange.
#[derive(Debug, Default)]
pub struct GenerationScopedIds {
    state: AtomicU64,
}

impl UniqueIds for GenerationScopedIds {
    fn next_id(&self, generation: usize) -> String {
        let generation = generation as u32 as u64;
        let mut current = self.state.load(Ordering::SeqCst);
        loop {
            let (n, next) = if current >> 32 == generation {
                (current & 0xffff_ffff, current + 1)
            } else {
                (0, (generation << 32) | 1)
            };
            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return format!("{generation}.{n}"),
                Err(seen) => current = seen,
            }
        }
    }
}

/// Everything an identity operator may consult when stamping a birth.
pub struct BirthContext<'a> {
    pub domain_name: &'a str,
    pub experiment_version: &'a str,
    pub generation: usize,
}

/// One field's worth of identity stamping. Domains register extra ops for
/// extra fields; the standard set fills the recognized ones.
pub trait IdentityOp: Send + Sync {
    fn apply(&self, child: &mut Identity, parents: &[&Identity], ctx: &BirthContext);
}

struct AncestryOp;

impl IdentityOp for AncestryOp {
    fn apply(&self, child: &mut Identity, parents: &[&Identity], _ctx: &BirthContext) {
        child.ancestor_ids = parents.iter().map(|p| p.unique_id.clone()).collect();
        // no parents means a from-scratch creation: count stays 0
        child.ancestor_count = parents
            .iter()
            .map(|p| p.ancestor_count + 1)
            .max()
            .unwrap_or(0);
    }
}

struct DomainInfoOp;

impl IdentityOp for DomainInfoOp {
    fn apply(&self, child: &mut Identity, _parents: &[&Identity], ctx: &BirthContext) {
        child.domain_name = ctx.domain_name.into();
        child.experiment_version = ctx.experiment_version.into();
        child.birth_generation = ctx.generation;
    }
}

struct UniqueIdOp(Arc<dyn UniqueIds>);

impl IdentityOp for UniqueIdOp {
    fn apply(&self, child: &mut Identity, _parents: &[&Identity], ctx: &BirthContext) {
        child.unique_id = self.0.next_id(ctx.generation);
    }
}

/// The all-fields composite: runs every registered [IdentityOp] over a
/// blank identity at each birth.
pub struct IdentityStamper {
    domain_name: String,
    experiment_version: String,
    counter: GenerationCounter,
    ops: Vec<Box<dyn IdentityOp>>,
}

impl IdentityStamper {
    pub fn new(
        domain_name: impl Into<String>,
        experiment_version: impl Into<String>,
        ids: Arc<dyn UniqueIds>,
        counter: GenerationCounter,
    ) -> Self {
        Self {
            domain_name: domain_name.into(),
            experiment_version: experiment_version.into(),
            counter,
            ops: vec![
                Box::new(UniqueIdOp(ids)),
                Box::new(DomainInfoOp),
                Box::new(AncestryOp),
            ],
        }
    }

    /// Register a domain-specific identity operator, run after the
    /// standard set.
    pub fn push_op(&mut self, op: Box<dyn IdentityOp>) {
        self.ops.push(op);
    }

    pub fn counter(&self) -> &GenerationCounter {
        &self.counter
    }

    pub fn stamp(&self, parents: &[&Identity]) -> Identity {
        let ctx = BirthContext {
            domain_name: &self.domain_name,
            experiment_version: &self.experiment_version,
            generation: self.counter.current(),
        };
        let mut child = Identity::default();
        for op in &self.ops {
            op.apply(&mut child, parents, &ctx);
        }
        child
    }
}
