//! The termination state machine: a composable tree of predicates driving
//! the training loop's stop decision.

use crate::{identity::GenerationCounter, individual::Pool, metrics::Objective};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// Composable stop decision. Driven as `initialize` once, then one
/// `update` per generation; `should_terminate` may be polled at any time
/// between updates. A terminator that fires must keep firing: the vote is
/// monotone.
pub trait Terminator: Send {
    fn initialize(&mut self, pool: &Pool);
    fn update(&mut self, pool: &Pool);
    fn should_terminate(&self) -> bool;
}

/// Never votes to stop; its update advances the shared generation counter
/// by exactly one.
pub struct GenerationAdvancing {
    counter: GenerationCounter,
}

impl GenerationAdvancing {
    pub fn new(counter: GenerationCounter) -> Self {
        Self { counter }
    }
}

impl Terminator for GenerationAdvancing {
    fn initialize(&mut self, _pool: &Pool) {}

    fn update(&mut self, _pool: &Pool) {
        self.counter.advance();
    }

    fn should_terminate(&self) -> bool {
        false
    }
}

/// Fires once the shared generation counter reaches `max_generations`.
pub struct MaxGenerations {
    counter: GenerationCounter,
    max_generations: usize,
}

impl MaxGenerations {
    pub fn new(counter: GenerationCounter, max_generations: usize) -> Self {
        Self {
            counter,
            max_generations,
        }
    }
}

impl Terminator for MaxGenerations {
    fn initialize(&mut self, _pool: &Pool) {}

    fn update(&mut self, _pool: &Pool) {}

    fn should_terminate(&self) -> bool {
        self.counter.current() >= self.max_generations
    }
}

/// Fires once any individual's objective has reached `threshold`. The best
/// value seen is latched, so the vote survives that individual later
/// leaving the pool.
pub struct FitnessThreshold {
    objective: Objective,
    threshold: f64,
    best_seen: Option<f64>,
}

impl FitnessThreshold {
    pub fn new(objective: Objective, threshold: f64) -> Self {
        Self {
            objective,
            threshold,
            best_seen: None,
        }
    }

    fn observe(&mut self, pool: &Pool) {
        if let Some(best) = pool.best(&self.objective) {
            let value = best.objective(&self.objective);
            if self.objective.better(value, self.best_seen) {
                self.best_seen = value;
            }
        }
    }
}

impl Terminator for FitnessThreshold {
    fn initialize(&mut self, pool: &Pool) {
        self.observe(pool);
    }

    fn update(&mut self, pool: &Pool) {
        self.observe(pool);
    }

    fn should_terminate(&self) -> bool {
        self.best_seen.is_some_and(|best| {
            if self.objective.maximize {
                best >= self.threshold
            } else {
                best <= self.threshold
            }
        })
    }
}

/// Fires when wall-clock time since `initialize` exceeds the budget. When
/// a poll interval is set, `update` sleeps it.
pub struct Timed {
    budget: Duration,
    poll: Option<Duration>,
    started: Option<Instant>,
}

impl Timed {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            poll: None,
            started: None,
        }
    }

    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = Some(poll);
        self
    }
}

impl Terminator for Timed {
    fn initialize(&mut self, _pool: &Pool) {
        self.started = Some(Instant::now());
    }

    fn update(&mut self, _pool: &Pool) {
        if let Some(poll) = self.poll {
            std::thread::sleep(poll);
        }
    }

    fn should_terminate(&self) -> bool {
        self.started
            .is_some_and(|started| started.elapsed() >= self.budget)
    }
}

/// Externally settable stop flag: the cancellation hook for callers that
/// need to interrupt a run from another thread.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl Terminator for CancelToken {
    fn initialize(&mut self, _pool: &Pool) {}

    fn update(&mut self, _pool: &Pool) {}

    fn should_terminate(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Branch node: all children are initialized and updated identically.
pub struct Anding {
    children: Vec<Box<dyn Terminator>>,
}

impl Anding {
    pub fn new(children: Vec<Box<dyn Terminator>>) -> Self {
        Self { children }
    }
}

impl Terminator for Anding {
    fn initialize(&mut self, pool: &Pool) {
        for child in &mut self.children {
            child.initialize(pool);
        }
    }

    fn update(&mut self, pool: &Pool) {
        for child in &mut self.children {
            child.update(pool);
        }
    }

    fn should_terminate(&self) -> bool {
        !self.children.is_empty() && self.children.iter().all(|c| c.should_terminate())
    }
}

/// Branch node: any child's vote stops the run.
pub struct Oring {
    children: Vec<Box<dyn Terminator>>,
}

impl Oring {
    pub fn new(children: Vec<Box<dyn Terminator>>) -> Self {
        Self { children }
    }

    pub fn push(&mut self, child: Box<dyn Terminator>) {
        self.children.push(child);
    }
}

impl Terminator for Oring {
    fn initialize(&mut self, pool: &Pool) {
        for child in &mut self.children {
            child.initialize(pool);
        }
    }

    fn update(&mut self, pool: &Pool) {
        for child in &mut self.children {
            child.update(pool);
        }
    }

    fn should_terminate(&self) -> bool {
        self.children.iter().any(|c| c.should_terminate())
    }
}

/// The canonical root: an [Oring] whose first child advances the
/// generation counter, followed by whatever domain terminators apply.
pub fn standard_terminator(
    counter: GenerationCounter,
    domain_terminators: Vec<Box<dyn Terminator>>,
) -> Oring {
    let mut children: Vec<Box<dyn Terminator>> =
        vec![Box::new(GenerationAdvancing::new(counter))];
    children.extend(domain_terminators);
    Oring::new(children)
}
