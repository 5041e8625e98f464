//! The generation pipeline: reproduce, evaluate, merge metrics, persist,
//! select.

use crate::{
    identity::IdentityStamper,
    individual::{Individual, Pool},
    material::Material,
    metrics::{Metrics, MetricsMerger},
    ops::Suite,
    random::{chance, Probabilities, ReproductionEvent},
    select::{ParentPicker, Selector},
    terminate::Terminator,
};
use core::error::Error;
use fxhash::FxHashMap;
use log::{debug, info};
use rand::RngCore;
use std::{fs, path::PathBuf, sync::Arc};

/// The evaluation boundary: score a whole pool against one data sample.
/// Results are keyed by unique id; skipped individuals keep their metrics.
pub trait PopulationEvaluator {
    type Sample;

    fn evaluate(
        &self,
        pool: &Pool,
        sample: &Self::Sample,
    ) -> Result<FxHashMap<String, Metrics>, Box<dyn Error>>;
}

/// The persistence boundary. The training loop never inspects the handle;
/// what a checkpoint looks like is the persistor's business.
pub trait Persistor: Send + Sync {
    fn persist(&self, pool: &Pool) -> Result<Option<String>, Box<dyn Error>>;
}

pub struct NullPersistor;

impl Persistor for NullPersistor {
    fn persist(&self, _pool: &Pool) -> Result<Option<String>, Box<dyn Error>> {
        Ok(None)
    }
}

/// One JSON file per individual inside a directory, named by unique id.
pub struct DirPersistor {
    dir: PathBuf,
}

impl DirPersistor {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Persistor for DirPersistor {
    fn persist(&self, pool: &Pool) -> Result<Option<String>, Box<dyn Error>> {
        fs::create_dir_all(&self.dir)?;
        for individual in pool {
            let path = self.dir.join(format!("{}.json", individual.id()));
            fs::write(path, serde_json::to_string(individual.as_ref())?)?;
        }
        Ok(Some(self.dir.display().to_string()))
    }
}

/// Restore a checkpoint directory written by [DirPersistor]. Every file in
/// the directory is assumed to be a persisted individual.
pub fn load_pool(dir: impl Into<PathBuf>) -> Result<Pool, Box<dyn Error>> {
    let mut pool = Pool::new();
    for entry in fs::read_dir(dir.into())? {
        let raw = fs::read_to_string(entry?.path())?;
        pool.add(Arc::new(serde_json::from_str::<Individual>(&raw)?));
    }
    if pool.is_empty() {
        return Err("no individuals in checkpoint".into());
    }
    Ok(pool)
}

/// Turns a survivor pool into a full candidate pool: survivors carry over,
/// offspring fill the remainder, an empty pool bootstraps via creation.
pub struct IndividualGenerator {
    suite: Arc<Suite>,
    stamper: IdentityStamper,
    picker: ParentPicker,
    population: usize,
    crossover: u64,
}

impl IndividualGenerator {
    pub fn new(
        suite: Arc<Suite>,
        stamper: IdentityStamper,
        picker: ParentPicker,
        population: usize,
        probs: &impl Probabilities,
    ) -> Self {
        Self {
            suite,
            stamper,
            picker,
            population,
            crossover: probs.probability(ReproductionEvent::Crossover),
        }
    }

    /// Wrap ready-made material as a newborn individual, stamping identity
    /// from the given parents (none for seeds and creations).
    pub fn individual_from(&self, material: Material, parents: &[&Individual]) -> Individual {
        let parent_identities: Vec<_> = parents.iter().map(|p| &p.identity).collect();
        Individual::new(material, self.stamper.stamp(&parent_identities))
    }

    pub fn generate(&self, pool: &Pool, rng: &mut dyn RngCore) -> Result<Pool, Box<dyn Error>> {
        let mut next: Pool = pool.iter().cloned().collect();

        while next.size() < self.population {
            let child = if pool.is_empty() {
                self.individual_from(self.suite.create(rng), &[])
            } else if pool.size() >= 2 && chance(rng, self.crossover) {
                let (mommy, daddy) = self
                    .picker
                    .pick_pair(pool.members(), rng)
                    .ok_or("no parent pair available")?;
                let material = self.suite.crossover(
                    &mommy.material,
                    &daddy.material,
                    mommy.metrics.as_ref(),
                    daddy.metrics.as_ref(),
                    rng,
                )?;
                self.individual_from(material, &[mommy.as_ref(), daddy.as_ref()])
            } else {
                let basis = self
                    .picker
                    .pick(pool.members(), rng)
                    .ok_or("no parent available")?;
                let material = self.suite.mutate(&basis.material, basis.metrics.as_ref(), rng)?;
                self.individual_from(material, &[basis.as_ref()])
            };
            next.add(Arc::new(child));
        }

        Ok(next)
    }
}

/// One pipeline step, from survivor pool to survivor pool.
pub trait Trainer {
    type Sample;

    fn step(
        &mut self,
        pool: Pool,
        sample: &Self::Sample,
        rng: &mut dyn RngCore,
    ) -> Result<Pool, Box<dyn Error>>;
}

pub struct SingleGenerationTrainer<E: PopulationEvaluator> {
    pub generator: IndividualGenerator,
    pub evaluator: E,
    pub merger: Box<dyn MetricsMerger>,
    pub persistor: Box<dyn Persistor>,
    pub selector: Box<dyn Selector>,
}

impl<E: PopulationEvaluator> Trainer for SingleGenerationTrainer<E> {
    type Sample = E::Sample;

    fn step(
        &mut self,
        pool: Pool,
        sample: &Self::Sample,
        rng: &mut dyn RngCore,
    ) -> Result<Pool, Box<dyn Error>> {
        let candidates = self.generator.generate(&pool, rng)?;
        debug!("reproduced {} candidates", candidates.size());

        let mut measured = self.evaluator.evaluate(&candidates, sample)?;
        debug!("evaluated {} individuals", measured.len());

        let updated: Pool = candidates
            .iter()
            .map(|individual| match measured.remove(individual.id()) {
                Some(fresh) => Arc::new(
                    individual.with_metrics(self.merger.merge(individual.metrics.as_ref(), &fresh)),
                ),
                None => Arc::clone(individual),
            })
            .collect();

        self.persistor.persist(&updated)?;

        let survivors = self.selector.select(&updated, rng);
        debug_assert!(survivors.len() <= updated.size(), "selector grew the pool");
        Ok(survivors.into_iter().collect())
    }
}

/// Warm start: hands pre-built materials to the wrapped trainer's first
/// step as if they were survivors, then gets out of the way.
pub struct SeededTrainer<E: PopulationEvaluator> {
    inner: SingleGenerationTrainer<E>,
    seeds: Vec<Material>,
}

impl<E: PopulationEvaluator> SeededTrainer<E> {
    pub fn new(inner: SingleGenerationTrainer<E>, seeds: Vec<Material>) -> Self {
        Self { inner, seeds }
    }
}

impl<E: PopulationEvaluator> Trainer for SeededTrainer<E> {
    type Sample = E::Sample;

    fn step(
        &mut self,
        pool: Pool,
        sample: &Self::Sample,
        rng: &mut dyn RngCore,
    ) -> Result<Pool, Box<dyn Error>> {
        let mut pool = pool;
        for material in self.seeds.drain(..) {
            pool.add(Arc::new(self.inner.generator.individual_from(material, &[])));
        }
        self.inner.step(pool, sample, rng)
    }
}

/// The multi-generation loop: initialize the terminator tree, then step
/// generations until some terminator votes to stop.
pub struct SimpleEvolution<T: Trainer> {
    pub trainer: T,
    pub terminator: Box<dyn Terminator>,
}

impl<T: Trainer> SimpleEvolution<T> {
    pub fn run(
        &mut self,
        mut pool: Pool,
        mut samples: impl FnMut() -> T::Sample,
        rng: &mut dyn RngCore,
    ) -> Result<Pool, Box<dyn Error>> {
        self.terminator.initialize(&pool);
        let mut steps = 0usize;
        loop {
            if self.terminator.should_terminate() {
                info!("terminating after {steps} generations");
                break Ok(pool);
            }
            let sample = samples();
            pool = self.trainer.step(pool, &sample, rng)?;
            self.terminator.update(&pool);
            steps += 1;
            info!("generation {steps} complete: {} survivors", pool.size());
        }
    }
}

/// Fan evaluation out over worker threads, one sub-pool chunk per task.
/// Evaluators stay single-threaded; parallelism lives entirely here.
#[cfg(feature = "parallel")]
pub fn evaluate_chunked<E>(
    evaluator: &E,
    pool: &Pool,
    sample: &E::Sample,
    chunk_size: usize,
) -> Result<FxHashMap<String, Metrics>, Box<dyn Error>>
where
    E: PopulationEvaluator + Sync,
    E::Sample: Sync,
{
    use rayon::prelude::*;

    let chunks = crate::util::chunked(pool.members(), chunk_size);
    let partials = chunks
        .into_par_iter()
        .map(|members| {
            evaluator
                .evaluate(&members.into_iter().collect(), sample)
                .map_err(|e| e.to_string())
        })
        .collect::<Result<Vec<_>, String>>()?;

    let mut merged = FxHashMap::default();
    for partial in partials {
        merged.extend(partial);
    }
    Ok(merged)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        identity::{GenerationCounter, SequentialIds},
        metrics::{Objective, ReplacementMerger},
        random::ProbStatic,
        select::BestSelector,
        spec::{parse_schema, ParseMode, ScalingRegistry},
        terminate::{standard_terminator, MaxGenerations},
    };
    use rand::{rngs::StdRng, SeedableRng};
    use serde_json::json;

    /// Scores material by its "x" field: closer to 7 is better.
    struct NearSeven;

    impl PopulationEvaluator for NearSeven {
        type Sample = ();

        fn evaluate(
            &self,
            pool: &Pool,
            _sample: &Self::Sample,
        ) -> Result<FxHashMap<String, Metrics>, Box<dyn Error>> {
            Ok(pool
                .iter()
                .map(|i| {
                    let x = i
                        .material
                        .as_dict()
                        .and_then(|d| d.get("x"))
                        .and_then(Material::as_f64)
                        .unwrap_or(f64::MIN);
                    let score = -(x - 7.0).abs();
                    (i.id().to_string(), Metrics::new().with("score", score))
                })
                .collect())
        }
    }

    fn demo_suite() -> Arc<Suite> {
        let spec = parse_schema(
            &json!({"x": {"type": "double", "lowerBound": 0.0, "upperBound": 10.0}}),
            ParseMode::Strict,
            &ScalingRegistry::default(),
        )
        .unwrap();
        Arc::new(
            Suite::from_spec(&spec, &ScalingRegistry::default(), &ProbStatic::default()).unwrap(),
        )
    }

    fn generator(counter: GenerationCounter, population: usize) -> IndividualGenerator {
        IndividualGenerator::new(
            demo_suite(),
            IdentityStamper::new(
                "near-seven",
                "0.1",
                Arc::new(SequentialIds::default()),
                counter,
            ),
            ParentPicker {
                objective: Objective::maximize("score"),
            },
            population,
            &ProbStatic::default(),
        )
    }

    fn trainer(
        counter: GenerationCounter,
        population: usize,
        survivors: usize,
    ) -> SingleGenerationTrainer<NearSeven> {
        SingleGenerationTrainer {
            generator: generator(counter, population),
            evaluator: NearSeven,
            merger: Box::new(ReplacementMerger),
            persistor: Box::new(NullPersistor),
            selector: Box::new(BestSelector {
                objective: Objective::maximize("score"),
                count: survivors,
            }),
        }
    }

    #[test]
    fn test_empty_pool_bootstraps() {
        let counter = GenerationCounter::new();
        let generator = generator(counter, 12);
        let mut rng = StdRng::seed_from_u64(1);
        let pool = generator.generate(&Pool::new(), &mut rng).unwrap();
        assert_eq!(12, pool.size());
        for i in &pool {
            assert_eq!(0, i.identity.ancestor_count);
            assert_eq!(0, i.identity.birth_generation);
            assert!(i.metrics.is_none());
        }
    }

    #[test]
    fn test_offspring_provenance() {
        let counter = GenerationCounter::new();
        let generator = generator(counter.clone(), 10);
        let mut rng = StdRng::seed_from_u64(2);
        let founders = generator.generate(&Pool::new(), &mut rng).unwrap();

        counter.advance();
        // a full pool yields no offspring, only carry-over
        let next = generator.generate(&founders, &mut rng).unwrap();
        assert_eq!(10, next.size());
        assert!(next.iter().all(|i| founders.contains(i.id())));

        let survivors: Pool = founders.iter().take(4).cloned().collect();
        let grown = generator.generate(&survivors, &mut rng).unwrap();
        assert_eq!(10, grown.size());
        let children: Vec<_> = grown
            .iter()
            .filter(|i| !survivors.contains(i.id()))
            .collect();
        assert_eq!(6, children.len());
        for child in children {
            assert_eq!(1, child.identity.ancestor_count);
            assert_eq!(1, child.identity.birth_generation);
            assert!(!child.identity.ancestor_ids.is_empty());
            assert!(child.identity.ancestor_ids.len() <= 2);
            assert!(child
                .identity
                .ancestor_ids
                .iter()
                .all(|a| survivors.contains(a)));
        }
    }

    #[test]
    fn test_step_pipeline_order_and_merge() {
        let counter = GenerationCounter::new();
        let mut trainer = trainer(counter, 10, 3);
        let mut rng = StdRng::seed_from_u64(3);
        let survivors = trainer.step(Pool::new(), &(), &mut rng).unwrap();
        assert_eq!(3, survivors.size());
        for i in &survivors {
            assert!(i.metrics.is_some(), "selection ran before metrics merge?");
        }
    }

    #[test]
    fn test_evolution_improves_or_holds() {
        let counter = GenerationCounter::new();
        let objective = Objective::maximize("score");
        let mut trainer = trainer(counter.clone(), 20, 5);
        let mut rng = StdRng::seed_from_u64(4);

        let first = trainer.step(Pool::new(), &(), &mut rng).unwrap();
        let first_best = first.best(&objective).unwrap().objective(&objective).unwrap();

        let mut evolution = SimpleEvolution {
            trainer,
            terminator: Box::new(standard_terminator(
                counter.clone(),
                vec![Box::new(MaxGenerations::new(counter.clone(), 15))],
            )),
        };
        let last = evolution.run(first, || (), &mut rng).unwrap();

        assert_eq!(15, counter.current());
        let last_best = last.best(&objective).unwrap().objective(&objective).unwrap();
        // elitist selection: the champion never regresses
        assert!(
            last_best >= first_best,
            "regressed from {first_best} to {last_best}"
        );
    }

    #[test]
    fn test_fitness_threshold_stops_early() {
        let counter = GenerationCounter::new();
        let trainer = trainer(counter.clone(), 20, 5);
        let mut rng = StdRng::seed_from_u64(5);

        let mut evolution = SimpleEvolution {
            trainer,
            terminator: Box::new(standard_terminator(
                counter.clone(),
                vec![
                    // any evaluated pool satisfies a threshold this weak
                    Box::new(crate::terminate::FitnessThreshold::new(
                        Objective::maximize("score"),
                        -100.0,
                    )),
                    Box::new(MaxGenerations::new(counter.clone(), 50)),
                ],
            )),
        };
        evolution.run(Pool::new(), || (), &mut rng).unwrap();
        assert!(counter.current() < 50, "threshold never fired");
    }

    #[test]
    fn test_seeded_trainer_injects_once() {
        let counter = GenerationCounter::new();
        let seed = Material::Dict(std::collections::BTreeMap::from([(
            "x".into(),
            Material::Float(7.0),
        )]));
        let inner = trainer(counter, 10, 10);
        let mut seeded = SeededTrainer::new(inner, vec![seed.clone()]);
        let mut rng = StdRng::seed_from_u64(6);

        let first = seeded.step(Pool::new(), &(), &mut rng).unwrap();
        assert!(
            first.iter().any(|i| *i.material == seed),
            "seed material missing from first generation"
        );

        // the perfect seed dominates every later score
        let objective = Objective::maximize("score");
        assert_eq!(
            Some(0.0),
            first.best(&objective).unwrap().objective(&objective)
        );
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_chunked_evaluation_matches_direct() {
        let counter = GenerationCounter::new();
        let generator = generator(counter, 9);
        let mut rng = StdRng::seed_from_u64(9);
        let pool = generator.generate(&Pool::new(), &mut rng).unwrap();

        let direct = NearSeven.evaluate(&pool, &()).unwrap();
        // uneven chunking: 9 members over chunks of 4 leaves a remainder
        let chunked = evaluate_chunked(&NearSeven, &pool, &(), 4).unwrap();
        assert_eq!(direct.len(), chunked.len());
        for (id, metrics) in &direct {
            assert_eq!(Some(metrics), chunked.get(id));
        }
    }

    #[test]
    fn test_dir_persistor_round_trip() {
        let counter = GenerationCounter::new();
        let generator = generator(counter, 6);
        let mut rng = StdRng::seed_from_u64(7);
        let pool = generator.generate(&Pool::new(), &mut rng).unwrap();

        let dir = std::env::temp_dir().join(format!("esper-checkpoint-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);

        let handle = DirPersistor::new(&dir).persist(&pool).unwrap();
        assert!(handle.is_some());

        let restored = load_pool(&dir).unwrap();
        assert_eq!(pool.size(), restored.size());
        for i in &pool {
            assert!(restored.contains(i.id()));
        }
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_pool_empty_dir_errors() {
        let dir = std::env::temp_dir().join(format!("esper-empty-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        assert!(load_pool(&dir).is_err());
        fs::remove_dir_all(&dir).unwrap();
    }
}
