pub mod identity;
pub mod individual;
pub mod material;
pub mod metrics;
pub mod ops;
pub mod random;
pub mod select;
pub mod spec;
pub mod terminate;
pub mod train;
pub mod util;

pub use identity::{GenerationCounter, Identity, IdentityStamper, SequentialIds, UniqueIds};
pub use individual::{Individual, Pool};
pub use material::Material;
pub use metrics::{Metrics, MetricsMerger, Objective};
pub use ops::{Creator, CrossoverOp, GeneticOperator, Mutator, Suite};
pub use random::{chance, percent, Happens, Probabilities, ReproductionEvent};
pub use select::{ParentPicker, Selector};
pub use spec::{NumberSpec, ParamSpec, ScalingRegistry};
pub use terminate::Terminator;
pub use train::{
    IndividualGenerator, Persistor, PopulationEvaluator, SimpleEvolution, SingleGenerationTrainer,
    Trainer,
};
