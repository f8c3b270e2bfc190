//! Evolutionary matching of synth configurations against recorded targets, and
//! the population that plays them.

pub mod affinity;
pub mod antibody;
pub mod matching;
pub mod pathogens;
pub mod scheduler;
pub mod snapshot;

pub use affinity::{DEFAULT_THRESHOLD, MAX_AFFINITY, affinity};
pub use antibody::{Antibody, AntibodyId, AntibodyState, Category};
pub use matching::{
    EvaluationError, GenerationResult, MatchingEngine, MatchingError, Offspring, Scored,
};
pub use pathogens::{Pathogen, PathogenId, PathogenStore};
pub use scheduler::{IngestError, PopulationScheduler, TickReport};
pub use snapshot::{CandidateSnapshot, Snapshot, TargetSnapshot};
