//! One breeding generation: score parents against a target, keep the best, breed or stop.

use std::any::Any;
use std::cmp::Reverse;
use std::sync::Arc;

use ordered_float::OrderedFloat;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use super::affinity::affinity;
use super::antibody::AntibodyState;
use super::pathogens::{Pathogen, PathogenId};
use crate::analysis::{
    AnalysisError, ComparisonError, ComparisonResult, FeatureExtractor, FeatureSummary, compare,
};
use crate::config::MatchingSettings;
use crate::synth::{AudioRenderer, RenderError, SynthParams};

/// Why a single parent dropped out of a round.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Render failed: {0}")]
    Render(#[from] RenderError),
    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Comparison failed: {0}")]
    Comparison(#[from] ComparisonError),
    #[error("Evaluation panicked: {0}")]
    Panicked(String),
}

/// Why a whole round produced nothing.
#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("No parent of {target} survived evaluation ({parents} tried)")]
    NoSurvivors { target: PathogenId, parents: usize },
    #[error("Features of {target} are unavailable: {source}")]
    TargetAnalysis {
        target: PathogenId,
        source: AnalysisError,
    },
    #[error("Breeding round for {target} panicked: {message}")]
    Panicked { target: PathogenId, message: String },
}

/// A configuration produced by a round, before the scheduler gives it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct Offspring {
    pub params: SynthParams,
    pub state: AntibodyState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    /// The best parent cleared the threshold; an exact copy becomes the memory voice.
    Converged(Offspring),
    NextGeneration {
        offspring: Vec<Offspring>,
        generation: u32,
    },
}

/// A parent that survived evaluation.
#[derive(Debug, Clone)]
pub struct Scored {
    pub params: SynthParams,
    pub comparison: ComparisonResult,
    pub affinity: f64,
}

/// Renders, analyzes and ranks candidate configurations against targets.
pub struct MatchingEngine {
    renderer: Arc<dyn AudioRenderer>,
    extractor: Arc<dyn FeatureExtractor>,
    threshold: f64,
    survivors: usize,
}

impl MatchingEngine {
    pub fn new(
        renderer: Arc<dyn AudioRenderer>,
        extractor: Arc<dyn FeatureExtractor>,
        settings: &MatchingSettings,
    ) -> Self {
        Self {
            renderer,
            extractor,
            threshold: settings.affinity_threshold,
            survivors: settings.survivors.max(1),
        }
    }

    pub fn extractor(&self) -> &dyn FeatureExtractor {
        self.extractor.as_ref()
    }

    /// Score one configuration against a target summary.
    pub fn evaluate(
        &self,
        target: &FeatureSummary,
        params: &SynthParams,
    ) -> Result<Scored, EvaluationError> {
        let rendered = self.renderer.render(params)?;
        let features = self.extractor.analyze(&rendered)?;
        let comparison = compare(target, &features)?;
        Ok(Scored {
            params: params.clone(),
            affinity: affinity(&comparison),
            comparison,
        })
    }

    /// Score every parent on its own scoped thread and return survivors, best first.
    ///
    /// Failed or panicking evaluations are dropped.
    pub fn rank(&self, target: &FeatureSummary, parents: &[SynthParams]) -> Vec<Scored> {
        let outcomes: Vec<Result<Scored, EvaluationError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = parents
                .iter()
                .map(|params| scope.spawn(move || self.evaluate(target, params)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|payload| {
                        Err(EvaluationError::Panicked(panic_message(payload)))
                    })
                })
                .collect()
        });
        let mut scored: Vec<Scored> = outcomes
            .into_iter()
            .enumerate()
            .filter_map(|(idx, outcome)| match outcome {
                Ok(scored) => Some(scored),
                Err(err) => {
                    debug!("Parent {idx} dropped: {err}");
                    None
                }
            })
            .collect();
        scored.sort_by_key(|entry| Reverse(OrderedFloat(entry.affinity)));
        scored.truncate(self.survivors);
        scored
    }

    /// Run one generation of `parents` (all of generation `generation`) against `target`.
    pub fn run_generation<R: Rng + ?Sized>(
        &self,
        target: &Pathogen,
        parents: &[SynthParams],
        generation: u32,
        rng: &mut R,
    ) -> Result<GenerationResult, MatchingError> {
        let target_id = target.id();
        let features = target
            .features(self.extractor.as_ref())
            .map_err(|source| MatchingError::TargetAnalysis {
                target: target_id,
                source,
            })?;
        let ranked = self.rank(features, parents);
        let Some(best) = ranked.first() else {
            return Err(MatchingError::NoSurvivors {
                target: target_id,
                parents: parents.len(),
            });
        };
        if best.affinity > self.threshold {
            info!(
                "{target_id} converged at generation {generation} (affinity {:.3})",
                best.affinity
            );
            return Ok(GenerationResult::Converged(Offspring {
                params: best.params.clone(),
                state: AntibodyState::Converged { target: target_id },
            }));
        }
        let next = generation + 1;
        let offspring = ranked
            .iter()
            .enumerate()
            .flat_map(|(rank, scored)| std::iter::repeat_n(scored, self.survivors - rank))
            .map(|scored| Offspring {
                params: scored.params.mutate(&scored.comparison, rng),
                state: AntibodyState::Converging {
                    target: target_id,
                    generation: next,
                },
            })
            .collect::<Vec<_>>();
        debug!(
            "{target_id} generation {next}: {} offspring, best affinity {:.3}",
            offspring.len(),
            best.affinity
        );
        Ok(GenerationResult::NextGeneration {
            offspring,
            generation: next,
        })
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RawAudioBuffer;
    use crate::immune::pathogens::PathogenStore;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const BANDS: [f64; 4] = [1.0, 0.6, 0.3, 0.1];

    /// Renders the primary frequency as the only sample.
    struct PrimaryRenderer;

    impl AudioRenderer for PrimaryRenderer {
        fn render(&self, params: &SynthParams) -> Result<RawAudioBuffer, RenderError> {
            let freq = params.primary_frequency().ok_or(RenderError::NoFrequencies)?;
            if freq > 7000.0 {
                return Err(RenderError::Failed("too bright".into()));
            }
            if freq > 6000.0 {
                panic!("renderer blew up");
            }
            Ok(RawAudioBuffer::new(vec![freq as f32], 44_100))
        }
    }

    /// Reads the single sample back as a peak.
    struct SampleExtractor;

    impl FeatureExtractor for SampleExtractor {
        fn analyze(&self, buffer: &RawAudioBuffer) -> Result<FeatureSummary, AnalysisError> {
            let peak = buffer.samples().first().ok_or(AnalysisError::EmptyBuffer)?;
            Ok(FeatureSummary::new(vec![*peak as f64], BANDS.to_vec()))
        }
    }

    fn engine() -> MatchingEngine {
        MatchingEngine::new(
            Arc::new(PrimaryRenderer),
            Arc::new(SampleExtractor),
            &MatchingSettings::default(),
        )
    }

    fn target(store: &mut PathogenStore, peak: f32) -> Arc<Pathogen> {
        store
            .insert_analyzed(RawAudioBuffer::new(vec![peak], 44_100), &SampleExtractor)
            .unwrap()
    }

    fn params(primary: f64) -> SynthParams {
        SynthParams {
            freqs: vec![primary, 900.0],
            ring_amp: 0.1,
            delay_times: vec![0.02, 0.05],
            lfo_rate: 0.3,
        }
    }

    fn offspring_of(result: GenerationResult) -> (Vec<Offspring>, u32) {
        match result {
            GenerationResult::NextGeneration {
                offspring,
                generation,
            } => (offspring, generation),
            GenerationResult::Converged(_) => panic!("unexpected convergence"),
        }
    }

    #[test]
    fn three_survivors_breed_six_offspring() {
        let mut store = PathogenStore::new();
        let pathogen = target(&mut store, 440.0);
        let parents = vec![params(1000.0), params(1500.0), params(2000.0), params(3000.0)];
        let mut rng = StdRng::seed_from_u64(5);
        let result = engine()
            .run_generation(&pathogen, &parents, 2, &mut rng)
            .unwrap();
        let (offspring, generation) = offspring_of(result);
        assert_eq!(generation, 3);
        assert_eq!(offspring.len(), 6);
        assert!(offspring.iter().all(|child| child.state
            == AntibodyState::Converging {
                target: pathogen.id(),
                generation: 3
            }));
    }

    #[test]
    fn single_survivor_breeds_three_offspring() {
        let mut store = PathogenStore::new();
        let pathogen = target(&mut store, 440.0);
        // 7500 Hz fails to render, 6500 Hz panics inside its worker.
        let parents = vec![params(7500.0), params(1200.0), params(6500.0)];
        let mut rng = StdRng::seed_from_u64(6);
        let (offspring, generation) =
            offspring_of(engine().run_generation(&pathogen, &parents, 0, &mut rng).unwrap());
        assert_eq!(generation, 1);
        assert_eq!(offspring.len(), 3);
        for child in &offspring {
            let primary = child.params.freqs[0];
            assert!((440.0..=1200.0).contains(&primary), "primary {primary}");
        }
    }

    #[test]
    fn best_parent_above_threshold_converges_as_exact_copy() {
        let mut store = PathogenStore::new();
        let pathogen = target(&mut store, 440.0);
        let winner = params(445.0);
        let parents = vec![params(2000.0), winner.clone()];
        let mut rng = StdRng::seed_from_u64(7);
        let result = engine()
            .run_generation(&pathogen, &parents, 4, &mut rng)
            .unwrap();
        assert_eq!(
            result,
            GenerationResult::Converged(Offspring {
                params: winner,
                state: AntibodyState::Converged {
                    target: pathogen.id()
                },
            })
        );
    }

    #[test]
    fn all_failures_report_no_survivors() {
        let mut store = PathogenStore::new();
        let pathogen = target(&mut store, 440.0);
        let parents = vec![params(7100.0), params(7900.0)];
        let mut rng = StdRng::seed_from_u64(8);
        let err = engine()
            .run_generation(&pathogen, &parents, 0, &mut rng)
            .unwrap_err();
        assert!(matches!(err, MatchingError::NoSurvivors { parents: 2, .. }));
    }

    #[test]
    fn ranking_orders_by_affinity() {
        let mut store = PathogenStore::new();
        let pathogen = target(&mut store, 440.0);
        let features = pathogen.cached_features().unwrap().clone();
        let ranked = engine().rank(
            &features,
            &[params(600.0), params(480.0), params(530.0), params(5000.0)],
        );
        let primaries: Vec<f64> = ranked.iter().map(|s| s.params.freqs[0]).collect();
        assert_eq!(primaries, vec![480.0, 530.0, 600.0]);
    }
}
