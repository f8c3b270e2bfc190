//! The live population and its fixed-interval tick.
//!
//! All mutation of candidates happens on the thread calling [`PopulationScheduler::tick`].
//! Breeding rounds run on background threads and hand their results back over a
//! channel; the next tick merges them.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::antibody::{Antibody, AntibodyId, AntibodyState, Category};
use super::matching::{GenerationResult, MatchingEngine, MatchingError, panic_message};
use super::pathogens::{Pathogen, PathogenId, PathogenStore};
use super::snapshot::{CandidateSnapshot, Snapshot, TargetSnapshot};
use crate::analysis::AnalysisError;
use crate::audio::{PlaybackBackend, RawAudioBuffer};
use crate::config::{MemorySettings, SchedulerSettings, Settings};
use crate::synth::SynthParams;

/// Voices sounding overall below which baseline candidates trigger more eagerly.
const BASELINE_EAGER_BELOW: usize = 2;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Recording could not be analyzed: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Failed to start breeding thread for {target}: {source}")]
    Dispatch {
        target: PathogenId,
        source: std::io::Error,
    },
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub rounds_merged: usize,
    /// Rounds whose target was removed before they finished.
    pub rounds_discarded: usize,
    pub rounds_failed: usize,
    pub rounds_dispatched: usize,
    pub plays_completed: usize,
    pub reaped: Vec<AntibodyId>,
    pub removed_pathogens: Vec<PathogenId>,
    pub spawned: Vec<AntibodyId>,
    pub started: Vec<AntibodyId>,
}

/// Result of a background breeding round, addressed back to the tick thread.
struct RoundOutcome {
    target: PathogenId,
    /// Parents to flag once the round's offspring are merged.
    superseded: Vec<AntibodyId>,
    result: Result<GenerationResult, MatchingError>,
}

/// Inputs for the next round against one target.
struct RoundSeed {
    parents: Vec<SynthParams>,
    superseded: Vec<AntibodyId>,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeOutcome {
    Merged,
    Discarded,
    Failed,
}

/// Owns every live candidate and target and decides who plays when.
pub struct PopulationScheduler {
    settings: SchedulerSettings,
    memory: MemorySettings,
    engine: Arc<MatchingEngine>,
    backend: Box<dyn PlaybackBackend>,
    pathogens: PathogenStore,
    antibodies: Vec<Antibody>,
    next_antibody_id: u64,
    rng: StdRng,
    clock: Duration,
    ticks: u64,
    outcome_tx: Sender<RoundOutcome>,
    outcome_rx: Receiver<RoundOutcome>,
    rounds_in_flight: usize,
}

impl PopulationScheduler {
    /// Build a scheduler seeded with `initial_baseline` random candidates.
    ///
    /// Draws a fresh RNG seed unless the settings pin one.
    pub fn new(
        settings: &Settings,
        engine: Arc<MatchingEngine>,
        backend: Box<dyn PlaybackBackend>,
    ) -> Self {
        let seed = settings.scheduler.seed.unwrap_or_else(rand::random::<u64>);
        info!("Population seed {seed}");
        let (outcome_tx, outcome_rx) = channel();
        let mut scheduler = Self {
            settings: settings.scheduler.clone(),
            memory: settings.memory.clone(),
            engine,
            backend,
            pathogens: PathogenStore::new(),
            antibodies: Vec::new(),
            next_antibody_id: 0,
            rng: StdRng::seed_from_u64(seed),
            clock: Duration::ZERO,
            ticks: 0,
            outcome_tx,
            outcome_rx,
            rounds_in_flight: 0,
        };
        scheduler.set_master_gain(settings.playback.master_gain);
        for _ in 0..scheduler.settings.initial_baseline {
            scheduler.spawn_baseline();
        }
        scheduler
    }

    pub fn antibodies(&self) -> &[Antibody] {
        &self.antibodies
    }

    pub fn antibody(&self, id: AntibodyId) -> Option<&Antibody> {
        self.antibodies.iter().find(|antibody| antibody.id() == id)
    }

    pub fn pathogens(&self) -> &PathogenStore {
        &self.pathogens
    }

    /// Logical time advanced by one tick interval per tick.
    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn rounds_in_flight(&self) -> usize {
        self.rounds_in_flight
    }

    pub fn count(&self, category: Category) -> usize {
        self.antibodies
            .iter()
            .filter(|antibody| antibody.category() == category)
            .count()
    }

    pub fn playing(&self) -> usize {
        self.antibodies.iter().filter(|a| a.is_playing()).count()
    }

    pub fn set_master_gain(&mut self, gain: f32) {
        self.backend.set_master_gain(gain);
    }

    /// Register a recording and start a breeding round for it.
    ///
    /// The round starts from copies of the current baseline candidates, or from
    /// `baseline_floor` fresh random configurations when there are none.
    pub fn ingest(&mut self, buffer: RawAudioBuffer) -> Result<PathogenId, IngestError> {
        let pathogen = self
            .pathogens
            .insert_analyzed(buffer, self.engine.extractor())?;
        let target = pathogen.id();
        let parents = self.seed_parents();
        info!("Ingested {target}; seeding from {} parents", parents.len());
        if self.pathogens.try_begin_breeding(target) {
            if let Err(source) = self.dispatch_round(pathogen, parents, Vec::new(), 0) {
                self.pathogens.remove(target);
                return Err(IngestError::Dispatch { target, source });
            }
        }
        Ok(target)
    }

    /// Advance the logical clock by one interval and run the tick steps in order.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport {
            tick: self.ticks,
            ..TickReport::default()
        };
        self.clock += self.settings.tick_interval();

        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.record_merge(outcome, &mut report);
        }
        self.complete_due_voices(&mut report);
        self.reap(&mut report);
        self.replenish(&mut report);
        self.trigger_playback(&mut report);
        if self.ticks % self.settings.rematch_every_ticks.max(1) == 0 {
            report.rounds_dispatched += self.rematch_all();
        }

        self.ticks += 1;
        report
    }

    /// Block until every in-flight round has been merged.
    pub fn settle_rounds(&mut self) -> TickReport {
        let mut report = TickReport {
            tick: self.ticks,
            ..TickReport::default()
        };
        while self.rounds_in_flight > 0 {
            match self.outcome_rx.recv() {
                Ok(outcome) => self.record_merge(outcome, &mut report),
                Err(_) => break,
            }
        }
        report
    }

    /// Dispatch a round for every idle target without a memory voice.
    ///
    /// Targets with converging candidates breed from them. Targets left with none,
    /// because their previous round failed, are seeded again as on ingest.
    /// Returns the number of rounds started.
    pub fn rematch_all(&mut self) -> usize {
        let mut dispatched = 0;
        for target in self.pathogens.ids() {
            if self.pathogens.is_breeding(target) {
                continue;
            }
            let Some(seed) = self.round_seed(target) else {
                continue;
            };
            let Some(pathogen) = self.pathogens.get(target) else {
                continue;
            };
            if !self.pathogens.try_begin_breeding(target) {
                continue;
            }
            let RoundSeed {
                parents,
                superseded,
                generation,
            } = seed;
            match self.dispatch_round(pathogen, parents, superseded, generation) {
                Ok(()) => dispatched += 1,
                Err(err) => {
                    warn!("Failed to start breeding thread for {target}: {err}");
                    self.pathogens.finish_breeding(target);
                }
            }
        }
        dispatched
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.ticks,
            clock: self.clock.as_secs_f64(),
            rounds_in_flight: self.rounds_in_flight,
            targets: self
                .pathogens
                .ids()
                .into_iter()
                .map(|id| TargetSnapshot {
                    id,
                    breeding: self.pathogens.is_breeding(id),
                })
                .collect(),
            candidates: self
                .antibodies
                .iter()
                .map(|antibody| CandidateSnapshot {
                    id: antibody.id(),
                    state: antibody.state(),
                    position: antibody.position(),
                    level: antibody.level(self.clock),
                    plays: antibody.plays(),
                    marked_for_deletion: antibody.is_marked_for_deletion(),
                })
                .collect(),
        }
    }

    /// Stop every voice; used on shutdown.
    pub fn silence(&mut self) {
        for antibody in &mut self.antibodies {
            antibody.release(self.backend.as_mut());
        }
    }

    /// Copies of the baseline parameters, or `baseline_floor` random sets when there are none.
    fn seed_parents(&mut self) -> Vec<SynthParams> {
        let parents: Vec<SynthParams> = self
            .antibodies
            .iter()
            .filter(|antibody| antibody.category() == Category::Baseline)
            .map(|antibody| antibody.params().clone())
            .collect();
        if !parents.is_empty() {
            return parents;
        }
        (0..self.settings.baseline_floor.max(1))
            .map(|_| SynthParams::random(&mut self.rng))
            .collect()
    }

    fn round_seed(&mut self, target: PathogenId) -> Option<RoundSeed> {
        let mut seed = RoundSeed {
            parents: Vec::new(),
            superseded: Vec::new(),
            generation: 0,
        };
        let mut remembered = false;
        for antibody in &self.antibodies {
            match antibody.state() {
                AntibodyState::Converging {
                    target: t,
                    generation,
                } if t == target && !antibody.is_marked_for_deletion() => {
                    seed.parents.push(antibody.params().clone());
                    seed.superseded.push(antibody.id());
                    seed.generation = seed.generation.max(generation);
                }
                AntibodyState::Converged { target: t } if t == target => remembered = true,
                _ => {}
            }
        }
        if !seed.parents.is_empty() {
            return Some(seed);
        }
        if remembered {
            return None;
        }
        info!("Reseeding {target}; nothing is converging on it");
        seed.parents = self.seed_parents();
        Some(seed)
    }

    fn dispatch_round(
        &mut self,
        pathogen: Arc<Pathogen>,
        parents: Vec<SynthParams>,
        superseded: Vec<AntibodyId>,
        generation: u32,
    ) -> std::io::Result<()> {
        let target = pathogen.id();
        let engine = Arc::clone(&self.engine);
        let tx = self.outcome_tx.clone();
        let mut rng = StdRng::seed_from_u64(self.rng.random());
        debug!(
            "Dispatching {target} generation {generation} with {} parents",
            parents.len()
        );
        std::thread::Builder::new()
            .name(format!("breeding-{}", target.0))
            .spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    engine.run_generation(&pathogen, &parents, generation, &mut rng)
                }))
                .unwrap_or_else(|payload| {
                    Err(MatchingError::Panicked {
                        target,
                        message: panic_message(payload),
                    })
                });
                let _ = tx.send(RoundOutcome {
                    target,
                    superseded,
                    result,
                });
            })?;
        self.rounds_in_flight += 1;
        Ok(())
    }

    fn record_merge(&mut self, outcome: RoundOutcome, report: &mut TickReport) {
        match self.merge(outcome, report) {
            MergeOutcome::Merged => report.rounds_merged += 1,
            MergeOutcome::Discarded => report.rounds_discarded += 1,
            MergeOutcome::Failed => report.rounds_failed += 1,
        }
    }

    /// Apply a finished round atomically. Failed rounds leave the population untouched.
    fn merge(&mut self, outcome: RoundOutcome, report: &mut TickReport) -> MergeOutcome {
        self.rounds_in_flight = self.rounds_in_flight.saturating_sub(1);
        let RoundOutcome {
            target,
            superseded,
            result,
        } = outcome;
        self.pathogens.finish_breeding(target);
        if !self.pathogens.contains(target) {
            debug!("Discarding round result for removed {target}");
            return MergeOutcome::Discarded;
        }
        let offspring = match result {
            Ok(GenerationResult::Converged(memory)) => vec![memory],
            Ok(GenerationResult::NextGeneration { offspring, .. }) => offspring,
            Err(err) => {
                warn!("Breeding round dropped: {err}");
                return MergeOutcome::Failed;
            }
        };
        for antibody in &mut self.antibodies {
            if superseded.contains(&antibody.id()) {
                antibody.mark_for_deletion();
            }
        }
        for child in offspring {
            let id = self.spawn(child.params, child.state);
            report.spawned.push(id);
        }
        MergeOutcome::Merged
    }

    fn complete_due_voices(&mut self, report: &mut TickReport) {
        for antibody in &mut self.antibodies {
            if antibody.complete_if_due(self.backend.as_mut(), self.clock) {
                report.plays_completed += 1;
            }
        }
    }

    fn reap(&mut self, report: &mut TickReport) {
        let (reaped, kept): (Vec<Antibody>, Vec<Antibody>) = std::mem::take(&mut self.antibodies)
            .into_iter()
            .partition(|antibody| antibody.can_be_deleted());
        self.antibodies = kept;
        for mut antibody in reaped {
            antibody.release(self.backend.as_mut());
            report.reaped.push(antibody.id());
            if let AntibodyState::Converged { target } = antibody.state() {
                self.remove_pathogen(target, report);
            }
        }
    }

    /// Drop a target along with any converging candidates still chasing it.
    fn remove_pathogen(&mut self, target: PathogenId, report: &mut TickReport) {
        if self.pathogens.remove(target).is_none() {
            return;
        }
        info!("Memory for {target} retired");
        for antibody in &mut self.antibodies {
            if matches!(antibody.state(), AntibodyState::Converging { target: t, .. } if t == target)
            {
                antibody.mark_for_deletion();
            }
        }
        report.removed_pathogens.push(target);
    }

    fn replenish(&mut self, report: &mut TickReport) {
        if self.count(Category::Baseline) < self.settings.baseline_floor {
            let id = self.spawn_baseline();
            report.spawned.push(id);
        }
    }

    fn trigger_playback(&mut self, report: &mut TickReport) {
        for category in Category::PLAYBACK_ORDER {
            let total = self.playing();
            let in_category = self
                .antibodies
                .iter()
                .filter(|antibody| antibody.is_playing() && antibody.category() == category)
                .count();
            if in_category >= self.cap(category) || total >= self.settings.global_cap {
                continue;
            }
            let probability = self.probability(category, total);
            if self.rng.random::<f64>() >= probability {
                continue;
            }
            let idle: Vec<usize> = self
                .antibodies
                .iter()
                .enumerate()
                .filter(|(_, antibody)| {
                    antibody.category() == category
                        && !antibody.is_playing()
                        && !antibody.is_marked_for_deletion()
                })
                .map(|(idx, _)| idx)
                .collect();
            let Some(&idx) = idle.choose(&mut self.rng) else {
                continue;
            };
            let antibody = &mut self.antibodies[idx];
            match antibody.play(self.backend.as_mut(), self.clock, &self.memory) {
                Ok(()) => report.started.push(antibody.id()),
                Err(err) => warn!("{} could not start: {err}", antibody.id()),
            }
        }
    }

    fn cap(&self, category: Category) -> usize {
        match category {
            Category::Baseline => self.settings.baseline_cap,
            Category::Converging => self.settings.converging_cap,
            Category::Converged => self.settings.converged_cap,
        }
    }

    fn probability(&self, category: Category, playing: usize) -> f64 {
        match category {
            Category::Baseline if playing < BASELINE_EAGER_BELOW => {
                self.settings.baseline_probability_high
            }
            Category::Baseline => self.settings.baseline_probability_low,
            Category::Converging => self.settings.converging_probability,
            Category::Converged => self.settings.converged_probability,
        }
    }

    fn spawn_baseline(&mut self) -> AntibodyId {
        let params = SynthParams::random(&mut self.rng);
        self.spawn(params, AntibodyState::Baseline)
    }

    fn spawn(&mut self, params: SynthParams, state: AntibodyState) -> AntibodyId {
        let id = AntibodyId(self.next_antibody_id);
        self.next_antibody_id += 1;
        let antibody = Antibody::spawn(id, params, state, &mut self.rng);
        debug!("Spawned {id} as {state:?}");
        self.antibodies.push(antibody);
        id
    }
}

impl Drop for PopulationScheduler {
    fn drop(&mut self) {
        self.silence();
    }
}
