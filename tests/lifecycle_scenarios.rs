mod support;

use std::sync::Arc;

use pathosynth::audio::{SilentBackend, load_wav};
use pathosynth::config::Settings;
use pathosynth::immune::{AntibodyState, Category, MatchingEngine, PopulationScheduler};
use pathosynth::synth::AudioRenderer;
use support::stubs::{FailingRenderer, PrimaryRenderer, SampleExtractor};
use support::wav::write_test_wav;

fn scheduler(settings: &Settings, renderer: Arc<dyn AudioRenderer>) -> PopulationScheduler {
    let engine = MatchingEngine::new(renderer, Arc::new(SampleExtractor), &settings.matching);
    PopulationScheduler::new(settings, Arc::new(engine), Box::new(SilentBackend::new()))
}

/// One-second ticks, a round every tick, and only memory voices ever play.
fn memory_only_settings() -> Settings {
    let mut settings = Settings::default();
    settings.scheduler.seed = Some(2024);
    settings.scheduler.tick_interval_ms = 1000;
    settings.scheduler.rematch_every_ticks = 1;
    settings.scheduler.baseline_probability_high = 0.0;
    settings.scheduler.baseline_probability_low = 0.0;
    settings.scheduler.converging_probability = 0.0;
    settings.scheduler.converged_probability = 1.0;
    settings
}

#[test]
fn recording_converges_plays_four_times_and_is_retired() {
    let temp = tempfile::tempdir().expect("create tempdir");
    let wav_path = temp.path().join("pathogen.wav");
    write_test_wav(&wav_path, &[440.0; 16], 8_000);
    let buffer = load_wav(&wav_path).expect("load recording");

    let settings = memory_only_settings();
    let mut scheduler = scheduler(&settings, Arc::new(PrimaryRenderer));
    let target = scheduler.ingest(buffer).expect("ingest");

    let mut memory = None;
    for _ in 0..500 {
        scheduler.tick();
        scheduler.settle_rounds();
        memory = scheduler
            .antibodies()
            .iter()
            .find(|antibody| antibody.state() == AntibodyState::Converged { target })
            .map(|antibody| antibody.id());
        if memory.is_some() {
            break;
        }
    }
    let memory = memory.expect("population never converged");
    assert_eq!(scheduler.count(Category::Converged), 1);

    let mut plays_seen = Vec::new();
    let mut retired = false;
    for _ in 0..1_000 {
        let report = scheduler.tick();
        scheduler.settle_rounds();
        if let Some(antibody) = scheduler.antibody(memory) {
            if plays_seen.last() != Some(&antibody.plays()) {
                plays_seen.push(antibody.plays());
            }
            assert!(antibody.plays() <= 4);
        }
        if report.reaped.contains(&memory) {
            assert_eq!(report.removed_pathogens, vec![target]);
            retired = true;
            break;
        }
    }
    assert!(retired, "memory voice was never reaped");
    // The fourth completion flags it, and it is reaped within that same tick.
    assert_eq!(plays_seen, vec![0, 1, 2, 3]);
    assert!(scheduler.antibody(memory).is_none());
    assert!(!scheduler.pathogens().contains(target));
    assert_eq!(scheduler.count(Category::Converged), 0);
}

#[test]
fn empty_population_is_replenished_to_the_floor() {
    let mut settings = memory_only_settings();
    settings.scheduler.initial_baseline = 0;
    let mut scheduler = scheduler(&settings, Arc::new(PrimaryRenderer));
    assert_eq!(scheduler.count(Category::Baseline), 0);
    for _ in 0..20 {
        scheduler.tick();
    }
    assert_eq!(scheduler.count(Category::Baseline), settings.scheduler.baseline_floor);
}

#[test]
fn round_with_every_render_failing_changes_nothing() {
    let settings = memory_only_settings();
    let mut scheduler = scheduler(&settings, Arc::new(FailingRenderer));
    let before: Vec<_> = scheduler
        .antibodies()
        .iter()
        .map(|antibody| (antibody.id(), antibody.state(), antibody.is_marked_for_deletion()))
        .collect();

    let target = scheduler
        .ingest(pathosynth::audio::RawAudioBuffer::new(vec![440.0; 8], 44_100))
        .expect("ingest");
    let report = scheduler.settle_rounds();
    assert_eq!(report.rounds_failed, 1);
    assert_eq!(report.rounds_merged, 0);

    let after: Vec<_> = scheduler
        .antibodies()
        .iter()
        .map(|antibody| (antibody.id(), antibody.state(), antibody.is_marked_for_deletion()))
        .collect();
    assert_eq!(before, after);
    assert!(scheduler.pathogens().contains(target));
    assert!(!scheduler.pathogens().is_breeding(target));
    assert_eq!(scheduler.count(Category::Converging), 0);
}
