//! Entry point for the pathosynth installation.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use pathosynth::analysis::SpectralAnalyzer;
use pathosynth::audio::{PlaybackBackend, RodioBackend, SilentBackend, load_wav};
use pathosynth::cli::{self, CliOptions, StopFlag};
use pathosynth::config::{self, Settings};
use pathosynth::immune::{MatchingEngine, PopulationScheduler, TickReport};
use pathosynth::logging;
use pathosynth::synth::OfflineRenderer;
use tracing::{debug, info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = match cli::parse_args(std::env::args().skip(1).collect()) {
        Ok(Some(options)) => options,
        Ok(None) => {
            println!("{}", cli::help_text());
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let settings = load_settings(&options)?;
    let mut scheduler = build_scheduler(&settings);
    for path in &options.ingest {
        ingest_file(&mut scheduler, path);
    }
    let stop = StopFlag::new();
    if let Err(err) = stop.listen(std::io::BufReader::new(std::io::stdin())) {
        warn!("Stop listener unavailable: {err}");
    }
    run(&mut scheduler, &settings, &options, &stop);

    let report = scheduler.settle_rounds();
    log_report(&report);
    scheduler.silence();
    info!(
        "Stopped after {} ticks with {} candidates and {} targets",
        scheduler.ticks(),
        scheduler.antibodies().len(),
        scheduler.pathogens().len()
    );
    Ok(())
}

fn load_settings(options: &CliOptions) -> Result<Settings, config::ConfigError> {
    let mut settings = match &options.config {
        Some(path) => config::load_settings_from(path)?,
        None => {
            let path = config::config_path()?;
            if let Err(err) = config::ensure_config_file(&path) {
                warn!("{err}");
            }
            config::load_settings_from(&path)?
        }
    };
    if options.seed.is_some() {
        settings.scheduler.seed = options.seed;
    }
    if options.silent {
        settings.playback.enabled = false;
    }
    Ok(settings)
}

fn build_scheduler(settings: &Settings) -> PopulationScheduler {
    let renderer = OfflineRenderer::new(
        settings.render.sample_rate,
        settings.render.comparison_seconds,
    );
    let engine = MatchingEngine::new(
        Arc::new(renderer),
        Arc::new(SpectralAnalyzer::default()),
        &settings.matching,
    );
    PopulationScheduler::new(settings, Arc::new(engine), open_backend(settings))
}

fn open_backend(settings: &Settings) -> Box<dyn PlaybackBackend> {
    if !settings.playback.enabled {
        info!("Playback disabled; voices are tracked silently");
        return Box::new(SilentBackend::new());
    }
    match RodioBackend::open_default(settings.render.sample_rate) {
        Ok(backend) => Box::new(backend),
        Err(err) => {
            warn!("{err}; continuing without sound");
            Box::new(SilentBackend::new())
        }
    }
}

fn ingest_file(scheduler: &mut PopulationScheduler, path: &Path) {
    let buffer = match load_wav(path) {
        Ok(buffer) => buffer,
        Err(err) => {
            warn!("Skipping recording: {err}");
            return;
        }
    };
    match scheduler.ingest(buffer) {
        Ok(id) => info!("{} registered as {id}", path.display()),
        Err(err) => warn!("{} not registered: {err}", path.display()),
    }
}

fn run(
    scheduler: &mut PopulationScheduler,
    settings: &Settings,
    options: &CliOptions,
    stop: &StopFlag,
) {
    let interval = settings.scheduler.tick_interval();
    loop {
        let started = Instant::now();
        let report = scheduler.tick();
        log_report(&report);
        if let Some(every) = options.snapshot_every
            && scheduler.ticks() % every == 0
        {
            match scheduler.snapshot().to_json() {
                Ok(json) => println!("{json}"),
                Err(err) => warn!("Snapshot not serialized: {err}"),
            }
        }
        if options.ticks > 0 && scheduler.ticks() >= options.ticks {
            break;
        }
        if stop.is_requested() {
            info!("Stop requested");
            break;
        }
        if !options.fast {
            std::thread::sleep(interval.saturating_sub(started.elapsed()));
        }
    }
}

fn log_report(report: &TickReport) {
    for target in &report.removed_pathogens {
        info!("Tick {}: {target} retired with its memory voice", report.tick);
    }
    if report.rounds_merged + report.rounds_failed + report.rounds_discarded > 0 {
        info!(
            "Tick {}: {} rounds merged, {} failed, {} discarded; {} candidates spawned",
            report.tick,
            report.rounds_merged,
            report.rounds_failed,
            report.rounds_discarded,
            report.spawned.len()
        );
    }
    if !report.started.is_empty() || !report.reaped.is_empty() {
        debug!(
            "Tick {}: started {:?}, reaped {:?}",
            report.tick, report.started, report.reaped
        );
    }
}
