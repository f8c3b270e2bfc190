//! Command-line options for the `pathosynth` binary.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CliOptions {
    /// Settings file to use instead of `<app root>/config.toml`.
    pub config: Option<PathBuf>,
    /// Recordings registered as targets at startup, in order.
    pub ingest: Vec<PathBuf>,
    /// Ticks to run before exiting; 0 runs until a stop is requested.
    pub ticks: u64,
    pub seed: Option<u64>,
    pub silent: bool,
    /// Skip the sleep between ticks.
    pub fast: bool,
    /// Print a JSON snapshot every this many ticks.
    pub snapshot_every: Option<u64>,
}

/// Shared flag the tick loop polls to finish cleanly.
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Request a stop once a line arrives on `input`.
    ///
    /// End of input alone leaves the flag clear, so detached runs keep going.
    pub fn listen<R>(&self, mut input: R) -> io::Result<JoinHandle<()>>
    where
        R: BufRead + Send + 'static,
    {
        let flag = self.clone();
        std::thread::Builder::new()
            .name("stop-listener".to_string())
            .spawn(move || {
                let mut line = String::new();
                if matches!(input.read_line(&mut line), Ok(read) if read > 0) {
                    flag.request();
                }
            })
    }
}

/// Parse arguments (without the program name). `Ok(None)` means help was requested.
pub fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        if !apply_arg(&mut options, &args, &mut idx)? {
            return Ok(None);
        }
        idx += 1;
    }
    Ok(Some(options))
}

/// Apply the flag at `idx`. Returns false when parsing should stop for help.
fn apply_arg(options: &mut CliOptions, args: &[String], idx: &mut usize) -> Result<bool, String> {
    let flag = args.get(*idx).map(String::as_str).unwrap_or_default();
    match flag {
        "-h" | "--help" => return Ok(false),
        "--silent" => options.silent = true,
        "--fast" => options.fast = true,
        "--config" => options.config = Some(PathBuf::from(value_after(args, idx, flag)?)),
        "--ingest" => options.ingest.push(PathBuf::from(value_after(args, idx, flag)?)),
        "--ticks" => options.ticks = parse_u64(args, idx, flag)?,
        "--seed" => options.seed = Some(parse_u64(args, idx, flag)?),
        "--snapshot-every" => {
            let every = parse_u64(args, idx, flag)?;
            if every == 0 {
                return Err("--snapshot-every must be at least 1".to_string());
            }
            options.snapshot_every = Some(every);
        }
        _ => return Err(format!("Unknown argument: {flag}\n\n{}", help_text())),
    }
    Ok(true)
}

fn parse_u64(args: &[String], idx: &mut usize, flag: &str) -> Result<u64, String> {
    let value = value_after(args, idx, flag)?;
    value
        .parse::<u64>()
        .map_err(|_| format!("Invalid {flag} value: {value}"))
}

fn value_after<'a>(args: &'a [String], idx: &mut usize, flag: &str) -> Result<&'a str, String> {
    *idx += 1;
    let value = args.get(*idx).ok_or_else(|| format!("{flag} requires a value"))?;
    Ok(value)
}

pub fn help_text() -> &'static str {
    "Usage: pathosynth [options]\n\n\
Options:\n\
  --config <path>          Settings file (default: <config dir>/.pathosynth/config.toml)\n\
  --ingest <wav>           Register a recording as a target; repeatable\n\
  --ticks <n>              Stop after n ticks; 0 runs until Enter is pressed (default: 0)\n\
  --seed <u64>             Fix the population RNG seed\n\
  --silent                 Track voices without opening an audio device\n\
  --fast                   Do not sleep between ticks\n\
  --snapshot-every <n>     Print a JSON population snapshot every n ticks\n\
  -h, --help               Show this help\n\n\
Press Enter to stop early; in-flight rounds are merged and voices released first.\n"
}
