//! Command-line front end of fwdtrack: track finding over JSON event files.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use fwdtrack::{
    CriteriaRecorder, CriterionKind, EventFileSource, ForwardTracker, RunSummary,
    StraightLineFitter, TrackerConfig,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "fwdtrack")]
#[command(about = "Find particle tracks in forward-detector hit files (segment automaton + Hopfield selection)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct tracks in an event file.
    Track(CliTrackArgs),

    /// Print the default configuration as JSON.
    Config,

    /// List the built-in criteria.
    Criteria,
}

#[derive(Debug, Clone, Args)]
struct CliTrackArgs {
    /// Path to the input event file (fwdtrack.events.v1).
    #[arg(long)]
    events: PathBuf,

    /// Tracker configuration (JSON). Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to write the results (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Process only this event.
    #[arg(long, conflicts_with_all = ["first_event", "max_events"])]
    event: Option<u64>,

    /// First event to process.
    #[arg(long, default_value = "0")]
    first_event: u64,

    /// Maximum number of events to process (all remaining when omitted).
    #[arg(long)]
    max_events: Option<usize>,

    /// Write every computed criterion value to this file (JSON).
    #[arg(long)]
    criteria_json: Option<PathBuf>,

    /// Override the selector random seed.
    #[arg(long)]
    rng_seed: Option<u64>,

    /// Seeds below this transverse momentum (GeV/c) do not converge in the
    /// reference fitter.
    #[arg(long, default_value = "0.01")]
    fitter_min_pt: f64,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Track(args) => run_track(&args),
        Commands::Config => run_config(),
        Commands::Criteria => run_criteria(),
    }
}

// ── config ─────────────────────────────────────────────────────────────

fn run_config() -> CliResult<()> {
    println!("{}", TrackerConfig::default().to_json_string()?);
    Ok(())
}

// ── criteria ───────────────────────────────────────────────────────────

fn run_criteria() -> CliResult<()> {
    println!("fwdtrack built-in criteria");
    for kind in CriterionKind::ALL {
        println!(
            "  {:<26} {}-hit  {}",
            kind.name(),
            kind.hits_per_segment() + 1,
            kind.description()
        );
    }
    Ok(())
}

// ── track ──────────────────────────────────────────────────────────────

fn run_track(args: &CliTrackArgs) -> CliResult<()> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading config: {}", path.display());
            TrackerConfig::from_json_file(path)?
        }
        None => TrackerConfig::default(),
    };
    if let Some(seed) = args.rng_seed {
        config.rng_seed = seed;
    }
    if args.criteria_json.is_some() {
        config.save_criteria_values = true;
    }

    tracing::info!("Loading events: {}", args.events.display());
    let source = EventFileSource::from_json_file(&args.events, config.layout.clone())?;
    let tracker = ForwardTracker::new(config)?;
    let mut fitter = StraightLineFitter::new(args.fitter_min_pt);

    let (first, max_events) = match args.event {
        Some(event) => (event, Some(1)),
        None => (args.first_event, args.max_events),
    };
    let results = tracker.process_range(&source, &mut fitter, first, max_events)?;
    let (summary, criteria) = RunSummary::from_events(results);

    let c = &summary.fit_counters;
    tracing::info!(
        "Found {} tracks in {} events; fits: {} attempted, {} good, {} bad, {} converged",
        summary.n_tracks,
        summary.n_events,
        c.attempted_fits,
        c.good_fits,
        c.bad_fits,
        c.converged_fits,
    );
    if c.attempted_refits > 0 {
        tracing::info!(
            "Refits: {} possible, {} attempted, {} good, {} bad",
            c.possible_refits,
            c.attempted_refits,
            c.good_refits,
            c.bad_refits,
        );
    }
    if let Some(q) = &summary.quality {
        tracing::info!(
            "Efficiency {:.3} ({}/{} findable truth tracks), {} clean tracks",
            q.efficiency,
            q.n_matched,
            q.n_findable,
            q.n_clean,
        );
    }

    let json = serde_json::to_string_pretty(&summary)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Results written to {}", args.out.display());

    if let Some(path) = &args.criteria_json {
        let dump = criteria.unwrap_or_else(|| CriteriaRecorder::new().into_dump());
        tracing::info!("{} criterion values recorded", dump.n_samples());
        let json = serde_json::to_string_pretty(&dump)?;
        std::fs::write(path, &json)?;
        tracing::info!("Criteria dump written to {}", path.display());
    }

    Ok(())
}
