//! Command-line front end for the dose journal.
//!
//! # Responsibility
//! - Map subcommands onto `doselog_core` services.
//! - Print plain-text results; exit non-zero on any error.

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use doselog_core::model::dose::DoseId;
use doselog_core::timeline::compositor::{SharedTimeline, SingleTimeline};
use doselog_core::{
    init_logging, open_db, CurveLookup, DoseFilter, DoseService, MarkerKind, ReferenceLibrary,
    Route, SqliteDoseRepository, TimelineConfig,
};
use log::error;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type Result<T> = std::result::Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(author, version, about = "Dose journal with effect timelines")]
struct Cli {
    /// Journal database file
    #[arg(long, global = true, default_value = "doselog.sqlite3", value_hint = ValueHint::FilePath)]
    db: PathBuf,

    /// Directory for rolling log files; logging stays off when omitted
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    log_dir: Option<PathBuf>,

    /// Timeline config JSON (falls back to $DOSELOG_CONFIG)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log a dose from shorthand, e.g. "20mg caffeine oral" or "@ate 30mg adderall"
    Log(LogArgs),
    /// List every logged dose, oldest first
    List,
    /// Totals per substance and route
    Tally(TallyArgs),
    /// Doses still in effect, with their current phase
    Active(ActiveArgs),
    /// One dose's effect timeline on its own axis
    Show(ShowArgs),
    /// Attach a note to a dose
    Note { dose_id: DoseId, text: String },
    /// Record an onset, peak or offset marker
    Mark(MarkArgs),
    /// Check that the core library is linked
    Ping,
}

#[derive(Args)]
struct LogArgs {
    dose: String,
    /// When the dose was taken (RFC 3339); defaults to now
    #[arg(long, value_parser = parse_instant)]
    at: Option<DateTime<Utc>>,
}

#[derive(Args)]
struct TallyArgs {
    #[arg(long)]
    substance: Vec<String>,
    #[arg(long)]
    route: Vec<String>,
    #[arg(long)]
    year: Option<i32>,
    /// Only the latest N matching doses
    #[arg(long)]
    last: Option<usize>,
}

#[derive(Args)]
struct ActiveArgs {
    /// Reference library JSON with duration curves
    #[arg(long, value_hint = ValueHint::FilePath)]
    reference: PathBuf,
    #[arg(long, value_parser = parse_instant)]
    at: Option<DateTime<Utc>>,
}

#[derive(Args)]
struct ShowArgs {
    dose_id: DoseId,
    /// Reference library JSON with duration curves
    #[arg(long, value_hint = ValueHint::FilePath)]
    reference: PathBuf,
}

#[derive(Args)]
struct MarkArgs {
    dose_id: DoseId,
    #[arg(value_enum)]
    marker: MarkerArg,
    #[arg(long, value_parser = parse_instant)]
    at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, ValueEnum)]
enum MarkerArg {
    Onset,
    Peak,
    Offset,
}

impl From<MarkerArg> for MarkerKind {
    fn from(value: MarkerArg) -> Self {
        match value {
            MarkerArg::Onset => Self::Onset,
            MarkerArg::Peak => Self::Peak,
            MarkerArg::Offset => Self::Offset,
        }
    }
}

fn parse_instant(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|err| format!("expected an RFC 3339 timestamp: {err}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(doselog_core::default_log_level(), absolute(log_dir)?)?;
    }

    if let Command::Ping = cli.command {
        println!("doselog_core ping={}", doselog_core::ping());
        println!("doselog_core version={}", doselog_core::core_version());
        return Ok(());
    }

    let conn = open_db(&cli.db)?;
    let service = DoseService::new(SqliteDoseRepository::new(&conn));

    match cli.command {
        Command::Log(args) => {
            let dose = service.log_dose_string(&args.dose, args.at.unwrap_or_else(Utc::now))?;
            println!(
                "logged {} {}{} {} at {} ({})",
                dose.substance,
                dose.amount,
                dose.unit,
                dose.route,
                dose.timestamp.to_rfc3339(),
                dose.id
            );
        }
        Command::List => {
            for dose in service.list_doses()? {
                println!(
                    "{}  {}  {}{} {} {}",
                    dose.id,
                    dose.timestamp.to_rfc3339(),
                    dose.amount,
                    dose.unit,
                    dose.substance,
                    dose.route
                );
                for note in &dose.notes {
                    println!("    note {}: {}", note.noted_at.to_rfc3339(), note.body);
                }
            }
        }
        Command::Tally(args) => print_tally(&service, args)?,
        Command::Active(args) => {
            let config = TimelineConfig::discover(cli.config.as_deref())?;
            let library = ReferenceLibrary::load(&args.reference)?;
            let now = args.at.unwrap_or_else(Utc::now);
            let active = service.active_experiences(now, &library)?;
            if active.is_empty() {
                println!("no active doses");
                return Ok(());
            }
            let timeline = SharedTimeline::build(
                now,
                &active,
                config.composite_axis,
                config.early_warped(),
                config.composite_sample_points,
            );
            for experience in &active {
                println!(
                    "{} {}{} {}  phase={}  elapsed={:.2}h  offset={:.2}h  color={}",
                    experience.dose.substance,
                    experience.dose.amount,
                    experience.dose.unit,
                    experience.dose.route,
                    experience.phase.display_phase(),
                    experience.elapsed_hours,
                    experience.offset_from_earliest_hours,
                    experience.color
                );
            }
            println!(
                "timeline span={:.2}h now={:.2}h now_x={:.3}",
                timeline.total_hours(),
                timeline.now_hours,
                timeline.now_x()
            );
        }
        Command::Show(args) => {
            let config = TimelineConfig::discover(cli.config.as_deref())?;
            let library = ReferenceLibrary::load(&args.reference)?;
            let dose = service
                .get_dose(args.dose_id)?
                .ok_or_else(|| format!("dose not found: {}", args.dose_id))?;
            let curve = library
                .resolve(&dose.substance, dose.route.as_str())
                .filter(|curve| !curve.is_empty())
                .ok_or_else(|| {
                    format!("no reference curve for {} {}", dose.substance, dose.route)
                })?;
            let timeline =
                SingleTimeline::build(&curve, config.single_axis, config.sample_points);
            println!(
                "{} {}{} {} at {}  span={:.2}h",
                dose.substance,
                dose.amount,
                dose.unit,
                dose.route,
                dose.timestamp.to_rfc3339(),
                timeline.total_hours()
            );
            for tick in &timeline.ticks {
                println!(
                    "  {:<10} {:>6.2}h  x={:.3}",
                    tick.phase.as_str(),
                    tick.time_hours,
                    tick.x
                );
            }
            for point in &timeline.scaled {
                println!(
                    "  t={:.3}h x={:.3} intensity={:.1}",
                    point.time_hours, point.x, point.intensity
                );
            }
        }
        Command::Note { dose_id, text } => {
            let note = service.add_note(dose_id, text, Utc::now())?;
            println!("noted {} on {}", note.id, dose_id);
        }
        Command::Mark(args) => {
            let marker = MarkerKind::from(args.marker);
            let dose =
                service.record_marker(args.dose_id, marker, args.at.unwrap_or_else(Utc::now))?;
            println!("marked {marker} on {}", dose.id);
        }
        Command::Ping => {}
    }
    Ok(())
}

fn print_tally(service: &DoseService<SqliteDoseRepository<'_>>, args: TallyArgs) -> Result<()> {
    let routes = args
        .route
        .iter()
        .map(|route| {
            Route::from_alias(route).ok_or_else(|| format!("unknown route `{route}`"))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut filter = DoseFilter::new().only(&args.substance).via(routes);
    filter.year = args.year;
    filter.last = args.last;

    let summary = service.summarize(&filter)?;
    let now = Utc::now();
    for (substance, routes) in &summary.tally {
        println!("{substance} (total {:.1})", routes.values().sum::<f64>());
        for (route, amount) in routes {
            println!("  {route} {amount:.1}");
        }
    }
    if let Some(since) = summary.time_since_last(now) {
        println!(
            "last dose {:.1} hours ago",
            since.num_milliseconds() as f64 / 3_600_000.0
        );
    }
    println!(
        "total {:.1}  average {:.1}  median {:.1}  doses {}",
        summary.total, summary.average, summary.median, summary.count
    );
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}
