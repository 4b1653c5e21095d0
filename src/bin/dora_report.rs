//! DORA Report Binary
//!
//! Computes deployment frequency, change failure rate, mean time to recover
//! and lead time for changes over a git repository's merge history (or a
//! JSONL event file, or a seeded synthetic stream).
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin dora_report -- . --tag 'release-*' --since 2024-01-01 --interval 1w
//! cargo run --release --bin dora_report -- --source jsonl --events events.jsonl --interval 1d --csv report.csv
//! ```
//!
//! ## Environment Variables
//!
//! Every flag can also be set through `DORA_*` (e.g. `DORA_TAG`, `DORA_INTERVAL`),
//! read from the process environment or a `.env` file.
//!
//! - RUST_LOG - Logging filter (overrides `-v`)

use std::path::PathBuf;

use chrono::Utc;
use clap::{ArgAction, Parser, ValueEnum};

use dora_report::config::ReportConfig;
use dora_report::output::{OutputFormat, ReportRow, ReportWriter};
use dora_report::source::{
    EventSource, ExponentialBackoff, GitLeadTimeResolver, GitMergeSource, JsonlSource, LeadTimeResolver,
    NoLeadTimes, SyntheticSource,
};
use dora_report::{ReportError, ReportPipeline, TagMatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    Git,
    Jsonl,
    Synthetic,
}

#[derive(Parser, Debug)]
#[command(name = "dora_report", version, about = "DORA metrics from change history")]
struct Cli {
    /// Path to the git repository
    #[arg(env = "DORA_REPO", default_value = ".")]
    repo: PathBuf,

    /// Start of the report range (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS, UTC)
    #[arg(long, env = "DORA_SINCE")]
    since: Option<String>,

    /// End of the report range (defaults to now)
    #[arg(long, env = "DORA_UNTIL")]
    until: Option<String>,

    /// Glob pattern for deployment tags, e.g. 'release-*'. Required for git;
    /// for jsonl it classifies events written without an outcome
    #[arg(long, env = "DORA_TAG")]
    tag: Option<String>,

    /// Branch to read merges from (defaults to HEAD)
    #[arg(long, env = "DORA_BRANCH")]
    branch: Option<String>,

    /// Window size: Nd, Nw or Nm (e.g. 7d, 2w, 1m)
    #[arg(long, env = "DORA_INTERVAL")]
    interval: Option<String>,

    /// Trailing windows in the moving average; 1 disables smoothing
    #[arg(long = "ma", env = "DORA_MA", default_value_t = dora_report::config::DEFAULT_MOVING_AVERAGE)]
    moving_average: usize,

    /// Also write the report as CSV
    #[arg(long, env = "DORA_CSV")]
    csv: Option<PathBuf>,

    /// Also write the report as JSONL
    #[arg(long, env = "DORA_JSONL")]
    jsonl: Option<PathBuf>,

    /// Where change events come from
    #[arg(long, value_enum, env = "DORA_SOURCE", default_value = "git")]
    source: SourceKind,

    /// Event file for --source jsonl
    #[arg(long, env = "DORA_EVENTS")]
    events: Option<PathBuf>,

    /// Seed for --source synthetic
    #[arg(long, env = "DORA_SEED", default_value_t = 42)]
    seed: u64,

    /// Share of synthetic changes that carry a deployment signal
    #[arg(long, env = "DORA_SUCCESS_RATIO", default_value_t = 0.5)]
    success_ratio: f64,

    /// Retries for failed git commands before giving up
    #[arg(long, env = "DORA_GIT_RETRIES", default_value_t = 2)]
    git_retries: u32,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn build_source(cli: &Cli) -> Result<(Box<dyn EventSource>, Box<dyn LeadTimeResolver>), ReportError> {
    match cli.source {
        SourceKind::Git => {
            let pattern = cli
                .tag
                .as_deref()
                .ok_or_else(|| ReportError::invalid("--tag is required for the git source"))?;
            let source = GitMergeSource::new(&cli.repo, TagMatcher::new(pattern)?)
                .with_branch(cli.branch.clone())
                .with_backoff(ExponentialBackoff::new(200, 2_000, cli.git_retries));
            Ok((Box::new(source), Box::new(GitLeadTimeResolver::new(&cli.repo))))
        }
        SourceKind::Jsonl => {
            let path = cli
                .events
                .as_ref()
                .ok_or_else(|| ReportError::invalid("--events is required for the jsonl source"))?;
            let tags = cli.tag.as_deref().map(TagMatcher::new).transpose()?;
            Ok((Box::new(JsonlSource::new(path).with_tags(tags)), Box::new(NoLeadTimes)))
        }
        SourceKind::Synthetic => {
            if cli.since.is_none() {
                return Err(ReportError::invalid("--since is required for the synthetic source"));
            }
            if cli.tag.is_some() {
                return Err(ReportError::invalid("--tag has no effect on the synthetic source"));
            }
            let source = SyntheticSource::new(cli.seed).with_success_ratio(cli.success_ratio);
            Ok((Box::new(source), Box::new(NoLeadTimes)))
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = ReportConfig::parse(
        cli.since.as_deref(),
        cli.until.as_deref(),
        cli.interval.as_deref(),
        cli.moving_average,
    )?;
    let (source, resolver) = build_source(&cli)?;

    log::info!("🚀 Starting DORA report");
    log::info!("   Source: {}", source.name());
    if cli.source == SourceKind::Git {
        log::info!("   Repository: {}", cli.repo.display());
    }
    log::info!("   Moving average: {}", config.moving_average);

    let report = ReportPipeline::new(source.as_ref(), resolver.as_ref(), config).run(Utc::now())?;
    if report.lead_times_unresolved > 0 {
        log::warn!(
            "Lead time could not be computed for {} of {} change(s)",
            report.lead_times_unresolved,
            report.events_collected
        );
    }

    let rows = ReportRow::from_report(&report);
    let smoothed = report.is_smoothed();

    ReportWriter::stdout(smoothed).write_all(&rows)?;

    for (format, path) in [(OutputFormat::Csv, &cli.csv), (OutputFormat::Jsonl, &cli.jsonl)] {
        if let Some(path) = path {
            let mut writer = ReportWriter::create(format, path, smoothed)?;
            writer.write_all(&rows)?;
            log::info!("✅ Wrote {} row(s) to {}", rows.len(), path.display());
        }
    }

    Ok(())
}
