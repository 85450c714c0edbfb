use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use viewing_periods::features::DateParsing;
use viewing_periods::{analysis, export, report, AnalysisConfig};

#[derive(Parser)]
#[command(name = "viewing-periods")]
#[command(about = "Compare viewing habits during high-load periods against the rest of the year", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over a viewing-history CSV
    Analyze {
        #[arg(long)]
        input: PathBuf,
        /// TOML file with periods and analysis settings
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Keep only events from this calendar year
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        binge_threshold: Option<usize>,
        #[arg(long)]
        alpha: Option<f64>,
        /// Accept a few common date formats besides the configured one
        #[arg(long)]
        lenient_dates: bool,
    },
    /// Validate a config file and print its periods
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(fmt::layer().without_time().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze {
            input,
            config,
            out_dir,
            year,
            binge_threshold,
            alpha,
            lenient_dates,
        } => {
            let mut config = load_config(config.as_ref())?;
            if year.is_some() {
                config.analysis_year = year;
            }
            if let Some(threshold) = binge_threshold {
                config.binge_threshold = threshold;
            }
            if let Some(alpha) = alpha {
                config.significance_level = alpha;
            }
            if lenient_dates {
                config.date_parsing = DateParsing::Lenient;
            }
            config.validate().context("invalid settings")?;

            let records = export::read_records(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let result = analysis::analyze(records, &config).context("analysis failed")?;

            let written = export::write_tables(&result, &out_dir)
                .with_context(|| format!("failed to write tables to {}", out_dir.display()))?;
            let json_path = out_dir.join("test_results.json");
            export::write_json(&result, &json_path)
                .with_context(|| format!("failed to write {}", json_path.display()))?;
            let report_path = out_dir.join("report.md");
            std::fs::write(&report_path, report::build_report(&result, config.significance_level))
                .with_context(|| format!("failed to write {}", report_path.display()))?;

            if result.events.is_empty() {
                println!("No viewing events found for this window.");
            } else {
                println!(
                    "Analyzed {} views across {} days; {} binge sessions.",
                    result.events.len(),
                    result.daily.len(),
                    result.binges.len()
                );
                let period = &result.tests.period_mean;
                if period.is_defined() {
                    println!(
                        "Period vs rest t-test: t = {:.3}, p = {:.4}.",
                        period.statistic, period.p_value
                    );
                }
            }
            println!(
                "Wrote {} tables, {} and {}.",
                written.len(),
                json_path.display(),
                report_path.display()
            );
        }
        Commands::CheckConfig { config } => {
            let config = AnalysisConfig::load(&config)
                .with_context(|| format!("failed to load config from {}", config.display()))?;
            println!("Config OK: {} periods.", config.periods.len());
            for interval in config.periods.intervals() {
                println!("- {} to {}", interval.start(), interval.end());
            }
        }
    }

    Ok(())
}
