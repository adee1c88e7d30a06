//! Cardiorisk: heart-disease risk scoring
//!
//! Main entry point for the command-line scorer.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cardiorisk::adapters::{ArtifactFile, CsvRecordSource, CsvResultSink};
use cardiorisk::config::{Config, LogMode, ARTIFACT_ENV, RANGE_PROFILE_ENV};
use cardiorisk::domain::{Label, PatientRecord, RangeProfile};
use cardiorisk::ports::ResultSink;
use cardiorisk::{CardioriskError, RiskService};

#[derive(Parser)]
#[command(name = "cardiorisk", version, about = "Heart-disease risk scoring")]
struct Cli {
    /// Model artifact file or directory
    #[arg(long, global = true, env = ARTIFACT_ENV)]
    artifact: Option<PathBuf>,

    /// Range profile: standard or extended
    #[arg(long, global = true, env = RANGE_PROFILE_ENV)]
    profile: Option<RangeProfile>,

    /// Score batches on a single thread
    #[arg(long, global = true)]
    sequential: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score every row of a CSV file
    Batch {
        /// Input CSV with a header row
        input: PathBuf,

        /// Output CSV (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Score a single patient record
    Predict(RecordArgs),

    /// Print the artifact's encoded column layout
    Inspect,
}

#[derive(Args)]
struct RecordArgs {
    #[arg(long)]
    age: i64,
    /// 0 = female, 1 = male
    #[arg(long)]
    sex: i64,
    /// Chest pain type (1-4)
    #[arg(long)]
    cp: i64,
    /// Resting blood pressure (mm Hg)
    #[arg(long)]
    trestbps: i64,
    /// Serum cholesterol (mg/dl)
    #[arg(long)]
    chol: i64,
    /// Fasting blood sugar > 120 mg/dl (0/1)
    #[arg(long)]
    fbs: i64,
    /// Resting ECG result (0-2)
    #[arg(long)]
    restecg: i64,
    /// Maximum heart rate achieved
    #[arg(long)]
    thalach: i64,
    /// Exercise-induced angina (0/1)
    #[arg(long)]
    exang: i64,
    /// ST depression induced by exercise
    #[arg(long, allow_negative_numbers = true)]
    oldpeak: f64,
    /// Slope of the peak exercise ST segment (1-3)
    #[arg(long)]
    slope: i64,
    /// Major vessels colored by fluoroscopy (0-3)
    #[arg(long)]
    ca: i64,
    /// Thalassemia (3, 6, 7)
    #[arg(long)]
    thal: i64,
}

impl From<RecordArgs> for PatientRecord {
    fn from(a: RecordArgs) -> Self {
        Self {
            age: a.age,
            sex: a.sex,
            cp: a.cp,
            trestbps: a.trestbps,
            chol: a.chol,
            fbs: a.fbs,
            restecg: a.restecg,
            thalach: a.thalach,
            exang: a.exang,
            oldpeak: a.oldpeak,
            slope: a.slope,
            ca: a.ca,
            thal: a.thal,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().context("Invalid CARDIORISK_* environment")?;
    if let Some(path) = cli.artifact {
        config.artifact = path;
    }
    if let Some(profile) = cli.profile {
        config.profile = profile;
    }
    if cli.sequential {
        config.parallel = false;
    }

    // Initialize logging. Stdout is reserved for scored output.
    let (writer, _guard) = match config.log_mode {
        LogMode::File => {
            if let Some(parent) = config.log_file.parent() {
                // Best-effort: the open below reports the real failure.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.log_file)
                .with_context(|| format!("Failed to open log file {:?}", config.log_file))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    let mut source = ArtifactFile::new(&config.artifact);
    if let Some(key) = config.trusted_key {
        source = source.with_trusted_key(key);
    }
    let service = RiskService::initialize(&source, config.schema())
        .context("Failed to load model artifact")?
        .with_parallel(config.parallel);

    match cli.command {
        Command::Batch { input, output } => run_batch(&service, &input, output),
        Command::Predict(args) => run_predict(&service, &args.into()),
        Command::Inspect => run_inspect(&service),
    }
}

fn run_batch(service: &RiskService, input: &Path, output: Option<PathBuf>) -> Result<()> {
    let mut reader = CsvRecordSource::from_path(input)
        .with_context(|| format!("Failed to open {input:?}"))?;

    let mut sink: Box<dyn ResultSink> = match &output {
        Some(path) => Box::new(
            CsvResultSink::from_path(path).with_context(|| format!("Failed to create {path:?}"))?,
        ),
        None => Box::new(CsvResultSink::from_writer(std::io::stdout().lock())),
    };

    match service.score_table(&mut reader, sink.as_mut()) {
        Ok(report) => {
            let failed = report.len() - report.scored_count();
            if failed > 0 {
                tracing::warn!("{} row(s) could not be scored", failed);
            }
            Ok(())
        }
        Err(CardioriskError::Validation(e)) => Err(anyhow::Error::new(e).context("Batch rejected")),
        Err(e) => Err(e).context("Batch scoring failed"),
    }
}

fn run_predict(service: &RiskService, record: &PatientRecord) -> Result<()> {
    let result = service.predict(record).context("Prediction failed")?;
    let verdict = match result.label {
        Label::Positive => "heart disease likely",
        Label::Negative => "heart disease unlikely",
    };

    let mut out = std::io::stdout().lock();
    writeln!(out, "prediction: {} ({verdict})", result.label)?;
    writeln!(out, "risk: {:.1}%", result.risk_percent())?;
    Ok(())
}

fn run_inspect(service: &RiskService) -> Result<()> {
    let artifact = service.artifact();
    let mut out = std::io::stdout().lock();

    writeln!(out, "range profile: {}", service.schema().profile())?;
    writeln!(out, "encoded columns: {}", artifact.width())?;
    writeln!(out, "bias: {}", artifact.bias())?;
    for s in artifact.numeric() {
        writeln!(out, "  {:<10} mean={:.4} std={:.4}", s.field, s.mean, s.std)?;
    }
    for m in artifact.categorical() {
        writeln!(out, "  {:<10} categories={:?} reference={}", m.field, m.categories(), m.reference())?;
    }
    for (name, weight) in artifact.columns().iter().zip(artifact.weights()) {
        writeln!(out, "  {name:<12} {weight:+.4}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_names_environment_variables() {
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("[env: CARDIORISK_ARTIFACT"));
        assert!(help.contains("[env: CARDIORISK_RANGE_PROFILE"));
    }

    #[test]
    fn test_flags_parse_profile() {
        let cli = Cli::try_parse_from(["cardiorisk", "--profile", "extended", "inspect"])
            .expect("Should parse");
        assert_eq!(cli.profile, Some(RangeProfile::Extended));
        assert!(matches!(cli.command, Command::Inspect));
    }
}
