//! macinspect
//!
//! Replays a model directory's predictions and prints attention-shaded rows.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use macinspect::{
    count_records, ColorMode, DisplayFilter, Inspector, JsonLinesReader, Renderer, RunConfig,
    RunOptions, Vocab, WriteSink, ZipPolicy, DEFAULT_LIMIT,
};

/// How to report the run's tallies once the stream ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SummaryFormat {
    None,
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "macinspect", version, about = "Inspect MAC-graph predictions and their attention")]
struct Args {
    /// Model directory holding the frozen config.yaml
    #[arg(long)]
    model_dir: PathBuf,

    /// Stop after this many rows (plus one)
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    n_rows: usize,

    /// Only inspect records whose type string starts with this
    #[arg(long)]
    type_string_prefix: Option<String>,

    /// Only display correct predictions
    #[arg(long)]
    correct_only: bool,

    /// Only display wrong predictions
    #[arg(long)]
    wrong_only: bool,

    /// Fail on attention that does not line up with its tokens instead of truncating
    #[arg(long)]
    strict_shapes: bool,

    /// Never emit terminal colors
    #[arg(long)]
    no_color: bool,

    /// Report tallies after the run
    #[arg(long, value_enum, default_value_t = SummaryFormat::None)]
    summary: SummaryFormat,
}

impl Args {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            limit: self.n_rows,
            type_prefix: self.type_string_prefix.clone(),
            filter: DisplayFilter {
                correct_only: self.correct_only,
                wrong_only: self.wrong_only,
            },
        }
    }

    fn zip_policy(&self) -> ZipPolicy {
        if self.strict_shapes {
            ZipPolicy::Strict
        } else {
            ZipPolicy::Truncate
        }
    }

    fn color_mode(&self) -> ColorMode {
        if self.no_color || !io::stdout().is_terminal() {
            ColorMode::Never
        } else {
            ColorMode::Always
        }
    }
}

fn init_logging(level: tracing::Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = RunConfig::load(&args.model_dir)?;
    init_logging(config.level()?);

    let total = count_records(&config.predict_input_path)?;
    info!("Predicting on {total} input records");

    let vocab = Vocab::load(&config.vocab_path)?;
    info!(tokens = vocab.len(), path = %config.vocab_path.display(), "vocabulary loaded");

    let renderer = Renderer::new(&vocab)
        .with_policy(args.zip_policy())
        .with_color_mode(args.color_mode());
    let inspector = Inspector::new(renderer, args.run_options());

    let predictions = JsonLinesReader::open(&config.predict_input_path)?;
    let mut sink = WriteSink::new(io::stdout().lock());
    let summary = inspector.run(predictions, &mut sink)?;

    match args.summary {
        SummaryFormat::None => {}
        SummaryFormat::Text => print!("{}", summary.counters),
        SummaryFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    Ok(())
}
