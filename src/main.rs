use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{error, info, LevelFilter};

use neonatal_adr::pipeline::refresh_backgrounds;
use neonatal_adr::{AdrDataset, AdrPipeline, AppConfig, EncoderRegistry, ExplanationMode, RawRecord};

#[derive(Debug, Parser)]
#[command(
    name = "adr-predict",
    version,
    about = "Predict neonatal adverse drug reactions and explain the prediction"
)]
struct Cli {
    /// Increase verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the model artifacts
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Dataset CSV file
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    /// Where to write the explanation chart
    #[arg(long, global = true)]
    plot: Option<PathBuf>,

    /// Attribution source for the chart
    #[arg(long, value_enum, global = true)]
    mode: Option<ModeArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Live,
    Precomputed,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Predict reaction and outcome for one patient
    Predict(PredictArgs),
    /// List the product and reason options found in the dataset
    Options,
    /// Fit label encoders from the dataset and write them to a directory,
    /// refreshing the background rows of any explanation artifacts there
    FitEncoders {
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Args)]
struct PredictArgs {
    #[arg(long)]
    product: String,
    #[arg(long)]
    reason: String,
    #[arg(long)]
    sex: String,
    #[arg(long)]
    age: String,
    #[arg(long)]
    weight: String,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn resolve_config(cli: &Cli) -> neonatal_adr::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    if let Some(dir) = &cli.model_dir {
        config.model_dir = dir.clone();
    }
    if let Some(path) = &cli.dataset {
        config.dataset_path = path.clone();
    }
    if let Some(path) = &cli.plot {
        config.plot_path = path.clone();
    }
    if let Some(mode) = cli.mode {
        config.explanation.mode = match mode {
            ModeArg::Live => ExplanationMode::Live,
            ModeArg::Precomputed => ExplanationMode::Precomputed,
        };
    }
    Ok(config)
}

fn run(cli: Cli) -> neonatal_adr::Result<()> {
    let config = resolve_config(&cli)?;
    match cli.command {
        Command::Predict(args) => {
            let pipeline = AdrPipeline::load(&config)?;
            let record = RawRecord::new(args.product, args.reason, args.sex, args.age, args.weight);
            let report = pipeline.handle(&record)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
        }
        Command::Options => {
            let dataset = AdrDataset::from_csv(&config.dataset_path)?;
            println!("Products:");
            for p in dataset.unique_products() {
                println!("  {}", p);
            }
            println!("Reasons for use:");
            for r in dataset.unique_reasons() {
                println!("  {}", r);
            }
        }
        Command::FitEncoders { out } => {
            let dataset = AdrDataset::from_csv(&config.dataset_path)?;
            let registry = EncoderRegistry::fit(&dataset)?;
            registry.save(&out)?;
            info!("Wrote encoders to {}", out.display());
            let background = dataset.feature_matrix(&registry)?;
            let refreshed = refresh_backgrounds(&out, &background)?;
            if refreshed == 0 {
                info!("No explanation artifacts in {}; background not written", out.display());
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_startup_fatal() {
                error!("startup failed: {}", e);
            }
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
