//! Main benchmark CLI executable.

use clap::{Parser, Subcommand};
use digitbench::benchmarks::{
    BenchmarkOrchestrator, ConfigLoader, DEFAULT_CONFIG_PATH, StdoutProgressSink, print_summary,
    read_results,
};
use digitbench::errors::BenchmarkResult;
use digitbench::samples::{IdxDataset, write_dataset};
use digitbench::{InstructionModelInfo, PackedModel};
use log::{error, info};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "digitbench",
    about = "Compare load and inference latency of two runtimes on a digit classifier",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the benchmark and write the results CSV
    Run {
        /// JSON configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Number of samples, overrides the configuration
        #[arg(long)]
        samples: Option<u32>,
        /// Results file, overrides the configuration
        #[arg(long)]
        output: Option<PathBuf>,
        /// Sample directory, overrides the configuration
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Write sample-<i>.json files from MNIST IDX files
    Generate {
        /// IDX images file (e.g. t10k-images-idx3-ubyte)
        #[arg(long)]
        images: PathBuf,
        /// IDX labels file (e.g. t10k-labels-idx1-ubyte)
        #[arg(long)]
        labels: PathBuf,
        /// Output directory
        #[arg(long, default_value = "public/data")]
        out: PathBuf,
        /// Number of samples to write (all when omitted)
        #[arg(long)]
        count: Option<usize>,
    },
    /// Convert a JSON instruction model into a packed model
    Convert {
        /// Instruction model JSON file
        #[arg(long)]
        model: PathBuf,
        /// Packed model output file
        #[arg(long)]
        out: PathBuf,
    },
    /// Summarize one or more results files
    Summary {
        /// Results CSV files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            config,
            samples,
            output,
            data_dir,
        } => cmd_run(config, samples, output, data_dir),
        Commands::Generate {
            images,
            labels,
            out,
            count,
        } => cmd_generate(images, labels, out, count),
        Commands::Convert { model, out } => cmd_convert(model, out),
        Commands::Summary { files } => cmd_summary(files),
    };

    if let Err(e) = result {
        error!("digitbench failed: {}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_run(
    config_path: PathBuf,
    samples: Option<u32>,
    output: Option<PathBuf>,
    data_dir: Option<PathBuf>,
) -> BenchmarkResult<()> {
    let mut config = ConfigLoader::load_benchmark_config(&config_path)?;
    if let Some(samples) = samples {
        config.sample_count = samples;
    }
    if let Some(output) = output {
        config.output = output;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }

    let orchestrator =
        BenchmarkOrchestrator::from_config(&config)?.with_progress(StdoutProgressSink);
    let report = orchestrator.start(config.sample_count)?;

    print_summary(&config.name, &report.summaries());
    println!("\nResults written to {}", config.output.display());
    Ok(())
}

fn cmd_generate(
    images: PathBuf,
    labels: PathBuf,
    out: PathBuf,
    count: Option<usize>,
) -> BenchmarkResult<()> {
    let dataset = IdxDataset::open(&images, &labels)?;
    let written = write_dataset(&dataset, &out, count)?;
    println!("Wrote {} samples to {}", written, out.display());
    Ok(())
}

fn cmd_convert(model: PathBuf, out: PathBuf) -> BenchmarkResult<()> {
    let info = InstructionModelInfo::from_json_str(&fs::read_to_string(&model)?)?;
    let packed = PackedModel::from_info(&info)?;
    fs::write(&out, packed.to_bytes())?;

    info!(
        "Packed {} ({} inputs, {} outputs) into {} words",
        model.display(),
        packed.feature_size(),
        packed.output_size(),
        packed.full_size()
    );
    println!("Wrote packed model to {}", out.display());
    Ok(())
}

fn cmd_summary(files: Vec<PathBuf>) -> BenchmarkResult<()> {
    for file in files {
        let report = read_results(&file)?;
        print_summary(&file.display().to_string(), &report.summaries());
    }
    Ok(())
}
