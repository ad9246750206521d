use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use livestack_core::pipeline::config::PipelineConfig;
use livestack_core::pipeline::Pipeline;
use tracing::info;

use crate::summary::print_ingest_summary;

/// Extensions picked up when a directory is given as input.
const FITS_EXTENSIONS: [&str; 3] = ["fits", "fit", "fts"];

#[derive(Args)]
pub struct IngestArgs {
    /// FITS files or directories of FITS files, processed in order
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Pipeline config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding stacks and the processed ledger
    #[arg(long, default_value = "stacks")]
    pub storage: PathBuf,

    /// Directory receiving preview PNGs
    #[arg(short, long, default_value = "previews")]
    pub output: PathBuf,

    /// Gaussian sigma applied to darks and flats before merging
    #[arg(long)]
    pub sigma: Option<f64>,
}

pub fn run(args: &IngestArgs) -> Result<()> {
    let config = load_config(args)?;
    let files = collect_inputs(&args.inputs)?;
    if files.is_empty() {
        bail!("No FITS files found in the given inputs");
    }

    let pipeline = Pipeline::new(config.clone()).context("Failed to open pipeline")?;
    let (_id, previews) = pipeline.subscribe();
    pipeline.start()?;

    info!(files = files.len(), "Submitting files");
    let start = Instant::now();
    for file in &files {
        pipeline.submit(file.clone());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner} [{bar:40}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    let mut published = Vec::new();
    while pipeline.pending() > 0 {
        while let Ok(path) = previews.try_recv() {
            pb.println(format!("  Preview  {}", path.display()));
            published.push(path);
        }
        pb.set_position((files.len() - pipeline.pending().min(files.len())) as u64);
        thread::sleep(Duration::from_millis(50));
    }
    pipeline.wait_idle();
    pipeline.stop();
    for path in previews.try_iter() {
        pb.println(format!("  Preview  {}", path.display()));
        published.push(path);
    }
    pb.finish_and_clear();

    published.sort();
    published.dedup();
    print_ingest_summary(&config, files.len(), &published, start.elapsed());
    Ok(())
}

fn load_config(args: &IngestArgs) -> Result<PipelineConfig> {
    let mut config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid pipeline config")?
    } else {
        PipelineConfig::new(&args.storage, &args.output)
    };
    if let Some(sigma) = args.sigma {
        config.smoothing.sigma = sigma;
    }
    Ok(config)
}

/// Expand directories into their FITS files, sorted by name. Plain files
/// are passed through in the order given.
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)
                .with_context(|| format!("Failed to read directory {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_fits(p))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn is_fits(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FITS_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}
