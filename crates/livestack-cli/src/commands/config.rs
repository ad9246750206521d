use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use livestack_core::pipeline::config::PipelineConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Storage directory recorded in the generated config
    #[arg(long, default_value = "stacks")]
    pub storage: PathBuf,

    /// Preview directory recorded in the generated config
    #[arg(long, default_value = "previews")]
    pub previews: PathBuf,

    /// Save to this file instead of printing
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Emit a pipeline config with every tunable at its default.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = PipelineConfig::new(&args.storage, &args.previews);
    let rendered = toml::to_string_pretty(&config).context("Failed to serialise config")?;

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write config to {}", path.display()))?;
            println!("Config written to {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
