use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use livestack_core::stack::StackStore;

use crate::summary::print_stack_table;

#[derive(Args)]
pub struct StacksArgs {
    /// Storage directory holding the stacks
    #[arg(long, default_value = "stacks")]
    pub storage: PathBuf,
}

pub fn run(args: &StacksArgs) -> Result<()> {
    let store = StackStore::open(&args.storage)
        .with_context(|| format!("Failed to open storage {}", args.storage.display()))?;
    let stacks = store.list()?;

    if stacks.is_empty() {
        println!("No stacks in {}", args.storage.display());
        return Ok(());
    }
    print_stack_table(&stacks);
    Ok(())
}
