use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use livestack_core::frame::{Frame, Role};
use livestack_core::io::fits::read_fits;

#[derive(Args)]
pub struct InfoArgs {
    /// Input FITS file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let (header, data) = read_fits(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let frame = Frame::classify(&header, data)?;
    let acq = &frame.acquisition;

    println!("File:         {}", args.file.display());
    println!("Dimensions:   {}x{}", frame.width(), frame.height());
    println!("Role:         {}", acq.role.name());
    println!("Camera:       {}", acq.camera);
    println!("Exposure:     {} s", acq.exposure);
    println!("Gain:         {}", acq.gain);
    println!("Temperature:  {} C (bucketed)", acq.temperature);
    match &acq.role {
        Role::Light { target, filter } => {
            println!("Target:       {}", target);
            println!("Filter:       {}", filter);
        }
        Role::Flat { filter } => println!("Filter:       {}", filter),
        Role::Dark => {}
    }
    println!("Sub count:    {}", frame.sample_count);
    if let Some(ref dark) = frame.dark {
        println!("Dark applied: {}", dark);
    }

    println!();
    println!("Stack key:    {}", frame.stack_key());
    if let Some(key) = frame.dark_lookup_key() {
        println!("Dark lookup:  {}", key);
    }
    if let Some(key) = frame.flat_lookup_key() {
        println!("Flat lookup:  {}", key);
    }

    Ok(())
}
