use std::path::PathBuf;
use std::time::Instant;

use tracing::debug;

use crate::error::Result;
use crate::key::StackKey;

/// Processing stage of one ingested item, used for timing logs.
#[derive(Clone, Copy, Debug)]
pub enum Stage {
    Decoding,
    Seeding,
    DarkSubtraction,
    FlatDivision,
    Alignment,
    Merging,
    Preview,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decoding => write!(f, "Decoding frame"),
            Self::Seeding => write!(f, "Seeding stack"),
            Self::DarkSubtraction => write!(f, "Subtracting dark"),
            Self::FlatDivision => write!(f, "Dividing flat"),
            Self::Alignment => write!(f, "Aligning frame"),
            Self::Merging => write!(f, "Merging into stack"),
            Self::Preview => write!(f, "Rendering preview"),
        }
    }
}

/// Result of ingesting one source path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The path was already in the ledger.
    Skipped,
    /// The frame started a new stack. Light stacks also get a preview.
    Seeded {
        key: StackKey,
        preview: Option<PathBuf>,
    },
    /// The frame was merged into an existing stack, which now holds
    /// `count` exposures.
    Merged {
        key: StackKey,
        count: u32,
        preview: Option<PathBuf>,
    },
}

/// Run one stage and log how long it took.
pub(super) fn timed<T>(stage: Stage, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let started = Instant::now();
    let result = f();
    debug!(
        stage = %stage,
        elapsed_ms = started.elapsed().as_millis() as u64,
        ok = result.is_ok(),
        "Stage finished"
    );
    result
}
