use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::consts::LEDGER_FILE_NAME;
use crate::error::{LiveStackError, Result};

/// Append-only record of every source path that has been taken for
/// processing, one per line in `<root>/processed.txt`.
///
/// Membership is held in memory; every mark is flushed and synced to disk
/// before `mark_processed` returns.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: HashSet<String>,
    file: File,
}

impl Ledger {
    /// Open the ledger under `root`, loading all previously recorded paths.
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let path = root.join(LEDGER_FILE_NAME);

        let mut entries = HashSet::new();
        if path.is_file() {
            let reader = BufReader::new(File::open(&path)?);
            for line in reader.lines() {
                let line = line?;
                if !line.is_empty() {
                    entries.insert(line);
                }
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(entries = entries.len(), path = %path.display(), "Ledger loaded");

        Ok(Self {
            path,
            entries,
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Paths that are not valid UTF-8 are never recorded, so they are never
    /// reported as processed.
    pub fn has(&self, source: &Path) -> bool {
        source.to_str().is_some_and(|entry| self.entries.contains(entry))
    }

    /// Record `source` as processed. Marking an already recorded path is a
    /// no-op. Paths that are not valid UTF-8, or that contain line breaks,
    /// cannot be stored one per line and are rejected.
    pub fn mark_processed(&mut self, source: &Path) -> Result<()> {
        let entry = source.to_str().ok_or_else(|| {
            LiveStackError::Pipeline(format!(
                "cannot record path that is not valid UTF-8: {}",
                source.display()
            ))
        })?;
        if entry.contains(['\n', '\r']) {
            return Err(LiveStackError::Pipeline(format!(
                "cannot record path containing a line break: {entry:?}"
            )));
        }
        if self.entries.contains(entry) {
            return Ok(());
        }

        writeln!(self.file, "{entry}")?;
        self.file.flush()?;
        self.file.sync_data()?;
        self.entries.insert(entry.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
