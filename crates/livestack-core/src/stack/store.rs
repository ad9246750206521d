use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::consts::STACK_EXTENSION;
use crate::error::{LiveStackError, Result};
use crate::frame::Frame;
use crate::io::fits::{read_fits, write_fits};
use crate::key::StackKey;

use super::Stack;

/// Overview of one stored stack.
#[derive(Clone, Debug)]
pub struct StackSummary {
    pub path: PathBuf,
    pub key: String,
    pub role: &'static str,
    pub count: u32,
    pub width: usize,
    pub height: usize,
}

/// Durable mapping from stack key to `<root>/<key>.fits`.
#[derive(Clone, Debug)]
pub struct StackStore {
    root: PathBuf,
}

impl StackStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &StackKey) -> PathBuf {
        self.root
            .join(format!("{}.{}", key.file_stem(), STACK_EXTENSION))
    }

    pub fn exists(&self, key: &StackKey) -> bool {
        self.path_for(key).is_file()
    }

    /// Load the stack for `key`, or `None` if nothing has been stored yet.
    /// A file whose metadata names a different key is an error.
    pub fn load(&self, key: &StackKey) -> Result<Option<Stack>> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Ok(None);
        }
        let (header, data) = read_fits(&path)?;
        let frame = Frame::classify(&header, data)?;
        let stored = frame.stack_key();
        if stored != *key {
            warn!(requested = %key, stored = %stored, "Stored stack metadata does not match its key");
            return Err(LiveStackError::InvalidFits(format!(
                "{} holds stack {stored}, expected {key}",
                path.display()
            )));
        }
        Ok(Some(Stack {
            key: key.clone(),
            frame,
        }))
    }

    /// Load the stack for `key`, which must already exist.
    pub fn require(&self, key: &StackKey) -> Result<Stack> {
        self.load(key)?
            .ok_or_else(|| LiveStackError::MissingReferenceStack(key.to_string()))
    }

    /// Persist `stack`, replacing any previous version.
    ///
    /// The file is written beside the target and renamed over it, so a
    /// reader sees either the old or the new stack, never a partial one.
    pub fn save(&self, stack: &Stack) -> Result<PathBuf> {
        let path = self.path_for(&stack.key);
        let staging = path.with_extension(format!("{STACK_EXTENSION}.tmp"));
        write_fits(&staging, &stack.frame.fits_header(), &stack.frame.data)?;
        fs::rename(&staging, &path)?;
        debug!(key = %stack.key, count = stack.count(), path = %path.display(), "Stack saved");
        Ok(path)
    }

    /// Summaries of every stored stack, sorted by file name.
    pub fn list(&self) -> Result<Vec<StackSummary>> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == STACK_EXTENSION))
            .collect();
        paths.sort();

        let mut summaries = Vec::with_capacity(paths.len());
        for path in paths {
            let (header, data) = read_fits(&path)?;
            let frame = Frame::classify(&header, data)?;
            summaries.push(StackSummary {
                key: frame.stack_key().to_string(),
                role: frame.role().name(),
                count: frame.sample_count,
                width: frame.width(),
                height: frame.height(),
                path,
            });
        }
        Ok(summaries)
    }
}
