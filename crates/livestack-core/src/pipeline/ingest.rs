use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::align::{align_to_stack, PhaseCorrelationRegistrar, Registrar};
use crate::calibration::CalibrationResolver;
use crate::error::Result;
use crate::filters::{GaussianSmoother, Smoother};
use crate::frame::{Frame, Role};
use crate::io::fits::read_fits;
use crate::io::preview::write_preview;
use crate::ledger::Ledger;
use crate::stack::{Combiner, Stack, StackStore};

use super::config::{PipelineConfig, PreviewConfig};
use super::subscribers::Subscribers;
use super::types::{timed, Outcome, Stage};

/// Registration and smoothing implementations used by an ingestor.
pub struct Collaborators {
    pub registrar: Box<dyn Registrar>,
    pub smoother: Box<dyn Smoother>,
}

impl Collaborators {
    /// Phase-correlation registration and Gaussian smoothing.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            registrar: Box::new(PhaseCorrelationRegistrar),
            smoother: Box::new(GaussianSmoother {
                sigma: config.smoothing.sigma,
            }),
        }
    }
}

/// Runs the full per-item sequence: ledger check and mark, classification,
/// then seeding or calibration, alignment and merging.
///
/// Owns the ledger and the stack store; only one ingestor should operate
/// on a storage directory at a time.
pub struct Ingestor {
    ledger: Ledger,
    store: StackStore,
    output_dir: PathBuf,
    preview: PreviewConfig,
    registrar: Box<dyn Registrar>,
    smoother: Box<dyn Smoother>,
    subscribers: Arc<Subscribers>,
}

impl Ingestor {
    pub fn open(
        config: &PipelineConfig,
        collaborators: Collaborators,
        subscribers: Arc<Subscribers>,
    ) -> Result<Self> {
        let store = StackStore::open(&config.storage_dir)?;
        let ledger = Ledger::open(&config.storage_dir)?;
        std::fs::create_dir_all(&config.output_dir)?;

        Ok(Self {
            ledger,
            store,
            output_dir: config.output_dir.clone(),
            preview: config.preview.clone(),
            registrar: collaborators.registrar,
            smoother: collaborators.smoother,
            subscribers,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn store(&self) -> &StackStore {
        &self.store
    }

    /// Ingest one source file.
    ///
    /// The path is marked processed before anything else is attempted, so a
    /// file that fails here is never retried.
    pub fn ingest(&mut self, source: &Path) -> Result<Outcome> {
        if self.ledger.has(source) {
            info!(path = %source.display(), "Skipping already processed file");
            return Ok(Outcome::Skipped);
        }
        self.ledger.mark_processed(source)?;

        let mut frame = timed(Stage::Decoding, || {
            let (header, data) = read_fits(source)?;
            Frame::classify(&header, data)
        })?;
        let key = frame.stack_key();

        if !self.store.exists(&key) {
            return timed(Stage::Seeding, || self.seed(frame));
        }

        let resolver = CalibrationResolver::new(&self.store);
        let combiner = Combiner::new(&self.store, self.smoother.as_ref());

        match frame.role().clone() {
            Role::Light { .. } => {
                let stack = self.store.require(&key)?;
                timed(Stage::DarkSubtraction, || resolver.subtract_dark(&mut frame))?;
                timed(Stage::FlatDivision, || resolver.divide_flat(&mut frame))?;
                frame.data = timed(Stage::Alignment, || {
                    align_to_stack(self.registrar.as_ref(), &frame, Some(&stack))
                })?;
                let stack = timed(Stage::Merging, || combiner.merge(stack, &frame))?;
                let preview = self.publish_preview(&stack)?;
                info!(key = %key, count = stack.count(), "Merged light frame");
                Ok(Outcome::Merged {
                    key,
                    count: stack.count(),
                    preview: Some(preview),
                })
            }
            Role::Dark => {
                let stack = self.store.require(&key)?;
                let stack = timed(Stage::Merging, || combiner.merge(stack, &frame))?;
                info!(key = %key, count = stack.count(), "Merged dark frame");
                Ok(Outcome::Merged {
                    key,
                    count: stack.count(),
                    preview: None,
                })
            }
            Role::Flat { .. } => {
                timed(Stage::DarkSubtraction, || resolver.subtract_dark(&mut frame))?;
                let stack = self.store.require(&key)?;
                let stack = timed(Stage::Merging, || combiner.merge(stack, &frame))?;
                info!(key = %key, count = stack.count(), "Merged flat frame");
                Ok(Outcome::Merged {
                    key,
                    count: stack.count(),
                    preview: None,
                })
            }
        }
    }

    /// Store the first frame of a key as-is: no calibration, alignment or
    /// smoothing.
    fn seed(&self, frame: Frame) -> Result<Outcome> {
        let stack = Stack::seed(frame);
        self.store.save(&stack)?;
        info!(key = %stack.key, "Seeded new stack");

        let preview = match stack.frame.role() {
            Role::Light { .. } => Some(self.publish_preview(&stack)?),
            Role::Dark | Role::Flat { .. } => None,
        };
        Ok(Outcome::Seeded {
            key: stack.key,
            preview,
        })
    }

    fn publish_preview(&self, stack: &Stack) -> Result<PathBuf> {
        let path = timed(Stage::Preview, || {
            write_preview(stack, &self.output_dir, &self.preview)
        })?;
        let delivered = self.subscribers.notify(&path);
        info!(path = %path.display(), subscribers = delivered, "Preview published");
        Ok(path)
    }
}
