use std::borrow::Cow;

use ndarray::Zip;
use tracing::debug;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{LiveStackError, Result};
use crate::filters::Smoother;
use crate::frame::{Frame, PixelGrid, Role};

use super::{Stack, StackStore};

/// Fold one more sample into an equally weighted mean of `count` samples:
/// `(count * mean + sample) / (count + 1)`.
pub fn running_mean(mean: &PixelGrid, count: u32, sample: &PixelGrid) -> Result<PixelGrid> {
    if mean.dim() != sample.dim() {
        return Err(LiveStackError::ShapeMismatch {
            expected: mean.dim(),
            actual: sample.dim(),
        });
    }
    let n = f64::from(count);
    let combine = |&m: &f64, &s: &f64| (n * m + s) / (n + 1.0);

    let zip = Zip::from(mean).and(sample);
    Ok(if mean.len() >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_map_collect(combine)
    } else {
        zip.map_collect(combine)
    })
}

/// Merges frames into their stacks and persists the result.
pub struct Combiner<'a> {
    store: &'a StackStore,
    smoother: &'a dyn Smoother,
}

impl<'a> Combiner<'a> {
    pub fn new(store: &'a StackStore, smoother: &'a dyn Smoother) -> Self {
        Self { store, smoother }
    }

    /// Merge `frame` into `stack`, save it and return the updated stack.
    ///
    /// Light frames are merged as given. Dark and flat frames are smoothed
    /// first; calibration stacks trade resolution for lower noise.
    pub fn merge(&self, mut stack: Stack, frame: &Frame) -> Result<Stack> {
        let sample = match frame.role() {
            Role::Light { .. } => Cow::Borrowed(&frame.data),
            Role::Dark | Role::Flat { .. } => Cow::Owned(self.smoother.smooth(&frame.data)),
        };

        stack.frame.data = running_mean(&stack.frame.data, stack.count(), &sample)?;
        stack.frame.sample_count = stack.frame.sample_count.saturating_add(1);
        if frame.dark.is_some() {
            stack.frame.dark = frame.dark.clone();
        }

        self.store.save(&stack)?;
        debug!(key = %stack.key, count = stack.count(), "Frame merged");
        Ok(stack)
    }
}
