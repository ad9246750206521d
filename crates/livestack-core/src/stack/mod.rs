pub mod combine;
pub mod store;

use crate::frame::{Frame, PixelGrid};
use crate::key::StackKey;

pub use combine::{running_mean, Combiner};
pub use store::{StackStore, StackSummary};

/// The running combination of every frame merged under one key.
#[derive(Clone, Debug)]
pub struct Stack {
    pub key: StackKey,
    /// Accumulated pixels and metadata; `frame.sample_count` is the number
    /// of exposures merged so far.
    pub frame: Frame,
}

impl Stack {
    /// Start a new stack from the first frame seen for its key.
    pub fn seed(frame: Frame) -> Self {
        Self {
            key: frame.stack_key(),
            frame,
        }
    }

    pub fn count(&self) -> u32 {
        self.frame.sample_count
    }

    pub fn data(&self) -> &PixelGrid {
        &self.frame.data
    }
}
