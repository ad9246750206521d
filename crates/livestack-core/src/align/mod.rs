pub mod phase_correlation;

use tracing::debug;

use crate::error::{LiveStackError, Result};
use crate::frame::{Frame, PixelGrid};
use crate::stack::Stack;

pub use phase_correlation::{compute_offset, shift, Offset};

/// Geometric registration of one image onto another's pixel grid.
///
/// The result has the reference's shape; pixels with no source coverage
/// are zero.
pub trait Registrar: Send + Sync {
    fn register(&self, source: &PixelGrid, reference: &PixelGrid) -> Result<PixelGrid>;
}

/// Translation-only registration by FFT phase correlation.
#[derive(Clone, Copy, Debug, Default)]
pub struct PhaseCorrelationRegistrar;

impl Registrar for PhaseCorrelationRegistrar {
    fn register(&self, source: &PixelGrid, reference: &PixelGrid) -> Result<PixelGrid> {
        let offset = compute_offset(reference, source)?;
        debug!(dx = offset.dx, dy = offset.dy, "Registration offset");
        Ok(shift(source, offset))
    }
}

/// Align a light frame's pixels onto the existing stack for its key.
///
/// The stack must already exist; a missing reference means the frame
/// should have seeded a new stack instead.
pub fn align_to_stack(
    registrar: &dyn Registrar,
    frame: &Frame,
    reference: Option<&Stack>,
) -> Result<PixelGrid> {
    let reference =
        reference.ok_or_else(|| LiveStackError::MissingReferenceStack(frame.stack_key().to_string()))?;
    registrar.register(&frame.data, &reference.frame.data)
}
