//! Dark subtraction and flat division against accumulated calibration stacks.
//!
//! A missing calibration stack is an expected condition while a session is
//! still collecting darks and flats, so it is reported as
//! [`Calibration::Unavailable`] rather than as an error.

use ndarray::Zip;
use tracing::{info, warn};

use crate::consts::EPSILON;
use crate::error::{LiveStackError, Result};
use crate::frame::{Frame, PixelGrid};
use crate::key::StackKey;
use crate::stack::StackStore;

/// What a calibration step did to a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Calibration {
    /// The stack at `key` was applied.
    Applied { key: StackKey },
    /// No usable stack exists at `key`; the frame is unchanged.
    Unavailable { key: StackKey },
    /// The frame's role does not take this correction.
    NotApplicable,
}

impl Calibration {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Looks up calibration stacks for a frame and applies them.
pub struct CalibrationResolver<'a> {
    store: &'a StackStore,
}

impl<'a> CalibrationResolver<'a> {
    pub fn new(store: &'a StackStore) -> Self {
        Self { store }
    }

    /// Subtract the matching dark stack in place and record it as the
    /// frame's calibration provenance.
    pub fn subtract_dark(&self, frame: &mut Frame) -> Result<Calibration> {
        let Some(key) = frame.dark_lookup_key() else {
            return Ok(Calibration::NotApplicable);
        };
        let Some(dark) = self.store.load(&key)? else {
            info!(key = %key, "No dark stack available");
            return Ok(Calibration::Unavailable { key });
        };

        frame.data = subtract(&frame.data, dark.data())?;
        frame.dark = Some(key.to_string());
        Ok(Calibration::Applied { key })
    }

    /// Divide by the matching flat stack, normalised to unit mean, in place.
    pub fn divide_flat(&self, frame: &mut Frame) -> Result<Calibration> {
        let Some(key) = frame.flat_lookup_key() else {
            return Ok(Calibration::NotApplicable);
        };
        let Some(flat) = self.store.load(&key)? else {
            info!(key = %key, "No flat stack available");
            return Ok(Calibration::Unavailable { key });
        };

        let Some((data, uncorrected)) = divide_by_flat(&frame.data, flat.data())? else {
            warn!(key = %key, "Flat stack has no positive mean; skipping flat division");
            return Ok(Calibration::Unavailable { key });
        };
        if uncorrected > 0 {
            warn!(
                key = %key,
                pixels = uncorrected,
                "Flat stack has zero or invalid pixels; left uncorrected"
            );
        }
        frame.data = data;
        Ok(Calibration::Applied { key })
    }
}

/// Element-wise `data - dark`.
pub fn subtract(data: &PixelGrid, dark: &PixelGrid) -> Result<PixelGrid> {
    check_shape(data, dark)?;
    Ok(data - dark)
}

/// Element-wise `data / (flat / mean(flat))`.
///
/// Pixels whose normalised flat value is zero, negative or non-finite are
/// passed through undivided; the second element of the result counts them.
/// Returns `None` when the flat's mean is not a positive finite number.
pub fn divide_by_flat(data: &PixelGrid, flat: &PixelGrid) -> Result<Option<(PixelGrid, usize)>> {
    check_shape(data, flat)?;
    let mean = flat.mean().unwrap_or(0.0);
    if !mean.is_finite() || mean <= EPSILON {
        return Ok(None);
    }

    let mut uncorrected = 0usize;
    let result = Zip::from(data).and(flat).map_collect(|&d, &f| {
        let gain = f / mean;
        if gain.is_finite() && gain > 0.0 {
            d / gain
        } else {
            uncorrected += 1;
            d
        }
    });
    Ok(Some((result, uncorrected)))
}

fn check_shape(data: &PixelGrid, calibration: &PixelGrid) -> Result<()> {
    if data.dim() != calibration.dim() {
        return Err(LiveStackError::ShapeMismatch {
            expected: calibration.dim(),
            actual: data.dim(),
        });
    }
    Ok(())
}
