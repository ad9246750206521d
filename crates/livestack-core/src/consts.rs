/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f64 = 1e-10;

/// FITS files are organised in blocks of this many bytes.
pub const FITS_BLOCK_SIZE: usize = 2880;

/// Length of one FITS header card.
pub const FITS_CARD_SIZE: usize = 80;

/// Largest value of the stored unsigned 16-bit sample range.
pub const U16_RANGE_MAX: f64 = 65_535.0;

/// Offset between unsigned 16-bit samples and the signed values FITS stores.
pub const U16_ZERO_OFFSET: f64 = 32_768.0;

/// Sensor temperatures are grouped into buckets of this many degrees.
pub const TEMPERATURE_BUCKET: f64 = 5.0;

/// Exposure times are rounded to this many decimal places (hundredths).
pub const EXPOSURE_SCALE: f64 = 100.0;

/// Default Gaussian sigma used to smooth calibration frames before merging.
pub const DEFAULT_SMOOTHING_SIGMA: f64 = 1.0;

/// Default pixels cropped from each edge before the preview stretch.
pub const DEFAULT_PREVIEW_CROP: usize = 64;

/// Default block-mean downscale factor of the preview, in both axes.
pub const DEFAULT_PREVIEW_DOWNSCALE: usize = 4;

/// Default background level the auto-stretch maps the median onto.
pub const DEFAULT_STRETCH_TARGET_BACKGROUND: f64 = 0.25;

/// Default shadow clip, in average deviations below the median.
pub const DEFAULT_STRETCH_SHADOWS_CLIP: f64 = -1.25;

/// Default bounded wait for the ingestion queue, in milliseconds.
pub const DEFAULT_DEQUEUE_TIMEOUT_MS: u64 = 1000;

/// Name of the processed-path ledger inside the storage directory.
pub const LEDGER_FILE_NAME: &str = "processed.txt";

/// Extension of stored stack files.
pub const STACK_EXTENSION: &str = "fits";

/// Extension of rendered previews.
pub const PREVIEW_EXTENSION: &str = "png";
