#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::Array2;
use parking_lot::Mutex;

use livestack_core::align::Registrar;
use livestack_core::error::Result;
use livestack_core::filters::Smoother;
use livestack_core::frame::PixelGrid;
use livestack_core::io::fits::{write_fits, FitsHeader};
use livestack_core::pipeline::config::{PipelineConfig, PreviewConfig};
use livestack_core::pipeline::Collaborators;

pub const CAMERA: &str = "ZWO ASI2600MM";

/// Header for a light frame of M31 through `filter`.
pub fn light_header(filter: &str, exposure: f64, gain: i64, temperature: f64) -> FitsHeader {
    let mut header = base_header("Light Frame", exposure, gain, temperature);
    header.set("OBJECT", "M31");
    header.set("FILTER", filter);
    header
}

pub fn dark_header(exposure: f64, gain: i64, temperature: f64) -> FitsHeader {
    base_header("Dark Frame", exposure, gain, temperature)
}

pub fn flat_header(filter: &str, exposure: f64, gain: i64, temperature: f64) -> FitsHeader {
    let mut header = base_header("Flat Field", exposure, gain, temperature);
    header.set("FILTER", filter);
    header
}

fn base_header(image_type: &str, exposure: f64, gain: i64, temperature: f64) -> FitsHeader {
    let mut header = FitsHeader::new();
    header.set("INSTRUME", CAMERA);
    header.set("EXPTIME", exposure);
    header.set("GAIN", gain);
    header.set("CCD-TEMP", temperature);
    header.set("IMAGETYP", image_type);
    header
}

/// Write a synthetic exposure to `dir/name` and return its path.
pub fn write_exposure(dir: &Path, name: &str, header: &FitsHeader, data: &PixelGrid) -> PathBuf {
    let path = dir.join(name);
    write_fits(&path, header, data).unwrap();
    path
}

pub fn constant(value: f64) -> PixelGrid {
    Array2::from_elem((8, 8), value)
}

/// Left half `left`, right half `right`.
pub fn split(left: f64, right: f64) -> PixelGrid {
    Array2::from_shape_fn((8, 8), |(_, col)| if col < 4 { left } else { right })
}

/// Small previews with no crop or downscale, so tiny test images survive.
pub fn test_config(root: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::new(root.join("stacks"), root.join("previews"));
    config.dequeue_timeout_ms = 20;
    config.preview = PreviewConfig {
        crop: 0,
        downscale: 1,
        ..PreviewConfig::default()
    };
    config
}

/// One recorded call to a collaborator.
#[derive(Clone, Debug)]
pub struct Call {
    pub source: PixelGrid,
    pub reference: Option<PixelGrid>,
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

/// Registrar that records its inputs and adds `offset` to every pixel of
/// the source, so callers can tell whether its output was used.
pub struct RecordingRegistrar {
    pub calls: CallLog,
    pub offset: f64,
}

impl Registrar for RecordingRegistrar {
    fn register(&self, source: &PixelGrid, reference: &PixelGrid) -> Result<PixelGrid> {
        self.calls.lock().push(Call {
            source: source.clone(),
            reference: Some(reference.clone()),
        });
        Ok(source.mapv(|v| v + self.offset))
    }
}

/// Smoother that records its inputs and multiplies by `factor`.
pub struct RecordingSmoother {
    pub calls: CallLog,
    pub factor: f64,
}

impl Smoother for RecordingSmoother {
    fn smooth(&self, data: &PixelGrid) -> PixelGrid {
        self.calls.lock().push(Call {
            source: data.clone(),
            reference: None,
        });
        data.mapv(|v| v * self.factor)
    }
}

/// Recording collaborators plus handles to their call logs.
pub fn recording(registrar_offset: f64, smoother_factor: f64) -> (Collaborators, CallLog, CallLog) {
    let registrations = CallLog::default();
    let smoothings = CallLog::default();
    let collaborators = Collaborators {
        registrar: Box::new(RecordingRegistrar {
            calls: Arc::clone(&registrations),
            offset: registrar_offset,
        }),
        smoother: Box::new(RecordingSmoother {
            calls: Arc::clone(&smoothings),
            factor: smoother_factor,
        }),
    };
    (collaborators, registrations, smoothings)
}
