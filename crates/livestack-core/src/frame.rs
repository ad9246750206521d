use ndarray::Array2;

use crate::error::{LiveStackError, Result};
use crate::io::fits::{FitsHeader, FitsValue};
use crate::key::{bucket_temperature, Exposure, StackKey};

/// Pixel data, row-major, shape = (height, width).
pub type PixelGrid = Array2<f64>;

pub const KEYWORD_CAMERA: &str = "INSTRUME";
pub const KEYWORD_EXPOSURE: &str = "EXPTIME";
pub const KEYWORD_GAIN: &str = "GAIN";
pub const KEYWORD_TEMPERATURE: &str = "CCD-TEMP";
pub const KEYWORD_IMAGE_TYPE: &str = "IMAGETYP";
pub const KEYWORD_TARGET: &str = "OBJECT";
pub const KEYWORD_FILTER: &str = "FILTER";
pub const KEYWORD_SAMPLE_COUNT: &str = "SUBCOUNT";
/// Key of the dark stack subtracted from the data, kept whole even when it
/// is longer than a `HISTORY` card.
pub const KEYWORD_DARK_STACK: &str = "DARKSTK";

/// Prefix of the `HISTORY` entry naming the dark stack that was subtracted.
const DARK_HISTORY_PREFIX: &str = "dark ";

/// What an exposure is for. Fixed when the frame is classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    Light { target: String, filter: String },
    Dark,
    Flat { filter: String },
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Light { .. } => "LIGHT",
            Self::Dark => "DARK",
            Self::Flat { .. } => "FLAT",
        }
    }

    fn image_type(&self) -> &'static str {
        match self {
            Self::Light { .. } => "Light Frame",
            Self::Dark => "Dark Frame",
            Self::Flat { .. } => "Flat Frame",
        }
    }
}

/// Acquisition settings shared by every frame of a stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Acquisition {
    pub camera: String,
    pub exposure: Exposure,
    pub gain: i64,
    /// Sensor temperature, already bucketed.
    pub temperature: i32,
    pub role: Role,
}

impl Acquisition {
    pub fn stack_key(&self) -> StackKey {
        match &self.role {
            Role::Light { target, filter } => StackKey::Light {
                camera: self.camera.clone(),
                target: target.clone(),
                filter: filter.clone(),
                exposure: self.exposure,
                gain: self.gain,
                temperature: self.temperature,
            },
            Role::Dark => self.dark_key(),
            Role::Flat { filter } => self.flat_key(filter),
        }
    }

    /// Key of the dark stack matching this frame's exposure, gain and
    /// temperature. Darks themselves are not dark-subtracted.
    pub fn dark_lookup_key(&self) -> Option<StackKey> {
        match self.role {
            Role::Light { .. } | Role::Flat { .. } => Some(self.dark_key()),
            Role::Dark => None,
        }
    }

    /// Key of the flat stack matching this frame's filter. Lights only.
    pub fn flat_lookup_key(&self) -> Option<StackKey> {
        match &self.role {
            Role::Light { filter, .. } => Some(self.flat_key(filter)),
            Role::Dark | Role::Flat { .. } => None,
        }
    }

    fn dark_key(&self) -> StackKey {
        StackKey::Dark {
            camera: self.camera.clone(),
            exposure: self.exposure,
            gain: self.gain,
            temperature: self.temperature,
        }
    }

    fn flat_key(&self, filter: &str) -> StackKey {
        StackKey::Flat {
            camera: self.camera.clone(),
            filter: filter.to_string(),
            gain: self.gain,
            temperature: self.temperature,
        }
    }
}

/// A classified exposure with its pixel data.
#[derive(Clone, Debug)]
pub struct Frame {
    pub acquisition: Acquisition,
    pub data: PixelGrid,
    /// Number of exposures this frame already represents (at least 1).
    pub sample_count: u32,
    /// Key of the dark stack subtracted from `data`, if any.
    pub dark: Option<String>,
}

impl Frame {
    /// Classify decoded metadata and pixels into a frame.
    ///
    /// The role comes from `IMAGETYP`, matched case-insensitively by
    /// substring (`light`, then `dark`, then `flat`).
    pub fn classify(header: &FitsHeader, data: PixelGrid) -> Result<Self> {
        let camera = required_text(header, KEYWORD_CAMERA)?;
        let exposure = Exposure::from_seconds(required_number(header, KEYWORD_EXPOSURE)?);
        let gain = required_number(header, KEYWORD_GAIN)?.round() as i64;
        let temperature = bucket_temperature(required_number(header, KEYWORD_TEMPERATURE)?);

        let image_type = required_text(header, KEYWORD_IMAGE_TYPE)?.to_lowercase();
        let role = if image_type.contains("light") {
            Role::Light {
                target: required_text(header, KEYWORD_TARGET)?,
                filter: required_text(header, KEYWORD_FILTER)?,
            }
        } else if image_type.contains("dark") {
            Role::Dark
        } else if image_type.contains("flat") {
            Role::Flat {
                filter: required_text(header, KEYWORD_FILTER)?,
            }
        } else {
            return Err(LiveStackError::malformed(
                KEYWORD_IMAGE_TYPE,
                format!("unrecognised image type '{image_type}'"),
            ));
        };

        let sample_count = header
            .get_i64(KEYWORD_SAMPLE_COUNT)
            .filter(|&n| n >= 1)
            .map_or(1, |n| u32::try_from(n).unwrap_or(u32::MAX));

        let dark = match header.get_str(KEYWORD_DARK_STACK) {
            Some(key) if !key.is_empty() => Some(key.to_string()),
            _ => header
                .history()
                .iter()
                .rev()
                .find_map(|entry| entry.strip_prefix(DARK_HISTORY_PREFIX))
                .map(str::to_string),
        };

        Ok(Self {
            acquisition: Acquisition {
                camera,
                exposure,
                gain,
                temperature,
                role,
            },
            data,
            sample_count,
            dark,
        })
    }

    pub fn role(&self) -> &Role {
        &self.acquisition.role
    }

    pub fn stack_key(&self) -> StackKey {
        self.acquisition.stack_key()
    }

    pub fn dark_lookup_key(&self) -> Option<StackKey> {
        self.acquisition.dark_lookup_key()
    }

    pub fn flat_lookup_key(&self) -> Option<StackKey> {
        self.acquisition.flat_lookup_key()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Metadata written alongside the pixels when this frame is stored.
    pub fn fits_header(&self) -> FitsHeader {
        let acq = &self.acquisition;
        let mut header = FitsHeader::new();
        header.set(KEYWORD_CAMERA, acq.camera.as_str());
        header.set(KEYWORD_EXPOSURE, acq.exposure.seconds());
        header.set(KEYWORD_GAIN, acq.gain);
        header.set(KEYWORD_TEMPERATURE, i64::from(acq.temperature));
        header.set(KEYWORD_IMAGE_TYPE, acq.role.image_type());
        match &acq.role {
            Role::Light { target, filter } => {
                header.set(KEYWORD_TARGET, target.as_str());
                header.set(KEYWORD_FILTER, filter.as_str());
            }
            Role::Flat { filter } => header.set(KEYWORD_FILTER, filter.as_str()),
            Role::Dark => {}
        }
        header.set(KEYWORD_SAMPLE_COUNT, i64::from(self.sample_count));
        if let Some(dark) = &self.dark {
            header.set(KEYWORD_DARK_STACK, dark.as_str());
            header.add_history(format!("{DARK_HISTORY_PREFIX}{dark}"));
        }
        header
    }
}

fn required_text(header: &FitsHeader, keyword: &str) -> Result<String> {
    match header.get(keyword) {
        Some(FitsValue::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(FitsValue::Integer(i)) => Ok(i.to_string()),
        Some(FitsValue::Float(f)) => Ok(f.to_string()),
        Some(_) => Err(LiveStackError::malformed(keyword, "empty or not text")),
        None => Err(LiveStackError::malformed(keyword, "missing")),
    }
}

fn required_number(header: &FitsHeader, keyword: &str) -> Result<f64> {
    let value = header
        .get(keyword)
        .ok_or_else(|| LiveStackError::malformed(keyword, "missing"))?;
    let number = match value {
        FitsValue::String(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    };
    number
        .filter(|n| n.is_finite())
        .ok_or_else(|| LiveStackError::malformed(keyword, "not a number"))
}
