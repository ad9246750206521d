use std::fmt;

use crate::consts::{EXPOSURE_SCALE, TEMPERATURE_BUCKET};

/// Exposure time rounded to hundredths of a second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Exposure(i64);

impl Exposure {
    /// Round a raw exposure in seconds to two decimals, ties to even.
    pub fn from_seconds(seconds: f64) -> Self {
        Self((seconds * EXPOSURE_SCALE).round_ties_even() as i64)
    }

    pub fn hundredths(self) -> i64 {
        self.0
    }

    pub fn seconds(self) -> f64 {
        self.0 as f64 / EXPOSURE_SCALE
    }
}

impl fmt::Display for Exposure {
    /// Always shows at least one decimal: `10.0`, `0.5`, `2.25`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let whole = self.0.abs() / 100;
        let frac = self.0.abs() % 100;
        if frac % 10 == 0 {
            write!(f, "{sign}{whole}.{}", frac / 10)
        } else {
            write!(f, "{sign}{whole}.{frac:02}")
        }
    }
}

/// Group a sensor temperature into its 5-degree bucket.
///
/// Halfway values round to the even multiple: 22.5 -> 20, 27.5 -> 30.
pub fn bucket_temperature(celsius: f64) -> i32 {
    ((celsius / TEMPERATURE_BUCKET).round_ties_even() * TEMPERATURE_BUCKET) as i32
}

/// Identity of the frames that may be combined into one stack.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StackKey {
    Light {
        camera: String,
        target: String,
        filter: String,
        exposure: Exposure,
        gain: i64,
        temperature: i32,
    },
    Dark {
        camera: String,
        exposure: Exposure,
        gain: i64,
        temperature: i32,
    },
    Flat {
        camera: String,
        filter: String,
        gain: i64,
        temperature: i32,
    },
}

impl StackKey {
    pub fn role_name(&self) -> &'static str {
        match self {
            Self::Light { .. } => "LIGHT",
            Self::Dark { .. } => "DARK",
            Self::Flat { .. } => "FLAT",
        }
    }

    /// File-name-safe form of the key, used for stack and preview files.
    ///
    /// Path separators, `:`, NUL and `%` itself are percent-escaped, so
    /// distinct keys never share a file.
    pub fn file_stem(&self) -> String {
        let mut stem = String::new();
        for c in self.to_string().chars() {
            match c {
                '%' | '/' | '\\' | ':' | '\0' => stem.push_str(&format!("%{:02X}", c as u32)),
                c => stem.push(c),
            }
        }
        stem
    }
}

impl fmt::Display for StackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = self.role_name();
        match self {
            Self::Light {
                camera,
                target,
                filter,
                exposure,
                gain,
                temperature,
            } => write!(
                f,
                "{camera}_{role}_{target}_{filter}_{exposure}_{gain}_{temperature}"
            ),
            Self::Dark {
                camera,
                exposure,
                gain,
                temperature,
            } => write!(f, "{camera}_{role}_{exposure}_{gain}_{temperature}"),
            Self::Flat {
                camera,
                filter,
                gain,
                temperature,
            } => write!(f, "{camera}_{role}_{filter}_{gain}_{temperature}"),
        }
    }
}
