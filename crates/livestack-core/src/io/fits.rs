//! Single-HDU FITS image reader and writer.
//!
//! Files are a sequence of 2880-byte blocks: 80-character header cards
//! terminated by `END`, then big-endian samples scaled by `BSCALE`/`BZERO`.
//! Reads accept the integer and floating BITPIX values cameras produce;
//! writes are always 16-bit.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use memmap2::Mmap;
use ndarray::Array2;

use crate::consts::{FITS_BLOCK_SIZE, FITS_CARD_SIZE, U16_RANGE_MAX, U16_ZERO_OFFSET};
use crate::error::{LiveStackError, Result};
use crate::frame::PixelGrid;

/// Longest escaped string fragment per card under the `CONTINUE`
/// convention: an opening quote, the fragment, `&` and a closing quote
/// fill the 70 value columns.
const LONG_STRING_FRAGMENT: usize = 67;

/// Text columns available to a `HISTORY` card.
const TEXT_CARD_WIDTH: usize = FITS_CARD_SIZE - 8;

/// Keywords that describe the data layout and are owned by the codec.
const STRUCTURAL_KEYWORDS: [&str; 9] = [
    "SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "NAXIS3", "EXTEND", "BSCALE", "BZERO",
];

/// A header card value.
#[derive(Clone, Debug, PartialEq)]
pub enum FitsValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl FitsValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Float(f) if f.is_finite() => Some(f.round() as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    fn to_card_value(&self) -> String {
        match self {
            Self::String(s) => format!("'{:<8}'", s.replace('\'', "''")),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => format!("{f:?}"),
            Self::Boolean(b) => if *b { "T" } else { "F" }.to_string(),
        }
    }
}

impl From<&str> for FitsValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FitsValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FitsValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for FitsValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for FitsValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// Ordered keyword/value cards plus free-text `HISTORY` entries.
#[derive(Clone, Debug, Default)]
pub struct FitsHeader {
    cards: Vec<(String, FitsValue)>,
    history: Vec<String>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a keyword, replacing an existing value in place.
    pub fn set(&mut self, keyword: &str, value: impl Into<FitsValue>) {
        let keyword = keyword.to_uppercase();
        let value = value.into();
        match self.cards.iter_mut().find(|(k, _)| *k == keyword) {
            Some(card) => card.1 = value,
            None => self.cards.push((keyword, value)),
        }
    }

    pub fn get(&self, keyword: &str) -> Option<&FitsValue> {
        let keyword = keyword.to_uppercase();
        self.cards
            .iter()
            .find(|(k, _)| *k == keyword)
            .map(|(_, v)| v)
    }

    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(FitsValue::as_str)
    }

    pub fn get_i64(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(FitsValue::as_i64)
    }

    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(FitsValue::as_f64)
    }

    pub fn cards(&self) -> impl Iterator<Item = (&str, &FitsValue)> {
        self.cards.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn add_history(&mut self, entry: impl Into<String>) {
        self.history.push(entry.into());
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }
}

/// Read a FITS image from disk.
pub fn read_fits(path: &Path) -> Result<(FitsHeader, PixelGrid)> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    parse_fits(&mmap)
}

/// Parse a FITS image from an in-memory buffer.
pub fn parse_fits(bytes: &[u8]) -> Result<(FitsHeader, PixelGrid)> {
    let (header, card_count) = parse_header(bytes)?;
    let data_start = padded_len(card_count * FITS_CARD_SIZE);

    let bitpix = required_int(&header, "BITPIX")?;
    let naxis = required_int(&header, "NAXIS")?;
    if naxis < 2 {
        return Err(LiveStackError::InvalidFits(format!(
            "expected a 2-D image, NAXIS = {naxis}"
        )));
    }
    if naxis > 2 && header.get_i64("NAXIS3").unwrap_or(1) != 1 {
        return Err(LiveStackError::InvalidFits(
            "multi-plane images are not supported".into(),
        ));
    }
    let width = dimension(&header, "NAXIS1")?;
    let height = dimension(&header, "NAXIS2")?;

    let bytes_per_sample = match bitpix {
        8 => 1,
        16 => 2,
        32 | -32 => 4,
        -64 => 8,
        other => {
            return Err(LiveStackError::InvalidFits(format!(
                "unsupported BITPIX {other}"
            )))
        }
    };

    let data_len = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(bytes_per_sample))
        .ok_or_else(|| LiveStackError::InvalidFits("image dimensions too large".into()))?;
    let data_end = data_start + data_len;
    if bytes.len() < data_end {
        return Err(LiveStackError::InvalidFits(format!(
            "file truncated: expected at least {} bytes, got {}",
            data_end,
            bytes.len()
        )));
    }

    let bscale = header.get_f64("BSCALE").unwrap_or(1.0);
    let bzero = header.get_f64("BZERO").unwrap_or(0.0);
    let raw = &bytes[data_start..data_end];

    let samples: Vec<f64> = raw
        .chunks_exact(bytes_per_sample)
        .map(|chunk| {
            let value = match bitpix {
                8 => chunk[0] as f64,
                16 => BigEndian::read_i16(chunk) as f64,
                32 => BigEndian::read_i32(chunk) as f64,
                -32 => BigEndian::read_f32(chunk) as f64,
                _ => BigEndian::read_f64(chunk),
            };
            bzero + bscale * value
        })
        .collect();

    let data = Array2::from_shape_vec((height, width), samples)
        .map_err(|e| LiveStackError::InvalidFits(e.to_string()))?;

    Ok((header, data))
}

/// Write a 16-bit FITS image.
///
/// The finite value range of `data` is remapped linearly onto `[0, 65535]`
/// and the inverse mapping is stored in `BSCALE`/`BZERO`, so a reader
/// recovers the original values to within one quantisation step.
/// Non-finite samples are stored as the range minimum.
pub fn write_fits(path: &Path, header: &FitsHeader, data: &PixelGrid) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode_fits(&mut writer, header, data)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Encode a 16-bit FITS image into any writer.
pub fn encode_fits<W: Write>(writer: &mut W, header: &FitsHeader, data: &PixelGrid) -> Result<()> {
    let (height, width) = data.dim();
    let (min, max) = finite_range(data);
    let range = max - min;
    let bscale = if range > 0.0 { range / U16_RANGE_MAX } else { 1.0 };
    let bzero = min + U16_ZERO_OFFSET * bscale;

    let mut cards = Vec::with_capacity(header.cards.len() + header.history.len() + 8);
    cards.push(format_card("SIMPLE", &FitsValue::Boolean(true)));
    cards.push(format_card("BITPIX", &FitsValue::Integer(16)));
    cards.push(format_card("NAXIS", &FitsValue::Integer(2)));
    cards.push(format_card("NAXIS1", &FitsValue::Integer(width as i64)));
    cards.push(format_card("NAXIS2", &FitsValue::Integer(height as i64)));
    cards.push(format_card("BSCALE", &FitsValue::Float(bscale)));
    cards.push(format_card("BZERO", &FitsValue::Float(bzero)));
    for (keyword, value) in &header.cards {
        if !STRUCTURAL_KEYWORDS.contains(&keyword.as_str()) {
            cards.extend(format_cards(keyword, value));
        }
    }
    for entry in &header.history {
        cards.extend(format_history_cards(entry));
    }
    cards.push(format_text_card("END", ""));

    for card in &cards {
        writer.write_all(card)?;
    }
    let header_len = cards.len() * FITS_CARD_SIZE;
    writer.write_all(&vec![b' '; padded_len(header_len) - header_len])?;

    for &value in data.iter() {
        let stored = if value.is_finite() {
            ((value - min) / bscale).round().clamp(0.0, U16_RANGE_MAX)
        } else {
            0.0
        };
        writer.write_i16::<BigEndian>((stored - U16_ZERO_OFFSET) as i16)?;
    }
    let data_len = height * width * 2;
    writer.write_all(&vec![0u8; padded_len(data_len) - data_len])?;

    Ok(())
}

/// Parse header cards up to `END`. Returns the header and the number of
/// cards consumed, including `END`.
fn parse_header(bytes: &[u8]) -> Result<(FitsHeader, usize)> {
    let mut header = FitsHeader::new();

    for (index, card) in bytes.chunks_exact(FITS_CARD_SIZE).enumerate() {
        let keyword = String::from_utf8_lossy(&card[..8]).trim().to_string();

        match keyword.as_str() {
            "END" => return Ok((header, index + 1)),
            "HISTORY" => {
                header.add_history(String::from_utf8_lossy(&card[8..]).trim().to_string());
            }
            "CONTINUE" => append_continuation(&mut header, &card[10..]),
            "" | "COMMENT" => {}
            _ if &card[8..10] == b"= " => {
                let value = parse_value(&String::from_utf8_lossy(&card[10..]));
                header.cards.push((keyword, value));
            }
            _ => {}
        }
    }

    Err(LiveStackError::InvalidFits("header has no END card".into()))
}

fn parse_value(raw: &str) -> FitsValue {
    let raw = raw.trim();

    if let Some(quoted) = raw.strip_prefix('\'') {
        let mut value = String::new();
        let mut chars = quoted.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    value.push('\'');
                    chars.next();
                } else {
                    break;
                }
            } else {
                value.push(c);
            }
        }
        return FitsValue::String(value.trim_end().to_string());
    }

    let token = raw.split('/').next().unwrap_or_default().trim();
    match token {
        "T" => return FitsValue::Boolean(true),
        "F" => return FitsValue::Boolean(false),
        _ => {}
    }
    if let Ok(i) = token.parse::<i64>() {
        return FitsValue::Integer(i);
    }
    if let Ok(f) = token.replace(['D', 'd'], "E").parse::<f64>() {
        return FitsValue::Float(f);
    }
    FitsValue::String(token.to_string())
}

/// Join a `CONTINUE` card onto the preceding string value if that value
/// ends with the `&` continuation marker. Stray continuations are ignored.
fn append_continuation(header: &mut FitsHeader, raw: &[u8]) {
    let FitsValue::String(continued) = parse_value(&String::from_utf8_lossy(raw)) else {
        return;
    };
    if let Some((_, FitsValue::String(value))) = header.cards.last_mut() {
        if let Some(head) = value.strip_suffix('&') {
            let joined = format!("{head}{continued}");
            *value = joined;
        }
    }
}

/// Cards for one keyword. Strings too long for a single card are split
/// with the `CONTINUE` long-string convention.
fn format_cards(keyword: &str, value: &FitsValue) -> Vec<[u8; FITS_CARD_SIZE]> {
    let FitsValue::String(text) = value else {
        return vec![format_card(keyword, value)];
    };
    let fragments = split_escaped(text);
    if fragments.len() == 1 {
        return vec![format_card(keyword, value)];
    }

    let last = fragments.len() - 1;
    fragments
        .iter()
        .enumerate()
        .map(|(i, fragment)| {
            let mut card = [b' '; FITS_CARD_SIZE];
            if i == 0 {
                write_keyword(&mut card, keyword);
                card[8] = b'=';
            } else {
                write_keyword(&mut card, "CONTINUE");
            }
            let marker = if i < last { "&" } else { "" };
            let quoted = format!("'{fragment}{marker}'");
            card[10..10 + quoted.len()].copy_from_slice(quoted.as_bytes());
            card
        })
        .collect()
}

/// Escape quotes and cut the result into card-sized fragments without
/// splitting a doubled quote or a multi-byte character.
fn split_escaped(text: &str) -> Vec<String> {
    let mut fragments = vec![String::new()];
    for c in text.chars() {
        let escaped = if c == '\'' { "''".to_string() } else { c.to_string() };
        let needs_new = fragments
            .last()
            .is_some_and(|f| f.len() + escaped.len() > LONG_STRING_FRAGMENT);
        if needs_new {
            fragments.push(String::new());
        }
        if let Some(current) = fragments.last_mut() {
            current.push_str(&escaped);
        }
    }
    fragments
}

/// `HISTORY` text wider than one card is carried on consecutive cards.
fn format_history_cards(text: &str) -> Vec<[u8; FITS_CARD_SIZE]> {
    let mut chunks = vec![String::new()];
    for c in text.chars() {
        let full = chunks
            .last()
            .is_some_and(|chunk| chunk.len() + c.len_utf8() > TEXT_CARD_WIDTH);
        if full {
            chunks.push(String::new());
        }
        if let Some(current) = chunks.last_mut() {
            current.push(c);
        }
    }
    chunks
        .iter()
        .map(|chunk| format_text_card("HISTORY", chunk))
        .collect()
}

fn format_card(keyword: &str, value: &FitsValue) -> [u8; FITS_CARD_SIZE] {
    let mut card = [b' '; FITS_CARD_SIZE];
    write_keyword(&mut card, keyword);
    card[8] = b'=';

    let value = value.to_card_value();
    let bytes = value.as_bytes();
    // Strings start in column 11; everything else is right-justified to column 30.
    let start = if value.starts_with('\'') {
        10
    } else {
        30usize.saturating_sub(bytes.len()).max(10)
    };
    let len = bytes.len().min(FITS_CARD_SIZE - start);
    card[start..start + len].copy_from_slice(&bytes[..len]);
    card
}

fn format_text_card(keyword: &str, text: &str) -> [u8; FITS_CARD_SIZE] {
    let mut card = [b' '; FITS_CARD_SIZE];
    write_keyword(&mut card, keyword);
    let bytes = text.as_bytes();
    let len = bytes.len().min(FITS_CARD_SIZE - 8);
    card[8..8 + len].copy_from_slice(&bytes[..len]);
    card
}

fn write_keyword(card: &mut [u8; FITS_CARD_SIZE], keyword: &str) {
    let bytes = keyword.as_bytes();
    let len = bytes.len().min(8);
    card[..len].copy_from_slice(&bytes[..len]);
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(FITS_BLOCK_SIZE) * FITS_BLOCK_SIZE
}

fn required_int(header: &FitsHeader, keyword: &str) -> Result<i64> {
    header
        .get_i64(keyword)
        .ok_or_else(|| LiveStackError::InvalidFits(format!("missing {keyword}")))
}

fn dimension(header: &FitsHeader, keyword: &str) -> Result<usize> {
    let value = required_int(header, keyword)?;
    usize::try_from(value)
        .ok()
        .filter(|&v| v > 0)
        .ok_or_else(|| LiveStackError::InvalidFits(format!("invalid {keyword} = {value}")))
}

fn finite_range(data: &PixelGrid) -> (f64, f64) {
    let (min, max) = data
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if min.is_finite() {
        (min, max)
    } else {
        (0.0, 0.0)
    }
}
