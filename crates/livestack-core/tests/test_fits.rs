mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;
use tempfile::TempDir;

use livestack_core::error::LiveStackError;
use livestack_core::io::fits::{encode_fits, parse_fits, read_fits, write_fits, FitsHeader, FitsValue};

use common::light_header;

#[test]
fn test_constant_image_round_trips_exactly() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("flat.fits");
    let data = Array2::from_elem((5, 7), 1234.5);
    write_fits(&path, &FitsHeader::new(), &data).unwrap();

    let (_, back) = read_fits(&path).unwrap();
    assert_eq!(back.dim(), (5, 7));
    assert!(back.iter().all(|&v| v == 1234.5));
}

#[test]
fn test_values_round_trip_within_quantisation() {
    let data = Array2::from_shape_fn((16, 12), |(r, c)| (r * 12 + c) as f64 * 3.7 - 100.0);
    let mut bytes = Vec::new();
    encode_fits(&mut bytes, &FitsHeader::new(), &data).unwrap();
    assert_eq!(bytes.len() % 2880, 0);

    let (_, back) = parse_fits(&bytes).unwrap();
    let step = (191.0 * 3.7) / 65535.0;
    for (a, b) in data.iter().zip(back.iter()) {
        assert_abs_diff_eq!(a, b, epsilon = step);
    }
}

#[test]
fn test_header_round_trip() {
    let mut header = light_header("O'III", 120.0, 139, -4.8);
    header.set("SUBCOUNT", 3i64);
    header.add_history("dark ZWO_DARK_120.0_139_-5");

    let mut bytes = Vec::new();
    encode_fits(&mut bytes, &header, &Array2::zeros((2, 2))).unwrap();
    let (back, _) = parse_fits(&bytes).unwrap();

    assert_eq!(back.get_str("FILTER"), Some("O'III"));
    assert_eq!(back.get_str("IMAGETYP"), Some("Light Frame"));
    assert_eq!(back.get_i64("GAIN"), Some(139));
    assert_eq!(back.get_i64("SUBCOUNT"), Some(3));
    assert_eq!(back.get_f64("EXPTIME"), Some(120.0));
    assert_eq!(back.get_f64("CCD-TEMP"), Some(-4.8));
    assert_eq!(back.history(), ["dark ZWO_DARK_120.0_139_-5"]);
}

#[test]
fn test_keywords_are_case_insensitive() {
    let mut header = FitsHeader::new();
    header.set("gain", 100i64);
    header.set("GAIN", 120i64);
    assert_eq!(header.get("Gain"), Some(&FitsValue::Integer(120)));
    assert_eq!(header.cards().count(), 1);
}

#[test]
fn test_reject_missing_end() {
    let bytes = vec![b' '; 2880];
    assert!(matches!(
        parse_fits(&bytes),
        Err(LiveStackError::InvalidFits(_))
    ));
}

#[test]
fn test_reject_truncated_data() {
    let mut bytes = Vec::new();
    encode_fits(&mut bytes, &FitsHeader::new(), &Array2::zeros((64, 64))).unwrap();
    bytes.truncate(2880 + 100);
    assert!(matches!(
        parse_fits(&bytes),
        Err(LiveStackError::InvalidFits(_))
    ));
}

#[test]
fn test_read_missing_file_is_io_error() {
    let tmp = TempDir::new().unwrap();
    assert!(matches!(
        read_fits(&tmp.path().join("absent.fits")),
        Err(LiveStackError::Io(_))
    ));
}

#[test]
fn test_long_string_value_round_trips() {
    let target = format!("{}'s nebula {}", "NGC 7000", "T".repeat(75));
    let mut header = light_header("Ha", 300.0, 100, 0.0);
    header.set("OBJECT", target.as_str());

    let mut bytes = Vec::new();
    encode_fits(&mut bytes, &header, &Array2::zeros((2, 2))).unwrap();
    let (back, _) = parse_fits(&bytes).unwrap();

    assert_eq!(back.get_str("OBJECT"), Some(target.as_str()));
    assert_eq!(back.get_str("FILTER"), Some("Ha"));
    assert_eq!(back.get_str("IMAGETYP"), Some("Light Frame"));
}

#[test]
fn test_long_history_is_not_truncated() {
    let entry = format!("dark {}", "K".repeat(100));
    let mut header = FitsHeader::new();
    header.add_history(entry.as_str());

    let mut bytes = Vec::new();
    encode_fits(&mut bytes, &header, &Array2::zeros((2, 2))).unwrap();
    let (back, _) = parse_fits(&bytes).unwrap();

    assert_eq!(back.history().len(), 2);
    assert_eq!(back.history().concat(), entry);
}
