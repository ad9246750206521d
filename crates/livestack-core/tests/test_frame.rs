mod common;

use livestack_core::error::LiveStackError;
use livestack_core::frame::{Frame, Role};
use livestack_core::io::fits::FitsHeader;
use livestack_core::key::{bucket_temperature, Exposure, StackKey};

use common::{constant, dark_header, flat_header, light_header, CAMERA};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[test]
fn test_classify_light() {
    let frame = Frame::classify(&light_header("Ha", 300.0, 100, -9.6), constant(1.0)).unwrap();
    assert_eq!(
        *frame.role(),
        Role::Light {
            target: "M31".into(),
            filter: "Ha".into()
        }
    );
    assert_eq!(frame.acquisition.camera, CAMERA);
    assert_eq!(frame.acquisition.gain, 100);
    assert_eq!(frame.acquisition.temperature, -10);
    assert_eq!(frame.sample_count, 1);
    assert!(frame.dark.is_none());
}

#[test]
fn test_classify_image_type_is_case_insensitive_substring() {
    let mut header = dark_header(10.0, 100, 18.0);
    header.set("IMAGETYP", "MASTER DARK");
    let frame = Frame::classify(&header, constant(0.0)).unwrap();
    assert_eq!(*frame.role(), Role::Dark);

    let frame = Frame::classify(&flat_header("L", 1.0, 100, 18.0), constant(0.0)).unwrap();
    assert_eq!(*frame.role(), Role::Flat { filter: "L".into() });
}

#[test]
fn test_classify_unknown_image_type() {
    let mut header = dark_header(10.0, 100, 18.0);
    header.set("IMAGETYP", "Bias Frame");
    let err = Frame::classify(&header, constant(0.0)).unwrap_err();
    assert!(matches!(
        err,
        LiveStackError::MalformedMetadata { ref keyword, .. } if keyword == "IMAGETYP"
    ));
}

#[test]
fn test_classify_missing_keyword() {
    let mut header = FitsHeader::new();
    header.set("INSTRUME", CAMERA);
    header.set("EXPTIME", 10.0);
    header.set("CCD-TEMP", 20.0);
    header.set("IMAGETYP", "Dark Frame");
    let err = Frame::classify(&header, constant(0.0)).unwrap_err();
    assert!(matches!(
        err,
        LiveStackError::MalformedMetadata { ref keyword, .. } if keyword == "GAIN"
    ));
}

#[test]
fn test_classify_light_requires_target_and_filter() {
    let mut header = dark_header(10.0, 100, 18.0);
    header.set("IMAGETYP", "Light Frame");
    header.set("FILTER", "R");
    let err = Frame::classify(&header, constant(0.0)).unwrap_err();
    assert!(matches!(
        err,
        LiveStackError::MalformedMetadata { ref keyword, .. } if keyword == "OBJECT"
    ));
}

#[test]
fn test_classify_non_numeric_exposure() {
    let mut header = dark_header(10.0, 100, 18.0);
    header.set("EXPTIME", "long");
    assert!(Frame::classify(&header, constant(0.0)).is_err());
}

#[test]
fn test_sample_count_and_provenance_round_trip() {
    let mut header = light_header("R", 60.0, 0, 0.0);
    header.set("SUBCOUNT", 7i64);
    header.add_history("dark ZWO_DARK_60.0_0_0");
    let frame = Frame::classify(&header, constant(0.0)).unwrap();
    assert_eq!(frame.sample_count, 7);
    assert_eq!(frame.dark.as_deref(), Some("ZWO_DARK_60.0_0_0"));

    let again = Frame::classify(&frame.fits_header(), constant(0.0)).unwrap();
    assert_eq!(again.sample_count, 7);
    assert_eq!(again.dark, frame.dark);
    assert_eq!(again.acquisition, frame.acquisition);
}

#[test]
fn test_dark_keyword_takes_precedence_over_history() {
    let mut header = light_header("L", 60.0, 0, 0.0);
    header.add_history("dark ZWO_DARK_60.0_0_0_truncat");
    header.set("DARKSTK", "ZWO_DARK_60.0_0_0_truncated_in_history");

    let frame = Frame::classify(&header, constant(1.0)).unwrap();
    assert_eq!(frame.dark.as_deref(), Some("ZWO_DARK_60.0_0_0_truncated_in_history"));
    assert_eq!(
        frame.fits_header().get_str("DARKSTK"),
        Some("ZWO_DARK_60.0_0_0_truncated_in_history")
    );
}

#[test]
fn test_invalid_sample_count_defaults_to_one() {
    let mut header = dark_header(10.0, 100, 18.0);
    header.set("SUBCOUNT", 0i64);
    let frame = Frame::classify(&header, constant(0.0)).unwrap();
    assert_eq!(frame.sample_count, 1);
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

#[test]
fn test_temperature_buckets() {
    assert_eq!(bucket_temperature(21.0), 20);
    assert_eq!(bucket_temperature(22.0), 20);
    assert_eq!(bucket_temperature(23.0), 25);
    assert_eq!(bucket_temperature(22.5), 20);
    assert_eq!(bucket_temperature(27.5), 30);
    assert_eq!(bucket_temperature(-12.6), -15);
}

#[test]
fn test_exposure_rounds_to_hundredths() {
    assert_eq!(Exposure::from_seconds(10.004), Exposure::from_seconds(10.0));
    assert_ne!(Exposure::from_seconds(10.01), Exposure::from_seconds(10.0));
    assert_eq!(Exposure::from_seconds(0.125).hundredths(), 12);
}

#[test]
fn test_stack_key_formats() {
    let light = Frame::classify(&light_header("Ha", 300.0, 100, -9.6), constant(0.0)).unwrap();
    assert_eq!(
        light.stack_key().to_string(),
        format!("{CAMERA}_LIGHT_M31_Ha_300.0_100_-10")
    );
    assert_eq!(
        light.dark_lookup_key().unwrap().to_string(),
        format!("{CAMERA}_DARK_300.0_100_-10")
    );
    assert_eq!(
        light.flat_lookup_key().unwrap().to_string(),
        format!("{CAMERA}_FLAT_Ha_100_-10")
    );
}

#[test]
fn test_lookup_keys_by_role() {
    let dark = Frame::classify(&dark_header(10.0, 100, 18.0), constant(0.0)).unwrap();
    assert!(dark.dark_lookup_key().is_none());
    assert!(dark.flat_lookup_key().is_none());

    let flat = Frame::classify(&flat_header("Ha", 2.0, 100, 18.0), constant(0.0)).unwrap();
    assert!(flat.flat_lookup_key().is_none());
    // Flats are dark-subtracted with the dark matching their own exposure.
    assert_eq!(
        flat.dark_lookup_key(),
        Some(StackKey::Dark {
            camera: CAMERA.into(),
            exposure: Exposure::from_seconds(2.0),
            gain: 100,
            temperature: 20,
        })
    );
}

#[test]
fn test_frames_within_a_bucket_share_a_key() {
    let a = Frame::classify(&dark_header(10.0, 100, 18.0), constant(0.0)).unwrap();
    let b = Frame::classify(&dark_header(10.001, 100, 21.9), constant(0.0)).unwrap();
    let c = Frame::classify(&dark_header(10.0, 100, 23.0), constant(0.0)).unwrap();
    assert_eq!(a.stack_key(), b.stack_key());
    assert_ne!(a.stack_key(), c.stack_key());
}
