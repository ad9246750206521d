mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;
use tempfile::TempDir;

use livestack_core::error::LiveStackError;
use livestack_core::frame::Frame;
use livestack_core::stack::{running_mean, Combiner, Stack, StackStore};

use common::{constant, dark_header, light_header, CallLog, RecordingSmoother};

#[test]
fn test_running_mean_of_two() {
    let result = running_mean(&constant(0.0), 1, &constant(1.0)).unwrap();
    assert!(result.iter().all(|&v| v == 0.5));
}

#[test]
fn test_running_mean_weights_existing_count() {
    let result = running_mean(&constant(10.0), 3, &constant(30.0)).unwrap();
    assert!(result.iter().all(|&v| v == 15.0));
}

#[test]
fn test_running_mean_large_grid() {
    let mean = Array2::from_elem((300, 300), 2.0);
    let sample = Array2::from_elem((300, 300), 6.0);
    let result = running_mean(&mean, 1, &sample).unwrap();
    assert!(result.iter().all(|&v| v == 4.0));
}

#[test]
fn test_running_mean_shape_mismatch() {
    let err = running_mean(&constant(0.0), 1, &Array2::zeros((2, 2))).unwrap_err();
    assert!(matches!(err, LiveStackError::ShapeMismatch { .. }));
}

#[test]
fn test_identical_frames_keep_their_value() {
    let tmp = TempDir::new().unwrap();
    let store = StackStore::open(tmp.path()).unwrap();
    let smoother = RecordingSmoother {
        calls: CallLog::default(),
        factor: 1.0,
    };
    let combiner = Combiner::new(&store, &smoother);

    let header = light_header("L", 10.0, 0, 0.0);
    let mut stack = Stack::seed(Frame::classify(&header, constant(0.3)).unwrap());
    for _ in 1..10 {
        let frame = Frame::classify(&header, constant(0.3)).unwrap();
        stack = combiner.merge(stack, &frame).unwrap();
    }

    assert_eq!(stack.count(), 10);
    assert!(stack.data().iter().all(|&v| (v - 0.3).abs() < 1e-12));
    assert!(smoother.calls.lock().is_empty());
    assert_eq!(store.require(&stack.key).unwrap().count(), 10);
}

#[test]
fn test_calibration_frames_are_smoothed_before_merge() {
    let tmp = TempDir::new().unwrap();
    let store = StackStore::open(tmp.path()).unwrap();
    let smoother = RecordingSmoother {
        calls: CallLog::default(),
        factor: 2.0,
    };
    let combiner = Combiner::new(&store, &smoother);

    let header = dark_header(10.0, 100, 18.0);
    let stack = Stack::seed(Frame::classify(&header, constant(10.0)).unwrap());
    let frame = Frame::classify(&header, constant(20.0)).unwrap();
    let stack = combiner.merge(stack, &frame).unwrap();

    assert_eq!(smoother.calls.lock().len(), 1);
    assert_eq!(stack.count(), 2);
    // (10 + 2 * 20) / 2
    assert_abs_diff_eq!(stack.data()[[4, 4]], 25.0, epsilon = 1e-12);
}
