mod common;

use tempfile::TempDir;

use livestack_core::error::LiveStackError;
use livestack_core::frame::Frame;
use livestack_core::stack::{Stack, StackStore};

use common::{constant, dark_header, flat_header, light_header};

#[test]
fn test_load_absent_key() {
    let tmp = TempDir::new().unwrap();
    let store = StackStore::open(tmp.path().join("stacks")).unwrap();
    let frame = Frame::classify(&dark_header(10.0, 100, 18.0), constant(5.0)).unwrap();

    assert!(!store.exists(&frame.stack_key()));
    assert!(store.load(&frame.stack_key()).unwrap().is_none());
    assert!(matches!(
        store.require(&frame.stack_key()),
        Err(LiveStackError::MissingReferenceStack(_))
    ));
}

#[test]
fn test_save_then_load() {
    let tmp = TempDir::new().unwrap();
    let store = StackStore::open(tmp.path()).unwrap();
    let mut frame = Frame::classify(&light_header("L", 30.0, 0, -10.0), constant(42.0)).unwrap();
    frame.sample_count = 4;
    frame.dark = Some("cam_DARK_30.0_0_-10".into());
    let stack = Stack::seed(frame);

    let path = store.save(&stack).unwrap();
    assert_eq!(path, store.path_for(&stack.key));
    assert!(store.exists(&stack.key));
    assert!(!path.with_extension("fits.tmp").exists());

    let loaded = store.require(&stack.key).unwrap();
    assert_eq!(loaded.key, stack.key);
    assert_eq!(loaded.count(), 4);
    assert_eq!(loaded.frame.dark.as_deref(), Some("cam_DARK_30.0_0_-10"));
    assert!(loaded.data().iter().all(|&v| v == 42.0));
}

#[test]
fn test_save_replaces_previous() {
    let tmp = TempDir::new().unwrap();
    let store = StackStore::open(tmp.path()).unwrap();
    let mut stack =
        Stack::seed(Frame::classify(&dark_header(10.0, 100, 18.0), constant(1.0)).unwrap());
    store.save(&stack).unwrap();

    stack.frame.data = constant(2.0);
    stack.frame.sample_count = 2;
    store.save(&stack).unwrap();

    let loaded = store.require(&stack.key).unwrap();
    assert_eq!(loaded.count(), 2);
    assert!(loaded.data().iter().all(|&v| v == 2.0));
}

#[test]
fn test_list_stacks() {
    let tmp = TempDir::new().unwrap();
    let store = StackStore::open(tmp.path()).unwrap();
    store
        .save(&Stack::seed(
            Frame::classify(&dark_header(10.0, 100, 18.0), constant(1.0)).unwrap(),
        ))
        .unwrap();
    store
        .save(&Stack::seed(
            Frame::classify(&flat_header("Ha", 1.0, 100, 18.0), constant(1.0)).unwrap(),
        ))
        .unwrap();
    std::fs::write(tmp.path().join("processed.txt"), "x\n").unwrap();

    let stacks = store.list().unwrap();
    assert_eq!(stacks.len(), 2);
    let roles: Vec<_> = stacks.iter().map(|s| s.role).collect();
    assert!(roles.contains(&"DARK"));
    assert!(roles.contains(&"FLAT"));
    assert!(stacks.iter().all(|s| s.count == 1 && s.width == 8 && s.height == 8));
}

#[test]
fn test_long_metadata_keeps_its_key() {
    let tmp = TempDir::new().unwrap();
    let store = StackStore::open(tmp.path()).unwrap();
    let mut header = light_header("Ha", 300.0, 100, 0.0);
    header.set("OBJECT", "T".repeat(75));
    let mut frame = Frame::classify(&header, constant(8.0)).unwrap();
    let dark_key = format!("{}_DARK_300.0_100_0", "C".repeat(110));
    frame.dark = Some(dark_key.clone());
    let stack = Stack::seed(frame);
    store.save(&stack).unwrap();

    let loaded = store.require(&stack.key).unwrap();
    assert_eq!(loaded.key, stack.key);
    assert_eq!(loaded.frame.dark.as_deref(), Some(dark_key.as_str()));

    let stacks = store.list().unwrap();
    assert_eq!(stacks.len(), 1);
    assert_eq!(stacks[0].key, stack.key.to_string());
}

#[test]
fn test_similar_camera_names_get_separate_files() {
    let tmp = TempDir::new().unwrap();
    let store = StackStore::open(tmp.path()).unwrap();
    let seed = |camera: &str, value: f64| {
        let mut header = dark_header(10.0, 100, 18.0);
        header.set("INSTRUME", camera);
        Stack::seed(Frame::classify(&header, constant(value)).unwrap())
    };
    let slash = seed("A/B", 1.0);
    let dash = seed("A-B", 2.0);
    store.save(&slash).unwrap();
    store.save(&dash).unwrap();

    assert_ne!(store.path_for(&slash.key), store.path_for(&dash.key));
    assert_eq!(store.list().unwrap().len(), 2);
    assert!(store.require(&slash.key).unwrap().data().iter().all(|&v| v == 1.0));
    assert!(store.require(&dash.key).unwrap().data().iter().all(|&v| v == 2.0));
}

#[test]
fn test_load_rejects_file_holding_another_key() {
    let tmp = TempDir::new().unwrap();
    let store = StackStore::open(tmp.path()).unwrap();
    let stored = Stack::seed(Frame::classify(&dark_header(10.0, 100, 18.0), constant(1.0)).unwrap());
    let wanted = Frame::classify(&dark_header(20.0, 100, 18.0), constant(1.0))
        .unwrap()
        .stack_key();
    let path = store.save(&stored).unwrap();
    std::fs::rename(&path, store.path_for(&wanted)).unwrap();

    assert!(matches!(
        store.load(&wanted),
        Err(LiveStackError::InvalidFits(_))
    ));
}
