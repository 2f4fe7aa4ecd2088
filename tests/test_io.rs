use eegrasp::io::{RawData, StWriter};
use ndarray::array;

#[test]
fn writer_output_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.safetensors");

    let data = array![[1.0, 2.0, 3.0], [f64::NAN, f64::NAN, f64::NAN], [-0.5, 0.25, 8.0]];
    let mut w = StWriter::new();
    w.add_f64_arr2("data", &data);
    w.add_f32("chan_pos", &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0], &[3, 2]);
    w.add_names("ch_names", &["Fz".to_string(), "Cz".to_string(), "Pz".to_string()]);
    w.add_f64("sfreq", &[256.0], &[1]);
    w.write(&path).unwrap();

    let raw = RawData::load(&path).unwrap();
    assert_eq!(raw.data.dim(), (3, 3));
    assert_eq!(raw.data.row(0), data.row(0));
    assert!(raw.data.row(1).iter().all(|v| v.is_nan()));
    assert_eq!(raw.chan_pos, array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
    assert_eq!(raw.ch_names, vec!["Fz", "Cz", "Pz"]);
    assert_eq!(raw.sfreq, Some(256.0));

    let sensors = raw.sensors().unwrap();
    assert_eq!(sensors.index_of("cz"), Some(1));
}

#[test]
fn names_are_optional() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.safetensors");
    let mut w = StWriter::new();
    w.add_f64_arr2("data", &array![[1.0], [2.0]]);
    w.add_f64_arr2("chan_pos", &array![[0.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
    w.write(&path).unwrap();

    let raw = RawData::load(&path).unwrap();
    assert!(raw.ch_names.is_empty());
    assert_eq!(raw.sfreq, None);
    assert_eq!(raw.sensors().unwrap().names(), &["ch0".to_string(), "ch1".to_string()]);
}

#[test]
fn missing_or_mismatched_tensors() {
    let dir = tempfile::tempdir().unwrap();

    let no_pos = dir.path().join("no_pos.safetensors");
    let mut w = StWriter::new();
    w.add_f64_arr2("data", &array![[1.0], [2.0]]);
    w.write(&no_pos).unwrap();
    assert!(RawData::load(&no_pos).is_err());

    let mismatch = dir.path().join("mismatch.safetensors");
    let mut w = StWriter::new();
    w.add_f64_arr2("data", &array![[1.0], [2.0], [3.0]]);
    w.add_f64_arr2("chan_pos", &array![[0.0, 0.0], [1.0, 0.0]]);
    w.write(&mismatch).unwrap();
    assert!(RawData::load(&mismatch).is_err());

    let ints = dir.path().join("ints.safetensors");
    let mut w = StWriter::new();
    w.add_i32("data", &[1, 2], &[2, 1]);
    w.add_f64_arr2("chan_pos", &array![[0.0, 0.0], [1.0, 0.0]]);
    w.write(&ints).unwrap();
    assert!(RawData::load(&ints).is_err());

    assert!(RawData::load(&dir.path().join("absent.safetensors")).is_err());
}
