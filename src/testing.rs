use std::fs;
use std::path::PathBuf;

/// Contents of a fixture under `resources/test`.
pub(crate) fn read_resource(filename: &str) -> String {
    let mut d = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    d.push(format!("resources/test/{}", filename));
    fs::read_to_string(d.as_path()).unwrap()
}
