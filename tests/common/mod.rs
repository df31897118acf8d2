#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const SAMPLE: &str = "tests/fixtures/sample.yaml";
pub const COMPLEX: &str = "tests/fixtures/complex.yaml";
pub const INVALID_CROP: &str = "tests/fixtures/invalid_crop.yaml";

/// Copies a fixture into `dir` so mutating commands can rewrite it.
pub fn copy_fixture(fixture: &str, dir: &Path) -> PathBuf {
    let name = Path::new(fixture).file_name().expect("fixture file name");
    let dest = dir.join(name);
    fs::copy(fixture, &dest).expect("copy fixture");
    dest
}

/// Creates `<parent>/<name>` holding `results.yaml` (copied from `fixture`)
/// and a `width`x`height` BMP called `page.bmp`.
pub fn make_document_folder(parent: &Path, name: &str, fixture: &str, width: u32, height: u32) -> PathBuf {
    let dir = parent.join(name);
    fs::create_dir_all(&dir).expect("create document folder");
    fs::copy(fixture, dir.join("results.yaml")).expect("copy document");
    write_bmp(&dir.join("page.bmp"), width, height);
    dir
}

/// Minimal uncompressed 24-bit BMP.
pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&[0; 24]);

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}
