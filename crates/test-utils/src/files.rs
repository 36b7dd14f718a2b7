//! Raw volume files on disk.
//!
//! Volumes are written as headerless little-endian samples in x-fastest
//! order, the layout the dataset loader reads.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Creates a temporary directory that is removed when dropped.
pub fn temp_dataset_dir() -> TempDir {
    tempfile::tempdir().expect("create temporary dataset directory")
}

/// Writes `data` as raw little-endian `u16` samples to `dir/name`.
pub fn write_raw_u16(dir: &Path, name: &str, data: &[u16]) -> io::Result<PathBuf> {
    let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
    write_raw(dir, name, &bytes)
}

/// Writes `data` as raw little-endian `f32` samples to `dir/name`.
pub fn write_raw_f32(dir: &Path, name: &str, data: &[f32]) -> io::Result<PathBuf> {
    let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
    write_raw(dir, name, &bytes)
}

/// Writes raw bytes to `dir/name`.
pub fn write_raw(dir: &Path, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, bytes)?;
    Ok(path)
}
