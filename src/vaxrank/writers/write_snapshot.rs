//! Saving and restoring complete ranking results as JSON.
//!

use crate::utils::Result;
use crate::vaxrank::result::{RankedResult, FORMAT_VERSION};
use semver::Version;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

pub fn save_snapshot(path: &Path, result: &RankedResult) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| format!("Invalid snapshot output path {}: {}", path.display(), e))?;
    write_snapshot(BufWriter::new(file), result)
}

pub fn load_snapshot(path: &Path) -> Result<RankedResult> {
    let file = File::open(path)
        .map_err(|e| format!("Error opening snapshot {}: {}", path.display(), e))?;
    read_snapshot(BufReader::new(file))
        .map_err(|e| format!("Error loading snapshot {}: {}", path.display(), e))
}

fn write_snapshot<W: Write>(mut writer: W, result: &RankedResult) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, result)
        .map_err(|e| format!("Error serializing snapshot: {}", e))?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| format!("Error writing snapshot: {}", e))
}

/// Restores a result, refusing snapshots from an incompatible format version.
fn read_snapshot<R: Read>(reader: R) -> Result<RankedResult> {
    let result: RankedResult =
        serde_json::from_reader(reader).map_err(|e| format!("Malformed snapshot: {}", e))?;
    check_format_version(&result.format_version)?;
    Ok(result)
}

fn check_format_version(version: &str) -> Result<()> {
    let found = Version::parse(version)
        .map_err(|e| format!("Invalid snapshot format version '{}': {}", version, e))?;
    let supported = Version::parse(FORMAT_VERSION).map_err(|e| e.to_string())?;
    if found.major != supported.major {
        return Err(format!(
            "Unsupported snapshot format version {} (supported: {}.x)",
            found, supported.major
        ));
    }
    Ok(())
}
