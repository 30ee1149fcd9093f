//! Zip packaging of a run's slot images.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::prelude::*;

/// PNG files directly inside `dir`, sorted by file name.
pub fn png_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "png"))
        .collect();
    files.sort();
    Ok(files)
}

/// Write every PNG in `source_dir` into a flat zip at `dest`. Returns the
/// number of entries written.
pub fn write_archive(source_dir: &Path, dest: &Path) -> Result<usize, Error> {
    let files = png_files(source_dir)?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = ZipWriter::new(File::create(dest)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        writer.start_file(name, options)?;
        writer.write_all(&fs::read(path)?)?;
    }
    writer.finish()?;

    log::info!("wrote {} images to {}", files.len(), dest.display());
    Ok(files.len())
}
