//! Zip archiving of rendered assets

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::Result;

/// Zip every file under `dir` into `zip_path`, paths relative to `dir`.
///
/// Entries are stored without recompression; the slices are already PNG.
/// Returns the number of files written.
pub fn zip_directory(dir: &Path, zip_path: &Path) -> Result<usize> {
    if let Some(parent) = zip_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    let mut zip = ZipWriter::new(File::create(zip_path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for path in &files {
        let name = archive_name(dir, path);
        zip.start_file(name, options)?;
        zip.write_all(&std::fs::read(path)?)?;
    }
    zip.finish()?;

    Ok(files.len())
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

/// Forward-slash path of `path` relative to `root`
fn archive_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
