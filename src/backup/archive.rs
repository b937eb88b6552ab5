// mysqltool/src/backup/archive.rs
use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::errors::AppError;

/// Gzips `source` into `<source>.gz` and removes the original, like `gzip`.
///
/// # Returns
/// Path to the compressed file.
pub fn gzip_in_place(source: &Path) -> Result<PathBuf> {
    if !source.is_file() {
        return Err(anyhow::anyhow!(
            "File to compress does not exist: {}",
            source.display()
        ));
    }
    let mut gz_name = source.as_os_str().to_owned();
    gz_name.push(".gz");
    let gz_path = PathBuf::from(gz_name);

    let input = File::open(source)
        .with_context(|| format!("Failed to open file for compression: {}", source.display()))?;
    let output = File::create(&gz_path)
        .with_context(|| format!("Failed to create compressed file: {}", gz_path.display()))?;

    let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
    io::copy(&mut BufReader::new(input), &mut encoder)
        .with_context(|| format!("Failed to compress {}", source.display()))?;
    encoder
        .finish()
        .with_context(|| format!("Failed to finish Gzip encoding for {}", gz_path.display()))?
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(|| format!("Failed to flush {}", gz_path.display()))?;

    fs::remove_file(source)
        .with_context(|| format!("Failed to remove uncompressed file: {}", source.display()))?;

    tracing::debug!(path = %gz_path.display(), "compressed dump");
    Ok(gz_path)
}

/// Where `gunzip_in_place` writes its output: the archive path without
/// `.gz`. `None` when the name has no such suffix.
pub fn gunzip_output_path(archive_path: &Path) -> Option<PathBuf> {
    let file_name = archive_path.file_name()?.to_str()?;
    match file_name.strip_suffix(".gz") {
        Some(stem) if !stem.is_empty() => Some(archive_path.with_file_name(stem)),
        _ => None,
    }
}

/// Decompresses `<name>.gz` into `<name>`, overwriting an existing `<name>`
/// and removing the archive, like `gunzip -f`. Concatenated gzip members are
/// all decoded.
pub fn gunzip_in_place(archive_path: &Path) -> Result<PathBuf> {
    let output_path = gunzip_output_path(archive_path).ok_or_else(|| {
        let file_name = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        AppError::InvalidFilename(file_name)
    })?;

    let input = File::open(archive_path)
        .with_context(|| format!("Failed to open archive file: {}", archive_path.display()))?;
    let output = File::create(&output_path)
        .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;

    let mut decoder = MultiGzDecoder::new(BufReader::new(input));
    let mut writer = BufWriter::new(output);
    io::copy(&mut decoder, &mut writer)
        .with_context(|| format!("Failed to decompress {}", archive_path.display()))?;
    writer
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(|| format!("Failed to flush {}", output_path.display()))?;

    fs::remove_file(archive_path)
        .with_context(|| format!("Failed to remove archive: {}", archive_path.display()))?;

    tracing::debug!(path = %output_path.display(), "decompressed archive");
    Ok(output_path)
}
