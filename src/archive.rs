//! Zip packaging of completed jobs, and unpacking of source archives

use crate::error::{ArchiveError, Error, Result};
use crate::types::{Job, JobStatus, frame_file_name};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

/// Extensions accepted as frame images when unpacking a source archive
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "gif"];

/// Build `<job dir>/<job id>.zip` holding every frame of a complete job
///
/// Entries are named by the frame's stored basename and written in index order.
/// Sets `job.archive_path` and returns the archive location.
pub async fn build_archive(job: &mut Job) -> Result<PathBuf> {
    if job.status != JobStatus::Complete {
        return Err(Error::Archive(ArchiveError::NotComplete {
            job_id: job.id.to_string(),
            status: job.status.to_string(),
        }));
    }

    let entries: Vec<(usize, String, PathBuf)> = job
        .frames
        .iter()
        .map(|f| (f.index, f.file_name(), f.local_path.clone()))
        .collect();

    for (index, _, path) in &entries {
        if !path.is_file() {
            return Err(Error::Archive(ArchiveError::MissingFrame {
                index: *index,
                path: path.clone(),
            }));
        }
    }

    let archive_path = job.directory.join(job.archive_file_name());
    let target = archive_path.clone();

    spawn_blocking(move || write_archive(&entries, &target))
        .await
        .map_err(|e| {
            Error::Archive(ArchiveError::WriteFailed {
                path: archive_path.clone(),
                reason: format!("archive task panicked: {}", e),
            })
        })??;

    info!(
        job_id = %job.id,
        frames = job.frames.len(),
        ?archive_path,
        "job archive built"
    );

    job.archive_path = Some(archive_path.clone());
    Ok(archive_path)
}

fn write_archive(entries: &[(usize, String, PathBuf)], archive_path: &Path) -> Result<()> {
    let part = archive_path.with_extension("zip.part");
    let result = write_archive_to(entries, &part, archive_path);

    match result {
        Ok(()) => std::fs::rename(&part, archive_path).map_err(|e| write_error(archive_path, e)),
        Err(e) => {
            if let Err(rm) = std::fs::remove_file(&part)
                && rm.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = ?part, error = %rm, "failed to remove partial archive");
            }
            Err(e)
        }
    }
}

fn write_archive_to(
    entries: &[(usize, String, PathBuf)],
    part: &Path,
    archive_path: &Path,
) -> Result<()> {
    let file = File::create(part).map_err(|e| write_error(archive_path, e))?;
    let mut writer = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (index, name, path) in entries {
        let mut input = File::open(path).map_err(|_| {
            Error::Archive(ArchiveError::MissingFrame {
                index: *index,
                path: path.clone(),
            })
        })?;
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| write_error(archive_path, e))?;
        std::io::copy(&mut input, &mut writer).map_err(|e| write_error(archive_path, e))?;
        debug!(index, name = %name, "added frame to archive");
    }

    let mut file = writer.finish().map_err(|e| write_error(archive_path, e))?;
    file.flush().map_err(|e| write_error(archive_path, e))?;
    file.sync_all().map_err(|e| write_error(archive_path, e))?;
    Ok(())
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Archive(ArchiveError::WriteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// A frame image taken out of a source archive
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnpackedEntry {
    /// Entry name inside the archive, directories included
    pub name: String,
    /// Where the entry was written, e.g. `<dest>/frame_001.jpg`
    pub path: PathBuf,
}

/// Unpack the image entries of `archive` into `dest` as `frame_NNN.jpg`
///
/// Directory structure is flattened, non-image entries and macOS resource forks
/// are skipped, and entries are numbered in name order.
pub async fn unpack_archive(archive: &Path, dest: &Path) -> Result<Vec<UnpackedEntry>> {
    let archive_owned = archive.to_path_buf();
    let dest_owned = dest.to_path_buf();

    spawn_blocking(move || unpack_blocking(&archive_owned, &dest_owned))
        .await
        .map_err(|e| {
            Error::Archive(ArchiveError::UnpackFailed {
                archive: archive.to_path_buf(),
                reason: format!("unpack task panicked: {}", e),
            })
        })?
}

fn unpack_blocking(archive_path: &Path, dest: &Path) -> Result<Vec<UnpackedEntry>> {
    let unpack_error = |reason: String| {
        Error::Archive(ArchiveError::UnpackFailed {
            archive: archive_path.to_path_buf(),
            reason,
        })
    };

    let file = File::open(archive_path)
        .map_err(|e| unpack_error(format!("failed to open archive: {}", e)))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| unpack_error(format!("failed to read ZIP archive: {}", e)))?;

    let mut images: Vec<(String, usize)> = Vec::new();
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| unpack_error(format!("failed to read ZIP entry: {}", e)))?;

        if entry.is_dir() {
            continue;
        }
        let Some(path) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "skipping entry with unsafe path");
            continue;
        };
        if is_frame_image(path) {
            images.push((entry.name().to_string(), i));
        } else {
            debug!(entry = entry.name(), "skipping non-image entry");
        }
    }

    if images.is_empty() {
        return Err(Error::Archive(ArchiveError::Empty {
            archive: archive_path.to_path_buf(),
        }));
    }

    images.sort_by(|a, b| basename(&a.0).cmp(basename(&b.0)).then(a.0.cmp(&b.0)));

    let mut unpacked = Vec::with_capacity(images.len());
    for (n, (name, i)) in images.into_iter().enumerate() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| unpack_error(format!("failed to read ZIP entry: {}", e)))?;
        let target = dest.join(frame_file_name(n + 1));
        let part = target.with_extension("jpg.part");

        let mut out = File::create(&part).map_err(|e| Error::PersistFailed {
            path: target.clone(),
            reason: e.to_string(),
        })?;
        std::io::copy(&mut entry, &mut out)
            .and_then(|_| out.sync_all())
            .and_then(|_| std::fs::rename(&part, &target))
            .map_err(|e| {
                std::fs::remove_file(&part).ok();
                unpack_error(format!("failed to extract '{}': {}", name, e))
            })?;

        unpacked.push(UnpackedEntry { name, path: target });
    }

    info!(
        ?archive_path,
        extracted_count = unpacked.len(),
        "source archive unpacked"
    );
    Ok(unpacked)
}

fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn is_frame_image(path: &Path) -> bool {
    if path
        .components()
        .any(|c| c.as_os_str().to_string_lossy() == "__MACOSX")
    {
        return false;
    }
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if file_name.starts_with("._") {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}
