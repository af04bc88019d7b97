//! Packaging and publishing of code artifacts consumed by later stacks

use crate::aws::BucketOperations;
use anyhow::{Context, Result};
use stackrun_common::Namespace;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// S3 bucket names are at most 63 characters
const MAX_BUCKET_NAME_LEN: usize = 63;

/// A local file or directory shipped as a zip archive
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Object key stem; the archive is stored as `{name}.zip`
    pub name: String,
    pub source: PathBuf,
}

impl Artifact {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn key(&self) -> String {
        format!("{}.zip", self.name)
    }
}

/// Where an artifact was uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifact {
    pub name: String,
    pub bucket: String,
    pub key: String,
}

/// Artifact bucket of a deployment: `{prefix}-artifacts-{account_id}`
pub fn artifact_bucket_name(namespace: &Namespace, account_id: &str) -> Result<String> {
    let name = format!("{}-artifacts-{account_id}", namespace.prefix());
    anyhow::ensure!(
        name.len() <= MAX_BUCKET_NAME_LEN,
        "artifact bucket name {name} exceeds {MAX_BUCKET_NAME_LEN} characters; use a shorter project or environment name"
    );
    Ok(name)
}

/// Zip a file (stored under its file name) or a directory (stored relative
/// to the directory) into memory
pub fn zip_source(source: &Path) -> Result<Vec<u8>> {
    let mut files = Vec::new();
    if source.is_dir() {
        collect_files(source, source, &mut files)?;
    } else {
        let name = source
            .file_name()
            .with_context(|| format!("{} has no file name", source.display()))?;
        files.push((source.to_path_buf(), name.to_string_lossy().into_owned()));
    }
    anyhow::ensure!(!files.is_empty(), "{} contains no files", source.display());

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (path, archive_name) in files {
        let data =
            std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        writer
            .start_file(archive_name.as_str(), options)
            .with_context(|| format!("Failed to add {archive_name} to archive"))?;
        writer.write_all(&data)?;
    }
    let cursor = writer.finish().context("Failed to finish archive")?;
    Ok(cursor.into_inner())
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<(PathBuf, String)>) -> Result<()> {
    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    // Stable archive layout
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, files)?;
        } else {
            let relative = path.strip_prefix(root)?;
            let archive_name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push((path, archive_name));
        }
    }
    Ok(())
}

/// Create the bucket if needed and upload every artifact
pub async fn publish_artifacts<B: BucketOperations>(
    buckets: &B,
    bucket: &str,
    artifacts: &[Artifact],
) -> Result<Vec<PublishedArtifact>> {
    buckets.ensure_bucket(bucket).await?;

    let mut published = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let data = zip_source(&artifact.source)
            .with_context(|| format!("Failed to package artifact {}", artifact.name))?;
        let key = artifact.key();
        info!(artifact = %artifact.name, bucket = %bucket, key = %key, size = data.len(), "Uploading artifact");
        buckets
            .upload_bytes(bucket, &key, data, "application/zip")
            .await?;
        published.push(PublishedArtifact {
            name: artifact.name.clone(),
            bucket: bucket.to_string(),
            key,
        });
    }
    Ok(published)
}
