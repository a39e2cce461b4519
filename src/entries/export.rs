//! Export attachments to the local filesystem

use anyhow::{Context, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::backend::{BackendClient, EntryFile};
use crate::utils::sanitize_filename;

/// Local filename for an exported attachment
///
/// The stored name is sanitized again so that a name written to storage by
/// some other client cannot escape `out_dir`.
pub fn export_filename(entry_id: &str, file_name: &str) -> String {
    sanitize_filename(file_name)
        .into_result()
        .or_else(|_| sanitize_filename(&format!("{entry_id}.pdf")).into_result())
        .unwrap_or_else(|_| "attachment.pdf".to_string())
}

/// Resolve the destination path, refusing to clobber unless `force` is set
pub async fn destination(out_dir: &Path, name: &str, force: bool) -> Result<PathBuf> {
    let path = out_dir.join(name);

    if !force && fs::try_exists(&path).await.unwrap_or(false) {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    Ok(path)
}

/// Sibling path a download is written to before it is complete
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// Write a byte stream to `path`, reporting progress
///
/// Data goes to `<name>.part` first and is renamed into place once complete.
/// The partial file is never created over an existing one, and is removed
/// again if the download fails.
pub async fn write_stream<S, E>(stream: S, path: &Path, progress: &ProgressBar) -> Result<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let partial = partial_path(path);
    let file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&partial)
        .await
        .with_context(|| format!("Failed to create {}", partial.display()))?;

    let result = match copy_stream(stream, file, &partial, progress).await {
        Ok(written) => fs::rename(&partial, path)
            .await
            .map(|_| written)
            .with_context(|| format!("Failed to move download to {}", path.display())),
        Err(e) => Err(e),
    };

    match result {
        Ok(written) => {
            debug!("Wrote {} bytes to {}", written, path.display());
            Ok(written)
        }
        Err(e) => {
            if let Err(remove_err) = fs::remove_file(&partial).await {
                warn!("Failed to remove {}: {}", partial.display(), remove_err);
            }
            Err(e)
        }
    }
}

async fn copy_stream<S, E>(
    stream: S,
    mut file: fs::File,
    partial: &Path,
    progress: &ProgressBar,
) -> Result<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut stream = std::pin::pin!(stream);
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Download interrupted")?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write {}", partial.display()))?;
        written += chunk.len() as u64;
        progress.set_position(written);
    }

    file.flush().await.context("Failed to flush download")?;
    Ok(written)
}

/// Download an entry's attachment into `out_dir`
pub async fn download_attachment(
    client: &BackendClient,
    entry_id: &str,
    file: &EntryFile,
    out_dir: &Path,
    force: bool,
) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let name = export_filename(entry_id, &file.file_name);
    let path = destination(out_dir, &name, force).await?;

    let response = client
        .download(&file.file_url)
        .await
        .context("Failed to download attachment")?;

    let progress = ProgressBar::new(response.content_length().unwrap_or(0));
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    progress.set_message(name.clone());

    let written = write_stream(response.bytes_stream(), &path, &progress).await?;
    progress.finish_with_message("Download complete");

    info!("Saved {} ({} bytes)", path.display(), written);
    Ok(path)
}
