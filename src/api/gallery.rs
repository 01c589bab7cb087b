//! Directory listing and file serving for generated images.
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;

use crate::error::{AppError, AppResult};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

#[derive(Debug, Clone, Serialize)]
pub struct GalleryEntry {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

fn image_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Image files directly inside `dir`, newest first. A missing directory lists empty.
pub async fn list_images(dir: &Path) -> AppResult<Vec<GalleryEntry>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(dir = %dir.display(), "Gallery directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut images = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let meta = entry.metadata().await?;
        if !meta.is_file() || !is_image(&path) {
            continue;
        }
        let modified = meta.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now());
        images.push(GalleryEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            size: meta.len(),
            modified,
        });
    }
    images.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(images)
}

/// Resolve `filename` inside `dir`, refusing anything that is not a plain file name.
pub fn resolve_image_path(dir: &Path, filename: &str) -> AppResult<PathBuf> {
    let candidate = Path::new(filename);
    let mut components = candidate.components();
    let plain = matches!((components.next(), components.next()), (Some(Component::Normal(_)), None));
    if !plain || filename.contains('\\') {
        return Err(AppError::invalid("filename", "must be a plain file name"));
    }
    if !is_image(candidate) {
        return Err(AppError::NotFound(filename.to_string()));
    }
    Ok(dir.join(candidate))
}

/// Bytes and content type of one gallery image.
pub async fn read_image(dir: &Path, filename: &str) -> AppResult<(&'static str, Vec<u8>)> {
    let path = resolve_image_path(dir, filename)?;
    let content_type = image_content_type(&path).unwrap_or("application/octet-stream");
    match fs::read(&path).await {
        Ok(bytes) => Ok((content_type, bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound(filename.to_string())),
        Err(e) => Err(e.into()),
    }
}
