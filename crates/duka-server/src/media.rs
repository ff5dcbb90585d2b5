//! Image uploads written to the media directory and served under `/media`.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt as _};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Public URL prefix the media directory is mounted at.
pub const MEDIA_ROUTE: &str = "/media";

#[derive(Debug, Error)]
pub enum MediaError {
  #[error("File required")]
  Missing,

  #[error("Only image files allowed")]
  NotImage,

  #[error("SVG images are not allowed")]
  Svg,

  #[error("File size must be less than 5MB")]
  TooLarge,

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// The `file` part of a multipart upload.
#[derive(Debug)]
pub struct Upload {
  pub file_name:    Option<String>,
  pub content_type: Option<String>,
  pub bytes:        Bytes,
}

impl Upload {
  pub fn check(&self) -> Result<(), MediaError> {
    let is_image = self
      .content_type
      .as_deref()
      .is_some_and(|ct| ct.starts_with("image/"));
    if !is_image {
      return Err(MediaError::NotImage);
    }
    // Media is served from the API origin, where an SVG could run script.
    if self.is_svg() {
      return Err(MediaError::Svg);
    }
    if self.bytes.len() > MAX_UPLOAD_BYTES {
      return Err(MediaError::TooLarge);
    }
    Ok(())
  }

  fn is_svg(&self) -> bool {
    let svg_type = self
      .content_type
      .as_deref()
      .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("image/svg"));
    svg_type || self.extension() == "svg"
  }

  /// Extension from the client file name, else from the image subtype.
  fn extension(&self) -> String {
    let from_name = self
      .file_name
      .as_deref()
      .and_then(|n| n.rsplit_once('.'))
      .map(|(_, ext)| ext);
    let from_type = self
      .content_type
      .as_deref()
      .and_then(|ct| ct.strip_prefix("image/"))
      .map(|sub| sub.split(['+', ';']).next().unwrap_or(sub));

    [from_name, from_type]
      .into_iter()
      .flatten()
      .map(clean_segment)
      .find(|ext| !ext.is_empty())
      .unwrap_or_else(|| "bin".to_owned())
  }
}

/// Lowercase and keep only `[a-z0-9_-]`.
pub fn clean_segment(raw: &str) -> String {
  raw
    .chars()
    .map(|c| c.to_ascii_lowercase())
    .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
    .collect()
}

/// Write `upload` as `{prefix}-{millis}.{ext}` and return the file name.
/// A taken name moves the timestamp forward until a free one is found.
pub async fn save(
  dir: &Path,
  prefix: &str,
  upload: &Upload,
  now: DateTime<Utc>,
) -> Result<String, MediaError> {
  upload.check()?;
  fs::create_dir_all(dir).await?;

  let ext = upload.extension();
  let mut millis = now.timestamp_millis();
  loop {
    let name = format!("{prefix}-{millis}.{ext}");
    let path: PathBuf = dir.join(&name);
    match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
      Ok(mut file) => {
        file.write_all(&upload.bytes).await?;
        file.flush().await?;
        tracing::info!(file = %name, bytes = upload.bytes.len(), "stored upload");
        return Ok(name);
      }
      Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => millis += 1,
      Err(e) => return Err(e.into()),
    }
  }
}

pub fn public_url(name: &str) -> String { format!("{MEDIA_ROUTE}/{name}") }
