use super::{AcquireError, LocalAsset, MediaAcquirer};
use crate::config::MediaConfig;
use crate::shared::delivery::digest;
use crate::shared::fs_atomic::write_atomically;
use crate::shared::ids::JobReference;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Downloads (or copies) submitted media into `<media_dir>/<job_ref>/`.
pub struct HttpAcquirer {
    media_dir: PathBuf,
    max_bytes: u64,
    timeout: Duration,
    local_roots: Vec<PathBuf>,
}

impl HttpAcquirer {
    pub fn new(media_dir: impl Into<PathBuf>, config: &MediaConfig) -> Self {
        Self {
            media_dir: media_dir.into(),
            max_bytes: config.max_bytes,
            timeout: Duration::from_secs(config.download_timeout_seconds),
            local_roots: config.local_roots.clone(),
        }
    }

    fn download(&self, url: &str) -> Result<(Vec<u8>, Option<String>), AcquireError> {
        let response = ureq::get(url)
            .timeout(self.timeout)
            .call()
            .map_err(|err| AcquireError::Transport(format!("{url}: {err}")))?;
        if let Some(length) = response
            .header("Content-Length")
            .and_then(|value| value.trim().parse::<u64>().ok())
        {
            if length > self.max_bytes {
                return Err(AcquireError::TooLarge {
                    limit: self.max_bytes,
                });
            }
        }
        let content_type = response
            .header("Content-Type")
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string());
        let bytes = self.read_capped(response.into_reader(), url)?;
        Ok((bytes, content_type))
    }

    /// Local media is only readable from beneath a configured root, compared
    /// after symlinks and `..` are resolved.
    fn permitted_local(&self, path: &Path) -> Result<PathBuf, AcquireError> {
        if self.local_roots.is_empty() {
            return Err(AcquireError::LocalAccessDenied(path.display().to_string()));
        }
        let resolved = fs::canonicalize(path).map_err(|source| AcquireError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let permitted = self
            .local_roots
            .iter()
            .filter_map(|root| fs::canonicalize(root).ok())
            .any(|root| resolved.starts_with(root));
        if permitted {
            Ok(resolved)
        } else {
            Err(AcquireError::LocalAccessDenied(path.display().to_string()))
        }
    }

    fn copy_local(&self, path: &Path) -> Result<Vec<u8>, AcquireError> {
        let path = self.permitted_local(path)?;
        let file = fs::File::open(&path).map_err(|source| AcquireError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.read_capped(file, &path.display().to_string())
    }

    fn read_capped(&self, reader: impl Read, origin: &str) -> Result<Vec<u8>, AcquireError> {
        let mut bytes = Vec::new();
        reader
            .take(self.max_bytes.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|err| AcquireError::Transport(format!("{origin}: {err}")))?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(AcquireError::TooLarge {
                limit: self.max_bytes,
            });
        }
        if bytes.is_empty() {
            return Err(AcquireError::Transport(format!("{origin}: empty media")));
        }
        Ok(bytes)
    }
}

impl MediaAcquirer for HttpAcquirer {
    fn acquire(&self, media_ref: &str, job: &JobReference) -> Result<LocalAsset, AcquireError> {
        let reference = media_ref.trim();
        let (bytes, content_type) =
            if reference.starts_with("http://") || reference.starts_with("https://") {
                self.download(reference)?
            } else {
                let local = PathBuf::from(reference.strip_prefix("file://").unwrap_or(reference));
                if !local.is_absolute() {
                    return Err(AcquireError::UnsupportedReference(reference.to_string()));
                }
                (self.copy_local(&local)?, None)
            };

        let content_type = content_type
            .filter(|value| value.starts_with("image/"))
            .unwrap_or_else(|| content_type_for(reference).to_string());
        let stem = digest(&["asset", reference]);
        let path = self.media_dir.join(job.as_str()).join(format!(
            "{}.{}",
            &stem[..16],
            extension_for(&content_type)
        ));
        write_atomically(&path, &bytes).map_err(|source| AcquireError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Ok(LocalAsset {
            path,
            media_ref: reference.to_string(),
            bytes: bytes.len() as u64,
            content_type,
        })
    }
}

fn content_type_for(reference: &str) -> &'static str {
    let lower = reference.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}
