//! Image acquisition: download an embedded image once and store it locally.
//!
//! The file extension comes from the response's `Content-Type`, never from
//! the URL: embedded-image URLs end in `?OpenElement` and say nothing about
//! the format. Files are written with create-or-truncate semantics, so a
//! re-run overwrites what an earlier run downloaded.
//!
//! Within one run each distinct URL is fetched at most once; later requests
//! for the same URL get the path written the first time.

use crate::config::ExportConfig;
use crate::error::ExportError;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

/// Downloads a remote image and persists it under a given base name.
pub trait ImageFetcher {
    /// Fetch `remote_ref` and write it as `<base_name>.<ext>` in the image
    /// directory, returning the full path written.
    fn fetch(&self, remote_ref: &str, base_name: &str) -> Result<PathBuf, ExportError>;
}

/// [`ImageFetcher`] backed by a blocking HTTP client.
pub struct HttpImageFetcher {
    client: Client,
    base_url: String,
    images_dir: PathBuf,
    fetched: Mutex<HashMap<String, PathBuf>>,
}

impl HttpImageFetcher {
    pub fn new(config: &ExportConfig) -> Result<Self, ExportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .build()
            .map_err(|e| ExportError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            images_dir: config.images_dir(),
            fetched: Mutex::new(HashMap::new()),
        })
    }

    /// Number of distinct images written so far in this run.
    pub fn fetched_count(&self) -> usize {
        self.fetched.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn download(&self, url: &str, base_name: &str) -> Result<PathBuf, ExportError> {
        info!("Downloading image: {}", url);

        let failed = |reason: String| ExportError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                failed("request timed out".to_string())
            } else {
                failed(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let extension = content_type
            .as_deref()
            .and_then(extension_for_content_type)
            .ok_or_else(|| ExportError::UnknownContentType {
                url: url.to_string(),
                content_type: content_type.clone(),
            })?;

        let bytes = response.bytes().map_err(|e| failed(e.to_string()))?;

        let path = self.images_dir.join(format!("{base_name}.{extension}"));
        std::fs::write(&path, &bytes).map_err(|e| ExportError::WriteFailed {
            path: path.clone(),
            source: e,
        })?;

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, remote_ref: &str, base_name: &str) -> Result<PathBuf, ExportError> {
        let url = resolve_url(&self.base_url, remote_ref);

        if let Some(path) = self
            .fetched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&url)
        {
            debug!("Already fetched {} → {}", url, path.display());
            return Ok(path.clone());
        }

        let path = self.download(&url, base_name)?;
        self.fetched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url, path.clone());
        Ok(path)
    }
}

/// Check if the reference is already an absolute HTTP(S) URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Absolute references are used as-is; anything else is appended to `base_url`.
pub fn resolve_url(base_url: &str, remote_ref: &str) -> String {
    if is_url(remote_ref) {
        remote_ref.to_string()
    } else {
        format!("{base_url}{remote_ref}")
    }
}

/// File extension for a declared content type; parameters such as
/// `charset` are ignored.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let ext = match mime.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/bmp" | "image/x-ms-bmp" => "bmp",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/tiff" => "tif",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        "image/avif" => "avif",
        "application/pdf" => "pdf",
        _ => return None,
    };
    Some(ext)
}
