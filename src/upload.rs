//! Best-effort image attachment for new posts and events.
//!
//! A selected file is validated locally first. The upload itself may fail for
//! any reason; content creation then carries on without an image.

use crate::error::{ClientError, Result};
use base64::Engine;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// A local image that passed selection checks
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub path: PathBuf,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Validate and read an image. Type and size are checked before the
    /// contents are read.
    pub fn open(path: &Path, max_bytes: u64) -> Result<Self> {
        let media_type = media_type_for_file(path);
        if !media_type.starts_with("image/") {
            return Err(ClientError::validation("Please select an image file"));
        }

        let size = std::fs::metadata(path)?.len();
        if size > max_bytes {
            return Err(ClientError::validation(format!(
                "Image size should be less than {}",
                format_size(max_bytes)
            )));
        }

        let bytes = std::fs::read(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            media_type,
            bytes,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string()
    }
}

/// Declared media type for a file, from its extension
pub fn media_type_for_file(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        Some("avif") => "image/avif",
        Some("txt") => "text/plain",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn format_size(bytes: u64) -> String {
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;
    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Somewhere images can be hosted
pub trait ImageHost {
    /// Upload and return the hosted URL
    fn upload(&self, image: &ImageFile) -> Result<String>;
}

/// ImgBB upload API
pub struct ImgBbHost {
    upload_url: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct ImgBbResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ImgBbData>,
}

#[derive(Debug, Deserialize)]
struct ImgBbData {
    url: String,
}

impl ImgBbHost {
    pub fn new(upload_url: &str, api_key: Option<String>) -> Self {
        Self {
            upload_url: upload_url.to_string(),
            api_key,
            agent: ureq::Agent::new(),
        }
    }
}

impl ImageHost for ImgBbHost {
    fn upload(&self, image: &ImageFile) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ClientError::validation("No image host key configured"))?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
        let name = image.file_name();
        let resp = self
            .agent
            .post(&self.upload_url)
            .query("key", key)
            .send_form(&[("image", encoded.as_str()), ("name", name.as_str())])?;

        let body: ImgBbResponse = resp
            .into_json()
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        parse_hosted_url(body)
    }
}

fn parse_hosted_url(body: ImgBbResponse) -> Result<String> {
    match body {
        ImgBbResponse {
            success: true,
            data: Some(data),
        } if !data.url.is_empty() => Ok(data.url),
        _ => Err(ClientError::Decode("Upload failed".to_string())),
    }
}

/// What came of an optional attachment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attachment {
    pub url: Option<String>,
    /// Set when an image was selected but could not be hosted
    pub warning: Option<String>,
}

/// Upload `image` if there is one. Never fails: a failed upload yields no URL
/// and a warning naming what the caller should tell the user.
pub fn attach_best_effort(
    host: &dyn ImageHost,
    image: Option<&ImageFile>,
    without_image: &str,
) -> Attachment {
    let Some(image) = image else {
        return Attachment::default();
    };

    match host.upload(image) {
        Ok(url) => Attachment {
            url: Some(url),
            warning: None,
        },
        Err(e) => Attachment {
            url: None,
            warning: Some(format!(
                "Failed to upload image. {} without image. ({})",
                without_image, e
            )),
        },
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::Cell;

    /// Host that answers with a fixed outcome and counts calls
    pub struct FakeHost {
        pub url: Option<String>,
        pub calls: Cell<usize>,
    }

    impl FakeHost {
        pub fn ok(url: &str) -> Self {
            Self {
                url: Some(url.to_string()),
                calls: Cell::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                url: None,
                calls: Cell::new(0),
            }
        }
    }

    impl ImageHost for FakeHost {
        fn upload(&self, _image: &ImageFile) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            self.url
                .clone()
                .ok_or_else(|| ClientError::Transport("host unreachable".to_string()))
        }
    }
}
