use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::multipart;
use serde::Deserialize;
use thiserror::Error;

use crate::snapshot::Snapshot;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("backend rejected session start (status \"{0}\")")]
    StartRejected(String),
    #[error("not a video file: {0}")]
    NotAVideo(String),
    #[error("upload rejected: {0}")]
    UploadRejected(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Acknowledgment body shared by `/start` and `/upload_video`. The backend
/// omits `status` entirely on some rejections, which still must not parse
/// as success.
#[derive(Deserialize)]
struct Ack {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the simulation backend.
#[derive(Clone)]
pub struct Backend {
    base: String,
    http: reqwest::Client,
}

impl Backend {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// `POST /start`: resets the backend simulation with `n_nodes` nodes.
    /// Anything but `status: "ok"` is a rejection.
    pub async fn start(&self, n_nodes: u32) -> Result<(), ApiError> {
        let ack: Ack = self
            .http
            .post(format!("{}/start", self.base))
            .json(&serde_json::json!({ "n_nodes": n_nodes }))
            .send()
            .await?
            .json()
            .await?;

        if ack.status != "ok" {
            return Err(ApiError::StartRejected(ack.status));
        }
        Ok(())
    }

    /// `GET /step`: advances the simulation one tick and returns the
    /// resulting snapshot.
    pub async fn step(&self) -> Result<Snapshot, ApiError> {
        let snap = self
            .http
            .get(format!("{}/step", self.base))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(snap)
    }

    /// `POST /upload_video`: multipart upload under field `video`.
    /// Non-video files are rejected locally, before any request is made.
    pub async fn upload_video(&self, path: &Path) -> Result<(), ApiError> {
        let mime = match mime_guess::from_path(path).first() {
            Some(m) if m.type_() == mime_guess::mime::VIDEO => m,
            _ => return Err(ApiError::NotAVideo(path.display().to_string())),
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let data = tokio::fs::read(path).await?;
        let part = multipart::Part::bytes(data)
            .file_name(file_name)
            .mime_str(mime.as_ref())?;
        let form = multipart::Form::new().part("video", part);

        let resp = self
            .http
            .post(format!("{}/upload_video", self.base))
            .multipart(form)
            .send()
            .await?;

        // An unparseable body is reported as a plain network failure; a
        // parsed non-ok body carries the backend's message.
        let ack: Ack = match resp.json().await {
            Ok(ack) => ack,
            Err(err) => return Err(ApiError::Http(err)),
        };
        if ack.status != "ok" {
            return Err(ApiError::UploadRejected(
                ack.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(())
    }

    /// `GET /video_feed` URL with a cache-defeating query parameter, so a
    /// (re)attachment is never served a stale cached frame.
    pub fn feed_url(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!("{}/video_feed?{}", self.base, millis)
    }

    /// Opens the continuous detection image stream.
    pub async fn feed(&self) -> Result<reqwest::Response, ApiError> {
        let resp = self
            .http
            .get(self.feed_url())
            .send()
            .await?
            .error_for_status()?;
        Ok(resp)
    }
}
