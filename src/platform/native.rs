//! Native platform: real HTTP fetches, downloads written to a directory.
//!
//! There is no document here, so frames are registered by the host and posted
//! messages are handed to a channel the host drains (the CLI prints them).

use super::{Blob, FetchResponse, FrameHandle, ListenerTarget, PlatformApi, PostedMessage};
use crate::host::PageLocation;
use crate::{Error, Result};
use futures::future::BoxFuture;
use log::{debug, info};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// Configuration for [`NativePlatform`]
#[derive(Debug, Clone)]
pub struct NativeConfig {
    /// Directory downloads are written into (created on demand)
    pub output_dir: PathBuf,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// User agent sent with fetches
    pub user_agent: String,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            timeout_ms: 30000,
            user_agent: concat!("mockup-bridge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

pub struct NativePlatform {
    client: Client,
    config: NativeConfig,
    location: PageLocation,
    frames: Mutex<HashMap<String, String>>,
    outbox: mpsc::UnboundedSender<PostedMessage>,
}

impl NativePlatform {
    /// Build the platform and the receiver that gets every posted message.
    pub fn new(
        config: NativeConfig,
        location: PageLocation,
    ) -> Result<(Self, mpsc::UnboundedReceiver<PostedMessage>)> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Other(format!("Failed to build HTTP client: {}", e)))?;
        let (outbox, rx) = mpsc::unbounded_channel();
        Ok((
            Self {
                client,
                config,
                location,
                frames: Mutex::new(HashMap::new()),
                outbox,
            },
            rx,
        ))
    }

    /// Make a frame known to the platform
    pub fn register_frame(&self, id: &str, src: &str) {
        self.frames
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id.to_string(), src.to_string());
    }
}

/// Resolve `filename` inside `dir`, refusing anything that is not a plain file
/// name.
fn download_target(dir: &Path, filename: &str) -> Result<PathBuf> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => Ok(dir.join(name)),
        _ => Err(Error::Download(format!(
            "refusing to write outside the output directory: {:?}",
            filename
        ))),
    }
}

impl PlatformApi for NativePlatform {
    fn find_frame(&self, id: &str) -> Option<FrameHandle> {
        self.frames
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(id)
            .map(|src| FrameHandle {
                id: id.to_string(),
                src: src.clone(),
            })
    }

    fn reload_frame(&self, frame: &FrameHandle) {
        debug!("reload requested for frame '{}' ({})", frame.id, frame.src);
    }

    fn add_event_listener(&self, target: ListenerTarget) {
        debug!("listening for {:?}", target);
    }

    fn location(&self) -> PageLocation {
        self.location.clone()
    }

    fn post_message(
        &self,
        frame: &FrameHandle,
        payload: &Value,
        target_origin: &str,
    ) -> Result<()> {
        self.outbox
            .send(PostedMessage {
                frame_id: frame.id.clone(),
                target_origin: target_origin.to_string(),
                payload: payload.clone(),
            })
            .map_err(|_| Error::PostMessage(format!("frame '{}' is gone", frame.id)))
    }

    fn fetch(&self, url: String) -> BoxFuture<'_, Result<FetchResponse>> {
        Box::pin(async move {
            let res = self
                .client
                .get(&url)
                .header(USER_AGENT, self.config.user_agent.as_str())
                .send()
                .await?;
            let status = res.status().as_u16();
            let content_type = res
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = res.bytes().await?.to_vec();
            debug!("fetched {} ({} bytes, HTTP {})", url, body.len(), status);
            Ok(FetchResponse {
                status,
                content_type,
                body,
            })
        })
    }

    fn trigger_download(&self, blob: Blob, filename: String) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let path = download_target(&self.config.output_dir, &filename)?;
            tokio::fs::create_dir_all(&self.config.output_dir).await?;
            tokio::fs::write(&path, &blob.bytes).await?;
            info!("saved {} ({} bytes)", path.display(), blob.bytes.len());
            Ok(())
        })
    }
}
