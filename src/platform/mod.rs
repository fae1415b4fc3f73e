//! Platform capability surface: frame lookup, listeners, messaging, fetch and
//! downloads.
//!
//! The bridge never touches a document directly; everything it needs from the
//! hosting environment goes through [`PlatformApi`]. Two implementations ship with
//! the crate: [`memory::MemoryPlatform`] (scriptable, records every call) and
//! `native::NativePlatform` (HTTP fetches, downloads written to disk).

pub mod memory;
#[cfg(feature = "native")]
pub mod native;

pub use memory::MemoryPlatform;
#[cfg(feature = "native")]
pub use native::{NativeConfig, NativePlatform};

use crate::host::PageLocation;
use crate::Result;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A frame element found in the hosting document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHandle {
    pub id: String,
    /// Current `src` of the frame
    pub src: String,
}

/// Event sources the bridge subscribes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerTarget {
    /// `load` events of the frame with this id
    FrameLoad(String),
    /// Process-wide `message` events
    WindowMessage,
}

/// Binary payload handed to the download sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Response of a platform fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: Some("image/webp".to_string()),
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: Vec::new(),
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn into_blob(self) -> Blob {
        Blob {
            bytes: self.body,
            content_type: self.content_type,
        }
    }
}

/// A message posted into a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostedMessage {
    pub frame_id: String,
    pub target_origin: String,
    pub payload: Value,
}

/// Capabilities the bridge needs from its host environment.
///
/// Implementations are shared behind an `Arc` and may be called from
/// concurrent download futures, hence `Send + Sync`.
pub trait PlatformApi: Send + Sync {
    /// Look up a frame element by id
    fn find_frame(&self, id: &str) -> Option<FrameHandle>;

    /// Force the frame to load again (reassign its `src` to itself) so a fresh
    /// `load` event fires even if it already loaded
    fn reload_frame(&self, frame: &FrameHandle);

    /// Subscribe the bridge to an event source
    fn add_event_listener(&self, target: ListenerTarget);

    /// Location of the hosting page
    fn location(&self) -> PageLocation;

    /// Post `payload` to the frame's content window, scoped to `target_origin`
    fn post_message(&self, frame: &FrameHandle, payload: &Value, target_origin: &str)
        -> Result<()>;

    /// Fetch a URL. Non-2xx statuses are returned, not turned into errors.
    fn fetch(&self, url: String) -> BoxFuture<'_, Result<FetchResponse>>;

    /// Save a blob under `filename` (the browser's save-file behaviour)
    fn trigger_download(&self, blob: Blob, filename: String) -> BoxFuture<'_, Result<()>>;
}
