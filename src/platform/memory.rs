//! In-memory platform that records every call.
//!
//! Frames, the page location and fetch responses are scripted up front; the
//! recorded listeners, reloads, posted messages and downloads can be inspected
//! afterwards. Useful for tests and for hosts that drive the bridge from their
//! own event loop.

use super::{Blob, FetchResponse, FrameHandle, ListenerTarget, PlatformApi, PostedMessage};
use crate::host::PageLocation;
use crate::{Error, Result};
use futures::future::{self, BoxFuture};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// A download handed to the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRecord {
    pub filename: String,
    pub blob: Blob,
}

#[derive(Default)]
struct MemoryState {
    frames: HashMap<String, String>,
    detached: HashSet<String>,
    location: PageLocation,
    responses: HashMap<String, FetchResponse>,
    listeners: Vec<ListenerTarget>,
    reloads: Vec<String>,
    posted: Vec<PostedMessage>,
    fetched: Vec<String>,
    downloads: Vec<DownloadRecord>,
}

/// Scriptable, recording [`PlatformApi`] implementation
#[derive(Default)]
pub struct MemoryPlatform {
    state: Mutex<MemoryState>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a frame element with the given id and `src`
    pub fn with_frame(self, id: &str, src: &str) -> Self {
        self.state().frames.insert(id.to_string(), src.to_string());
        self
    }

    pub fn with_location(self, location: PageLocation) -> Self {
        self.state().location = location;
        self
    }

    /// Script the response for `url`. Unscripted URLs fail at the network level.
    pub fn with_response(self, url: &str, response: FetchResponse) -> Self {
        self.state().responses.insert(url.to_string(), response);
        self
    }

    /// Change a frame's `src` after construction
    pub fn set_frame_src(&self, id: &str, src: &str) {
        self.state().frames.insert(id.to_string(), src.to_string());
    }

    /// Simulate a frame whose content window is gone
    pub fn detach_frame(&self, id: &str) {
        self.state().detached.insert(id.to_string());
    }

    pub fn listeners(&self) -> Vec<ListenerTarget> {
        self.state().listeners.clone()
    }

    pub fn reloads(&self) -> Vec<String> {
        self.state().reloads.clone()
    }

    pub fn posted(&self) -> Vec<PostedMessage> {
        self.state().posted.clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.state().fetched.clone()
    }

    pub fn downloads(&self) -> Vec<DownloadRecord> {
        self.state().downloads.clone()
    }
}

impl PlatformApi for MemoryPlatform {
    fn find_frame(&self, id: &str) -> Option<FrameHandle> {
        self.state().frames.get(id).map(|src| FrameHandle {
            id: id.to_string(),
            src: src.clone(),
        })
    }

    fn reload_frame(&self, frame: &FrameHandle) {
        self.state().reloads.push(frame.id.clone());
    }

    fn add_event_listener(&self, target: ListenerTarget) {
        self.state().listeners.push(target);
    }

    fn location(&self) -> PageLocation {
        self.state().location.clone()
    }

    fn post_message(
        &self,
        frame: &FrameHandle,
        payload: &Value,
        target_origin: &str,
    ) -> Result<()> {
        let mut state = self.state();
        if state.detached.contains(&frame.id) {
            return Err(Error::PostMessage(format!(
                "frame '{}' has no content window",
                frame.id
            )));
        }
        state.posted.push(PostedMessage {
            frame_id: frame.id.clone(),
            target_origin: target_origin.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }

    fn fetch(&self, url: String) -> BoxFuture<'_, Result<FetchResponse>> {
        let mut state = self.state();
        state.fetched.push(url.clone());
        let res = state
            .responses
            .get(&url)
            .cloned()
            .ok_or_else(|| Error::Network(format!("no route to {}", url)));
        Box::pin(future::ready(res))
    }

    fn trigger_download(&self, blob: Blob, filename: String) -> BoxFuture<'_, Result<()>> {
        self.state().downloads.push(DownloadRecord { filename, blob });
        Box::pin(future::ready(Ok(())))
    }
}
