//! The frame bridge: config handshake on `load`, export dispatch on `message`.
//!
//! A [`Bridge`] is created by [`Bridge::initialize`], which registers exactly
//! one frame `load` listener and one window `message` listener on the
//! platform. The host then feeds the matching events into
//! [`Bridge::dispatch`] (or [`Bridge::run`]). Each event is handled to
//! completion before the next one; downloads for a single export message run
//! concurrently.

use crate::host::{normalize_origin, origin_of, resolve_location_host};
use crate::message::{ExportResult, HandshakePayload, InitConfig, MockupExport, Mode};
use crate::platform::{FrameHandle, ListenerTarget, PlatformApi};
use crate::sink::ResultSink;
use crate::{Error, Result};
use futures::{pin_mut, stream, Stream, StreamExt};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Which senders may deliver export messages
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OriginPolicy {
    /// Only the origin of the frame's current `src`
    #[default]
    FrameOrigin,
    /// Only the listed origins
    AllowList(Vec<String>),
    /// Any sender
    Any,
}

/// Bridge behaviour knobs
///
/// # Examples
///
/// ```
/// let opts = mockup_bridge::BridgeOptions::default();
/// assert_eq!(opts.variation_filename(0), "Variation 1.webp");
/// ```
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Sender filter applied before a message is inspected
    pub origin_policy: OriginPolicy,
    /// Concurrent fetches per export message (0 => unbounded)
    pub max_concurrent_downloads: usize,
    /// Downloaded files are named `<prefix> <1-based index>.<extension>`
    pub download_label_prefix: String,
    /// Extension of downloaded files, without the dot
    pub download_extension: String,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            origin_policy: OriginPolicy::FrameOrigin,
            max_concurrent_downloads: 0,
            download_label_prefix: "Variation".to_string(),
            download_extension: "webp".to_string(),
        }
    }
}

impl BridgeOptions {
    /// File name for the export at `index` (0-based)
    pub fn variation_filename(&self, index: usize) -> String {
        format!(
            "{} {}.{}",
            self.download_label_prefix,
            index + 1,
            self.download_extension
        )
    }
}

/// A cross-document message as seen by the window listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Serialized origin of the sender
    pub origin: String,
    pub data: Value,
}

impl MessageEvent {
    pub fn new(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }
}

/// Events routed to a bridge by its host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum BridgeEvent {
    /// The frame finished loading
    Load,
    /// A window `message` event
    Message(MessageEvent),
}

/// Per-message download summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    /// `(index, filename)` of saved variations, by index
    pub saved: Vec<(usize, String)>,
    /// Indices whose fetch or save failed
    pub failed: Vec<usize>,
}

/// What the message listener did with one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Sender origin not allowed
    Rejected,
    /// Not an export message (or a malformed one)
    Ignored,
    Downloaded(DownloadReport),
    /// Handed to the result sink
    Delivered,
    /// Custom mode without a sink
    Dropped,
}

/// Bridge between the hosting page and one embedded editor frame
pub struct Bridge<P: PlatformApi> {
    platform: Arc<P>,
    frame: FrameHandle,
    config: InitConfig,
    mode: Mode,
    sink: Option<ResultSink>,
    options: BridgeOptions,
}

impl<P: PlatformApi> Bridge<P> {
    /// Wire a bridge to the frame `frame_id`.
    ///
    /// Fails without touching the platform when the config is invalid or the
    /// frame does not exist. On success the frame has been asked to reload and
    /// both listeners are registered.
    pub fn initialize(
        platform: Arc<P>,
        frame_id: &str,
        config: InitConfig,
        mode: Mode,
        sink: Option<ResultSink>,
        options: BridgeOptions,
    ) -> Result<Self> {
        config.validate()?;

        let Some(frame) = platform.find_frame(frame_id) else {
            let err = Error::MissingFrame(frame_id.to_string());
            error!("{}", err);
            return Err(err);
        };

        platform.reload_frame(&frame);
        platform.add_event_listener(ListenerTarget::FrameLoad(frame.id.clone()));
        platform.add_event_listener(ListenerTarget::WindowMessage);

        if mode == Mode::Custom && sink.is_none() {
            debug!(
                "bridge for '{}' runs in custom mode without a result sink; exports will be dropped",
                frame.id
            );
        }

        Ok(Self {
            platform,
            frame,
            config,
            mode,
            sink,
            options,
        })
    }

    pub fn frame_id(&self) -> &str {
        &self.frame.id
    }

    // The frame's src may change after initialization; always read it fresh.
    fn current_frame(&self) -> FrameHandle {
        self.platform
            .find_frame(&self.frame.id)
            .unwrap_or_else(|| self.frame.clone())
    }

    /// Handshake for one `load` event. Returns whether the payload was posted.
    pub fn handle_load(&self) -> bool {
        let frame = self.current_frame();
        let target_origin = match origin_of(&frame.src) {
            Ok(origin) => origin,
            Err(e) => {
                error!("cannot target frame '{}': {}", frame.id, e);
                return false;
            }
        };

        let location_host = resolve_location_host(&self.platform.location());
        let payload = HandshakePayload::new(&self.config, location_host).to_value();

        match self.platform.post_message(&frame, &payload, &target_origin) {
            Ok(()) => {
                info!("sent init config to frame '{}' ({})", frame.id, target_origin);
                true
            }
            Err(e) => {
                warn!("handshake with frame '{}' skipped: {}", frame.id, e);
                false
            }
        }
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        match &self.options.origin_policy {
            OriginPolicy::Any => true,
            OriginPolicy::FrameOrigin => origin_of(&self.current_frame().src)
                .map(|expected| expected == normalize_origin(origin))
                .unwrap_or(false),
            OriginPolicy::AllowList(allowed) => {
                let origin = normalize_origin(origin);
                allowed.iter().any(|a| normalize_origin(a) == origin)
            }
        }
    }

    /// Handle one window `message` event.
    pub async fn handle_message(&self, event: MessageEvent) -> MessageOutcome {
        if !self.origin_allowed(&event.origin) {
            debug!("ignoring message from disallowed origin {:?}", event.origin);
            return MessageOutcome::Rejected;
        }

        let Some(result) = ExportResult::from_message(&event.data) else {
            return MessageOutcome::Ignored;
        };

        match self.mode {
            Mode::Download => {
                let exports = result.mockups_export();
                if exports.is_empty() {
                    warn!("mockupsExport from {} is not a list; nothing to download", event.origin);
                }
                MessageOutcome::Downloaded(self.download_all(&exports).await)
            }
            Mode::Custom => match &self.sink {
                Some(sink) => {
                    sink.deliver(result).await;
                    MessageOutcome::Delivered
                }
                None => MessageOutcome::Dropped,
            },
        }
    }

    async fn download_one(&self, item: &MockupExport<'_>) -> Result<String> {
        let Some(url) = item.export_path.map(str::to_string) else {
            return Err(Error::Download(format!(
                "entry {} has no export_path: {}",
                item.index, item.raw
            )));
        };
        let response = self.platform.fetch(url.clone()).await?;
        if !response.is_success() {
            return Err(Error::Fetch {
                url,
                status: response.status,
            });
        }
        let filename = self.options.variation_filename(item.index);
        self.platform
            .trigger_download(response.into_blob(), filename.clone())
            .await?;
        Ok(filename)
    }

    async fn download_all(&self, exports: &[MockupExport<'_>]) -> DownloadReport {
        let limit = match self.options.max_concurrent_downloads {
            0 => exports.len().max(1),
            n => n,
        };

        let results: Vec<(usize, Result<String>)> = stream::iter(exports)
            .map(|item| async move { (item.index, self.download_one(item).await) })
            .buffer_unordered(limit)
            .collect()
            .await;

        let mut report = DownloadReport::default();
        for (index, res) in results {
            match res {
                Ok(filename) => report.saved.push((index, filename)),
                Err(e) => {
                    error!("Error downloading the image: {}", e);
                    report.failed.push(index);
                }
            }
        }
        report.saved.sort();
        report.failed.sort_unstable();
        report
    }

    /// Route one event to its handler
    pub async fn dispatch(&self, event: BridgeEvent) {
        match event {
            BridgeEvent::Load => {
                self.handle_load();
            }
            BridgeEvent::Message(msg) => {
                let outcome = self.handle_message(msg).await;
                debug!("message outcome for '{}': {:?}", self.frame.id, outcome);
            }
        }
    }

    /// Handle events until the source ends.
    pub async fn run<S>(&self, events: S)
    where
        S: Stream<Item = BridgeEvent>,
    {
        pin_mut!(events);
        while let Some(event) = events.next().await {
            self.dispatch(event).await;
        }
        debug!("event source for frame '{}' closed", self.frame.id);
    }
}
