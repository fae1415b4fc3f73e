//! Mockup Bridge
//!
//! Host-side bridge for an embedded mockup editor frame. On every frame `load`
//! the bridge posts its init configuration (plus the page's `locationHost`)
//! into the frame; export results coming back over the window message channel
//! are either downloaded or handed to caller logic.
//!
//! # Features
//!
//! - **Injected platform**: all document, messaging, fetch and download access
//!   goes through [`platform::PlatformApi`], so the bridge runs the same against
//!   a browser shim, the in-memory [`platform::MemoryPlatform`] or the
//!   HTTP-backed `NativePlatform` (feature `native`, default)
//! - **Origin filtering**: export messages are accepted only from the frame's
//!   origin unless configured otherwise ([`OriginPolicy`])
//! - **Result streams**: custom-mode results can go to a callback or a bounded,
//!   ordered [`ExportStream`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mockup_bridge::platform::{FetchResponse, MemoryPlatform};
//! use mockup_bridge::{Bridge, BridgeEvent, BridgeOptions, Flag, InitConfig, MessageEvent, Mode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let platform = Arc::new(
//!     MemoryPlatform::new()
//!         .with_frame("editor", "https://editor.example/embed")
//!         .with_response("https://cdn.example/1.webp", FetchResponse::ok(vec![0u8; 4])),
//! );
//!
//! let config = InitConfig::new("my-website-key").with_flag(Flag::ShowColorPicker, true);
//! let bridge = Bridge::initialize(
//!     platform.clone(),
//!     "editor",
//!     config,
//!     Mode::Download,
//!     None,
//!     BridgeOptions::default(),
//! )?;
//!
//! futures::executor::block_on(async {
//!     bridge.dispatch(BridgeEvent::Load).await;
//!     let data = serde_json::json!({
//!         "mockupsExport": [{ "export_label": "Front", "export_path": "https://cdn.example/1.webp" }]
//!     });
//!     bridge
//!         .dispatch(BridgeEvent::Message(MessageEvent::new("https://editor.example", data)))
//!         .await;
//! });
//!
//! assert_eq!(platform.downloads()[0].filename, "Variation 1.webp");
//! # Ok(())
//! # }
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

pub mod error;
pub use error::{Error, Result};

// Wire payloads (init config, handshake, export results)
pub mod message;

// Page location / origin helpers
pub mod host;

// Capability surface the bridge runs against
pub mod platform;

// Custom-mode result delivery
pub mod sink;

pub mod bridge;

pub use bridge::{
    Bridge, BridgeEvent, BridgeOptions, DownloadReport, MessageEvent, MessageOutcome, OriginPolicy,
};
pub use host::{resolve_location_host, PageLocation};
pub use message::{
    Artwork, ArtworkSource, ExportOptions, ExportResult, Flag, HandshakePayload, ImageFormat,
    InitConfig, MockupExport, Mode, Placement, Theme, ThemeAppearance,
};
pub use sink::{result_channel, ExportSender, ExportStream, ResultSink};
