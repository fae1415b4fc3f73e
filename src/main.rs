use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::stream;
use log::{error, warn};
use mockup_bridge::platform::{NativeConfig, NativePlatform};
use mockup_bridge::{
    result_channel, resolve_location_host, Bridge, BridgeEvent, BridgeOptions, HandshakePayload,
    InitConfig, Mode, OriginPolicy, PageLocation, ResultSink,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "mockup-bridge", version, about = "Drive a mockup editor frame bridge from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct PageArgs {
    /// Host of the embedding page (empty when the page is itself embedded)
    #[arg(long, default_value = "")]
    page_host: String,
    /// Ancestor origins of the embedding page, nearest first
    #[arg(long = "ancestor-origin")]
    ancestor_origins: Vec<String>,
}

impl PageArgs {
    fn location(&self) -> PageLocation {
        PageLocation {
            host: self.page_host.clone(),
            ancestor_origins: self.ancestor_origins.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the handshake payload a frame would receive on load
    Handshake {
        /// JSON file holding the init config
        #[arg(long)]
        config: PathBuf,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Run a bridge over JSON-lines events read from stdin
    Session {
        #[arg(long)]
        config: PathBuf,
        /// `src` of the editor frame
        #[arg(long)]
        frame_src: String,
        #[arg(long, default_value = "mockup-editor")]
        frame_id: String,
        /// download | custom
        #[arg(long, default_value = "download")]
        mode: Mode,
        /// Directory downloads are written into
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Accept export messages from any origin
        #[arg(long)]
        any_origin: bool,
        /// Concurrent downloads per export (0 = unbounded)
        #[arg(long, default_value_t = 0)]
        concurrency: usize,
        /// Buffered custom-mode results
        #[arg(long, default_value_t = 16)]
        buffer: usize,
        #[arg(long, default_value_t = 30000)]
        timeout_ms: u64,
        #[command(flatten)]
        page: PageArgs,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn handshake(config: &Path, page: &PageArgs) -> anyhow::Result<()> {
    let config: InitConfig = read_json(config)?;
    config.validate()?;
    let host = resolve_location_host(&page.location());
    let payload = HandshakePayload::new(&config, host).to_value();
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

/// Read events from stdin, one JSON object per line. Malformed lines are
/// skipped.
fn stdin_events() -> impl futures::Stream<Item = BridgeEvent> {
    let lines = BufReader::new(tokio::io::stdin()).lines();
    stream::unfold(lines, |mut lines| async move {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<BridgeEvent>(&line) {
                        Ok(event) => return Some((event, lines)),
                        Err(e) => warn!("skipping malformed event line: {}", e),
                    }
                }
                Ok(None) => return None,
                Err(e) => {
                    error!("failed to read stdin: {}", e);
                    return None;
                }
            }
        }
    })
}

#[allow(clippy::too_many_arguments)]
async fn session(
    config: &Path,
    frame_src: String,
    frame_id: String,
    mode: Mode,
    out: PathBuf,
    any_origin: bool,
    concurrency: usize,
    buffer: usize,
    timeout_ms: u64,
    page: PageArgs,
) -> anyhow::Result<()> {
    let config: InitConfig = read_json(config)?;

    let native = NativeConfig {
        output_dir: out,
        timeout_ms,
        ..Default::default()
    };
    let (platform, mut outbox) = NativePlatform::new(native, page.location())?;
    platform.register_frame(&frame_id, &frame_src);

    let (sender, mut results) = result_channel(buffer);
    let sink = (mode == Mode::Custom).then(|| ResultSink::Channel(sender));
    let options = BridgeOptions {
        origin_policy: if any_origin {
            OriginPolicy::Any
        } else {
            OriginPolicy::FrameOrigin
        },
        max_concurrent_downloads: concurrency,
        ..Default::default()
    };
    let bridge = Bridge::initialize(Arc::new(platform), &frame_id, config, mode, sink, options)?;

    let printer = tokio::spawn(async move {
        let mut outbox_open = true;
        let mut results_open = true;
        while outbox_open || results_open {
            tokio::select! {
                msg = outbox.recv(), if outbox_open => match msg {
                    Some(msg) => println!("{}", json!({ "posted": msg })),
                    None => outbox_open = false,
                },
                res = results.recv(), if results_open => match res {
                    Some(res) => println!("{}", json!({ "export": res })),
                    None => results_open = false,
                },
            }
        }
    });

    bridge.run(stdin_events()).await;
    drop(bridge);
    printer.await.context("output task failed")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Handshake { config, page } => handshake(&config, &page),
        Command::Session {
            config,
            frame_src,
            frame_id,
            mode,
            out,
            any_origin,
            concurrency,
            buffer,
            timeout_ms,
            page,
        } => {
            session(
                &config,
                frame_src,
                frame_id,
                mode,
                out,
                any_origin,
                concurrency,
                buffer,
                timeout_ms,
                page,
            )
            .await
        }
    }
}
