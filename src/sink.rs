//! Custom-mode result delivery: a plain callback or a bounded, ordered stream.

use crate::message::ExportResult;
use futures::Stream;
use log::debug;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

pub type ExportCallback = Arc<dyn Fn(&ExportResult) + Send + Sync>;

/// Where custom-mode export results go
#[derive(Clone)]
pub enum ResultSink {
    /// Invoked once per qualifying message
    Callback(ExportCallback),
    /// Sending half of [`result_channel`]
    Channel(ExportSender),
}

impl ResultSink {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&ExportResult) + Send + Sync + 'static,
    {
        ResultSink::Callback(Arc::new(f))
    }

    /// Deliver one result. Waits for room when the channel is full.
    pub(crate) async fn deliver(&self, result: ExportResult) {
        match self {
            ResultSink::Callback(cb) => cb(&result),
            ResultSink::Channel(tx) => tx.send(result).await,
        }
    }
}

impl std::fmt::Debug for ResultSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultSink::Callback(_) => f.write_str("ResultSink::Callback"),
            ResultSink::Channel(_) => f.write_str("ResultSink::Channel"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportSender {
    tx: mpsc::Sender<ExportResult>,
}

impl ExportSender {
    async fn send(&self, result: ExportResult) {
        if self.tx.send(result).await.is_err() {
            debug!("export stream dropped; discarding result");
        }
    }
}

/// Receiving half of [`result_channel`].
///
/// Yields results in arrival order and ends once every sender (i.e. the
/// bridge) is gone.
#[derive(Debug)]
pub struct ExportStream {
    rx: mpsc::Receiver<ExportResult>,
}

impl ExportStream {
    pub async fn recv(&mut self) -> Option<ExportResult> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ExportResult> {
        self.rx.try_recv().ok()
    }
}

impl Stream for ExportStream {
    type Item = ExportResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Bounded result channel. A `capacity` of 0 is treated as 1.
pub fn result_channel(capacity: usize) -> (ExportSender, ExportStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ExportSender { tx }, ExportStream { rx })
}
