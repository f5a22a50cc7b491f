//! JSON-lines transport over stdout.
//!
//! Every outbound item is one line: tab deliveries, UI broadcasts and replies
//! to inbound requests. A single writer task owns stdout so lines never
//! interleave.

use async_trait::async_trait;
use gallery_core::{Response, TabId, TabMessage, UiEvent};
use gallery_engine::{Transport, TransportError};
use gallery_logging::{gallery_debug, gallery_error};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Serialize)]
#[serde(tag = "to", rename_all = "lowercase")]
enum Outbound<'a> {
    Tab { tab: TabId, message: &'a TabMessage },
    Ui { event: &'a UiEvent },
}

#[derive(Serialize)]
struct Reply<'a> {
    id: &'a Value,
    response: &'a Response,
}

#[derive(Debug, Clone)]
pub struct StdioTransport {
    lines: mpsc::UnboundedSender<String>,
}

impl StdioTransport {
    /// Start the writer task. It ends once every transport clone is dropped.
    pub fn spawn<W>(mut writer: W) -> (Self, JoinHandle<()>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (lines, mut rx) = mpsc::unbounded_channel::<String>();
        let task = tokio::spawn(async move {
            while let Some(mut line) = rx.recv().await {
                line.push('\n');
                let written = async {
                    writer.write_all(line.as_bytes()).await?;
                    writer.flush().await
                };
                if let Err(err) = written.await {
                    gallery_error!("Failed to write to stdout: {}", err);
                    break;
                }
            }
        });
        (Self { lines }, task)
    }

    pub fn reply(&self, id: &Value, response: &Response) -> Result<(), TransportError> {
        self.write(&Reply { id, response })
    }

    fn write<T: Serialize>(&self, item: &T) -> Result<(), TransportError> {
        let line = serde_json::to_string(item)
            .map_err(|err| TransportError::Closed(format!("could not encode line: {err}")))?;
        self.lines
            .send(line)
            .map_err(|_| TransportError::Closed("stdout writer stopped".to_string()))
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send_to_tab(&self, tab: TabId, message: TabMessage) -> Result<(), TransportError> {
        gallery_debug!("-> tab {}", tab);
        self.write(&Outbound::Tab {
            tab,
            message: &message,
        })
    }

    fn broadcast(&self, event: UiEvent) -> Result<(), TransportError> {
        self.write(&Outbound::Ui { event: &event })
    }
}
