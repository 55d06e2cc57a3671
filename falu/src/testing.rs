//! Test doubles for the realtime channel and console output.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::realtime::{
    ChannelError, ChannelMessage, CloseCode, Frame, Inbound, MessageHandler, Transport,
};

/// What a [`ScriptedTransport`] was asked to do
#[derive(Debug, Clone, Default)]
pub struct TransportLog {
    inner: Arc<Mutex<TransportLogInner>>,
}

#[derive(Debug, Default)]
struct TransportLogInner {
    sent: Vec<Vec<u8>>,
    closes: Vec<(CloseCode, String)>,
    received: usize,
}

impl TransportLog {
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Sent payloads decoded as JSON
    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent()
            .iter()
            .map(|payload| serde_json::from_slice(payload).unwrap())
            .collect()
    }

    pub fn closes(&self) -> Vec<(CloseCode, String)> {
        self.inner.lock().unwrap().closes.clone()
    }

    /// Number of inbound items handed to the channel
    pub fn received(&self) -> usize {
        self.inner.lock().unwrap().received
    }
}

/// In-memory transport replaying a fixed script of inbound items.
///
/// Once the script is drained `receive` either reports end of stream or,
/// with [`ScriptedTransport::hang_when_drained`], waits forever so tests can
/// exercise cancellation.
pub struct ScriptedTransport {
    script: VecDeque<Inbound>,
    hang_when_drained: bool,
    log: TransportLog,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Inbound>) -> Self {
        Self {
            script: script.into_iter().collect(),
            hang_when_drained: false,
            log: TransportLog::default(),
        }
    }

    /// Complete binary frames carrying the given JSON values
    pub fn from_json(values: impl IntoIterator<Item = serde_json::Value>) -> Self {
        Self::new(
            values
                .into_iter()
                .map(|v| Inbound::Frame(Frame::complete(serde_json::to_vec(&v).unwrap()))),
        )
    }

    pub fn hang_when_drained(mut self) -> Self {
        self.hang_when_drained = true;
        self
    }

    pub fn log(&self) -> TransportLog {
        self.log.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, payload: Vec<u8>) -> Result<(), ChannelError> {
        self.log.inner.lock().unwrap().sent.push(payload);
        Ok(())
    }

    async fn receive(&mut self) -> Result<Option<Inbound>, ChannelError> {
        match self.script.pop_front() {
            Some(inbound) => {
                self.log.inner.lock().unwrap().received += 1;
                Ok(Some(inbound))
            }
            None if self.hang_when_drained => std::future::pending().await,
            None => Ok(None),
        }
    }

    async fn close(&mut self, code: CloseCode, reason: &str) -> Result<(), ChannelError> {
        self.log
            .inner
            .lock()
            .unwrap()
            .closes
            .push((code, reason.to_string()));
        Ok(())
    }
}

/// Cloneable in-memory writer for capturing console output
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock().unwrap()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Handler that records every message and optionally fails on each one
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub messages: Vec<ChannelMessage>,
    pub fail: bool,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            messages: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn handle(
        &mut self,
        message: ChannelMessage,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        self.messages.push(message);
        if self.fail {
            anyhow::bail!("handler failure");
        }
        Ok(())
    }
}
