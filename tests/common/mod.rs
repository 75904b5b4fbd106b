//! Shared test fixtures: a minimal `/localnodes` HTTP server and a
//! scriptable metadata client.
#![allow(dead_code)] // not every test binary uses every fixture

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use keyroute::error::MetadataError;
use keyroute::routing::{KeySchemaElement, KeyType, TableDescription, TableMetadata};

/// Spawn a tiny HTTP server answering `GET /localnodes[?filter]`.
///
/// `respond` maps the raw query string (empty when absent) to a node list;
/// `None` produces a 404. Returns the bound address and the accept-loop
/// handle (aborted on drop of the test).
pub async fn spawn_localnodes<F>(respond: F) -> (SocketAddr, JoinHandle<()>)
where
    F: Fn(&str) -> Option<Vec<String>> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    let respond = Arc::new(respond);

    let handle = tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let respond = respond.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let mut read = 0;
                // Read until the end of the request head.
                loop {
                    match socket.read(&mut buf[read..]).await {
                        Ok(0) => return,
                        Ok(n) => read += n,
                        Err(_) => return,
                    }
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") || read == buf.len() {
                        break;
                    }
                }
                let head = String::from_utf8_lossy(&buf[..read]);
                let query = head
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .and_then(|target| target.split_once('?').map(|(_, q)| q.to_string()))
                    .unwrap_or_default();

                let reply = match respond(&query) {
                    Some(nodes) => {
                        let body = serde_json::to_string(&nodes).expect("encode node list");
                        format!(
                            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        )
                    }
                    None => {
                        "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                            .to_string()
                    }
                };
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, handle)
}

/// Behavior of one [`ScriptedMetadata`] call.
pub enum MetadataScript {
    /// Resolve with a hash key of this name.
    HashKey(&'static str),
    /// Fail with the given error.
    Fail(MetadataError),
}

/// A metadata client that follows a per-call script and counts calls.
///
/// The script's last entry repeats once the script is exhausted.
pub struct ScriptedMetadata {
    script: Vec<MetadataScript>,
    pub calls: AtomicU32,
    /// Artificial latency per call, to hold a discovery in flight.
    pub delay_ms: u64,
}

impl ScriptedMetadata {
    pub fn new(script: Vec<MetadataScript>) -> Arc<Self> {
        Arc::new(ScriptedMetadata {
            script,
            calls: AtomicU32::new(0),
            delay_ms: 0,
        })
    }

    pub fn with_delay(script: Vec<MetadataScript>, delay_ms: u64) -> Arc<Self> {
        Arc::new(ScriptedMetadata {
            script,
            calls: AtomicU32::new(0),
            delay_ms,
        })
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TableMetadata for ScriptedMetadata {
    async fn describe_table(&self, _table: &str) -> Result<TableDescription, MetadataError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        let step = self
            .script
            .get(n)
            .or_else(|| self.script.last())
            .expect("script must not be empty");
        match step {
            MetadataScript::HashKey(name) => Ok(TableDescription {
                key_schema: vec![KeySchemaElement {
                    attribute_name: name.to_string(),
                    key_type: KeyType::Hash,
                }],
            }),
            MetadataScript::Fail(e) => Err(e.clone()),
        }
    }
}

/// Poll `probe` every few milliseconds until it returns true or the timeout
/// elapses; panics on timeout.
pub async fn wait_until(what: &str, timeout_ms: u64, mut probe: impl FnMut() -> bool) {
    let deadline = std::time::Instant::now() + std::time::Duration::from_millis(timeout_ms);
    while !probe() {
        assert!(
            std::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
}
