//! A single browser tab, driven over its own WebSocket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use crate::cdp::error::CdpError;
use crate::cdp::protocol::{CdpRequest, CdpResponse, PageInfo};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Guard timeout for an individual command round-trip.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// How often `document.readyState` is polled during navigation.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct PendingRequest {
    tx: oneshot::Sender<Result<Value, CdpError>>,
}

/// One tab of the remote browser.
///
/// Commands are correlated to responses through the pending-request map;
/// the background task resolves them as frames arrive. Events carry no
/// request id and are ignored by this client, which polls page state instead.
#[derive(Debug)]
pub struct CdpPage {
    target_id: String,
    http_endpoint: String,
    http: reqwest::Client,
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    request_id: Arc<AtomicU64>,
    current_url: String,
    _recv_task: tokio::task::JoinHandle<()>,
}

impl CdpPage {
    pub(crate) async fn connect(http_endpoint: String, info: PageInfo) -> Result<Self, CdpError> {
        let ws_url = info.web_socket_debugger_url.ok_or_else(|| {
            CdpError::InvalidResponse(format!("tab {} has no webSocketDebuggerUrl", info.id))
        })?;

        let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url.as_str())
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let pending: Arc<Mutex<HashMap<u64, PendingRequest>>> = Arc::new(Mutex::new(HashMap::new()));

        let recv_task = {
            let pending = pending.clone();
            tokio::spawn(async move {
                Self::receive_loop(ws_source, pending).await;
            })
        };

        debug!("Attached to tab {} via {}", info.id, ws_url);

        Ok(Self {
            target_id: info.id,
            http_endpoint,
            http: reqwest::Client::new(),
            ws_tx: Arc::new(tokio::sync::Mutex::new(ws_sink)),
            pending,
            request_id: Arc::new(AtomicU64::new(1)),
            current_url: info.url,
            _recv_task: recv_task,
        })
    }

    async fn receive_loop(mut ws_source: WsSource, pending: Arc<Mutex<HashMap<u64, PendingRequest>>>) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => {
                            if let Some(id) = resp.id {
                                let pending_req = pending.lock().unwrap().remove(&id);
                                if let Some(req) = pending_req {
                                    let result = if let Some(err) = resp.error {
                                        Err(CdpError::Protocol {
                                            code: err.code,
                                            message: err.message,
                                        })
                                    } else {
                                        Ok(resp.result.unwrap_or(Value::Null))
                                    };
                                    let _ = req.tx.send(result);
                                }
                            }
                            // Frames with a method field are unsolicited
                            // events; this client does not subscribe to any.
                        }
                        Err(e) => {
                            warn!("Failed to parse CDP message: {}", e);
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        // Resolve anything still waiting so callers see SessionClosed
        // instead of hanging until the guard timeout.
        let mut pending = pending.lock().unwrap();
        for (_, req) in pending.drain() {
            let _ = req.tx.send(Err(CdpError::SessionClosed));
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    pub(crate) fn set_current_url(&mut self, url: &str) {
        self.current_url = url.to_string();
    }

    /// Send a command and wait for its response.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, PendingRequest { tx });

        {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into())).await?;
        }

        match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().unwrap().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }

    /// Evaluate a JavaScript expression in the page, returning its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["text"].as_str().unwrap_or("Unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    /// Start a navigation without waiting for the load to settle.
    pub(crate) async fn begin_navigation(&self, url: &str) -> Result<(), CdpError> {
        let result = self.call("Page.navigate", Some(json!({"url": url}))).await?;

        if let Some(error) = result.get("errorText").and_then(|e| e.as_str())
            && !error.is_empty()
        {
            return Err(CdpError::NavigationFailed(error.to_string()));
        }
        Ok(())
    }

    /// Poll until the document settles. The caller bounds this with the
    /// navigation timeout.
    pub(crate) async fn wait_for_ready(&self) -> Result<(), CdpError> {
        loop {
            let result = self.evaluate("document.readyState").await?;
            if let Some(state) = result.as_str()
                && state == "complete"
            {
                return Ok(());
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// Close the tab through the discovery endpoint.
    pub async fn close_tab(&self) -> Result<(), CdpError> {
        let url = format!("{}/json/close/{}", self.http_endpoint, self.target_id);
        self.http.get(&url).send().await?.error_for_status()?;
        debug!("Closed tab {}", self.target_id);
        Ok(())
    }
}
