//! Common test utilities

use async_trait::async_trait;
use futures::StreamExt;
use pulsecast::config::Config;
use pulsecast::models::{Insight, Stats};
use pulsecast::relay::RelayServer;
use pulsecast::source::{InsightSource, SourceError, SourceResult};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub type ViewerStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What the scripted source answers with
#[derive(Debug, Clone)]
pub enum Script {
    Insights(Vec<Insight>),
    Fail(String),
}

/// In-memory source whose answer can be changed between cycles
pub struct ScriptedSource {
    script: Mutex<Script>,
    stats: Value,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            stats: serde_json::json!({"papers": 12, "repos": 3}),
            fetches: AtomicUsize::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn set(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }

    #[allow(dead_code)]
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InsightSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn latest_insights(&self) -> SourceResult<Vec<Insight>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().clone() {
            Script::Insights(insights) => Ok(insights),
            Script::Fail(reason) => Err(SourceError::Unavailable(reason)),
        }
    }

    async fn stats(&self) -> SourceResult<Stats> {
        Ok(Stats(self.stats.clone()))
    }
}

/// Create an insight with a title and a summary field
pub fn insight(title: &str) -> Insight {
    Insight::new(title).with_field("summary", format!("Summary of {title}"))
}

/// Config for tests: fast pacing, timer far enough away to never fire
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.enable_request_logging = false;
    config.scan.interval_ms = 3_600_000;
    config.scan.initial_delay_ms = 3_600_000;
    config.scan.pacing_ms = 50;
    config
}

/// A relay running on an ephemeral port
pub struct TestRelay {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<pulsecast::error::Result<()>>,
}

impl TestRelay {
    pub async fn start(config: Config, source: Arc<dyn InsightSource>) -> Self {
        let server = RelayServer::new(config, source).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            server
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await
        });

        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Connect a viewer and consume its welcome message
    #[allow(dead_code)]
    pub async fn connect_viewer(&self) -> ViewerStream {
        let (mut stream, _) = tokio_tungstenite::connect_async(self.ws_url()).await.unwrap();
        let welcome = next_envelope(&mut stream).await;
        assert_eq!(welcome["type"], "system");
        stream
    }

    #[allow(dead_code)]
    pub async fn trigger(&self) -> Value {
        let response = reqwest::Client::new()
            .post(self.url("/api/scan/trigger"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

/// Next text frame from a viewer, parsed as JSON
pub async fn next_envelope(stream: &mut ViewerStream) -> Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("transport error");

        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}
