//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::{http::Request, Json, Router};
use futures_util::StreamExt;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};

use service_gateway::config::{MappingConfig, PolicyConfig, SelectionStrategy};
use service_gateway::lifecycle::Shutdown;
use service_gateway::mapping::SharedMappings;
use service_gateway::stats::CallStatistics;
use service_gateway::{GatewayConfig, HttpServer};

/// A gateway running on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub statistics: Arc<CallStatistics>,
    pub mappings: Arc<SharedMappings>,
    pub updates: mpsc::UnboundedSender<GatewayConfig>,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Wait until the statistics have seen `count` calls.
    pub async fn wait_for_calls(&self, count: u64) {
        for _ in 0..100 {
            if self.statistics.snapshot().count >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "expected {} recorded calls, saw {}",
            count,
            self.statistics.snapshot().count
        );
    }
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    start_server(HttpServer::new(config)).await
}

pub async fn start_server(server: HttpServer) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();

    let gateway = TestGateway {
        addr,
        statistics: server.statistics(),
        mappings: server.mappings(),
        updates,
        shutdown: shutdown.clone(),
    };

    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });
    gateway
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Mapping rule with round-robin selection and no policies.
pub fn mapping(prefix: &str, urls: &[String]) -> MappingConfig {
    MappingConfig {
        prefix: prefix.to_string(),
        container_id: format!("container{}", prefix.replace('/', "-")),
        version: "1.0".to_string(),
        service_id: prefix.trim_matches('/').to_string(),
        urls: urls.to_vec(),
        rewrite_headers: false,
        strategy: SelectionStrategy::RoundRobin,
        sticky_header: None,
        discovery: None,
        policies: Vec::<PolicyConfig>::new(),
    }
}

pub fn config_with(mappings: Vec<MappingConfig>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.mappings = mappings;
    config
}

/// A port nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Start a backend that answers every request with a JSON description of it.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(echo);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn echo(request: Request<Body>) -> Json<Value> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let headers: Map<String, Value> = parts
        .headers
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_str().unwrap_or("").to_string())))
        .collect();
    Json(json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "headers": headers,
        "body": String::from_utf8_lossy(&bytes),
    }))
}

/// Start a backend that reports each request body chunk on the returned
/// channel as soon as it arrives, and answers with the total size.
pub async fn start_reporting_backend() -> (SocketAddr, mpsc::UnboundedReceiver<Bytes>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (report, received) = mpsc::unbounded_channel();
    let app = Router::new().fallback(report_chunks).with_state(report);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, received)
}

async fn report_chunks(State(report): State<mpsc::UnboundedSender<Bytes>>, request: Request<Body>) -> String {
    let mut chunks = request.into_body().into_data_stream();
    let mut total = 0;
    while let Some(Ok(chunk)) = chunks.next().await {
        total += chunk.len();
        let _ = report.send(chunk);
    }
    format!("received {} bytes", total)
}

/// Read until the end of the request head.
async fn read_request_head(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

/// Start a backend that writes `response` verbatim to every connection.
pub async fn start_raw_backend(response: String) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = Arc::new(response);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let response = response.clone();
            tokio::spawn(async move {
                read_request_head(&mut socket).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
                tokio::time::sleep(Duration::from_millis(10)).await;
            });
        }
    });
    addr
}

/// Start a backend that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// Start a chunked backend that sends `first`, waits for the returned
/// trigger, then sends `second` and finishes.
pub async fn start_gated_backend(first: &'static str, second: &'static str) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (release, gate) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            read_request_head(&mut socket).await;
            let head = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n";
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(chunk(first).as_bytes()).await;
            let _ = socket.flush().await;
            let _ = gate.await;
            let _ = socket.write_all(chunk(second).as_bytes()).await;
            let _ = socket.write_all(b"0\r\n\r\n").await;
            let _ = socket.shutdown().await;
        }
    });
    (addr, release)
}

/// Start a chunked backend that sends one chunk and then drops the connection.
pub async fn start_truncating_backend(first: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request_head(&mut socket).await;
                let head = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n";
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(chunk(first).as_bytes()).await;
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_millis(50)).await;
                drop(socket);
            });
        }
    });
    addr
}

fn chunk(data: &str) -> String {
    format!("{:x}\r\n{}\r\n", data.len(), data)
}
