//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use tunnel_gateway::proxy::ProxyGate;
use tunnel_gateway::routing::{Handler, HttpRequest, HttpResponse, RequestMultiplexer};
use tunnel_gateway::transport::{
    host_name, request_host, RoundTripper, TransportError, TunnelTransport,
};
use tunnel_gateway::{GatewayConfig, GatewayServer};

type Responder = Arc<dyn Fn(HttpRequest) -> HttpResponse + Send + Sync>;

/// In-process tunnel transport with programmable tenant responders.
pub struct MockTransport {
    host: String,
    tenants: DashMap<String, Responder>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new(host: &str) -> Arc<Self> {
        Arc::new(Self {
            host: host.to_string(),
            tenants: DashMap::new(),
        })
    }

    /// Register a tenant whose backend is a plain function of the request.
    pub fn add_tenant<F>(&self, name: &str, responder: F)
    where
        F: Fn(HttpRequest) -> HttpResponse + Send + Sync + 'static,
    {
        self.tenants.insert(name.to_string(), Arc::new(responder));
    }

    /// Drop a tenant, simulating its agent disconnecting.
    pub fn remove_tenant(&self, name: &str) {
        self.tenants.remove(name);
    }
}

struct MockRoundTripper(Responder);

impl RoundTripper for MockRoundTripper {
    fn round_trip(
        &self,
        req: HttpRequest,
    ) -> BoxFuture<'static, Result<HttpResponse, TransportError>> {
        let f = self.0.clone();
        Box::pin(async move { Ok(f(req)) })
    }
}

impl TunnelTransport for MockTransport {
    fn is_upgrade_request(&self, req: &HttpRequest) -> bool {
        req.headers().contains_key(header::UPGRADE)
    }

    fn is_root_external(&self, req: &HttpRequest) -> bool {
        request_host(req)
            .map(|h| host_name(h).eq_ignore_ascii_case(host_name(&self.host)))
            .unwrap_or(false)
    }

    fn lookup(&self, tenant_id: &str) -> bool {
        self.tenants.contains_key(tenant_id)
    }

    fn round_tripper(&self, tenant_id: &str) -> Option<Arc<dyn RoundTripper>> {
        let responder = self.tenants.get(tenant_id)?.clone();
        Some(Arc::new(MockRoundTripper(responder)))
    }

    fn ingress(&self) -> Handler {
        Arc::new(|_req| {
            Box::pin(async {
                ([("x-served-by", "ingress")], "ingress").into_response()
            })
        })
    }

    fn upgrader(&self) -> Handler {
        Arc::new(|_req| {
            Box::pin(async {
                ([("x-served-by", "upgrade")], "upgrade").into_response()
            })
        })
    }
}

/// Gate that claims every CONNECT request and marks its responses.
pub struct MockGate;

impl ProxyGate for MockGate {
    fn is_proxy_request(&self, req: &HttpRequest) -> bool {
        req.method() == Method::CONNECT
    }

    fn handler(&self) -> Handler {
        Arc::new(|_req| {
            Box::pin(async {
                ([("x-served-by", "proxy")], "proxy").into_response()
            })
        })
    }
}

pub const TEST_HOST: &str = "gw.example";

#[allow(dead_code)]
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.host = TEST_HOST.to_string();
    config
}

/// Assemble a gateway router around the mock transport and gate.
#[allow(dead_code)]
pub fn gateway(config: GatewayConfig, transport: Arc<MockTransport>) -> Router {
    gateway_with_mux(config, transport, RequestMultiplexer::new())
}

#[allow(dead_code)]
pub fn gateway_with_mux(
    config: GatewayConfig,
    transport: Arc<MockTransport>,
    mux: RequestMultiplexer,
) -> Router {
    GatewayServer::new(config, transport, Arc::new(MockGate), mux).router()
}

/// Tenant responder echoing `<tenant>:<path>` so tests can tell handlers apart.
#[allow(dead_code)]
pub fn echo_tenant(name: &'static str) -> impl Fn(HttpRequest) -> HttpResponse + Send + Sync {
    move |req: HttpRequest| {
        (
            StatusCode::OK,
            format!("{name}:{}", req.uri().path()),
        )
            .into_response()
    }
}

#[allow(dead_code)]
pub fn get(host: &str, path: &str) -> HttpRequest {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .header(header::HOST, host)
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub fn get_with_cookie(host: &str, path: &str, cookie: &str) -> HttpRequest {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .header(header::HOST, host)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_string(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// All Set-Cookie values on a response, as strings.
#[allow(dead_code)]
pub fn set_cookies(resp: &Response) -> Vec<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Start a simple mock backend that returns a fixed response.
#[allow(dead_code)]
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = socket.read(&mut buf).await;
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}
