//! End-to-end tests against a real listener on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use trellis_core::{handler, Context, Fault};
use trellis_middleware::{AccessLog, LoggerBuilder, MiddlewareBuilder, RecoveryBuilder};
use trellis_server::{Engine, EngineConfig, ServerError, ShutdownSignal};

type HttpClient = Client<HttpConnector, Full<Bytes>>;

struct Running {
    addr: SocketAddr,
    shutdown: ShutdownSignal,
    task: JoinHandle<Result<(), ServerError>>,
}

impl Running {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server should stop")
            .expect("server task should not panic")
            .expect("server should stop cleanly");
    }
}

async fn serve(config: EngineConfig, routes: impl FnOnce(&mut Engine)) -> Running {
    let (tx, rx) = oneshot::channel();
    let mut engine = Engine::builder()
        .config(config)
        .on_bound(move |listener: &TcpListener| {
            let _ = tx.send(listener.local_addr().unwrap());
        })
        .build();
    routes(&mut engine);

    let shutdown = ShutdownSignal::new();
    let task = tokio::spawn(engine.start_with_shutdown("127.0.0.1:0", shutdown.clone()));
    let addr = rx.await.expect("listener should bind");

    Running {
        addr,
        shutdown,
        task,
    }
}

fn client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build_http()
}

async fn send(
    client: &HttpClient,
    method: Method,
    url: &str,
    body: &'static str,
) -> (StatusCode, HeaderMap, String) {
    let request = Request::builder()
        .method(method)
        .uri(url)
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap();
    let response = client.request(request).await.expect("request should succeed");
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Order {
    sku: String,
    quantity: u32,
}

#[tokio::test]
async fn routes_resolve_over_http() {
    let server = serve(EngineConfig::default(), |engine| {
        engine
            .get(
                "/user/:id",
                [handler(|ctx: &mut Context| {
                    let id = ctx.param("id").unwrap_or_default().to_string();
                    ctx.string(StatusCode::OK, format!("user {id}"))
                })],
            )
            .post(
                "/order/*",
                [handler(|ctx: &mut Context| ctx.string(StatusCode::OK, "any order"))],
            )
            .post(
                "/order/detail",
                [handler(|ctx: &mut Context| {
                    let order: Order = ctx.bind_json()?;
                    ctx.json(StatusCode::CREATED, &order)
                })],
            );
    })
    .await;
    let client = client();

    let (status, _, body) = send(&client, Method::GET, &server.url("/user/42"), "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "user 42");

    let (status, _, body) = send(&client, Method::GET, &server.url("/user"), "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "404 NOT FOUND");

    let (_, _, body) = send(&client, Method::POST, &server.url("/order/anything"), "").await;
    assert_eq!(body, "any order");

    let (status, headers, body) = send(
        &client,
        Method::POST,
        &server.url("/order/detail"),
        r#"{"sku":"A-1","quantity":3}"#,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(headers["content-type"], "application/json");
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(
        order,
        Order {
            sku: "A-1".to_string(),
            quantity: 3
        }
    );

    let (status, _, _) = send(&client, Method::DELETE, &server.url("/user/42"), "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn recovery_and_logging_over_http() {
    let entries = Arc::new(Mutex::new(Vec::<AccessLog>::new()));
    let sink = Arc::clone(&entries);

    let server = serve(EngineConfig::default(), move |engine| {
        engine.use_middleware([
            LoggerBuilder::new()
                .sink(move |entry: &AccessLog| sink.lock().push(entry.clone()))
                .build(),
            RecoveryBuilder::new().sink(|_: &str| {}).build(),
        ]);
        let mut api = engine.group("/api");
        api.get(
            "/reports/:year",
            [handler(|_: &mut Context| Err(Fault::msg("report store offline")))],
        );
    })
    .await;
    let client = client();

    let (status, _, body) =
        send(&client, Method::GET, &server.url("/api/reports/2024"), "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Internal Server Error");

    server.stop().await;

    let entries = entries.lock();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].route, "/api/reports/:year");
    assert_eq!(entries[0].path, "/api/reports/2024");
    assert_eq!(entries[0].status, 500);
}

#[tokio::test]
async fn unrecovered_fault_closes_connection() {
    let server = serve(EngineConfig::default(), |engine| {
        engine
            .get("/boom", [handler(|_: &mut Context| Err(Fault::msg("boom")))])
            .get(
                "/fine",
                [handler(|ctx: &mut Context| ctx.string(StatusCode::OK, "fine"))],
            );
    })
    .await;
    let client = client();

    let request = Request::get(server.url("/boom"))
        .body(Full::new(Bytes::new()))
        .unwrap();
    assert!(client.request(request).await.is_err());

    // the server keeps serving other connections
    let (status, _, body) = send(&client, Method::GET, &server.url("/fine"), "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "fine");

    server.stop().await;
}

#[tokio::test]
async fn oversized_body_is_rejected_before_dispatch() {
    let reached = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&reached);

    let config = EngineConfig::builder().max_body_bytes(16).build();
    let server = serve(config, move |engine| {
        engine.post(
            "/upload",
            [handler(move |ctx: &mut Context| {
                *flag.lock() = true;
                ctx.string(StatusCode::OK, "stored")
            })],
        );
    })
    .await;
    let client = client();

    let (status, _, body) = send(
        &client,
        Method::POST,
        &server.url("/upload"),
        "this body is definitely longer than sixteen bytes",
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body, "413 PAYLOAD TOO LARGE");
    assert!(!*reached.lock());

    let (status, _, body) = send(&client, Method::POST, &server.url("/upload"), "small").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "stored");

    server.stop().await;
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let server = serve(EngineConfig::default(), |engine| {
        engine.get(
            "/",
            [handler(|ctx: &mut Context| ctx.string(StatusCode::OK, "root"))],
        );
    })
    .await;
    let addr = server.addr;

    let (status, _, _) = send(&client(), Method::GET, &server.url("/"), "").await;
    assert_eq!(status, StatusCode::OK);

    server.stop().await;
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn in_flight_request_completes_during_shutdown() {
    let config = EngineConfig::builder()
        .shutdown_timeout(Duration::from_secs(5))
        .build();
    let server = serve(config, |engine| {
        engine.get(
            "/slow",
            [handler(|ctx: &mut Context| {
                std::thread::sleep(Duration::from_millis(200));
                ctx.string(StatusCode::OK, "done")
            })],
        );
    })
    .await;

    let url = server.url("/slow");
    let request = tokio::spawn(async move { send(&client(), Method::GET, &url, "").await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    server.stop().await;

    let (status, _, body) = request.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "done");
}

#[tokio::test]
async fn start_reports_bind_failure() {
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = occupied.local_addr().unwrap().to_string();

    let err = Engine::new().start(&addr).await.unwrap_err();
    assert!(matches!(err, ServerError::Bind { .. }), "{err}");
}
