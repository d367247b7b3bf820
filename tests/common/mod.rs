// Shared test helpers: fake metrics backend, payload builders, wired-up sessions

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use cloudboard::backend_repo::{BackendRepo, ResourceContext};
use cloudboard::models::ConnectorStatus;
use cloudboard::session::{Session, StaticToken, UserInfo};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_TOKEN: &str = "test-token";

/// `{metrics:[{timeseries:[{data:[...]}]}]}` with one entry per `(time_stamp, average)`.
pub fn azure_body(points: &[(String, Option<f64>)]) -> Value {
    let data: Vec<Value> = points
        .iter()
        .map(|(ts, avg)| match avg {
            Some(v) => json!({ "time_stamp": ts, "average": v }),
            None => json!({ "time_stamp": ts }),
        })
        .collect();
    json!({ "metrics": [{ "timeseries": [{ "data": data }] }] })
}

pub fn ts(minute: u32) -> String {
    format!("2025-09-01T10:{:02}:00Z", minute)
}

/// What the fake backend saw.
#[derive(Clone, Default)]
pub struct Recorder {
    pub calls: Arc<AtomicUsize>,
    pub bodies: Arc<Mutex<Vec<(String, Value)>>>,
    /// Artificial latency per metric name, in ms.
    pub delays: Arc<Mutex<Vec<(String, u64)>>>,
    pub fail_metric: Arc<Mutex<Option<String>>>,
}

impl Recorder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn bodies_for(&self, path: &str) -> Vec<Value> {
        self.bodies
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, b)| b.clone())
            .collect()
    }

    pub fn delay(&self, metric: &str, ms: u64) {
        self.delays.lock().unwrap().push((metric.to_string(), ms));
    }

    pub fn fail(&self, metric: &str) {
        *self.fail_metric.lock().unwrap() = Some(metric.to_string());
    }

    /// Drops configured delays and failures.
    pub fn reset(&self) {
        self.delays.lock().unwrap().clear();
        *self.fail_metric.lock().unwrap() = None;
    }

    fn should_fail(&self, metric: &str) -> bool {
        self.fail_metric.lock().unwrap().as_deref() == Some(metric)
    }

    fn record(&self, path: &str, body: &Value) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .lock()
            .unwrap()
            .push((path.to_string(), body.clone()));
    }

    fn delay_for(&self, metric: &str) -> Option<u64> {
        self.delays
            .lock()
            .unwrap()
            .iter()
            .find(|(m, _)| m == metric)
            .map(|(_, ms)| *ms)
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TEST_TOKEN))
}

async fn metric_response(rec: &Recorder, path: &str, headers: &HeaderMap, body: Value) -> Response {
    if !authorized(headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    rec.record(path, &body);
    let metric = body
        .get("metric_name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    // Decided on arrival so a slow request keeps its outcome if the test reconfigures meanwhile.
    let fail = rec.should_fail(&metric);
    if let Some(ms) = rec.delay_for(&metric) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
    if fail {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let value = match metric.as_str() {
        "Availability" => 99.95,
        "SuccessE2ELatency" => 180.0,
        "OS Disk Read Bytes/sec" => 1024.0,
        "OS Disk Write Bytes/sec" => 2048.0,
        _ => 10.0,
    };
    Json(azure_body(&[
        (ts(0), Some(value - 1.0)),
        (ts(1), None),
        (ts(2), Some(value)),
    ]))
    .into_response()
}

async fn storage_metrics(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    metric_response(&rec, "/api/azure/storage-metrics", &headers, body).await
}

async fn vm_metrics(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    metric_response(&rec, "/api/azure/vm-metrics", &headers, body).await
}

async fn aws_metrics(
    State(rec): State<Recorder>,
    Path(instance_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    rec.record(&format!("/api/aws/metrics/{}", instance_id), &body);
    Json(json!({
        "Datapoints": [
            { "Timestamp": "2025-09-01T10:10:00Z", "Average": 30.0, "Unit": "Percent" },
            { "Timestamp": "2025-09-01T10:05:00Z", "Average": 20.0, "Unit": "Percent" },
        ]
    }))
    .into_response()
}

async fn aws_instances(State(rec): State<Recorder>) -> Response {
    rec.record("/api/aws/instances", &Value::Null);
    Json(json!([
        { "InstanceId": "i-0first", "State": "running", "Name": "web" },
        { "InstanceId": "i-0second", "State": "stopped" },
    ]))
    .into_response()
}

async fn billing(State(rec): State<Recorder>, Json(body): Json<Value>) -> Response {
    rec.record("/api/billing", &body);
    Json(json!({
        "ResultsByTime": [{
            "TimePeriod": { "Start": "2025-09-01", "End": "2025-09-02" },
            "Groups": [
                { "Keys": ["Amazon EC2"], "Metrics": { "UnblendedCost": { "Amount": "12.5", "Unit": "USD" } } },
                { "Keys": ["AWS Lambda"], "Metrics": { "UnblendedCost": { "Amount": "0", "Unit": "USD" } } },
                { "Keys": ["Amazon S3"], "Metrics": { "UnblendedCost": { "Amount": "oops", "Unit": "USD" } } },
            ]
        }]
    }))
    .into_response()
}

async fn connector_status(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({ "aws": false, "azure": true })).into_response()
}

async fn connect(
    State(rec): State<Recorder>,
    Path(provider): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    rec.record(&format!("/api/connectors/{}", provider), &body);
    Json(json!({ "status": "connected" })).into_response()
}

/// Scaling and firewall actions; `rec.fail("scale")` / `rec.fail("firewall")` makes them 500.
async fn aws_control(
    rec: &Recorder,
    path: &str,
    action: &str,
    headers: &HeaderMap,
    body: Value,
) -> Response {
    if !authorized(headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    rec.record(path, &body);
    if rec.should_fail(action) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(json!({ "msg": format!("{} applied", action) })).into_response()
}

async fn aws_scale(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    aws_control(&rec, "/api/aws/scale", "scale", &headers, body).await
}

async fn aws_firewall(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    aws_control(&rec, "/api/aws/security/firewall", "firewall", &headers, body).await
}

pub fn fake_backend_router(rec: Recorder) -> Router {
    Router::new()
        .route("/api/azure/storage-metrics", post(storage_metrics))
        .route("/api/azure/vm-metrics", post(vm_metrics))
        .route("/api/aws/metrics/{instance_id}", post(aws_metrics))
        .route("/api/aws/instances", get(aws_instances))
        .route("/api/billing", post(billing))
        .route("/api/connectors/status", get(connector_status))
        .route("/api/connectors/{provider}", post(connect))
        .route("/api/aws/scale", post(aws_scale))
        .route("/api/aws/security/firewall", post(aws_firewall))
        .with_state(rec)
}

/// Serves `router` on an ephemeral local port; returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}

pub async fn spawn_fake_backend() -> (String, Recorder) {
    let rec = Recorder::default();
    let base_url = serve(fake_backend_router(rec.clone())).await;
    (base_url, rec)
}

pub fn repo(base_url: &str) -> Arc<BackendRepo> {
    repo_with_timeout(base_url, 2000)
}

pub fn repo_with_timeout(base_url: &str, timeout_ms: u64) -> Arc<BackendRepo> {
    Arc::new(BackendRepo::new(base_url, Duration::from_millis(timeout_ms)).unwrap())
}

pub fn resources() -> ResourceContext {
    ResourceContext {
        resource_group: "rg-test".into(),
        storage_account: "satest".into(),
        vm_name: "vm-test".into(),
        aws_instance_id: None,
        billing_start: Some("2025-09-01".into()),
        billing_end: Some("2025-09-30".into()),
    }
}

pub async fn signed_in_session(connectors: ConnectorStatus) -> Arc<Session> {
    let session = Arc::new(Session::new(Arc::new(StaticToken::new(TEST_TOKEN))));
    session
        .start(UserInfo {
            uid: "tester".into(),
            display_name: Some("Test User".into()),
        })
        .await;
    session.set_connectors(connectors).await;
    session
}

pub fn both_connected() -> ConnectorStatus {
    ConnectorStatus {
        aws: true,
        azure: true,
    }
}

/// Polls `check` every 10 ms until it holds or `timeout_ms` passes.
pub async fn wait_until<F, Fut>(timeout_ms: u64, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check().await
}
