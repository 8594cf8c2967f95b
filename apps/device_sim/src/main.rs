use std::{collections::BTreeMap, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde_json::Value;
use shared::{
    domain::{ChannelIntensity, ChannelName, DeviceSnapshot, PowerState},
    protocol::{DeviceStatus, WriteAck, CONFIG_PATH, STATUS_PATH},
};
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rshn-device-sim")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,
    /// Delay added before every response.
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,
}

struct SimState {
    device: Mutex<DeviceSnapshot>,
    latency: Duration,
}

impl SimState {
    fn new(latency: Duration) -> Self {
        Self {
            device: Mutex::new(DeviceSnapshot::default()),
            latency,
        }
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let app = build_router(Arc::new(SimState::new(Duration::from_millis(
        args.latency_ms,
    ))));

    info!(addr = %args.bind, latency_ms = args.latency_ms, "device simulator listening");
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<SimState>) -> Router {
    Router::new()
        .route(STATUS_PATH, get(read_status).post(toggle_power))
        .route(CONFIG_PATH, post(write_config))
        .with_state(state)
}

async fn read_status(State(state): State<Arc<SimState>>) -> Json<DeviceStatus> {
    state.delay().await;
    let device = state.device.lock().await;
    Json(DeviceStatus::from_snapshot(&device))
}

async fn toggle_power(State(state): State<Arc<SimState>>) -> Json<DeviceStatus> {
    state.delay().await;
    let mut device = state.device.lock().await;
    let power = if device.power.is_on() {
        PowerState::Off
    } else {
        PowerState::On
    };
    *device = device.merged(power, &BTreeMap::new());
    info!(%power, "power toggled");
    Json(DeviceStatus::from_snapshot(&device))
}

/// Accepts a JSON object of channel keys to values. Unknown keys and values
/// outside `0..=255` reject the whole request with `success: false`.
async fn write_config(
    State(state): State<Arc<SimState>>,
    Json(payload): Json<BTreeMap<String, Value>>,
) -> Result<Json<WriteAck>, StatusCode> {
    state.delay().await;
    let mut updates = BTreeMap::new();
    for (key, value) in &payload {
        let Some(channel) = ChannelName::ALL.iter().find(|c| c.wire_key() == key.as_str()) else {
            warn!(%key, "unknown channel in config write");
            return Ok(Json(WriteAck { success: false }));
        };
        let Some(intensity) = value
            .as_i64()
            .and_then(|raw| ChannelIntensity::try_from(raw).ok())
        else {
            warn!(%key, %value, "channel value out of range");
            return Ok(Json(WriteAck { success: false }));
        };
        updates.insert(channel.wire_key().to_string(), intensity);
    }
    if updates.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut device = state.device.lock().await;
    *device = device.merged(device.power, &updates);
    info!(?updates, "channels updated");
    Ok(Json(WriteAck { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use serde_json::json;
    use tower::ServiceExt;

    fn test_app() -> Router {
        build_router(Arc::new(SimState::new(Duration::ZERO)))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn starts_off_with_all_channels_dark() {
        let response = test_app()
            .oneshot(Request::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "status": "OFF",
                "channels": {"blue": 0, "cold": 0, "green": 0, "red": 0, "warm": 0}
            })
        );
    }

    #[tokio::test]
    async fn toggle_flips_power_and_config_updates_one_channel() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(
                Request::post("/")
                    .header("content-type", "application/json")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("toggle");
        assert_eq!(body_json(response).await["status"], json!("ON"));

        let response = app
            .clone()
            .oneshot(post_json("/config", json!({"cold": 200})))
            .await
            .expect("config");
        assert_eq!(body_json(response).await, json!({"success": true}));

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("status");
        let status = body_json(response).await;
        assert_eq!(status["status"], json!("ON"));
        assert_eq!(status["channels"]["cold"], json!(200));
        assert_eq!(status["channels"]["red"], json!(0));
    }

    #[tokio::test]
    async fn config_rejects_unknown_channels_and_out_of_range_values() {
        let app = test_app();

        for payload in [json!({"uv": 3}), json!({"red": 256}), json!({"red": -1})] {
            let response = app
                .clone()
                .oneshot(post_json("/config", payload))
                .await
                .expect("config");
            assert_eq!(body_json(response).await, json!({"success": false}));
        }

        let response = app
            .clone()
            .oneshot(post_json("/config", json!({})))
            .await
            .expect("config");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("status");
        assert_eq!(body_json(response).await["channels"]["red"], json!(0));
    }
}
