use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::SecondsFormat;
use forecast_core::{ContextFrame, PredictParams, QuantileRow};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::Mutex;

use super::ForecastModel;

/// Async Unix-socket JSON-RPC client for the model-serving sidecar.
///
/// Protocol: newline-delimited JSON, one request → one response. The single
/// connection sits behind a mutex for the whole round trip, so calls into
/// the model never overlap.
pub struct ModelSidecarClient {
    sock_path: PathBuf,
    conn: Mutex<Option<SidecarConn>>,
    next_id: AtomicU64,
}

struct SidecarConn {
    reader: BufReader<tokio::io::ReadHalf<UnixStream>>,
    writer: tokio::io::WriteHalf<UnixStream>,
}

#[derive(Debug, Serialize)]
struct RpcRequest {
    id: u64,
    method: String,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    id: u64,
    ok: bool,
    result: Option<Value>,
    error: Option<String>,
}

/// What the sidecar reports after `load_model`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoadedModel {
    pub model: String,
    #[serde(default)]
    pub device: Option<String>,
}

/// Flatten the frame into the row records the model's `predict_df` expects.
fn frame_records(frame: &ContextFrame) -> Vec<Value> {
    frame
        .records()
        .map(|r| {
            let mut row = Map::new();
            row.insert("item_id".to_string(), json!(r.item_id));
            row.insert(
                "timestamp".to_string(),
                json!(r.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)),
            );
            row.insert("target".to_string(), json!(r.target));
            for (covariate, value) in r.covariates {
                row.insert(covariate.as_str().to_string(), json!(value));
            }
            Value::Object(row)
        })
        .collect()
}

impl ModelSidecarClient {
    pub fn new(sock_path: PathBuf) -> Self {
        Self {
            sock_path,
            conn: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    async fn connect(&self) -> Result<SidecarConn> {
        let stream = UnixStream::connect(&self.sock_path)
            .await
            .with_context(|| format!("model sidecar connect failed: {}", self.sock_path.display()))?;
        let (read_half, write_half) = tokio::io::split(stream);
        Ok(SidecarConn {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        let rid = self.next_id.fetch_add(1, Ordering::Relaxed);
        let req = RpcRequest {
            id: rid,
            method: method.to_string(),
            params,
        };
        let mut line = serde_json::to_string(&req).context("model sidecar request encode failed")?;
        line.push('\n');

        let mut guard = self.conn.lock().await;

        // Take the connection out; it only goes back after a clean round trip.
        let mut conn = match guard.take() {
            Some(conn) => conn,
            None => self.connect().await?,
        };

        conn.writer
            .write_all(line.as_bytes())
            .await
            .context("model sidecar write failed")?;
        conn.writer.flush().await.context("model sidecar flush failed")?;

        let mut resp_line = String::new();
        conn.reader
            .read_line(&mut resp_line)
            .await
            .context("model sidecar read failed")?;

        if resp_line.is_empty() {
            bail!("model sidecar closed connection");
        }

        let resp: RpcResponse =
            serde_json::from_str(&resp_line).context("model sidecar response parse failed")?;

        if resp.id != rid {
            bail!("model sidecar response id mismatch (sent {rid}, got {})", resp.id);
        }

        *guard = Some(conn);

        if !resp.ok {
            bail!(resp.error.unwrap_or_else(|| "model sidecar error".to_string()));
        }

        Ok(resp.result.unwrap_or(Value::Null))
    }

    /// Ask the sidecar to load (or confirm) the pretrained model.
    pub async fn load_model(&self, model: &str, device: &str) -> Result<LoadedModel> {
        let result = self
            .rpc(
                "load_model",
                json!({
                    "model": model,
                    "device": device,
                }),
            )
            .await?;
        serde_json::from_value(result).context("model sidecar load_model result malformed")
    }

    /// Run `predict_df` over the frame and return the raw quantile rows.
    pub async fn predict_df(
        &self,
        frame: &ContextFrame,
        params: &PredictParams,
    ) -> Result<Vec<QuantileRow>> {
        let covariates: Vec<&str> = frame.covariates().iter().map(|c| c.covariate.as_str()).collect();
        let mut result = self
            .rpc(
                "predict_df",
                json!({
                    "records": frame_records(frame),
                    "prediction_length": params.prediction_length,
                    "quantile_levels": params.quantile_levels,
                    "id_column": "item_id",
                    "timestamp_column": "timestamp",
                    "target": "target",
                    "past_covariates": covariates,
                }),
            )
            .await?;

        let rows = result
            .get_mut("rows")
            .map(Value::take)
            .ok_or_else(|| anyhow!("model sidecar predict_df result has no rows"))?;
        serde_json::from_value(rows).context("model sidecar rows malformed")
    }
}

/// [`ForecastModel`] backed by the sidecar, created once `load_model` succeeds.
pub struct SidecarModel {
    client: Arc<ModelSidecarClient>,
    model_id: String,
}

impl SidecarModel {
    pub fn new(client: Arc<ModelSidecarClient>, loaded: LoadedModel) -> Self {
        Self {
            client,
            model_id: loaded.model,
        }
    }
}

#[async_trait]
impl ForecastModel for SidecarModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn predict(
        &self,
        frame: &ContextFrame,
        params: &PredictParams,
    ) -> Result<Vec<QuantileRow>> {
        self.client.predict_df(frame, params).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use forecast_core::{AlignedCovariate, Covariate, QUANTILE_LEVELS, build_context_frame};
    use tokio::net::UnixListener;

    pub(crate) fn sock_path(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "forecast-hub-test-{}-{name}.sock",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        path
    }

    /// Serve one connection, answering each request line with `reply(request)`.
    pub(crate) fn spawn_peer(
        path: &std::path::Path,
        reply: impl Fn(Value) -> Value + Send + 'static,
    ) -> tokio::task::JoinHandle<Vec<Value>> {
        let listener = UnixListener::bind(path).unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (r, mut w) = tokio::io::split(stream);
            let mut lines = BufReader::new(r).lines();
            let mut seen = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                let req: Value = serde_json::from_str(&line).unwrap();
                let mut out = serde_json::to_string(&reply(req.clone())).unwrap();
                out.push('\n');
                w.write_all(out.as_bytes()).await.unwrap();
                seen.push(req);
            }
            seen
        })
    }

    fn frame() -> ContextFrame {
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 30).unwrap();
        let covariates = vec![AlignedCovariate {
            covariate: Covariate::Rsi,
            values: vec![50.0; 15],
        }];
        build_context_frame(Some("PEPE"), &[1.0; 15], covariates, 5, now).unwrap()
    }

    fn params() -> PredictParams {
        PredictParams {
            prediction_length: 2,
            quantile_levels: QUANTILE_LEVELS,
        }
    }

    #[tokio::test]
    async fn predict_df_sends_records_and_decodes_rows() {
        let path = sock_path("predict");
        let peer = spawn_peer(&path, |req| {
            json!({
                "id": req["id"],
                "ok": true,
                "result": {"rows": [
                    {"item_id": "PEPE", "timestamp": "2025-02-01T08:10:00Z", "0.1": 0.9, "0.5": 1.0, "0.9": 1.1},
                    {"item_id": "PEPE", "timestamp": "2025-02-01T08:05:00Z", "0.1": 0.95, "0.5": 1.0, "0.9": 1.05},
                ]}
            })
        });

        let client = ModelSidecarClient::new(path.clone());
        let rows = client.predict_df(&frame(), &params()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!((rows[1].q10 - 0.95).abs() < 1e-12);

        drop(client);
        let seen = peer.await.unwrap();
        let req = &seen[0];
        assert_eq!(req["method"], "predict_df");
        assert_eq!(req["params"]["prediction_length"], 2);
        assert_eq!(req["params"]["quantile_levels"], json!([0.1, 0.5, 0.9]));
        assert_eq!(req["params"]["past_covariates"], json!(["rsi"]));
        let records = req["params"]["records"].as_array().unwrap();
        assert_eq!(records.len(), 15);
        assert_eq!(records[14]["item_id"], "PEPE");
        assert_eq!(records[14]["timestamp"], "2025-02-01T08:00:00Z");
        assert_eq!(records[14]["rsi"], 50.0);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn connection_is_reused_across_calls() {
        let path = sock_path("reuse");
        let peer = spawn_peer(&path, |req| {
            json!({"id": req["id"], "ok": true, "result": {"model": "chronos-test", "device": "cpu"}})
        });

        let client = ModelSidecarClient::new(path.clone());
        let first = client.load_model("chronos-test", "cpu").await.unwrap();
        let second = client.load_model("chronos-test", "cpu").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.model, "chronos-test");

        drop(client);
        let seen = peer.await.unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0]["params"]["device"], "cpu");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn sidecar_error_is_surfaced() {
        let path = sock_path("error");
        let _peer = spawn_peer(&path, |req| {
            json!({"id": req["id"], "ok": false, "error": "CUDA out of memory"})
        });

        let client = ModelSidecarClient::new(path.clone());
        let err = client.predict_df(&frame(), &params()).await.unwrap_err();
        assert!(err.to_string().contains("CUDA out of memory"));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn id_mismatch_is_an_error() {
        let path = sock_path("mismatch");
        let _peer = spawn_peer(&path, |_| json!({"id": 999_999, "ok": true, "result": {}}));

        let client = ModelSidecarClient::new(path.clone());
        let err = client.load_model("m", "cpu").await.unwrap_err();
        assert!(err.to_string().contains("id mismatch"));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn missing_socket_fails_to_connect() {
        let client = ModelSidecarClient::new(sock_path("absent"));
        let err = client.load_model("m", "cpu").await.unwrap_err();
        assert!(err.to_string().contains("connect failed"));
    }
}
