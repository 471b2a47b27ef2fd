//! JSON-over-HTTP inference collaborator.
//!
//! Posts `{"landmarks": [[63 floats], ...]}` for a window, or
//! `{"landmarks": [63 floats]}` for a single frame, and returns the response body
//! as raw JSON.

use super::{InferenceClient, InferenceError, InferenceFuture};
use crate::core_modules::landmark::FlattenedVector;
use crate::{Error, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct SequenceRequest<'a> {
    landmarks: Vec<&'a [f32]>,
}

#[derive(Serialize)]
struct FrameRequest<'a> {
    landmarks: &'a [f32],
}

#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    client: Client,
    endpoint: String,
}

impl HttpInferenceClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post<B: Serialize>(&self, body: &B) -> std::result::Result<Value, InferenceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            debug!(endpoint = %self.endpoint, %status, "inference service rejected request");
            return Err(InferenceError::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| InferenceError::Decode(e.to_string()))
    }
}

fn classify(error: reqwest::Error) -> InferenceError {
    if error.is_timeout() {
        InferenceError::Timeout
    } else {
        InferenceError::Transport(error.to_string())
    }
}

impl InferenceClient for HttpInferenceClient {
    fn predict_sequence(&self, frames: Vec<FlattenedVector>) -> InferenceFuture<'_> {
        Box::pin(async move {
            let body = SequenceRequest {
                landmarks: frames.iter().map(|f| f.as_slice()).collect(),
            };
            self.post(&body).await
        })
    }

    fn predict_frame(&self, frame: FlattenedVector) -> InferenceFuture<'_> {
        Box::pin(async move {
            let body = FrameRequest { landmarks: &frame };
            self.post(&body).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves exactly one HTTP response and hands back the raw request it received.
    async fn one_shot_server(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.expect("read");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\
                 Connection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.expect("write");
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{}/predict", addr), handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(split) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..split]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= split + 4 + content_length
    }

    #[tokio::test]
    async fn posts_window_and_returns_payload() {
        let (endpoint, server) = one_shot_server(
            "HTTP/1.1 200 OK",
            concat!(
                r#"{"prediction":"A","confidence":0.9,"accuracy":0.1,"#,
                r#""probabilities":{},"inferenceTimeMs":4}"#
            ),
        )
        .await;
        let client = HttpInferenceClient::new(endpoint, Duration::from_secs(2)).expect("client");

        let payload = client
            .predict_sequence(vec![[0.5; 63], [0.25; 63]])
            .await
            .expect("payload");

        assert_eq!(payload["prediction"], "A");
        let request = server.await.expect("server task");
        assert!(request.starts_with("POST /predict"));
        let body = &request[request.find("\r\n\r\n").expect("body") + 4..];
        let sent: Value = serde_json::from_str(body).expect("json body");
        let rows = sent["landmarks"].as_array().expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].as_array().map(|r| r.len()), Some(63));
    }

    #[tokio::test]
    async fn single_frame_body_is_flat() {
        let (endpoint, server) =
            one_shot_server("HTTP/1.1 200 OK", r#"{"prediction":"B","confidence":0.4}"#).await;
        let client = HttpInferenceClient::new(endpoint, Duration::from_secs(2)).expect("client");

        client.predict_frame([1.0; 63]).await.expect("payload");

        let request = server.await.expect("server task");
        let body = &request[request.find("\r\n\r\n").expect("body") + 4..];
        let sent: Value = serde_json::from_str(body).expect("json body");
        assert_eq!(sent["landmarks"].as_array().map(|r| r.len()), Some(63));
        assert_eq!(sent["landmarks"][0], 1.0);
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let (endpoint, _server) =
            one_shot_server("HTTP/1.1 500 Internal Server Error", r#"{"detail":"boom"}"#).await;
        let client = HttpInferenceClient::new(endpoint, Duration::from_secs(2)).expect("client");

        let error = client.predict_frame([0.0; 63]).await.expect_err("500");
        assert_eq!(error, InferenceError::Status(500));
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let (endpoint, _server) = one_shot_server("HTTP/1.1 200 OK", "not json").await;
        let client = HttpInferenceClient::new(endpoint, Duration::from_secs(2)).expect("client");

        let error = client.predict_frame([0.0; 63]).await.expect_err("decode");
        assert!(matches!(error, InferenceError::Decode(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let client =
            HttpInferenceClient::new("http://127.0.0.1:1/predict", Duration::from_millis(500))
                .expect("client");

        let error = client.predict_frame([0.0; 63]).await.expect_err("refused");
        assert!(matches!(error, InferenceError::Transport(_) | InferenceError::Timeout));
    }
}
