// ============================================================================
// TRANSFORM CLIENT — blocking HTTP exchange with bounded timeouts
// ============================================================================
//
// Transport failures (refused, timed out, garbled response) surface as
// `BackendUnavailable`; a reachable service that reports a failure surfaces
// as that failure's message. `submit` runs the exchange on a worker thread
// so a UI can keep painting while it waits — and keep its Apply trigger
// disabled until the pending handle resolves, which is what holds the
// one-request-in-flight rule.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use image::RgbaImage;

use crate::error::EditError;
use crate::io;
use crate::protocol::{EditRequest, EditResult, WireRequest, WireResponse, decode_payload};

/// Connection settings for one client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service root, e.g. `http://127.0.0.1:5000`.
    pub base_url: String,
    /// Whole-exchange deadline.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct TransformClient {
    config: ClientConfig,
    http: reqwest::blocking::Client,
}

impl TransformClient {
    pub fn new(config: ClientConfig) -> Result<Self, EditError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| {
                EditError::BackendUnavailable(format!("cannot build HTTP client: {}", e))
            })?;
        Ok(Self { config, http })
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, EditError> {
        Self::new(ClientConfig {
            base_url: base_url.into(),
            ..ClientConfig::default()
        })
    }

    /// Liveness probe, used to gate whether the edit action is offered.
    pub fn health(&self) -> Result<(), EditError> {
        let url = format!("{}/api/health", self.config.base_url);
        let resp = self.http.get(url).send().map_err(map_transport_error)?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(EditError::BackendUnavailable(format!(
                "health check returned HTTP {}",
                resp.status().as_u16()
            )))
        }
    }

    /// Run one synchronous edit exchange.
    pub fn transform(&self, request: &EditRequest) -> EditResult {
        match self.exchange(request) {
            Ok(image) => EditResult::completed(image),
            Err(e) => EditResult::failed(e),
        }
    }

    /// Fire the exchange on a worker thread and return a pollable handle.
    pub fn submit(&self, request: EditRequest) -> PendingTransform {
        let (sender, receiver) = mpsc::channel();
        let client = self.clone();
        thread::spawn(move || {
            let _ = sender.send(client.transform(&request));
        });
        PendingTransform { receiver }
    }

    fn exchange(&self, request: &EditRequest) -> Result<RgbaImage, EditError> {
        let wire = WireRequest::from_request(request)?;
        let url = format!("{}/api/transform", self.config.base_url);
        let resp = self
            .http
            .post(url)
            .json(&wire)
            .send()
            .map_err(map_transport_error)?;
        let status = resp.status();
        let body: WireResponse = resp.json().map_err(|e| {
            EditError::BackendUnavailable(format!(
                "unreadable response (HTTP {}): {}",
                status.as_u16(),
                e
            ))
        })?;

        if body.success {
            let payload = body.result.ok_or_else(|| {
                EditError::TransformFailure(
                    "service reported success without a result image".to_string(),
                )
            })?;
            io::decode_rgba(&decode_payload(&payload)?)
        } else {
            Err(EditError::TransformFailure(body.error.unwrap_or_else(|| {
                "service reported an unspecified failure".to_string()
            })))
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> EditError {
    if e.is_timeout() {
        EditError::BackendUnavailable("request timed out".to_string())
    } else if e.is_connect() {
        EditError::BackendUnavailable(format!("cannot connect: {}", e))
    } else {
        EditError::BackendUnavailable(e.to_string())
    }
}

/// An edit on the wire. Poll `try_take` each frame, or `wait` to block; the
/// presentation layer keeps its trigger disabled while a handle is live.
pub struct PendingTransform {
    receiver: mpsc::Receiver<EditResult>,
}

impl PendingTransform {
    /// Non-blocking poll; `None` while the exchange is still running.
    pub fn try_take(&self) -> Option<EditResult> {
        self.receiver.try_recv().ok()
    }

    /// Block until the exchange finishes.
    pub fn wait(self) -> EditResult {
        self.receiver.recv().unwrap_or_else(|_| {
            EditResult::failed(EditError::BackendUnavailable(
                "worker thread dropped without a result".to_string(),
            ))
        })
    }
}
