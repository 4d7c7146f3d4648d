#![allow(dead_code)]

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use deepscan::vendor::{VendorConfig, VendorFactory, VendorKind};
use deepscan::{Detector, RunMode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

pub const BOUNDARY: &str = "deepscan-test-boundary";

/// One request observed by the fake vendor.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub api_key: Option<String>,
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedCall {
    pub fn body_contains(&self, needle: &str) -> bool {
        self.body
            .windows(needle.len())
            .any(|window| window == needle.as_bytes())
    }
}

#[derive(Clone)]
struct VendorState {
    responses: Arc<HashMap<String, (u16, Value)>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

/// An in-process vendor API answering each path with a canned JSON body.
pub struct FakeVendor {
    pub base_url: Url,
    state: VendorState,
    handle: ServerHandle,
}

impl FakeVendor {
    pub async fn start(responses: &[(&str, u16, Value)]) -> Self {
        Self::start_under("", responses).await
    }

    /// Serves the canned responses below `prefix`, e.g. `/api/v2`.
    pub async fn start_under(prefix: &str, responses: &[(&str, u16, Value)]) -> Self {
        let state = VendorState {
            responses: Arc::new(
                responses
                    .iter()
                    .map(|(path, status, body)| (format!("{prefix}{path}"), (*status, body.clone())))
                    .collect(),
            ),
            calls: Arc::new(Mutex::new(Vec::new())),
        };

        let data = web::Data::new(state.clone());
        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .app_data(web::PayloadConfig::new(128 * 1024 * 1024))
                .default_service(web::to(respond))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind fake vendor");

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        let base_url = Url::parse(&format!("http://{addr}{prefix}")).unwrap();
        Self {
            base_url,
            state,
            handle,
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.calls.lock().unwrap().len()
    }

    pub fn config(&self, kind: VendorKind) -> VendorConfig {
        VendorConfig::new(kind, self.base_url.clone())
    }

    pub fn detector(&self, kind: VendorKind, run_mode: RunMode) -> Detector {
        let factory = VendorFactory::new(reqwest::Client::new(), self.config(kind))
            .with_verifier(self.config(VendorKind::DeepAi));
        Detector::new(Arc::new(factory), run_mode)
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

async fn respond(req: HttpRequest, body: web::Bytes, state: web::Data<VendorState>) -> HttpResponse {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.calls.lock().unwrap().push(RecordedCall {
        method: req.method().to_string(),
        path: req.path().to_string(),
        api_key: header("api-key"),
        authorization: header("authorization"),
        body: body.to_vec(),
    });

    match state.responses.get(req.path()) {
        Some((status, payload)) => {
            HttpResponse::build(StatusCode::from_u16(*status).unwrap()).json(payload)
        }
        None => HttpResponse::NotFound().json(json!({"message": "no such endpoint"})),
    }
}

/// A port nothing listens on.
pub fn unreachable_base_url() -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}")).unwrap()
}

pub enum FormPart<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

/// Encodes a `multipart/form-data` body, returning the content-type header
/// value alongside it.
pub fn multipart_body(parts: &[FormPart<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            FormPart::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            FormPart::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub fn hive_success(class: &str, confidence: f64) -> Value {
    json!({
        "status": "success",
        "results": [{"class": class, "confidence": confidence}],
        "processing_time": 0.42,
        "model_version": "hive-deepfake-2"
    })
}
