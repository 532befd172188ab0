//! BDD test world: owns the collaborators, the bootstrapped service, and the
//! last HTTP response for step functions.

use std::cell::RefCell;
use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header::CONTENT_TYPE};
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use tempfile::TempDir;
use tokio::runtime::Runtime;
use tower::ServiceExt;

use blotter_config::Config;

use crate::bootstrap::{BootstrapError, BootstrapServices, Service, bootstrap_with};
use crate::capabilities::Capability;
use crate::routes::{RouteGroup, default_route_groups};

use super::connector::ScriptedConnector;
use super::groups::FailingRouteGroup;
use super::reporter::RecordingLifecycleReporter;

/// Connection string handed to the scripted connector.
pub const TEST_DATABASE_URI: &str = "mongodb://records.test:27017/blotter";

/// Response captured by the last request.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub reporter: Arc<RecordingLifecycleReporter>,
    pub connector: Arc<ScriptedConnector>,
    pub config: Config,
    failing_groups: Vec<Capability>,
    service: Option<Service>,
    bootstrap_error: Option<BootstrapError>,
    response: Option<CapturedResponse>,
    pub remembered_id: Option<String>,
    _uploads: TempDir,
    runtime: Runtime,
}

impl TestWorld {
    /// Builds a development-mode world with no database configured.
    #[must_use]
    pub fn new() -> Self {
        let uploads = TempDir::new().expect("failed to create upload directory");
        let upload_dir = Utf8Path::from_path(uploads.path())
            .expect("temporary upload path was not valid UTF-8")
            .to_owned();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed to build test runtime");
        Self {
            reporter: Arc::new(RecordingLifecycleReporter::default()),
            connector: Arc::new(ScriptedConnector::default()),
            config: test_config(upload_dir),
            failing_groups: Vec::new(),
            service: None,
            bootstrap_error: None,
            response: None,
            remembered_id: None,
            _uploads: uploads,
            runtime,
        }
    }

    /// Points the service at the scripted database.
    pub fn configure_database(&mut self) {
        self.config.mongodb_uri = Some(TEST_DATABASE_URI.to_owned());
    }

    /// Makes the group serving `capability` fail to register.
    pub fn fail_group(&mut self, capability: Capability) {
        self.failing_groups.push(capability);
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.service.is_some() || self.bootstrap_error.is_some() {
            return;
        }
        let services = BootstrapServices {
            reporter: self.reporter.clone(),
            connector: self.connector.clone(),
            route_groups: self.route_groups(),
        };
        match self.runtime.block_on(bootstrap_with(&self.config, services)) {
            Ok(service) => self.service = Some(service),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    fn route_groups(&self) -> Vec<Box<dyn RouteGroup>> {
        default_route_groups()
            .into_iter()
            .map(|group| {
                if self.failing_groups.contains(&group.capability()) {
                    Box::new(FailingRouteGroup::new(group.capability(), group.mount_path()))
                        as Box<dyn RouteGroup>
                } else {
                    group
                }
            })
            .collect()
    }

    #[must_use]
    pub fn service(&self) -> Option<&Service> {
        self.service.as_ref()
    }

    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Sends a request without a body.
    pub fn get(&mut self, path: &str) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())
            .expect("request builds");
        self.send(request);
    }

    /// Sends a JSON body.
    pub fn post_json(&mut self, path: &str, body: &Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds");
        self.send(request);
    }

    /// Sends a single-file multipart upload.
    pub fn upload(&mut self, path: &str, field: &str, filename: &str, contents: &[u8]) {
        self.upload_form(path, &[], field, filename, contents);
    }

    /// Sends a multipart upload whose text parts precede the file part.
    pub fn upload_form(
        &mut self,
        path: &str,
        text_parts: &[(&str, &str)],
        field: &str,
        filename: &str,
        contents: &[u8],
    ) {
        let (content_type, body) = multipart_form(text_parts, field, filename, contents);
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .expect("request builds");
        self.send(request);
    }

    fn send(&mut self, request: Request<Body>) {
        let router = self
            .service
            .as_ref()
            .expect("service must be bootstrapped before requests")
            .router();
        let response = self.runtime.block_on(async move {
            let response = router.oneshot(request).await.expect("router is infallible");
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("response body readable");
            let body = serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
            CapturedResponse { status, body }
        });
        self.response = Some(response);
    }

    #[must_use]
    pub fn response(&self) -> &CapturedResponse {
        self.response.as_ref().expect("no request was sent")
    }

    /// Files currently stored under `subdir` of the upload root.
    #[must_use]
    pub fn stored_files(&self, subdir: &str) -> Vec<Utf8PathBuf> {
        let dir = self.config.upload_dir().join(subdir);
        let Ok(entries) = dir.read_dir_utf8() else {
            return Vec::new();
        };
        entries
            .map(|entry| entry.expect("directory entry readable").path().to_owned())
            .collect()
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Development configuration bound to an ephemeral loopback port.
#[must_use]
pub fn test_config(upload_dir: Utf8PathBuf) -> Config {
    Config {
        host: "127.0.0.1".to_owned(),
        port: 0,
        upload_dir,
        ..Config::default()
    }
}

/// Encodes one file part as `multipart/form-data`, returning the content type
/// and body.
#[must_use]
pub fn multipart_body(field: &str, filename: &str, contents: &[u8]) -> (String, Vec<u8>) {
    multipart_form(&[], field, filename, contents)
}

/// Builds a multipart body whose text parts precede the single file part.
#[must_use]
pub fn multipart_form(
    text_parts: &[(&str, &str)],
    field: &str,
    filename: &str,
    contents: &[u8],
) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "blotter-test-boundary";
    let mut body = Vec::new();
    for (name, value) in text_parts {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
