//! Common test utilities.

#![allow(dead_code)]

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, Method, Response, StatusCode, Uri},
    Router,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::net::TcpListener;

use blob_file_sync::{RestBackend, StorageAccountConfig, Synchronizer};

pub const ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

/// A request as received by the fake storage endpoint.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// `METHOD path?query`, handy for asserting call order.
    pub fn line(&self) -> String {
        match &self.query {
            Some(query) => format!("{} {}?{}", self.method, self.path, query),
            None => format!("{} {}", self.method, self.path),
        }
    }
}

#[derive(Default)]
struct FakeState {
    /// Blobs keyed by URL path, e.g. `/mycontainer/a/b.txt`.
    blobs: HashMap<String, (Vec<u8>, Option<String>)>,
    directories: HashSet<String>,
    files: HashMap<String, Vec<u8>>,
    /// Canned error responses keyed by request line.
    failures: HashMap<String, (u16, String)>,
    requests: Vec<RecordedRequest>,
}

/// Blob and File service stand-in on a random local port.
#[derive(Clone)]
pub struct FakeStorage {
    pub base_url: String,
    state: Arc<Mutex<FakeState>>,
}

impl FakeStorage {
    /// Creates and starts a fake storage endpoint.
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(FakeState::default()));
        let app = Router::new()
            .fallback(handle)
            .layer(DefaultBodyLimit::disable())
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Start server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
        }
    }

    /// Stores a blob at `/{container}/{path}`.
    pub fn put_blob(&self, container: &str, path: &str, data: &[u8]) {
        self.state
            .lock()
            .blobs
            .insert(format!("/{}/{}", container, path), (data.to_vec(), None));
    }

    /// Stores a blob whose Content-MD5 header will be `md5`.
    pub fn put_blob_with_md5(&self, container: &str, path: &str, data: &[u8], md5: &str) {
        self.state.lock().blobs.insert(
            format!("/{}/{}", container, path),
            (data.to_vec(), Some(md5.to_string())),
        );
    }

    pub fn put_directory(&self, path: &str) {
        self.state.lock().directories.insert(path.to_string());
    }

    pub fn put_file(&self, path: &str, data: &[u8]) {
        self.state.lock().files.insert(path.to_string(), data.to_vec());
    }

    /// Answers the request with `line` (see `RecordedRequest::line`) with an error.
    pub fn fail_with(&self, line: &str, status: u16, code: &str) {
        self.state
            .lock()
            .failures
            .insert(line.to_string(), (status, code.to_string()));
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(path).cloned()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn request_lines(&self) -> Vec<String> {
        self.requests().iter().map(|r| r.line()).collect()
    }

    /// URL of a blob as it would appear in an event.
    pub fn blob_url(&self, container: &str, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, container, path)
    }

    /// Synchronizer wired to this endpoint through the REST clients.
    pub fn synchronizer(&self, source_container: &str, target_share: Option<&str>) -> Synchronizer {
        let config = StorageAccountConfig::new(
            ACCOUNT_KEY,
            source_container,
            target_share.map(String::from),
        )
        .unwrap();
        let backend = RestBackend::new(&config, None).unwrap();
        Synchronizer::new(config, Arc::new(backend))
    }
}

fn parent(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

fn error_response(status: StatusCode, code: &str) -> Response<Body> {
    let xml = format!(
        r#"<?xml version="1.0" encoding="utf-8"?><Error><Code>{}</Code><Message>{} returned by fake storage
RequestId:fake</Message></Error>"#,
        code, code
    );
    Response::builder()
        .status(status)
        .header("x-ms-error-code", code)
        .header("x-ms-request-id", "fake-request")
        .header("content-type", "application/xml")
        .body(Body::from(xml))
        .unwrap()
}

fn empty_response(status: StatusCode) -> Response<Body> {
    Response::builder().status(status).body(Body::empty()).unwrap()
}

async fn handle(
    State(state): State<Arc<Mutex<FakeState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response<Body> {
    let path = uri.path().to_string();
    let query = uri.query().map(String::from);
    let mut state = state.lock();

    let request = RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        query: query.clone(),
        headers: headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect(),
        body: body.to_vec(),
    };
    let failure = state.failures.get(&request.line()).cloned();
    state.requests.push(request);

    if let Some((status, code)) = failure {
        let status = StatusCode::from_u16(status).unwrap();
        return error_response(status, &code);
    }

    if !headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.starts_with("SharedKey "))
    {
        return error_response(StatusCode::FORBIDDEN, "AuthenticationFailed");
    }

    // File paths are share-relative: strip the leading "/{share}/".
    let share_path = path
        .trim_start_matches('/')
        .split_once('/')
        .map(|(_, rest)| rest.to_string())
        .unwrap_or_default();
    let query = query.unwrap_or_default();

    match method {
        Method::GET => match state.blobs.get(&path) {
            Some((data, md5)) => {
                let mut response = Response::builder().status(StatusCode::OK);
                if let Some(md5) = md5 {
                    response = response.header("content-md5", md5.as_str());
                }
                response.body(Body::from(data.clone())).unwrap()
            }
            None => error_response(StatusCode::NOT_FOUND, "BlobNotFound"),
        },
        Method::PUT if query == "restype=directory" => {
            if let Some(parent) = parent(&share_path) {
                if !state.directories.contains(parent) {
                    return error_response(StatusCode::NOT_FOUND, "ParentNotFound");
                }
            }
            if !state.directories.insert(share_path) {
                return error_response(StatusCode::CONFLICT, "ResourceAlreadyExists");
            }
            empty_response(StatusCode::CREATED)
        }
        Method::PUT if query == "comp=range" => {
            let range = headers
                .get("x-ms-range")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("bytes="))
                .and_then(|v| v.split_once('-'))
                .and_then(|(s, e)| Some((s.parse::<usize>().ok()?, e.parse::<usize>().ok()?)));
            let Some((start, end)) = range else {
                return error_response(StatusCode::BAD_REQUEST, "InvalidHeaderValue");
            };
            let Some(file) = state.files.get_mut(&share_path) else {
                return error_response(StatusCode::NOT_FOUND, "ResourceNotFound");
            };
            if end >= file.len() || end + 1 - start != body.len() {
                return error_response(StatusCode::RANGE_NOT_SATISFIABLE, "InvalidRange");
            }
            file[start..=end].copy_from_slice(&body);
            empty_response(StatusCode::CREATED)
        }
        Method::PUT => {
            if let Some(parent) = parent(&share_path) {
                if !state.directories.contains(parent) {
                    return error_response(StatusCode::NOT_FOUND, "ParentNotFound");
                }
            }
            let size = headers
                .get("x-ms-content-length")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<usize>().ok());
            match size {
                Some(size) if headers.get("x-ms-type").is_some() => {
                    state.files.insert(share_path, vec![0; size]);
                    empty_response(StatusCode::CREATED)
                }
                _ => error_response(StatusCode::BAD_REQUEST, "MissingRequiredHeader"),
            }
        }
        Method::DELETE => {
            if let Some(parent) = parent(&share_path) {
                if !state.directories.contains(parent) {
                    return error_response(StatusCode::NOT_FOUND, "ParentNotFound");
                }
            }
            match state.files.remove(&share_path) {
                Some(_) => empty_response(StatusCode::ACCEPTED),
                None => error_response(StatusCode::NOT_FOUND, "ResourceNotFound"),
            }
        }
        _ => error_response(StatusCode::METHOD_NOT_ALLOWED, "UnsupportedHttpVerb"),
    }
}
