//! Router harness shared by the handler tests

use axum::{
    body::Body,
    http::{
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
        Request,
    },
    response::Response,
    Router,
};
use fuelforge_common::{config::AppConfig, MemorySessionStore, SessionStore};
use fuelforge_ingestion::{BatchProcessor, OcrEngine, TesseractCli};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use crate::session::SessionState;
use crate::{create_router, AppState};

const BOUNDARY: &str = "fuelforge-test-boundary";

/// A gateway wired to a scratch directory and an in-memory session store
pub struct TestApp {
    root: PathBuf,
    config: AppConfig,
    sessions: Arc<MemorySessionStore<SessionState>>,
    ocr: Option<Arc<dyn OcrEngine>>,
}

impl TestApp {
    pub fn new(tag: &str) -> Self {
        let root = std::env::temp_dir().join(format!("fuelforge-gateway-{}-{}", tag, Uuid::new_v4()));

        let mut config = AppConfig::default();
        config.storage.uploads_dir = root.join("uploads");
        config.storage.knowledge_dir = root.join("knowledge");
        config.storage.logs_dir = root.join("logs");
        config.ocr.enabled = false;

        std::fs::create_dir_all(&config.storage.knowledge_dir).unwrap();
        std::fs::write(
            config.financial_calendar_path(),
            "Date,Week\n05/01/2024,FY24 WK27\n06/01/2024,FY24 WK27\n",
        )
        .unwrap();

        Self {
            root,
            config,
            sessions: Arc::new(MemorySessionStore::new(std::time::Duration::from_secs(60))),
            ocr: None,
        }
    }

    pub fn set_max_upload_bytes(&mut self, limit: usize) {
        self.config.server.max_upload_bytes = limit;
    }

    pub fn enable_ocr(&mut self, command: &str) {
        self.config.ocr.enabled = true;
        self.config.ocr.tesseract_cmd = command.to_string();
        self.ocr = Some(Arc::new(TesseractCli::new(command, "eng")));
    }

    pub fn enable_rate_limit(&mut self, requests_per_second: u32, burst: u32) {
        self.config.rate_limit.enabled = true;
        self.config.rate_limit.requests_per_second = requests_per_second;
        self.config.rate_limit.burst = burst;
    }

    pub fn state(&self) -> AppState {
        AppState {
            config: Arc::new(self.config.clone()),
            sessions: self.sessions.clone(),
            processor: BatchProcessor::new(self.config.invoice.clone(), self.ocr.clone()),
            ocr: self.ocr.clone(),
            metrics: None,
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.state())
    }

    pub fn request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    pub async fn send(router: &Router, request: Request<Body>) -> Response {
        tokio_test::assert_ok!(router.clone().oneshot(request).await)
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        Self::send(&self.router(), Self::request(uri, cookie)).await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        content_type: &str,
        body: Vec<u8>,
        cookie: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, content_type);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        Self::send(&self.router(), builder.body(Body::from(body)).unwrap()).await
    }

    /// `name=value` part of the response's session cookie
    pub fn cookie_from(response: &Response) -> String {
        let header = response
            .headers()
            .get(SET_COOKIE)
            .expect("response sets the session cookie")
            .to_str()
            .unwrap();
        header.split(';').next().unwrap().to_string()
    }

    pub fn session_id(response: &Response) -> Uuid {
        let cookie = Self::cookie_from(response);
        let (_, id) = cookie.split_once('=').unwrap();
        Uuid::parse_str(id).unwrap()
    }

    pub async fn session_from(&self, response: &Response) -> SessionState {
        self.sessions
            .load(Self::session_id(response))
            .await
            .unwrap()
            .expect("session was saved")
    }

    pub fn upload_dir(&self, response: &Response) -> PathBuf {
        self.config
            .storage
            .uploads_dir
            .join(Self::session_id(response).to_string())
    }

    pub async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// Encode `(field, file name, bytes)` parts as `multipart/form-data`.
/// An empty file name produces a plain form field.
pub fn multipart_body(parts: &[(&str, &str, &[u8])]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (field, file_name, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        if file_name.is_empty() {
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", field).as_bytes(),
            );
        } else {
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/pdf\r\n\r\n",
                    field, file_name
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

/// Single-page PDF with one text line per entry
pub fn pdf_bytes(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 10.into()]),
        Operation::new("Td", vec![50.into(), 800.into()]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("Td", vec![0.into(), (-14).into()]));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}
