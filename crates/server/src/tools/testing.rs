//! A tiny in-memory site for tool tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, header};
use rmcp::model::CallToolResult;
use swcache_client::{CacheController, ControllerSettings, FetchResponse, Fetcher, InterceptedRequest, ResponseKind};
use swcache_core::{AppConfig, CacheDb, Error, PrecacheManifest};

pub(crate) const BOTTLE_IMG: &str = "/puzzle1/assets/img/bottle_img.jpg";

/// JPEG start-of-image marker and JFIF header; not valid UTF-8.
pub(crate) const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0xFF, 0xD9];

pub(crate) struct StaticSite {
    pages: HashMap<&'static str, (&'static str, &'static [u8])>,
    offline: AtomicBool,
}

impl StaticSite {
    pub(crate) fn new() -> Self {
        let pages = HashMap::from([
            ("/", ("text/html", b"<html>home</html>".as_slice())),
            ("/index.html", ("text/html", b"<html>shell</html>".as_slice())),
            ("/style.css", ("text/css", b"body{}".as_slice())),
            ("/puzzle1/dist/js/quiz.js", ("text/javascript", b"quiz()".as_slice())),
            (BOTTLE_IMG, ("image/jpeg", JPEG)),
        ]);
        Self { pages, offline: AtomicBool::new(false) }
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl Fetcher for StaticSite {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<FetchResponse, Error> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: offline", request.url)));
        }

        let (status, content_type, body) = match self.pages.get(request.url.path()) {
            Some((content_type, body)) => (StatusCode::OK, *content_type, *body),
            None => (StatusCode::NOT_FOUND, "text/plain", b"not found".as_slice()),
        };

        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static(content_type));

        Ok(FetchResponse {
            url: request.url.clone(),
            status,
            bytes: Bytes::from_static(body),
            headers,
            kind: ResponseKind::Basic,
        })
    }
}

/// A controller over an in-memory store, not yet installed.
pub(crate) async fn controller(site: Arc<StaticSite>) -> Arc<CacheController> {
    let db = CacheDb::open_in_memory().await.unwrap();
    let settings = ControllerSettings::from_app_config(&AppConfig::default()).unwrap();
    let controller = CacheController::new(settings, Arc::new(db), site)
        .with_manifest(PrecacheManifest::new(["/", "/index.html", "/style.css"]));
    Arc::new(controller)
}

/// A controller that is installed and active.
pub(crate) async fn active_controller(site: Arc<StaticSite>) -> Arc<CacheController> {
    let controller = controller(site).await;
    controller.install().await.unwrap();
    controller.activate().await.unwrap();
    controller
}

/// Parse the JSON text content of a tool result.
pub(crate) fn output(result: &CallToolResult) -> serde_json::Value {
    let text = result.content[0].as_text().expect("text content");
    serde_json::from_str(&text.text).unwrap()
}
