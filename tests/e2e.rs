//! End-to-end integration tests for blog2md.
//!
//! Every test builds its own corpus in a temporary directory. Image downloads
//! go to a local `tiny_http` server started per test, so nothing touches the
//! network.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use blog2md::{
    export, export_corpus, CorpusDocument, DocumentSource, ExportConfig, ExportError,
    Exporter, HttpImageFetcher, ImageFetcher, JsonDirectorySource, NoopProgressCallback,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use tiny_http::{Header, Response, Server};

const JPEG_BYTES: &[u8] = b"\xFF\xD8\xFF\xE0fake-jpeg";
const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-png";

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Local image server. Routes on the element part of the request path:
/// `M404` → 404, `Mtxt` → `text/html`, `Mpng` → `image/png`, anything
/// else → `image/jpeg`.
struct ImageServer {
    base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl ImageServer {
    fn start() -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let hits = Arc::new(Mutex::new(HashMap::new()));

        let counter = Arc::clone(&hits);
        thread::spawn(move || {
            for request in server.incoming_requests() {
                let url = request.url().to_string();
                *counter.lock().unwrap().entry(url.clone()).or_insert(0) += 1;

                let response = if url.contains("/content/M404") {
                    Response::from_data(b"not found".to_vec()).with_status_code(404)
                } else if url.contains("/content/Mtxt") {
                    Response::from_data(b"<html></html>".to_vec())
                        .with_header(content_type("text/html; charset=UTF-8"))
                } else if url.contains("/content/Mpng") {
                    Response::from_data(PNG_BYTES.to_vec()).with_header(content_type("image/png"))
                } else {
                    Response::from_data(JPEG_BYTES.to_vec())
                        .with_header(content_type("image/jpeg"))
                };
                let _ = request.respond(response);
            }
        });

        Self {
            base_url: format!("http://127.0.0.1:{port}/dx/"),
            hits,
        }
    }

    fn hits(&self, path_and_query: &str) -> usize {
        self.hits
            .lock()
            .unwrap()
            .get(path_and_query)
            .copied()
            .unwrap_or(0)
    }
}

fn content_type(value: &str) -> Header {
    Header::from_bytes(&b"Content-Type"[..], value.as_bytes()).unwrap()
}

fn config(base_dir: &Path, base_url: &str) -> ExportConfig {
    ExportConfig::builder()
        .database(base_dir.join("db").display().to_string())
        .base_url(base_url)
        .base_dir(base_dir.join("site"))
        .download_timeout_secs(5)
        .build()
        .unwrap()
}

/// Write one JSON file per document into `<database>/<collection>/`.
fn write_corpus(config: &ExportConfig, documents: &[serde_json::Value]) {
    let dir = PathBuf::from(&config.database).join(&config.collection);
    std::fs::create_dir_all(&dir).unwrap();
    for (i, doc) in documents.iter().enumerate() {
        std::fs::write(dir.join(format!("{i:03}.json")), doc.to_string()).unwrap();
    }
}

fn read_post(config: &ExportConfig, file_name: &str) -> String {
    std::fs::read_to_string(config.posts_dir().join(file_name))
        .unwrap_or_else(|e| panic!("{file_name} was not written: {e}"))
}

/// Fetcher for corpora without embedded images.
struct NoImages;

impl ImageFetcher for NoImages {
    fn fetch(&self, remote_ref: &str, _base_name: &str) -> Result<PathBuf, ExportError> {
        panic!("unexpected image fetch for {remote_ref}");
    }
}

struct StaticSource(Vec<CorpusDocument>);

impl DocumentSource for StaticSource {
    fn list(&self, _collection: &str) -> Result<Vec<CorpusDocument>, ExportError> {
        Ok(self.0.clone())
    }
}

// ── Whole-corpus export ──────────────────────────────────────────────────────

#[test]
fn test_single_post_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = config(tmp.path(), "https://example.org/dx/");
    config.html_output = true;
    write_corpus(
        &config,
        &[serde_json::json!({
            "key": "hello-world.htm",
            "title": "Hello \"World\"",
            "created": "2021-03-15",
            "category": "",
            "tags": ["intro"],
            "content": "<p>Hi<br /><br /><br /></p>"
        })],
    );

    let source = JsonDirectorySource::new(&config.database);
    let report = export_corpus(&source, &config).unwrap();
    assert_eq!(report.stats.exported, 1);
    assert_eq!(report.documents[0].file_name, "2021-03-hello-world.md");

    let post = read_post(&config, "2021-03-hello-world.md");
    assert!(post.contains("title: \"Hello \\\"World\\\"\""));
    assert!(post.contains("tags:\n  - intro"));
    assert!(!post.contains("categories:"));
    assert_eq!(
        post,
        "---\n\
         authors:\n  - Unknown\n\n\
         title: \"Hello \\\"World\\\"\"\n\n\
         slug: hello-world\n\n\
         date: 2021-03-15T00:00:00Z\n\n\
         tags:\n  - intro\n\
         ---\n\n\
         Hi\n"
    );
    assert_eq!(report.documents[0].bytes, post.len());

    // The break run reaches the renderer collapsed to two.
    let html = std::fs::read_to_string(config.posts_dir().join("hello-world.html")).unwrap();
    assert_eq!(html, "<p>Hi<br /><br /></p>");
}

#[test]
fn test_forward_and_backward_internal_links() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), "https://example.org/dx/");
    write_corpus(
        &config,
        &[
            serde_json::json!({
                "key": "first.htm",
                "title": "First",
                "created": "2020-01-10",
                "content": "<p>Next: <a href=\"second.htm\">second</a>, gone: <a href=\"missing.htm\">x</a></p>"
            }),
            serde_json::json!({
                "key": "second.htm",
                "title": "Second",
                "created": "2021-05-02",
                "content": "<p>Back to <a href=\"first.htm\">first</a></p>"
            }),
        ],
    );

    let report = export_corpus(&JsonDirectorySource::new(&config.database), &config).unwrap();
    assert_eq!(report.stats.exported, 2);

    let first = read_post(&config, "2020-01-first.md");
    assert!(
        first.contains("[second](2021-05-second.md \"2021-05-second.md\")"),
        "{first}"
    );
    assert!(first.contains("[x](missing.htm)"), "{first}");

    let second = read_post(&config, "2021-05-second.md");
    assert!(
        second.contains("[first](2020-01-first.md \"2020-01-first.md\")"),
        "{second}"
    );
}

#[test]
fn test_rerun_overwrites_previous_output() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), "https://example.org/dx/");
    config.ensure_output_dirs().unwrap();

    let doc = |body: &str| {
        CorpusDocument::new(
            "post.htm",
            "Post",
            blog2md::source::parse_timestamp("2019-09-09").unwrap(),
        )
        .with_content(body)
    };

    Exporter::with_fetcher(config.clone(), Box::new(NoImages))
        .run(&StaticSource(vec![doc("<p>a much longer first version of the body</p>")]))
        .unwrap();
    Exporter::with_fetcher(config.clone(), Box::new(NoImages))
        .run(&StaticSource(vec![doc("<p>second</p>")]))
        .unwrap();

    let post = read_post(&config, "2019-09-post.md");
    assert!(post.ends_with("---\n\nsecond\n"), "{post}");
}

#[test]
fn test_missing_collection_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), "https://example.org/dx/");

    let err = export_corpus(&JsonDirectorySource::new(&config.database), &config).unwrap_err();
    assert!(matches!(err, ExportError::SourceUnavailable { .. }));
    assert!(err.is_fatal());
}

// ── Embedded images over HTTP ────────────────────────────────────────────────

#[test]
fn test_embedded_images_are_fetched_once() {
    let server = ImageServer::start();
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), &server.base_url);
    write_corpus(
        &config,
        &[
            serde_json::json!({
                "key": "photo.htm",
                "title": "Photo",
                "created": "2022-06-01",
                "content": "<p><img src=\"photo.htm/content/M1?OpenElement\" alt=\"One\"></p>\
                            <p><img src=\"photo.htm/content/M1?OpenElement\" alt=\"Again\"></p>\
                            <p><img src=\"photo.htm/content/Mpng?OpenElement\" alt=\"Png\"></p>\
                            <p><img src=\"https://cdn.example.org/logo.png\" alt=\"Logo\"></p>"
            }),
            serde_json::json!({
                "key": "reuse.htm",
                "title": "Reuse",
                "created": "2022-07-01",
                "content": "<img src=\"photo.htm/content/M1?OpenElement\" alt=\"Shared\">"
            }),
        ],
    );

    let report = export_corpus(&JsonDirectorySource::new(&config.database), &config).unwrap();
    assert_eq!(report.stats.exported, 2, "{:?}", report.documents);

    assert_eq!(server.hits("/dx/photo.htm/content/M1?OpenElement"), 1);
    assert_eq!(server.hits("/dx/photo.htm/content/Mpng?OpenElement"), 1);

    let jpg = config.images_dir().join("photo-M1.jpg");
    assert_eq!(std::fs::read(&jpg).unwrap(), JPEG_BYTES);
    let png = config.images_dir().join("photo-Mpng.png");
    assert_eq!(std::fs::read(&png).unwrap(), PNG_BYTES);

    let post = read_post(&config, "2022-06-photo.md");
    assert!(post.contains("![One](../../images/imported/photo-M1.jpg)"), "{post}");
    assert!(post.contains("![Again](../../images/imported/photo-M1.jpg)"), "{post}");
    assert!(post.contains("![Png](../../images/imported/photo-Mpng.png)"), "{post}");
    assert!(post.contains("![Logo](https://cdn.example.org/logo.png)"), "{post}");

    let reuse = read_post(&config, "2022-07-reuse.md");
    assert!(reuse.contains("![Shared](../../images/imported/photo-M1.jpg)"), "{reuse}");
}

#[test]
fn test_image_failures_are_isolated_per_document() {
    let server = ImageServer::start();
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), &server.base_url);
    write_corpus(
        &config,
        &[
            serde_json::json!({
                "key": "broken.htm",
                "title": "Broken",
                "created": "2022-01-01",
                "content": "<img src=\"broken.htm/content/M404?OpenElement\">"
            }),
            serde_json::json!({
                "key": "html.htm",
                "title": "Html",
                "created": "2022-02-01",
                "content": "<img src=\"html.htm/content/Mtxt?OpenElement\">"
            }),
            serde_json::json!({
                "key": "malformed.htm",
                "title": "Malformed",
                "created": "2022-03-01",
                "content": "<img src=\"logo.png?OpenElement\">"
            }),
            serde_json::json!({
                "key": "fine.htm",
                "title": "Fine",
                "created": "2022-04-01",
                "content": "<p>fine</p>"
            }),
        ],
    );

    let report = export_corpus(&JsonDirectorySource::new(&config.database), &config).unwrap();
    assert_eq!(report.stats.exported, 1);
    assert_eq!(report.stats.failed, 3);

    let errors: Vec<&str> = report
        .documents
        .iter()
        .map(|d| d.error.as_deref().unwrap_or(""))
        .collect();
    assert!(errors[0].contains("404"), "{}", errors[0]);
    assert!(errors[1].contains("content type"), "{}", errors[1]);
    assert!(errors[2].contains("Malformed"), "{}", errors[2]);
    assert!(errors[3].is_empty());

    assert!(!config.posts_dir().join("2022-01-broken.md").exists());
    assert!(config.posts_dir().join("2022-04-fine.md").is_file());
}

#[test]
fn test_http_fetcher_maps_content_type_and_memoises() {
    let server = ImageServer::start();
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), &server.base_url);
    config.ensure_output_dirs().unwrap();
    let fetcher = HttpImageFetcher::new(&config).unwrap();

    let first = fetcher.fetch("a.htm/content/M7?OpenElement", "a-M7").unwrap();
    let again = fetcher.fetch("a.htm/content/M7?OpenElement", "a-M7").unwrap();
    assert_eq!(first, config.images_dir().join("a-M7.jpg"));
    assert_eq!(first, again);
    assert_eq!(server.hits("/dx/a.htm/content/M7?OpenElement"), 1);
    assert_eq!(fetcher.fetched_count(), 1);

    // Absolute references bypass the base URL.
    let absolute = format!("{}b.htm/content/Mpng?OpenElement", server.base_url);
    let png = fetcher.fetch(&absolute, "b-Mpng").unwrap();
    assert_eq!(png.extension().unwrap(), "png");
}

#[test]
fn test_http_fetcher_failures_are_not_memoised() {
    let server = ImageServer::start();
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), &server.base_url);
    config.ensure_output_dirs().unwrap();
    let fetcher = HttpImageFetcher::new(&config).unwrap();

    for _ in 0..2 {
        let err = fetcher.fetch("x.htm/content/M404?OpenElement", "x-M404").unwrap_err();
        assert!(matches!(err, ExportError::DownloadFailed { .. }));
    }
    assert_eq!(server.hits("/dx/x.htm/content/M404?OpenElement"), 2);

    let err = fetcher.fetch("x.htm/content/Mtxt?OpenElement", "x-Mtxt").unwrap_err();
    match err {
        ExportError::UnknownContentType { content_type, .. } => {
            assert_eq!(content_type.as_deref(), Some("text/html; charset=UTF-8"));
        }
        other => panic!("expected UnknownContentType, got {other:?}"),
    }
    assert_eq!(fetcher.fetched_count(), 0);
}

// ── Async entry point ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_async_export_runs_on_blocking_pool() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), "https://example.org/dx/");
    write_corpus(
        &config,
        &[serde_json::json!({
            "key": "async.htm",
            "title": "Async",
            "created": "2023-11-20T08:00:00Z",
            "content": "<h2>Title</h2><br /><p>Body</p>"
        })],
    );
    let posts_dir = config.posts_dir();

    let source = Arc::new(JsonDirectorySource::new(&config.database));
    let report = export(source, config).await.unwrap();
    assert_eq!(report.stats.exported, 1);

    let post = std::fs::read_to_string(posts_dir.join("2023-11-async.md")).unwrap();
    assert!(post.ends_with("---\n\n## Title\n\nBody\n"), "{post}");
}

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();
    assert_send_sync::<ExportConfig>();
}
