//! Web API integration tests
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`.

#![cfg(feature = "web")]

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use image::{ImageFormat, Rgb, RgbImage};
use mailslicer::{FixedTextOracle, PipelineConfig, ServerConfig, TextBox, WebServer};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "mailslicer-test-boundary";

/// 100x100 art with white gaps centered on rows 30 and 70
fn campaign_png() -> Vec<u8> {
    let image = RgbImage::from_fn(100, 100, |_, y| {
        if (22..39).contains(&y) || (62..79).contains(&y) {
            Rgb([255, 255, 255])
        } else {
            Rgb([30, 30, 120])
        }
    });
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn multipart_body(fields: &[(&str, &str)], image: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(data) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"arte.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn build_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/build-email")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn router(work_dir: &Path, templates_dir: &Path) -> Router {
    let config = ServerConfig::default()
        .with_work_dir(work_dir)
        .with_templates_dir(templates_dir)
        .with_workers(2);
    let oracle = FixedTextOracle::new(vec![TextBox::new(5, 45, 95, 55, "Frete grátis")]);
    WebServer::with_oracle(config, PipelineConfig::default(), Arc::new(oracle)).router()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn full_fields<'a>(template_id: &'a str, campaign: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("title", "Ofertas de inverno"),
        ("snippet", "Até 50% off"),
        ("template_id", template_id),
        ("cta_url", "https://example.com/inverno"),
        ("campaign_name", campaign),
    ]
}

#[tokio::test]
async fn test_health_endpoint() {
    let tmp = tempfile::tempdir().unwrap();
    let app = router(tmp.path(), tmp.path());

    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json["ocr_available"].is_boolean());
}

#[tokio::test]
async fn test_build_missing_fields() {
    let tmp = tempfile::tempdir().unwrap();
    let app = router(tmp.path(), tmp.path());

    // Everything but the image
    let body = multipart_body(&full_fields("default", "inverno"), None);
    let response = app.oneshot(build_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "missing required parameters");
}

#[tokio::test]
async fn test_build_unknown_template() {
    let tmp = tempfile::tempdir().unwrap();
    let app = router(tmp.path(), tmp.path());

    let png = campaign_png();
    let body = multipart_body(&full_fields("Nao Existe", "inverno"), Some(png.as_slice()));
    let response = app.oneshot(build_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_build_unsafe_campaign_name() {
    let tmp = tempfile::tempdir().unwrap();
    let app = router(tmp.path(), tmp.path());

    let png = campaign_png();
    let body = multipart_body(&full_fields("default", "../fora"), Some(png.as_slice()));
    let response = app.oneshot(build_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_build_invalid_image_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let app = router(tmp.path(), tmp.path());

    let body = multipart_body(&full_fields("default", "inverno"), Some(&b"not a png"[..]));
    let response = app.oneshot(build_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error"], "failed to build email");
}

#[tokio::test]
async fn test_build_and_download() {
    let work = tempfile::tempdir().unwrap();
    let templates = tempfile::tempdir().unwrap();
    std::fs::write(
        templates.path().join("Lar Center.html"),
        "<html><head><title>x</title></head><body>\
         <!-- CONTEÚDO --><!-- /CONTEUDO --></body></html>",
    )
    .unwrap();
    let app = router(work.path(), templates.path());

    let png = campaign_png();
    let body = multipart_body(&full_fields("Lar Center", "inverno"), Some(png.as_slice()));
    let response = app.clone().oneshot(build_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    let job_id = json["job_id"].as_str().unwrap().to_string();
    assert_eq!(job_id.len(), 8);
    assert_eq!(
        json["html_file"],
        format!("/api/download/{}/inverno.html", job_id)
    );
    assert_eq!(
        json["assets_zip"],
        format!("/api/download/{}/inverno-assets.zip", job_id)
    );

    let job_dir = work.path().join(format!("job_{}", job_id));
    assert!(job_dir.join("inverno.html").is_file());
    assert!(job_dir.join("inverno-assets.zip").is_file());
    assert!(job_dir.join("inverno-assets/slice_0_30.png").is_file());

    let response = app
        .clone()
        .oneshot(get(json["html_file"].as_str().unwrap()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("<title>Ofertas de inverno</title>"));
    assert!(html.contains("Frete grátis"));
    assert!(html.contains("inverno-assets/slice_70_100.png"));

    let response = app
        .oneshot(get(json["assets_zip"].as_str().unwrap()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
}

#[tokio::test]
async fn test_download_unknown_job() {
    let tmp = tempfile::tempdir().unwrap();
    let app = router(tmp.path(), tmp.path());

    let response = app
        .oneshot(get("/api/download/deadbeef/email.html"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_unknown_file() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join("job_0badf00d")).unwrap();
    let app = router(tmp.path(), tmp.path());

    let response = app
        .oneshot(get("/api/download/0badf00d/missing.html"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_hidden_file_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join("job_0badf00d")).unwrap();
    let app = router(tmp.path(), tmp.path());

    let response = app
        .oneshot(get("/api/download/0badf00d/.env"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
