mod common;

use std::fs;
use std::time::Duration;

use gallery_engine::{
    DownloadRequest, DownloadService, FailureKind, ReqwestDownloadService, TransferSettings,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::init_logging;

fn request(url: String, filename: &str) -> DownloadRequest {
    DownloadRequest {
        url,
        filename: filename.to_string(),
        save_as: false,
    }
}

#[tokio::test]
async fn downloads_into_output_dir() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img/1.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("jpegbytes", "image/jpeg"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = ReqwestDownloadService::new(TransferSettings::default(), dir.path().to_path_buf());

    let first = service
        .download(request(format!("{}/img/1.jpg", server.uri()), "trip/1.jpg"))
        .await
        .expect("download ok");
    let second = service
        .download(request(format!("{}/img/1.jpg", server.uri()), "again.jpg"))
        .await
        .expect("download ok");

    assert_ne!(first, second);
    assert_eq!(fs::read(dir.path().join("trip/1.jpg")).unwrap(), b"jpegbytes");
}

#[tokio::test]
async fn http_error_status_is_reported() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = ReqwestDownloadService::new(TransferSettings::default(), dir.path().to_path_buf());
    let err = service
        .download(request(format!("{}/missing.jpg", server.uri()), "missing.jpg"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert!(!dir.path().join("missing.jpg").exists());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/huge.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0_u8; 2048]))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let settings = TransferSettings {
        max_bytes: 1024,
        ..TransferSettings::default()
    };
    let service = ReqwestDownloadService::new(settings, dir.path().to_path_buf());
    let err = service
        .download(request(format!("{}/huge.jpg", server.uri()), "huge.jpg"))
        .await
        .unwrap_err();

    assert!(matches!(err.kind, FailureKind::TooLarge { max_bytes: 1024, .. }));
}

#[tokio::test]
async fn slow_response_times_out() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.jpg"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let settings = TransferSettings {
        request_timeout: Duration::from_millis(100),
        ..TransferSettings::default()
    };
    let service = ReqwestDownloadService::new(settings, dir.path().to_path_buf());
    let err = service
        .download(request(format!("{}/slow.jpg", server.uri()), "slow.jpg"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn invalid_url_and_escaping_filename_are_rejected() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let service = ReqwestDownloadService::new(TransferSettings::default(), dir.path().to_path_buf());

    let err = service
        .download(request("not a url".to_string(), "a.jpg"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);

    let err = service
        .download(request("https://example.com/a.jpg".to_string(), "../a.jpg"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Rejected);
}
