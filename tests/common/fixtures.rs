//! Upstream servers, configs and archives used across integration tests

use frame_prep::{Config, FailedJobPolicy, JobCoordinator, ResultProjector};
use std::io::Write;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// JPEG start-of-image marker followed by filler, enough to look like a frame
pub fn fake_jpeg(seed: u8) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend(std::iter::repeat_n(seed, 4096));
    bytes.extend([0xFF, 0xD9]);
    bytes
}

/// Serve `body` with status 200 at `route`
pub async fn serve_ok(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Answer `route` with a bare status code
pub async fn serve_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Storage root in a fresh temp dir; `configure` can adjust anything else
pub fn test_config(configure: impl FnOnce(&mut Config)) -> (Config, TempDir) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let mut config = Config::default();
    config.storage.root = temp_dir.path().join("vlm_files");
    config.storage.failed_job_policy = FailedJobPolicy::Keep;
    configure(&mut config);
    (config, temp_dir)
}

/// Coordinator and projector sharing one config
pub fn pipeline(config: &Config) -> (JobCoordinator, ResultProjector) {
    (
        JobCoordinator::new(config).expect("coordinator"),
        ResultProjector::new(config),
    )
}

/// Build an in-memory zip from `(name, bytes)` entries
pub fn zip_bytes(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, zip::write::FileOptions::default())
            .expect("start entry");
        writer.write_all(content).expect("write entry");
    }
    writer.finish().expect("finish zip").into_inner()
}
