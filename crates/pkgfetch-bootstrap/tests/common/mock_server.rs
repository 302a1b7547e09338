//! Mock server helpers for executable download tests

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate, Times};

use super::constants::*;

/// URI template pointing at the mock server
pub fn uri_template(server: &MockServer) -> String {
    format!("{}{}", server.uri(), EXE_PATH_TEMPLATE)
}

/// Serve `content` for the executable of `version`, expecting `calls` requests
pub async fn mock_exe_download(
    server: &MockServer,
    version: &str,
    content: Vec<u8>,
    calls: impl Into<Times>,
) {
    Mock::given(method("GET"))
        .and(path(format!("/dist/{}/nuget.exe", version)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content))
        .expect(calls)
        .mount(server)
        .await;
}

/// Respond to any executable request with a status code
pub async fn mock_exe_status(server: &MockServer, version: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/dist/{}/nuget.exe", version)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serve a version index listing the given stable releases
pub async fn mock_version_index(server: &MockServer, versions: &[&str]) {
    let entries: Vec<serde_json::Value> = versions
        .iter()
        .map(|version| {
            serde_json::json!({
                "displayName": "nuget.exe",
                "version": version,
                "url": format!("{}/dist/{}/nuget.exe", server.uri(), version),
                "releasedate": "2024-01-01T00:00:00Z"
            })
        })
        .collect();

    let body = serde_json::json!({
        "artifacts": [{
            "name": "win-x86-commandline",
            "displayName": "nuget.exe - Windows x86 Commandline",
            "versions": entries
        }]
    });

    Mock::given(method("GET"))
        .and(path(INDEX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Index URL on the mock server
pub fn index_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), INDEX_PATH)
}
