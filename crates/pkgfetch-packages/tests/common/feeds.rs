//! Mock feeds

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate, Times};

/// Path of the JSON service index
pub const V3_INDEX_PATH: &str = "/v3/index.json";

/// Path of the flat container
pub const FLAT_CONTAINER_PATH: &str = "/v3-flatcontainer/";

/// Path of the OData feed
pub const V2_PATH: &str = "/api/v2";

/// `Authorization` header for user `user` with password `pass`
pub const BASIC_AUTH: &str = "Basic dXNlcjpwYXNz";

pub fn v3_index_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), V3_INDEX_PATH)
}

pub fn v2_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), V2_PATH)
}

fn service_index(server: &MockServer) -> serde_json::Value {
    serde_json::json!({
        "version": "3.0.0",
        "resources": [
            { "@id": format!("{}/v3/query", server.uri()), "@type": "SearchQueryService" },
            {
                "@id": format!("{}{}", server.uri(), FLAT_CONTAINER_PATH),
                "@type": ["PackageBaseAddress/3.0.0"]
            }
        ]
    })
}

/// Serve the service index
pub async fn mock_v3_index(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(V3_INDEX_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(service_index(server)))
        .mount(server)
        .await;
}

/// Serve the service index only to requests carrying [`BASIC_AUTH`]
pub async fn mock_v3_index_with_auth(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(V3_INDEX_PATH))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(service_index(server)))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(V3_INDEX_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(server)
        .await;
}

/// Serve the version list of `id` from the flat container
pub async fn mock_v3_versions(server: &MockServer, id: &str, versions: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("{}{}/index.json", FLAT_CONTAINER_PATH, id.to_lowercase())))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "versions": versions })))
        .mount(server)
        .await;
}

/// Serve the archive of `id` at `version`, expecting `calls` downloads
pub async fn mock_v3_package(
    server: &MockServer,
    id: &str,
    version: &str,
    content: Vec<u8>,
    calls: impl Into<Times>,
) {
    let lower = id.to_lowercase();
    Mock::given(method("GET"))
        .and(path(format!(
            "{0}{1}/{2}/{1}.{2}.nupkg",
            FLAT_CONTAINER_PATH, lower, version
        )))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content))
        .expect(calls)
        .mount(server)
        .await;
}

/// Fail the test if the server sees any request
pub async fn expect_no_requests(server: &MockServer) {
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

fn atom_page(entries: &[&str], next: Option<&str>) -> String {
    let mut body = String::from(
        r#"<?xml version="1.0" encoding="utf-8"?>
<feed xml:base="https://feed.example/api/v2" xmlns="http://www.w3.org/2005/Atom" xmlns:d="http://schemas.microsoft.com/ado/2007/08/dataservices" xmlns:m="http://schemas.microsoft.com/ado/2007/08/dataservices/metadata">
  <title type="text">FindPackagesById</title>
"#,
    );
    for version in entries {
        body.push_str(&format!(
            "  <entry>\n    <m:properties>\n      <d:Version>{}</d:Version>\n    </m:properties>\n  </entry>\n",
            version
        ));
    }
    if let Some(next) = next {
        body.push_str(&format!("  <link rel=\"next\" href=\"{}\" />\n", next.replace('&', "&amp;")));
    }
    body.push_str("</feed>\n");
    body
}

/// Serve an OData feed listing `id` over two pages
pub async fn mock_v2_paged(server: &MockServer, id: &str, first: &[&str], second: &[&str]) {
    Mock::given(method("HEAD"))
        .and(path(V2_PATH))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/xml"))
        .mount(server)
        .await;

    let find_path = format!("{}/FindPackagesById()", V2_PATH);
    let next = format!("{}{}?id='{}'&$skiptoken=2", server.uri(), find_path, id);

    Mock::given(method("GET"))
        .and(path(find_path.as_str()))
        .and(query_param("$skiptoken", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/atom+xml")
                .set_body_string(atom_page(second, None)),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(find_path.as_str()))
        .and(query_param("id", format!("'{}'", id)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/atom+xml")
                .set_body_string(atom_page(first, Some(&next))),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// Serve the OData download of `id` at `version`
pub async fn mock_v2_package(server: &MockServer, id: &str, version: &str, content: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("{}/package/{}/{}", V2_PATH, id, version)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content))
        .expect(1)
        .mount(server)
        .await;
}
