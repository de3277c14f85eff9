use std::thread;

use tiny_http::{Response, Server};

use winecap::error::Error;
use winecap::feed::{GithubFeed, ReleaseFeed};

/// Serve one body with a fixed status on a random local port.
fn spawn_server(body: &'static str, status: u16) -> String {
    let server = Server::http("127.0.0.1:0").expect("bind test http server");
    let addr = server.server_addr().to_ip().expect("ip listener");
    let url = format!("http://{addr}/releases/latest");

    thread::spawn(move || {
        for request in server.incoming_requests() {
            let _ = request.respond(Response::from_string(body).with_status_code(status));
        }
    });

    url
}

#[test]
fn release_document_parses_into_assets() {
    // GitHub's schema carries far more fields than we consume; extras must
    // be ignored, and the download URL comes from browser_download_url.
    let body = r#"{
        "tag_name": "1.2.9",
        "name": "umu-launcher 1.2.9",
        "prerelease": false,
        "assets": [
            {
                "name": "python3-umu-launcher_1.2.9-1_amd64_ubuntu-22.04.deb",
                "browser_download_url": "https://releases.invalid/a.deb",
                "size": 123456,
                "content_type": "application/vnd.debian.binary-package"
            }
        ]
    }"#;
    let url = spawn_server(body, 200);

    let release = GithubFeed::with_url(url).latest_release().expect("query feed");

    assert_eq!(release.tag_name, "1.2.9");
    assert_eq!(release.assets.len(), 1);
    assert_eq!(
        release.assets[0].name,
        "python3-umu-launcher_1.2.9-1_amd64_ubuntu-22.04.deb"
    );
    assert_eq!(release.assets[0].url, "https://releases.invalid/a.deb");
}

#[test]
fn feed_error_status_is_a_network_failure() {
    let url = spawn_server("rate limited", 403);

    let err = GithubFeed::with_url(url)
        .latest_release()
        .expect_err("non-2xx must fail");

    let network = err
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<Error>(), Some(Error::Network { .. })));
    assert!(network, "expected Network error, got: {err:#}");
}

#[test]
fn malformed_feed_document_is_an_error() {
    let url = spawn_server(r#"{"tag_name": 7}"#, 200);

    let err = GithubFeed::with_url(url)
        .latest_release()
        .expect_err("schema mismatch must fail");
    assert!(format!("{err:#}").contains("parse"), "got: {err:#}");
}
