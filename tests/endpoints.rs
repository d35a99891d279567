//! Range, redirect and echo behaviour over a real socket.

use reqwest::{header, StatusCode};

mod common;

#[tokio::test]
async fn range_serves_whole_and_partial_bodies() {
    let server = common::start_server(|_| {}).await;
    let client = common::client();

    let response = client.get(server.url("/range/10")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&response.bytes().await.unwrap()[..], b"abcdefghij");

    let response = client
        .get(server.url("/range/10"))
        .header(header::RANGE, "bytes=2-5")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 2-5/10");
    assert_eq!(&response.bytes().await.unwrap()[..], b"cdef");

    let response = client
        .get(server.url("/range/10"))
        .header(header::RANGE, "bytes=100-200")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn redirect_chain_terminates_at_get() {
    let server = common::start_server(|_| {}).await;
    let client = common::client();

    for n in 0..=5u32 {
        let mut path = format!("/redirect/{n}");
        let mut hops = 0;
        loop {
            let response = client.get(server.url(&path)).send().await.unwrap();
            if path == "/get" {
                assert_eq!(response.status(), StatusCode::OK);
                break;
            }
            assert_eq!(response.status(), StatusCode::FOUND);
            path = response.headers()[header::LOCATION]
                .to_str()
                .unwrap()
                .to_owned();
            hops += 1;
        }
        assert_eq!(hops, n.max(1), "redirect/{n}");
    }
}

#[tokio::test]
async fn redirect_to_is_guarded_by_the_allow_list() {
    let server = common::start_server(|config| {
        config.routing.allowed_redirect_domains = vec!["httpbingo.org".into()];
    })
    .await;
    let client = common::client();

    let response = client
        .get(server.url("/redirect-to?url=https://evil.example"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .get(server.url("/redirect-to?url=https://httpbingo.org/get&status_code=303"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://httpbingo.org/get"
    );
}

#[tokio::test]
async fn echo_reports_the_peer_as_origin() {
    let server = common::start_server(|config| {
        config.routing.prefix = "/api".into();
    })
    .await;

    let json: serde_json::Value = common::client()
        .get(server.url("/api/get?q=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(json["origin"], "127.0.0.1");
    assert_eq!(json["args"]["q"][0], "1");
    assert_eq!(json["url"], format!("http://{}/api/get?q=1", server.addr));
}
