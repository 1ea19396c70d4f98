//! HTTP transport behaviour: redirects, body limits, cookies and timeouts

use crate::{blocking, url};
use colibri::crawler::{HttpClient, Transport};
use colibri::{Error, Rule};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mounts `/redirect/n` answering 302 to `/redirect/n-1`, down to `/redirect/0`
async fn mount_redirect_chain(server: &MockServer, length: usize) {
    for n in 1..=length {
        Mock::given(method("GET"))
            .and(path(format!("/redirect/{}", n)))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", format!("/redirect/{}", n - 1).as_str()),
            )
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/redirect/0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("done", "text/plain"))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_redirects_within_limit_are_recorded() {
    let server = MockServer::start().await;
    mount_redirect_chain(&server, 3).await;
    let base = server.uri();

    let mut rule = Rule::new(url(&base, "/redirect/3"));
    rule.redirects = 5;

    let resp = blocking(move || HttpClient::new().execute(&rule))
        .await
        .expect("redirect chain should be followed");

    assert_eq!(resp.status, 200);
    assert_eq!(resp.url, url(&base, "/redirect/0"));
    assert_eq!(
        resp.redirects,
        vec![
            url(&base, "/redirect/3"),
            url(&base, "/redirect/2"),
            url(&base, "/redirect/1"),
        ]
    );
    assert_eq!(resp.body, b"done");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_redirects_exactly_at_limit() {
    let server = MockServer::start().await;
    mount_redirect_chain(&server, 1).await;
    let base = server.uri();

    let mut rule = Rule::new(url(&base, "/redirect/1"));
    rule.redirects = 1;

    let resp = blocking(move || HttpClient::new().execute(&rule)).await.unwrap();
    assert_eq!(resp.redirects, vec![url(&base, "/redirect/1")]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_redirect_limit_exceeded() {
    let server = MockServer::start().await;
    mount_redirect_chain(&server, 3).await;
    let base = server.uri();

    let mut rule = Rule::new(url(&base, "/redirect/3"));
    rule.redirects = 1;

    let err = blocking(move || HttpClient::new().execute(&rule))
        .await
        .err()
        .unwrap();

    match err {
        Error::MaxRedirects { max, redirects } => {
            assert_eq!(max, 1);
            assert_eq!(redirects, vec![url(&base, "/redirect/3")]);
        }
        other => panic!("expected MaxRedirects, got {other}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_body_over_limit_is_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![b'x'; 1000], "text/plain"))
        .mount(&server)
        .await;

    let mut rule = Rule::new(url(&server.uri(), "/big"));
    rule.response_body_size = 100;

    let err = blocking(move || HttpClient::new().execute(&rule))
        .await
        .err()
        .unwrap();

    match err {
        Error::BodyTooLarge { limit, response } => {
            assert_eq!(limit, 100);
            assert_eq!(response.body.len(), 100);
            assert_eq!(response.status, 200);
        }
        other => panic!("expected BodyTooLarge, got {other}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_body_within_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/small"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![b'x'; 100], "text/plain"))
        .mount(&server)
        .await;

    let mut rule = Rule::new(url(&server.uri(), "/small"));
    rule.response_body_size = 100;

    let resp = blocking(move || HttpClient::new().execute(&rule)).await.unwrap();
    assert_eq!(resp.body.len(), 100);
    assert_eq!(resp.content_type(), "text/plain");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cookies_shared_between_rules() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "session=abc; Path=/"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("welcome", "text/plain"))
        .mount(&server)
        .await;

    let base = server.uri();
    let status = blocking(move || {
        let client = HttpClient::new();

        let mut login = Rule::new(url(&base, "/login"));
        login.cookies = true;
        client.execute(&login).unwrap();

        let mut profile = Rule::new(url(&base, "/profile"));
        profile.cookies = true;
        let with_cookies = client.execute(&profile).unwrap().status;

        client.clear();
        let after_clear = client.execute(&profile).unwrap().status;

        (with_cookies, after_clear)
    })
    .await;

    assert_eq!(status, (200, 404));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cookies_disabled_on_rule() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "session=abc; Path=/"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let base = server.uri();
    let status = blocking(move || {
        let client = HttpClient::new();
        client.execute(&Rule::new(url(&base, "/login"))).unwrap();
        client.execute(&Rule::new(url(&base, "/profile"))).unwrap().status
    })
    .await;

    assert_eq!(status, 404);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let mut rule = Rule::new(url(&server.uri(), "/slow"));
    rule.timeout = Duration::from_millis(50);

    let err = blocking(move || HttpClient::new().execute(&rule))
        .await
        .err()
        .unwrap();

    assert!(matches!(err, Error::Transport(e) if e.is_timeout()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_method_and_headers_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(header("x-token", "secret"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let mut rule = Rule::new(url(&server.uri(), "/submit"));
    rule.method = reqwest::Method::POST;
    rule.header.insert("x-token", "secret".parse().unwrap());

    let resp = blocking(move || HttpClient::new().execute(&rule)).await.unwrap();
    assert_eq!(resp.status, 201);
}
