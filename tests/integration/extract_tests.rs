//! End-to-end extraction through `Colibri::from_config`

use crate::{blocking, url};
use colibri::config::{load_rules, Config};
use colibri::{Colibri, Error, ExprType, Rule, Selector};
use serde_json::json;
use std::io::Write;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INDEX: &str = r#"<html><head><title>Index</title></head><body>
    <ul id="pages">
        <li><a href="/page/1">First</a></li>
        <li><a href="/page/2">Second</a></li>
        <li><a href="/page/3">Third</a></li>
    </ul>
</body></html>"#;

fn page(title: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body><p class=\"price\">{} EUR</p></body></html>",
        title,
        title.len()
    )
}

/// Configuration without the robots gate
fn config() -> Config {
    let mut config = Config::default();
    config.extractor.respect_robots = false;
    config
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(INDEX, "text/html"))
        .mount(server)
        .await;

    for (n, title) in ["One", "Two", "Three"].iter().enumerate() {
        Mock::given(method("GET"))
            .and(path(format!("/page/{}", n + 1)))
            .respond_with(ResponseTemplate::new(200).set_body_raw(page(title), "text/html"))
            .expect(1)
            .mount(server)
            .await;
    }
}

fn follow_rule(base: &str) -> Rule {
    let mut rule = Rule::new(url(base, "/"));
    rule.selectors = vec![
        Selector::new("title", "//title"),
        Selector::new("pages", "#pages a")
            .with_type(ExprType::Css)
            .all()
            .with_selectors(vec![
                Selector::new("page", "/@href")
                    .follow()
                    .with_selectors(vec![
                        Selector::new("title", "//title"),
                        Selector::new("price", "p.price").with_type(ExprType::Css),
                    ]),
                Selector::new("label", "/text()"),
            ]),
    ];
    rule
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extract_and_follow_links() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    let colibri = Colibri::from_config(&config()).unwrap();
    let rule = follow_rule(&base);
    let output = blocking(move || colibri.extract(&rule)).await.unwrap();

    assert_eq!(output.get("title"), Some(&json!("Index")));

    let pages = output.get("pages").unwrap().as_array().unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0]["label"], json!("First"));

    let first = &pages[0]["page"][0];
    assert_eq!(first["response"]["url"], json!(url(&base, "/page/1").as_str()));
    assert_eq!(first["response"]["code"], json!(200));
    assert_eq!(first["data"], json!({"title": "One", "price": "3 EUR"}));
    assert_eq!(pages[2]["page"][0]["data"]["title"], json!("Three"));

    let serialized = output.serializable();
    assert_eq!(serialized["response"]["code"], json!(200));
    assert_eq!(serialized["data"]["title"], json!("Index"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_default_user_agent_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "colibri/0.2"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(INDEX, "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let colibri = Colibri::from_config(&config()).unwrap();
    let rule = Rule::new(url(&server.uri(), "/"));
    let resp = blocking(move || colibri.fetch(&rule)).await.unwrap();
    assert_eq!(resp.status, 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_robots_fetched_once_per_host() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("User-agent: *\nDisallow: /private\n", "text/plain"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let base = server.uri();
    let colibri = Colibri::from_config(&Config::default()).unwrap();
    let rule = follow_rule(&base);
    let private = Rule::new(url(&base, "/private"));

    let (extracted, denied) = blocking(move || {
        let extracted = colibri.extract(&rule).map(|out| out.get("pages").cloned());
        (extracted, colibri.fetch(&private))
    })
    .await;

    let pages = extracted.unwrap().unwrap();
    assert_eq!(pages.as_array().unwrap().len(), 3);
    assert!(matches!(denied, Err(Error::RobotsRestriction { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_robots_server_error_disallows_everything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(INDEX, "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let colibri = Colibri::from_config(&Config::default()).unwrap();
    let rule = Rule::new(url(&server.uri(), "/"));
    let result = blocking(move || colibri.fetch(&rule)).await;
    assert!(matches!(result, Err(Error::RobotsRestriction { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_robots_missing_allows_everything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(INDEX, "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let colibri = Colibri::from_config(&Config::default()).unwrap();
    let rule = Rule::new(url(&server.uri(), "/"));
    let resp = blocking(move || colibri.fetch(&rule)).await.unwrap();
    assert_eq!(resp.status, 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ignore_robots_txt_skips_gate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("User-agent: *\nDisallow: /\n", "text/plain"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(INDEX, "text/html"))
        .mount(&server)
        .await;

    let colibri = Colibri::from_config(&Config::default()).unwrap();
    let mut rule = Rule::new(url(&server.uri(), "/"));
    rule.ignore_robots_txt = true;

    let resp = blocking(move || colibri.fetch(&rule)).await.unwrap();
    assert_eq!(resp.status, 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delay_spaces_followed_requests() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let colibri = Colibri::from_config(&config()).unwrap();
    let mut rule = follow_rule(&server.uri());
    rule.delay = Duration::from_millis(150);

    let elapsed = blocking(move || {
        let start = Instant::now();
        colibri.extract(&rule).unwrap();
        start.elapsed()
    })
    .await;

    assert!(elapsed >= Duration::from_millis(450), "took {:?}", elapsed);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_partial_output_on_failed_follow() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(INDEX, "text/html"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page/1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page("One"), "text/html"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page/2"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8, 1, 2], "image/png"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page/3"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page("Three"), "text/html"))
        .mount(&server)
        .await;

    let base = server.uri();
    let colibri = Colibri::from_config(&config()).unwrap();
    let mut rule = Rule::new(url(&base, "/"));
    rule.selectors = vec![Selector::new("pages", "//ul/li/a/@href")
        .all()
        .follow()
        .with_selectors(vec![Selector::new("title", "//title")])];

    let err = blocking(move || colibri.extract(&rule)).await.err().unwrap();

    let Error::Extraction { output, errors } = err else {
        panic!("expected an extraction error");
    };

    let pages = output.get("pages").unwrap().as_array().unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[1]["data"]["title"], json!("Three"));

    let nested = errors.get_set("pages").unwrap();
    let failed = url(&base, "/page/2");
    assert!(matches!(
        nested.get(failed.as_str()),
        Some(Error::NotMatch { .. })
    ));

    let report = errors.to_json();
    assert!(report["pages"][failed.as_str()].is_string());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rules_file_with_json_and_xml_documents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"feed": "/feed.xml", "items": [{"id": 1}, {"id": 2}]}"#,
            "application/json",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<rss><channel><title>News</title><item><title>A</title></item><item><title>B</title></item></channel></rss>",
            "application/rss+xml",
        ))
        .mount(&server)
        .await;

    let rules = json!({
        "URL": url(&server.uri(), "/api").as_str(),
        "selectors": {
            "ids": {"expr": "/items/*/id", "all": true},
            "feed": {
                "expr": "/feed",
                "follow": true,
                "selectors": {
                    "channel": "//channel/title",
                    "items": {"expr": "//item/title", "all": true}
                }
            }
        }
    });

    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(rules.to_string().as_bytes()).unwrap();

    let config = config();
    let rule = load_rules(file.path(), &config.defaults).unwrap();
    let colibri = Colibri::from_config(&config).unwrap();

    let output = blocking(move || colibri.extract(&rule)).await.unwrap();

    assert_eq!(output.get("ids"), Some(&json!([1, 2])));
    let feed = &output.get("feed").unwrap()[0];
    assert_eq!(feed["data"], json!({"channel": "News", "items": ["A", "B"]}));
}
