//! Crawler integration tests against a local mock origin.

use urlshortener::crawler::{CrawlError, PageFetcher, build_metadata, parse_head};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARTICLE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>  Example Article  </title>
    <meta name="description" content="A plain description.">
    <meta property="og:title" content="OG Article Title">
    <meta property="og:image" content="/images/cover.png">
    <link rel="icon" href="/static/favicon.ico">
</head>
<body>
    <h1>Ignored</h1>
    <meta property="og:description" content="body metadata must not count">
</body>
</html>"#;

#[tokio::test]
async fn test_fetch_and_extract_article_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE_PAGE))
        .mount(&server)
        .await;

    let url = format!("{}/article", server.uri());
    let page = PageFetcher::new().unwrap().fetch(&url).await.unwrap();
    let head = parse_head(&page.body);
    let metadata = build_metadata(&page.final_url, &head);

    assert_eq!(metadata.final_url, url);
    assert_eq!(metadata.title, "OG Article Title");
    assert_eq!(metadata.description, "A plain description.");
    assert_eq!(metadata.image, format!("{}/images/cover.png", server.uri()));
    assert_eq!(
        metadata.favicon,
        format!("{}/static/favicon.ico", server.uri())
    );
}

#[tokio::test]
async fn test_fetch_rejects_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/gone", server.uri());
    let err = PageFetcher::new().unwrap().fetch(&url).await.unwrap_err();

    match err {
        CrawlError::UnexpectedStatus { status, .. } => assert_eq!(status, 404),
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_caps_oversized_body() {
    let server = MockServer::start().await;

    // Head within the cap, then filler far beyond it.
    let mut body = String::from("<html><head><title>Big Page</title></head><body>");
    body.push_str(&"x".repeat(512 * 1024));
    body.push_str("</body></html>");

    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let url = format!("{}/big", server.uri());
    let page = PageFetcher::new().unwrap().fetch(&url).await.unwrap();

    assert!(page.body.len() <= 256 * 1024 + 4);
    assert_eq!(parse_head(&page.body).title, "Big Page");
}

#[tokio::test]
async fn test_fetch_decodes_declared_charset() {
    let server = MockServer::start().await;

    // "Заголовок" in windows-1251.
    let title_1251: &[u8] = &[0xC7, 0xE0, 0xE3, 0xEE, 0xEB, 0xEE, 0xE2, 0xEE, 0xEA];
    let mut body = b"<html><head><title>".to_vec();
    body.extend_from_slice(title_1251);
    body.extend_from_slice(b"</title></head><body></body></html>");

    Mock::given(method("GET"))
        .and(path("/ru"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body, "text/html; charset=windows-1251"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/ru", server.uri());
    let page = PageFetcher::new().unwrap().fetch(&url).await.unwrap();

    assert_eq!(parse_head(&page.body).title, "Заголовок");
}

#[tokio::test]
async fn test_fetch_follows_redirect_to_final_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", "/new"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Moved Here</title></head><body></body></html>",
        ))
        .mount(&server)
        .await;

    let url = format!("{}/old", server.uri());
    let page = PageFetcher::new().unwrap().fetch(&url).await.unwrap();

    assert_eq!(page.final_url, format!("{}/new", server.uri()));
    assert_eq!(parse_head(&page.body).title, "Moved Here");
}
