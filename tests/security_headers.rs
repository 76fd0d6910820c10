//! End-to-end: real sockets, real hyper, security headers on the wire.

mod common;

use common::{TestServer, header};
use vigil::http::StatusCode;
use vigil::middleware::SecurityHeaders;
use vigil::{ConfigError, Request, Response, Router, Settings};

async fn hello(_req: Request) -> Response {
    Response::text("hello")
}

async fn leaky(_req: Request) -> Response {
    Response::builder()
        .header(
            vigil::http::header::REFERRER_POLICY,
            vigil::http::HeaderValue::from_static("unsafe-url"),
        )
        .text("leaky")
}

async fn broken(_req: Request) -> Result<Response, std::io::Error> {
    Err(std::io::Error::other("boom"))
}

fn app(settings: &Settings) -> Router {
    Router::new()
        .get("/", hello)
        .get("/leaky", leaky)
        .get("/broken", broken)
        .layer(SecurityHeaders::from_settings(settings).unwrap())
}

fn demo_settings() -> Settings {
    Settings::load(concat!(env!("CARGO_MANIFEST_DIR"), "/demos/vigil.toml")).unwrap()
}

#[tokio::test]
async fn every_response_carries_the_headers() {
    let settings = Settings::new()
        .with("referrer_policy", "same-origin")
        .with("expect_ct_max_age", 86_400_i64);
    let server = TestServer::start(app(&settings)).await;

    let raw = server.request("GET", "/").await;
    assert!(raw.starts_with("HTTP/1.1 200 OK"), "{raw}");
    assert_eq!(header(&raw, "referrer-policy"), Some("same-origin"));
    assert_eq!(header(&raw, "expect-ct"), Some("max-age=86400"));
    assert!(raw.ends_with("hello"));

    let raw = server.request("GET", "/does-not-exist").await;
    assert!(raw.starts_with("HTTP/1.1 404 Not Found"), "{raw}");
    assert_eq!(header(&raw, "referrer-policy"), Some("same-origin"));

    server.stop().await;
}

#[tokio::test]
async fn full_settings_file_on_the_wire() {
    let server = TestServer::start(app(&demo_settings())).await;

    let raw = server.request_with("GET", "/", &[("X-Forwarded-Proto", "https")]).await;
    assert_eq!(header(&raw, "referrer-policy"), Some("strict-origin-when-cross-origin"));
    assert_eq!(
        header(&raw, "expect-ct"),
        Some(r#"max-age=86400, enforce, report-uri="https://example.com/ct-report""#),
    );
    assert_eq!(
        header(&raw, "strict-transport-security"),
        Some("max-age=31536000; includeSubDomains; preload"),
    );
    assert_eq!(header(&raw, "x-content-type-options"), Some("nosniff"));
    assert_eq!(header(&raw, "x-xss-protection"), Some("1; mode=block"));
    assert_eq!(header(&raw, "x-frame-options"), Some("DENY"));

    server.stop().await;
}

#[tokio::test]
async fn hsts_needs_the_proxy_to_report_https() {
    let server = TestServer::start(app(&demo_settings())).await;

    let raw = server.request("GET", "/").await;
    assert_eq!(header(&raw, "strict-transport-security"), None);
    assert_eq!(header(&raw, "referrer-policy"), Some("strict-origin-when-cross-origin"));
    assert_eq!(header(&raw, "x-xss-protection"), Some("1; mode=block"));

    let raw = server.request_with("GET", "/", &[("X-Forwarded-Proto", "http")]).await;
    assert_eq!(header(&raw, "strict-transport-security"), None);

    let raw = server.request_with("GET", "/", &[("X-Forwarded-Proto", "https")]).await;
    assert_eq!(
        header(&raw, "strict-transport-security"),
        Some("max-age=31536000; includeSubDomains; preload"),
    );

    server.stop().await;
}

#[tokio::test]
async fn handler_referrer_policy_is_overwritten() {
    let server = TestServer::start(app(&demo_settings())).await;

    let raw = server.request("GET", "/leaky").await;
    assert_eq!(header(&raw, "referrer-policy"), Some("strict-origin-when-cross-origin"));
    assert_eq!(raw.matches("referrer-policy").count(), 1);

    server.stop().await;
}

#[tokio::test]
async fn handler_errors_become_bare_500s() {
    let server = TestServer::start(app(&demo_settings())).await;

    let raw = server.request("GET", "/broken").await;
    assert!(
        raw.starts_with(&format!("HTTP/1.1 {}", StatusCode::INTERNAL_SERVER_ERROR)),
        "{raw}",
    );
    assert_eq!(header(&raw, "referrer-policy"), None);
    assert_eq!(header(&raw, "expect-ct"), None);

    server.stop().await;
}

#[test]
fn environment_settings_are_validated_before_serving() {
    let settings = Settings::from_vars([
        ("REFERRER_POLICY", "same-origin"),
        ("EXPECT_CT_MAX_AGE", "one day"),
    ]);
    let err = SecurityHeaders::from_settings(&settings).unwrap_err();
    assert!(matches!(err, ConfigError::ExpectCtMaxAge));
    assert_eq!(
        vigil::Error::from(err).to_string(),
        "improperly configured: `expect_ct_max_age` is not set or is not an integer",
    );
}
