//! Security response headers.
//!
//! [`SecurityHeaders`] is built once at startup from validated settings and
//! then stamps every response that comes back through the chain:
//!
//! | Header | When | On an existing value |
//! |---|---|---|
//! | `Referrer-Policy` | always | overwritten |
//! | `Expect-CT` | always | overwritten |
//! | `Strict-Transport-Security` | `secure_hsts_seconds > 0`, HTTPS requests only | kept |
//! | `X-Content-Type-Options` | `secure_content_type_nosniff` | kept |
//! | `X-XSS-Protection` | `secure_browser_xss_filter` | kept |
//! | `X-Frame-Options` | `x_frame_options` set | kept |
//!
//! Behind a TLS-terminating proxy, set `secure_proxy_ssl_header` (for
//! example `["X-Forwarded-Proto", "https"]`) so the middleware can tell which
//! requests arrived over HTTPS. Without it only the request URI's scheme
//! counts, and a plain-HTTP hop never gets HSTS.
//!
//! ```rust,no_run
//! use vigil::{Router, Server, Settings};
//! use vigil::middleware::SecurityHeaders;
//!
//! # async fn run() -> Result<(), vigil::Error> {
//! let headers = SecurityHeaders::from_settings(&Settings::from_env())?;
//! let app = Router::new().layer(headers);
//! Server::bind("0.0.0.0:3000").serve(app).await
//! # }
//! ```

use std::sync::Arc;

use http::header::{
    HeaderMap, HeaderName, HeaderValue, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY,
    X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS, X_XSS_PROTECTION,
};
use http::uri::Scheme;
use tracing::info;

use crate::error::ConfigError;
use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::policy::{ProxySslHeader, SecurityConfig};
use crate::request::Request;
use crate::settings::Settings;

/// `Expect-CT` has no constant in `http`.
pub const EXPECT_CT: HeaderName = HeaderName::from_static("expect-ct");

/// Header values rendered at construction time.
#[derive(Debug)]
struct Rendered {
    referrer_policy: HeaderValue,
    expect_ct: HeaderValue,
    hsts: Option<HeaderValue>,
    nosniff: bool,
    xss_filter: bool,
    frame_options: Option<HeaderValue>,
    proxy_ssl_header: Option<ProxySslHeader>,
}

/// Middleware that sets security headers on every successful response.
///
/// Cloning is cheap; all clones share one set of pre-rendered header values.
#[derive(Clone, Debug)]
pub struct SecurityHeaders {
    inner: Arc<Rendered>,
}

impl SecurityHeaders {
    /// Validates `settings` and builds the middleware.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first invalid setting. Treat it as
    /// fatal: there is no way to serve with a half-valid configuration.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Self::new(&SecurityConfig::from_settings(settings)?)
    }

    /// Builds the middleware from an already-typed config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ExpectCtReportUri`] if the report URI cannot be
    /// carried in a header value, [`ConfigError::HstsSeconds`] likewise for
    /// the HSTS value.
    pub fn new(config: &SecurityConfig) -> Result<Self, ConfigError> {
        let expect_ct = config.expect_ct.header_value();
        let rendered = Rendered {
            referrer_policy: HeaderValue::from_static(config.referrer_policy.as_str()),
            expect_ct: HeaderValue::try_from(expect_ct.as_str())
                .map_err(|_| ConfigError::ExpectCtReportUri)?,
            hsts: config
                .hsts
                .as_ref()
                .map(|h| HeaderValue::try_from(h.header_value()))
                .transpose()
                .map_err(|_| ConfigError::HstsSeconds)?,
            nosniff: config.content_type_nosniff,
            xss_filter: config.browser_xss_filter,
            frame_options: config.frame_options.map(|f| HeaderValue::from_static(f.as_str())),
            proxy_ssl_header: config.proxy_ssl_header.clone(),
        };

        info!(
            referrer_policy = %config.referrer_policy,
            expect_ct = %expect_ct,
            hsts = rendered.hsts.is_some(),
            nosniff = rendered.nosniff,
            xss_filter = rendered.xss_filter,
            proxy_ssl_header = ?config.proxy_ssl_header.as_ref().map(|p| p.name.as_str()),
            frame_options = ?config.frame_options,
            "security headers enabled"
        );

        Ok(Self { inner: Arc::new(rendered) })
    }

    /// Whether `req` arrived over HTTPS.
    ///
    /// The configured proxy header decides when present; otherwise the URI
    /// scheme does.
    pub fn is_secure(&self, req: &Request) -> bool {
        self.inner
            .proxy_ssl_header
            .as_ref()
            .and_then(|p| p.matches(req.headers()))
            .unwrap_or_else(|| req.uri().scheme() == Some(&Scheme::HTTPS))
    }

    /// Writes the configured headers into `headers`. HSTS is only written
    /// when `secure` is true.
    pub fn apply(&self, headers: &mut HeaderMap, secure: bool) {
        let r = &self.inner;
        headers.insert(REFERRER_POLICY, r.referrer_policy.clone());
        headers.insert(EXPECT_CT, r.expect_ct.clone());

        if let Some(hsts) = r.hsts.as_ref().filter(|_| secure) {
            headers.entry(STRICT_TRANSPORT_SECURITY).or_insert_with(|| hsts.clone());
        }
        if r.nosniff {
            headers
                .entry(X_CONTENT_TYPE_OPTIONS)
                .or_insert_with(|| HeaderValue::from_static("nosniff"));
        }
        if r.xss_filter {
            headers
                .entry(X_XSS_PROTECTION)
                .or_insert_with(|| HeaderValue::from_static("1; mode=block"));
        }
        if let Some(frame) = &r.frame_options {
            headers.entry(X_FRAME_OPTIONS).or_insert_with(|| frame.clone());
        }
    }
}

impl Middleware for SecurityHeaders {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let this = self.clone();
        let secure = this.is_secure(&req);
        Box::pin(async move {
            let mut res = next.run(req).await?;
            this.apply(res.headers_mut(), secure);
            Ok(res)
        })
    }
}
