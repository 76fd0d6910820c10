//! Typed, validated security configuration.
//!
//! [`SecurityConfig::from_settings`] is the one place settings are checked.
//! Each check maps to exactly one [`ConfigError`] variant, so a failed start
//! always names the setting at fault.
//!
//! ```rust
//! use vigil::{ReferrerPolicy, SecurityConfig, Settings};
//!
//! let settings = Settings::new()
//!     .with("referrer_policy", "strict-origin-when-cross-origin")
//!     .with("expect_ct_max_age", 86_400_i64)
//!     .with("expect_ct_enforce", true);
//!
//! let config = SecurityConfig::from_settings(&settings).unwrap();
//! assert_eq!(config.referrer_policy, ReferrerPolicy::StrictOriginWhenCrossOrigin);
//! assert_eq!(config.expect_ct.to_string(), "max-age=86400, enforce");
//! ```

use std::fmt;
use std::str::FromStr;

use http::header::{HeaderMap, HeaderName};
use toml::Value;
use url::Url;

use crate::error::ConfigError;
use crate::settings::Settings;

// ── Referrer-Policy ───────────────────────────────────────────────────────────

/// A `Referrer-Policy` value (W3C Referrer Policy §3).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ReferrerPolicy {
    NoReferrer,
    NoReferrerWhenDowngrade,
    Origin,
    OriginWhenCrossOrigin,
    SameOrigin,
    StrictOrigin,
    StrictOriginWhenCrossOrigin,
    UnsafeUrl,
}

impl ReferrerPolicy {
    pub const ALL: [Self; 8] = [
        Self::NoReferrer,
        Self::NoReferrerWhenDowngrade,
        Self::Origin,
        Self::OriginWhenCrossOrigin,
        Self::SameOrigin,
        Self::StrictOrigin,
        Self::StrictOriginWhenCrossOrigin,
        Self::UnsafeUrl,
    ];

    /// Returns the header token (e.g. `"same-origin"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoReferrer                  => "no-referrer",
            Self::NoReferrerWhenDowngrade     => "no-referrer-when-downgrade",
            Self::Origin                      => "origin",
            Self::OriginWhenCrossOrigin       => "origin-when-cross-origin",
            Self::SameOrigin                  => "same-origin",
            Self::StrictOrigin                => "strict-origin",
            Self::StrictOriginWhenCrossOrigin => "strict-origin-when-cross-origin",
            Self::UnsafeUrl                   => "unsafe-url",
        }
    }
}

/// Parses a policy token. Case-sensitive: `"Origin"` is not a policy.
impl FromStr for ReferrerPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or(ConfigError::ReferrerPolicy)
    }
}

impl fmt::Display for ReferrerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Expect-CT ─────────────────────────────────────────────────────────────────

/// The `Expect-CT` directives.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExpectCt {
    pub max_age: i64,
    pub enforce: bool,
    /// Kept exactly as configured; only checked, never normalised.
    pub report_uri: Option<String>,
}

impl ExpectCt {
    /// Renders the header value: `max-age=<n>[, enforce][, report-uri="<uri>"]`.
    ///
    /// Directive order is fixed. The output depends on nothing but `self`.
    pub fn header_value(&self) -> String {
        let mut value = format!("max-age={}", self.max_age);
        if self.enforce {
            value.push_str(", enforce");
        }
        if let Some(uri) = &self.report_uri {
            value.push_str(&format!(", report-uri=\"{uri}\""));
        }
        value
    }
}

impl fmt::Display for ExpectCt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_value())
    }
}

// ── Strict-Transport-Security ─────────────────────────────────────────────────

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Hsts {
    pub max_age: u64,
    pub include_subdomains: bool,
    pub preload: bool,
}

impl Hsts {
    pub fn header_value(&self) -> String {
        let mut value = format!("max-age={}", self.max_age);
        if self.include_subdomains {
            value.push_str("; includeSubDomains");
        }
        if self.preload {
            value.push_str("; preload");
        }
        value
    }
}

// ── X-Frame-Options ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameOptions {
    Deny,
    SameOrigin,
}

impl FrameOptions {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deny       => "DENY",
            Self::SameOrigin => "SAMEORIGIN",
        }
    }
}

/// Case-insensitive: `deny` and `DENY` are the same option.
impl FromStr for FrameOptions {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("DENY") {
            Ok(Self::Deny)
        } else if s.eq_ignore_ascii_case("SAMEORIGIN") {
            Ok(Self::SameOrigin)
        } else {
            Err(ConfigError::XFrameOptions)
        }
    }
}

// ── Proxy SSL header ──────────────────────────────────────────────────────────

/// The request header a TLS-terminating proxy sets, and the value meaning HTTPS.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProxySslHeader {
    pub name: HeaderName,
    pub value: String,
}

impl ProxySslHeader {
    /// `name` may be a plain header name (`X-Forwarded-Proto`) or the CGI
    /// form (`HTTP_X_FORWARDED_PROTO`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SecureProxySslHeader`] for an invalid header
    /// name or an empty value.
    pub fn new(name: &str, value: &str) -> Result<Self, ConfigError> {
        let name = match name.get(..5) {
            Some(prefix) if prefix.eq_ignore_ascii_case("HTTP_") => &name[5..],
            _ => name,
        };
        let name = HeaderName::from_bytes(name.replace('_', "-").as_bytes())
            .map_err(|_| ConfigError::SecureProxySslHeader)?;
        if value.trim().is_empty() {
            return Err(ConfigError::SecureProxySslHeader);
        }
        Ok(Self { name, value: value.trim().to_owned() })
    }

    /// Whether `headers` mark the request as HTTPS; `None` when the proxy
    /// header is absent. Only the first comma-separated value counts.
    pub fn matches(&self, headers: &HeaderMap) -> Option<bool> {
        let raw = headers.get(&self.name)?;
        let first = raw.to_str().ok().and_then(|v| v.split(',').next()).unwrap_or("");
        Some(first.trim() == self.value)
    }
}

// ── SecurityConfig ────────────────────────────────────────────────────────────

/// Everything the security-header middleware needs, already validated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecurityConfig {
    pub referrer_policy: ReferrerPolicy,
    pub expect_ct: ExpectCt,
    /// `None` unless `secure_hsts_seconds` is greater than zero.
    pub hsts: Option<Hsts>,
    pub content_type_nosniff: bool,
    /// `X-XSS-Protection: 1; mode=block`.
    pub browser_xss_filter: bool,
    pub frame_options: Option<FrameOptions>,
    /// Decides which requests count as HTTPS for HSTS.
    pub proxy_ssl_header: Option<ProxySslHeader>,
}

impl SecurityConfig {
    /// A config with the two mandatory headers and nothing else.
    pub fn new(referrer_policy: ReferrerPolicy, expect_ct_max_age: i64) -> Self {
        Self {
            referrer_policy,
            expect_ct: ExpectCt { max_age: expect_ct_max_age, enforce: false, report_uri: None },
            hsts: None,
            content_type_nosniff: false,
            browser_xss_filter: false,
            frame_options: None,
            proxy_ssl_header: None,
        }
    }

    /// Validates `settings` and builds the typed config.
    ///
    /// Checks run in a fixed order and stop at the first failure:
    /// `referrer_policy`, `expect_ct_max_age`, `expect_ct_report_uri`,
    /// `expect_ct_enforce`, then the optional HSTS, nosniff, XSS-filter, frame
    /// and proxy-header settings.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] variant naming the first invalid setting.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let referrer_policy = match settings.get("referrer_policy") {
            Some(Value::String(s)) => s.parse::<ReferrerPolicy>()?,
            _ => return Err(ConfigError::ReferrerPolicy),
        };

        let max_age = match settings.get("expect_ct_max_age") {
            Some(Value::Integer(n)) => *n,
            _ => return Err(ConfigError::ExpectCtMaxAge),
        };

        let report_uri = match settings.get("expect_ct_report_uri") {
            None => None,
            Some(Value::String(s)) if is_absolute_url(s) => Some(s.clone()),
            Some(_) => return Err(ConfigError::ExpectCtReportUri),
        };

        let enforce = match settings.get("expect_ct_enforce") {
            None => false,
            Some(Value::Boolean(b)) => *b,
            Some(_) => return Err(ConfigError::ExpectCtEnforce),
        };

        let hsts_seconds = match settings.get("secure_hsts_seconds") {
            None => 0,
            Some(Value::Integer(n)) => u64::try_from(*n).map_err(|_| ConfigError::HstsSeconds)?,
            Some(_) => return Err(ConfigError::HstsSeconds),
        };
        let include_subdomains = flag(settings, "secure_hsts_include_subdomains")?;
        let preload = flag(settings, "secure_hsts_preload")?;
        let hsts = (hsts_seconds > 0).then_some(Hsts {
            max_age: hsts_seconds,
            include_subdomains,
            preload,
        });

        let content_type_nosniff = flag(settings, "secure_content_type_nosniff")?;
        let browser_xss_filter = flag(settings, "secure_browser_xss_filter")?;

        let frame_options = match settings.get("x_frame_options") {
            None => None,
            Some(Value::String(s)) => Some(s.parse::<FrameOptions>()?),
            Some(_) => return Err(ConfigError::XFrameOptions),
        };

        let proxy_ssl_header = match settings.get("secure_proxy_ssl_header") {
            None => None,
            Some(Value::Array(pair)) => match pair.as_slice() {
                [Value::String(name), Value::String(value)] => Some(ProxySslHeader::new(name, value)?),
                _ => return Err(ConfigError::SecureProxySslHeader),
            },
            Some(_) => return Err(ConfigError::SecureProxySslHeader),
        };

        Ok(Self {
            referrer_policy,
            expect_ct: ExpectCt { max_age, enforce, report_uri },
            hsts,
            content_type_nosniff,
            browser_xss_filter,
            frame_options,
            proxy_ssl_header,
        })
    }
}

/// An optional boolean setting; absent means `false`.
fn flag(settings: &Settings, key: &'static str) -> Result<bool, ConfigError> {
    match settings.get(key) {
        None => Ok(false),
        Some(Value::Boolean(b)) => Ok(*b),
        Some(_) => Err(ConfigError::NotBoolean(key)),
    }
}

/// A report endpoint must be a web or ftp URL with a host, written without whitespace.
fn is_absolute_url(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    match Url::parse(s) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https" | "ftp" | "ftps")
                && url.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Settings {
        Settings::new()
            .with("referrer_policy", "strict-origin-when-cross-origin")
            .with("expect_ct_max_age", 86_400_i64)
    }

    #[test]
    fn every_listed_policy_parses_and_round_trips() {
        for policy in ReferrerPolicy::ALL {
            assert_eq!(policy.as_str().parse::<ReferrerPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn unknown_or_miscased_policies_are_rejected() {
        for bad in ["", "none", "Origin", "unsafe_url", "same-origin "] {
            let settings = base().with("referrer_policy", bad);
            assert!(
                matches!(SecurityConfig::from_settings(&settings), Err(ConfigError::ReferrerPolicy)),
                "{bad:?} should be rejected",
            );
        }
    }

    #[test]
    fn missing_or_non_string_policy_is_rejected() {
        let settings = Settings::new().with("expect_ct_max_age", 86_400_i64);
        assert!(matches!(SecurityConfig::from_settings(&settings), Err(ConfigError::ReferrerPolicy)));

        let settings = base().with("referrer_policy", 3_i64);
        assert!(matches!(SecurityConfig::from_settings(&settings), Err(ConfigError::ReferrerPolicy)));
    }

    #[test]
    fn max_age_must_be_present_and_an_integer() {
        let missing = Settings::new().with("referrer_policy", "origin");
        assert!(matches!(SecurityConfig::from_settings(&missing), Err(ConfigError::ExpectCtMaxAge)));

        for bad in [Value::from("86400"), Value::Float(86400.0), Value::Boolean(true)] {
            let settings = base().with("expect_ct_max_age", bad);
            assert!(matches!(SecurityConfig::from_settings(&settings), Err(ConfigError::ExpectCtMaxAge)));
        }
    }

    #[test]
    fn report_uri_must_be_an_absolute_url() {
        for bad in [
            "",
            "not a url",
            "/relative/report",
            "example.com/report",
            "mailto:security@example.com",
            "https://",
            "https://example.com/ report",
        ] {
            let settings = base().with("expect_ct_report_uri", bad);
            assert!(
                matches!(SecurityConfig::from_settings(&settings), Err(ConfigError::ExpectCtReportUri)),
                "{bad:?} should be rejected",
            );
        }

        let settings = base().with("expect_ct_report_uri", 42_i64);
        assert!(matches!(SecurityConfig::from_settings(&settings), Err(ConfigError::ExpectCtReportUri)));
    }

    #[test]
    fn enforce_must_be_a_boolean() {
        for bad in [Value::from("true"), Value::Integer(1)] {
            let settings = base().with("expect_ct_enforce", bad);
            assert!(matches!(SecurityConfig::from_settings(&settings), Err(ConfigError::ExpectCtEnforce)));
        }
    }

    #[test]
    fn checks_run_in_order() {
        let settings = Settings::new()
            .with("referrer_policy", "bogus")
            .with("expect_ct_max_age", "bogus")
            .with("expect_ct_report_uri", "bogus");
        assert!(matches!(SecurityConfig::from_settings(&settings), Err(ConfigError::ReferrerPolicy)));

        let settings = base()
            .with("expect_ct_report_uri", "bogus")
            .with("expect_ct_enforce", "bogus");
        assert!(matches!(SecurityConfig::from_settings(&settings), Err(ConfigError::ExpectCtReportUri)));
    }

    #[test]
    fn error_messages_name_the_setting() {
        let settings = base().with("expect_ct_enforce", "yes");
        let err = SecurityConfig::from_settings(&settings).unwrap_err();
        assert_eq!(err.to_string(), "`expect_ct_enforce` must be a boolean");
    }

    #[test]
    fn expect_ct_max_age_only() {
        let config = SecurityConfig::from_settings(&base()).unwrap();
        assert_eq!(config.expect_ct.header_value(), "max-age=86400");
    }

    #[test]
    fn expect_ct_with_enforce() {
        let config = SecurityConfig::from_settings(&base().with("expect_ct_enforce", true)).unwrap();
        assert_eq!(config.expect_ct.header_value(), "max-age=86400, enforce");
    }

    #[test]
    fn expect_ct_with_report_uri() {
        let settings = base().with("expect_ct_report_uri", "https://example.com/report");
        let config = SecurityConfig::from_settings(&settings).unwrap();
        assert_eq!(
            config.expect_ct.header_value(),
            r#"max-age=86400, report-uri="https://example.com/report""#,
        );
    }

    #[test]
    fn expect_ct_with_everything() {
        let settings = base()
            .with("expect_ct_max_age", 604_800_i64)
            .with("expect_ct_enforce", true)
            .with("expect_ct_report_uri", "https://example.com/r");
        let config = SecurityConfig::from_settings(&settings).unwrap();
        assert_eq!(
            config.expect_ct.header_value(),
            r#"max-age=604800, enforce, report-uri="https://example.com/r""#,
        );
    }

    #[test]
    fn expect_ct_explicit_false_enforce_is_omitted() {
        let config = SecurityConfig::from_settings(&base().with("expect_ct_enforce", false)).unwrap();
        assert_eq!(config.expect_ct.header_value(), "max-age=86400");
    }

    #[test]
    fn report_uri_is_embedded_verbatim() {
        let settings = base().with("expect_ct_report_uri", "https://Example.COM");
        let config = SecurityConfig::from_settings(&settings).unwrap();
        assert_eq!(config.expect_ct.header_value(), r#"max-age=86400, report-uri="https://Example.COM""#);
    }

    #[test]
    fn expect_ct_rendering_is_deterministic() {
        let expect_ct = ExpectCt {
            max_age: 30,
            enforce: true,
            report_uri: Some("https://example.com/r".to_owned()),
        };
        assert_eq!(expect_ct.header_value(), expect_ct.header_value());
        assert_eq!(expect_ct.to_string(), expect_ct.header_value());
    }

    #[test]
    fn optional_headers_default_off() {
        let config = SecurityConfig::from_settings(&base()).unwrap();
        assert_eq!(config, SecurityConfig::new(ReferrerPolicy::StrictOriginWhenCrossOrigin, 86_400));
    }

    #[test]
    fn hsts_is_built_from_its_three_settings() {
        let settings = base()
            .with("secure_hsts_seconds", 31_536_000_i64)
            .with("secure_hsts_include_subdomains", true)
            .with("secure_hsts_preload", true);
        let hsts = SecurityConfig::from_settings(&settings).unwrap().hsts.unwrap();
        assert_eq!(hsts.header_value(), "max-age=31536000; includeSubDomains; preload");
    }

    #[test]
    fn zero_hsts_seconds_disables_hsts() {
        let settings = base().with("secure_hsts_seconds", 0_i64).with("secure_hsts_preload", true);
        assert_eq!(SecurityConfig::from_settings(&settings).unwrap().hsts, None);
    }

    #[test]
    fn hsts_settings_are_type_checked() {
        let settings = base().with("secure_hsts_seconds", -1_i64);
        assert!(matches!(SecurityConfig::from_settings(&settings), Err(ConfigError::HstsSeconds)));

        let settings = base().with("secure_hsts_preload", "yes");
        assert!(matches!(
            SecurityConfig::from_settings(&settings),
            Err(ConfigError::NotBoolean("secure_hsts_preload")),
        ));
    }

    #[test]
    fn xss_filter_is_an_optional_flag() {
        let config = SecurityConfig::from_settings(&base().with("secure_browser_xss_filter", true)).unwrap();
        assert!(config.browser_xss_filter);

        let settings = base().with("secure_browser_xss_filter", "on");
        assert!(matches!(
            SecurityConfig::from_settings(&settings),
            Err(ConfigError::NotBoolean("secure_browser_xss_filter")),
        ));
    }

    #[test]
    fn proxy_ssl_header_accepts_cgi_and_plain_names() {
        let pair = |name: &str| Value::Array(vec![Value::from(name), Value::from("https")]);

        for name in ["HTTP_X_FORWARDED_PROTO", "X-Forwarded-Proto", "x_forwarded_proto"] {
            let settings = base().with("secure_proxy_ssl_header", pair(name));
            let header = SecurityConfig::from_settings(&settings).unwrap().proxy_ssl_header.unwrap();
            assert_eq!(header.name, "x-forwarded-proto");
            assert_eq!(header.value, "https");
        }
    }

    #[test]
    fn proxy_ssl_header_must_be_a_pair_of_strings() {
        for bad in [
            Value::from("X-Forwarded-Proto"),
            Value::Array(vec![Value::from("X-Forwarded-Proto")]),
            Value::Array(vec![Value::from("X-Forwarded-Proto"), Value::Integer(1)]),
            Value::Array(vec![Value::from("bad header"), Value::from("https")]),
            Value::Array(vec![Value::from("X-Forwarded-Proto"), Value::from(" ")]),
        ] {
            let settings = base().with("secure_proxy_ssl_header", bad);
            assert!(matches!(
                SecurityConfig::from_settings(&settings),
                Err(ConfigError::SecureProxySslHeader),
            ));
        }
    }

    #[test]
    fn proxy_ssl_header_reads_the_first_forwarded_value() {
        let header = ProxySslHeader::new("HTTP_X_FORWARDED_PROTO", "https").unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(header.matches(&headers), None);

        headers.insert("x-forwarded-proto", "https, http".parse().unwrap());
        assert_eq!(header.matches(&headers), Some(true));

        headers.insert("x-forwarded-proto", "http".parse().unwrap());
        assert_eq!(header.matches(&headers), Some(false));
    }

    #[test]
    fn frame_options_accept_either_case() {
        let settings = base().with("x_frame_options", "sameorigin");
        let config = SecurityConfig::from_settings(&settings).unwrap();
        assert_eq!(config.frame_options, Some(FrameOptions::SameOrigin));

        let settings = base().with("x_frame_options", "ALLOW-FROM https://example.com");
        assert!(matches!(SecurityConfig::from_settings(&settings), Err(ConfigError::XFrameOptions)));
    }
}
