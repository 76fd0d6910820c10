//! Unified error types.

use std::path::PathBuf;

/// A type-erased error produced by a handler or middleware.
///
/// Middleware never inspects these: whatever the downstream handler returns
/// travels back up the chain unchanged until it reaches the server.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by vigil's fallible startup operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: an invalid configuration, binding to a port, or
/// accepting a connection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("improperly configured: {0}")]
    Config(#[from] ConfigError),
}

/// A setting is missing, has the wrong type, or holds an illegal value.
///
/// Raised once, while the middleware is being built. It is meant to abort
/// startup: a process holding a `ConfigError` never reaches
/// [`Server::serve`](crate::Server::serve).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("`referrer_policy` is not set or has an illegal value")]
    ReferrerPolicy,

    #[error("`expect_ct_max_age` is not set or is not an integer")]
    ExpectCtMaxAge,

    #[error("`expect_ct_report_uri` is not a valid URL")]
    ExpectCtReportUri,

    #[error("`expect_ct_enforce` must be a boolean")]
    ExpectCtEnforce,

    #[error("`secure_hsts_seconds` must be a non-negative integer")]
    HstsSeconds,

    #[error("`{0}` must be a boolean")]
    NotBoolean(&'static str),

    #[error("`x_frame_options` must be either DENY or SAMEORIGIN")]
    XFrameOptions,

    #[error("`secure_proxy_ssl_header` must be a [header name, value] pair")]
    SecureProxySslHeader,

    #[error("failed to read settings from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read env file {}: {source}", path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("settings are not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
}
