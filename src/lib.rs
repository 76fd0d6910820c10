//! # vigil
//!
//! A minimal HTTP framework for Rust services behind a reverse proxy, with
//! security response headers built in.
//!
//! ## The contract
//!
//! nginx handles TLS, rate limiting, slow clients, and body-size limits.
//! vigil does not. What's left for vigil:
//!
//! - Radix-tree routing — O(path-length) lookup via [`matchit`]
//! - A middleware chain — request in, response out, errors passed through
//! - Security headers — `Referrer-Policy` and `Expect-CT` on every response,
//!   HSTS (HTTPS requests only), `X-Content-Type-Options`, `X-XSS-Protection`
//!   and `X-Frame-Options` when configured
//! - Graceful shutdown — SIGTERM / Ctrl-C, drains in-flight requests
//!
//! ## Fail fast
//!
//! Security settings are validated once, before the server binds. A bad
//! value is a [`ConfigError`] at startup, never a missing header at runtime.
//! The only way to get a [`SecurityHeaders`](middleware::SecurityHeaders) is
//! through that validation.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use vigil::{Request, Response, Router, Server, Settings};
//! use vigil::middleware::SecurityHeaders;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), vigil::Error> {
//!     let settings = Settings::load("vigil.toml")?;
//!     let headers = SecurityHeaders::from_settings(&settings)?;
//!
//!     let app = Router::new()
//!         .get("/users/{id}", get_user)
//!         .layer(headers);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//! ```

mod error;
mod handler;
mod policy;
mod request;
mod response;
mod router;
mod server;
mod settings;

pub mod middleware;

pub use error::{BoxError, ConfigError, Error};
pub use handler::{BoxFuture, Handler, HandlerResult, IntoResult};
pub use policy::{ExpectCt, FrameOptions, Hsts, ProxySslHeader, ReferrerPolicy, SecurityConfig};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use settings::Settings;

pub use http;
