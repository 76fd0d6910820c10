//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns. A middleware receives the request together with
//! [`Next`], the rest of the chain, and decides what to do before and after
//! calling it.
//!
//! ```text
//! request ─▶ layer 0 ─▶ layer 1 ─▶ … ─▶ handler
//! response ◀─ layer 0 ◀─ layer 1 ◀─ … ◀─┘
//! ```
//!
//! Layers run in the order they were registered with
//! [`Router::layer`](crate::Router::layer): the first one sees the request
//! first and the response last.
//!
//! Built-in middleware:
//! - [`SecurityHeaders`] — `Referrer-Policy`, `Expect-CT` and friends on every response

use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, HandlerResult};
use crate::request::Request;

mod security;

pub use security::{EXPECT_CT, SecurityHeaders};

/// A request/response interceptor.
///
/// ```rust
/// use vigil::middleware::{Middleware, Next};
/// use vigil::{BoxFuture, Request};
///
/// struct PoweredBy;
///
/// impl Middleware for PoweredBy {
///     fn call(&self, req: Request, next: Next) -> BoxFuture {
///         Box::pin(async move {
///             let mut res = next.run(req).await?;
///             res.headers_mut().insert("x-powered-by", "vigil".parse().unwrap());
///             Ok(res)
///         })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

/// The remainder of the chain after the current middleware.
pub struct Next {
    stack: Arc<[BoxedMiddleware]>,
    index: usize,
    endpoint: BoxedHandler,
}

impl Next {
    pub(crate) fn new(stack: Arc<[BoxedMiddleware]>, endpoint: BoxedHandler) -> Self {
        Self { stack, index: 0, endpoint }
    }

    /// Runs the remaining middleware and then the handler.
    pub async fn run(self, req: Request) -> HandlerResult {
        let Some(middleware) = self.stack.get(self.index).cloned() else {
            return self.endpoint.call(req).await;
        };
        let next = Self { index: self.index + 1, ..self };
        middleware.call(req, next).await
    }
}
