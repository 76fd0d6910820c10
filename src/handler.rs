//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router needs to hold handlers of *different* types in a single
//! `HashMap<Method, Tree>`, and middleware needs to call "whatever comes
//! next" without knowing its type. Both go through the same trait object,
//! `dyn ErasedHandler`.
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.get("/", hello)
//! hello.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                       ← stored as BoxedHandler
//!        ↓
//! handler.call(req)  at request time               ← one vtable dispatch
//!        ↓
//! Box::pin(async { hello(req).await.into_result() })  ← BoxFuture
//! ```
//!
//! Handlers may fail. A handler returning `Err` hands its error back up
//! through every middleware untouched; the server turns it into a bare 500.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;

use crate::error::BoxError;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Shared types ──────────────────────────────────────────────────────────────

/// What a handler, or a whole middleware chain, eventually produces.
pub type HandlerResult = Result<Response, BoxError>;

/// A heap-allocated, type-erased future that resolves to a [`HandlerResult`].
///
/// `Send + 'static` let tokio move the future across threads safely.
pub type BoxFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── IntoResult ────────────────────────────────────────────────────────────────

/// Conversion of a handler's return value into a [`HandlerResult`].
///
/// Infallible return types map to `Ok`. `Result<T, E>` lets a handler fail
/// with any error type that boxes into [`BoxError`]:
///
/// ```rust
/// use vigil::{Request, Response};
///
/// async fn read_config(_req: Request) -> Result<Response, std::io::Error> {
///     let text = std::fs::read_to_string("/etc/hostname")?;
///     Ok(Response::text(text))
/// }
/// ```
pub trait IntoResult {
    fn into_result(self) -> HandlerResult;
}

impl IntoResult for Response {
    fn into_result(self) -> HandlerResult { Ok(self) }
}

impl IntoResult for StatusCode {
    fn into_result(self) -> HandlerResult { Ok(self.into_response()) }
}

impl IntoResult for String {
    fn into_result(self) -> HandlerResult { Ok(self.into_response()) }
}

impl IntoResult for &'static str {
    fn into_result(self) -> HandlerResult { Ok(self.into_response()) }
}

impl<T, E> IntoResult for Result<T, E>
where
    T: IntoResponse,
    E: Into<BoxError>,
{
    fn into_result(self) -> HandlerResult {
        self.map(IntoResponse::into_response).map_err(Into::into)
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResult
/// ```
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResult + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResult + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResult + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_result() })
    }
}
