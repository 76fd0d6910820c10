//! Minimal vigil example — a couple of endpoints behind the security headers.
//!
//! Run with a settings file:
//!   RUST_LOG=info cargo run --example basic -- demos/vigil.toml
//!
//! or from the environment:
//!   REFERRER_POLICY=same-origin EXPECT_CT_MAX_AGE=86400 EXPECT_CT_ENFORCE=true \
//!     cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/users/42
//!   curl -i http://localhost:3000/broken
//!   curl -i http://localhost:3000/nowhere

use vigil::http::StatusCode;
use vigil::middleware::SecurityHeaders;
use vigil::{Request, Response, Router, Server, Settings};

#[tokio::main]
async fn main() -> Result<(), vigil::Error> {
    tracing_subscriber::fmt::init();

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(path)?,
        None => Settings::from_env(),
    };

    // Refuses to start on a bad setting; nothing is served without the headers.
    let headers = SecurityHeaders::from_settings(&settings)?;

    let app = Router::new()
        .get("/users/{id}", get_user)
        .post("/users", create_user)
        .get("/broken", broken)
        .layer(headers);

    Server::bind("0.0.0.0:3000").serve(app).await
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

// POST /users
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }
    Response::builder()
        .status(StatusCode::CREATED)
        .json(r#"{"id":"99","name":"new_user"}"#)
}

// GET /broken → 500 from the server, without security headers
async fn broken(_req: Request) -> Result<Response, std::io::Error> {
    Err(std::io::Error::other("backing store unavailable"))
}
