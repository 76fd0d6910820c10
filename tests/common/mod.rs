//! Shared helpers for the end-to-end tests.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use vigil::{Router, Server};

/// A server running on a free local port until `stop` is called.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), vigil::Error>>,
}

impl TestServer {
    pub async fn start(router: Router) -> Self {
        let addr = free_addr();
        let (shutdown, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(
            Server::bind(&addr.to_string()).serve_with_shutdown(router, async move {
                let _ = rx.await;
            }),
        );
        wait_until_listening(addr).await;
        Self { addr, shutdown, handle }
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        self.handle.await.unwrap().unwrap();
    }

    /// Sends a bodyless HTTP/1.1 request and returns the raw response text.
    pub async fn request(&self, method: &str, path: &str) -> String {
        self.request_with(method, path, &[]).await
    }

    /// Like `request`, with extra request headers.
    pub async fn request_with(&self, method: &str, path: &str, headers: &[(&str, &str)]) -> String {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        let mut req = format!("{method} {path} HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n");
        for (name, value) in headers {
            req.push_str(&format!("{name}: {value}\r\n"));
        }
        req.push_str("\r\n");
        stream.write_all(req.as_bytes()).await.unwrap();

        let mut raw = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut raw))
            .await
            .expect("response timed out")
            .unwrap();
        String::from_utf8(raw).unwrap()
    }
}

fn free_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

async fn wait_until_listening(addr: SocketAddr) {
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("server never started listening on {addr}");
}

/// Returns the value of the first `name` header in a raw response.
pub fn header<'a>(raw: &'a str, name: &str) -> Option<&'a str> {
    let head = raw.split("\r\n\r\n").next()?;
    head.lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case(name))
        .map(|(_, v)| v.trim())
}
