//! # Static file entry point
//!
//! [`StaticFiles`] is the [`Serve`] implementation the `worker` subcommand
//! runs. Connections are served by hyper (HTTP/1.1 or HTTP/2); each request
//! is answered with a file under the root directory.
//!
//! - `GET` and `HEAD` only, anything else is 405
//! - `/` and directory paths map to `index.html`
//! - a `..` segment (also percent-encoded) is refused with 403
//! - a missing file is 404
//! - a request head larger than 16 KiB is refused by hyper with 431
//!
//! After shutdown is requested, accepting stops, open connections are asked
//! to close after their current request and in-flight requests finish.

use std::convert::Infallible;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnectionBuilder;
use percent_encoding::percent_decode_str;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::child::Serve;
use crate::error::WorkerError;

/// Largest buffered request head; hyper answers 431 beyond it.
const MAX_HEAD: usize = 16 * 1024;

/// Serves files below `root`.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: Arc<Path>,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::from(root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Serve for StaticFiles {
    async fn serve(&self, listener: TcpListener, shutdown: CancellationToken) -> Result<(), WorkerError> {
        let tracker = TaskTracker::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                res = listener.accept() => match res {
                    Ok((stream, peer)) => {
                        let root = Arc::clone(&self.root);
                        let shutdown = shutdown.clone();
                        tracker.spawn(async move {
                            if let Err(e) = serve_connection(stream, root, shutdown).await {
                                debug!(%peer, error = %e, "connection error");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                },
            }
        }

        drop(listener);
        tracker.close();
        if !tracker.is_empty() {
            info!(in_flight = tracker.len(), "draining connections");
        }
        tracker.wait().await;
        Ok(())
    }
}

type ConnError = Box<dyn std::error::Error + Send + Sync>;

async fn serve_connection(
    stream: TcpStream,
    root: Arc<Path>,
    shutdown: CancellationToken,
) -> Result<(), ConnError> {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req: Request<Incoming>| {
        let root = Arc::clone(&root);
        async move { Ok::<_, Infallible>(respond(&root, req.method(), req.uri().path()).await) }
    });

    let mut builder = HttpConnectionBuilder::new(TokioExecutor::new());
    builder.http1().max_buf_size(MAX_HEAD);
    let conn = builder.serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        res = conn.as_mut() => res,
        _ = shutdown.cancelled() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    }
}

async fn respond(root: &Path, method: &Method, path: &str) -> Response<Full<Bytes>> {
    if method != Method::GET && method != Method::HEAD {
        return error_response(StatusCode::METHOD_NOT_ALLOWED);
    }

    let Some(mut file) = resolve(root, path) else {
        return error_response(StatusCode::FORBIDDEN);
    };
    if file.is_dir() {
        file.push("index.html");
    }

    match tokio::fs::read(&file).await {
        Ok(body) => {
            let mime = mime_guess::from_path(&file).first_or_octet_stream();
            Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, mime.as_ref())
                .body(Full::new(Bytes::from(body)))
                .unwrap_or_else(|_| error_response(StatusCode::INTERNAL_SERVER_ERROR))
        }
        Err(e) => match e.kind() {
            io::ErrorKind::NotFound => error_response(StatusCode::NOT_FOUND),
            io::ErrorKind::PermissionDenied => error_response(StatusCode::FORBIDDEN),
            _ => {
                warn!(path = %file.display(), error = %e, "cannot read file");
                error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        },
    }
}

fn error_response(status: StatusCode) -> Response<Full<Bytes>> {
    let text = format!(
        "{} {}\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );
    let mut res = Response::new(Full::new(Bytes::from(text)));
    *res.status_mut() = status;
    let headers = res.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    if status == StatusCode::METHOD_NOT_ALLOWED {
        headers.insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
    }
    res
}

/// Maps a request path to a file under `root`; `None` if it would escape.
fn resolve(root: &Path, path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(path).decode_utf8().ok()?;

    let mut out = root.to_path_buf();
    for comp in Path::new(decoded.trim_start_matches('/')).components() {
        match comp {
            Component::Normal(seg) => out.push(seg),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if decoded.ends_with('/') || decoded.is_empty() {
        out.push("index.html");
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/index.html"), "docs").unwrap();
        std::fs::write(dir.path().join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
        dir
    }

    async fn body_of(res: Response<Full<Bytes>>) -> Bytes {
        res.into_body().collect().await.unwrap().to_bytes()
    }

    fn start(dir: &Path) -> (std::net::SocketAddr, CancellationToken, tokio::task::JoinHandle<Result<(), WorkerError>>) {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        std_listener.set_nonblocking(true).unwrap();
        let addr = std_listener.local_addr().unwrap();
        let listener = TcpListener::from_std(std_listener).unwrap();
        let token = CancellationToken::new();
        let files = StaticFiles::new(dir);
        let server = {
            let token = token.clone();
            tokio::spawn(async move { files.serve(listener, token).await })
        };
        (addr, token, server)
    }

    #[test]
    fn resolve_refuses_traversal() {
        let root = Path::new("/srv");
        assert_eq!(resolve(root, "/"), Some(PathBuf::from("/srv/index.html")));
        assert_eq!(resolve(root, "/a/b.css"), Some(PathBuf::from("/srv/a/b.css")));
        assert_eq!(resolve(root, "/a%20b.txt"), Some(PathBuf::from("/srv/a b.txt")));
        assert_eq!(resolve(root, "/../etc/passwd"), None);
        assert_eq!(resolve(root, "/a/%2e%2e/%2e%2e/etc"), None);
        assert_eq!(resolve(root, "/bad%ff"), None);
    }

    #[tokio::test]
    async fn responses() {
        let dir = site();
        let root = dir.path();

        let r = respond(root, &Method::GET, "/").await;
        assert_eq!(r.status(), StatusCode::OK);
        assert_eq!(r.headers()[CONTENT_TYPE], "text/html");
        assert_eq!(body_of(r).await, "<h1>home</h1>");

        let r = respond(root, &Method::GET, "/docs").await;
        assert_eq!(body_of(r).await, "docs");

        let r = respond(root, &Method::HEAD, "/logo.png").await;
        assert_eq!(r.status(), StatusCode::OK);
        assert_eq!(r.headers()[CONTENT_TYPE], "image/png");

        assert_eq!(respond(root, &Method::GET, "/missing.txt").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(respond(root, &Method::GET, "/../secret").await.status(), StatusCode::FORBIDDEN);

        let r = respond(root, &Method::POST, "/").await;
        assert_eq!(r.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(r.headers()[ALLOW], "GET, HEAD");
    }

    #[tokio::test]
    async fn serves_until_shutdown() {
        let dir = site();
        let (addr, token, server) = start(dir.path());

        let mut sock = TcpStream::connect(addr).await.unwrap();
        sock.write_all(b"GET / HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut text = String::new();
        sock.read_to_string(&mut text).await.unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.to_ascii_lowercase().contains("content-length: 13\r\n"));
        assert!(text.ends_with("<h1>home</h1>"));

        token.cancel();
        server.await.unwrap().unwrap();
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn idle_keep_alive_connection_does_not_block_shutdown() {
        let dir = site();
        let (addr, token, server) = start(dir.path());

        let mut sock = TcpStream::connect(addr).await.unwrap();
        sock.write_all(b"GET /docs HTTP/1.1\r\nHost: x\r\n\r\n").await.unwrap();
        let mut buf = [0u8; 512];
        let n = sock.read(&mut buf).await.unwrap();
        assert!(buf[..n].starts_with(b"HTTP/1.1 200 OK"));

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn oversized_request_line_is_refused() {
        let dir = site();
        let (addr, token, server) = start(dir.path());

        let mut request = b"GET /?".to_vec();
        request.extend(std::iter::repeat_n(b'a', 1 << 20));
        request.extend_from_slice(b" HTTP/1.1\r\nHost: x\r\n\r\n");

        let sock = TcpStream::connect(addr).await.unwrap();
        let (mut rd, mut wr) = sock.into_split();
        // The server stops reading at the limit, so the write may fail midway.
        let writer = tokio::spawn(async move {
            let _ = wr.write_all(&request).await;
        });

        let mut reply = Vec::new();
        match rd.read_to_end(&mut reply).await {
            Ok(_) => {
                let text = String::from_utf8_lossy(&reply);
                assert!(text.starts_with("HTTP/1.1 431"), "got: {text:.80}");
            }
            Err(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
        }
        assert!(reply.len() < MAX_HEAD);

        writer.await.unwrap();
        token.cancel();
        server.await.unwrap().unwrap();
    }
}
